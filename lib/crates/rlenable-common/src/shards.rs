//! Platform shard table: cluster href → API and self-service hostnames.

/// Hostnames serving one platform shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardHosts {
    /// Cloud management API host, passed to the enablement script.
    pub api: &'static str,
    /// Self-service host.
    pub selfservice: &'static str,
}

const SHARDS: &[(&str, ShardHosts)] = &[
    (
        "/api/clusters/3",
        ShardHosts {
            api: "us-3.rightscale.com",
            selfservice: "selfservice-3.rightscale.com",
        },
    ),
    (
        "/api/clusters/4",
        ShardHosts {
            api: "us-4.rightscale.com",
            selfservice: "selfservice-4.rightscale.com",
        },
    ),
    (
        "/api/clusters/10",
        ShardHosts {
            api: "telstra-10.rightscale.com",
            selfservice: "selfservice-10.rightscale.com",
        },
    ),
];

/// Look up the hosts for a cluster href such as `/api/clusters/4`.
#[must_use]
pub fn lookup_shard(cluster_href: &str) -> Option<ShardHosts> {
    SHARDS
        .iter()
        .find(|(href, _)| *href == cluster_href)
        .map(|(_, hosts)| *hosts)
}
