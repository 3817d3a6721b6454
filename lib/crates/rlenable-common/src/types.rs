use serde::{Deserialize, Serialize};

/// A `{rel, href}` pair as returned in the `links` array of API resources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

/// Instance resource as returned by `GET <cloud>/instances`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceRecord {
    /// Provider identifier (e.g. `i-0abc...` on AWS). Survives stop/start.
    pub resource_uid: String,
    /// Display name; raw instances discovered by the platform may have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Provider-reported lifecycle state, e.g. `operational`, `provisioned`.
    pub state: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// Server resource as returned by `GET <deployment>/servers`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerRecord {
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// Session resource returned by `GET /api/sessions?view=whoami`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    #[serde(default)]
    pub links: Vec<Link>,
}

/// Account resource returned by `GET /api/accounts/<id>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}
