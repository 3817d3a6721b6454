//! Session identity: who the API token belongs to and which shard serves it.

use anyhow::Result;
use rlenable_common::{AccountRecord, SessionRecord, id_from_href, last_link, lookup_shard};
use serde::Serialize;

use crate::domain::error::IdentityError;

/// Caller identity as needed by the enablement script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionIdentity {
    pub user_id: String,
    pub account_id: String,
    /// Cloud management API host for the account's shard.
    pub api_host: String,
    pub selfservice_host: String,
}

/// Account id referenced by a whoami session.
///
/// # Errors
///
/// Returns [`IdentityError::Malformed`] if the session has no account link.
pub fn account_id(session: &SessionRecord) -> Result<String> {
    let link = last_link(&session.links, "account")
        .map_err(|e| IdentityError::Malformed(e.to_string()))?;
    let id = id_from_href(&link.href).map_err(|e| IdentityError::Malformed(e.to_string()))?;
    Ok(id.to_string())
}

/// Combine the whoami session and the account resource into an identity.
///
/// # Errors
///
/// Returns [`IdentityError::Malformed`] if a required link is missing and
/// [`IdentityError::UnknownShard`] if the account's cluster is not known.
pub fn resolve(session: &SessionRecord, account: &AccountRecord) -> Result<SessionIdentity> {
    let malformed = |e: rlenable_common::LinkError| IdentityError::Malformed(e.to_string());

    let user = last_link(&session.links, "user").map_err(malformed)?;
    let user_id = id_from_href(&user.href).map_err(malformed)?.to_string();
    let account_id = account_id(session)?;

    let cluster = last_link(&account.links, "cluster").map_err(malformed)?;
    let hosts = lookup_shard(&cluster.href)
        .ok_or_else(|| IdentityError::UnknownShard(cluster.href.clone()))?;

    Ok(SessionIdentity {
        user_id,
        account_id,
        api_host: hosts.api.to_string(),
        selfservice_host: hosts.selfservice.to_string(),
    })
}
