//! Helpers for navigating `links` arrays and hrefs.

use thiserror::Error;

use crate::types::Link;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("no link with rel '{0}'")]
    MissingRel(String),

    #[error("href '{0}' has no trailing id")]
    NoId(String),
}

/// The last link with the given `rel`. The API may repeat a rel; the last one wins.
pub fn last_link<'a>(links: &'a [Link], rel: &str) -> Result<&'a Link, LinkError> {
    links
        .iter()
        .rev()
        .find(|l| l.rel == rel)
        .ok_or_else(|| LinkError::MissingRel(rel.to_string()))
}

/// Extract the trailing id segment of an href: `/api/accounts/123` → `123`.
pub fn id_from_href(href: &str) -> Result<&str, LinkError> {
    match href.trim_end_matches('/').rsplit('/').next() {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(LinkError::NoId(href.to_string())),
    }
}
