//! REST client for the cloud management API (version 1.5).
//!
//! `ureq` is blocking, so every request runs on the blocking thread pool via
//! `tokio::task::spawn_blocking` with a cloned agent.

use std::time::Duration;

use anyhow::{Context, Result};
use rlenable_common::{AccountRecord, InstanceRecord, ServerRecord, SessionRecord, last_link};
use serde::de::DeserializeOwned;

use crate::application::ports::{
    AttributeResponse, AttributeWriter, CredentialStore, IdentityResolver, InstanceControl,
    InstanceQuery,
};
use crate::domain::config::ControlPlaneConfig;
use crate::domain::enablement::ServerReport;
use crate::domain::identity::{self, SessionIdentity};
use crate::domain::instance::{CloudScope, Instance, InstanceHandle, InstanceState, ResourceUid};
use crate::domain::userdata::percent_escape;

const API_VERSION: &str = "1.5";

/// Control plane reached over HTTPS with a bearer token.
#[derive(Clone)]
pub struct HttpControlPlane {
    agent: ureq::Agent,
    endpoint: String,
    token: String,
}

impl std::fmt::Debug for HttpControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpControlPlane")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl HttpControlPlane {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("rlenable/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Build a client from config, reading the bearer token from `secrets`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token credential is missing.
    pub fn from_config(cfg: &ControlPlaneConfig, secrets: &impl CredentialStore) -> Result<Self> {
        let token = secrets.get_secret(&cfg.token_credential)?;
        Ok(Self::new(
            cfg.endpoint.clone(),
            token,
            Duration::from_secs(cfg.request_timeout_secs),
        ))
    }

    /// Absolute URL for an API href such as `/api/clouds/1/instances`.
    fn url(&self, href: &str) -> String {
        if href.starts_with("https://") || href.starts_with("http://") {
            href.to_string()
        } else {
            format!("{}{href}", self.endpoint)
        }
    }

    fn request(&self, method: &str, href: &str) -> ureq::Request {
        self.agent
            .request(method, &self.url(href))
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("X-Api-Version", API_VERSION)
            .set("Accept", "application/json")
    }

    async fn get_json<T>(&self, href: &str, query: &[(&str, &str)]) -> Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut req = self.request("GET", href);
        for (k, v) in query {
            req = req.query(k, v);
        }
        let href = href.to_string();
        blocking(move || {
            let body = req
                .call()
                .with_context(|| format!("GET {href} failed"))?
                .into_string()
                .with_context(|| format!("cannot read response of GET {href}"))?;
            serde_json::from_str(&body).with_context(|| format!("unexpected response from GET {href}"))
        })
        .await
    }

    async fn post_action(&self, href: &str, action: &str) -> Result<()> {
        let path = format!("{href}/{action}");
        let req = self.request("POST", &path);
        blocking(move || {
            req.call().with_context(|| format!("POST {path} failed"))?;
            Ok(())
        })
        .await
    }

    async fn find_record(&self, cloud: &CloudScope, uid: &ResourceUid) -> Result<InstanceRecord> {
        let filter = format!("resource_uid=={uid}");
        let records: Vec<InstanceRecord> = self
            .get_json(
                &format!("{cloud}/instances"),
                &[("filter[]", filter.as_str())],
            )
            .await?;
        select_record(records, uid, cloud)
    }
}

/// The record whose `resource_uid` equals `uid` exactly. The API's `==`
/// filter is a partial match, so `i-1` also returns `i-12`.
fn select_record(
    records: Vec<InstanceRecord>,
    uid: &ResourceUid,
    cloud: &CloudScope,
) -> Result<InstanceRecord> {
    let returned = records.len();
    records
        .into_iter()
        .find(|r| r.resource_uid == uid.as_str())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "no instance with resource_uid {uid} in {cloud} ({returned} partial match(es))"
            )
        })
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("control-plane request task failed")?
}

fn to_instance(record: InstanceRecord, cloud: &CloudScope) -> Result<Instance> {
    let handle = last_link(&record.links, "self")
        .with_context(|| format!("instance {} has no self link", record.resource_uid))?
        .href
        .clone();
    let cloud = last_link(&record.links, "cloud")
        .map_or_else(|_| cloud.clone(), |l| CloudScope::new(l.href.clone()));
    Ok(Instance {
        resource_uid: ResourceUid::parse(&record.resource_uid)?,
        handle: InstanceHandle::new(handle),
        name: record.name,
        state: InstanceState::from(record.state),
        cloud,
    })
}

/// `GET /api/sessions` returns either one object or a one-element array.
fn first_session(value: serde_json::Value) -> Result<SessionRecord> {
    let value = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("empty session response"))?,
        other => other,
    };
    serde_json::from_value(value).context("unexpected session response")
}

impl InstanceControl for HttpControlPlane {
    async fn stop(&self, instances: &[Instance]) -> Result<()> {
        for instance in instances {
            tracing::debug!(instance = %instance.resource_uid, handle = %instance.handle, "stop requested");
            self.post_action(instance.handle.as_str(), "stop").await?;
        }
        Ok(())
    }

    async fn start(&self, instances: &[Instance]) -> Result<()> {
        for instance in instances {
            tracing::debug!(instance = %instance.resource_uid, handle = %instance.handle, "start requested");
            self.post_action(instance.handle.as_str(), "start").await?;
        }
        Ok(())
    }
}

impl InstanceQuery for HttpControlPlane {
    async fn find_by_uid(&self, cloud: &CloudScope, uid: &ResourceUid) -> Result<Instance> {
        let record = self.find_record(cloud, uid).await?;
        to_instance(record, cloud)
    }

    async fn list_servers(&self, deployment: &str) -> Result<Vec<ServerReport>> {
        let records: Vec<ServerRecord> = self
            .get_json(&format!("{deployment}/servers"), &[])
            .await?;
        Ok(records
            .into_iter()
            .map(|r| ServerReport {
                name: r.name,
                state: InstanceState::from(r.state),
            })
            .collect())
    }
}

impl AttributeWriter for HttpControlPlane {
    async fn update_instance_attribute(
        &self,
        cloud: &CloudScope,
        uid: &ResourceUid,
        key: &str,
        value: &str,
    ) -> Result<AttributeResponse> {
        // Re-resolve: the handle from the last observation may be stale.
        let instance = self.find_by_uid(cloud, uid).await?;
        let href = instance.handle.as_str().to_string();
        let body = format!("{}={value}", percent_escape(key));
        let req = self
            .request("PUT", &href)
            .set("Content-Type", "application/x-www-form-urlencoded");
        blocking(move || match req.send_string(&body) {
            Ok(resp) => Ok(AttributeResponse {
                status: resp.status(),
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Status(status, resp)) => Ok(AttributeResponse {
                status,
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(e) => Err(anyhow::Error::new(e).context(format!("PUT {href} failed"))),
        })
        .await
    }
}

impl IdentityResolver for HttpControlPlane {
    async fn whoami(&self) -> Result<SessionIdentity> {
        let raw: serde_json::Value = self
            .get_json("/api/sessions", &[("view", "whoami")])
            .await?;
        let session = first_session(raw)?;
        let account_id = identity::account_id(&session)?;
        let account: AccountRecord = self
            .get_json(&format!("/api/accounts/{account_id}"), &[])
            .await?;
        identity::resolve(&session, &account)
    }
}
