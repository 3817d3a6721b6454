//! Enablement payload builder.
//!
//! Combines a named credential, the caller's session identity and the
//! deployment name into the encoded user-data document. The identity is
//! resolved once per builder and reused for every instance.

use anyhow::{Context, Result};
use tokio::sync::OnceCell;

use crate::application::ports::{CredentialStore, IdentityResolver, PayloadBuilder};
use crate::domain::identity::SessionIdentity;
use crate::domain::userdata::{DEFAULT_CLOUD_TYPE, DEFAULT_SCRIPT_URL, UserDataSpec};

/// [`PayloadBuilder`] producing the enablement user-data.
pub struct RightLinkPayloadBuilder<'a, S, I> {
    secrets: &'a S,
    identity: &'a I,
    deployment_name: String,
    cloud_type: String,
    script_url: String,
    resolved: OnceCell<SessionIdentity>,
}

impl<'a, S: CredentialStore, I: IdentityResolver> RightLinkPayloadBuilder<'a, S, I> {
    #[must_use]
    pub fn new(secrets: &'a S, identity: &'a I, deployment_name: impl Into<String>) -> Self {
        Self {
            secrets,
            identity,
            deployment_name: deployment_name.into(),
            cloud_type: DEFAULT_CLOUD_TYPE.to_string(),
            script_url: DEFAULT_SCRIPT_URL.to_string(),
            resolved: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn with_cloud_type(mut self, cloud_type: impl Into<String>) -> Self {
        self.cloud_type = cloud_type.into();
        self
    }

    #[must_use]
    pub fn with_script_url(mut self, script_url: impl Into<String>) -> Self {
        self.script_url = script_url.into();
        self
    }

    /// The cached session identity, resolving it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity cannot be resolved.
    pub async fn identity(&self) -> Result<&SessionIdentity> {
        self.resolved
            .get_or_try_init(|| async {
                let identity = self
                    .identity
                    .whoami()
                    .await
                    .context("cannot resolve session identity")?;
                tracing::debug!(
                    user = %identity.user_id,
                    account = %identity.account_id,
                    api_host = %identity.api_host,
                    "resolved session identity"
                );
                Ok::<_, anyhow::Error>(identity)
            })
            .await
    }
}

impl<S: CredentialStore, I: IdentityResolver> PayloadBuilder for RightLinkPayloadBuilder<'_, S, I> {
    async fn build_payload(
        &self,
        template_ref: &str,
        display_name: &str,
        auth_ref: &str,
    ) -> Result<String> {
        let refresh_token = self.secrets.get_secret(auth_ref)?;
        let identity = self.identity().await?;
        UserDataSpec {
            refresh_token: &refresh_token,
            server_template: template_ref,
            server_name: display_name,
            deployment_name: &self.deployment_name,
            cloud_type: &self.cloud_type,
            api_host: &identity.api_host,
            script_url: &self.script_url,
        }
        .encoded()
    }
}
