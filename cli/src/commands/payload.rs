//! `rlenable payload`: print the enablement user-data for one server.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::CredentialStore;
use crate::application::services::config_service;
use crate::domain::userdata::UserDataSpec;
use crate::infra::credentials::FileCredentialStore;

/// Arguments for the payload command.
#[derive(Args)]
pub struct PayloadArgs {
    /// Server template the server registers against
    #[arg(long)]
    pub server_template: String,

    /// Server name
    #[arg(long)]
    pub server_name: String,

    /// Deployment name
    #[arg(long)]
    pub deployment: String,

    /// Cloud management API host (e.g. us-3.rightscale.com)
    #[arg(long)]
    pub api_host: String,

    /// Credential holding the refresh token
    #[arg(long)]
    pub token_credential: Option<String>,

    /// Print the MIME document instead of the encoded attribute value
    #[arg(long)]
    pub raw: bool,
}

/// Run the payload command.
///
/// # Errors
///
/// Returns an error if the credential is missing or a field would break the
/// script quoting.
pub fn run(app: &AppContext, args: &PayloadArgs) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let credential = args
        .token_credential
        .as_deref()
        .unwrap_or(&config.control_plane.token_credential);
    let refresh_token = FileCredentialStore::new()
        .get_secret(credential)
        .with_context(|| format!("cannot read credential {credential}"))?;

    let spec = UserDataSpec {
        refresh_token: &refresh_token,
        server_template: &args.server_template,
        server_name: &args.server_name,
        deployment_name: &args.deployment,
        cloud_type: &config.enablement.cloud_type,
        api_host: &args.api_host,
        script_url: &config.enablement.script_url,
    };
    let payload = if args.raw {
        spec.render()?
    } else {
        spec.encoded()?
    };

    app.renderer().render_payload(&payload, !args.raw)?;
    Ok(ExitCode::SUCCESS)
}
