//! `rlenable enable`: enable running instances against the live control plane.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::services::config_service;
use crate::application::services::enablement::{
    EnableOptions, Timing, enable_batch, resolve_instances,
};
use crate::application::services::retry::RetryPolicy;
use crate::application::services::userdata::RightLinkPayloadBuilder;
use crate::domain::enablement::{ApplyFailurePolicy, EnableReport};
use crate::domain::instance::{CloudScope, ResourceUid};
use crate::infra::control_plane::HttpControlPlane;
use crate::infra::credentials::FileCredentialStore;
use crate::output::{SilentReporter, TerminalReporter};

/// Arguments for the enable command.
#[derive(Args)]
pub struct EnableArgs {
    /// Cloud href the instances live in (e.g. /api/clouds/1)
    #[arg(long)]
    pub cloud: String,

    /// Deployment href the servers register into
    #[arg(long)]
    pub deployment: String,

    /// Deployment name passed to the enablement script (defaults to the href)
    #[arg(long)]
    pub deployment_name: Option<String>,

    /// Server template the servers are created from
    #[arg(long)]
    pub server_template: String,

    /// Credential holding the token handed to the enablement script
    #[arg(long)]
    pub token_credential: Option<String>,

    /// Override `enablement.on_apply_failure`
    #[arg(long, value_parser = ["log", "abort"])]
    pub on_apply_failure: Option<String>,

    /// Resource UIDs of the instances to enable
    #[arg(required = true, num_args = 1..)]
    pub uids: Vec<String>,
}

/// Run the enable command.
///
/// # Errors
///
/// Returns an error if the configuration or credentials cannot be read, if
/// an instance cannot be resolved, or if the enablement run fails.
pub async fn run(app: &AppContext, args: EnableArgs) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let uids = args
        .uids
        .iter()
        .map(|raw| ResourceUid::parse(raw))
        .collect::<Result<Vec<_>>>()?;
    let cloud = CloudScope::new(args.cloud.as_str());

    let secrets = FileCredentialStore::new();
    let control_plane = HttpControlPlane::from_config(&config.control_plane, &secrets)
        .context("cannot build control-plane client")?;
    let retry = RetryPolicy::from(&config.lookup);

    let instances = resolve_instances(&control_plane, &cloud, &uids, &retry).await?;

    if !app.confirm(
        &format!(
            "Stop, reconfigure and restart {} instance(s)?",
            instances.len()
        ),
        true,
    )? {
        app.output.info("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let deployment_name = args.deployment_name.as_deref().unwrap_or(&args.deployment);
    let builder = RightLinkPayloadBuilder::new(&secrets, &control_plane, deployment_name)
        .with_cloud_type(config.enablement.cloud_type.as_str())
        .with_script_url(config.enablement.script_url.as_str());

    let on_apply_failure = match args.on_apply_failure.as_deref() {
        Some(raw) => raw
            .parse::<ApplyFailurePolicy>()
            .map_err(anyhow::Error::msg)?,
        None => config.enablement.on_apply_failure,
    };
    let auth_ref = args
        .token_credential
        .as_deref()
        .unwrap_or(&config.control_plane.token_credential);
    let opts = EnableOptions {
        deployment: &args.deployment,
        template_ref: &args.server_template,
        auth_ref,
        timing: Timing::from(&config.polling),
        retry,
        on_apply_failure,
    };

    let report = if app.is_json() {
        enable_batch(&control_plane, &builder, &SilentReporter, &instances, &opts).await?
    } else {
        let reporter = TerminalReporter::new(&app.output);
        enable_batch(&control_plane, &builder, &reporter, &instances, &opts).await?
    };

    app.renderer().render_report(&report)?;
    Ok(exit_code(&report))
}

/// `SUCCESS` for a clean run, `2` when members failed to configure or
/// servers ended stranded.
#[must_use]
pub fn exit_code(report: &EnableReport) -> ExitCode {
    if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}
