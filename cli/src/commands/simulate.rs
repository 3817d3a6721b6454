//! `rlenable simulate`: run the enablement workflow against an in-memory cloud.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::config_service;
use crate::application::services::enablement::{EnableOptions, Timing, enable_batch};
use crate::application::services::retry::RetryPolicy;
use crate::application::services::userdata::RightLinkPayloadBuilder;
use crate::commands::enable::exit_code;
use crate::domain::enablement::ApplyFailurePolicy;
use crate::infra::credentials::StaticCredentialStore;
use crate::infra::simulated::{SimulatedCloud, SimulationSpec};
use crate::output::{SilentReporter, TerminalReporter};

/// Credential name the simulated run hands to the payload builder.
const SIM_CREDENTIAL: &str = "SIMULATED_TOKEN";

/// Arguments for the simulate command.
#[derive(Args)]
pub struct SimulateArgs {
    /// Batch size
    #[arg(long, default_value_t = 3)]
    pub instances: usize,

    /// Members that boot into `stranded in booting`
    #[arg(long, default_value_t = 0)]
    pub stranded: usize,

    /// Failed lookups per instance after each stop or start
    #[arg(long, default_value_t = 1)]
    pub flaky_lookups: u32,

    /// Observations each state transition takes
    #[arg(long, default_value_t = 2)]
    pub transition_polls: u32,

    /// Members whose user-data update is rejected
    #[arg(long, default_value_t = 0)]
    pub rejected_updates: usize,

    /// Poll interval and lookup retry delay in milliseconds
    #[arg(long, default_value_t = 50)]
    pub interval_ms: u64,

    /// Halt on the first rejected user-data update
    #[arg(long)]
    pub abort_on_apply_failure: bool,
}

/// Run the simulate command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read or the simulated
/// run fails.
pub async fn run(app: &AppContext, args: SimulateArgs) -> Result<ExitCode> {
    anyhow::ensure!(args.instances > 0, "--instances must be at least 1");
    anyhow::ensure!(
        args.stranded <= args.instances,
        "--stranded cannot exceed --instances"
    );

    let config = config_service::load_config(&app.config_store)?;
    let cloud = SimulatedCloud::new(SimulationSpec {
        instances: args.instances,
        stranded: args.stranded,
        flaky_lookups: args.flaky_lookups,
        transition_polls: args.transition_polls,
        rejected_updates: args.rejected_updates,
        ..SimulationSpec::default()
    })?;
    let secrets = StaticCredentialStore::new().with(SIM_CREDENTIAL, "simulated-refresh-token");
    let deployment = cloud.spec().deployment.clone();
    let builder = RightLinkPayloadBuilder::new(&secrets, &cloud, "simulated")
        .with_cloud_type(config.enablement.cloud_type.as_str())
        .with_script_url(config.enablement.script_url.as_str());

    let interval = Duration::from_millis(args.interval_ms);
    let opts = EnableOptions {
        deployment: &deployment,
        template_ref: "Simulated Template",
        auth_ref: SIM_CREDENTIAL,
        timing: Timing {
            interval,
            ..Timing::default()
        },
        retry: RetryPolicy::new(config.lookup.max_attempts, interval),
        on_apply_failure: if args.abort_on_apply_failure {
            ApplyFailurePolicy::Abort
        } else {
            config.enablement.on_apply_failure
        },
    };

    let instances = cloud.instances();
    tracing::info!(size = instances.len(), "simulated batch created");

    let report = if app.is_json() {
        enable_batch(&cloud, &builder, &SilentReporter, &instances, &opts).await?
    } else {
        let reporter = TerminalReporter::new(&app.output);
        enable_batch(&cloud, &builder, &reporter, &instances, &opts).await?
    };

    app.renderer().render_report(&report)?;
    tracing::debug!(
        stop_requests = cloud.stop_requests(),
        start_requests = cloud.start_requests(),
        lookup_failures = cloud.lookup_failures(),
        "simulation finished"
    );
    Ok(exit_code(&report))
}
