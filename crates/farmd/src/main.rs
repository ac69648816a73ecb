//! farmd: the terminal farm orchestrator daemon.
//!
//! One invocation performs one reconciliation pass: fetch the desired
//! terminal list from the trading journal, compare it with the
//! containers running on the terminal VM, and converge. An external
//! scheduler (cron or a systemd timer, at `POLL_INTERVAL`) drives
//! repeated passes; the process itself holds no state between runs.
//!
//! Exit codes: 0 for a clean pass, 1 for missing configuration, a
//! fatal startup error, or a pass with per-item errors.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use farm_api::ApiClient;
use farm_core::OrchestratorConfig;
use farm_reconciler::Reconciler;
use farm_runtime::DockerRuntime;

#[derive(Parser)]
#[command(name = "farmd", about = "Terminal farm orchestrator")]
struct Cli {
    /// Compute and log the reconciliation plan without applying it.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,farmd=debug,farm=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let config = match OrchestratorConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "configuration invalid, refusing to start");
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, &config).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = ?err, "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, config: &OrchestratorConfig) -> anyhow::Result<ExitCode> {
    info!(
        journal_url = %config.journal_url,
        docker_host = %config.docker_host,
        image = %config.terminal_image,
        poll_interval_secs = config.poll_interval.as_secs(),
        "terminal farm orchestrator starting"
    );

    // A dead Docker endpoint means nothing can be reconciled; fail
    // fast before touching the control plane.
    let runtime = DockerRuntime::connect(config).await?;
    let api = ApiClient::new(config)?;
    let reconciler = Reconciler::new(api, runtime);

    if cli.dry_run {
        let plan = reconciler.plan().await;
        info!(
            create = plan.to_create.len(),
            stop = plan.to_stop.len(),
            "dry run, applying nothing"
        );
        for spec in &plan.to_create {
            info!(terminal = %spec.id, "would create");
        }
        for id in &plan.to_stop {
            info!(terminal = %id, "would stop");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let stats = reconciler.reconcile().await;
    info!(
        created = stats.created,
        stopped = stats.stopped,
        updated = stats.updated,
        errors = stats.errors,
        "reconciliation results"
    );

    if stats.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("some operations had errors, see logs above");
        Ok(ExitCode::FAILURE)
    }
}
