use std::sync::Arc;

use intake_assist::channels::MissiveClient;
use intake_assist::config::TriageConfig;
use intake_assist::matching::Matcher;
use intake_assist::pipeline::AssignmentOrchestrator;
use intake_assist::pipeline::poller::{spawn_archive_sweeper, spawn_assignment_poller};
use intake_assist::roster::{RosterIndex, load_roster};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = TriageConfig::from_env()?;

    eprintln!("📥 Intake Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Roster: {}", config.roster_path.display());
    eprintln!(
        "   Polling every {}s, {}-day lookback, {}-minute grouping window",
        config.poll_interval_secs, config.lookback_days, config.time_window_minutes
    );
    eprintln!(
        "   Archive sweep: {}",
        if config.archive_enabled {
            format!("enabled ({}+ days idle)", config.archive_days_old)
        } else {
            "disabled".to_string()
        }
    );

    // ── Roster ──────────────────────────────────────────────────────
    let rows = load_roster(&config.roster_path)?;
    let index = Arc::new(RosterIndex::build(&rows));
    eprintln!("   Clients indexed: {}\n", index.len());

    // ── Platform client and pipeline ────────────────────────────────
    let client = Arc::new(MissiveClient::new(&config));
    let orchestrator = Arc::new(AssignmentOrchestrator::new(
        Matcher::new(config.match_policy),
        config.overrides.clone(),
        config.time_window_minutes,
    ));

    let source: Arc<dyn intake_assist::pipeline::MessageSource> = Arc::clone(&client) as _;
    let sink: Arc<dyn intake_assist::pipeline::AssignmentSink> = Arc::clone(&client) as _;
    let (poll_handle, poll_shutdown) = spawn_assignment_poller(
        source,
        sink,
        orchestrator,
        index,
        config.poll_interval_secs,
        config.lookback_days,
    );

    let sweeper = if config.archive_enabled {
        let ops: Arc<dyn intake_assist::archive::ArchiveOps> = Arc::clone(&client) as _;
        Some(spawn_archive_sweeper(ops, config.archive_days_old))
    } else {
        None
    };

    // Run until interrupted, then drain: a cycle in progress finishes
    // before the process exits, so no family group is ever half-assigned.
    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupt received, draining current cycle");

    let _ = poll_shutdown.send(true);
    poll_handle.await?;
    if let Some((handle, shutdown)) = sweeper {
        let _ = shutdown.send(true);
        handle.await?;
    }

    Ok(())
}
