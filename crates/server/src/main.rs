use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use freightwatch_core::{NotificationChannel, Threshold};
use freightwatch_engine::{LocalEngine, WorkflowEngine};
use freightwatch_notify::NotificationService;
use freightwatch_server::api::{self, AppState};
use freightwatch_server::config::FreightwatchConfig;
use freightwatch_server::{providers, telemetry};
use freightwatch_store::Repository;
use freightwatch_store_memory::MemoryRepository;
use freightwatch_store_postgres::{PostgresConfig, PostgresRepository};
use freightwatch_sweep::FleetSweep;
use freightwatch_workflow::{
    Activities, DelayNotificationWorkflow, Pipeline, RecurringTrafficCheckWorkflow,
    ThresholdResolver, WorkflowService,
};

/// FreightWatch delay-notification HTTP server.
#[derive(Parser, Debug)]
#[command(name = "freightwatch-server", about = "FreightWatch delay-notification server")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "freightwatch.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();

    let cli = Cli::parse();

    // Load configuration from the TOML file, or use defaults if absent,
    // then apply environment overrides and CLI flags.
    let mut config: FreightwatchConfig = if Path::new(&cli.config).exists() {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        info!(path = %cli.config, "config file not found, using defaults");
        FreightwatchConfig::default()
    };
    config.apply_env();
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // The repository handle is one of the two process-wide singletons
    // (the engine client is the other); both are built here and passed
    // explicitly.
    let repo: Arc<dyn Repository> = match config.store.backend.as_str() {
        "postgres" => {
            let url = config
                .store
                .url
                .clone()
                .ok_or("store.url (or DATABASE_URL) is required for the postgres backend")?;
            info!("connecting to postgres store");
            Arc::new(PostgresRepository::new(PostgresConfig::new(url)).await?)
        }
        "memory" => {
            info!("using in-memory store");
            Arc::new(MemoryRepository::new())
        }
        other => return Err(format!("unknown store backend: {other}").into()),
    };
    seed_default_threshold(repo.as_ref(), config.workflow.default_threshold_minutes).await?;

    let provider_set = providers::build_providers(&config.providers)?;

    let notifier = Arc::new(
        NotificationService::builder()
            .email_adapters(provider_set.email)
            .sms_adapters(provider_set.sms)
            .build(),
    );

    let workflow_config = config.workflow_config();
    let resolver = ThresholdResolver::new(repo.clone(), workflow_config.default_threshold_minutes);
    let activities = Arc::new(Activities::new(
        repo.clone(),
        provider_set.traffic.clone(),
        provider_set.generators,
        notifier,
        resolver,
        workflow_config.activity.clone(),
    ));
    let pipeline = Arc::new(Pipeline::new(repo.clone(), activities));

    let engine: Arc<dyn WorkflowEngine> = Arc::new(
        LocalEngine::builder()
            .register(Arc::new(DelayNotificationWorkflow::new(
                repo.clone(),
                pipeline.clone(),
            )))
            .register(Arc::new(RecurringTrafficCheckWorkflow::new(
                repo.clone(),
                pipeline,
                workflow_config.clone(),
            )))
            .build(),
    );

    let workflows = Arc::new(WorkflowService::new(engine, repo.clone(), workflow_config));
    let sweep = Arc::new(FleetSweep::new(repo, provider_set.traffic));

    let state = AppState {
        workflows,
        sweep,
        geocoders: Arc::new(provider_set.geocoders),
        cron_secret: config.cron.secret.clone(),
    };
    if state.cron_secret.is_none() {
        info!("no cron secret configured; the fleet-sweep endpoint will answer 401");
    }

    let app = api::router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "freightwatch server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Ensure a system default threshold exists so resolution never has to
/// reach the compile-time fallback on a fresh store.
async fn seed_default_threshold(
    repo: &dyn Repository,
    minutes: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    if repo.get_default_threshold().await?.is_none() {
        let threshold = Threshold::new(
            "standard",
            minutes,
            vec![NotificationChannel::Email, NotificationChannel::Sms],
        )?
        .as_default()
        .as_system();
        repo.create_threshold(threshold).await?;
        info!(minutes, "seeded system default threshold");
    }
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
