//! compethink - competitive-intelligence audit CLI
//!
//! Keeps one audit session in a local SQLite store and synchronizes its
//! competitors against the SEO-metrics, AI-simulation and page-performance
//! providers.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use compethink_common::config::{
    default_config_path, load_toml_config, resolve_root_folder, TomlConfig, DATABASE_FILE,
};
use compethink_common::events::{EventBus, SyncEvent};
use compethink_common::schema::MetricKey;
use compethink_sync::config::{resolve_ai_api_key, resolve_seo_api_key, sync_seo_key_to_toml};
use compethink_sync::db::AuditStore;
use compethink_sync::providers::Providers;
use compethink_sync::scoring::{cluster_averages, most_branded, ranking, summarize};
use compethink_sync::{AuditSession, EntityPatch, SyncError, SyncOrchestrator, SyncOutcome};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Command-line arguments for compethink
#[derive(Parser, Debug)]
#[command(name = "compethink")]
#[command(about = "Competitive-intelligence audit sync engine")]
#[command(version)]
struct Args {
    /// Folder holding the audit database
    #[arg(short, long, env = "COMPETHINK_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "COMPETHINK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synchronize every competitor, or just one with --id
    Sync {
        #[arg(long)]
        id: Option<Uuid>,
    },
    /// Add a competitor
    Add {
        name: String,
        #[arg(short, long, default_value = "")]
        domain: String,
    },
    /// Edit a competitor's details
    Edit {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        domain: Option<String>,
        #[arg(long)]
        organic_traffic: Option<u64>,
        #[arg(long)]
        branded_traffic: Option<u64>,
    },
    /// Set one metric by hand (metric display name, e.g. "Blog Presence")
    Score {
        id: Uuid,
        metric: String,
        score: u32,
    },
    /// Remove a competitor
    Remove { id: Uuid },
    /// Set client name and industry
    Client {
        name: String,
        #[arg(short, long, default_value = "")]
        industry: String,
    },
    /// Store the SEO-metrics API key
    SetKey { key: String },
    /// Print the current audit, or one competitor's metrics with --id
    Show {
        /// Print the summary as JSON
        #[arg(long, conflicts_with = "id")]
        json: bool,
        /// Competitor to break down metric by metric
        #[arg(long)]
        id: Option<Uuid>,
    },
    /// List snapshots, or load/remove one by index (0 = newest)
    History {
        #[arg(long, conflicts_with = "remove")]
        load: Option<usize>,
        #[arg(long)]
        remove: Option<usize>,
    },
    /// Snapshot the current audit and start a new one
    New,
}

fn init_tracing(toml_config: &TomlConfig) {
    let level = &toml_config.logging.level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("compethink_sync={level},compethink_common={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TomlConfig::default(),
    };

    init_tracing(&toml_config);
    info!("Starting compethink v{}", env!("CARGO_PKG_VERSION"));

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let db_path = root_folder.join(DATABASE_FILE);
    info!("Database: {}", db_path.display());

    let store = AuditStore::open(&db_path)
        .await
        .context("Failed to open audit store")?;
    let mut session = AuditSession::open(store)
        .await
        .context("Failed to restore audit session")?;

    match args.command {
        Command::Sync { id } => {
            adopt_seo_key(&mut session, &toml_config).await?;
            run_sync(&mut session, &toml_config, id).await?;
        }
        Command::Add { name, domain } => {
            let id = session.add_entity(&name, &domain).await?;
            println!("{id}");
        }
        Command::Edit {
            id,
            name,
            domain,
            organic_traffic,
            branded_traffic,
        } => {
            let patch = EntityPatch {
                name,
                domain,
                organic_traffic,
                branded_traffic,
            };
            session.update_entity(id, patch).await?;
        }
        Command::Score { id, metric, score } => {
            let Some(key) = MetricKey::from_label(&metric) else {
                bail!("Unknown metric '{metric}'");
            };
            session.set_metric_score(id, key, score).await?;
        }
        Command::Remove { id } => session.remove_entity(id).await?,
        Command::Client { name, industry } => session.set_client(name, industry).await?,
        Command::SetKey { key } => {
            if key.trim().is_empty() {
                bail!("API key must not be empty");
            }
            session.set_api_key(&key).await?;
            if let Some(path) = &config_path {
                if let Err(e) = sync_seo_key_to_toml(key.trim(), path) {
                    warn!("Could not write API key to {}: {}", path.display(), e);
                }
            }
            println!("API key saved");
        }
        Command::Show { json, id: None } => print_audit(&session, json)?,
        Command::Show { id: Some(id), .. } => print_competitor(&session, id)?,
        Command::History { load, remove } => {
            if let Some(index) = load {
                session.load_from_history(index).await?;
                println!("Loaded snapshot {index}");
            } else if let Some(index) = remove {
                session.remove_from_history(index).await?;
                println!("Removed snapshot {index}");
            } else {
                for (index, audit) in session.history().iter().enumerate() {
                    println!(
                        "{index:>2}  {}  {} ({} competitors)",
                        audit.last_updated.format("%Y-%m-%d %H:%M"),
                        audit.client_name,
                        audit.competitors.len()
                    );
                }
            }
        }
        Command::New => {
            session.new_analysis().await?;
            println!("Started a new analysis");
        }
    }

    Ok(())
}

/// Fill in the SEO credential from environment or TOML when the store has none
async fn adopt_seo_key(session: &mut AuditSession, toml_config: &TomlConfig) -> Result<()> {
    match resolve_seo_api_key(session.current(), toml_config) {
        Ok(key) if key != session.current().api_key => session.set_api_key(&key).await?,
        Ok(_) => {}
        Err(e) => info!("{}", e),
    }
    Ok(())
}

async fn run_sync(session: &mut AuditSession, toml_config: &TomlConfig, id: Option<Uuid>) -> Result<()> {
    let providers = Providers::from_config(toml_config, resolve_ai_api_key(toml_config))
        .context("Failed to build provider clients")?;
    let events = EventBus::new(100);
    let mut rx = events.subscribe();
    let orchestrator = SyncOrchestrator::new(providers, events)?;

    let printer = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(SyncEvent::EntityStarted { name, .. }) => println!("Syncing {name}..."),
                Ok(SyncEvent::EntityFailed { message, .. }) => println!("  failed: {message}"),
                Ok(SyncEvent::EntitySkipped { reason, .. }) => println!("  skipped: {reason}"),
                Ok(SyncEvent::Progress { percentage, .. }) => println!("  [{percentage:>3}%]"),
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = match id {
        Some(id) => orchestrator.sync_one(session, id).await.map(|outcome| match outcome {
            SyncOutcome::Updated(c) => println!("{}: {}/1000", c.name, c.total_score),
            SyncOutcome::NothingToDo(reason) => println!("Nothing to do: {reason}"),
            SyncOutcome::Failed(message) => println!("Sync failed: {message}"),
        }),
        None => orchestrator.sync_batch(session).await.map(|report| {
            println!(
                "Synced {}, failed {}, skipped {}",
                report.synced(),
                report.failed(),
                report.skipped()
            );
            for failure in report.failures() {
                println!("  {} ({})", failure.name, failure.id);
            }
        }),
    };

    // Closing the bus lets the printer drain and exit
    drop(orchestrator);
    if let Err(e) = printer.await {
        warn!("Progress printer task failed: {}", e);
    }

    match result {
        Err(SyncError::MissingCredential) => bail!(
            "SEO API key not configured; run `compethink set-key <key>` or set COMPETHINK_SEO_API_KEY"
        ),
        other => other.map_err(Into::into),
    }
}

fn print_audit(session: &AuditSession, json: bool) -> Result<()> {
    let audit = session.current();
    let summary = summarize(audit);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{} ({})", audit.client_name, audit.industry);
    println!(
        "Competitors: {}  average score: {}/1000  average traffic: {}",
        summary.competitor_count, summary.average_score, summary.average_traffic
    );
    for (rank, competitor) in ranking(audit).iter().enumerate() {
        println!(
            "{:>2}. {:<24} {:>4}  {:<28} {}",
            rank + 1,
            competitor.name,
            competitor.total_score,
            competitor.domain,
            competitor.id
        );
    }
    for (cluster, average) in cluster_averages(audit) {
        println!("  {cluster:<20} {average:>3}");
    }
    if let Some(branded) = most_branded(audit) {
        println!("Most branded: {} ({}%)", branded.name, branded.branded_share);
    }
    Ok(())
}

fn print_competitor(session: &AuditSession, id: Uuid) -> Result<()> {
    let Some(competitor) = session.current().competitor(id) else {
        bail!("Competitor not found: {id}");
    };

    println!("{} ({})  {}/1000", competitor.name, competitor.domain, competitor.total_score);
    for cluster in &competitor.clusters {
        println!("{} [weight {}]  {}", cluster.name, cluster.weight, cluster.avg_score);
        for metric in &cluster.metrics {
            let description = metric.key.description();
            let bucket = metric
                .key
                .scale()
                .and_then(|scale| scale.label_for(metric.score))
                .map(|label| format!(" ({label})"))
                .unwrap_or_default();
            println!("  {:<22} {:>3}{bucket}", metric.name(), metric.score);
            println!("      {} [{}]", description.summary, description.source);
        }
    }
    Ok(())
}
