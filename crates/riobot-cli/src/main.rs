mod console;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use riobot_config::RioBotConfig;
use riobot_cron::{JobStore, Scheduler, SchedulerOptions};
use riobot_reminder::{GroupSettings, PermissionPolicy, ReminderService};
use riobot_storage::BotStorage;
use riobot_types::{GroupId, Role, UserId};

use console::{ConsoleSession, ConsoleTransport};

#[derive(Parser)]
#[command(name = "riobot", about = "Group reminder bot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the reminder bot with an interactive console session
    Run {
        /// Config file (defaults to ~/.riobot/config.json5)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Group the console starts in
        #[arg(short, long, default_value_t = 10000)]
        group: GroupId,

        /// User the console speaks as
        #[arg(short, long, default_value_t = 10001)]
        user: UserId,

        /// Group role of the console user (member, admin, owner)
        #[arg(short, long, default_value = "member")]
        role: Role,

        /// User id of the bot; a leading `[CQ:at,qq=<id>]` addresses it
        #[arg(long, default_value_t = 20000)]
        self_id: UserId,
    },
    /// List persisted jobs
    Jobs {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Check system health
    Health,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            group,
            user,
            role,
            self_id,
        } => {
            let config = load(config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run(config, ConsoleSession::new(self_id, group, user, role)))?;
        }
        Commands::Jobs { config } => {
            let config = load(config.as_deref())?;
            let store = JobStore::open(&database_path(&config)?)?;
            let jobs = store.list_jobs()?;
            if jobs.is_empty() {
                println!("No persisted jobs");
            }
            for job in jobs {
                println!("{}  {}  {}", job.id, job.trigger, job.callback);
            }
        }
        Commands::Health => {
            println!("riobot is healthy");
            let config = riobot_config::load_config().unwrap_or_default();
            println!("  superusers: {}", config.superusers.len());
            println!("  command prefixes: {:?}", config.command_start);
            match config.database_path() {
                Ok(path) => println!("  database: {}", path.display()),
                Err(e) => println!("  database: unavailable ({e})"),
            }
            println!(
                "  misfire grace: {}s",
                config.scheduler.misfire_grace_secs
            );
            println!(
                "  persist group settings: {}",
                config.reminder.persist_group_settings
            );
        }
    }

    Ok(())
}

fn load(path: Option<&Path>) -> anyhow::Result<RioBotConfig> {
    let config = match path {
        Some(path) => riobot_config::load_config_at(path),
        None => {
            riobot_config::ensure_config_dir().context("Failed to create config directory")?;
            riobot_config::load_config()
        }
    };
    config.context("Failed to load config")
}

/// Resolve the database path and make sure its directory exists.
fn database_path(config: &RioBotConfig) -> anyhow::Result<PathBuf> {
    let path = config.database_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(path)
}

async fn run(config: RioBotConfig, session: ConsoleSession) -> anyhow::Result<()> {
    let db_path = database_path(&config)?;
    let store = Arc::new(JobStore::open(&db_path)?);
    let settings = if config.reminder.persist_group_settings {
        GroupSettings::persistent(Arc::new(BotStorage::open(&db_path)?))
    } else {
        GroupSettings::in_memory()
    };

    let scheduler = Arc::new(Scheduler::new(
        store,
        SchedulerOptions {
            misfire_grace: Duration::from_secs(config.scheduler.misfire_grace_secs),
        },
    ));
    let service = ReminderService::new(
        scheduler,
        settings,
        PermissionPolicy::new(config.superusers.iter().copied()),
        config.command_start.clone(),
        Arc::new(ConsoleTransport),
    )
    .await;

    let report = service.startup().await?;
    println!(
        "riobot started ({} reminders recovered, {} skipped)",
        report.recovered, report.skipped
    );

    let result = console::run_console(&service, session).await;
    service.shutdown().await;
    result
}
