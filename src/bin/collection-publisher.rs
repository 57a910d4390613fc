//! Collection Publisher CLI
//!
//! Publishes DOI collections to the catalog and manages their membership

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use collection_publisher::core::{CONFIG_FILENAME, ConfigLoadOptions, ConfigLoader};
use collection_publisher::{
    Collaborators, CollectionError, Database, DoiUpdate, HttpArtifactStore, HttpCatalogClient,
    ManifestArtifactStore, MemoryArtifactStore, MembershipService, NewCollection,
    OrchestratorOptions, PublicationOrchestrator, PublishRequest, ServiceConfig, UserProfile,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Publish DOI collections to the catalog
#[derive(Parser)]
#[command(name = "collection-publisher")]
#[command(version)]
#[command(about = "Publish DOI collections to the catalog", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = CONFIG_FILENAME)]
    config: PathBuf,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema, optionally seeding users and collections
    InitDb {
        /// YAML file with `users` and `collections` to insert
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Publish a collection
    Publish {
        #[arg(long)]
        collection: String,

        #[arg(long)]
        user: String,

        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Withdraw a published collection
    Unpublish {
        #[arg(long)]
        collection: String,

        #[arg(long)]
        user: String,
    },

    /// Show the publish status of a collection
    Status {
        #[arg(long)]
        collection: String,

        #[arg(long)]
        user: String,
    },

    /// Add or remove DOIs
    UpdateDois {
        #[arg(long)]
        collection: String,

        #[arg(long)]
        user: String,

        #[arg(long, num_args = 1..)]
        add: Vec<String>,

        #[arg(long, num_args = 1..)]
        remove: Vec<String>,
    },
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Seed {
    users: Vec<UserProfile>,
    collections: Vec<NewCollection>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli).await {
        Ok(()) => process::exit(0),
        Err(e) => {
            match e.downcast_ref::<CollectionError>() {
                Some(error) => eprintln!("error[{}]: {}", error.code(), error),
                None => eprintln!("error: {:#}", e),
            }
            process::exit(1);
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ConfigLoader::load(ConfigLoadOptions::from_process_env(&cli.config))
        .await
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let database = Arc::new(Database::open(&config.database_path)?);

    match cli.command {
        Commands::InitDb { seed } => init_db_command(&database, seed).await,
        Commands::Publish {
            collection,
            user,
            timeout_secs,
        } => {
            let mut request = PublishRequest::new(collection, user);
            if let Some(secs) = timeout_secs {
                request = request.with_timeout(Duration::from_secs(secs));
            }
            let report = orchestrator(&config, database)?.publish(request).await?;
            print_json(&report)
        }
        Commands::Unpublish { collection, user } => {
            let report = orchestrator(&config, database)?
                .unpublish(PublishRequest::new(collection, user))
                .await?;
            print_json(&report)
        }
        Commands::Status { collection, user } => {
            let status = orchestrator(&config, database)?
                .publish_status(&collection, &user)
                .await?;
            print_json(&status)
        }
        Commands::UpdateDois {
            collection,
            user,
            add,
            remove,
        } => {
            let catalog = Arc::new(HttpCatalogClient::from_config(&config.catalog)?);
            let service = MembershipService::new(
                database,
                catalog,
                config.doi_prefix.clone(),
                OrchestratorOptions::from_config(&config).retry,
                Duration::from_secs(config.saga.step_timeout_secs),
            );
            let diff = service
                .update_dois(&collection, &user, DoiUpdate { add, remove })
                .await?;
            print_json(&diff)
        }
    }
}

async fn init_db_command(database: &Database, seed: Option<PathBuf>) -> Result<()> {
    let Some(path) = seed else {
        println!("database ready");
        return Ok(());
    };

    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let seed: Seed = serde_yaml::from_str(&content)?;

    for user in seed.users {
        database.upsert_user(user).await?;
    }
    for collection in seed.collections {
        let created = database.create_collection(collection).await?;
        println!("created collection {} (id {})", created.node_id, created.id);
    }

    Ok(())
}

fn orchestrator(config: &ServiceConfig, database: Arc<Database>) -> Result<PublicationOrchestrator> {
    let artifacts: Arc<dyn ManifestArtifactStore> = if config.artifacts.is_remote() {
        Arc::new(HttpArtifactStore::from_config(&config.artifacts)?)
    } else {
        warn!("artifacts.base_url is empty, manifests are kept in memory only");
        Arc::new(MemoryArtifactStore::new())
    };

    let collaborators = Collaborators {
        status: database.clone(),
        collections: database.clone(),
        users: database,
        catalog: Arc::new(HttpCatalogClient::from_config(&config.catalog)?),
        artifacts,
    };

    Ok(PublicationOrchestrator::new(
        collaborators,
        OrchestratorOptions::from_config(config),
    ))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
