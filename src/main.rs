mod doctor;

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vitrine_agent::IntentionWorkflow;
use vitrine_catalog::{bundled_fixture, ComboPolicy, SqliteCatalog};
use vitrine_core::config::AppConfig;
use vitrine_core::traits::{Catalog, LlmClient};

#[derive(Parser)]
#[command(name = "vitrine", version, about = "Product catalog chat assistant")]
struct Cli {
    /// Path to config file (default: ./vitrine.toml, then ~/.vitrine/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and print the reply
    Ask {
        /// Print the reply as JSON instead of text
        #[arg(long)]
        json: bool,
        /// The message (read from stdin when omitted)
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
    /// Start the HTTP gateway
    Serve,
    /// Load the bundled product catalog
    Seed {
        /// Delete every product and tag first
        #[arg(long)]
        reset: bool,
    },
    /// List catalog tags
    Tags,
    /// Show current configuration
    Config,
    /// Run system health checks
    Doctor,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vitrine=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "vitrine", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Completions { .. } => {}
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Doctor => {
            println!("Vitrine Doctor");
            println!("==============");
            doctor::run_doctor(&config);
        }
        Commands::Seed { reset } => {
            let catalog = open_catalog(&config)?;
            if reset {
                catalog.reset()?;
            }
            let inserted = catalog.insert_products(&bundled_fixture()?)?;
            println!(
                "Seeded {} products into {}",
                inserted,
                config.database_path().display()
            );
        }
        Commands::Tags => {
            let catalog = open_catalog(&config)?;
            let tags = catalog.all_tags().await?;
            if tags.is_empty() {
                println!("No tags. Run `vitrine seed` to load the bundled catalog.");
            }
            for tag in tags {
                println!("{}", tag);
            }
        }
        Commands::Ask { json, message } => {
            let mut text = message.join(" ");
            if text.trim().is_empty() {
                let stdin = io::stdin();
                text = stdin
                    .lock()
                    .lines()
                    .map_while(|l| l.ok())
                    .collect::<Vec<_>>()
                    .join("\n");
            }
            if text.trim().is_empty() {
                anyhow::bail!("nothing to ask: pass a message or pipe one on stdin");
            }

            let workflow = build_workflow(&config)?;
            let reply = workflow.respond(text.trim()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reply)?);
            } else {
                print!("{}", reply.render_text());
            }
        }
        Commands::Serve => {
            let workflow = Arc::new(build_workflow(&config)?);
            info!(bind = %config.gateway.bind, "Starting HTTP gateway");
            let server = vitrine_gateway::GatewayServer::new(config.gateway.clone(), workflow);
            let cancel = tokio_util::sync::CancellationToken::new();
            let cancel_clone = cancel.clone();

            // Graceful shutdown on Ctrl-C
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Shutting down gateway...");
                cancel_clone.cancel();
            });

            server.run(cancel).await?;
        }
    }

    Ok(())
}

/// An explicit `--config` must exist. Otherwise fall back through the
/// usual locations to the local Ollama defaults.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    if let Some(path) = explicit {
        return Ok(AppConfig::load(path)?);
    }

    let local = PathBuf::from("vitrine.toml");
    if local.exists() {
        return Ok(AppConfig::load(&local)?);
    }

    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        let path = home.join(".vitrine").join("config.toml");
        if path.exists() {
            info!(path = %path.display(), "Loading config from home directory");
            return Ok(AppConfig::load(&path)?);
        }
    }

    eprintln!("Warning: No config file found. Using a local Ollama model and the bundled catalog.");
    Ok(AppConfig::default_for_ollama())
}

fn open_catalog(config: &AppConfig) -> anyhow::Result<SqliteCatalog> {
    let catalog = SqliteCatalog::open(&config.database_path())?
        .with_policy(ComboPolicy::from(&config.workflow));
    if config.catalog.seed_on_start {
        catalog.seed_if_empty()?;
    }
    Ok(catalog)
}

fn build_workflow(config: &AppConfig) -> anyhow::Result<IntentionWorkflow> {
    let llm: Arc<dyn LlmClient> = Arc::from(vitrine_llm::create_client(&config.model)?);
    let catalog: Arc<dyn Catalog> = Arc::new(open_catalog(config)?);
    Ok(IntentionWorkflow::from_config(config, llm, catalog)?)
}
