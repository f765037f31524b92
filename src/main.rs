use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use agent_portal::{
    AgentClient, AgentRegistry, AskPayload, ClientConfig, Config, HttpConfigSource,
};

/// Agent Portal - query and inspect registered agents
#[derive(Parser, Debug)]
#[command(name = "agent-portal")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to ~/.config/agent-portal/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration service URL, overrides [registry] url
    #[arg(long, env = "AGENT_PORTAL_REGISTRY_URL")]
    registry_url: Option<String>,

    /// Bearer token for agents and the configuration service
    #[arg(long, env = "AGENT_PORTAL_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log file path
    #[arg(long, default_value = "/tmp/agent-portal.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List active agents in display order
    Agents,
    /// Probe /metadata for one agent, or all of them
    Health {
        alias: Option<String>,
    },
    /// Ask one or more agents and print the merged answer as JSON
    Ask {
        /// Agent alias; repeat to fan out
        #[arg(short, long = "agent", required = true)]
        agents: Vec<String>,
        #[arg(short, long)]
        prompt: String,
        #[arg(long)]
        session_id: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
        /// Override the configured retry budget
        #[arg(long)]
        retries: Option<u32>,
    },
    /// Print an agent's /data listing
    Data {
        alias: String,
    },
}

fn build_registry(config: &Config, client_config: &ClientConfig) -> Result<AgentRegistry> {
    match config.registry.url {
        Some(ref url) => Ok(AgentRegistry::new(HttpConfigSource::new(url, client_config)?)),
        None => Ok(AgentRegistry::from_agents(config.registry.agents.clone())),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env files (local first, then home directory)
    // Errors are ignored - files are optional
    let _ = dotenvy::from_filename(".env");
    if let Some(home) = dirs::home_dir() {
        let _ = dotenvy::from_path(home.join(".env"));
    }

    let args = Args::parse();

    // Set up file-based logging
    let log_file = std::fs::File::create(&args.log_file)
        .with_context(|| format!("Failed to create log file: {}", args.log_file.display()))?;
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,agent_portal=debug")),
        )
        .with(fmt::layer().with_writer(log_file).with_ansi(false))
        .init();

    // Load configuration
    let mut config = match args.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Apply CLI overrides
    if let Some(url) = args.registry_url {
        config.registry.url = Some(url);
    }
    if let Some(token) = args.token {
        config.client.bearer_token = Some(token);
    }

    let mut client_config = ClientConfig::from_config(&config);
    if let Command::Ask {
        retries: Some(retries),
        ..
    } = args.command
    {
        client_config.max_retries = retries;
    }
    let registry = Arc::new(build_registry(&config, &client_config)?);
    let client = AgentClient::new(registry.clone(), client_config)?;

    match args.command {
        Command::Agents => {
            for agent in registry.active().await? {
                println!(
                    "{:<20} {:<12} {}",
                    agent.alias,
                    format!("{:?}", agent.kind()).to_lowercase(),
                    agent.domain_url.as_deref().unwrap_or(&agent.base_url)
                );
            }
        }
        Command::Health { alias: Some(alias) } => {
            print_json(&client.check_health(&alias).await)?;
        }
        Command::Health { alias: None } => {
            print_json(&client.check_all().await?)?;
        }
        Command::Ask {
            agents,
            prompt,
            session_id,
            user_id,
            ..
        } => {
            let payload = AskPayload {
                session_id: Some(session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string())),
                user_id,
                ..AskPayload::new(prompt)
            };
            let synthesizer = config.synthesis.synthesizer();
            let answer = client.turn(&agents, &payload, &synthesizer).await;
            print_json(&answer)?;
        }
        Command::Data { alias } => {
            print_json(&client.data(&alias).await?)?;
        }
    }

    Ok(())
}
