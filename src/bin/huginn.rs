//! huginn: command-line front end for the AI request adapter.
//!
//! Reads an [`AdapterConfig`](huginn::AdapterConfig), builds an HTTP-backed
//! adapter and runs a single operation, printing the result as JSON.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use huginn::{AdapterBuilder, AdapterConfig, Message, Priority, Provider, RequestConfig};

/// Huginn AI request adapter
#[derive(Parser)]
#[command(name = "huginn")]
#[command(version = huginn::PKG_VERSION)]
#[command(about = "Model routing, caching and cost accounting for LLM backends")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "HUGINN_CONFIG", default_value = "huginn.toml")]
    config: PathBuf,

    /// Tenant the request is made for (overrides the configured default).
    #[arg(short, long, global = true)]
    tenant: Option<String>,

    #[command(flatten)]
    request: RequestArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct RequestArgs {
    /// Explicit model id (skips selection).
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Selection priority.
    #[arg(short, long, global = true)]
    priority: Option<PriorityArg>,

    /// Restrict selection to one provider.
    #[arg(long, global = true)]
    provider: Option<ProviderArg>,

    /// Bypass the response cache.
    #[arg(long, global = true)]
    no_cache: bool,

    /// Disable the fallback hop to the baseline model.
    #[arg(long, global = true)]
    no_fallback: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PriorityArg {
    Speed,
    Accuracy,
    Cost,
    Balanced,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Openai,
    Anthropic,
    Local,
    Auto,
}

#[derive(Subcommand)]
enum Command {
    /// Complete a prompt
    Generate {
        /// Prompt text (or omit to read from stdin)
        prompt: Option<String>,
    },

    /// Send a one-turn conversation
    Chat {
        /// User message (or omit to read from stdin)
        message: Option<String>,
        /// Optional system message
        #[arg(short, long)]
        system: Option<String>,
    },

    /// Analyze JSON data read from stdin
    Analyze {
        /// What to do with the data
        task: String,
    },

    /// Show usage statistics
    Stats {
        /// Window start (RFC 3339)
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        /// Window end (RFC 3339)
        #[arg(long)]
        until: Option<DateTime<Utc>>,
    },
}

impl RequestArgs {
    fn to_config(&self, tenant: Option<String>) -> RequestConfig {
        let mut config = RequestConfig::new();
        if let Some(model) = &self.model {
            config = config.model(model);
        }
        if let Some(priority) = self.priority {
            config = config.priority(match priority {
                PriorityArg::Speed => Priority::Speed,
                PriorityArg::Accuracy => Priority::Accuracy,
                PriorityArg::Cost => Priority::Cost,
                PriorityArg::Balanced => Priority::Balanced,
            });
        }
        if let Some(provider) = self.provider {
            config = config.provider(match provider {
                ProviderArg::Openai => Provider::OpenAi,
                ProviderArg::Anthropic => Provider::Anthropic,
                ProviderArg::Local => Provider::Local,
                ProviderArg::Auto => Provider::Auto,
            });
        }
        if self.no_cache {
            config = config.caching(false);
        }
        if self.no_fallback {
            config = config.fallback(false);
        }
        if let Some(tenant) = tenant {
            config = config.tenant(tenant);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config = AdapterConfig::load(&args.config)?;
    if config.backend.is_none() {
        return Err("config has no [backend] section".into());
    }
    let adapter = AdapterBuilder::from_config(&config)?.build()?;
    let request = args.request.to_config(args.tenant.clone());

    let output = match args.command {
        Command::Generate { prompt } => {
            let prompt = resolve_text(prompt, "generate")?;
            serde_json::to_string_pretty(&adapter.generate(&prompt, &request).await?)?
        }
        Command::Chat { message, system } => {
            let mut messages = Vec::new();
            if let Some(system) = system {
                messages.push(Message::system(system));
            }
            messages.push(Message::user(resolve_text(message, "chat")?));
            serde_json::to_string_pretty(&adapter.chat(&messages, &request).await?)?
        }
        Command::Analyze { task } => {
            let raw = resolve_text(None, "analyze")?;
            let data: serde_json::Value = serde_json::from_str(&raw)?;
            serde_json::to_string_pretty(&adapter.analyze(&data, &task, &request).await?)?
        }
        Command::Stats { since, until } => {
            let stats = match &args.tenant {
                Some(tenant) => adapter.get_tenant_usage_stats(tenant, since, until).await?,
                None => adapter.get_usage_stats(since, until).await?,
            };
            serde_json::to_string_pretty(&stats)?
        }
    };

    adapter.flush_usage().await;
    println!("{output}");
    Ok(())
}

/// Resolve text input from an optional CLI argument and/or stdin.
///
/// - arg only → arg
/// - stdin only → stdin
/// - both → `"{arg}\n\n{stdin}"`
/// - neither → error
fn resolve_text(arg: Option<String>, command: &str) -> Result<String, Box<dyn std::error::Error>> {
    let stdin_text = if io::stdin().is_terminal() {
        None
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    };

    match (arg, stdin_text) {
        (Some(a), Some(s)) => Ok(format!("{a}\n\n{s}")),
        (Some(a), None) => Ok(a),
        (None, Some(s)) => Ok(s),
        (None, None) => {
            Err(format!("{command}: no input provided (pass text as argument or via stdin)").into())
        }
    }
}
