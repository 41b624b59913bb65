//! Command-line front end for lead-context.
//!
//! Reads a conversation as a JSON array of `{"role", "content"}` objects and
//! prints JSON results on stdout. Logs go to stderr and are controlled by
//! `RUST_LOG` (default `warn`).
//!
//! # Examples
//!
//! ```sh
//! # Assemble model-ready history for a session
//! leadctx optimize --input history.json --system-prompt "You are a consultant." --session s1
//!
//! # Infer a visitor's role
//! leadctx detect-role --title "Chief Technology Officer"
//!
//! # Full lead assessment from stdin
//! cat history.json | leadctx assess --seniority "VP Engineering"
//! ```

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};
use lead_context::config::conversation_from_json;
use lead_context::prelude::*;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Conversation context optimization and lead intelligence.
#[derive(Parser)]
#[command(name = "leadctx", version)]
struct Cli {
    /// JSON file with optimizer settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble the bounded part list for one model call.
    #[command(group(
        ArgGroup::new("prompt")
            .required(true)
            .args(["system_prompt", "system_prompt_file"])
    ))]
    Optimize {
        /// Conversation JSON file, or `-` for stdin.
        #[arg(long, default_value = "-")]
        input: String,

        /// System prompt text.
        #[arg(long)]
        system_prompt: Option<String>,

        /// File holding the system prompt.
        #[arg(long)]
        system_prompt_file: Option<PathBuf>,

        /// Session identifier used as the cache key.
        #[arg(long, default_value = "cli")]
        session: String,

        /// Token budget for history; defaults to the configured value.
        #[arg(long)]
        max_history_tokens: Option<usize>,
    },

    /// Infer a professional role from research signals.
    DetectRole {
        #[command(flatten)]
        signal: SignalArgs,
    },

    /// Role, intent, stage and ranked suggestions for a visitor.
    Assess {
        /// Conversation JSON file, or `-` for stdin.
        #[arg(long, default_value = "-")]
        input: String,

        #[command(flatten)]
        signal: SignalArgs,

        /// Maximum number of suggestions.
        #[arg(long, default_value_t = 3)]
        max_suggestions: usize,
    },
}

#[derive(Args)]
struct SignalArgs {
    /// Stated job title.
    #[arg(long)]
    title: Option<String>,

    /// Seniority label.
    #[arg(long)]
    seniority: Option<String>,

    /// Short description of the visitor's company.
    #[arg(long)]
    company_summary: Option<String>,

    /// Company industry.
    #[arg(long)]
    industry: Option<String>,
}

impl SignalArgs {
    /// `None` when no flag was given, so detection reports `Unknown`.
    fn into_signal(self) -> Option<RoleSignal> {
        let signal = RoleSignal {
            company_summary: self.company_summary,
            company_industry: self.industry,
            person_role_text: self.title,
            person_seniority: self.seniority,
        };
        (!signal.is_empty()).then_some(signal)
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<String, ConfigError> {
    let config = match &cli.config {
        Some(path) => OptimizerConfig::from_json_file(path)?,
        None => OptimizerConfig::default(),
    };

    match cli.command {
        Command::Optimize {
            input,
            system_prompt,
            system_prompt_file,
            session,
            max_history_tokens,
        } => {
            let messages = read_conversation(&input).await?;
            // clap guarantees exactly one of the two.
            let system_prompt = match (system_prompt, system_prompt_file) {
                (Some(text), _) => text,
                (None, Some(path)) => read_text(&path.display().to_string()).await?,
                (None, None) => String::new(),
            };
            let optimizer = ContextOptimizer::with_config(config);
            let content =
                optimizer.optimize(&messages, &system_prompt, &session, max_history_tokens);
            to_json(&content, cli.pretty)
        }
        Command::DetectRole { signal } => {
            let result = detect_role(signal.into_signal().as_ref());
            to_json(&result, cli.pretty)
        }
        Command::Assess {
            input,
            signal,
            max_suggestions,
        } => {
            let messages = read_conversation(&input).await?;
            let engine = StaticSuggestionEngine::default().with_max_suggestions(max_suggestions);
            let assessment = assess_lead(signal.into_signal().as_ref(), &messages, &engine);
            to_json(&assessment, cli.pretty)
        }
    }
}

/// Read a file, or stdin when `path` is `-`.
async fn read_text(path: &str) -> Result<String, ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_string(),
        source,
    };
    if path == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .map_err(io_err)?;
        Ok(buf)
    } else {
        tokio::fs::read_to_string(path).await.map_err(io_err)
    }
}

async fn read_conversation(input: &str) -> Result<Vec<ConversationMessage>, ConfigError> {
    conversation_from_json(&read_text(input).await?)
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, ConfigError> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimize_requires_a_system_prompt() {
        assert!(Cli::try_parse_from(["leadctx", "optimize"]).is_err());
        assert!(Cli::try_parse_from(["leadctx", "optimize", "--system-prompt", "Be brief."]).is_ok());
        assert!(
            Cli::try_parse_from([
                "leadctx",
                "optimize",
                "--system-prompt",
                "Be brief.",
                "--system-prompt-file",
                "prompt.txt",
            ])
            .is_err()
        );
    }

    #[tokio::test]
    async fn missing_input_is_io_error() {
        let err = read_conversation("/definitely/not/here.json").await.unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[tokio::test]
    async fn malformed_input_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"{not json").unwrap();
        let path = file.path().display().to_string();
        let err = read_conversation(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
