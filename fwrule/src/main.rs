//! fwrule: manage zone firewall rules from declared JSON files.
//!
//! Each command runs one lifecycle operation:
//! - create/update push a declared rule and mirror what the service stored
//! - read refreshes local state and drops it if the rule vanished
//! - delete removes the remote rule
//! - import adopts an existing rule by `<zone_id>/<rule_id>`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fwrule::{DesiredRule, LocalState, ReconcilerConfig, RuleAgent};

/// Zone firewall rule reconciler
#[derive(Parser, Debug)]
#[command(name = "fwrule", version, about)]
struct Args {
    /// Directory holding local rule states and the service snapshot
    #[arg(long, env = "FWRULE_STATE_DIR", default_value = ".fwrule")]
    state_dir: PathBuf,

    /// Treat deleting an already deleted rule as success
    #[arg(long, env = "FWRULE_IDEMPOTENT_DELETE")]
    idempotent_delete: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a rule from a JSON declaration
    Create {
        /// Local name for the rule
        name: String,

        /// Path to the rule declaration
        #[arg(long)]
        rule: PathBuf,
    },

    /// Refresh a rule from the service
    Read {
        /// Local name for the rule
        name: String,
    },

    /// Replace a rule with a new JSON declaration
    Update {
        /// Local name for the rule
        name: String,

        /// Path to the rule declaration
        #[arg(long)]
        rule: PathBuf,
    },

    /// Delete a rule
    Delete {
        /// Local name for the rule
        name: String,
    },

    /// Adopt an existing rule
    Import {
        /// Local name for the rule
        name: String,

        /// Import id in the form <zone_id>/<rule_id>
        id: String,
    },

    /// Print the recorded state of a rule
    Show {
        /// Local name for the rule
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fwrule=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = ReconcilerConfig {
        idempotent_delete: args.idempotent_delete,
    };
    let agent = RuleAgent::open(&args.state_dir, config).await?;

    match args.command {
        Command::Create { name, rule } => {
            let desired = read_rule(&rule).await?;
            let state = agent.create(&name, &desired).await?;
            print_state(&state)?;
        }
        Command::Read { name } => match agent.read(&name).await? {
            Some(state) => print_state(&state)?,
            None => info!("Rule {} is gone; local state removed", name),
        },
        Command::Update { name, rule } => {
            let desired = read_rule(&rule).await?;
            match agent.update(&name, &desired).await? {
                Some(state) => print_state(&state)?,
                None => info!("Rule {} is gone; local state removed", name),
            }
        }
        Command::Delete { name } => agent.delete(&name).await?,
        Command::Import { name, id } => {
            let state = agent.import(&name, &id).await?;
            print_state(&state)?;
        }
        Command::Show { name } => {
            let state = agent.show(&name).await?;
            print_state(&state)?;
        }
    }

    Ok(())
}

async fn read_rule(path: &Path) -> Result<DesiredRule> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read rule file {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("Invalid rule declaration in {}", path.display()))
}

fn print_state(state: &LocalState) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(state)?);
    Ok(())
}
