//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use debate_coordination::debate::ParticipantSpec;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Run structured multi-agent debates", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short, default_value = "debate.toml")]
    pub config: PathBuf,

    /// Log at debug level unless RUST_LOG is set
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a debate and run it to completion
    Run(RunArgs),
    /// Validate the configuration and probe the gateway
    Check,
    /// List configured agents
    Agents,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Display title
    #[arg(long)]
    pub title: String,

    /// Question or prompt under debate
    #[arg(long)]
    pub task: String,

    /// Participant as `agent_id` or `agent_id:role`, in speaking order
    #[arg(long = "agent", value_parser = parse_participant, required = true)]
    pub agents: Vec<ParticipantSpec>,

    /// Turns per agent (defaults to `[debate].max_turns_per_agent`)
    #[arg(long)]
    pub turns: Option<u32>,

    /// Channel the debate belongs to
    #[arg(long, default_value = "cli")]
    pub channel: String,

    /// User recorded as the creator
    #[arg(long, default_value = "cli")]
    pub user: String,

    /// Summarize the transcript once the debate completes
    #[arg(long, default_value_t = false)]
    pub summarize: bool,

    /// Write a JSON checkpoint of the session here when done
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,
}

/// Parse `agent_id[:role]`.
pub fn parse_participant(raw: &str) -> Result<ParticipantSpec, String> {
    let (id, role) = match raw.split_once(':') {
        Some((id, role)) => (id.trim(), Some(role.trim())),
        None => (raw.trim(), None),
    };
    if id.is_empty() {
        return Err(format!("missing agent id in {:?}", raw));
    }
    match role {
        Some("") => Err(format!("empty role in {:?}", raw)),
        Some(role) => Ok(ParticipantSpec::new(id).with_role(role)),
        None => Ok(ParticipantSpec::new(id)),
    }
}
