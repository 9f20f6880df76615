use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use debate_agents::cli::{Cli, Command, RunArgs};
use debate_agents::config::AppConfig;
use debate_agents::gateway::GatewayResponder;
use debate_agents::telemetry::{init_tracing, LoggingNotifier};
use debate_coordination::events::FilteredReceiver;
use debate_coordination::{
    CreateDebate, DebateEvent, DebateOrchestrator, EventBus, EventBusExt, EventBusNotifier,
    EventFilter, InMemorySessionStore,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = AppConfig::load(&cli.config)?;
    match cli.command {
        Command::Run(args) => run(&config, args).await,
        Command::Check => check(&config).await,
        Command::Agents => {
            list_agents(&config);
            Ok(())
        }
    }
}

async fn run(config: &AppConfig, args: RunArgs) -> Result<()> {
    let registry = config.registry()?.shared();
    let responder = GatewayResponder::new(config.gateway.clone(), registry.clone())
        .context("Failed to build gateway client")?;
    let store = InMemorySessionStore::new().shared();
    let bus = EventBus::new().shared();
    let notifier = LoggingNotifier::new(Arc::new(EventBusNotifier::new(bus.clone())));

    let orchestrator = DebateOrchestrator::new(
        store.clone(),
        Arc::new(responder),
        Arc::new(notifier),
        registry,
        config.debate_config(),
    );

    let session = orchestrator
        .create(CreateDebate {
            title: args.title,
            task: args.task,
            participants: args.agents,
            max_turns_per_agent: args.turns.unwrap_or(config.debate.max_turns_per_agent),
            created_by: args.user,
            channel_id: args.channel,
        })
        .await
        .context("Failed to create debate")?;
    info!(session_id = %session.id, "{}", session.status_line());

    let view = orchestrator.get_session(&session.id).await?;
    let labels: Vec<(String, String)> = view
        .participants
        .iter()
        .map(|p| (p.id.clone(), p.label()))
        .collect();
    let printer = tokio::spawn(print_progress(
        bus.subscribe_filtered(EventFilter::new().session(&session.id)),
        labels,
    ));

    if let Err(e) = orchestrator.run_to_completion(&session.id).await {
        printer.abort();
        let view = orchestrator.get_session(&session.id).await?;
        warn!(session_id = %session.id, "{}", view.session.status_line());
        return Err(e).context("Debate did not complete");
    }
    orchestrator.flush_notifications().await;
    if let Err(e) = printer.await {
        warn!(error = %e, "Progress printer stopped");
    }

    if args.summarize {
        let summary = orchestrator
            .summarize(&session.id)
            .await
            .context("Failed to summarize debate")?;
        println!("\n## Summary\n\n{}", summary);
    }

    if let Some(path) = &args.checkpoint {
        let json = store.export(&session.id).await?.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write checkpoint {}", path.display()))?;
        info!(path = %path.display(), "Checkpoint written");
    }

    let view = orchestrator.get_session(&session.id).await?;
    info!(session_id = %session.id, "{}", view.session.status_line());
    Ok(())
}

/// Print turns as they arrive until the session reaches a terminal status.
async fn print_progress(mut events: FilteredReceiver, labels: Vec<(String, String)>) {
    loop {
        match events.recv().await {
            Ok(DebateEvent::TurnCreated(turn)) => {
                let speaker = labels
                    .iter()
                    .find(|(id, _)| *id == turn.participant_id)
                    .map(|(_, label)| label.as_str())
                    .unwrap_or(turn.agent_id.as_str());
                println!("\n[{}] {}\n{}", turn.turn_number, speaker, turn.content);
            }
            Ok(DebateEvent::StatusChanged(change)) => {
                if change.status.is_terminal() {
                    return;
                }
            }
            Err(RecvError::Lagged(missed)) => warn!(missed, "Progress output fell behind"),
            Err(RecvError::Closed) => return,
        }
    }
}

async fn check(config: &AppConfig) -> Result<()> {
    let registry = config.registry()?.shared();
    println!("Configuration OK: {} agent(s)", config.agents.len());

    let responder = GatewayResponder::new(config.gateway.clone(), registry)
        .context("Failed to build gateway client")?;
    match responder.probe().await {
        Ok(status) if (200..300).contains(&status) => {
            println!("Gateway {} reachable (HTTP {})", config.gateway.url, status);
            Ok(())
        }
        Ok(status) => anyhow::bail!("Gateway {} answered HTTP {}", config.gateway.url, status),
        Err(e) => Err(e).with_context(|| format!("Gateway {} unreachable", config.gateway.url)),
    }
}

fn list_agents(config: &AppConfig) {
    if config.agents.is_empty() {
        println!("No agents configured");
        return;
    }
    for agent in &config.agents {
        let conn = agent.connection(&config.gateway);
        println!(
            "{:<16} {:<20} {:<8} model={} gateway={}",
            agent.id,
            agent.name.as_deref().unwrap_or(&agent.id),
            if agent.active { "active" } else { "inactive" },
            conn.model.as_deref().unwrap_or("-"),
            conn.gateway_url,
        );
    }
}
