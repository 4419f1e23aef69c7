use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use insight_flow::{
    catalog::{ScenarioCatalog, SourceAvailability, SourceKey, SourceRecordStore},
    config::{Config, LogFormat},
    sequencer::{ActionSequencer, AgentAction, SequencerHandle, SequencerState},
    server::{AppState, McpServer},
    AnalysisOutcome, AppResult, ScenarioInference,
};

/// Simulated root-cause analysis agent
#[derive(Parser)]
#[command(name = "insight-flow")]
#[command(about = "Simulated root-cause analysis agent with a replayable reasoning trace", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdio (default)
    Serve,

    /// List registered scenarios
    Scenarios,

    /// Infer the scenario for a question
    Infer {
        /// Free-text question
        query: String,
    },

    /// Run an analysis and print the reasoning trace
    Analyze {
        /// Scenario key
        #[arg(short, long, conflicts_with = "query")]
        scenario: Option<String>,

        /// Question used to infer the scenario
        #[arg(short, long)]
        query: Option<String>,

        /// Switch a source on (repeatable)
        #[arg(long = "enable", value_name = "SOURCE")]
        enable: Vec<SourceKey>,

        /// Switch a source off (repeatable)
        #[arg(long = "disable", value_name = "SOURCE")]
        disable: Vec<SourceKey>,

        /// Skip the pacing and print the whole trace at once
        #[arg(long)]
        instant: bool,
    },

    /// Print the raw record behind a piece of evidence
    Record {
        /// Scenario key
        #[arg(short, long)]
        scenario: String,

        /// Data source
        #[arg(long)]
        source: SourceKey,

        /// Record index within the source
        #[arg(long, default_value_t = 0)]
        evidence_id: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Insight Flow starting..."
    );

    let catalog = load_catalog(&config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, catalog).await,
        Commands::Scenarios => {
            for definition in catalog.scenarios() {
                let sources: Vec<&str> = definition
                    .relevant_sources()
                    .iter()
                    .map(|s| s.as_str())
                    .collect();
                println!(
                    "{:<18} {}  [{}]",
                    definition.key(),
                    definition.scenario.title,
                    sources.join(", ")
                );
            }
            Ok(())
        }
        Commands::Infer { query } => {
            let inference =
                ScenarioInference::new(Arc::new(catalog), config.scenarios.default_scenario);
            println!("{}", inference.infer(&query));
            Ok(())
        }
        Commands::Analyze {
            scenario,
            query,
            enable,
            disable,
            instant,
        } => {
            let catalog = Arc::new(catalog);
            let inference =
                ScenarioInference::new(catalog.clone(), config.scenarios.default_scenario.clone());
            let scenario_key = match (scenario, query) {
                (Some(key), _) => key,
                (None, Some(query)) => inference.infer(&query).to_string(),
                (None, None) => inference.default_key().to_string(),
            };

            let mut active = catalog.default_availability(&scenario_key);
            for source in enable {
                active.set(source, true);
            }
            for source in disable {
                active.set(source, false);
            }

            let title = catalog
                .get(&scenario_key)
                .map(|d| d.scenario.title.clone())
                .unwrap_or_else(|| scenario_key.clone());
            println!("Analyzing: {}", title);

            let sequencer = ActionSequencer::new(catalog, config.sequencer.clone());
            let outcome = if instant {
                run_instant(sequencer, &scenario_key, &active)
            } else {
                run_paced(sequencer, &scenario_key, &active).await?
            };

            match outcome {
                Some(outcome) => print_outcome(&outcome),
                None => error!("Analysis finished without an outcome"),
            }
            Ok(())
        }
        Commands::Record {
            scenario,
            source,
            evidence_id,
        } => {
            let record = catalog
                .record(&scenario, source, evidence_id)
                .with_context(|| {
                    format!(
                        "No record {} for source '{}' in scenario '{}'",
                        evidence_id, source, scenario
                    )
                })?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
    }
}

/// Build the catalog, adding scenarios from `SCENARIO_FILE` if set
fn load_catalog(config: &Config) -> AppResult<ScenarioCatalog> {
    let mut catalog = ScenarioCatalog::new();
    if let Some(path) = &config.scenarios.scenario_file {
        match catalog.load_file(path) {
            Ok(added) => info!(path = %path.display(), added, "Scenario file loaded"),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load scenario file");
                return Err(e.into());
            }
        }
    }
    Ok(catalog)
}

async fn serve(config: Config, catalog: ScenarioCatalog) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(config, catalog));
    let server = McpServer::new(state);

    info!("Server ready, waiting for requests on stdin...");

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

fn run_instant(
    mut sequencer: ActionSequencer,
    scenario_key: &str,
    active: &SourceAvailability,
) -> Option<AnalysisOutcome> {
    sequencer.start(scenario_key, active);
    let snapshot = sequencer.run_until_complete();
    for action in &snapshot.actions {
        print_action(action);
    }
    snapshot.outcome
}

async fn run_paced(
    sequencer: ActionSequencer,
    scenario_key: &str,
    active: &SourceAvailability,
) -> anyhow::Result<Option<AnalysisOutcome>> {
    let handle = SequencerHandle::spawn(sequencer);
    let mut rx = handle.subscribe();
    handle.start(scenario_key, active).await;

    let mut printed = 0;
    loop {
        let snapshot = rx.borrow_and_update().clone();
        for action in snapshot.actions.iter().skip(printed) {
            print_action(action);
        }
        printed = snapshot.actions.len();

        if snapshot.state == SequencerState::Complete {
            return Ok(snapshot.outcome);
        }
        rx.changed()
            .await
            .context("Sequencer stopped before completing")?;
    }
}

fn print_action(action: &AgentAction) {
    println!(
        "[{:>6} ms] {:<28} {}",
        action.timestamp_ms, action.label, action.content
    );
}

fn print_outcome(outcome: &AnalysisOutcome) {
    let hypothesis = &outcome.hypothesis;
    println!();
    println!(
        "Hypothesis ({} confidence, {}%): {}",
        hypothesis.confidence.level, hypothesis.confidence.percent, hypothesis.conclusion
    );
    if let Some(note) = &hypothesis.note {
        println!("Note: {}", note);
    }
    if !outcome.evidence.is_empty() {
        println!("Evidence:");
        for item in &outcome.evidence {
            println!("  - [{}] {}", item.source.display_name(), item.text);
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
