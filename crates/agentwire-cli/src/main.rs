//! `agentwire` command-line client.

mod config;

use agentwire_a2a::TaskLifecycleClient;
use agentwire_orchestrator::{
    ItemResult, JobReport, OrchestrationJob, Orchestrator, Strategy,
};
use clap::{Parser, Subcommand};
use config::{load_config, ConfiguredResolver};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agentwire", about = "Agentwire: call and compose remote agents")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "agentwire.toml", global = true)]
    config: PathBuf,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an agent and print its descriptor
    Card { name: String },
    /// Send one message and wait for the answer
    Send {
        name: String,
        text: String,
        /// Overall deadline in seconds (overrides config)
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Run TEXT through FIRST, then feed the answer to SECOND
    Chain {
        first: String,
        second: String,
        text: String,
    },
    /// Send every TEXT to the agent at once
    FanOut {
        name: String,
        #[arg(required = true)]
        texts: Vec<String>,
    },
    /// Send every TEXT to the agent in bounded batches
    Batch {
        name: String,
        /// Calls in flight at once (overrides config)
        #[arg(long)]
        max_concurrent: Option<usize>,
        /// Pause between batches in milliseconds (overrides config)
        #[arg(long)]
        delay_ms: Option<u64>,
        #[arg(required = true)]
        texts: Vec<String>,
    },
    /// Ask the same question from several perspectives
    Perspectives {
        name: String,
        query: String,
        #[arg(long = "perspective", required = true)]
        perspectives: Vec<String>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let mut config = load_config(&cli.config)?;
    if let Commands::Send {
        timeout_secs: Some(secs),
        ..
    } = &cli.command
    {
        config.client.task_timeout_secs = *secs;
    }
    if let Commands::Batch {
        max_concurrent,
        delay_ms,
        ..
    } = &cli.command
    {
        if let Some(n) = max_concurrent {
            config.orchestrator.max_concurrent = *n;
        }
        if let Some(ms) = delay_ms {
            config.orchestrator.inter_batch_delay_ms = *ms;
        }
    }

    let resolver = Arc::new(ConfiguredResolver::from_config(&config)?);
    let client = Arc::new(TaskLifecycleClient::http(config.client.clone())?);
    let orch = Orchestrator::new(client, config.orchestrator.clone()).with_resolver(resolver);

    let ok = match cli.command {
        Commands::Card { name } => {
            let agent = orch.descriptor(&name).await?;
            println!("{}", serde_json::to_string_pretty(&agent.to_document())?);
            true
        }
        Commands::Send { name, text, .. } => {
            let agent = orch.descriptor(&name).await?;
            match orch.call(&agent, &text).await {
                Ok(output) => {
                    println!("{output}");
                    true
                }
                Err(e) => {
                    eprintln!("error [{}]: {e}", e.kind());
                    false
                }
            }
        }
        Commands::Chain {
            first,
            second,
            text,
        } => {
            let stages = vec![orch.descriptor(&first).await?, orch.descriptor(&second).await?];
            match orch.chain(&stages, &text).await {
                Ok(outcome) => {
                    for (i, stage) in outcome.stages.iter().enumerate() {
                        println!("--- stage {i} ({}) ---\n{}", stage.agent, stage.output);
                    }
                    println!("--- final ---\n{}", outcome.output());
                    true
                }
                Err(e) => {
                    for (i, stage) in e.completed.iter().enumerate() {
                        println!("--- stage {i} ({}) ---\n{}", stage.agent, stage.output);
                    }
                    eprintln!("error [{}]: {e}", e.source.kind());
                    false
                }
            }
        }
        Commands::FanOut { name, texts } => {
            let agent = orch.descriptor(&name).await?;
            let job = OrchestrationJob::for_agent(&agent, texts, Strategy::ConcurrentFanOut);
            run_streamed(&orch, job).await?
        }
        Commands::Batch { name, texts, .. } => {
            let agent = orch.descriptor(&name).await?;
            let job = OrchestrationJob::for_agent(&agent, texts, orch.config().batch_strategy());
            run_streamed(&orch, job).await?
        }
        Commands::Perspectives {
            name,
            query,
            perspectives,
        } => {
            let agent = orch.descriptor(&name).await?;
            let results = orch.multi_perspective(&agent, &query, perspectives.as_slice()).await;
            let mut all_ok = true;
            for (perspective, result) in &results {
                println!("=== {perspective} ===");
                all_ok &= print_result(result);
            }
            all_ok
        }
    };

    let peak = orch.monitor().peak_in_flight();
    info!(peak_in_flight = peak, "Done");
    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Runs `job` printing a line per completion, then the ordered report.
async fn run_streamed(orch: &Orchestrator, job: OrchestrationJob) -> anyhow::Result<bool> {
    let inputs: Vec<String> = job.items.iter().map(|i| i.input.clone()).collect();
    let (mut rx, handle) = orch.stream(job);

    while let Some(event) = rx.recv().await {
        let status = if event.result.is_ok() { "ok" } else { "failed" };
        eprintln!(
            "[{}/{}] item {} {status}",
            event.completed, event.total, event.index
        );
    }

    let report: JobReport = handle.await?;
    for (i, (input, result)) in inputs.iter().zip(&report.results).enumerate() {
        println!("=== #{i}: {input} ===");
        print_result(result);
    }
    println!("{}", report.summary());
    Ok(report.all_succeeded())
}

fn print_result(result: &ItemResult) -> bool {
    match result {
        Ok(output) => {
            println!("{output}");
            true
        }
        Err(e) => {
            println!("{e}");
            false
        }
    }
}
