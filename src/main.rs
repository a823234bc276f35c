//! Deskhand - Console Entry Point
//!
//! Reads instructions from stdin (or `--once`), runs each through the agent
//! and prints the summary. Ctrl-C while a plan runs stops its remaining steps.

use clap::Parser;
use deskhand::core::config::AgentConfig;
use deskhand::core::error::Result;
use deskhand::engine::CancellationToken;
use deskhand::Agent;

use std::io::{self, Write};
use std::path::PathBuf;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "deskhand")]
#[command(about = "Drive desktop applications with plain-language instructions")]
struct Args {
    /// Config file (default: ~/.deskhand/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Plan from templates only, never call a model
    #[arg(long)]
    no_llm: bool,

    /// Handle one instruction and exit
    #[arg(long)]
    once: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "deskhand=debug"
    } else {
        "deskhand=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config_path = args.config.unwrap_or_else(AgentConfig::default_path);
    let config = AgentConfig::load(&config_path)?;

    let rt = Runtime::new()?;
    let agent = Agent::new(&config, !args.no_llm);

    if let Some(text) = args.once {
        let reply = rt.block_on(handle_with_interrupt(&agent, &text));
        println!("{}", reply);
        rt.block_on(agent.shutdown());
        return Ok(());
    }

    println!("\n=== DESKHAND ===");
    println!("Tell me what to do, naming the app. For example:");
    println!("  use terminal to check disk space");
    println!("  use chrome to search for rust async book");
    println!("  use git to check status");
    println!();
    println!("Ctrl-C stops a running plan; quit / exit / bye leaves.");
    if !agent.planner().has_completion() {
        println!("(No model configured: only known tasks can be planned.)");
    }
    println!();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "quit" | "exit" | "bye") {
            break;
        }

        let reply = rt.block_on(handle_with_interrupt(&agent, input));
        println!("{}\n", reply);
    }

    rt.block_on(agent.shutdown());
    println!("Goodbye!");
    Ok(())
}

/// Run one request with Ctrl-C wired to its cancel token
async fn handle_with_interrupt(agent: &Agent, text: &str) -> String {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, cancelling plan");
                cancel.cancel();
            }
        })
    };

    let reply = agent.handle_cancellable(text, &cancel).await;
    watcher.abort();
    reply
}
