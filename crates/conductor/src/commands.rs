//! Conductor command implementations

use anyhow::{Context, Result};
use conductor_agent::{Roster, TurnEvent};
use conductor_config::{self, Config};
use conductor_provider::{Message, OpenAiCompatProvider};
use conductor_storage::{reset_and_seed, SeedOptions, Storage, StorageOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Inference provider for every agent
pub fn build_provider(config: &Config) -> Result<Arc<OpenAiCompatProvider>> {
    let api_key = config
        .api_key()
        .context("No API key configured. Set one in ~/.conductor/config.json or OPENROUTER_API_KEY")?;
    let provider = OpenAiCompatProvider::new(
        api_key,
        config.api_base(),
        config.agents.coordinator.model.clone(),
    )
    .with_timeout(config.inference_timeout());
    debug!(
        "◆ INFERENCE ENDPOINT {} ({}s timeout)",
        provider.api_base(),
        config.inference_timeout().as_secs()
    );
    Ok(Arc::new(provider))
}

/// Read-only handle on the configured demo database
pub fn open_storage(config: &Config) -> Storage {
    let path = config.storage_path();
    if !path.exists() {
        warn!(
            "◆ DATABASE NOT FOUND AT {:?}; RUN `conductor seed` FIRST",
            path
        );
    }
    Storage::open(
        path,
        StorageOptions {
            pool_size: config.storage.pool_size,
            ..StorageOptions::default()
        },
    )
}

/// Provider, storage and agents wired from config
pub fn build_roster(config: &Config) -> Result<Roster<OpenAiCompatProvider>> {
    let provider = build_provider(config)?;
    let storage = open_storage(config);
    Roster::from_config(provider, config, storage).context("Failed to assemble agents")
}

/// Initialize config and data directory
pub async fn init_command() -> Result<()> {
    println!("◆ Initializing Conductor...");
    println!("{}", RULE);

    let config = conductor_config::init().await?;
    if let Some(parent) = config.storage_path().parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::create_dir_all(conductor_config::results_dir()).await?;

    println!("\n◆ Conductor initialized");
    println!("\nNext steps:");
    println!("  1. Add your API key to {}", conductor_config::config_path().display());
    println!("     Get one at: https://openrouter.ai/keys");
    println!("  2. Seed the demo database: conductor seed");
    println!("  3. Ask something: conductor ask -m \"What is the total budget of all projects?\"");

    Ok(())
}

/// Reset and seed the demo database
pub async fn seed_command(users: usize, projects: usize, path: Option<PathBuf>) -> Result<()> {
    let config = Config::load().await?;
    let path = path.unwrap_or_else(|| config.storage_path());
    let options = SeedOptions {
        users,
        projects,
        ..SeedOptions::default()
    };

    println!("◆ Seeding {}", path.display());
    let target = path.clone();
    let summary = tokio::task::spawn_blocking(move || reset_and_seed(&target, &options))
        .await
        .context("Seeding task panicked")?
        .with_context(|| format!("Failed to seed {}", path.display()))?;

    println!("{}", RULE);
    println!("users:         {}", summary.users);
    println!("projects:      {}", summary.projects);
    println!("project_users: {}", summary.project_users);
    println!("departments:   {}", summary.departments);
    println!("employees:     {}", summary.employees);
    println!("clients:       {}", summary.clients);
    println!("contracts:     {}", summary.contracts);
    println!("\n✓ Database ready");

    Ok(())
}

/// Print dispatches and their results as they stream in
fn spawn_printer(mut rx: mpsc::UnboundedReceiver<TurnEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                TurnEvent::ToolCalls { agent, calls } => {
                    for call in calls {
                        let input = call
                            .arguments
                            .get("input_text")
                            .and_then(|v| v.as_str())
                            .map(str::to_string)
                            .unwrap_or_else(|| call.arguments.to_string());
                        println!("  → [{}] {}: {}", agent, call.name, input);
                    }
                }
                TurnEvent::ToolResult { record, .. } => {
                    println!(
                        "  ← {} [{}] {}ms",
                        record.target,
                        record.outcome.tag(),
                        record.latency.as_millis()
                    );
                }
                TurnEvent::Answer { .. } => {}
            }
        }
    })
}

async fn answer(
    roster: &Roster<OpenAiCompatProvider>,
    history: &[Message],
    question: &str,
) -> (String, Vec<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let printer = spawn_printer(rx);
    let report = roster.coordinator.run_turn(history, question, Some(&tx)).await;
    drop(tx);
    let _ = printer.await;
    let conversation = report.conversation();
    (report.answer, conversation)
}

/// Ask one question, or chat interactively
pub async fn ask_command(message: Option<String>) -> Result<()> {
    let config = Config::load().await?;
    let roster = build_roster(&config)?;

    if let Some(msg) = message {
        let (reply, _) = answer(&roster, &[], &msg).await;
        println!("\n◆ {}", reply);
        return Ok(());
    }

    println!("◆ Interactive mode (type 'exit' to quit)");
    println!("{}", RULE);

    let mut history: Vec<Message> = Vec::new();
    loop {
        print!("◆ ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        let (reply, conversation) = answer(&roster, &history, input).await;
        history = conversation;
        info!("◆ HISTORY: {} MESSAGES", history.len());
        println!("\n◆ {}\n", reply);
    }

    Ok(())
}

fn mark<'a>(ok: bool, good: &'a str, bad: &'a str) -> &'a str {
    if ok {
        good
    } else {
        bad
    }
}

/// Show system status
pub async fn status_command() -> Result<()> {
    let config_path = conductor_config::config_path();

    println!("◆ Conductor System Status");
    println!("{}", RULE);

    println!(
        "Config:    {} {}",
        config_path.display(),
        mark(config_path.exists(), "[OK]", "[Missing]")
    );

    let config = Config::load().await?;
    let db_path = config.storage_path();
    println!(
        "Database:  {} {}",
        db_path.display(),
        mark(db_path.exists(), "[OK]", "[Missing]")
    );
    if db_path.exists() {
        let storage = open_storage(&config);
        match tokio::task::spawn_blocking(move || storage.list_tables()).await? {
            Ok(tables) => println!("Tables:    {}", tables.join(", ")),
            Err(e) => println!("Tables:    [Unreadable: {}]", e),
        }
    }

    println!(
        "API Key:   {}",
        mark(config.has_api_key(), "[Set]", "[Missing]")
    );
    println!(
        "Search:    {}",
        mark(config.search_api_key().is_some(), "[Set]", "[Missing]")
    );

    let agents = &config.agents;
    println!("Models:");
    println!("  coordinator  {} ({} steps)", agents.coordinator.model, agents.coordinator.max_steps);
    println!("  database     {} ({} steps)", agents.database.model, agents.database.max_steps);
    println!("  web          {} ({} steps)", agents.web.model, agents.web.max_steps);
    println!("  calculator   {} ({} steps)", agents.calculator.model, agents.calculator.max_steps);
    println!(
        "Dispatch:  {} concurrent, {}s timeout",
        config.dispatch.max_concurrent, config.dispatch.timeout_secs
    );

    println!("\n◆ Ready");

    Ok(())
}
