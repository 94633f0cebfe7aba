//! Phone Agent - AI-powered Android phone automation
//!
//! This is the CLI entry point for the phone-agent tool.
//! Run with: cargo run --bin phone-agent -- "打开微信"

use anyhow::Context;
use clap::Parser;
use phone_agent_core::adb::AdbConnection;
use phone_agent_core::{
    AdbDevice, AgentConfig, AppRegistry, AppSettings, CoordinateSystem, ModelClient, PhoneAgent,
    RunOutcome, TaskStatus,
};
use std::io::{self, BufRead, Write};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "phone-agent")]
#[command(author, version, about = "Phone Agent - AI-powered Android automation")]
struct Cli {
    /// Task to execute; starts an interactive prompt when omitted
    #[arg(trailing_var_arg = true)]
    task: Vec<String>,

    /// Model API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Model API key
    #[arg(long)]
    api_key: Option<String>,

    /// Model name
    #[arg(short, long)]
    model: Option<String>,

    /// ADB device ID
    #[arg(short, long)]
    device_id: Option<String>,

    /// Prompt language ("cn" or "en")
    #[arg(short, long)]
    lang: Option<String>,

    /// Maximum steps per task
    #[arg(long)]
    max_steps: Option<u32>,

    /// Coordinate system the model answers in ("absolute" or "relative")
    #[arg(long)]
    coordinates: Option<String>,

    /// Only print the final result
    #[arg(short, long)]
    quiet: bool,

    /// List supported app names and exit
    #[arg(long)]
    list_apps: bool,

    /// List connected ADB devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Connect to a remote ADB device (host[:port]) before running
    #[arg(long, value_name = "ADDRESS")]
    connect: Option<String>,

    /// Persist the effective settings and exit
    #[arg(long)]
    save_settings: bool,
}

impl Cli {
    /// Settings file, then environment, then flags.
    fn settings(&self) -> AppSettings {
        let mut settings = AppSettings::load();
        settings.apply_env();

        if let Some(v) = &self.base_url {
            settings.base_url = v.clone();
        }
        if let Some(v) = &self.api_key {
            settings.api_key = v.clone();
        }
        if let Some(v) = &self.model {
            settings.model_name = v.clone();
        }
        if let Some(v) = &self.device_id {
            settings.device_id = v.clone();
        }
        if let Some(v) = &self.lang {
            settings.lang = v.clone();
        }
        if let Some(v) = self.max_steps {
            settings.max_steps = v;
        }
        if let Some(v) = &self.coordinates {
            settings.coordinate_system = v.clone();
        }
        if self.quiet {
            settings.verbose = false;
        }
        settings
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.list_apps {
        for name in AppRegistry::builtin().known_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let connection = AdbConnection::new();

    if cli.list_devices {
        let devices = connection.list_devices().await.context("listing devices")?;
        if devices.is_empty() {
            println!("No devices attached");
        }
        for device in devices {
            println!(
                "{}\t{}\t{:?}\t{}",
                device.device_id,
                device.status,
                device.connection_type,
                device.model.unwrap_or_default()
            );
        }
        return Ok(());
    }

    let mut settings = cli.settings();

    if let Some(address) = &cli.connect {
        let message = connection.connect(address).await?;
        println!("🔌 {}", message);
        if settings.device_id.is_empty() {
            settings.device_id = if address.contains(':') {
                address.clone()
            } else {
                format!("{}:5555", address)
            };
        }
    }

    if cli.save_settings {
        let path = settings.save()?;
        println!("Settings saved to {}", path.display());
        return Ok(());
    }

    let model_config = settings.to_model_config();
    let agent_config = settings.to_agent_config();
    agent_config.validate()?;

    if agent_config.verbose {
        print_banner(&settings, &agent_config);
    }

    let model = ModelClient::new(model_config)?;
    let device = AdbDevice::new(agent_config.device_id.clone());
    let agent = PhoneAgent::new(model, device, agent_config);

    if !cli.task.is_empty() {
        let task = cli.task.join(" ");
        println!("📝 Task: {}\n", task);
        let outcome = run_interruptible(&agent, &task).await;
        print_outcome(&outcome);
        return Ok(());
    }

    // Interactive mode
    println!("Interactive mode. Type your task and press Enter.");
    println!("Type 'quit' or 'exit' to exit.\n");

    let stdin = io::stdin();
    loop {
        print!("📝 Task: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let task = line.trim();

        if task.is_empty() {
            continue;
        }

        if task == "quit" || task == "exit" {
            println!("Goodbye! 👋");
            break;
        }

        let outcome = run_interruptible(&agent, task).await;
        print_outcome(&outcome);
        println!();
    }

    Ok(())
}

/// Run one task; Ctrl-C stops it at the next step boundary.
async fn run_interruptible(agent: &PhoneAgent<ModelClient, AdbDevice>, task: &str) -> RunOutcome {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!("\n⏹️ Stopping after the current step...");
                cancel.cancel();
            }
        })
    };

    let outcome = agent.run_with_cancellation(task, &cancel).await;
    watcher.abort();
    outcome
}

fn print_banner(settings: &AppSettings, config: &AgentConfig) {
    let coordinates = match config.coordinate_system {
        CoordinateSystem::Relative => "Relative (0-999)",
        CoordinateSystem::Absolute => "Absolute (pixels)",
    };

    println!("🤖 Phone Agent - AI-powered Android Automation");
    println!("================================================");
    println!("Model: {} @ {}", settings.model_name, settings.base_url);
    println!("Language: {}", config.lang);
    println!("Coordinate System: {}", coordinates);
    println!("Max Steps: {}", config.max_steps);
    println!(
        "Retry: max {} attempts, {}s initial delay",
        config.max_model_retries,
        config.retry_delay.as_secs()
    );
    if let Some(ref id) = config.device_id {
        println!("Device: {}", id);
    }
    println!("================================================\n");
}

fn print_outcome(outcome: &RunOutcome) {
    let message = outcome.message.as_deref().unwrap_or_default();
    match outcome.status {
        TaskStatus::Succeeded => println!("\n✅ Result: {}", message),
        TaskStatus::StepLimitExceeded => println!("\n⏹️ {} ({} steps)", message, outcome.steps),
        _ => match &outcome.error {
            Some(err) => eprintln!("\n❌ Error [{}]: {}", err.kind(), message),
            None => eprintln!("\n❌ Failed: {}", message),
        },
    }
}
