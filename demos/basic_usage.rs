//! Basic usage example for Phone Agent Core.

use phone_agent_core::{run, AgentConfig, ModelConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt::init();

    let model_config = ModelConfig::default()
        .with_base_url("http://localhost:8000/v1")
        .with_model_name("autoglm-phone-9b");

    let agent_config = AgentConfig::default()
        .with_lang("cn")        // Use Chinese prompts
        .with_max_steps(50);    // Maximum 50 steps

    println!("🤖 Starting Phone Agent...\n");

    let task = "打开微信";
    println!("📝 Task: {}\n", task);

    let outcome = run(task, model_config, agent_config).await;
    if outcome.is_success() {
        println!("\n✅ Task completed: {}", outcome.message.unwrap_or_default());
    } else {
        eprintln!("\n❌ Task ended as {}: {:?}", outcome.status, outcome.message);
    }

    Ok(())
}
