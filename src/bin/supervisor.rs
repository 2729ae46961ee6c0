// Demo supervisor: drives the full orchestration loop end to end.
//
// Spawns a worker and a verifier agent (both running the agentmux-runner
// binary via an executable override), waits for them to report ready,
// round-trips a code-generation task through the worker and a review task
// through the verifier, then tears both agents down. Requires a local tmux
// installation.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};

use agentmux::{AgentManager, CreateAgentParams, TmuxBackend};

/// How long to wait for any single agent reply
const REPLY_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    println!("=== Supervisor Demo Started ===");

    let root = std::env::current_dir()?;
    let backend = TmuxBackend::new()?;
    let manager = AgentManager::new(&root, backend);
    println!("[Supervisor] Session ID: {}", manager.session_id());

    // The runner binary sits next to this one in the target directory.
    let runner = std::env::current_exe()?
        .parent()
        .context("no parent directory for current executable")?
        .join("agentmux-runner");
    if !runner.exists() {
        bail!(
            "runner binary not found at {}; build it with `cargo build --bin agentmux-runner`",
            runner.display()
        );
    }
    // Single-quote the path for the pane's shell.
    let runner_cmd = format!("'{}'", runner.display());

    println!("\n[Supervisor] Spawning Worker (Role: worker)...");
    let worker = manager
        .create_agent(CreateAgentParams {
            name: "coder-bob".to_string(),
            role: "worker".to_string(),
            cwd: Some(root.display().to_string()),
            executable_override: Some(runner_cmd.clone()),
            ..Default::default()
        })
        .await?;
    println!("[Supervisor] Worker Created: {}", worker.id);

    println!("\n[Supervisor] Spawning Verifier (Role: verifier)...");
    let verifier = manager
        .create_agent(CreateAgentParams {
            name: "checker-alice".to_string(),
            role: "verifier".to_string(),
            cwd: Some(root.display().to_string()),
            executable_override: Some(runner_cmd),
            ..Default::default()
        })
        .await?;
    println!("[Supervisor] Verifier Created: {}", verifier.id);

    let mission = run_mission(&manager, worker.id.as_str(), verifier.id.as_str()).await;

    println!("\n[Supervisor] Cleaning up...");
    if let Err(e) = manager.delete_agent(worker.id.as_str()).await {
        log::warn!("Failed to delete worker: {e}");
    }
    if let Err(e) = manager.delete_agent(verifier.id.as_str()).await {
        log::warn!("Failed to delete verifier: {e}");
    }
    println!("[Supervisor] Agents terminated.");

    mission
}

/// The supervised task round-trips, separated out so cleanup always runs
async fn run_mission(
    manager: &AgentManager<TmuxBackend>,
    worker_id: &str,
    verifier_id: &str,
) -> Result<()> {
    println!("\n[Supervisor] Waiting for agents to report ready...");
    let mut cursor = 0;
    let (_, c) = wait_for_message(manager, worker_id, "agent_ready", cursor).await?;
    cursor = c;
    println!(" -> Worker is Ready!");
    let (_, c) = wait_for_message(manager, verifier_id, "agent_ready", cursor).await?;
    cursor = c;
    println!(" -> Verifier is Ready!");

    println!("\n[Supervisor] Assigning Task to Worker: 'Generate Hello World code'");
    manager
        .enqueue_task(worker_id, json!({ "instruction": "Generate Hello World code" }))
        .await?;

    let (result, c) = wait_for_message(manager, worker_id, "task_completed", cursor).await?;
    cursor = c;
    let code = result["payload"]["output"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    println!("\n[Supervisor] Worker Result (Code):\n{code}");

    println!("\n[Supervisor] Assigning Task to Verifier: 'Review Code'");
    manager
        .enqueue_task(verifier_id, json!({ "code": code }))
        .await?;

    let (verdict, _) = wait_for_message(manager, verifier_id, "task_completed", cursor).await?;
    println!(
        "\n[Supervisor] Verifier Result: {} ({})",
        verdict["payload"]["status"].as_str().unwrap_or("unknown"),
        verdict["payload"]["comments"].as_str().unwrap_or(""),
    );

    println!("\n[Supervisor] Mission Accomplished.");
    Ok(())
}

/// Scan the master inbox from `cursor` for the first message of
/// `message_type` sent by `agent_id`, returning it with the cursor to
/// resume from.
async fn wait_for_message(
    manager: &AgentManager<TmuxBackend>,
    agent_id: &str,
    message_type: &str,
    mut cursor: u64,
) -> Result<(Value, u64)> {
    let start = Instant::now();
    while start.elapsed() < REPLY_TIMEOUT {
        let page = manager.read_inbox("master", cursor, None).await?;
        for record in &page.records {
            if record["from"] == agent_id && record["type"] == message_type {
                return Ok((record.clone(), page.next_cursor));
            }
        }
        cursor = page.next_cursor;
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    bail!("timeout waiting for {message_type} from agent {agent_id}")
}
