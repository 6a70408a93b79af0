//! Bee MCP - 命令行入口
//!
//! 加载 .env 与配置，读取指令（命令行参数或交互输入），运行一次会话并打印结果；Ctrl+C 取消会话。

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use bee_mcp::agent::{run_instruction, PROVIDER_MOCK};
use bee_mcp::config::load_config;
use bee_mcp::core::{AgentError, LoopState, SessionSupervisor};
use bee_mcp::react::SessionEvent;
use clap::Parser;

const BANNER_WIDTH: usize = 60;

#[derive(Parser)]
#[command(name = "bee-mcp")]
#[command(version, about = "Browser automation driven by an LLM planner over MCP tools")]
struct Cli {
    /// Extra config file layered over config/default.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of tool calls in one session
    #[arg(long)]
    max_steps: Option<usize>,

    /// Run the browser without a visible window
    #[arg(long)]
    headless: bool,

    /// Use the offline mock planner with an in-process echo tool
    #[arg(long)]
    mock: bool,

    /// Instruction for the agent (words are joined with spaces)
    instruction: Vec<String>,
}

fn banner(title: &str) {
    let rule = "=".repeat(BANNER_WIDTH);
    println!("\n{}\n{}\n{}", rule, title, rule);
}

/// 无指令时提示示例并从 stdin 读一行
fn prompt_instruction() -> anyhow::Result<String> {
    println!("No instruction provided. Enter your browser automation task:");
    println!("\nExamples:");
    println!("  - \"Open https://www.google.com\"");
    println!("  - \"Go to GitHub and take a screenshot\"");
    println!("  - \"Navigate to Wikipedia and search for Python\"");
    println!();
    print!("Your instruction: ");
    std::io::stdout().flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read instruction from stdin")?;
    Ok(line.trim().to_string())
}

fn print_event(ev: SessionEvent) {
    match ev {
        SessionEvent::ToolCall { tool, args } => {
            banner(&format!("TOOL CALL: {}", tool));
            let pretty = serde_json::to_string_pretty(&args).unwrap_or_else(|_| args.to_string());
            println!("[ARGUMENTS] {}\n", pretty);
        }
        SessionEvent::Observation { tool, preview } => {
            println!("[SUCCESS] Tool '{}' executed successfully", tool);
            println!("[RESULT] {}", preview);
        }
        SessionEvent::ToolFailure { tool, reason } => {
            println!("[ERROR] Tool '{}' failed: {}", tool, reason);
        }
        SessionEvent::StepUpdate { .. }
        | SessionEvent::Thinking
        | SessionEvent::FinalText { .. }
        | SessionEvent::StepLimit { .. } => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    bee_mcp::observability::init();

    let cli = Cli::parse();
    let mut cfg = load_config(cli.config.clone()).context("Failed to load config")?;
    if let Some(max_steps) = cli.max_steps {
        cfg.app.max_steps = max_steps;
    }
    if cli.headless {
        cfg.mcp.headless = true;
    }
    if cli.mock {
        cfg.llm.provider = PROVIDER_MOCK.to_string();
    }

    banner("Browser Automation with MCP + Playwright + LLM");

    let instruction = if cli.instruction.is_empty() {
        prompt_instruction()?
    } else {
        cli.instruction.join(" ")
    };
    if instruction.is_empty() {
        println!("\n[ERROR] No instruction provided. Exiting.");
        return Ok(());
    }
    banner(&format!("USER INSTRUCTION: {}", instruction));

    let supervisor = SessionSupervisor::new();
    let ctrl_c = supervisor.cancel_on_ctrl_c();

    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(ev) = event_rx.recv().await {
            print_event(ev);
        }
    });

    let result = run_instruction(&cfg, &instruction, supervisor.cancel_token(), Some(&event_tx)).await;
    drop(event_tx);
    let _ = printer.await;
    ctrl_c.abort();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(AgentError::Cancelled) => {
            println!("\n[INFO] Interrupted by user. Exiting...");
            return Ok(());
        }
        Err(e) => return Err(e).context("Session failed"),
    };

    match (outcome.state, outcome.summary) {
        (LoopState::Aborted, _) => {
            println!(
                "\n[WARNING] Reached maximum step limit ({}). Stopping.",
                cfg.app.max_steps
            );
        }
        (_, Some(summary)) => {
            banner("FINAL AI RESPONSE:");
            println!("{}", summary);
            println!("{}", "=".repeat(BANNER_WIDTH));
            println!("\n[INFO] Task completed after {} steps\n", outcome.steps);
        }
        (_, None) => {
            println!("\n[INFO] Task completed after {} steps (no summary returned)\n", outcome.steps);
        }
    }

    Ok(())
}
