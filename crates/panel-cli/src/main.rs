use std::env;
use std::error::Error;
use std::io;
use std::io::BufRead;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use panel_bridge::SimulatedBridge;
use panel_core::diff_model::DiffViewMode;
use panel_core::run_browser::BrowserAction;
use panel_core::PanelConfig;
use panel_core::ToolId;
use panel_core::ToolRegistry;
use panel_core::UserAction;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

mod config;
mod driver;
mod host;
mod render;

use crate::driver::Driver;
use crate::render::render_panel;
use crate::render::render_runs;
use crate::render::render_tools;

const LOG_ENV: &str = "AGENT_PANEL_LOG";

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args: Vec<String> = env::args().skip(1).collect();
    let config_path = take_config_arg(&mut args)?;
    let mut args = args.into_iter();
    let Some(command) = args.next() else {
        print_help();
        return Ok(());
    };

    match command.as_str() {
        "--help" | "-h" | "help" => {
            print_help();
            return Ok(());
        }
        "--version" | "-V" | "version" => {
            println!("agent-panel {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    let command = match command.as_str() {
        "session" => None,
        other => Some(parse_command(other, args.collect())?),
    };

    init_tracing();
    let config = config::load_config(config_path.as_deref())?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let mut input = io::stdin().lock();
    runtime.block_on(async {
        let mut driver = new_driver(&config);
        match command {
            Some(command) => execute(&mut driver, &config, command, &mut input).await,
            None => run_session(&mut driver, &config, &mut input).await,
        }
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn new_driver(config: &PanelConfig) -> Driver {
    let bridge = SimulatedBridge::new(config.bridge.artifact_base_url.clone())
        .with_latency(Duration::from_millis(config.bridge.simulated_latency_ms));
    Driver::new(Arc::new(bridge), config)
}

fn take_config_arg(args: &mut Vec<String>) -> Result<Option<PathBuf>, Box<dyn Error>> {
    let Some(index) = args.iter().position(|arg| arg == "--config") else {
        return Ok(None);
    };
    if index + 1 >= args.len() {
        return Err("--config requires a path".into());
    }
    let path = args.remove(index + 1);
    args.remove(index);
    Ok(Some(PathBuf::from(path)))
}

#[derive(Debug, Clone, PartialEq)]
struct TaskRequest {
    tool: ToolId,
    inputs: Vec<(String, Value)>,
    mode: DiffViewMode,
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Tools,
    Preview(TaskRequest),
    Apply {
        request: TaskRequest,
        yes: bool,
    },
    Deny {
        request: TaskRequest,
        reason: Option<String>,
    },
    Runs {
        run: Option<String>,
        copy: Option<String>,
        open: Option<String>,
    },
}

fn parse_command(command: &str, args: Vec<String>) -> Result<Command, Box<dyn Error>> {
    match command {
        "tools" => {
            if let Some(extra) = args.first() {
                return Err(format!("unsupported argument: {extra}").into());
            }
            Ok(Command::Tools)
        }
        "preview" => {
            let (request, _, _) = parse_task_args(args, false, false)?;
            Ok(Command::Preview(request))
        }
        "apply" => {
            let (request, yes, _) = parse_task_args(args, true, false)?;
            Ok(Command::Apply { request, yes })
        }
        "deny" => {
            let (request, _, reason) = parse_task_args(args, false, true)?;
            Ok(Command::Deny { request, reason })
        }
        "runs" => parse_runs_args(args),
        _ => {
            print_help();
            Err(format!("unknown command: {command}").into())
        }
    }
}

fn parse_task_args(
    args: Vec<String>,
    allow_yes: bool,
    allow_reason: bool,
) -> Result<(TaskRequest, bool, Option<String>), Box<dyn Error>> {
    let Some(name) = args.first() else {
        return Err("missing tool name".into());
    };
    let tool = ToolId::parse(name).ok_or_else(|| format!("unknown tool: {name}"))?;
    let mut request = TaskRequest {
        tool,
        inputs: Vec::new(),
        mode: DiffViewMode::default(),
    };
    let mut yes = false;
    let mut reason = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--mode" => {
                let Some(value) = args.get(i + 1) else {
                    return Err("--mode requires unified, split or json".into());
                };
                request.mode = DiffViewMode::parse(value)
                    .ok_or_else(|| format!("unknown diff mode: {value}"))?;
                i += 2;
            }
            "--yes" | "-y" if allow_yes => {
                yes = true;
                i += 1;
            }
            // The reason takes the rest of the line so session input needs no quoting.
            "--reason" if allow_reason => {
                let text = args[i + 1..].join(" ");
                reason = Some(text);
                i = args.len();
            }
            other => {
                let Some((key, raw)) = other.split_once('=') else {
                    return Err(format!("unsupported argument: {other}").into());
                };
                let value = ToolRegistry::parse_input(tool, key, raw)?;
                request.inputs.push((key.to_string(), value));
                i += 1;
            }
        }
    }
    Ok((request, yes, reason))
}

fn parse_runs_args(args: Vec<String>) -> Result<Command, Box<dyn Error>> {
    let mut run = None;
    let mut copy = None;
    let mut open = None;
    let mut i = 0;
    while i < args.len() {
        let slot = match args[i].as_str() {
            "--run" => &mut run,
            "--copy" => &mut copy,
            "--open" => &mut open,
            other => return Err(format!("unsupported argument: {other}").into()),
        };
        let Some(value) = args.get(i + 1) else {
            return Err(format!("{} requires a value", args[i]).into());
        };
        *slot = Some(value.clone());
        i += 2;
    }
    Ok(Command::Runs { run, copy, open })
}

/// `input` answers the apply confirmation.
async fn execute(
    driver: &mut Driver,
    config: &PanelConfig,
    command: Command,
    input: &mut dyn BufRead,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Tools => {
            load_tools(driver).await;
            println!("{}", render_tools(&driver.panel.catalog));
            Ok(())
        }
        Command::Preview(request) => {
            plan(driver, &request).await?;
            println!("{}", render_panel(&driver.panel, &config.view));
            fail_on_error(driver)
        }
        Command::Apply { request, yes } => {
            plan(driver, &request).await?;
            if driver.panel.view.error.is_some() {
                println!("{}", render_panel(&driver.panel, &config.view));
                return fail_on_error(driver);
            }
            if !driver.panel.can_approve() {
                println!("{}", render_panel(&driver.panel, &config.view));
                return Err(format!("{} is preview-only", request.tool.as_str()).into());
            }
            driver.dispatch(UserAction::Approve);
            if !(yes || prompt_approval(request.tool, input)?) {
                driver.dispatch(UserAction::CancelOverlay);
                println!("apply cancelled");
                return Ok(());
            }
            driver.dispatch(UserAction::ConfirmApply);
            driver.settle().await;
            println!("{}", render_panel(&driver.panel, &config.view));
            fail_on_error(driver)
        }
        Command::Deny { request, reason } => {
            plan(driver, &request).await?;
            if !driver.panel.can_deny() {
                println!("{}", render_panel(&driver.panel, &config.view));
                fail_on_error(driver)?;
                return Err(format!("{} has nothing awaiting approval", request.tool.as_str()).into());
            }
            driver.dispatch(UserAction::RequestDeny);
            driver.dispatch(UserAction::SubmitDeny { reason });
            println!("{}", render_panel(&driver.panel, &config.view));
            Ok(())
        }
        Command::Runs { run, copy, open } => {
            driver.dispatch_browser(BrowserAction::Mount);
            driver.settle().await;
            if let Some(run) = run {
                if driver.browser.run_list().iter().all(|known| known.id != run) {
                    return Err(format!("no run named {run}").into());
                }
                driver.dispatch_browser(BrowserAction::SelectRun(run));
                driver.settle().await;
            }
            if let Some(path) = copy {
                driver.dispatch_browser(BrowserAction::CopyHash { path });
            }
            if let Some(path) = open {
                driver.dispatch_browser(BrowserAction::OpenArtifact { path });
            }
            println!("{}", render_runs(&driver.browser, &config.view));
            for url in driver.opened.drain(..) {
                println!("open {url}");
            }
            Ok(())
        }
    }
}

async fn load_tools(driver: &mut Driver) {
    driver.dispatch(UserAction::LoadTools);
    driver.settle().await;
}

async fn plan(driver: &mut Driver, request: &TaskRequest) -> Result<(), Box<dyn Error>> {
    if !driver.panel.catalog.loaded {
        load_tools(driver).await;
    }
    if !driver.panel.catalog.is_selectable(request.tool) {
        return Err(format!("{} is not offered by the bridge", request.tool.as_str()).into());
    }
    driver.dispatch(UserAction::SelectTool(request.tool));
    for (key, value) in &request.inputs {
        driver.dispatch(UserAction::SetInput {
            key: key.clone(),
            value: value.clone(),
        });
    }
    driver.dispatch(UserAction::SetDiffMode(request.mode));
    driver.dispatch(UserAction::QueueTask {
        created_at: Utc::now(),
    });
    driver.dispatch(UserAction::Preview);
    driver.settle().await;
    Ok(())
}

fn fail_on_error(driver: &Driver) -> Result<(), Box<dyn Error>> {
    match &driver.panel.view.error {
        Some(error) => Err(format!("{} failed", error.phase.label()).into()),
        None => Ok(()),
    }
}

/// Reads commands line by line against one driver, so runs recorded by
/// earlier lines show up in later `runs` listings. An apply confirmation
/// takes the line after the `apply` command.
async fn run_session(
    driver: &mut Driver,
    config: &PanelConfig,
    input: &mut dyn BufRead,
) -> Result<(), Box<dyn Error>> {
    loop {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let mut tokens = line.split_whitespace().map(str::to_string);
        let Some(command) = tokens.next() else {
            continue;
        };
        if command.starts_with('#') {
            continue;
        }
        if matches!(command.as_str(), "quit" | "exit") {
            return Ok(());
        }
        let outcome = match parse_command(&command, tokens.collect()) {
            Ok(command) => execute(driver, config, command, &mut *input).await,
            Err(err) => Err(err),
        };
        if let Err(err) = outcome {
            eprintln!("error: {err}");
        }
    }
}

fn prompt_approval(tool_id: ToolId, input: &mut dyn BufRead) -> io::Result<bool> {
    print!("apply {} with the previewed input? [y/N]: ", tool_id.as_str());
    io::stdout().flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes" | "YES"))
}

fn print_help() {
    println!("agent-panel {}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  agent-panel [--config PATH] tools");
    println!("  agent-panel [--config PATH] preview TOOL [KEY=VALUE ...] [--mode unified|split|json]");
    println!("  agent-panel [--config PATH] apply TOOL [KEY=VALUE ...] [--mode MODE] [--yes]");
    println!("  agent-panel [--config PATH] deny TOOL [KEY=VALUE ...] [--reason TEXT...]");
    println!("  agent-panel [--config PATH] runs [--run ID] [--copy PATH] [--open PATH]");
    println!("  agent-panel [--config PATH] session   (commands from stdin, one per line)");
    println!("  agent-panel --help");
    println!("  agent-panel --version");
    println!("Logging: {LOG_ENV} or RUST_LOG (default warn). Config: --config, {}, or the user config dir.", config::CONFIG_ENV);
}
