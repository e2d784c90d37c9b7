// ThunderVM - Main Entry Point
//
// Loads a Lua script, runs it once, then drives its `_screen_draw` hook
// every frame, either in native windows or headless.

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use thundervm::console::{Console, ConsoleConfig, CONFIG_FILE};
use thundervm::display::{run_headless, run_windowed, HeadlessBackend, WindowBackend};
use thundervm::error::ConsoleError;
use thundervm::script::{report_script_error, ScriptHost};
use tracing::{error, info};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use winit::event_loop::EventLoop;

#[derive(Parser, Debug)]
#[command(name = "thundervm", version, about = "A small fantasy console scripted in Lua")]
struct Cli {
    /// Lua script to run
    script: PathBuf,

    /// Configuration file
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Window scale factor (1-8), overrides the configuration
    #[arg(long)]
    scale: Option<u32>,

    /// Render to memory instead of opening windows
    #[arg(long)]
    headless: bool,

    /// Frames to run in headless mode
    #[arg(long, default_value_t = 60)]
    frames: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn setup_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .finish()
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    setup_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("! {}", err);
            error!(error = %err, "fatal error");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<(), ConsoleError> {
    println!("This is ThunderVM");

    // An unreadable script fails before any native resource is acquired
    let source = fs::read_to_string(&cli.script)?;
    let name = format!("@{}", cli.script.display());

    let mut config = ConsoleConfig::load_or_default(&cli.config);
    if let Some(scale) = cli.scale {
        config = config.with_scale(scale);
    }
    info!(path = %cli.config.display(), "configuration loaded");

    if cli.headless {
        let console = Console::new(config, Box::new(HeadlessBackend))?;
        let host = ScriptHost::new(console.into_shared())?;
        exec_script(&host, &source, &name);
        run_headless(&host, cli.frames, None)?;
        return Ok(());
    }

    let event_loop =
        EventLoop::new().map_err(|e| ConsoleError::SubsystemInitFailure(e.to_string()))?;

    let video = config.video.clone();
    let backend = WindowBackend::new(video.scale);
    let console = Console::new(config, Box::new(backend))?;
    let host = ScriptHost::new(console.into_shared())?;
    exec_script(&host, &source, &name);

    let frames = run_windowed(event_loop, host, &video)?;
    info!(frames, "session ended");
    Ok(())
}

/// Run the top-level script; a failure is reported and the frame loop still starts
fn exec_script(host: &ScriptHost, source: &str, name: &str) {
    match host.exec(source, name) {
        Ok(()) => info!(script = name, "script loaded"),
        Err(err) => report_script_error(&err),
    }
}
