mod app;
mod settings;
mod state;

use anyhow::{Context as _, Result};
use app::ViewerApp;
use clap::Parser;
use meshview_common::ViewerConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use winit::event_loop::{ControlFlow, EventLoop};

#[derive(Parser)]
#[command(name = "meshview", about = "Interactive OBJ mesh viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML viewer config; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Asset root, overriding the config
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Print the effective config as YAML and exit
    #[arg(long)]
    print_config: bool,
}

fn load_config(cli: &Cli) -> Result<ViewerConfig> {
    let mut config = match &cli.config {
        Some(path) => ViewerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    if let Some(root) = &cli.assets {
        config.assets.root = root.clone();
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    if cli.print_config {
        print!("{}", config.to_yaml_string()?);
        return Ok(());
    }

    let shader_dir = config.assets.resolve("shaders");
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::new(config, shader_dir);
    event_loop.run_app(&mut app)?;
    match app.take_failure() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn report(err: &anyhow::Error) {
    tracing::error!("{err:#}");
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title("meshview")
        .set_description(format!("{err:#}"))
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(tier = %meshview_render::CapabilityTier::ACTIVE, "meshview starting");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}
