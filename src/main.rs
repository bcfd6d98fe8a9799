#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use tracing::{Level as TraceLevel, info};
use tracing_subscriber::FmtSubscriber;

use rounded_corners::extension::Extension;
use rounded_corners::host::{HostShell, Monitor};
use rounded_corners::settings::{Settings, SettingsBackend};

/// Drives the corner decorations against a simulated shell session so the
/// whole lifecycle can be exercised from a terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of 1920x1080 monitors to simulate, side by side
    #[arg(long, default_value_t = 1)]
    monitors: usize,

    /// Preference file to load and persist (defaults to the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let monitors: Vec<Monitor> = (0..args.monitors.max(1))
        .map(|i| Monitor::new(i as i32 * 1920, 0, 1920, 1080))
        .collect();
    info!("simulating session: monitors={}", monitors.len());

    let backend = SettingsBackend::load(args.config);
    let prefs = Settings::new(Rc::clone(&backend));
    let host = HostShell::new(monitors);
    let extension = Extension::new(Rc::clone(&host), backend);

    Extension::enable(&extension);
    host.layout.startup_complete();

    {
        let ext = extension.borrow();
        let panel = ext.panel_corners().map_or(0, |m| m.corners().len());
        let screen = ext.screen_corners().map_or(0, |m| m.corners().len());
        info!("after startup: panel_corners={panel}, screen_corners={screen}");
    }

    // Flip the screen-corner category on at runtime, the way the settings
    // dialog would, and watch the managers react.
    prefs.screen_corners.set(true);
    {
        let ext = extension.borrow();
        let screen = ext.screen_corners().map_or(0, |m| m.corners().len());
        info!("screen corners enabled: screen_corners={screen}");
    }

    // A monitor joining the session rebuilds the per-monitor widgets.
    let grown: Vec<Monitor> = (0..args.monitors.max(1) + 1)
        .map(|i| Monitor::new(i as i32 * 1920, 0, 1920, 1080))
        .collect();
    host.layout.set_monitors(grown);
    {
        let ext = extension.borrow();
        let screen = ext.screen_corners().map_or(0, |m| m.corners().len());
        info!("monitor added: screen_corners={screen}");
    }

    Extension::disable(&extension);
    info!("disabled: chrome_len={}", host.layout.chrome_len());

    Ok(())
}
