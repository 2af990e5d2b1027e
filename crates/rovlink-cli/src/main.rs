//! `rovlink` – ROVLink command line host.
//!
//! Runs the telemetry ingestors and the control loop headless, with a small
//! operator console on stdin.  It:
//!
//! 1. Loads `~/.rovlink/config.toml` (writing the defaults on first run).
//! 2. Spawns the broker and socket ingestors that are enabled.
//! 3. Ticks the [`ControlLoop`] at the configured rate, logging the pose.
//! 4. Reads operator commands (see [`commands`]) on a blocking thread.
//! 5. On **Ctrl-C** or `quit`, cancels the ingestors and joins them.

mod commands;
mod config;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use colored::Colorize;
use rovlink_kernel::ToggleHandle;
use rovlink_middleware::{IngestorSet, MessageInbox};
use rovlink_perception::Pose;
use rovlink_runtime::{ControlLoop, ControlLoopConfig, LocalInput};
use rovlink_runtime::control_loop::TickOutput;
use rovlink_runtime::telemetry::init_tracing;
use rovlink_types::ControlMode;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use commands::Command;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);
const POSE_REPORT_INTERVAL: Duration = Duration::from_secs(1);

fn main() {
    // Must run before the Tokio runtime exists.
    let _tracing = init_tracing("rovlink");

    print_banner();

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_ctrlc = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – shutting down …".yellow().bold());
        shutdown_ctrlc.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; use `quit` to stop");
    }

    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = config::defaults_with_env();
            match config::save(&config::Config::default()) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::defaults_with_env()
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start the async runtime");
            std::process::exit(1);
        }
    };

    let clean = runtime.block_on(run(cfg, shutdown));
    if !clean {
        std::process::exit(2);
    }
}

/// Returns `false` when an ingestor had to be left behind at shutdown.
async fn run(cfg: config::Config, shutdown: Arc<AtomicBool>) -> bool {
    if cfg.tick_rate() != cfg.tick_hz {
        warn!(configured = cfg.tick_hz, using = cfg.tick_rate(), "tick_hz out of range");
    }

    let (inbox_tx, inbox_rx) = MessageInbox::channel();
    let mut ingestors = IngestorSet::new(inbox_tx);
    if cfg.broker.enabled {
        ingestors.spawn(cfg.broker.listener());
    }
    if cfg.socket.enabled {
        ingestors.spawn(Box::new(cfg.socket.listener()));
    }
    if ingestors.is_empty() {
        warn!("no ingestor enabled; remote mode will only see silence");
    }

    let mut control = ControlLoop::new(
        ControlLoopConfig {
            start_mode: cfg.start_mode,
            ..Default::default()
        },
        inbox_rx,
    );

    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
    spawn_console(cmd_tx, control.toggle_handle(), shutdown.clone());

    println!(
        "  Ticking at {} Hz in {} mode. Type {} for commands.\n",
        cfg.tick_rate(),
        control.mode().to_string().bold(),
        "help".bold().cyan()
    );

    let mut interval = tokio::time::interval(cfg.tick_period());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut input = LocalInput::default();
    let mut last_tick = Instant::now();
    let mut last_report = last_tick;

    while !shutdown.load(Ordering::SeqCst) {
        interval.tick().await;

        while let Ok(cmd) = cmd_rx.try_recv() {
            apply_command(cmd, &mut input, &mut control);
        }

        let now = Instant::now();
        let out = control.tick(now - last_tick);
        last_tick = now;

        if let Some(t) = out.transition {
            println!(
                "  {} {} → {}",
                "Mode switched:".bold(),
                t.from,
                t.to.to_string().green().bold()
            );
        }
        if now - last_report >= POSE_REPORT_INTERVAL {
            report_pose(&out, ingestors.len() - ingestors.finished());
            last_report = now;
        } else {
            debug!(mode = %out.mode, drained = out.drained, "tick");
        }
    }

    let report = ingestors.shutdown(SHUTDOWN_TIMEOUT).await;
    for name in &report.joined {
        println!("  {} {} stopped", "✓".green(), name);
    }
    for (name, e) in &report.failed {
        println!("  {} {} stopped with error: {}", "!".yellow(), name, e);
    }
    for name in &report.timed_out {
        println!("  {} {} did not stop in time", "✗".red(), name);
    }
    println!("{}", "  Exiting ROVLink.".green());
    report.is_complete()
}

fn apply_command(cmd: Command, input: &mut LocalInput, control: &mut ControlLoop) {
    match cmd {
        Command::Move { x, y } => {
            input.move_x = x;
            input.move_y = y;
        }
        Command::Vertical(v) => input.vertical = v,
        Command::Rotate(r) => input.rotation = r,
        Command::Stop => *input = LocalInput::default(),
        Command::Pose => {
            print_pose(control.mode(), &control.pose());
            let t = control.telemetry();
            println!(
                "    telemetry  distance={:.2} angle={:.2} altitude={:.2} follow_speed={:.2}",
                t.distance, t.angle, t.altitude, t.follow_speed
            );
            if let Some((offset, heading)) = t.offset_heading {
                println!("    offset/heading  {offset:.3} / {heading:.1}°");
            }
            return;
        }
        // Handled on the console thread.
        Command::Toggle | Command::Help | Command::Quit => return,
    }
    if control.mode() == ControlMode::Remote {
        println!("  {}", "(input stored; applies in local mode)".dimmed());
    }
    control.set_local_input(*input);
}

fn report_pose(out: &TickOutput, ingestors_running: usize) {
    let p = out.pose.position;
    let r = out.pose.rotation;
    info!(
        mode = %out.mode,
        x = p.x,
        y = p.y,
        z = p.z,
        qw = r.w,
        qx = r.x,
        qy = r.y,
        qz = r.z,
        ingestors_running,
        "pose"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Operator console
// ─────────────────────────────────────────────────────────────────────────────

/// Read stdin on a plain thread so the tick loop never waits on the
/// terminal.  Toggles go straight to the arbiter handle; everything else is
/// forwarded to the tick loop.
fn spawn_console(
    tx: mpsc::UnboundedSender<Command>,
    toggle: ToggleHandle,
    shutdown: Arc<AtomicBool>,
) {
    let spawned = std::thread::Builder::new()
        .name("rovlink-console".to_string())
        .spawn(move || {
            use std::io::BufRead;
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(l) => l,
                    Err(e) => {
                        eprintln!("{}: {}", "Read error".red(), e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match commands::parse(&line) {
                    Ok(Command::Toggle) => {
                        toggle.toggle();
                        println!("  toggle requested (current: {})", toggle.mode());
                    }
                    Ok(Command::Help) => print_help(),
                    Ok(Command::Quit) => {
                        shutdown.store(true, Ordering::SeqCst);
                        break;
                    }
                    Ok(cmd) => {
                        if tx.send(cmd).is_err() {
                            break;
                        }
                    }
                    Err(e) => println!("{} {}. Type {} for commands.", "✗".red(), e, "help".bold()),
                }
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "failed to start the operator console; Ctrl-C still stops");
    }
}

fn print_help() {
    println!();
    println!("{}", "ROVLink Commands".bold().underline());
    println!("  {}   – switch local/remote control", "l  toggle".bold().cyan());
    println!("  {}    – planar stick input", "move <x> <y>".bold().cyan());
    println!("  {}    – up/down thrust", "vertical <v>".bold().cyan());
    println!("  {}      – yaw input", "rotate <r>".bold().cyan());
    println!("  {}            – release all inputs", "stop".bold().cyan());
    println!("  {}            – print pose and telemetry", "pose".bold().cyan());
    println!("  {}     – shut down", "quit  exit".bold().cyan());
    println!();
}

fn print_pose(mode: ControlMode, pose: &Pose) {
    let p = pose.position;
    let r = pose.rotation;
    println!(
        "  [{}] position ({:.3}, {:.3}, {:.3})  rotation (w {:.3}, x {:.3}, y {:.3}, z {:.3})",
        mode.to_string().bold(),
        p.x,
        p.y,
        p.z,
        r.w,
        r.x,
        r.y,
        r.z
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ___  ____ _   ____   _      __  "#.bold().cyan());
    println!("{}", r#"  / _ \/ __ \ | / / /  (_)__  / /__"#.bold().cyan());
    println!("{}", r#" / , _/ /_/ / |/ / /__/ / _ \/  '_/"#.bold().cyan());
    println!("{}", r#"/_/|_|\____/|___/____/_/_//_/_/\_\ "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "ROVLink".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Telemetry smoothing and control arbitration");
    println!();
}
