//! servo-ctl - drive a servo bank from the command line
//!
//! Every command runs against a simulated bus; set `RUST_LOG=servo_motion=debug`
//! to see each motion step, or `servo_ctl=trace` for the raw bus writes.
//!
//! ## Environment Variables
//! - `SERVO_CONFIG`: controller configuration file (TOML)
//! - `SERVO_PACING_MS`: override the pacing interval between motion steps

mod bus;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use servo_motion::{
    CancelToken, ChannelResult, ControllerConfig, RunReport, ServoController,
};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bus::SimulatedBus;

#[derive(Parser)]
#[command(name = "servo-ctl")]
#[command(author = "SIL Contributors")]
#[command(version = "2026.1.16")]
#[command(about = "Smoothing motion controller for servo banks", long_about = None)]
struct Cli {
    /// Controller configuration file (TOML)
    #[arg(long, global = true, env = "SERVO_CONFIG")]
    config: Option<PathBuf>,

    /// Pacing interval between motion steps, in milliseconds
    #[arg(long, global = true, env = "SERVO_PACING_MS")]
    pacing_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive every channel to the middle of its range
    Home,

    /// Move one channel to an absolute or fractional angle
    Move {
        /// Channel index
        #[arg(short, long)]
        channel: usize,

        /// Absolute angle in degrees (clamped to the channel bounds)
        #[arg(short, long, conflicts_with = "fraction", required_unless_present = "fraction")]
        angle: Option<f64>,

        /// Fraction of the channel range (0.0 - 1.0)
        #[arg(short, long)]
        fraction: Option<f64>,

        /// Smoothing factor to use for this channel
        #[arg(short, long)]
        smoothing: Option<f64>,
    },

    /// Move all channels together through a series of angles
    Sweep {
        /// Angle increment in degrees
        #[arg(long, default_value_t = 45.0)]
        step: f64,
    },

    /// Print the drive table of a channel
    Table {
        /// Channel index
        #[arg(short, long)]
        channel: usize,
    },

    /// Print the effective configuration, or write it to a file
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "servo_ctl=info,servo_motion=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref(), cli.pacing_ms)?;
    let bus = SimulatedBus::new();
    let controller = ServoController::from_config(&config, bus.clone())
        .context("Failed to create controller")?;

    match cli.command {
        Commands::Home => {
            println!("{} all channels", "Homing".green().bold());
            let report = controller.homing_with_cancel(&interrupt_token()).await?;
            print_report(&controller, &report)?;
        }

        Commands::Move {
            channel,
            angle,
            fraction,
            smoothing,
        } => {
            if let Some(factor) = smoothing {
                controller.set_smoothing_factor(channel, factor)?;
            }
            match (angle, fraction) {
                (Some(angle), _) => controller.set_absolute_angle(channel, angle)?,
                (None, Some(fraction)) => controller.set_fractional_angle(channel, fraction)?,
                (None, None) => bail!("either --angle or --fraction is required"),
            }

            let target = controller.target_angle(channel)?;
            println!(
                "{} channel {} to {}°",
                "Moving".green().bold(),
                channel.to_string().cyan(),
                target
            );
            let cancel = interrupt_token();
            let report = controller.run_channels(&[channel], &cancel).await?;
            print_report(&controller, &report)?;
        }

        Commands::Sweep { step } => {
            if !(step > 0.0) {
                bail!("--step must be positive, got {}", step);
            }
            let cancel = interrupt_token();
            let count = controller.channel_count()?;
            let mut angle = 0.0;
            while angle <= 180.0 && !cancel.is_cancelled() {
                println!("{} all channels to {}°", "Sweeping".green().bold(), angle);
                controller.set_absolute_angles(&vec![angle; count])?;
                let report = controller.run_with_cancel(&cancel).await?;
                print_report(&controller, &report)?;
                angle += step;
            }
        }

        Commands::Table { channel } => {
            let (min, max) = controller.bounds(channel)?;
            let table = controller.drive_table(channel)?;
            println!(
                "{} channel {} ({}° - {}°, {} entries)",
                "Drive table".bold(),
                channel,
                min,
                max,
                table.len()
            );
            for (offset, value) in table.iter().enumerate() {
                println!("  {:>5}°  {:>6}", min as i64 + offset as i64, value);
            }
        }

        Commands::Config { output } => {
            let effective = controller.export_config()?;
            match output {
                Some(path) => {
                    effective.save(&path)?;
                    println!("{} {}", "   Written".green().bold(), path.display().to_string().cyan());
                }
                None => print!("{}", effective.to_string()?),
            }
        }
    }

    if bus.write_count() > 0 {
        tracing::debug!(writes = bus.write_count(), last = ?bus.last_values(), "Bus summary");
    }
    Ok(())
}

fn load_config(path: Option<&Path>, pacing_ms: Option<u64>) -> Result<ControllerConfig> {
    let mut config = match path {
        Some(path) => ControllerConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ControllerConfig::default(),
    };
    if let Some(ms) = pacing_ms {
        config.pacing_ms = ms;
    }
    Ok(config)
}

/// Token cancelled on Ctrl-C
fn interrupt_token() -> CancelToken {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling motion");
            token.cancel();
        }
    });
    cancel
}

fn print_report(controller: &ServoController<SimulatedBus>, report: &RunReport) -> Result<()> {
    let pacing = controller.pacing()?;
    for outcome in &report.outcomes {
        let angle = controller.current_angle(outcome.channel)?;
        let status = match &outcome.result {
            ChannelResult::Converged => "converged".green(),
            ChannelResult::Cancelled => "cancelled".yellow(),
            ChannelResult::Failed(e) => format!("failed: {}", e).red(),
        };
        println!(
            "  channel {:>2}  {:>6.1}°  {:>4} steps  {}",
            outcome.channel, angle, outcome.steps, status
        );
    }
    println!("  {} in ~{:?}", "done".bold(), pacing * report.max_steps());
    Ok(())
}
