//! irqlat - IRQ latency measurement
//!
//! Programs a periodic interrupt generator, measures how long software takes
//! to service each interrupt, and prints a microsecond latency histogram when
//! interrupted with Ctrl-C or after a fixed number of wakeups.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod args;
mod error;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use irqlat_engine::{
    EngineConfig, LatencyEngine, LatencyHistogram, Measurement, MeasurementReport, StopToken,
};
use irqlat_hw::{DevicePlatform, SoftwareTimerPlatform, software_impl::DEFAULT_SOFTWARE_FCLK_HZ};
use irqlat_scheduler::{RTSetup, RtTask};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(target_os = "linux")]
use irqlat_hw::{PciId, PciUioConfig, PciUioPlatform};
#[cfg(target_os = "linux")]
use std::path::PathBuf;

use crate::args::{parse_frequency, parse_u64};
use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "irqlat")]
#[command(about = "Measure interrupt service latency against a periodic IRQ generator")]
#[command(version)]
#[command(long_about = "
irqlat starts a periodic interrupt generator and, on a SCHED_FIFO thread,
measures the time from each interrupt's generation to the moment it is
serviced. Latencies are binned in one-microsecond buckets; samples of one
second or more are counted as missed.

The run ends on Ctrl-C or after --count wakeups. The report lists the wakeup
count, the missed count and one `latency count` line per non-empty bucket.
Numeric arguments accept decimal or 0x-prefixed hexadecimal.
")]
struct Cli {
    /// Interrupt frequency in Hz
    #[arg(long, default_value = "1000", value_parser = parse_frequency)]
    freq: u32,

    /// Stop after this many wakeups (0 runs until Ctrl-C)
    #[arg(long, default_value = "0", value_parser = parse_u64)]
    count: u64,

    /// Output format (text or JSON)
    #[arg(long, help = "Output the report in JSON format for machine parsing")]
    json: bool,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Do not switch the measurement thread to SCHED_FIFO
    #[arg(long)]
    no_rt: bool,

    /// Do not lock process memory
    #[arg(long)]
    no_mlock: bool,

    /// Pin the measurement thread to this CPU
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..64))]
    cpu: Option<u8>,

    /// Read the generator's own interrupt count before stopping it
    #[arg(long)]
    cross_check: bool,

    /// Use the in-process software generator instead of the PCI card
    #[arg(long)]
    simulate: bool,

    /// Counter frequency of the software generator in Hz
    #[arg(long, default_value_t = DEFAULT_SOFTWARE_FCLK_HZ, value_parser = parse_frequency)]
    sim_fclk: u32,

    /// PCI vendor:device of the generator card
    #[cfg(target_os = "linux")]
    #[arg(
        long,
        default_value = "10ee:eb01",
        value_parser = parse_pci_id,
        conflicts_with = "simulate"
    )]
    pci: PciId,

    /// BAR index of the generator's register block
    #[cfg(target_os = "linux")]
    #[arg(
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(0..6),
        conflicts_with = "simulate"
    )]
    bar: u8,

    /// UIO device delivering the generator's interrupts
    #[cfg(target_os = "linux")]
    #[arg(long, default_value = "/dev/uio0", conflicts_with = "simulate")]
    uio: PathBuf,
}

#[cfg(target_os = "linux")]
fn parse_pci_id(s: &str) -> Result<PciId, String> {
    s.parse()
}

impl Cli {
    fn engine_config(&self) -> Result<EngineConfig, CliError> {
        Ok(EngineConfig::builder()
            .irq_frequency_hz(self.freq)
            .irq_count_limit(self.count)
            .cross_check(self.cross_check)
            .build()?)
    }

    fn rt_setup(&self) -> RTSetup {
        let setup = if self.no_rt {
            RTSetup::minimal()
        } else {
            RTSetup::default().with_lock_memory(!self.no_mlock)
        };
        match self.cpu {
            Some(cpu) => setup.with_cpu(usize::from(cpu)),
            None => setup,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("irqlat={log_level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match execute(&cli) {
        Ok(()) => Ok(()),
        Err(e) => {
            let exit_code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            if cli.json {
                output::print_error_json(&e, exit_code);
            } else {
                output::print_error_human(&e);
            }
            std::process::exit(exit_code);
        }
    }
}

fn execute(cli: &Cli) -> Result<()> {
    let config = cli.engine_config()?;
    let setup = cli.rt_setup();

    let stop = StopToken::new();
    let handler_token = stop.clone();
    ctrlc::set_handler(move || handler_token.request_stop())
        .context("failed to install Ctrl-C handler")?;

    let measurement = if cli.simulate {
        measure(SoftwareTimerPlatform::new(cli.sim_fclk), config, setup, stop)?
    } else {
        measure(hardware_platform(cli)?, config, setup, stop)?
    };

    let report = MeasurementReport::from(&measurement);
    output::print_report(&report, cli.json).context("failed to write report")?;
    Ok(())
}

#[cfg(target_os = "linux")]
fn hardware_platform(cli: &Cli) -> Result<PciUioPlatform, CliError> {
    Ok(PciUioPlatform::new(PciUioConfig {
        pci_id: cli.pci,
        bar: cli.bar,
        uio_device: cli.uio.clone(),
        ..PciUioConfig::default()
    }))
}

#[cfg(not(target_os = "linux"))]
fn hardware_platform(_cli: &Cli) -> Result<SoftwareTimerPlatform, CliError> {
    Err(CliError::HardwareUnsupported)
}

/// Run the engine on its own real-time thread and hand the result back.
fn measure<P>(
    platform: P,
    config: EngineConfig,
    setup: RTSetup,
    stop: StopToken,
) -> Result<Measurement, CliError>
where
    P: DevicePlatform + Send + 'static,
{
    info!(
        platform = platform.name(),
        irq_frequency_hz = config.irq_frequency_hz,
        irq_count_limit = config.irq_count_limit,
        "starting measurement"
    );
    let histogram = LatencyHistogram::new();
    let task = RtTask::spawn("irqlat-engine", setup, move || {
        let mut engine = LatencyEngine::new(platform, config, stop)?;
        engine.run(histogram)
    })
    .map_err(CliError::Spawn)?;
    Ok(task.wait()?)
}
