//! sigdefer - Deferred signal handling demo
//!
//! Runs a toy interpreter loop that polls at safe points, sleeps inside
//! blocking sections, and reports the signals it handles.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sigdefer::{sys, Raise, Runtime, RuntimeConfig, RuntimeSignal, SignalAction};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Safe points between major-slice requests in the watch loop.
const SLICE_EVERY: u64 = 16;

#[derive(Parser)]
#[command(name = "sigdefer")]
#[command(version)]
#[command(about = "Deferred signal handling for interpreter runtimes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the signals supported on this host
    List,

    /// Run a safe-point loop and report received signals
    ///
    /// Requires `signals.install_handlers` to be enabled in the config (the default).
    Watch {
        /// Signal to watch (name or runtime number), repeatable
        #[arg(short, long = "signal", default_value = "SIGUSR1")]
        signals: Vec<String>,

        /// Stop after this many signals
        #[arg(short, long, default_value = "1")]
        count: usize,

        /// Give up after this many milliseconds
        #[arg(long, default_value = "5000")]
        timeout_ms: u64,

        /// Config file (default: sigdefer.toml searched from the current directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Blocking-call length per loop iteration in milliseconds
        #[arg(long, default_value = "5")]
        sleep_ms: u64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::List => cmd_list(),
        Commands::Watch {
            signals,
            count,
            timeout_ms,
            config,
            sleep_ms,
        } => cmd_watch(
            &signals,
            count,
            Duration::from_millis(timeout_ms),
            config.as_ref(),
            Duration::from_millis(sleep_ms),
        ),
    }
}

fn cmd_list() -> Result<()> {
    let runtime = Runtime::new();
    println!("{:>8}  {:>6}  NAME", "RUNTIME", "HOST");
    for (signal, host) in runtime.numbering().supported() {
        println!("{:>8}  {:>6}  {}", signal.raw(), host, signal);
    }
    Ok(())
}

fn cmd_watch(
    names: &[String],
    count: usize,
    timeout: Duration,
    config_path: Option<&PathBuf>,
    sleep: Duration,
) -> Result<()> {
    let config = match config_path {
        Some(path) => RuntimeConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => RuntimeConfig::load_from_cwd().context("Failed to load config")?,
    };

    if !config.signals.install_handlers {
        bail!("watch needs host signals, but the config sets signals.install_handlers = false");
    }

    let runtime = Runtime::builder()
        .config(&config)
        .build()
        .context("Failed to build runtime")?;

    let received = Arc::new(AtomicUsize::new(0));
    let mut watched = Vec::with_capacity(names.len());
    for name in names {
        let signal = runtime
            .numbering()
            .parse(name)
            .with_context(|| format!("Unknown signal: {}", name))?;
        let received = Arc::clone(&received);
        runtime
            .register_signal_handler(
                signal,
                SignalAction::custom(move |event| {
                    println!("received {}", event.signal);
                    let _ = io::stdout().flush();
                    received.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .with_context(|| format!("Failed to watch {}", signal))?;
        watched.push(signal);
    }

    if !watched.contains(&RuntimeSignal::INT) {
        runtime.register_signal_handler(
            RuntimeSignal::INT,
            SignalAction::custom(|event| Err(Raise::Interrupt(event.signal))),
        )?;
    }

    let context = runtime.attach();
    println!("pid {}", std::process::id());
    io::stdout().flush()?;

    let start = Instant::now();
    let mut slices = 0u64;
    let mut safe_points = 0u64;
    let outcome = loop {
        safe_points += 1;
        if safe_points % SLICE_EVERY == 0 {
            runtime.request_major_slice();
        }
        if let Err(raise) = context.poll(&mut || slices += 1) {
            break Err(raise);
        }
        if received.load(Ordering::SeqCst) >= count {
            break Ok(());
        }
        if start.elapsed() >= timeout {
            break Ok(());
        }
        sys::sleep(&context, sleep);
    };

    log::info!(
        "{} safe points, {} major slices in {:.1?}",
        safe_points,
        slices,
        start.elapsed()
    );
    drop(context);
    runtime.shutdown();

    match outcome {
        Err(Raise::Interrupt(signal)) => {
            println!("interrupted by {}", signal);
            std::process::exit(130);
        }
        Err(raise) => bail!(raise),
        Ok(()) => {
            let total = received.load(Ordering::SeqCst);
            if total < count {
                bail!("timed out after {:?} with {} of {} signals", timeout, total, count);
            }
            println!("done");
            Ok(())
        }
    }
}
