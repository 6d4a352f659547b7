use anyhow::{Context, Result};
use bytering::{Consumer, Producer, SpscByteRing};
use clap::Parser;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Pipe stdin to stdout through a single-producer/single-consumer byte ring.
#[derive(Parser)]
#[command(name = "bytering", version)]
struct Cli {
    /// Ring capacity in bytes
    #[arg(long, default_value_t = 4096)]
    capacity: usize,

    /// Interval between status lines on stderr
    #[arg(long, default_value_t = 1000)]
    status_interval_ms: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    info!(capacity = cli.capacity, "bytering v{}", env!("CARGO_PKG_VERSION"));

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    // The stdin reader may stay blocked after shutdown, so the ring lives for
    // the whole process and the reader thread is never joined.
    let storage: &'static mut [u8] = Box::leak(vec![0u8; cli.capacity].into_boxed_slice());
    let ring: &'static mut SpscByteRing<'static> =
        Box::leak(Box::new(SpscByteRing::from_slice(storage)?));
    let (prod, cons) = ring.split();

    let input_done = Arc::new(AtomicBool::new(false));
    {
        let running = running.clone();
        let input_done = input_done.clone();
        std::thread::Builder::new()
            .name("stdin-producer".into())
            .spawn(move || {
                if let Err(e) = pump_stdin(prod, &running) {
                    warn!(error = %e, "stdin reader stopped");
                }
                input_done.store(true, Ordering::Release);
            })
            .context("failed to spawn stdin reader")?;
    }

    let total = drain_to(
        &mut io::stdout().lock(),
        cons,
        &running,
        &input_done,
        Duration::from_millis(cli.status_interval_ms),
    )?;
    info!(total_bytes = total, "done");
    Ok(())
}

fn pump_stdin(mut prod: Producer<'_, '_>, running: &AtomicBool) -> io::Result<()> {
    let mut stdin = io::stdin().lock();
    let mut chunk = [0u8; 512];

    while running.load(Ordering::Relaxed) {
        let n = stdin.read(&mut chunk)?;
        if n == 0 {
            debug!("stdin closed");
            return Ok(());
        }
        let mut offset = 0;
        while offset < n {
            if !running.load(Ordering::Relaxed) {
                return Ok(());
            }
            let written = prod.write_slice(&chunk[offset..n]);
            if written == 0 {
                std::thread::yield_now();
            }
            offset += written;
        }
    }
    Ok(())
}

fn drain_to<W: Write>(
    out: &mut W,
    mut cons: Consumer<'_, '_>,
    running: &AtomicBool,
    input_done: &AtomicBool,
    status_interval: Duration,
) -> Result<u64> {
    let mut chunk = [0u8; 512];
    let mut total = 0u64;
    let mut last_report = Instant::now();

    while running.load(Ordering::Relaxed) {
        let n = cons.read_slice(&mut chunk);
        if n > 0 {
            out.write_all(&chunk[..n])?;
            total += n as u64;
        } else if input_done.load(Ordering::Acquire) && cons.is_empty() {
            break;
        } else {
            out.flush()?;
            std::thread::sleep(Duration::from_millis(1));
        }

        if last_report.elapsed() >= status_interval {
            info!(
                total_bytes = total,
                used = cons.available_data(),
                free = cons.available_space(),
                "[STATUS]"
            );
            last_report = Instant::now();
        }
    }

    // Interrupted: hand over whatever the producer already published.
    let mut leftover = 0u64;
    loop {
        let n = cons.read_slice(&mut chunk);
        if n == 0 {
            break;
        }
        out.write_all(&chunk[..n])?;
        leftover += n as u64;
    }
    if leftover > 0 {
        debug!(leftover_bytes = leftover, "drained ring after shutdown");
    }

    out.flush()?;
    Ok(total + leftover)
}
