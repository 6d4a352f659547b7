use anyhow::{Context, Result, bail};
use bytering::SpscByteRing;
use clap::Parser;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// SPSC byte ring throughput and ordering stress test.
#[derive(Parser)]
#[command(name = "bytering-stress", version)]
struct Args {
    /// Ring capacity in bytes
    #[arg(long, default_value_t = 64 * 1024)]
    capacity: usize,

    /// How long the producer keeps writing
    #[arg(long, default_value_t = 5)]
    duration_secs: u64,

    /// Bytes offered per write_slice call
    #[arg(long, default_value_t = 64)]
    chunk: usize,
}

/// Byte at absolute stream position `pos`; 251 is prime so the pattern never
/// lines up with a power-of-two capacity.
#[inline(always)]
fn pattern(pos: u64) -> u8 {
    (pos % 251) as u8
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if args.chunk == 0 {
        bail!("--chunk must be greater than zero");
    }
    info!(
        capacity = args.capacity,
        chunk = args.chunk,
        duration_secs = args.duration_secs,
        "SPSC byte ring stress test"
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let mut storage = vec![0u8; args.capacity];
    let mut ring = SpscByteRing::from_slice(&mut storage).context("failed to create ring")?;
    let (mut prod, mut cons) = ring.split();
    let chunk = args.chunk;
    let writer_done = AtomicBool::new(false);

    let (written, read, elapsed) = std::thread::scope(|scope| -> Result<(u64, u64, Duration)> {
        let writer_running = running.clone();
        let writer_done = &writer_done;
        let writer = scope.spawn(move || {
            let mut block = vec![0u8; chunk];
            let mut pos = 0u64;
            while writer_running.load(Ordering::Relaxed) {
                for (i, b) in block.iter_mut().enumerate() {
                    *b = pattern(pos + i as u64);
                }
                let mut offset = 0;
                while offset < chunk && writer_running.load(Ordering::Relaxed) {
                    offset += prod.write_slice(&block[offset..]);
                }
                pos += offset as u64;
            }
            writer_done.store(true, Ordering::Release);
            pos
        });

        let reader = scope.spawn(move || -> Result<u64> {
            let mut block = vec![0u8; chunk];
            let mut pos = 0u64;
            loop {
                let n = cons.read_slice(&mut block);
                for &b in &block[..n] {
                    if b != pattern(pos) {
                        bail!("corrupt byte at {}: got {}, expected {}", pos, b, pattern(pos));
                    }
                    pos += 1;
                }
                if n == 0 && writer_done.load(Ordering::Acquire) && cons.is_empty() {
                    break;
                }
            }
            Ok(pos)
        });

        let start = Instant::now();
        let deadline = start + Duration::from_secs(args.duration_secs);
        while running.load(Ordering::Relaxed) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(50));
        }
        running.store(false, Ordering::SeqCst);

        let written = writer
            .join()
            .map_err(|_| anyhow::anyhow!("writer thread panicked"))?;
        let read = reader
            .join()
            .map_err(|_| anyhow::anyhow!("reader thread panicked"))??;
        Ok((written, read, start.elapsed()))
    })?;

    if written != read {
        bail!("lost bytes: wrote {}, read {}", written, read);
    }

    let secs = elapsed.as_secs_f64().max(f64::EPSILON);
    let throughput_mb_s = written as f64 / secs / 1024.0 / 1024.0;
    info!(bytes = written, throughput_mb_s, "stream verified");
    info!("{}", ring.stats());
    Ok(())
}
