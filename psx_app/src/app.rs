//! Headless host: spawns the emulator thread and consumes the draw-message stream. A real
//! frontend would hand the messages to a rasterizer, this one only keeps statistics.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info};

use psx_lib::{link, GpuMsg, Output, Psx};

use crate::error::{AppError, AppResult};

/// How long the machine runs when no duration is given on the command line
const DEFAULT_RUN_SECONDS: u64 = 5;

struct Options {
    bios_path: PathBuf,
    run_for: Duration,
}

impl Options {
    fn from_args() -> AppResult<Options> {
        let mut args = env::args().skip(1);

        let bios_path = match args.next() {
            Some(p) => PathBuf::from(p),
            None => return Err(AppError::BadUsage),
        };

        let seconds = match args.next() {
            Some(s) => s.parse().map_err(|_| AppError::BadUsage)?,
            None => DEFAULT_RUN_SECONDS,
        };

        Ok(Options {
            bios_path,
            run_for: Duration::from_secs(seconds),
        })
    }
}

#[derive(Default)]
struct MessageStats {
    triangles: u64,
    quads: u64,
    offsets: u64,
    draws: u64,
}

impl MessageStats {
    fn tally(&mut self, msg: &GpuMsg) {
        match msg {
            GpuMsg::Triangle(_) => self.triangles += 1,
            GpuMsg::Quad(_) => self.quads += 1,
            GpuMsg::Offset { .. } => self.offsets += 1,
            GpuMsg::Draw => self.draws += 1,
        }
    }

    fn total(&self) -> u64 {
        self.triangles + self.quads + self.offsets + self.draws
    }
}

pub struct App;

impl App {
    pub fn start() -> AppResult<()> {
        let opts = Options::from_args()?;

        let bios = fs::read(&opts.bios_path)?;
        info!("Loaded BIOS image from {}", opts.bios_path.display());

        let (tx, rx) = link();
        let mut psx = Psx::new(&bios, tx)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let emu_shutdown = shutdown.clone();

        let builder = thread::Builder::new()
            .name("psx cpu".to_string())
            .stack_size(1024 * 1024);

        let emulator = builder
            .spawn(move || {
                let result = psx.run(&emu_shutdown);

                (psx, result)
            })
            .unwrap();

        let mut stats = MessageStats::default();
        let deadline = Instant::now() + opts.run_for;
        let mut last_report = Instant::now();

        while Instant::now() < deadline && !emulator.is_finished() {
            match rx.consume() {
                Some(msg) => stats.tally(&msg),
                None => thread::sleep(Duration::from_millis(1)),
            }

            if last_report.elapsed() >= Duration::from_secs(1) {
                info!(
                    "{} draw messages so far ({} triangles, {} quads, {} draw calls)",
                    stats.total(),
                    stats.triangles,
                    stats.quads,
                    stats.draws
                );
                last_report = Instant::now();
            }
        }

        // Raise the shutdown flag and keep draining: the emulator only checks the flag between
        // instructions and may be parked on the hand-off slot right now
        shutdown.store(true, Ordering::SeqCst);

        drain_until_finished(&rx, &mut stats, &emulator);

        let (psx, result) = emulator.join().unwrap();

        // Take whatever was left in the slot when the emulator stopped
        if let Some(msg) = rx.consume() {
            stats.tally(&msg);
        }

        info!(
            "Machine stopped after {} draw messages ({} triangles, {} quads, {} offsets, {} draw calls)",
            stats.total(),
            stats.triangles,
            stats.quads,
            stats.offsets,
            stats.draws
        );

        if let Err(e) = result {
            error!("The emulator died: {}", e);
            error!("CPU state: {:?}", psx.cpu());

            return Err(e.into());
        }

        Ok(())
    }
}

fn drain_until_finished(
    rx: &Output,
    stats: &mut MessageStats,
    emulator: &thread::JoinHandle<(Psx, psx_lib::Result<()>)>,
) {
    while !emulator.is_finished() {
        match rx.consume() {
            Some(msg) => stats.tally(&msg),
            None => thread::yield_now(),
        }
    }
}
