// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES demo against the software engine and an in-memory panel

use {
    aes_lcd_demo::{
        aes::Mode,
        board::{self, Platform},
        demo::{AesDemo, DemoConfig},
        display::{Image, BYTES_PER_PIXEL},
        logging::{init_logging, UartLogger},
        sim::{FrameBuffer, SimClock, SoftAes},
        timer::Clock,
    },
    core::fmt,
    std::{process::ExitCode, sync::OnceLock, time::Instant},
};

const IMAGE_WIDTH: u16 = 82;
const IMAGE_HEIGHT: u16 = 76;

/// Cycles the simulated core spends per clock read.
const CYCLES_PER_READ: u64 = 40;

/// Engine latency, in status polls.
const ENGINE_LATENCY: u32 = 3;

struct Stdout;

impl fmt::Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        print!("{}", s);
        Ok(())
    }
}

/// Wall clock for log timestamps.
struct HostClock;

static START: OnceLock<Instant> = OnceLock::new();

impl Clock for HostClock {
    fn now_cycles(&self) -> u64 {
        START.get_or_init(Instant::now).elapsed().as_micros() as u64
    }

    fn clock_hz(&self) -> u32 {
        1_000_000
    }
}

static LOGGER: UartLogger<Stdout, HostClock> = UartLogger::new(Stdout, HostClock);

/// Diagonal RGB565 gradient.
fn test_image() -> Vec<u8> {
    let len = IMAGE_WIDTH as usize * IMAGE_HEIGHT as usize * BYTES_PER_PIXEL;
    let mut pixels = Vec::with_capacity(len);
    for y in 0..IMAGE_HEIGHT {
        for x in 0..IMAGE_WIDTH {
            let r = (x as u32 * 31 / IMAGE_WIDTH as u32) as u16;
            let g = ((x + y) as u32 * 63 / (IMAGE_WIDTH + IMAGE_HEIGHT) as u32) as u16;
            let b = (y as u32 * 31 / IMAGE_HEIGHT as u32) as u16;
            let raw = (r << 11) | (g << 5) | b;
            pixels.extend_from_slice(&raw.to_be_bytes());
        }
    }
    pixels
}

fn run(platform: &Platform) -> Result<(), aes_lcd_demo::Error> {
    log::info!("{}", platform);

    let pixels = test_image();
    let image = Image::new(IMAGE_WIDTH, IMAGE_HEIGHT, &pixels)?;

    let (width, height) = if platform.orientation.is_transposed() {
        (platform.lcd_height, platform.lcd_width)
    } else {
        (platform.lcd_width, platform.lcd_height)
    };
    let mut buf = vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL];
    let fb = FrameBuffer::new(&mut buf, width, height)?;

    let config = DemoConfig {
        intro_delay_ms: 0,
        ..Default::default()
    };
    let mut demo = AesDemo::new(
        SoftAes::with_latency(ENGINE_LATENCY),
        fb,
        SimClock::new(platform.cpu_clock_hz, CYCLES_PER_READ),
        config,
    );

    for mode in Mode::ALL {
        let report = demo.run_aes(mode, &image)?;
        log::debug!(
            "{} on {}: {} cycles, {} ms",
            mode.label(),
            platform.name,
            report.cycles,
            report.millis()
        );
    }

    let stats = demo.engine.stats();
    log::info!(
        "{} loads, {} reads, {} polls over {} runs",
        stats.loads,
        stats.reads,
        stats.polls,
        stats.ends
    );

    Ok(())
}

fn main() -> ExitCode {
    init_logging(&LOGGER, log::LevelFilter::Debug);

    let name = std::env::args().nth(1).unwrap_or_else(|| "cw340".into());
    let Some(platform) = board::platform(&name) else {
        log::error!("unknown board {:?}, expected one of cw340, brew, voyager1", name);
        return ExitCode::FAILURE;
    };

    match run(&platform) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("demo failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
