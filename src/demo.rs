//! The AES demo screen: show a plaintext image, then paint its ciphertext next
//! to it straight from the engine and report how long that took.

use {
    crate::{
        aes::{
            CipherEngine, Iv, Key, KeyShare, Mode, Transaction, DEMO_IV, DEMO_KEY,
            DEMO_KEY_SHARE1, KEY_SIZE,
        },
        display::{DisplayRegion, Image, StreamingSink},
        error::Error,
        pipeline::{self, PipelineConfig},
        screen::{self, Alignment, Colors},
        timer::{busy_wait_ms, Clock, Report},
    },
    arrayvec::ArrayString,
    core::fmt::{self, Write},
    embedded_graphics::{pixelcolor::Rgb565, prelude::*},
};

/// How long the intro text stays up before the run starts.
pub const INTRO_DELAY_MS: u32 = 6000;

/// First text line below the plaintext image.
const TEXT_LINE: u32 = 7;

/// Fits the longest report line, `"{u64}ms @ {u32} MHz"`.
pub const LINE_CAPACITY: usize = 48;

pub type Line = ArrayString<LINE_CAPACITY>;

pub fn format_line(args: fmt::Arguments) -> Result<Line, Error> {
    let mut line = Line::new();
    line.write_fmt(args).map_err(|_| Error::Format)?;
    Ok(line)
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub intro_delay_ms: u32,
    pub pipeline: PipelineConfig,
    pub key: Key,
    pub share1: [u8; KEY_SIZE],
    pub iv: Iv,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            intro_delay_ms: INTRO_DELAY_MS,
            pipeline: PipelineConfig::default(),
            key: DEMO_KEY,
            share1: DEMO_KEY_SHARE1,
            iv: DEMO_IV,
        }
    }
}

pub struct AesDemo<E, D, C> {
    pub engine: E,
    pub display: D,
    pub clock: C,
    pub config: DemoConfig,
}

/// Where the ciphertext goes: overlapping the plaintext by two pixels, pulled
/// left if that would run off the screen.
pub fn output_region(image: &Image, display_width: u16) -> DisplayRegion {
    let x = image
        .width
        .saturating_sub(2)
        .min(display_width.saturating_sub(image.width));
    image.region_at(x, 0)
}

impl<E, D, C> AesDemo<E, D, C>
where
    E: CipherEngine,
    D: StreamingSink + DrawTarget<Color = Rgb565, Error = Error>,
    C: Clock,
{
    pub fn new(engine: E, display: D, clock: C, config: DemoConfig) -> Self {
        Self {
            engine,
            display,
            clock,
            config,
        }
    }

    fn print(&mut self, text: &str, line: u32) -> Result<(), Error> {
        screen::println(
            &mut self.display,
            text,
            Alignment::Center,
            line,
            Colors::default(),
            true,
        )
    }

    /// Runs one encryption of `image` in `mode`.
    ///
    /// On failure whatever the engine produced so far stays on screen and the
    /// output region is closed again.
    pub fn run_aes(&mut self, mode: Mode, image: &Image) -> Result<Report, Error> {
        self.display.clear(Rgb565::WHITE)?;
        self.display
            .draw_image(image.region_at(0, 0), image.pixels)?;

        let title = format_line(format_args!("AES {}", mode.label()))?;

        self.print(" We'll encrypt the", TEXT_LINE)?;
        self.print(" image above with ", TEXT_LINE + 1)?;
        self.print(&title, TEXT_LINE + 2)?;

        busy_wait_ms(&self.clock, self.config.intro_delay_ms);

        let key = KeyShare::derive(&self.config.key, &self.config.share1);
        let transaction = Transaction::encrypt(mode);
        let region = output_region(image, self.display.bounding_box().size.width as u16);

        self.display.open_region(region)?;
        let run = pipeline::run(
            &mut self.engine,
            &mut self.display,
            &self.clock,
            image.pixels,
            &transaction,
            &key,
            &self.config.iv,
            &self.config.pipeline,
        );
        let closed = self.display.close_region();
        let cycles = run?;
        closed?;

        let report = Report::new(cycles, self.clock.clock_hz());
        log::info!("{}: {} ({})", title, report.cycles_line(), report.time_line());

        self.print("", TEXT_LINE)?;

        let line = format_line(format_args!("{}", report.cycles_line()))?;
        self.print(&line, TEXT_LINE + 1)?;

        let line = format_line(format_args!("{}", report.time_line()))?;
        self.print(&line, TEXT_LINE + 2)?;

        Ok(report)
    }
}
