//! Software stand-ins for the cipher engine and the panel, for running the
//! demo and its tests off-target.

use {
    crate::{
        aes::{
            AesStatus, Block, CipherEngine, Iv, KeyLen, KeyProvider, KeyShare, Mode, Operation,
            Transaction, Trigger, BLOCK_SIZE,
        },
        display::{color_bytes, DisplayRegion, OpenRegion, StreamingSink, BYTES_PER_PIXEL},
        error::{Error, Precondition},
        timer::Clock,
    },
    ::aes::{
        cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit},
        Aes128,
    },
    core::cell::Cell,
    embedded_graphics::{
        pixelcolor::{raw::RawU16, Rgb565},
        prelude::*,
    },
};

/// Calls made into a [`SoftAes`], for checking how a driver used it.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub starts: usize,
    pub loads: usize,
    pub triggers: usize,
    pub polls: usize,
    pub reads: usize,
    pub ends: usize,
}

struct Active {
    transaction: Transaction,
    cipher: Aes128,
    /// IV, previous ciphertext, keystream feedback or counter, depending on mode.
    chain: [u8; BLOCK_SIZE],
}

impl Active {
    fn encrypt(&self, mut data: [u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
        self.cipher
            .encrypt_block(GenericArray::from_mut_slice(&mut data));
        data
    }

    fn decrypt(&self, mut data: [u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
        self.cipher
            .decrypt_block(GenericArray::from_mut_slice(&mut data));
        data
    }

    fn process(&mut self, input: Block) -> Block {
        let data = input.0;
        let encrypt = self.transaction.operation == Operation::Encrypt;

        let out = match self.transaction.mode {
            Mode::Ecb if encrypt => self.encrypt(data),
            Mode::Ecb => self.decrypt(data),
            Mode::Cbc if encrypt => {
                let out = self.encrypt(xor(data, self.chain));
                self.chain = out;
                out
            }
            Mode::Cbc => {
                let out = xor(self.decrypt(data), self.chain);
                self.chain = data;
                out
            }
            Mode::Cfb => {
                let out = xor(data, self.encrypt(self.chain));
                self.chain = if encrypt { out } else { data };
                out
            }
            Mode::Ofb => {
                self.chain = self.encrypt(self.chain);
                xor(data, self.chain)
            }
            Mode::Ctr => {
                let keystream = self.encrypt(self.chain);
                self.chain = u128::from_be_bytes(self.chain)
                    .wrapping_add(1)
                    .to_be_bytes();
                xor(data, keystream)
            }
        };

        Block(out)
    }
}

fn xor(a: [u8; BLOCK_SIZE], b: [u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
    let mut out = a;
    out.iter_mut().zip(b).for_each(|(o, b)| *o ^= b);
    out
}

/// Register-level model of the AES accelerator.
///
/// A block written to the input register is latched into the core as soon as
/// the core is free (and, with [`Trigger::Manual`], after a trigger), which
/// frees the input register again. The result lands in the output register
/// `latency` status polls later, unless the previous result has not been read
/// yet, in which case the core stalls.
pub struct SoftAes {
    active: Option<Active>,
    input: Option<Block>,
    core: Option<Block>,
    output: Option<Block>,
    countdown: u32,
    latency: u32,
    triggered: bool,
    stuck: bool,
    stats: EngineStats,
}

impl Default for SoftAes {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftAes {
    pub fn new() -> Self {
        Self::with_latency(0)
    }

    /// `latency` is the number of status polls a block spends in the core.
    pub fn with_latency(latency: u32) -> Self {
        Self {
            active: None,
            input: None,
            core: None,
            output: None,
            countdown: 0,
            latency,
            triggered: false,
            stuck: false,
            stats: EngineStats::default(),
        }
    }

    /// Freezes the core so no result is ever produced.
    pub fn set_stuck(&mut self, stuck: bool) {
        self.stuck = stuck;
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// A transaction has been started and not ended.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    fn step(&mut self) {
        if self.stuck {
            return;
        }
        let Some(active) = self.active.as_mut() else {
            return;
        };

        if self.core.is_some() && self.countdown > 0 {
            self.countdown -= 1;
        }

        if self.countdown == 0 && self.output.is_none() {
            if let Some(block) = self.core.take() {
                self.output = Some(active.process(block));
            }
        }

        let go = active.transaction.trigger == Trigger::Auto || self.triggered;
        if self.core.is_none() && self.input.is_some() && go {
            self.core = self.input.take();
            self.triggered = false;
            self.countdown = self.latency;

            if self.countdown == 0 && self.output.is_none() {
                if let Some(block) = self.core.take() {
                    self.output = Some(active.process(block));
                }
            }
        }
    }

    fn flags(&self) -> AesStatus {
        let mut status = AesStatus::empty();

        if self.input.is_none() {
            status |= AesStatus::INPUT_READY;
        }
        if self.output.is_some() {
            status |= AesStatus::OUTPUT_VALID;
        }
        if self.core.is_some() && self.countdown == 0 && self.output.is_some() {
            status |= AesStatus::STALL;
        }
        if self.core.is_none() && self.input.is_none() {
            status |= AesStatus::IDLE;
        }

        status
    }
}

impl CipherEngine for SoftAes {
    fn start(&mut self, transaction: &Transaction, key: &KeyShare, iv: &Iv) -> Result<(), Error> {
        self.stats.starts += 1;

        if self.active.is_some() {
            return Err(Precondition::EngineBusy.into());
        }

        if transaction.key_len != KeyLen::Aes128
            || transaction.key_provider != KeyProvider::Software
        {
            return Err(Error::Configuration);
        }

        let key = key.combine();
        self.active = Some(Active {
            transaction: *transaction,
            cipher: Aes128::new(GenericArray::from_slice(&key.0)),
            chain: iv.0,
        });

        Ok(())
    }

    fn load_input(&mut self, block: &Block) -> Result<(), Error> {
        self.stats.loads += 1;
        self.step();

        if self.active.is_none() || self.input.is_some() {
            return Err(Error::Engine);
        }

        self.input = Some(*block);
        self.step();

        Ok(())
    }

    fn trigger(&mut self) -> Result<(), Error> {
        self.stats.triggers += 1;

        if self.active.is_none() {
            return Err(Error::Engine);
        }

        self.triggered = true;
        self.step();

        Ok(())
    }

    fn status(&mut self) -> Result<AesStatus, Error> {
        self.stats.polls += 1;
        self.step();
        Ok(self.flags())
    }

    fn read_output(&mut self) -> Result<Block, Error> {
        self.stats.reads += 1;
        self.step();

        let block = self.output.take().ok_or(Error::Engine)?;
        self.step();

        Ok(block)
    }

    fn end(&mut self) -> Result<(), Error> {
        self.stats.ends += 1;

        self.active = None;
        self.input = None;
        self.core = None;
        self.output = None;
        self.countdown = 0;
        self.triggered = false;

        Ok(())
    }
}

/// A counter that moves `step` cycles forward every time it is read.
pub struct SimClock {
    now: Cell<u64>,
    step: u64,
    hz: u32,
}

impl SimClock {
    pub const fn new(hz: u32, step: u64) -> Self {
        Self {
            now: Cell::new(0),
            step,
            hz,
        }
    }

    /// Current count without advancing it.
    pub fn peek(&self) -> u64 {
        self.now.get()
    }
}

impl Clock for SimClock {
    fn now_cycles(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step));
        now
    }

    fn clock_hz(&self) -> u32 {
        self.hz
    }
}

/// An in-memory RGB565 panel, big-endian pixels in raster order.
pub struct FrameBuffer<'a> {
    buf: &'a mut [u8],
    width: u16,
    height: u16,
    stream: Option<OpenRegion>,
}

impl<'a> FrameBuffer<'a> {
    pub fn new(buf: &'a mut [u8], width: u16, height: u16) -> Result<Self, Error> {
        if buf.len() != width as usize * height as usize * BYTES_PER_PIXEL {
            return Err(Precondition::ImageSize.into());
        }

        Ok(Self {
            buf,
            width,
            height,
            stream: None,
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn bytes(&self) -> &[u8] {
        self.buf
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<Rgb565> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x as u32, y as u32);
        let raw = u16::from_be_bytes([self.buf[i], self.buf[i + 1]]);
        Some(RawU16::new(raw).into())
    }

    /// Copies the bytes covered by `region` out in raster order.
    pub fn read_region(&self, region: DisplayRegion, out: &mut [u8]) -> Result<(), Error> {
        if !region.fits_in(self.width, self.height) {
            return Err(Precondition::RegionOutOfBounds.into());
        }
        if out.len() != region.byte_len() {
            return Err(Precondition::ImageSize.into());
        }

        let row_len = region.width as usize * BYTES_PER_PIXEL;
        for (row, chunk) in out.chunks_exact_mut(row_len).enumerate() {
            let start = self.offset(region.x as u32, region.y as u32 + row as u32);
            chunk.copy_from_slice(&self.buf[start..start + row_len]);
        }

        Ok(())
    }
}

impl StreamingSink for FrameBuffer<'_> {
    fn open_region(&mut self, region: DisplayRegion) -> Result<(), Error> {
        if self.stream.is_some() {
            return Err(Precondition::RegionOpen.into());
        }
        if !region.fits_in(self.width, self.height) {
            return Err(Precondition::RegionOutOfBounds.into());
        }

        self.stream = Some(OpenRegion::new(region));

        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let stream = self.stream.as_mut().ok_or(Precondition::RegionClosed)?;
        let start = stream.reserve(bytes.len())?;
        let region = stream.region;

        let row_len = region.width as usize * BYTES_PER_PIXEL;
        for (i, byte) in bytes.iter().enumerate() {
            let n = start + i;
            let (row, col) = (n / row_len, n % row_len);
            let dest = self.offset(region.x as u32, region.y as u32 + row as u32) + col;
            self.buf[dest] = *byte;
        }

        Ok(())
    }

    fn close_region(&mut self) -> Result<(), Error> {
        self.stream
            .take()
            .map(|_| ())
            .ok_or(Precondition::RegionClosed.into())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl OriginDimensions for FrameBuffer<'_> {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl DrawTarget for FrameBuffer<'_> {
    type Color = Rgb565;
    type Error = Error;

    fn draw_iter<P>(&mut self, pixels: P) -> Result<(), Self::Error>
    where
        P: IntoIterator<Item = Pixel<Self::Color>>,
    {
        if self.stream.is_some() {
            return Err(Precondition::RegionOpen.into());
        }

        for Pixel(point, color) in pixels.into_iter() {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let (x, y) = (point.x as u32, point.y as u32);
            if x >= self.width as u32 || y >= self.height as u32 {
                continue;
            }
            let i = self.offset(x, y);
            self.buf[i..i + BYTES_PER_PIXEL].copy_from_slice(&color_bytes(color));
        }

        Ok(())
    }
}
