//! Rectangular RGB565 regions and the streaming sink that fills them.

use {
    crate::error::{Error, Precondition},
    embedded_graphics::{
        pixelcolor::{raw::RawU16, Rgb565},
        prelude::*,
        primitives::Rectangle,
    },
};

/// Bytes per RGB565 pixel.
pub const BYTES_PER_PIXEL: usize = 2;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DisplayRegion {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl DisplayRegion {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x as u32 + self.width as u32
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y as u32 + self.height as u32
    }

    pub fn fits_in(&self, width: u16, height: u16) -> bool {
        self.width > 0
            && self.height > 0
            && self.right() <= width as u32
            && self.bottom() <= height as u32
    }

    /// Whether this region is exactly `area`.
    pub fn covers(&self, area: &Rectangle) -> bool {
        self.x as i32 == area.top_left.x
            && self.y as i32 == area.top_left.y
            && self.width as u32 == area.size.width
            && self.height as u32 == area.size.height
    }
}

/// The part of `area` that lies on a `width` x `height` screen.
pub(crate) fn clip(area: &Rectangle, width: u16, height: u16) -> Option<DisplayRegion> {
    let x0 = area.top_left.x.max(0);
    let y0 = area.top_left.y.max(0);
    let x1 = (area.top_left.x + area.size.width as i32).min(width as i32);
    let y1 = (area.top_left.y + area.size.height as i32).min(height as i32);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(DisplayRegion::new(
        x0 as u16,
        y0 as u16,
        (x1 - x0) as u16,
        (y1 - y0) as u16,
    ))
}

/// Big-endian RGB565, the byte order the panel expects.
pub fn color_bytes(color: Rgb565) -> [u8; BYTES_PER_PIXEL] {
    RawU16::from(color).into_inner().to_be_bytes()
}

/// An RGB565 bitmap, rows top to bottom, two bytes per pixel.
#[derive(Debug, Copy, Clone)]
pub struct Image<'a> {
    pub width: u16,
    pub height: u16,
    pub pixels: &'a [u8],
}

impl<'a> Image<'a> {
    pub fn new(width: u16, height: u16, pixels: &'a [u8]) -> Result<Self, Error> {
        if pixels.len() != width as usize * height as usize * BYTES_PER_PIXEL {
            return Err(Precondition::ImageSize.into());
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn region_at(&self, x: u16, y: u16) -> DisplayRegion {
        DisplayRegion::new(x, y, self.width, self.height)
    }
}

/// A display that accepts pixel data for one open region at a time.
///
/// The lifecycle is strictly open, write any number of times, close.
pub trait StreamingSink {
    fn open_region(&mut self, region: DisplayRegion) -> Result<(), Error>;

    /// Streams raw pixel bytes into the open region, in raster order.
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error>;

    fn close_region(&mut self) -> Result<(), Error>;

    fn is_open(&self) -> bool;

    /// Draws a complete bitmap in one open/write/close cycle.
    fn draw_image(&mut self, region: DisplayRegion, bytes: &[u8]) -> Result<(), Error> {
        self.open_region(region)?;
        let written = self.write(bytes);
        let closed = self.close_region();
        written.and(closed)
    }
}

/// Write bookkeeping for an open region, shared by the sink implementations.
#[derive(Debug, Copy, Clone)]
pub(crate) struct OpenRegion {
    pub region: DisplayRegion,
    pub written: usize,
}

impl OpenRegion {
    pub fn new(region: DisplayRegion) -> Self {
        Self { region, written: 0 }
    }

    /// Accounts for `len` more bytes, failing if the region would overflow.
    pub fn reserve(&mut self, len: usize) -> Result<usize, Error> {
        let end = self.written + len;
        if end > self.region.byte_len() {
            return Err(Error::RegionOverflow);
        }
        let start = self.written;
        self.written = end;
        Ok(start)
    }
}
