//! ST7735 TFT controller on a 4-wire SPI bus (SCK, MOSI, CS, D/C).

use {
    crate::{
        board::Orientation,
        display::{clip, color_bytes, DisplayRegion, OpenRegion, StreamingSink, BYTES_PER_PIXEL},
        error::{Error, Precondition},
    },
    embedded_graphics::{pixelcolor::Rgb565, prelude::*, primitives::Rectangle},
};

const SWRESET: u8 = 0x01;
const SLPOUT: u8 = 0x11;
const NORON: u8 = 0x13;
const DISPON: u8 = 0x29;
const CASET: u8 = 0x2A;
const RASET: u8 = 0x2B;
const RAMWR: u8 = 0x2C;
const MADCTL: u8 = 0x36;
const COLMOD: u8 = 0x3A;

const MADCTL_MY: u8 = 0x80;
const MADCTL_MX: u8 = 0x40;
const MADCTL_MV: u8 = 0x20;
const MADCTL_BGR: u8 = 0x08;

/// 16 bits per pixel.
const COLMOD_RGB565: u8 = 0x05;

/// Pixels buffered per SPI write when streaming generated colours.
const CHUNK_PIXELS: usize = 32;

/// The transport the controller hangs off.
pub trait LcdInterface {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Error>;

    /// Drives chip select (active low) and data/command (high for data).
    fn set_control_lines(&mut self, cs: bool, dc: bool) -> Result<(), Error>;

    fn delay_ms(&mut self, ms: u32);
}

pub struct St7735<I: LcdInterface> {
    interface: I,
    native_width: u16,
    native_height: u16,
    orientation: Orientation,
    stream: Option<OpenRegion>,
}

impl<I: LcdInterface> St7735<I> {
    /// `width` and `height` are the panel dimensions in [`Orientation::Rotate0`].
    pub fn new(interface: I, width: u16, height: u16) -> Self {
        St7735 {
            interface,
            native_width: width,
            native_height: height,
            orientation: Orientation::Rotate0,
            stream: None,
        }
    }

    pub fn release(self) -> I {
        self.interface
    }

    pub fn interface(&mut self) -> &mut I {
        &mut self.interface
    }

    pub fn run_init_sequence(&mut self, orientation: Orientation) -> Result<(), Error> {
        self.send_command(SWRESET, &[])?;
        self.interface.delay_ms(150);

        self.send_command(SLPOUT, &[])?;
        self.interface.delay_ms(120);

        self.send_command(COLMOD, &[COLMOD_RGB565])?;
        self.interface.delay_ms(10);

        self.set_orientation(orientation)?;

        self.send_command(NORON, &[])?;
        self.interface.delay_ms(10);

        self.send_command(DISPON, &[])?;
        self.interface.delay_ms(100);

        Ok(())
    }

    pub fn set_orientation(&mut self, orientation: Orientation) -> Result<(), Error> {
        if self.stream.is_some() {
            return Err(Precondition::RegionOpen.into());
        }

        let madctl = match orientation {
            Orientation::Rotate0 => MADCTL_MX | MADCTL_MY,
            Orientation::Rotate90 => MADCTL_MY | MADCTL_MV,
            Orientation::Rotate180 => 0,
            Orientation::Rotate270 => MADCTL_MX | MADCTL_MV,
        };
        self.send_command(MADCTL, &[madctl | MADCTL_BGR])?;
        self.orientation = orientation;

        Ok(())
    }

    pub fn width(&self) -> u16 {
        if self.orientation.is_transposed() {
            self.native_height
        } else {
            self.native_width
        }
    }

    pub fn height(&self) -> u16 {
        if self.orientation.is_transposed() {
            self.native_width
        } else {
            self.native_height
        }
    }

    fn send_command(&mut self, cmd: u8, args: &[u8]) -> Result<(), Error> {
        self.interface.set_control_lines(false, false)?;
        self.interface.write_bytes(&[cmd])?;

        if !args.is_empty() {
            self.interface.set_control_lines(false, true)?;
            self.interface.write_bytes(args)?;
        }

        self.interface.set_control_lines(true, true)
    }

    fn set_address_window(&mut self, region: &DisplayRegion) -> Result<(), Error> {
        let [x0h, x0l] = region.x.to_be_bytes();
        let [x1h, x1l] = (region.x + region.width - 1).to_be_bytes();
        let [y0h, y0l] = region.y.to_be_bytes();
        let [y1h, y1l] = (region.y + region.height - 1).to_be_bytes();

        self.send_command(CASET, &[x0h, x0l, x1h, x1l])?;
        self.send_command(RASET, &[y0h, y0l, y1h, y1l])
    }

    fn stream_colors<C>(&mut self, region: DisplayRegion, colors: C) -> Result<(), Error>
    where
        C: IntoIterator<Item = Rgb565>,
    {
        self.open_region(region)?;

        let mut buf = [0u8; CHUNK_PIXELS * BYTES_PER_PIXEL];
        let mut len = 0;
        let mut result = Ok(());

        let pixels = region.width as usize * region.height as usize;
        for color in colors.into_iter().take(pixels) {
            buf[len..len + BYTES_PER_PIXEL].copy_from_slice(&color_bytes(color));
            len += BYTES_PER_PIXEL;

            if len == buf.len() {
                result = self.write(&buf);
                len = 0;
                if result.is_err() {
                    break;
                }
            }
        }

        if result.is_ok() && len > 0 {
            result = self.write(&buf[..len]);
        }

        result.and(self.close_region())
    }
}

impl<I: LcdInterface> StreamingSink for St7735<I> {
    fn open_region(&mut self, region: DisplayRegion) -> Result<(), Error> {
        if self.stream.is_some() {
            return Err(Precondition::RegionOpen.into());
        }

        if !region.fits_in(self.width(), self.height()) {
            return Err(Precondition::RegionOutOfBounds.into());
        }

        self.set_address_window(&region)?;

        self.interface.set_control_lines(false, false)?;
        self.interface.write_bytes(&[RAMWR])?;
        // Keep the panel selected, everything up to `close_region` is pixel data.
        self.interface.set_control_lines(false, true)?;

        self.stream = Some(OpenRegion::new(region));

        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let stream = self.stream.as_mut().ok_or(Precondition::RegionClosed)?;
        stream.reserve(bytes.len())?;

        self.interface.write_bytes(bytes)
    }

    fn close_region(&mut self) -> Result<(), Error> {
        if self.stream.take().is_none() {
            return Err(Precondition::RegionClosed.into());
        }

        self.interface.set_control_lines(true, true)
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl<I: LcdInterface> OriginDimensions for St7735<I> {
    fn size(&self) -> Size {
        Size::new(self.width() as u32, self.height() as u32)
    }
}

impl<I: LcdInterface> DrawTarget for St7735<I> {
    type Color = Rgb565;
    type Error = Error;

    fn draw_iter<P>(&mut self, pixels: P) -> Result<(), Self::Error>
    where
        P: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (w, h) = (self.width(), self.height());

        for Pixel(point, color) in pixels.into_iter() {
            if let Some(region) = clip(&Rectangle::new(point, Size::new(1, 1)), w, h) {
                self.draw_image(region, &color_bytes(color))?;
            }
        }

        Ok(())
    }

    fn fill_contiguous<C>(&mut self, area: &Rectangle, colors: C) -> Result<(), Self::Error>
    where
        C: IntoIterator<Item = Self::Color>,
    {
        match clip(area, self.width(), self.height()) {
            Some(region) if region.covers(area) => self.stream_colors(region, colors),
            _ => self.draw_iter(
                area.points()
                    .zip(colors)
                    .map(|(point, color)| Pixel(point, color)),
            ),
        }
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        match clip(area, self.width(), self.height()) {
            Some(region) => self.stream_colors(region, core::iter::repeat(color)),
            None => Ok(()),
        }
    }
}
