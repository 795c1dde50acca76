//! Per-board display wiring parameters.

use core::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Orientation {
    Rotate0,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Orientation {
    /// Rows and columns are exchanged.
    pub fn is_transposed(self) -> bool {
        matches!(self, Orientation::Rotate90 | Orientation::Rotate270)
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Platform {
    pub name: &'static str,
    pub spi_clock_hz: u32,
    pub cpu_clock_hz: u32,
    pub orientation: Orientation,
    /// Panel size in `Rotate0`.
    pub lcd_width: u16,
    pub lcd_height: u16,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}x{} LCD, SPI {} kHz, CPU {} MHz",
            self.name,
            self.lcd_width,
            self.lcd_height,
            self.spi_clock_hz / 1000,
            self.cpu_clock_hz / 1_000_000
        )
    }
}

pub const CW340: Platform = Platform {
    name: "cw340",
    spi_clock_hz: 3_000_000,
    cpu_clock_hz: 24_000_000,
    orientation: Orientation::Rotate0,
    lcd_width: 160,
    lcd_height: 128,
};

pub const BREW: Platform = Platform {
    name: "brew",
    spi_clock_hz: 12_000_000,
    cpu_clock_hz: 100_000_000,
    orientation: Orientation::Rotate0,
    lcd_width: 160,
    lcd_height: 128,
};

pub const VOYAGER1: Platform = Platform {
    name: "voyager1",
    spi_clock_hz: 22_000_000,
    cpu_clock_hz: 100_000_000,
    orientation: Orientation::Rotate180,
    lcd_width: 160,
    lcd_height: 128,
};

pub const PLATFORMS: [Platform; 3] = [CW340, BREW, VOYAGER1];

/// Looks a board up by name.
pub fn platform(name: &str) -> Option<Platform> {
    PLATFORMS.iter().copied().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        assert_eq!(platform("brew").map(|p| p.spi_clock_hz), Some(12_000_000));
        assert_eq!(
            platform("voyager1").map(|p| p.orientation),
            Some(Orientation::Rotate180)
        );
        assert!(platform("cw310").is_none());
    }

    #[test]
    fn describes_clocks() {
        assert_eq!(
            format!("{}", CW340),
            "cw340: 160x128 LCD, SPI 3000 kHz, CPU 24 MHz"
        );
        assert_eq!(
            format!("{}", VOYAGER1),
            "voyager1: 160x128 LCD, SPI 22000 kHz, CPU 100 MHz"
        );
    }

    #[test]
    fn transposition() {
        assert!(!Orientation::Rotate0.is_transposed());
        assert!(Orientation::Rotate90.is_transposed());
        assert!(!Orientation::Rotate180.is_transposed());
        assert!(Orientation::Rotate270.is_transposed());
    }
}
