//! Error type shared by the pipeline, the engine capability and the display sinks.

use {crate::aes::AesStatus, core::fmt};

/// Input that was rejected before any hardware was touched.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// The image buffer is empty.
    EmptyImage,
    /// The image length (in bytes) is not a multiple of the AES block size.
    UnalignedLength(usize),
    /// The pixel buffer does not match the image dimensions.
    ImageSize,
    /// A write was issued without an open region.
    RegionClosed,
    /// A region was opened while another one is still open.
    RegionOpen,
    /// The region does not fit on the display.
    RegionOutOfBounds,
    /// A transaction was started while another one is still running.
    EngineBusy,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// The cipher engine rejected the transaction parameters.
    Configuration,
    /// A status poll did not observe the flag within the timeout.
    DeadlineExceeded(AesStatus),
    Precondition(Precondition),
    /// The cipher engine reported a fault or was driven out of protocol.
    Engine,
    /// The display transport (SPI or GPIO) failed.
    Interface,
    /// More bytes were streamed than the open region holds.
    RegionOverflow,
    /// Text did not fit its line buffer.
    Format,
}

impl From<Precondition> for Error {
    fn from(value: Precondition) -> Self {
        Error::Precondition(value)
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precondition::EmptyImage => f.write_str("image is empty"),
            Precondition::UnalignedLength(len) => {
                write!(f, "image length {} is not a multiple of the block size", len)
            }
            Precondition::ImageSize => f.write_str("pixel buffer does not match image size"),
            Precondition::RegionClosed => f.write_str("no display region is open"),
            Precondition::RegionOpen => f.write_str("a display region is already open"),
            Precondition::RegionOutOfBounds => f.write_str("region exceeds the display"),
            Precondition::EngineBusy => f.write_str("cipher engine is mid-transaction"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration => f.write_str("cipher engine rejected the configuration"),
            Error::DeadlineExceeded(flag) => write!(f, "timed out waiting for {:?}", flag),
            Error::Precondition(p) => write!(f, "precondition violated: {}", p),
            Error::Engine => f.write_str("cipher engine fault"),
            Error::Interface => f.write_str("display interface failure"),
            Error::RegionOverflow => f.write_str("write exceeds the open region"),
            Error::Format => f.write_str("text does not fit the line buffer"),
        }
    }
}
