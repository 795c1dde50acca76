// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: MIT OR Apache-2.0

#![cfg_attr(not(test), no_std)]

pub mod aes;
pub mod board;
pub mod cursor;
pub mod demo;
pub mod display;
pub mod error;
#[cfg(feature = "hal")]
pub mod hal;
pub mod lcd;
#[cfg(feature = "logging")]
pub mod logging;
pub mod pipeline;
pub mod screen;
#[cfg(feature = "soft-aes")]
pub mod sim;
pub mod timer;

pub use error::{Error, Precondition};
