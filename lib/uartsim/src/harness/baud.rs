// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

/// Supported baud rates and their 16-bit divisor latch values.
///
/// The divisors are fixed constants of the design's reference clock; rates
/// outside this table are not programmable.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, strum::Display, strum::EnumIter,
)]
pub enum BaudRate {
    #[strum(to_string = "57600")]
    B57600,
    #[strum(to_string = "38400")]
    B38400,
    #[strum(to_string = "28800")]
    B28800,
    #[strum(to_string = "19200")]
    B19200,
    #[strum(to_string = "14400")]
    B14400,
    #[strum(to_string = "9600")]
    B9600,
    #[strum(to_string = "4800")]
    B4800,
    #[strum(to_string = "2400")]
    B2400,
    #[strum(to_string = "1200")]
    B1200,
    #[strum(to_string = "300")]
    B300,
}

impl BaudRate {
    /// Divisor latch value programming this rate (DLL low byte, DLM high).
    pub const fn divisor(self) -> u16 {
        match self {
            BaudRate::B57600 => 0x00f7,
            BaudRate::B38400 => 0x0173,
            BaudRate::B28800 => 0x01ef,
            BaudRate::B19200 => 0x02e7,
            BaudRate::B14400 => 0x03df,
            BaudRate::B9600 => 0x05cf,
            BaudRate::B4800 => 0x0b9f,
            BaudRate::B2400 => 0x173f,
            BaudRate::B1200 => 0x2e7f,
            BaudRate::B300 => 0xb9ff,
        }
    }

    pub const fn rate(self) -> u32 {
        match self {
            BaudRate::B57600 => 57600,
            BaudRate::B38400 => 38400,
            BaudRate::B28800 => 28800,
            BaudRate::B19200 => 19200,
            BaudRate::B14400 => 14400,
            BaudRate::B9600 => 9600,
            BaudRate::B4800 => 4800,
            BaudRate::B2400 => 2400,
            BaudRate::B1200 => 1200,
            BaudRate::B300 => 300,
        }
    }

    pub fn from_rate(rate: u32) -> Option<Self> {
        use strum::IntoEnumIterator;
        Self::iter().find(|b| b.rate() == rate)
    }
}

/// Parity mode, the 3-bit field in LCR bits 5:3.
///
/// The wire is modeled at byte level, so the mode round-trips through LCR
/// without affecting payload delivery.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    Deserialize,
    Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl Parity {
    pub const fn lcr_bits(self) -> u8 {
        (match self {
            Parity::None => 0b000,
            Parity::Odd => 0b001,
            Parity::Even => 0b011,
        }) << 3
    }
}
