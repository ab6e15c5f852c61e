// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Software model of a 16550-compatible UART register bank and the
//! polling-driven transfer harness used to verify it.

pub mod harness;
pub mod uart16550;

pub use harness::{Harness, UartId};
