// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transfer harness: drives one or two register banks through
//! configuration and polling-based byte transfers, verifying status bits
//! and payload integrity end to end.
//!
//! All state transitions happen on discrete service steps.  The harness
//! interleaves both endpoints round-robin inside [`Harness::step`], so a
//! sender's completion and its partner's data-availability are causally
//! ordered, and the sender-to-receiver handoff is performed within a
//! single step.  Every poll loop is bounded; a predicate that never comes
//! true surfaces as [`Error::Timeout`] rather than a hang.

use std::collections::VecDeque;

use slog::{debug, info, o, trace, warn};

use crate::uart16550::{bits::*, reg_name, Uart};

mod baud;
pub mod scenarios;
mod verify;

pub use baud::{BaudRate, Parity};
pub use verify::{Check, Scoreboard};

/// Ceiling on poll-loop iterations before a wait is declared hung.  The
/// slowest divisor in the baud table costs roughly 3k steps per byte, so
/// this leaves orders of magnitude of headroom.
pub const DEFAULT_POLL_LIMIT: usize = 1 << 20;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "{subject}: expected {expected:#04x}, got {actual:#04x} \
         (mask {mask:#04x})"
    )]
    Mismatch { subject: String, expected: u8, actual: u8, mask: u8 },

    #[error("gave up on {what} after {polls} polls")]
    Timeout { what: &'static str, polls: usize },

    #[error("read from an empty queue")]
    Underflow,

    #[error("write to a full TX FIFO")]
    Overflow,
}

/// Which of the harness's two UART instances an operation targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum UartId {
    Uart0 = 0,
    Uart1 = 1,
}

impl UartId {
    pub fn other(self) -> Self {
        match self {
            UartId::Uart0 => UartId::Uart1,
            UartId::Uart1 => UartId::Uart0,
        }
    }
}

/// RX FIFO trigger levels selectable through FCR bits 7:6.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RxTrigger {
    One,
    Four,
    Eight,
    Fourteen,
}

impl RxTrigger {
    pub const fn fcr_bits(self) -> u8 {
        match self {
            RxTrigger::One => FCR_TRGR_1,
            RxTrigger::Four => FCR_TRGR_4,
            RxTrigger::Eight => FCR_TRGR_8,
            RxTrigger::Fourteen => FCR_TRGR_14,
        }
    }
    pub const fn level(self) -> usize {
        match self {
            RxTrigger::One => 1,
            RxTrigger::Four => 4,
            RxTrigger::Eight => 8,
            RxTrigger::Fourteen => 14,
        }
    }
    pub fn from_level(level: usize) -> Option<Self> {
        match level {
            1 => Some(RxTrigger::One),
            4 => Some(RxTrigger::Four),
            8 => Some(RxTrigger::Eight),
            14 => Some(RxTrigger::Fourteen),
            _ => None,
        }
    }
}

/// Register-level configuration applied to one endpoint.
#[derive(Clone, Debug)]
pub struct EndpointConfig {
    pub baud: BaudRate,
    pub parity: Parity,
    pub auto_flow: bool,
    pub loopback: bool,
    pub rx_trigger: Option<RxTrigger>,
    pub intr_enable: u8,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            baud: BaudRate::B57600,
            parity: Parity::None,
            auto_flow: false,
            loopback: false,
            rx_trigger: None,
            intr_enable: 0,
        }
    }
}

struct Endpoint {
    uart: Uart,
    cfg: EndpointConfig,
    /// Bytes sent toward this endpoint, oldest first, awaiting
    /// receive-side verification.
    expect: VecDeque<u8>,
}

impl Endpoint {
    fn new() -> Self {
        Endpoint {
            uart: Uart::new(),
            cfg: EndpointConfig::default(),
            expect: VecDeque::new(),
        }
    }
}

pub struct Harness {
    log: slog::Logger,
    units: [Endpoint; 2],
    scoreboard: Scoreboard,
    poll_limit: usize,
}

impl Harness {
    pub fn new(log: &slog::Logger) -> Self {
        Self {
            log: log.new(o!("component" => "harness")),
            units: [Endpoint::new(), Endpoint::new()],
            scoreboard: Scoreboard::new(false),
            poll_limit: DEFAULT_POLL_LIMIT,
        }
    }

    pub fn stop_on_fail(self, stop: bool) -> Self {
        Self { scoreboard: Scoreboard::new(stop), ..self }
    }

    pub fn poll_limit(self, poll_limit: usize) -> Self {
        Self { poll_limit, ..self }
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn config(&self, id: UartId) -> &EndpointConfig {
        &self.units[id as usize].cfg
    }

    /// Logical register access, forwarded to the addressed bank.
    pub fn reg_read(&mut self, id: UartId, offset: u8) -> u8 {
        let val = self.units[id as usize].uart.reg_read(offset);
        trace!(
            self.log, "reg read";
            "unit" => %id, "offset" => offset, "val" => val,
        );
        val
    }

    pub fn reg_write(&mut self, id: UartId, offset: u8, data: u8) {
        trace!(
            self.log, "reg write";
            "unit" => %id, "offset" => offset, "data" => data,
        );
        self.units[id as usize].uart.reg_write(offset, data);
    }

    pub fn set_dlab(&mut self, id: UartId, ena: bool) {
        self.units[id as usize].uart.set_dlab(ena);
    }

    pub fn write_data(&mut self, id: UartId, data: u8) -> Result<(), Error> {
        if self.units[id as usize].uart.data_write(data) {
            Ok(())
        } else {
            Err(Error::Overflow)
        }
    }

    pub fn read_data(&mut self, id: UartId) -> Result<u8, Error> {
        self.units[id as usize].uart.data_read().ok_or(Error::Underflow)
    }

    pub fn intr_state(&self, id: UartId) -> bool {
        self.units[id as usize].uart.intr_state()
    }

    /// Bytes queued toward `id` that have not been verified yet.
    pub fn expect_outstanding(&self, id: UartId) -> usize {
        self.units[id as usize].expect.len()
    }

    /// Program one endpoint through its register interface: divisor latch
    /// pair under DLAB, then modem/FIFO control, then line control.  The
    /// line-control write carries a clear DLAB bit, which drops the latch
    /// before the interrupt-enable write needs offset 1 back.
    pub fn configure(&mut self, id: UartId, cfg: &EndpointConfig) {
        info!(
            self.log, "configuring endpoint";
            "unit" => %id, "baud" => %cfg.baud, "parity" => %cfg.parity,
            "auto_flow" => cfg.auto_flow, "loopback" => cfg.loopback,
        );
        let div = cfg.baud.divisor().to_le_bytes();
        self.set_dlab(id, true);
        self.reg_write(id, REG_DATA, div[0]); // DLL
        self.reg_write(id, REG_IER, div[1]); // DLM

        let mut mcr = 0;
        if cfg.auto_flow {
            mcr |= MCR_AFE;
        }
        if cfg.loopback {
            mcr |= MCR_LOOP;
        }
        self.reg_write(id, REG_MCR, mcr);
        if let Some(trigger) = cfg.rx_trigger {
            self.reg_write(id, REG_ISR, FCR_ENA | trigger.fcr_bits());
        }
        self.reg_write(id, REG_LCR, cfg.parity.lcr_bits());
        if cfg.intr_enable != 0 {
            self.reg_write(id, REG_IER, cfg.intr_enable);
        }
        self.units[id as usize].cfg = cfg.clone();
    }

    /// One deterministic service step for both endpoints, round-robin.
    /// A byte completing on one side lands in the partner's RX FIFO within
    /// the same call; no observer can see the handoff half-done.
    pub fn step(&mut self) {
        for id in [UartId::Uart0, UartId::Uart1] {
            let peer = id.other();
            let ready = self.units[peer as usize].uart.clear_to_send();
            if let Some(d) = self.units[id as usize].uart.tick(ready) {
                if !self.units[peer as usize].uart.wire_deliver(d) {
                    debug!(
                        self.log, "byte dropped at full RX FIFO";
                        "unit" => %peer, "data" => d,
                    );
                }
            }
        }
    }

    /// Poll `id`'s LSR until all bits in `bits` are set, stepping the
    /// model between reads.
    pub fn poll_lsr(
        &mut self,
        id: UartId,
        bits: u8,
        what: &'static str,
    ) -> Result<(), Error> {
        for _ in 0..self.poll_limit {
            if self.reg_read(id, REG_LSR) & bits == bits {
                return Ok(());
            }
            self.step();
        }
        Err(Error::Timeout { what, polls: self.poll_limit })
    }

    /// Poll until `id`'s interrupt pin asserts.
    pub fn poll_intr(
        &mut self,
        id: UartId,
        what: &'static str,
    ) -> Result<(), Error> {
        for _ in 0..self.poll_limit {
            if self.units[id as usize].uart.intr_state() {
                return Ok(());
            }
            self.step();
        }
        Err(Error::Timeout { what, polls: self.poll_limit })
    }

    /// Masked register verification: read, compare under `mask`, record
    /// the outcome.  A zero mask performs the read for its side effect
    /// only and always passes.
    pub fn verify_reg(
        &mut self,
        id: UartId,
        offset: u8,
        expected: u8,
        mask: u8,
    ) -> Result<(), Error> {
        let actual = self.reg_read(id, offset);
        let name = reg_name(offset, self.units[id as usize].uart.is_dlab());
        let check = Check::new(format!("{id} {name}"), expected, actual, mask);
        if check.passed {
            debug!(
                self.log, "verify ok";
                "subject" => %check.subject, "val" => actual,
            );
        } else {
            warn!(
                self.log, "verify MISMATCH";
                "subject" => %check.subject,
                "expected" => expected, "actual" => actual, "mask" => mask,
            );
        }
        self.scoreboard.record(check)
    }

    /// Queue `payload` as the next expected arrival at `rx`, then hand it
    /// to `tx` for transmission.  Push-before-send keeps the expectation
    /// queue in transmission order.
    pub fn expect_and_send(
        &mut self,
        tx: UartId,
        rx: UartId,
        payload: u8,
    ) -> Result<(), Error> {
        self.units[rx as usize].expect.push_back(payload);
        self.write_data(tx, payload)
    }

    /// Pop the oldest expectation for `rx` and compare it against the next
    /// byte out of its RX FIFO.
    pub fn drain_and_verify(&mut self, rx: UartId) -> Result<(), Error> {
        let got = self.read_data(rx)?;
        let want = self.units[rx as usize]
            .expect
            .pop_front()
            .ok_or(Error::Underflow)?;
        let check = Check::new(format!("{rx} rx data"), want, got, 0xff);
        if !check.passed {
            warn!(
                self.log, "payload MISMATCH";
                "unit" => %rx, "expected" => want, "actual" => got,
            );
        }
        self.scoreboard.record(check)
    }

    /// Full per-byte transfer protocol: idle pre-check, send, wait for the
    /// TX FIFO to drain and the shifter to go idle, wait for RX data,
    /// verify receiver status and transmitter re-idle, then compare the
    /// payload.
    pub fn send_and_verify(
        &mut self,
        tx: UartId,
        payload: u8,
    ) -> Result<(), Error> {
        let rx = tx.other();
        // Bit 6 is don't-care here; bit 5 must already be set with the
        // rest of the register clear.
        self.verify_reg(tx, REG_LSR, LSR_THRE | LSR_TEMT, 0xbf)?;

        debug!(self.log, "sending byte"; "unit" => %tx, "data" => payload);
        self.expect_and_send(tx, rx, payload)?;

        self.poll_lsr(tx, LSR_THRE, "TX FIFO drain")?;
        self.poll_lsr(tx, LSR_TEMT, "TX shifter idle")?;
        self.poll_lsr(rx, LSR_DR, "RX data available")?;

        // Receiver: data ready, its own transmitter idle.
        self.verify_reg(rx, REG_LSR, LSR_DR | LSR_THRE | LSR_TEMT, 0xff)?;
        // Transmitter must still be idle after the receive.
        self.verify_reg(
            tx,
            REG_LSR,
            LSR_THRE | LSR_TEMT,
            LSR_THRE | LSR_TEMT,
        )?;

        self.drain_and_verify(rx)
    }

    /// Burst-mode transfer: queue a run of bytes back to back, then do the
    /// idle/available polling once for the whole burst and drain the
    /// receiver while data remains.  With `intr_gated`, receive readiness
    /// is signaled by the partner's interrupt pin (FIFO threshold) instead
    /// of LSR bit 0.
    pub fn send_burst(
        &mut self,
        tx: UartId,
        payload: &[u8],
        intr_gated: bool,
    ) -> Result<(), Error> {
        let rx = tx.other();
        for &b in payload {
            self.expect_and_send(tx, rx, b)?;
        }
        debug!(
            self.log, "burst queued";
            "unit" => %tx, "len" => payload.len(),
        );

        self.poll_lsr(tx, LSR_THRE, "TX FIFO drain")?;
        self.poll_lsr(tx, LSR_TEMT, "TX shifter idle")?;
        if intr_gated {
            self.poll_intr(rx, "RX threshold interrupt")?;
        } else {
            self.poll_lsr(rx, LSR_DR, "RX data available")?;
        }

        while self.reg_read(rx, REG_LSR) & LSR_DR != 0 {
            // transmitter stays idle throughout the drain
            self.verify_reg(
                tx,
                REG_LSR,
                LSR_THRE | LSR_TEMT,
                LSR_THRE | LSR_TEMT,
            )?;
            self.drain_and_verify(rx)?;
        }
        Ok(())
    }
}
