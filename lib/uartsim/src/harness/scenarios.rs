// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Complete verification scenarios over the harness API.  Each one runs
//! against a fresh [`Harness`]; results accumulate in its scoreboard.

use rand::Rng;
use slog::info;
use strum::IntoEnumIterator;

use super::*;

/// Default-value reads plus a write/readback and aliasing walk over every
/// register that supports it: scratch under both DLAB views, the IER write
/// mask, the LCR/DLAB interaction, MCR through both views, and divisor
/// latch round-trips for the whole baud table.
pub fn register_check(h: &mut Harness) -> Result<(), Error> {
    let id = UartId::Uart0;

    info!(h.log, "register check: default values");
    h.verify_reg(id, REG_IER, 0x00, 0xff)?;
    h.verify_reg(id, REG_ISR, 0x01, 0xff)?;
    h.verify_reg(id, REG_LCR, 0x00, 0xff)?;
    h.verify_reg(id, REG_MCR, 0x00, 0xff)?;
    h.verify_reg(id, REG_LSR, 0x60, 0xff)?;

    info!(h.log, "register check: scratch");
    h.set_dlab(id, false);
    h.reg_write(id, REG_SPR, 0x55);
    h.verify_reg(id, REG_SPR, 0x55, 0xff)?;
    h.set_dlab(id, true);
    // same physical register at the aliased view
    h.verify_reg(id, REG_SPR, 0x55, 0xff)?;
    h.reg_write(id, REG_SPR, 0xaa);
    h.verify_reg(id, REG_SPR, 0xaa, 0xff)?;
    h.set_dlab(id, false);
    h.verify_reg(id, REG_SPR, 0xaa, 0xff)?;

    info!(h.log, "register check: IER");
    // only exists under DLAB=0; stores its low four bits
    h.reg_write(id, REG_IER, 0x55);
    h.verify_reg(id, REG_IER, 0x05, 0xff)?;
    h.reg_write(id, REG_IER, 0xaa);
    h.verify_reg(id, REG_IER, 0x0a, 0xff)?;

    info!(h.log, "register check: LCR");
    for val in [0x40u8, 0x20, 0x10, 0x08] {
        h.set_dlab(id, false);
        h.reg_write(id, REG_LCR, val);
        h.verify_reg(id, REG_LCR, val, 0xff)?;
        h.set_dlab(id, true);
        // one storage: the DLAB=1 view folds the latch bit in
        h.verify_reg(id, REG_LCR, val | 0x80, 0xff)?;
    }
    // Writing LCR through the DLAB=1 view replaces the whole register;
    // the set_dlab that follows clears what the write just set.
    h.set_dlab(id, true);
    h.reg_write(id, REG_LCR, 0x80);
    h.set_dlab(id, false);
    h.verify_reg(id, REG_LCR, 0x00, 0xff)?;
    h.set_dlab(id, true);
    h.verify_reg(id, REG_LCR, 0x80, 0xff)?;

    info!(h.log, "register check: MCR");
    for val in [0x02u8, 0x10, 0x20] {
        h.set_dlab(id, false);
        h.reg_write(id, REG_MCR, val);
        h.verify_reg(id, REG_MCR, val, 0xff)?;
        h.set_dlab(id, true);
        h.verify_reg(id, REG_MCR, val, 0xff)?;
        h.reg_write(id, REG_MCR, val);
        h.verify_reg(id, REG_MCR, val, 0xff)?;
        h.set_dlab(id, false);
        h.verify_reg(id, REG_MCR, val, 0xff)?;
    }

    info!(h.log, "register check: divisor latches");
    // these only exist under DLAB=1
    h.set_dlab(id, true);
    h.reg_write(id, REG_DATA, 0x55);
    h.verify_reg(id, REG_DATA, 0x55, 0xff)?;
    h.reg_write(id, REG_DATA, 0xaa);
    h.verify_reg(id, REG_DATA, 0xaa, 0xff)?;
    h.reg_write(id, REG_IER, 0x55);
    h.verify_reg(id, REG_IER, 0x55, 0xff)?;
    h.reg_write(id, REG_IER, 0xaa);
    h.verify_reg(id, REG_IER, 0xaa, 0xff)?;
    // the latch pair never leaks into the DLAB=0 registers
    h.set_dlab(id, false);
    h.verify_reg(id, REG_IER, 0x0a, 0xff)?;

    h.set_dlab(id, true);
    for baud in BaudRate::iter() {
        let div = baud.divisor().to_le_bytes();
        h.reg_write(id, REG_DATA, div[0]);
        h.reg_write(id, REG_IER, div[1]);
        h.verify_reg(id, REG_DATA, div[0], 0xff)?;
        h.verify_reg(id, REG_IER, div[1], 0xff)?;
    }
    h.set_dlab(id, false);
    Ok(())
}

/// Polled full-duplex transfer: both endpoints at 57600/odd parity with
/// auto flow control, `count` random bytes sent one at a time with the
/// complete idle/available polling protocol per byte.
pub fn polled_transfer(
    h: &mut Harness,
    count: usize,
    rng: &mut impl Rng,
) -> Result<(), Error> {
    let cfg = EndpointConfig {
        baud: BaudRate::B57600,
        parity: Parity::Odd,
        auto_flow: true,
        ..Default::default()
    };
    h.configure(UartId::Uart1, &cfg);
    h.configure(UartId::Uart0, &cfg);

    info!(h.log, "polled transfer"; "count" => count);
    for _ in 0..count {
        h.send_and_verify(UartId::Uart0, rng.gen())?;
    }
    Ok(())
}

/// FIFO burst transfer: the receiver runs with a threshold interrupt, the
/// transmitter with a TX-empty interrupt enable; one priming byte goes
/// through the per-byte protocol, then `count` bytes flow in bursts of
/// `burst` with one polling checkpoint per burst.
pub fn burst_transfer(
    h: &mut Harness,
    count: usize,
    burst: usize,
    trigger: RxTrigger,
    rng: &mut impl Rng,
) -> Result<(), Error> {
    let rx_cfg = EndpointConfig {
        baud: BaudRate::B57600,
        parity: Parity::Odd,
        auto_flow: true,
        rx_trigger: Some(trigger),
        intr_enable: IER_RXTH,
        ..Default::default()
    };
    let tx_cfg = EndpointConfig {
        baud: BaudRate::B57600,
        parity: Parity::Odd,
        auto_flow: true,
        intr_enable: IER_TXMT,
        ..Default::default()
    };
    h.configure(UartId::Uart1, &rx_cfg);
    h.configure(UartId::Uart0, &tx_cfg);

    info!(
        h.log, "burst transfer";
        "count" => count, "burst" => burst, "trigger" => trigger.level(),
    );
    h.send_and_verify(UartId::Uart0, rng.gen())?;

    let mut buf = vec![0u8; burst];
    let mut remaining = count;
    while remaining > 0 {
        let n = remaining.min(burst);
        rng.fill(&mut buf[..n]);
        let gated = n >= trigger.level();
        h.send_burst(UartId::Uart0, &buf[..n], gated)?;
        remaining -= n;
    }
    // every queued byte must have been seen
    while h.expect_outstanding(UartId::Uart1) > 0 {
        h.drain_and_verify(UartId::Uart1)?;
    }
    Ok(())
}

/// Loopback sweep across the whole baud table: for each rate, program the
/// divisor, send one random byte through the looped-back transmitter, and
/// poll the full drain/available sequence before verifying the payload.
pub fn baud_sweep(h: &mut Harness, rng: &mut impl Rng) -> Result<(), Error> {
    let id = UartId::Uart0;
    for baud in BaudRate::iter() {
        info!(h.log, "baud sweep"; "baud" => %baud);
        let cfg = EndpointConfig {
            baud,
            parity: Parity::Odd,
            auto_flow: true,
            loopback: true,
            ..Default::default()
        };
        h.configure(id, &cfg);

        h.expect_and_send(id, id, rng.gen())?;
        h.poll_lsr(id, LSR_THRE, "TX FIFO drain")?;
        h.poll_lsr(id, LSR_TEMT, "TX shifter idle")?;
        h.poll_lsr(id, LSR_DR, "loopback data available")?;
        h.drain_and_verify(id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use slog::o;

    fn test_log() -> slog::Logger {
        slog::Logger::root(slog::Discard, o!())
    }

    #[test]
    fn register_check_is_clean() {
        let log = test_log();
        let mut h = Harness::new(&log);
        register_check(&mut h).unwrap();
        assert!(h.scoreboard().is_clean());
        assert!(h.scoreboard().passed() > 40);
    }

    #[test]
    fn polled_transfer_128_bytes() {
        let log = test_log();
        let mut h = Harness::new(&log);
        let mut rng = StdRng::seed_from_u64(0x1655);
        polled_transfer(&mut h, 128, &mut rng).unwrap();
        assert!(h.scoreboard().is_clean());
        assert_eq!(h.expect_outstanding(UartId::Uart1), 0);
    }

    #[test]
    fn burst_transfer_128_bytes() {
        let log = test_log();
        let mut h = Harness::new(&log);
        let mut rng = StdRng::seed_from_u64(0x1655);
        burst_transfer(&mut h, 128, 8, RxTrigger::Four, &mut rng).unwrap();
        assert!(h.scoreboard().is_clean());
        assert_eq!(h.expect_outstanding(UartId::Uart1), 0);
    }

    #[test]
    fn baud_sweep_all_rates() {
        let log = test_log();
        let mut h = Harness::new(&log);
        let mut rng = StdRng::seed_from_u64(0x1655);
        baud_sweep(&mut h, &mut rng).unwrap();
        assert!(h.scoreboard().is_clean());
        // one payload compare per table entry, plus the LSR checks
        assert_eq!(
            h.scoreboard()
                .checks()
                .iter()
                .filter(|c| c.subject.ends_with("rx data"))
                .count(),
            10
        );
    }
}
