// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::{bail, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use slog::{info, o, warn, Drain};

use uartsim::harness::scenarios;
use uartsim::harness::{Check, Harness, RxTrigger};

mod config;

/// Seed used when neither the CLI nor the config supplies one.
const DEFAULT_SEED: u64 = 0x16550;

#[derive(Serialize)]
struct ScenarioReport {
    name: String,
    passed: usize,
    failed: usize,
    error: Option<String>,
    failures: Vec<Check>,
}

impl ScenarioReport {
    fn ok(&self) -> bool {
        self.failed == 0 && self.error.is_none()
    }
}

fn build_log() -> (slog::Logger, slog_async::AsyncGuard) {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let (drain, guard) = slog_async::Async::new(drain).build_with_guard();
    (slog::Logger::root(drain.fuse(), o!()), guard)
}

fn run_scenario(
    sc: &config::Scenario,
    main_cfg: &config::Main,
    stop_on_fail: bool,
    rng: &mut StdRng,
    log: &slog::Logger,
) -> anyhow::Result<ScenarioReport> {
    let mut harness = Harness::new(log).stop_on_fail(stop_on_fail);
    if let Some(limit) = main_cfg.poll_limit {
        harness = harness.poll_limit(limit);
    }

    let res = match sc {
        config::Scenario::RegisterCheck => {
            scenarios::register_check(&mut harness)
        }
        config::Scenario::PolledTransfer { count } => {
            scenarios::polled_transfer(&mut harness, *count, rng)
        }
        config::Scenario::BurstTransfer { count, burst, trigger } => {
            let trigger = RxTrigger::from_level(*trigger).with_context(
                || format!("invalid RX trigger level {trigger}"),
            )?;
            scenarios::burst_transfer(&mut harness, *count, *burst, trigger, rng)
        }
        config::Scenario::BaudSweep => {
            scenarios::baud_sweep(&mut harness, rng)
        }
    };

    let sb = harness.scoreboard();
    Ok(ScenarioReport {
        name: sc.to_string(),
        passed: sb.passed(),
        failed: sb.failed(),
        error: res.err().map(|e| e.to_string()),
        failures: sb.failures().cloned().collect(),
    })
}

#[derive(clap::Parser)]
/// Scenario driver for the UART register-bank and transfer model.
struct Args {
    /// TOML scenario config; all scenarios run with defaults if omitted.
    #[clap(value_name = "CONFIG", action)]
    config: Option<String>,

    /// Override the payload RNG seed.
    #[clap(short, long, action)]
    seed: Option<u64>,

    /// Abort a scenario on its first verification mismatch.
    #[clap(long, action)]
    stop_on_fail: bool,

    /// Write a JSON report of all checks that failed.
    #[clap(short, long, value_name = "PATH", action)]
    report: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let Args { config, seed, stop_on_fail, report } = Args::parse();

    let (log, _log_async_guard) = build_log();

    let cfg = match config {
        Some(path) => config::parse(&path)?,
        None => config::Config::default(),
    };
    let seed = seed.or(cfg.main.seed).unwrap_or(DEFAULT_SEED);
    let stop_on_fail = stop_on_fail || cfg.main.stop_on_fail;
    let mut rng = StdRng::seed_from_u64(seed);

    info!(log, "starting scenarios"; "seed" => seed);

    let mut reports = Vec::new();
    for sc in cfg.scenarios() {
        let rep = run_scenario(&sc, &cfg.main, stop_on_fail, &mut rng, &log)?;
        if rep.ok() {
            info!(
                log, "scenario PASS";
                "scenario" => %rep.name, "checks" => rep.passed,
            );
        } else {
            warn!(
                log, "scenario FAIL";
                "scenario" => %rep.name,
                "checks" => rep.passed + rep.failed,
                "mismatches" => rep.failed,
                "error" => rep.error.as_deref().unwrap_or("-"),
            );
        }
        reports.push(rep);
    }

    if let Some(path) = report {
        let out = std::fs::File::create(&path)
            .with_context(|| format!("failed to create report {path}"))?;
        serde_json::to_writer_pretty(out, &reports)
            .context("failed to write report")?;
        info!(log, "report written"; "path" => path);
    }

    let failed = reports.iter().filter(|r| !r.ok()).count();
    if failed > 0 {
        bail!("{failed} of {} scenario(s) failed", reports.len());
    }
    info!(log, "all scenarios passed"; "count" => reports.len());
    Ok(())
}
