// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::Serialize;

use super::Error;

/// One masked comparison: bits outside `mask` are don't-care.  A mask of
/// zero performs the access for its side effect only and always passes.
#[derive(Clone, Debug, Serialize)]
pub struct Check {
    pub subject: String,
    pub expected: u8,
    pub actual: u8,
    pub mask: u8,
    pub passed: bool,
}

impl Check {
    pub fn new(subject: String, expected: u8, actual: u8, mask: u8) -> Self {
        let passed = (actual & mask) == (expected & mask);
        Check { subject, expected, actual, mask, passed }
    }
}

/// Running tally of masked comparisons for one scenario.
///
/// Mismatches are recorded and, unless `stop_on_fail` is set, the scenario
/// keeps going; the caller inspects `failed()` at the end.
#[derive(Default)]
pub struct Scoreboard {
    checks: Vec<Check>,
    stop_on_fail: bool,
}

impl Scoreboard {
    pub fn new(stop_on_fail: bool) -> Self {
        Scoreboard { checks: Vec::new(), stop_on_fail }
    }

    pub(super) fn record(&mut self, check: Check) -> Result<(), Error> {
        let fatal = !check.passed && self.stop_on_fail;
        let err = Error::Mismatch {
            subject: check.subject.clone(),
            expected: check.expected,
            actual: check.actual,
            mask: check.mask,
        };
        self.checks.push(check);
        if fatal {
            Err(err)
        } else {
            Ok(())
        }
    }

    pub fn passed(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }
    pub fn failed(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }
    pub fn failures(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|c| !c.passed)
    }
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }
}
