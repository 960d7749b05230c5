//! Pass/fail counters shared by every check of a run.

/// Running count of recorded check results.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub passed: u32,
    pub failed: u32,
}

impl Tally {
    /// Count one result and hand it back so callers can abort on failure.
    pub fn count(&mut self, ok: bool) -> bool {
        if ok {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        ok
    }

    pub fn total(&self) -> u32 {
        self.passed + self.failed
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}
