//! The single recording primitive every check goes through.

use crate::core::tally::Tally;
use crate::io::transcript::{Level, Transcript};

/// Transcript plus pass/fail counters for one validator run.
#[derive(Debug)]
pub struct Reporter {
    transcript: Transcript,
    tally: Tally,
}

impl Reporter {
    pub fn new(transcript: Transcript) -> Self {
        Self {
            transcript,
            tally: Tally::default(),
        }
    }

    /// Log a pass/fail line, count it, and return `ok` so callers can abort early.
    pub fn record(&mut self, ok: bool, label: &str) -> bool {
        let level = if ok { Level::Pass } else { Level::Fail };
        self.transcript.line(level, label);
        self.tally.count(ok)
    }

    pub fn section(&mut self, title: &str) {
        self.transcript.line(Level::Section, title);
    }

    pub fn info(&mut self, message: &str) {
        self.transcript.line(Level::Info, message);
    }

    /// Indented supporting line under the previous record (e.g. a matching placeholder).
    pub fn detail(&mut self, message: &str) {
        self.transcript.line(Level::Detail, message);
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn transcript(&mut self) -> &mut Transcript {
        &mut self.transcript
    }
}
