// src/acquire/result.rs

//! Outcome of one restore or install run

use crate::error::Error;
use crate::package::PackageIdentity;

/// What a run did
///
/// Failures never undo completed installs: `installed` lists everything that
/// reached the packages folder even when `fatal_error` is set.
#[derive(Debug, Default)]
pub struct RunResult {
    /// Identities written during this run, in completion order
    pub installed: Vec<PackageIdentity>,
    pub installed_count: usize,
    /// Non-fatal problems (unreadable scopes, feeds that failed but were not needed)
    pub warnings: Vec<String>,
    pub fatal_error: Option<Error>,
    /// Set once when this run restored at least one package, so the caller
    /// can print its one-time notice
    pub restore_notice: bool,
}

impl RunResult {
    /// A run that stopped before doing anything
    pub fn failed(error: Error) -> Self {
        Self {
            fatal_error: Some(error),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.fatal_error.is_none()
    }

    pub fn is_cancelled(&self) -> bool {
        self.fatal_error.as_ref().is_some_and(Error::is_cancelled)
    }

    /// Coalesced callers see the same outcome; count each identity once
    pub(crate) fn record_installed(&mut self, identity: PackageIdentity) {
        if self.installed.contains(&identity) {
            return;
        }
        self.installed.push(identity);
        self.installed_count = self.installed.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_is_not_success() {
        let result = RunResult::failed(Error::Cancelled);
        assert!(!result.is_success());
        assert!(result.is_cancelled());

        let ok = RunResult::default();
        assert!(ok.is_success());
        assert!(!ok.is_cancelled());
    }
}
