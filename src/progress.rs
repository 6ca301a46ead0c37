// src/progress.rs

//! Shared progress reporting trait and implementations
//!
//! The acquisition engine reports what it is doing through a
//! [`ProgressSink`]. Sinks are purely observational: nothing they do can
//! change the outcome of a run.
//!
//! # Design
//!
//! Implementations include:
//! - `CliProgress`: Visual progress bar using indicatif
//! - `LogProgress`: Logs events to tracing
//! - `CallbackProgress`: Forwards events to a closure (tests, embedding)
//! - `SilentProgress`: No-op for scripted/quiet modes

use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use tracing::{info, warn};

/// Events emitted during restore, install and self-update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// More packages were queued for acquisition
    Planned(usize),
    /// Picking a version from feed candidates
    Resolving { package: String },
    /// Archive downloaded from a specific feed
    Downloaded { package: String, feed: String },
    /// Package written to the packages folder
    Installed { package: String },
    /// Package was already present and was skipped
    AlreadyInstalled { package: String },
    /// Package could not be acquired
    Failed { package: String, reason: String },
    /// Non-fatal problem worth showing to the user
    Warning(String),
    /// Free-form status line
    Message(String),
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Planned(n) => write!(f, "{} package(s) to acquire", n),
            ProgressEvent::Resolving { package } => write!(f, "Resolving {}", package),
            ProgressEvent::Downloaded { package, feed } => {
                write!(f, "Downloaded {} from {}", package, feed)
            }
            ProgressEvent::Installed { package } => write!(f, "Installed {}", package),
            ProgressEvent::AlreadyInstalled { package } => {
                write!(f, "{} is already installed", package)
            }
            ProgressEvent::Failed { package, reason } => {
                write!(f, "Failed to acquire {}: {}", package, reason)
            }
            ProgressEvent::Warning(msg) => write!(f, "WARNING: {}", msg),
            ProgressEvent::Message(msg) => write!(f, "{}", msg),
        }
    }
}

/// Core trait for progress reporting
///
/// Implementations must be thread-safe (Send + Sync): events arrive from
/// concurrently running acquisitions.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Silent progress sink (no-op)
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Logging progress sink
///
/// Warnings and failures go out at `warn`, everything else at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Warning(_) | ProgressEvent::Failed { .. } => warn!("{}", event),
            _ => info!("{}", event),
        }
    }
}

/// Callback-based progress sink
pub struct CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressSink for CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        (self.callback)(event);
    }
}

/// Terminal progress bar counting acquired packages
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    /// Clear the bar once the run is over
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for CliProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for CliProgress {
    fn emit(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::Planned(n) => self.bar.inc_length(*n as u64),
            ProgressEvent::Resolving { package } | ProgressEvent::Downloaded { package, .. } => {
                self.bar.set_message(package.clone());
            }
            ProgressEvent::Installed { .. } | ProgressEvent::AlreadyInstalled { .. } => {
                self.bar.inc(1);
                self.bar.println(event.to_string());
            }
            ProgressEvent::Failed { .. }
            | ProgressEvent::Warning(_)
            | ProgressEvent::Message(_) => self.bar.println(event.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_silent_progress() {
        let progress = SilentProgress;
        progress.emit(ProgressEvent::Message("ignored".to_string()));
    }

    #[test]
    fn test_callback_progress() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();

        let progress = CallbackProgress::new(move |event| {
            events_clone.lock().unwrap().push(event);
        });

        progress.emit(ProgressEvent::Planned(2));
        progress.emit(ProgressEvent::Installed {
            package: "Foo 1.0.0".to_string(),
        });

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0], ProgressEvent::Planned(2));
        assert!(matches!(&captured[1], ProgressEvent::Installed { package } if package == "Foo 1.0.0"));
    }

    #[test]
    fn test_event_display() {
        let event = ProgressEvent::Downloaded {
            package: "Foo 1.0.0".to_string(),
            feed: "local".to_string(),
        };
        assert_eq!(event.to_string(), "Downloaded Foo 1.0.0 from local");
        assert_eq!(
            ProgressEvent::Warning("x".to_string()).to_string(),
            "WARNING: x"
        );
    }
}
