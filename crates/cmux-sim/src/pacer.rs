//! Recording pacer

use std::future::{ready, Future};
use std::sync::Mutex;
use std::time::Duration;

use cmux_link::{Pacer, Wait};

/// Pacer that notes every requested wait and returns at once
#[derive(Debug, Default)]
pub struct RecordingPacer {
    waits: Mutex<Vec<(Wait, Duration)>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All waits, in order
    pub fn waits(&self) -> Vec<(Wait, Duration)> {
        self.waits
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }

    /// Durations of settle waits only
    pub fn settle_waits(&self) -> Vec<Duration> {
        self.waits()
            .into_iter()
            .filter(|(kind, _)| *kind == Wait::Settle)
            .map(|(_, d)| d)
            .collect()
    }

    /// Number of AT response waits
    pub fn response_waits(&self) -> usize {
        self.waits()
            .iter()
            .filter(|(kind, _)| *kind == Wait::Response)
            .count()
    }
}

impl Pacer for RecordingPacer {
    fn wait(&self, kind: Wait, duration: Duration) -> impl Future<Output = ()> + Send {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push((kind, duration));
        }
        ready(())
    }
}
