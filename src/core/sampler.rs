//! Position stream sources
//!
//! The tracker consumes a single long-lived subscription per navigation
//! lifetime. Platform geolocation sits behind `PositionSource`; the demo
//! binary and tests drive everything from `SimulatedSource`, which replays
//! a scripted sequence of fixes on a timer.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::types::geo::GeoUpdate;

/// One subscription covers a whole navigation session; dropping the
/// receiver ends the stream
pub trait PositionSource {
    fn subscribe(&self) -> mpsc::Receiver<GeoUpdate>;
}

/// Replays a fixed script of updates at a steady interval
pub struct SimulatedSource {
    script: Vec<GeoUpdate>,
    interval: Duration,
}

impl SimulatedSource {
    pub fn new(script: Vec<GeoUpdate>, interval: Duration) -> Self {
        Self { script, interval }
    }
}

impl PositionSource for SimulatedSource {
    fn subscribe(&self) -> mpsc::Receiver<GeoUpdate> {
        let (tx, rx) = mpsc::channel(16);
        let script = self.script.clone();
        let interval = self.interval;
        tokio::spawn(async move {
            for update in script {
                tokio::time::sleep(interval).await;
                if tx.send(update).await.is_err() {
                    // Receiver gone: navigation ended
                    return;
                }
            }
        });
        rx
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::geo::{GeoError, Position};

    #[tokio::test(start_paused = true)]
    async fn test_simulated_source_replays_script_in_order() {
        let script = vec![
            GeoUpdate::Fix(Position::new(41.3874, 2.1686)),
            GeoUpdate::Failed {
                error: GeoError::TimedOut,
            },
            GeoUpdate::Fix(Position::new(41.3880, 2.1690)),
        ];
        let source = SimulatedSource::new(script.clone(), Duration::from_secs(1));
        let mut rx = source.subscribe();

        let mut seen = Vec::new();
        while let Some(update) = rx.recv().await {
            seen.push(update);
        }
        assert_eq!(seen, script);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_receiver_stops_the_stream() {
        let script = vec![GeoUpdate::Fix(Position::new(41.0, 2.0)); 100];
        let source = SimulatedSource::new(script, Duration::from_millis(10));
        let mut rx = source.subscribe();
        let first = rx.recv().await;
        assert!(first.is_some());
        drop(rx);
        // The sender task exits on its next send; nothing to assert beyond
        // not hanging here
    }
}
