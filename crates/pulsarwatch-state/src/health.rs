use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use pulsarwatch_core::ClusterStatus;

/// Point-in-time copy of the shared health record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub status: ClusterStatus,
    /// Offline broker instances reported by the last completed tick.
    pub missing_brokers: u32,
}

/// Shared cluster health, cheap to clone and safe to read from any task.
#[derive(Debug, Clone, Default)]
pub struct HealthState {
    inner: Arc<RwLock<HealthSnapshot>>,
}

impl HealthState {
    /// Starts as `(Unknown, 0)`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both fields under one exclusive write.
    pub fn set(&self, status: ClusterStatus, missing_brokers: u32) {
        *self.inner.write() = HealthSnapshot {
            status,
            missing_brokers,
        };
    }

    pub fn get(&self) -> (ClusterStatus, u32) {
        let snapshot = *self.inner.read();
        (snapshot.status, snapshot.missing_brokers)
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        *self.inner.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn starts_unknown() {
        let state = HealthState::new();
        assert_eq!(state.get(), (ClusterStatus::Unknown, 0));
    }

    #[test]
    fn set_replaces_both_fields() {
        let state = HealthState::new();
        state.set(ClusterStatus::Degraded, 2);
        assert_eq!(state.get(), (ClusterStatus::Degraded, 2));

        state.set(ClusterStatus::Ok, 0);
        assert_eq!(
            state.snapshot(),
            HealthSnapshot {
                status: ClusterStatus::Ok,
                missing_brokers: 0
            }
        );
    }

    #[test]
    fn clones_share_the_record() {
        let state = HealthState::new();
        let reader = state.clone();
        state.set(ClusterStatus::TotalDown, 3);
        assert_eq!(reader.get(), (ClusterStatus::TotalDown, 3));
    }

    #[test]
    fn readers_never_observe_torn_pairs() {
        // The writer only ever stores (Ok, 0) or (TotalDown, 7).
        let state = HealthState::new();
        state.set(ClusterStatus::Ok, 0);

        thread::scope(|s| {
            let writer = state.clone();
            s.spawn(move || {
                for i in 0..10_000 {
                    if i % 2 == 0 {
                        writer.set(ClusterStatus::TotalDown, 7);
                    } else {
                        writer.set(ClusterStatus::Ok, 0);
                    }
                }
            });

            for _ in 0..4 {
                let reader = state.clone();
                s.spawn(move || {
                    for _ in 0..10_000 {
                        let pair = reader.get();
                        assert!(
                            pair == (ClusterStatus::Ok, 0) || pair == (ClusterStatus::TotalDown, 7),
                            "torn read: {pair:?}"
                        );
                    }
                });
            }
        });
    }

    #[test]
    fn last_completed_write_wins() {
        let state = HealthState::new();
        for missing in 0..5 {
            state.set(ClusterStatus::Degraded, missing);
            assert_eq!(state.get(), (ClusterStatus::Degraded, missing));
        }
    }

    #[test]
    fn snapshot_serializes() {
        let state = HealthState::new();
        state.set(ClusterStatus::TotalDown, 1);
        let json = serde_json::to_string(&state.snapshot()).unwrap();
        assert!(json.contains("\"total_down\""));
        assert!(json.contains("\"missing_brokers\":1"));
    }
}
