//! Incident state machine and the alert transport seam.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{error, info};

use pulsarwatch_core::{AlertPolicy, ClusterStatus};

use crate::error::AlertError;

/// Payload for opening or refreshing an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncidentReport {
    pub scope: String,
    pub source: String,
    pub summary: String,
    pub detail: String,
    pub policy: AlertPolicy,
}

/// Delivery of alerts and incident transitions.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Notify with a high-verbosity alert. `suppression` is how long the
    /// same condition stays quiet afterwards.
    async fn verbose_alert(
        &self,
        scope: &str,
        message: &str,
        suppression: Duration,
    ) -> Result<(), AlertError>;

    /// Open the incident for `report.scope`, or refresh it if already open.
    async fn report_incident(&self, report: &IncidentReport) -> Result<(), AlertError>;

    /// Resolve the incident for `scope`. Clearing a clear scope is a no-op.
    async fn clear_incident(&self, scope: &str) -> Result<(), AlertError>;
}

/// Alert transport that only writes structured log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn verbose_alert(
        &self,
        scope: &str,
        message: &str,
        suppression: Duration,
    ) -> Result<(), AlertError> {
        error!(
            %scope,
            suppression_secs = suppression.as_secs(),
            "{message}"
        );
        Ok(())
    }

    async fn report_incident(&self, report: &IncidentReport) -> Result<(), AlertError> {
        error!(
            scope = %report.scope,
            source = %report.source,
            detail = %report.detail,
            ceiling = report.policy.ceiling,
            "incident reported: {}",
            report.summary
        );
        Ok(())
    }

    async fn clear_incident(&self, scope: &str) -> Result<(), AlertError> {
        info!(%scope, "incident cleared");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidentState {
    /// Nothing observed yet. An incident may still be open from an earlier
    /// process, so the first `Ok` clears unconditionally.
    Unknown,
    NoIncident,
    IncidentOpen,
}

/// What the tracker asks the monitor to deliver for one verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertAction {
    None,
    /// Raise the verbose alert and open or refresh the incident.
    Raise,
    /// Clear the open incident.
    Clear,
}

/// Per-scope incident state machine with verbose-alert suppression.
///
/// The worst status raises at most once per suppression window and leaves
/// the incident open. `Ok` clears an open incident, or one that may have been
/// left open before startup, and forgets the suppression timestamp so the
/// next outage alerts immediately. Other statuses never transition.
#[derive(Debug)]
pub struct IncidentTracker {
    state: IncidentState,
    last_raised: Option<Instant>,
    suppression: Duration,
}

impl IncidentTracker {
    pub fn new(suppression: Duration) -> Self {
        Self {
            state: IncidentState::Unknown,
            last_raised: None,
            suppression,
        }
    }

    pub fn state(&self) -> IncidentState {
        self.state
    }

    pub fn observe(&mut self, status: ClusterStatus, now: Instant) -> AlertAction {
        match status {
            status if status.is_worst() => {
                let due = self
                    .last_raised
                    .is_none_or(|at| now.duration_since(at) >= self.suppression);
                if !due {
                    return AlertAction::None;
                }
                self.last_raised = Some(now);
                self.state = IncidentState::IncidentOpen;
                AlertAction::Raise
            }
            ClusterStatus::Ok if self.state != IncidentState::NoIncident => {
                self.state = IncidentState::NoIncident;
                self.last_raised = None;
                AlertAction::Clear
            }
            _ => AlertAction::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(180);

    #[test]
    fn starts_unknown() {
        let tracker = IncidentTracker::new(WINDOW);
        assert_eq!(tracker.state(), IncidentState::Unknown);
    }

    #[test]
    fn first_ok_after_start_clears_once() {
        let mut tracker = IncidentTracker::new(WINDOW);
        let t0 = Instant::now();

        assert_eq!(tracker.observe(ClusterStatus::Ok, t0), AlertAction::Clear);
        assert_eq!(tracker.state(), IncidentState::NoIncident);
        assert_eq!(
            tracker.observe(ClusterStatus::Ok, t0 + Duration::from_secs(10)),
            AlertAction::None
        );
    }

    #[test]
    fn first_ok_after_degraded_start_still_clears() {
        let mut tracker = IncidentTracker::new(WINDOW);
        let t0 = Instant::now();

        assert_eq!(tracker.observe(ClusterStatus::Degraded, t0), AlertAction::None);
        assert_eq!(tracker.state(), IncidentState::Unknown);
        assert_eq!(tracker.observe(ClusterStatus::Ok, t0), AlertAction::Clear);
    }

    #[test]
    fn total_down_raises_once_within_window() {
        let mut tracker = IncidentTracker::new(WINDOW);
        let t0 = Instant::now();

        assert_eq!(tracker.observe(ClusterStatus::TotalDown, t0), AlertAction::Raise);
        assert_eq!(tracker.state(), IncidentState::IncidentOpen);
        assert_eq!(
            tracker.observe(ClusterStatus::TotalDown, t0 + Duration::from_secs(10)),
            AlertAction::None
        );
        assert_eq!(
            tracker.observe(ClusterStatus::TotalDown, t0 + Duration::from_secs(179)),
            AlertAction::None
        );
        assert_eq!(
            tracker.observe(ClusterStatus::TotalDown, t0 + WINDOW),
            AlertAction::Raise
        );
    }

    #[test]
    fn ok_clears_only_open_incidents() {
        let mut tracker = IncidentTracker::new(WINDOW);
        let t0 = Instant::now();

        tracker.observe(ClusterStatus::Ok, t0);
        assert_eq!(tracker.observe(ClusterStatus::Ok, t0), AlertAction::None);
        tracker.observe(ClusterStatus::TotalDown, t0);
        assert_eq!(tracker.observe(ClusterStatus::Ok, t0), AlertAction::Clear);
        assert_eq!(tracker.state(), IncidentState::NoIncident);
        assert_eq!(tracker.observe(ClusterStatus::Ok, t0), AlertAction::None);
    }

    #[test]
    fn degraded_and_unknown_never_transition() {
        let mut tracker = IncidentTracker::new(WINDOW);
        let t0 = Instant::now();

        for status in [ClusterStatus::Degraded, ClusterStatus::Unknown] {
            assert_eq!(tracker.observe(status, t0), AlertAction::None);
            assert_eq!(tracker.state(), IncidentState::Unknown);
        }

        tracker.observe(ClusterStatus::Ok, t0);
        for status in [ClusterStatus::Degraded, ClusterStatus::Unknown] {
            assert_eq!(tracker.observe(status, t0), AlertAction::None);
            assert_eq!(tracker.state(), IncidentState::NoIncident);
        }

        tracker.observe(ClusterStatus::TotalDown, t0);
        for status in [ClusterStatus::Degraded, ClusterStatus::Unknown] {
            assert_eq!(tracker.observe(status, t0), AlertAction::None);
            assert_eq!(tracker.state(), IncidentState::IncidentOpen);
        }
    }

    #[test]
    fn outage_after_recovery_alerts_immediately() {
        let mut tracker = IncidentTracker::new(WINDOW);
        let t0 = Instant::now();

        tracker.observe(ClusterStatus::TotalDown, t0);
        tracker.observe(ClusterStatus::Ok, t0 + Duration::from_secs(10));
        assert_eq!(
            tracker.observe(ClusterStatus::TotalDown, t0 + Duration::from_secs(20)),
            AlertAction::Raise
        );
    }

    #[tokio::test]
    async fn log_sink_accepts_everything() {
        let sink = LogAlertSink;
        sink.verbose_alert("useast1-in-cluster", "down", WINDOW).await.unwrap();
        sink.report_incident(&IncidentReport {
            scope: "useast1-in-cluster".to_string(),
            source: "useast1-in-cluster".to_string(),
            summary: "down".to_string(),
            detail: "details".to_string(),
            policy: AlertPolicy::default(),
        })
        .await
        .unwrap();
        sink.clear_incident("useast1-in-cluster").await.unwrap();
        sink.clear_incident("useast1-in-cluster").await.unwrap();
    }
}
