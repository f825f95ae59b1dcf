//! Health monitor: the periodic evaluation task for one cluster.
//!
//! Each tick refreshes the cluster client, publishes the verdict into the
//! shared `HealthState` and the per-tier gauges, then feeds the status to
//! the incident tracker. Ticks run strictly in order on a single task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use pulsarwatch_core::{AlertPolicy, ClusterStatus, Config, Tier, Verdict};
use pulsarwatch_metrics::{MetricIdentity, MetricRegistry};
use pulsarwatch_state::HealthState;

use crate::alert::{AlertAction, AlertSink, IncidentReport, IncidentTracker};
use crate::client::ClusterClient;
use crate::error::MonitorError;

/// Time between two evaluations.
pub const MONITOR_INTERVAL: Duration = Duration::from_secs(10);

/// Minimum time between two verbose alerts for the same outage.
pub const VERBOSE_ALERT_WINDOW: Duration = Duration::from_secs(180);

const INCIDENT_SUMMARY: &str = "kubernetes cluster is down, reported by pulsar-monitor";

pub struct HealthMonitor {
    client: Arc<dyn ClusterClient>,
    alerts: Arc<dyn AlertSink>,
    state: HealthState,
    metrics: Arc<MetricRegistry>,
    /// `{name}-in-cluster`, the label on gauges and incidents.
    scope: String,
    namespace: String,
    policy: AlertPolicy,
    incidents: IncidentTracker,
}

impl HealthMonitor {
    pub fn new(
        config: &Config,
        client: Arc<dyn ClusterClient>,
        alerts: Arc<dyn AlertSink>,
        state: HealthState,
        metrics: Arc<MetricRegistry>,
    ) -> Self {
        Self {
            client,
            alerts,
            state,
            metrics,
            scope: config.scope_label(),
            namespace: config.kubernetes.namespace.clone(),
            policy: config.kubernetes.alert_policy.clone(),
            incidents: IncidentTracker::new(VERBOSE_ALERT_WINDOW),
        }
    }

    /// Start the monitoring task, unless in-cluster monitoring is disabled.
    ///
    /// The first evaluation runs one `MONITOR_INTERVAL` after start. The task
    /// exits once `shutdown` flips to `true` or its sender is dropped.
    pub fn spawn(
        config: &Config,
        client: Arc<dyn ClusterClient>,
        alerts: Arc<dyn AlertSink>,
        state: HealthState,
        metrics: Arc<MetricRegistry>,
        shutdown: watch::Receiver<bool>,
    ) -> Option<JoinHandle<()>> {
        if !config.kubernetes.enabled {
            info!("in-cluster monitoring disabled");
            return None;
        }

        let monitor = Self::new(config, client, alerts, state, metrics);
        info!(
            scope = %monitor.scope,
            namespace = %monitor.namespace,
            interval_secs = MONITOR_INTERVAL.as_secs(),
            "health monitor started"
        );
        Some(tokio::spawn(monitor.run(MONITOR_INTERVAL, shutdown)))
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Tick until shutdown is signalled.
    pub async fn run(mut self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.evaluate_once().await {
                        error!(scope = %self.scope, error = %e, "health evaluation skipped");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!(scope = %self.scope, "health monitor stopped");
    }

    /// Run one evaluation. A client failure skips the tick before anything
    /// is published.
    pub async fn evaluate_once(&mut self) -> Result<Verdict, MonitorError> {
        self.client
            .refresh_replicas()
            .await
            .map_err(MonitorError::RefreshReplicas)?;
        self.client
            .watch_pods(&self.namespace)
            .await
            .map_err(|source| MonitorError::WatchPods {
                namespace: self.namespace.clone(),
                source,
            })?;

        let (description, verdict) = self.client.evaluate_health();

        self.state.set(verdict.status, verdict.broker_offline);
        for tier in Tier::ALL {
            self.metrics.record_gauge_int(
                &MetricIdentity::offline_instances(tier),
                &self.scope,
                i64::from(verdict.offline(tier)),
            );
        }

        self.apply_alerts(verdict.status, &description).await;

        info!(
            scope = %self.scope,
            status = %verdict.status,
            zookeeper_offline = verdict.zookeeper_offline,
            bookkeeper_offline = verdict.bookkeeper_offline,
            broker_offline = verdict.broker_offline,
            proxy_offline = verdict.proxy_offline,
            %description,
            "cluster health evaluated"
        );
        Ok(verdict)
    }

    async fn apply_alerts(&mut self, status: ClusterStatus, description: &str) {
        let action = self.incidents.observe(status, Instant::now());
        let message = (status != ClusterStatus::Ok).then(|| {
            format!(
                "cluster {}, k8s pulsar cluster status is unhealthy, error message {description}",
                self.scope
            )
        });

        match (action, message) {
            (AlertAction::Raise, Some(message)) => {
                if let Err(e) = self
                    .alerts
                    .verbose_alert(&self.scope, &message, VERBOSE_ALERT_WINDOW)
                    .await
                {
                    warn!(scope = %self.scope, error = %e, "verbose alert not delivered");
                }
                let report = IncidentReport {
                    scope: self.scope.clone(),
                    source: self.scope.clone(),
                    summary: INCIDENT_SUMMARY.to_string(),
                    detail: message,
                    policy: self.policy.clone(),
                };
                if let Err(e) = self.alerts.report_incident(&report).await {
                    warn!(scope = %self.scope, error = %e, "incident report not delivered");
                }
            }
            (AlertAction::Clear, _) => {
                if let Err(e) = self.alerts.clear_incident(&self.scope).await {
                    warn!(scope = %self.scope, error = %e, "incident clear not delivered");
                }
            }
            (_, Some(message)) => warn!(scope = %self.scope, "{message}"),
            (_, None) => {}
        }
    }
}
