//! Rolling quantile summaries and their Prometheus collector.
//!
//! A `RollingSummary` keeps `age_buckets` quantile streams. Every
//! observation goes into all of them; every `max_age / age_buckets` the
//! oldest stream is reset and becomes the newest. Quantiles are read from
//! the oldest stream, which covers between `max_age - max_age/age_buckets`
//! and `max_age` of history. Count and sum are cumulative.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto::{LabelPair, Metric, MetricFamily, MetricType, Quantile, Summary};

use crate::quantile::{Target, TargetedStream};

/// Shape of a rolling summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryConfig {
    pub targets: Vec<Target>,
    pub max_age: Duration,
    pub age_buckets: usize,
    /// Samples buffered per stream before a compressing merge.
    pub buffer_cap: usize,
}

impl Default for SummaryConfig {
    /// p50 ±5%, p90 ±1%, p99 ±0.1% over 30 minutes in 3 buckets.
    fn default() -> Self {
        Self {
            targets: vec![
                Target::new(0.5, 0.05),
                Target::new(0.9, 0.01),
                Target::new(0.99, 0.001),
            ],
            max_age: Duration::from_secs(30 * 60),
            age_buckets: 3,
            buffer_cap: 500,
        }
    }
}

#[derive(Debug)]
pub struct RollingSummary {
    targets: Vec<Target>,
    streams: Vec<TargetedStream>,
    head: usize,
    head_expires: Instant,
    stream_duration: Duration,
    count: u64,
    sum: f64,
}

impl RollingSummary {
    pub fn new(config: &SummaryConfig) -> Self {
        Self::new_at(config, Instant::now())
    }

    pub(crate) fn new_at(config: &SummaryConfig, now: Instant) -> Self {
        let buckets = config.age_buckets.max(1);
        let stream_duration = config.max_age / buckets as u32;
        Self {
            targets: config.targets.clone(),
            streams: (0..buckets)
                .map(|_| TargetedStream::new(&config.targets, config.buffer_cap))
                .collect(),
            head: 0,
            head_expires: now + stream_duration,
            stream_duration,
            count: 0,
            sum: 0.0,
        }
    }

    pub fn observe(&mut self, value: f64) {
        self.observe_at(value, Instant::now());
    }

    pub(crate) fn observe_at(&mut self, value: f64, now: Instant) {
        self.rotate(now);
        for stream in &mut self.streams {
            stream.insert(value);
        }
        self.count += 1;
        self.sum += value;
    }

    /// `(rank, value)` per target; `NaN` when the window holds no samples.
    pub fn quantiles(&mut self) -> Vec<(f64, f64)> {
        self.quantiles_at(Instant::now())
    }

    pub(crate) fn quantiles_at(&mut self, now: Instant) -> Vec<(f64, f64)> {
        self.rotate(now);
        let head = &mut self.streams[self.head];
        self.targets
            .iter()
            .map(|t| (t.quantile, head.query(t.quantile).unwrap_or(f64::NAN)))
            .collect()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    fn rotate(&mut self, now: Instant) {
        if self.stream_duration.is_zero() {
            return;
        }
        while now >= self.head_expires {
            self.streams[self.head].reset();
            self.head = (self.head + 1) % self.streams.len();
            self.head_expires += self.stream_duration;
        }
    }
}

/// A family of rolling summaries partitioned by label values.
///
/// Registered with a `prometheus::Registry` as a custom collector; clones
/// share the same children.
#[derive(Clone)]
pub struct SummaryVec {
    inner: Arc<SummaryVecInner>,
}

struct SummaryVecInner {
    desc: Desc,
    label_names: Vec<String>,
    config: SummaryConfig,
    children: Mutex<BTreeMap<Vec<String>, RollingSummary>>,
}

impl SummaryVec {
    pub fn new(
        fq_name: &str,
        help: &str,
        label_names: &[&str],
        config: SummaryConfig,
    ) -> prometheus::Result<Self> {
        let label_names: Vec<String> = label_names.iter().map(|s| s.to_string()).collect();
        let desc = Desc::new(
            fq_name.to_string(),
            help.to_string(),
            label_names.clone(),
            HashMap::new(),
        )?;
        Ok(Self {
            inner: Arc::new(SummaryVecInner {
                desc,
                label_names,
                config,
                children: Mutex::new(BTreeMap::new()),
            }),
        })
    }

    /// Observe `value` for the child identified by `label_values`, creating
    /// the child on first use. The number of values must match the label
    /// names given at construction.
    pub fn observe(&self, label_values: &[&str], value: f64) {
        debug_assert_eq!(label_values.len(), self.inner.label_names.len());
        let key: Vec<String> = label_values.iter().map(|s| s.to_string()).collect();
        let mut children = self.inner.children.lock();
        children
            .entry(key)
            .or_insert_with(|| RollingSummary::new(&self.inner.config))
            .observe(value);
    }

    pub fn child_count(&self) -> usize {
        self.inner.children.lock().len()
    }

    pub fn fq_name(&self) -> &str {
        &self.inner.desc.fq_name
    }
}

impl Collector for SummaryVec {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.inner.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut children = self.inner.children.lock();

        let mut family = MetricFamily::default();
        family.set_name(self.inner.desc.fq_name.clone());
        family.set_help(self.inner.desc.help.clone());
        family.set_field_type(MetricType::SUMMARY);

        for (values, summary) in children.iter_mut() {
            let mut proto = Summary::default();
            proto.set_sample_count(summary.count());
            proto.set_sample_sum(summary.sum());
            for (rank, value) in summary.quantiles() {
                let mut quantile = Quantile::default();
                quantile.set_quantile(rank);
                quantile.set_value(value);
                proto.mut_quantile().push(quantile);
            }

            let mut metric = Metric::default();
            for (name, value) in self.inner.label_names.iter().zip(values) {
                let mut pair = LabelPair::default();
                pair.set_name(name.clone());
                pair.set_value(value.clone());
                metric.mut_label().push(pair);
            }
            metric.set_summary(proto);
            family.mut_metric().push(metric);
        }

        vec![family]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(m: u64) -> Duration {
        Duration::from_secs(m * 60)
    }

    #[test]
    fn default_config_matches_latency_summaries() {
        let config = SummaryConfig::default();
        assert_eq!(config.targets.len(), 3);
        assert_eq!(config.max_age, minutes(30));
        assert_eq!(config.age_buckets, 3);
        assert_eq!(config.buffer_cap, 500);
    }

    #[test]
    fn empty_summary_reports_nan() {
        let mut summary = RollingSummary::new(&SummaryConfig::default());
        let quantiles = summary.quantiles();
        assert_eq!(quantiles.len(), 3);
        assert!(quantiles.iter().all(|(_, v)| v.is_nan()));
        assert_eq!(summary.count(), 0);
    }

    #[test]
    fn uniform_latencies_p50_within_bound() {
        let start = Instant::now();
        let mut summary = RollingSummary::new_at(&SummaryConfig::default(), start);
        for i in 0..1000u64 {
            summary.observe_at(((i * 7919) % 1000 + 1) as f64, start);
        }

        let quantiles = summary.quantiles_at(start);
        let (rank, p50) = quantiles[0];
        assert_eq!(rank, 0.5);
        assert!((449.0..=551.0).contains(&p50), "p50 was {p50}");
        assert_eq!(summary.count(), 1000);
        assert_eq!(summary.sum(), 500_500.0);
    }

    #[test]
    fn latency_quantiles_hold_for_any_arrival_order() {
        let n = 10_000u64;
        let orders: [(&str, Vec<u64>); 3] = [
            ("ascending", (1..=n).collect()),
            ("descending", (1..=n).rev().collect()),
            ("scrambled", (0..n).map(|i| (i * 7919) % n + 1).collect()),
        ];

        let config = SummaryConfig::default();
        for (order, values) in orders {
            let start = Instant::now();
            let mut summary = RollingSummary::new_at(&config, start);
            for v in values {
                summary.observe_at(v as f64, start);
            }

            let quantiles = summary.quantiles_at(start + minutes(1));
            for (target, (rank, value)) in config.targets.iter().zip(quantiles) {
                assert_eq!(rank, target.quantile);
                let want = (rank * n as f64).ceil();
                let error = (value - want).abs() / n as f64;
                assert!(
                    error <= target.epsilon,
                    "{order}: q={rank} was {value}, rank error {error}"
                );
            }
            assert_eq!(summary.count(), n);
        }
    }

    #[test]
    fn old_observations_age_out() {
        let start = Instant::now();
        let mut summary = RollingSummary::new_at(&SummaryConfig::default(), start);
        for _ in 0..100 {
            summary.observe_at(1000.0, start);
        }

        // Still inside the window: the head stream has the old samples.
        let (_, p50) = summary.quantiles_at(start + minutes(25))[0];
        assert_eq!(p50, 1000.0);

        // Every stream has been reset once the full horizon has passed.
        let quantiles = summary.quantiles_at(start + minutes(31));
        assert!(quantiles.iter().all(|(_, v)| v.is_nan()));

        // Recent observations replace the old distribution.
        for _ in 0..100 {
            summary.observe_at(5.0, start + minutes(32));
        }
        let (_, p50) = summary.quantiles_at(start + minutes(33))[0];
        assert_eq!(p50, 5.0);

        // Count and sum never age out.
        assert_eq!(summary.count(), 200);
        assert_eq!(summary.sum(), 100_500.0);
    }

    #[test]
    fn summary_vec_partitions_by_label() {
        let vec = SummaryVec::new(
            "pulsar_pubsub_latency_ms_hst",
            "latency",
            &["device"],
            SummaryConfig::default(),
        )
        .unwrap();
        vec.observe(&["a"], 10.0);
        vec.observe(&["a"], 20.0);
        vec.observe(&["b"], 30.0);
        assert_eq!(vec.child_count(), 2);

        let families = vec.collect();
        assert_eq!(families.len(), 1);
        let family = &families[0];
        assert_eq!(family.get_name(), "pulsar_pubsub_latency_ms_hst");
        assert_eq!(family.get_field_type(), MetricType::SUMMARY);
        assert_eq!(family.get_metric().len(), 2);

        let first = &family.get_metric()[0];
        assert_eq!(first.get_label()[0].get_value(), "a");
        assert_eq!(first.get_summary().get_sample_count(), 2);
        assert_eq!(first.get_summary().get_sample_sum(), 30.0);
        assert_eq!(first.get_summary().get_quantile().len(), 3);
    }

    #[test]
    fn clones_share_children() {
        let vec = SummaryVec::new("x_hst", "help", &["device"], SummaryConfig::default()).unwrap();
        let other = vec.clone();
        other.observe(&["a"], 1.0);
        assert_eq!(vec.child_count(), 1);
    }

    #[test]
    fn invalid_name_rejected() {
        assert!(SummaryVec::new("bad name", "help", &["device"], SummaryConfig::default()).is_err());
    }
}
