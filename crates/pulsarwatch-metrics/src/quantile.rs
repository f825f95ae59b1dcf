//! Biased-quantile stream estimator.
//!
//! Implements the targeted variant of Cormode, Korn, Muthukrishnan and
//! Srivastava, "Effective Computation of Biased Quantiles over Data
//! Streams". Each target rank carries its own error bound and memory stays
//! proportional to those bounds rather than to the number of samples.
//!
//! Incoming values are buffered and merged into the compressed sample list
//! in sorted batches. Until the first merge, queries are answered exactly
//! from the buffer.
//!
//! Each retained sample's true rank lies in `[r, r + delta]`, where `r` is
//! the sum of widths up to and including it. Compression only merges when
//! `width + delta` stays within the invariant at every rank in that
//! interval, so the bound holds regardless of arrival order.

/// A rank to track and the allowed rank error around it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    /// Rank in the open interval (0, 1).
    pub quantile: f64,
    pub epsilon: f64,
}

impl Target {
    pub const fn new(quantile: f64, epsilon: f64) -> Self {
        Self { quantile, epsilon }
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    value: f64,
    /// Rank difference to the previous sample.
    width: f64,
    /// Uncertainty of this sample's rank.
    delta: f64,
}

#[derive(Debug, Clone)]
pub struct TargetedStream {
    targets: Vec<Target>,
    samples: Vec<Sample>,
    /// Observations merged into `samples`.
    n: f64,
    buffer: Vec<f64>,
    buffer_cap: usize,
    buffer_sorted: bool,
}

impl TargetedStream {
    pub fn new(targets: &[Target], buffer_cap: usize) -> Self {
        debug_assert!(
            targets.iter().all(|t| t.quantile > 0.0 && t.quantile < 1.0),
            "target ranks must lie strictly between 0 and 1"
        );
        let buffer_cap = buffer_cap.max(1);
        Self {
            targets: targets.to_vec(),
            samples: Vec::new(),
            n: 0.0,
            buffer: Vec::with_capacity(buffer_cap),
            buffer_cap,
            buffer_sorted: true,
        }
    }

    pub fn insert(&mut self, value: f64) {
        self.buffer.push(value);
        self.buffer_sorted = false;
        if self.buffer.len() >= self.buffer_cap {
            self.flush();
        }
    }

    /// Estimated value at rank `q`, or `None` if nothing has been observed.
    pub fn query(&mut self, q: f64) -> Option<f64> {
        if self.samples.is_empty() {
            if self.buffer.is_empty() {
                return None;
            }
            self.sort_buffer();
            let len = self.buffer.len();
            let idx = ((len as f64 * q).ceil() as usize).saturating_sub(1).min(len - 1);
            return Some(self.buffer[idx]);
        }

        self.flush();
        Some(self.query_samples(q))
    }

    /// Total observations, merged or buffered.
    pub fn count(&self) -> u64 {
        self.n as u64 + self.buffer.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Number of retained samples after compression.
    pub fn retained(&self) -> usize {
        self.samples.len()
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.buffer.clear();
        self.buffer_sorted = true;
        self.n = 0.0;
    }

    fn sort_buffer(&mut self) {
        if !self.buffer_sorted {
            self.buffer.sort_by(f64::total_cmp);
            self.buffer_sorted = true;
        }
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        self.sort_buffer();
        let batch = std::mem::take(&mut self.buffer);
        self.merge(&batch);
        self.buffer = batch;
        self.buffer.clear();
    }

    /// Maximum allowed width + delta for a sample at rank `r`.
    fn invariant(&self, r: f64) -> f64 {
        self.targets
            .iter()
            .map(|t| {
                if t.quantile * self.n <= r {
                    2.0 * t.epsilon * r / t.quantile
                } else {
                    2.0 * t.epsilon * (self.n - r) / (1.0 - t.quantile)
                }
            })
            .fold(f64::MAX, f64::min)
    }

    /// Smallest invariant over the ranks `lo..=hi`. The invariant is piecewise
    /// linear with its only interior minima at the target ranks.
    fn span_invariant(&self, lo: f64, hi: f64) -> f64 {
        self.targets
            .iter()
            .map(|t| t.quantile * self.n)
            .filter(|r| (lo..=hi).contains(r))
            .map(|r| self.invariant(r))
            .fold(self.invariant(lo).min(self.invariant(hi)), f64::min)
    }

    /// Merge a sorted batch into the sample list.
    fn merge(&mut self, batch: &[f64]) {
        let mut i = 0;
        for &value in batch {
            while i < self.samples.len() && self.samples[i].value <= value {
                i += 1;
            }
            // The new value ranks above everything before it and no higher
            // than the largest possible rank of its successor.
            let delta = match self.samples.get(i) {
                Some(next) => next.width + next.delta - 1.0,
                None => 0.0,
            };
            self.samples.insert(
                i,
                Sample {
                    value,
                    width: 1.0,
                    delta,
                },
            );
            i += 1;
            self.n += 1.0;
        }
        self.compress();
    }

    /// Fold samples into their successors while the merged sample still
    /// satisfies the invariant across every rank it may occupy. The first
    /// sample always keeps the exact minimum.
    fn compress(&mut self) {
        if self.samples.len() < 3 {
            return;
        }
        let mut xi = self.samples.len() - 1;
        // Lower rank bound of samples[xi].
        let mut x_rank = self.n;

        let mut i = self.samples.len() - 2;
        while i >= 1 {
            let c = self.samples[i];
            let x = self.samples[xi];
            let c_rank = x_rank - x.width;
            let lo = c_rank - c.width + 1.0;
            let hi = x_rank + x.delta;
            if c.width + x.width + x.delta <= self.span_invariant(lo, hi) {
                self.samples[xi].width += c.width;
                self.samples.remove(i);
                xi -= 1;
            } else {
                x_rank = c_rank;
                xi = i;
            }
            i -= 1;
        }
    }

    /// Sample whose rank interval lies closest to the target rank.
    fn query_samples(&self, q: f64) -> f64 {
        let target = (q * self.n).ceil().max(1.0);

        let mut best = self.samples[0].value;
        let mut best_error = f64::INFINITY;
        let mut r = 0.0;
        for sample in &self.samples {
            r += sample.width;
            let error = (target - r).max(r + sample.delta - target);
            if error < best_error {
                best_error = error;
                best = sample.value;
            }
            if r > target {
                break;
            }
        }
        best
    }
}
