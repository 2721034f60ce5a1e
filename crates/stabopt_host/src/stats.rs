//! Summary statistics over the error rates of an optimization run.

/// Tracks logical error rate statistics.
///
/// Accumulates rates in `[0, 1]` and keeps min, max, average and a
/// histogram of 5-percentage-point buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRateStats {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: u64,
    pub buckets: [u64; 20],
}

impl Default for ErrorRateStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorRateStats {
    pub fn new() -> Self {
        Self {
            min: f64::INFINITY,
            max: 0.0,
            sum: 0.0,
            count: 0,
            buckets: [0; 20],
        }
    }

    pub fn from_rates(rates: &[f64]) -> Self {
        let mut stats = Self::new();
        for &r in rates {
            stats.update(r);
        }
        stats
    }

    /// Records one error rate. Rates outside `[0, 1]` are clamped.
    pub fn update(&mut self, rate: f64) {
        let rate = rate.clamp(0.0, 1.0);
        if rate < self.min {
            self.min = rate;
        }
        if rate > self.max {
            self.max = rate;
        }
        self.sum += rate;
        self.count += 1;

        let idx = ((rate * 20.0) as usize).min(19);
        self.buckets[idx] += 1;
    }

    /// Average rate, or 0.0 when nothing was recorded.
    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    pub fn print_report(&self) {
        println!("\nError Rate Metrics (per iteration)");
        println!("Count: {}", self.count);
        if self.count == 0 {
            return;
        }
        println!("Min:   {:.2} %", self.min * 100.0);
        println!("Avg:   {:.2} %", self.avg() * 100.0);
        println!("Max:   {:.2} %", self.max * 100.0);

        println!("Distribution (5% buckets):");
        for (i, &count) in self.buckets.iter().enumerate() {
            if count > 0 {
                println!("[{:3}-{:3} %]: {}", i * 5, (i + 1) * 5, count);
            }
        }
    }
}
