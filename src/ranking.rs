/// Percentile rank over the distinct values of a weight distribution.
///
/// Ranks are computed against the set of distinct observed weights, not the
/// multiset, so a handful of outliers cannot push the bulk of the
/// distribution into one visual band.
#[derive(Debug, Clone)]
pub struct Ranking {
    values: Vec<usize>,
}

impl Ranking {
    pub fn from_weights<I>(weights: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut values: Vec<usize> = weights.into_iter().collect();
        values.sort_unstable();
        values.dedup();
        Self { values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fraction of distinct observed weights strictly below `weight`, in
    /// [0, 1]. Any weight at or above the maximum ranks 1.0; any weight
    /// below the minimum ranks 0.0.
    pub fn rank(&self, weight: usize) -> f64 {
        let (min, max) = match (self.values.first(), self.values.last()) {
            (Some(min), Some(max)) => (*min, *max),
            _ => return 0.0,
        };
        if weight >= max {
            return 1.0;
        }
        if weight < min {
            return 0.0;
        }
        let below = self.values.partition_point(|&v| v < weight);
        below as f64 / self.values.len() as f64
    }
}

/// Maps a percentile in [0, 1] onto a configured integer output range.
#[derive(Debug, Clone, Copy)]
pub struct Percentiler {
    min: usize,
    max: usize,
}

impl Percentiler {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// `min + floor(p * (max - min))`, clamping out-of-range `p`.
    pub fn map(&self, p: f64) -> usize {
        if p < 0.0 {
            return self.min;
        }
        if p > 1.0 {
            return self.max;
        }
        self.min + (self.max.saturating_sub(self.min) as f64 * p) as usize
    }
}
