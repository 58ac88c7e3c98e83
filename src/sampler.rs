//! Weighted sampling without replacement.
//!
//! Both the static record picker and the platform node search draw winners
//! from a weight-sorted pool until they have enough, so the selection state
//! lives here as a reusable selector.

use rand::Rng;

/// Stateful weighted selector over an owned working list.
///
/// The pool is expected to be sorted by weight descending; combined with the
/// inclusive upper bound of the draw and the `s >= n` comparison this biases
/// ties toward the first listed item, giving a deterministic fallback order
/// under equal weights.
#[derive(Debug, Clone)]
pub struct WeightedSelector<T> {
    pool: Vec<(T, u64)>,
    remaining: u64,
}

impl<T> WeightedSelector<T> {
    /// Build a selector over `(item, weight)` pairs.
    pub fn new(pool: Vec<(T, u64)>) -> Self {
        let remaining = pool.iter().map(|(_, w)| *w).sum();
        Self { pool, remaining }
    }

    /// Weight left in the working list.
    pub fn remaining_weight(&self) -> u64 {
        self.remaining
    }

    /// True once the working list is exhausted.
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Draw one winner and remove it from the working list.
    ///
    /// Returns `None` when the list is empty or the remaining weight has
    /// reached zero; callers treat either as the end of the sample.
    pub fn pick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<T> {
        if self.pool.is_empty() || self.remaining == 0 {
            return None;
        }

        // Inclusive range: n may equal the full remaining weight.
        let n = rng.gen_range(0..=self.remaining);

        let mut acc = 0u64;
        let mut winner = self.pool.len() - 1;
        for (i, (_, weight)) in self.pool.iter().enumerate() {
            acc += *weight;
            if acc >= n {
                winner = i;
                break;
            }
        }

        let (item, weight) = self.pool.remove(winner);
        self.remaining -= weight;
        Some(item)
    }
}

/// Sample up to `count` items proportionally to weight, without replacement.
///
/// When the total weight is zero the set is not weighted at all and the
/// input is returned unchanged.
pub fn sample<T: Clone, R: Rng + ?Sized>(
    rng: &mut R,
    items: &[(T, u64)],
    count: usize,
) -> Vec<T> {
    let total: u64 = items.iter().map(|(_, w)| *w).sum();
    if total == 0 {
        return items.iter().map(|(item, _)| item.clone()).collect();
    }

    let count = count.min(items.len());
    let mut selector = WeightedSelector::new(items.to_vec());
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        match selector.pick(rng) {
            Some(item) => out.push(item),
            None => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool(weights: &[u64]) -> Vec<(usize, u64)> {
        weights.iter().copied().enumerate().collect()
    }

    #[test]
    fn zero_total_returns_input_unchanged() {
        let mut rng = StdRng::seed_from_u64(1);
        let items = pool(&[0, 0, 0]);
        let picked = sample(&mut rng, &items, 2);
        assert_eq!(picked, vec![0, 1, 2]);
    }

    #[test]
    fn sample_size_is_min_of_count_and_len() {
        let mut rng = StdRng::seed_from_u64(1);
        let items = pool(&[5, 3, 2]);

        assert_eq!(sample(&mut rng, &items, 2).len(), 2);
        assert_eq!(sample(&mut rng, &items, 10).len(), 3);
    }

    #[test]
    fn identical_seed_is_deterministic() {
        let items = pool(&[7, 5, 3, 1]);

        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        assert_eq!(sample(&mut a, &items, 4), sample(&mut b, &items, 4));
    }

    #[test]
    fn no_replacement() {
        let mut rng = StdRng::seed_from_u64(9);
        let items = pool(&[4, 4, 4, 4]);
        let mut picked = sample(&mut rng, &items, 4);
        picked.sort_unstable();
        assert_eq!(picked, vec![0, 1, 2, 3]);
    }

    #[test]
    fn selection_frequency_tracks_weight() {
        // weight 3 vs 1: the heavy item should win roughly 3/4 of draws.
        let mut rng = StdRng::seed_from_u64(1234);
        let items = pool(&[3, 1]);

        let mut heavy = 0usize;
        let draws = 10_000;
        for _ in 0..draws {
            if sample(&mut rng, &items, 1)[0] == 0 {
                heavy += 1;
            }
        }

        let ratio = heavy as f64 / draws as f64;
        assert!((0.60..=0.90).contains(&ratio), "heavy ratio {ratio}");
    }

    #[test]
    fn selector_stops_on_exhausted_weight() {
        let mut rng = StdRng::seed_from_u64(3);
        // One weighted item followed by zero-weight leftovers: once the
        // weighted one is gone the remaining weight is zero and the
        // selector stops early.
        let mut selector = WeightedSelector::new(vec![("a", 2u64), ("b", 0), ("c", 0)]);
        assert_eq!(selector.pick(&mut rng), Some("a"));
        assert_eq!(selector.pick(&mut rng), None);
        assert!(!selector.is_empty());
    }
}
