/// Evenly spaced selection over an ordered sequence.
pub struct Sampler;

impl Sampler {
    /// `k` indices spread over `0..n`, first and last included for `k >= 2`.
    ///
    /// Index `i` is `round(i * (n - 1) / (k - 1))`, computed in integers with
    /// halves rounded up. Nothing is deduplicated; the result has exactly `k`
    /// entries. With `k >= n` every index is returned once.
    /// `n == 0` or `k == 0` select nothing.
    pub fn indices(n: usize, k: usize) -> Vec<usize> {
        if n == 0 || k == 0 {
            return Vec::new();
        }
        if k >= n {
            return (0..n).collect();
        }
        if k == 1 {
            return vec![0];
        }

        let span = n - 1;
        let steps = k - 1;
        (0..k)
            .map(|i| (2 * i * span + steps) / (2 * steps))
            .collect()
    }

    /// The items at [`Sampler::indices`], in order.
    pub fn select<T>(items: &[T], k: usize) -> Vec<&T> {
        Self::indices(items.len(), k)
            .into_iter()
            .map(|index| &items[index])
            .collect()
    }
}
