//! Reservoir sampling of distinct entry indices

use rand::Rng;

/// Pick `size` distinct indices uniformly at random, without replacement,
/// from a stream of unknown length (Algorithm R).
///
/// After `k` items every index in `0..k` is in the reservoir with probability
/// `size / k`. When the stream is shorter than `size`, every index is returned
/// exactly once. The returned order is the reservoir's slot order.
pub fn sample_indices<I, G>(items: I, size: usize, rng: &mut G) -> Vec<usize>
where
    I: IntoIterator,
    G: Rng + ?Sized,
{
    let mut reservoir: Vec<usize> = Vec::new();
    if size == 0 {
        return reservoir;
    }

    for (i, _) in items.into_iter().enumerate() {
        if reservoir.len() < size {
            reservoir.push(i);
            continue;
        }

        // Replace a uniformly chosen slot with probability size / (i + 1)
        let j = rng.random_range(0..=i);
        if j < size {
            reservoir[j] = i;
        }
    }

    reservoir
}
