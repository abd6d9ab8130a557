//! Back-to-front ordering of classified tetrahedra.

use crate::classify::ClassificationRecord;
use crate::options::SortMethod;

/// Default number of depth layers for bucket sorting.
pub const DEFAULT_LAYER_COUNT: usize = 100;

/// Layer of `depth` in `[min, max]` split into `layers` equal slices.
///
/// Always in `[0, layers - 1]`, including for depths outside the range and
/// for an empty range.
pub fn bucket_index(depth: f32, min: f32, max: f32, layers: usize) -> usize {
    let last = layers.saturating_sub(1);
    let range = max - min;
    if range.is_nan() || range <= 0.0 || !depth.is_finite() {
        return 0;
    }
    let t = ((depth - min) / range * last as f32).floor();
    if t <= 0.0 {
        0
    } else {
        (t as usize).min(last)
    }
}

/// Owns the transient per-frame sort buffers.
#[derive(Debug, Clone)]
pub struct Sorter {
    layer_count: usize,
    order: Vec<u32>,
    buckets: Vec<u32>,
    layer_starts: Vec<u32>,
}

impl Default for Sorter {
    fn default() -> Self {
        Self::new(DEFAULT_LAYER_COUNT)
    }
}

impl Sorter {
    pub fn new(layer_count: usize) -> Self {
        Self {
            layer_count: layer_count.max(1),
            order: Vec::new(),
            buckets: Vec::new(),
            layer_starts: Vec::new(),
        }
    }

    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    pub fn set_layer_count(&mut self, layer_count: usize) {
        self.layer_count = layer_count.max(1);
    }

    /// The most recent order, back to front.
    pub fn order(&self) -> &[u32] {
        &self.order
    }

    /// Sorts classified tetrahedra by their centroid depth.
    pub fn sort(&mut self, method: SortMethod, records: &[ClassificationRecord]) -> &[u32] {
        let depths: Vec<f32> = records.iter().map(|r| r.centroid_depth).collect();
        self.sort_depths(method, &depths)
    }

    /// Sorts ids `0..depths.len()` so that the farthest (smallest eye z) comes first.
    ///
    /// Recomputed from scratch on every call.
    pub fn sort_depths(&mut self, method: SortMethod, depths: &[f32]) -> &[u32] {
        self.order.clear();
        self.order.extend(0..depths.len() as u32);
        match method {
            SortMethod::None => {}
            SortMethod::Centroid => {
                // `sort_by` is stable: coplanar tetrahedra keep id order
                self.order
                    .sort_by(|&a, &b| depths[a as usize].total_cmp(&depths[b as usize]));
            }
            SortMethod::Bucket => self.bucket_sort(depths),
        }
        &self.order
    }

    /// Layer assigned to each tetrahedron by the last bucket sort.
    pub fn buckets(&self) -> &[u32] {
        &self.buckets
    }

    fn bucket_sort(&mut self, depths: &[f32]) {
        let (min, max) = depths
            .iter()
            .filter(|d| d.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &d| (lo.min(d), hi.max(d)));

        let layers = self.layer_count;
        self.buckets.clear();
        self.buckets
            .extend(depths.iter().map(|&d| bucket_index(d, min, max, layers) as u32));

        // counting sort: prefix sums give each layer's first slot
        self.layer_starts.clear();
        self.layer_starts.resize(layers + 1, 0);
        for &b in &self.buckets {
            self.layer_starts[b as usize + 1] += 1;
        }
        for i in 0..layers {
            self.layer_starts[i + 1] += self.layer_starts[i];
        }
        let mut cursor = self.layer_starts.clone();
        for (id, &b) in self.buckets.iter().enumerate() {
            let slot = &mut cursor[b as usize];
            self.order[*slot as usize] = id as u32;
            *slot += 1;
        }
        log::trace!("bucket sort over {} layers, depth range [{min}, {max}]", layers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_none_is_identity() {
        let mut sorter = Sorter::default();
        assert_eq!(sorter.sort_depths(SortMethod::None, &[3.0, 1.0, 2.0]), &[0, 1, 2]);
    }

    #[test]
    fn test_centroid_back_to_front_and_stable() {
        let mut sorter = Sorter::default();
        let order = sorter.sort_depths(SortMethod::Centroid, &[-1.0, -5.0, -1.0, -3.0]);
        assert_eq!(order, &[1, 3, 0, 2]);
    }

    #[test]
    fn test_bucket_extremes_are_clamped() {
        assert_eq!(bucket_index(0.0, 0.0, 1.0, 100), 0);
        assert_eq!(bucket_index(1.0, 0.0, 1.0, 100), 99);
        assert_eq!(bucket_index(5.0, 0.0, 1.0, 100), 99);
        assert_eq!(bucket_index(-5.0, 0.0, 1.0, 100), 0);
        assert_eq!(bucket_index(0.5, 0.5, 0.5, 100), 0);
        assert_eq!(bucket_index(f32::NAN, 0.0, 1.0, 100), 0);
    }

    #[test]
    fn test_bucket_sort_orders_layers() {
        let mut sorter = Sorter::new(4);
        let order = sorter.sort_depths(SortMethod::Bucket, &[0.0, -9.0, -4.5, -0.1, -9.0]);
        assert_eq!(order, &[1, 4, 2, 3, 0]);
    }

    #[test]
    fn test_empty_input() {
        let mut sorter = Sorter::default();
        assert!(sorter.sort_depths(SortMethod::Bucket, &[]).is_empty());
        assert!(sorter.sort_depths(SortMethod::Centroid, &[]).is_empty());
    }

    fn is_permutation(order: &[u32], n: usize) -> bool {
        let mut seen = vec![false; n];
        for &id in order {
            if id as usize >= n || seen[id as usize] {
                return false;
            }
            seen[id as usize] = true;
        }
        order.len() == n
    }

    proptest! {
        #[test]
        fn prop_centroid_sort_is_monotone_permutation(
            depths in prop::collection::vec(-100.0f32..100.0, 0..300)
        ) {
            let mut sorter = Sorter::default();
            let order = sorter.sort_depths(SortMethod::Centroid, &depths).to_vec();
            prop_assert!(is_permutation(&order, depths.len()));
            for w in order.windows(2) {
                prop_assert!(depths[w[0] as usize] <= depths[w[1] as usize]);
            }
        }

        #[test]
        fn prop_bucket_sort_assigns_each_id_once(
            depths in prop::collection::vec(-10.0f32..10.0, 0..300),
            layers in 1usize..200,
        ) {
            let mut sorter = Sorter::new(layers);
            let order = sorter.sort_depths(SortMethod::Bucket, &depths).to_vec();
            prop_assert!(is_permutation(&order, depths.len()));
            let buckets = sorter.buckets();
            for &b in buckets {
                prop_assert!((b as usize) < layers);
            }
            for w in order.windows(2) {
                prop_assert!(buckets[w[0] as usize] <= buckets[w[1] as usize]);
            }
        }
    }
}
