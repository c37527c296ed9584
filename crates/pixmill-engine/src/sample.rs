//! Color frequency histogram for the `sample` command.
//!
//! Each channel is quantized to its high nibble so near-identical shades
//! share a bucket. Keys are CSS-style hex colors (`#f0a030`).

use std::collections::HashMap;

use crate::types::Rgba;

/// Quantize one channel to 16 levels.
const fn quantize(v: u8) -> u8 {
    v & 0xF0
}

/// The histogram key for a color. Alpha is ignored.
#[must_use]
pub fn color_key(c: Rgba<u8>) -> String {
    let [r, g, b, _] = c.0;
    format!("#{:02x}{:02x}{:02x}", quantize(r), quantize(g), quantize(b))
}

/// Accumulates quantized color counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorHistogram {
    counts: HashMap<[u8; 3], u64>,
}

impl ColorHistogram {
    /// Count one pixel.
    pub fn add(&mut self, c: Rgba<u8>) {
        let [r, g, b, _] = c.0;
        *self
            .counts
            .entry([quantize(r), quantize(g), quantize(b)])
            .or_insert(0) += 1;
    }

    /// Number of pixels counted.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Number of distinct buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether nothing has been counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `(key, count)` pairs, most frequent first; ties sort by key.
    #[must_use]
    pub fn into_sorted(self) -> Vec<(String, u64)> {
        let mut entries: Vec<([u8; 3], u64)> = self.counts.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        entries
            .into_iter()
            .map(|([r, g, b], n)| (color_key(Rgba([r, g, b, 0])), n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_drops_low_nibble() {
        assert_eq!(color_key(Rgba([0xFF, 0x0F, 0x81, 0x00])), "#f00080");
        assert_eq!(color_key(Rgba([0, 0, 0, 255])), "#000000");
    }

    #[test]
    fn near_colors_share_a_bucket() {
        let mut h = ColorHistogram::default();
        h.add(Rgba([200, 100, 50, 255]));
        h.add(Rgba([205, 104, 62, 0]));
        assert_eq!(h.len(), 1);
        assert_eq!(h.total(), 2);
    }

    #[test]
    fn sorted_by_count_then_key() {
        let mut h = ColorHistogram::default();
        for _ in 0..3 {
            h.add(Rgba([0, 0, 255, 255]));
        }
        h.add(Rgba([255, 0, 0, 255]));
        h.add(Rgba([0, 255, 0, 255]));
        let sorted = h.into_sorted();
        assert_eq!(
            sorted,
            vec![
                ("#0000f0".to_owned(), 3),
                ("#00f000".to_owned(), 1),
                ("#f00000".to_owned(), 1),
            ]
        );
    }

    #[test]
    fn empty_histogram() {
        let h = ColorHistogram::default();
        assert!(h.is_empty());
        assert!(h.into_sorted().is_empty());
    }
}
