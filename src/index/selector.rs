//! File Selector
//!
//! Resolves a [`SelectionWindow`] into the ordered list of files a
//! historical run replays. Filtering and sampling happen in-process over
//! the loaded index rows.

use crate::index::summary::FileSummary;
use rand::seq::SliceRandom;
use rand::Rng;

/// Time range plus sample fraction used to choose files
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionWindow {
    /// Inclusive lower bound in epoch seconds; `None` is unbounded
    pub start: Option<i64>,
    /// Inclusive upper bound in epoch seconds; `None` is unbounded
    pub end: Option<i64>,
    /// Fraction of qualifying files to replay, in `(0, 1]`
    pub sample_fraction: f64,
}

impl Default for SelectionWindow {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            sample_fraction: 1.0,
        }
    }
}

impl SelectionWindow {
    pub fn new(start: Option<i64>, end: Option<i64>) -> Self {
        Self {
            start,
            end,
            ..Default::default()
        }
    }

    /// Builder method: sample fraction
    pub fn sample(mut self, fraction: f64) -> Self {
        self.sample_fraction = fraction;
        self
    }

    /// Number of files to keep out of `qualifying`
    pub fn sample_size(&self, qualifying: usize) -> usize {
        if self.sample_fraction >= 1.0 {
            return qualifying;
        }
        ((self.sample_fraction * qualifying as f64).ceil() as usize).min(qualifying)
    }
}

/// Pick the files to replay, sorted by `(min_ts, max_ts, path)`
///
/// A file qualifies only if it lies entirely inside the window. With a
/// fraction below 1.0, `ceil(fraction * qualifying)` files are drawn
/// uniformly without replacement. An empty result is not an error.
pub fn select_files<R: Rng + ?Sized>(
    rows: &[FileSummary],
    window: &SelectionWindow,
    rng: &mut R,
) -> Vec<FileSummary> {
    let mut selected: Vec<FileSummary> = rows
        .iter()
        .filter(|r| r.is_covered_by(window.start, window.end))
        .cloned()
        .collect();

    let keep = window.sample_size(selected.len());
    if keep < selected.len() {
        selected.shuffle(rng);
        selected.truncate(keep);
    }

    selected.sort_by(|a, b| a.replay_key().cmp(&b.replay_key()));
    selected
}
