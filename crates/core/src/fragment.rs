// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fragments of journal content and ordered fragment sets
//!
//! A `Fragment` is an immutable half-open byte range `[begin, end)` of a
//! journal which is durably available for reads. A `FragmentSet` keeps the
//! fragments of one journal ordered such that both `begin` and `end` strictly
//! increase, and no fragment is fully covered by another.

use crate::journal::JournalName;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A contiguous, durable byte range of a journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub journal: JournalName,
    pub begin: u64,
    pub end: u64,
    /// File holding the fragment's bytes at their journal offsets, if locally readable
    pub backing: Option<PathBuf>,
}

impl Fragment {
    pub fn new(journal: JournalName, begin: u64, end: u64) -> Self {
        Self {
            journal,
            begin,
            end,
            backing: None,
        }
    }

    pub fn with_backing(mut self, path: impl Into<PathBuf>) -> Self {
        self.backing = Some(path.into());
        self
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.begin)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }

    /// Whether `offset` falls within `[begin, end)`
    pub fn contains(&self, offset: u64) -> bool {
        self.begin <= offset && offset < self.end
    }
}

/// Ordered, de-duplicated fragments of a single journal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentSet(Vec<Fragment>);

impl FragmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fragment to the set
    ///
    /// Returns false (leaving the set unchanged) if the fragment is empty or
    /// already covered by a fragment of the set. Otherwise fragments covered
    /// by the new fragment are replaced by it.
    pub fn add(&mut self, fragment: Fragment) -> bool {
        if fragment.is_empty() {
            return false;
        }
        let set = &mut self.0;

        // Fast path: the fragment extends beyond the current end.
        if let Some(last) = set.last() {
            if last.end < fragment.end && last.begin < fragment.begin {
                set.push(fragment);
                return true;
            }
        }

        // Of fragments beginning at or before `fragment`, the last has the largest end.
        let before = set.partition_point(|f| f.begin <= fragment.begin);
        if before > 0 && set[before - 1].end >= fragment.end {
            return false;
        }

        // Fragments in [covered_begin, covered_end) lie entirely within `fragment`.
        let covered_begin = set.partition_point(|f| f.begin < fragment.begin);
        let covered_end = set
            .partition_point(|f| f.end <= fragment.end)
            .max(covered_begin);

        set.splice(covered_begin..covered_end, std::iter::once(fragment));
        true
    }

    /// First offset available in the set, or 0 if empty
    pub fn begin_offset(&self) -> u64 {
        self.0.first().map_or(0, |f| f.begin)
    }

    /// Current end of the set, or 0 if empty
    pub fn end_offset(&self) -> u64 {
        self.0.last().map_or(0, |f| f.end)
    }

    /// Index of the fragment covering `offset` which has the most content
    /// following `offset`
    ///
    /// If no fragment covers `offset`, returns the index of the first fragment
    /// beginning after it (which is `len()` if there is none).
    pub fn longest_overlapping_fragment(&self, offset: u64) -> usize {
        let set = &self.0;
        let mut ind = set.partition_point(|f| f.end <= offset);
        while ind + 1 < set.len() && set[ind + 1].begin <= offset {
            ind += 1;
        }
        ind
    }

    /// The longest fragment covering `offset`, if any
    pub fn covering(&self, offset: u64) -> Option<&Fragment> {
        self.0
            .get(self.longest_overlapping_fragment(offset))
            .filter(|f| f.begin <= offset)
    }

    pub fn get(&self, index: usize) -> Option<&Fragment> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Fragment> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Fragment] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a FragmentSet {
    type Item = &'a Fragment;
    type IntoIter = std::slice::Iter<'a, Fragment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
#[path = "fragment_tests.rs"]
mod tests;
