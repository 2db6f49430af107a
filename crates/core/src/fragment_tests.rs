// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use yare::parameterized;

fn frag(begin: u64, end: u64) -> Fragment {
    Fragment::new(JournalName::new("a/journal"), begin, end)
}

fn spans(set: &FragmentSet) -> Vec<(u64, u64)> {
    set.iter().map(|f| (f.begin, f.end)).collect()
}

#[test]
fn empty_set_offsets_are_zero() {
    let set = FragmentSet::new();
    assert_eq!(set.begin_offset(), 0);
    assert_eq!(set.end_offset(), 0);
    assert_eq!(set.longest_overlapping_fragment(10), 0);
    assert!(set.covering(0).is_none());
}

#[test]
fn add_appends_in_order() {
    let mut set = FragmentSet::new();
    assert!(set.add(frag(0, 100)));
    assert!(set.add(frag(100, 200)));
    assert!(set.add(frag(250, 300)));

    assert_eq!(spans(&set), vec![(0, 100), (100, 200), (250, 300)]);
    assert_eq!(set.begin_offset(), 0);
    assert_eq!(set.end_offset(), 300);
}

#[test]
fn add_rejects_covered_and_empty_fragments() {
    let mut set = FragmentSet::new();
    set.add(frag(100, 200));

    assert!(!set.add(frag(100, 200)));
    assert!(!set.add(frag(120, 180)));
    assert!(!set.add(frag(100, 150)));
    assert!(!set.add(frag(300, 300)));
    assert_eq!(spans(&set), vec![(100, 200)]);
}

#[test]
fn add_replaces_covered_fragments() {
    let mut set = FragmentSet::new();
    set.add(frag(0, 100));
    set.add(frag(100, 200));
    set.add(frag(200, 300));
    set.add(frag(300, 400));

    assert!(set.add(frag(50, 350)));
    assert_eq!(spans(&set), vec![(0, 100), (50, 350), (300, 400)]);

    assert!(set.add(frag(0, 400)));
    assert_eq!(spans(&set), vec![(0, 400)]);
}

#[test]
fn add_inserts_into_gap() {
    let mut set = FragmentSet::new();
    set.add(frag(0, 100));
    set.add(frag(200, 300));

    assert!(set.add(frag(100, 200)));
    assert_eq!(spans(&set), vec![(0, 100), (100, 200), (200, 300)]);
}

#[test]
fn add_replaces_last_when_extending_from_earlier_begin() {
    let mut set = FragmentSet::new();
    set.add(frag(0, 100));
    set.add(frag(100, 200));

    assert!(set.add(frag(90, 250)));
    assert_eq!(spans(&set), vec![(0, 100), (90, 250)]);
}

#[parameterized(
    before_all = { 5, 0 },
    first_begin = { 10, 0 },
    inside_first = { 15, 0 },
    overlap_prefers_longer = { 25, 1 },
    inside_second = { 35, 1 },
    in_gap = { 45, 2 },
    last_begin = { 50, 2 },
    at_end = { 60, 3 },
    past_end = { 99, 3 },
)]
fn longest_overlapping_fragment_index(offset: u64, expected: usize) {
    let mut set = FragmentSet::new();
    set.add(frag(10, 30));
    set.add(frag(20, 40));
    set.add(frag(50, 60));

    assert_eq!(set.longest_overlapping_fragment(offset), expected);
}

#[test]
fn covering_returns_longest_fragment() {
    let mut set = FragmentSet::new();
    set.add(frag(10, 30));
    set.add(frag(20, 40));

    assert_eq!(set.covering(25), Some(&frag(20, 40)));
    assert_eq!(set.covering(12), Some(&frag(10, 30)));
    assert!(set.covering(40).is_none());
    assert!(set.covering(5).is_none());
}

#[test]
fn fragment_contains_is_half_open() {
    let f = frag(10, 20);
    assert!(f.contains(10));
    assert!(f.contains(19));
    assert!(!f.contains(20));
    assert_eq!(f.len(), 10);
}

fn arb_fragment() -> impl Strategy<Value = Fragment> {
    (0u64..200, 1u64..50).prop_map(|(begin, len)| frag(begin, begin + len))
}

proptest! {
    #[test]
    fn set_stays_strictly_ordered(fragments in proptest::collection::vec(arb_fragment(), 0..30)) {
        let mut set = FragmentSet::new();
        for f in fragments {
            set.add(f);
        }
        for pair in set.as_slice().windows(2) {
            prop_assert!(pair[0].begin < pair[1].begin, "begins not increasing: {:?}", pair);
            prop_assert!(pair[0].end < pair[1].end, "ends not increasing: {:?}", pair);
        }
    }

    #[test]
    fn every_added_range_remains_covered(fragments in proptest::collection::vec(arb_fragment(), 1..30)) {
        let mut set = FragmentSet::new();
        for f in &fragments {
            set.add(f.clone());
        }
        for f in &fragments {
            for offset in f.begin..f.end {
                prop_assert!(set.covering(offset).is_some(), "offset {} lost", offset);
            }
        }
    }
}
