//! Specs for lazy advance of the log mark

use crate::prelude::*;

#[test]
fn log_mark_waits_for_retained_write_to_be_observed() {
    let (recorder, writer) = fake_recorder();
    let mark = || recorder.with_fsm(|fsm| fsm.log_mark().offset);
    let initial = mark();
    writer.hold_completions(true);

    // W1 is retained; W2 is issued before W1 completes, and is dropped.
    recorder.new_writable_file("/w1").unwrap();
    let w1_head = writer.write_head(&journal());
    recorder.new_writable_file("/w2").unwrap();
    assert_eq!(mark(), initial);

    // W1 completes, but nothing has observed it yet.
    assert!(writer.release_next());
    assert_eq!(mark(), initial);

    // The next operation observes W1, and retains W3.
    recorder.new_writable_file("/w3").unwrap();
    assert_eq!(mark(), w1_head);

    // W2 completing is never observed: the mark follows W3 instead.
    writer.hold_completions(false);
    writer.release_all();
    let w3_head = writer.write_head(&journal());
    recorder.new_writable_file("/w4").unwrap();
    assert_eq!(mark(), w3_head);
}

#[test]
fn barrier_completes_after_prior_writes() {
    let (recorder, writer) = fake_recorder();
    writer.hold_completions(true);
    let mut file = recorder.new_writable_file("/a").unwrap();
    file.append(b"payload").unwrap();

    let barrier = recorder.write_barrier().unwrap();
    assert!(!barrier.is_ready());

    writer.hold_completions(false);
    writer.release_all();
    assert_eq!(barrier.wait(), Ok(writer.write_head(&journal())));
}
