//! Specs for Tail read offset resolution

use crate::prelude::*;
use gz_journal::{ReadError, ReadOp, Tail, OFFSET_EARLIEST, OFFSET_TAIL};
use std::time::Duration;
use tokio::sync::mpsc;

fn start() -> (Tail, mpsc::UnboundedSender<Fragment>) {
    let (updates, rx) = mpsc::unbounded_channel();
    (Tail::start(journal(), rx), updates)
}

#[tokio::test]
async fn offset_zero_resolves_to_begin_offset() {
    let (tail, updates) = start();
    updates.send(fragment(100, 300)).unwrap();
    updates.send(fragment(300, 500)).unwrap();

    let response = tail.read_at(OFFSET_EARLIEST, false).await.unwrap();
    assert_eq!(response.offset, 100);
    assert_eq!(response.fragment, fragment(100, 300));
}

#[tokio::test]
async fn offset_minus_one_resolves_to_end_offset() {
    let (tail, updates) = start();
    updates.send(fragment(100, 500)).unwrap();

    let (op, mut result) = ReadOp::new(journal(), OFFSET_TAIL, true);
    tail.read(op).await.unwrap();

    // The read must resolve to 500 before the next fragment arrives.
    let waited = tokio::time::timeout(Duration::from_millis(20), &mut result).await;
    assert!(waited.is_err(), "tail read resolved before data was appended");
    assert_eq!(tail.end_offset().await, 500);

    updates.send(fragment(500, 600)).unwrap();

    let response = tokio::time::timeout(Duration::from_secs(5), result)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(response.offset, 500);
    assert_eq!(response.fragment, fragment(500, 600));
}

#[tokio::test]
async fn non_blocking_read_of_empty_set_is_not_yet_available() {
    let (tail, _updates) = start();

    assert_eq!(
        tail.read_at(10, false).await,
        Err(ReadError::NotYetAvailable {
            offset: 10,
            write_head: 0
        })
    );
}

#[tokio::test]
async fn blocking_read_resolves_when_covered() {
    let (tail, updates) = start();
    let (op, mut result) = ReadOp::new(journal(), 10, true);
    tail.read(op).await.unwrap();

    let waited = tokio::time::timeout(Duration::from_millis(20), &mut result).await;
    assert!(waited.is_err(), "read resolved before its offset was covered");

    // Does not cover offset 10.
    updates.send(fragment(0, 10)).unwrap();
    let waited = tokio::time::timeout(Duration::from_millis(20), &mut result).await;
    assert!(waited.is_err());

    updates.send(fragment(10, 20)).unwrap();
    let response = result.await.unwrap().unwrap();
    assert_eq!(response.offset, 10);
    assert_eq!(response.write_head, 20);
    assert_eq!(response.fragment, fragment(10, 20));
}
