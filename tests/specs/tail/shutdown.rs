//! Specs for Tail shutdown

use crate::prelude::*;
use gz_journal::{ReadError, ReadOp, Tail};
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test]
async fn closing_updates_fails_blocked_read() {
    let (updates, rx) = mpsc::unbounded_channel();
    let tail = Tail::start(journal(), rx);
    updates.send(fragment(0, 40)).unwrap();

    let (op, mut result) = ReadOp::new(journal(), 64, true);
    tail.read(op).await.unwrap();
    let waited = tokio::time::timeout(Duration::from_millis(20), &mut result).await;
    assert!(waited.is_err());

    drop(updates);

    let resolved = tokio::time::timeout(Duration::from_secs(5), result)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        resolved,
        Err(ReadError::NotYetAvailable {
            offset: 64,
            write_head: 40
        })
    );

    tokio::time::timeout(Duration::from_secs(5), tail.stop())
        .await
        .unwrap();
}

#[tokio::test]
async fn stop_returns_once_both_inputs_close() {
    let (updates, rx) = mpsc::unbounded_channel();
    let tail = Tail::start(journal(), rx);
    updates.send(fragment(0, 40)).unwrap();
    assert_eq!(tail.end_offset().await, 40);

    drop(updates);
    tail.stop().await;
}
