//! End-to-end recording specs
//!
//! Record through a file-backed journal, read the log back through a Tail,
//! and replay it into a fresh state machine.

use crate::prelude::*;
use gz_journal::{read_fragment, FileWriter, FileWriterConfig, Tail};
use similar_asserts::assert_eq;
use std::collections::BTreeMap;

/// Read `[0, end)` of the tail's journal through blocking reads
async fn read_through_tail(tail: &Tail, end: u64) -> Vec<u8> {
    let mut content = Vec::new();
    let mut offset = 0;
    while offset < end {
        let response = tail
            .read_at(i64::try_from(offset).unwrap(), true)
            .await
            .unwrap();
        // A read at offset 0 resolves to the first available byte.
        assert_eq!(response.offset, offset);
        content.extend(read_fragment(&response.fragment, response.offset).unwrap());
        offset = response.fragment.end;
    }
    content
}

#[tokio::test(flavor = "multi_thread")]
async fn create_write_rename_replays_to_renamed_file() {
    let temp = tempfile::tempdir().unwrap();
    let writer = FileWriter::open(FileWriterConfig::new(temp.path().join("journals"))).unwrap();
    let tail = Tail::start(journal(), writer.subscribe(&journal()).unwrap());

    let recording = {
        let writer = writer.clone();
        tokio::task::spawn_blocking(move || {
            let recorder = Recorder::new(
                Fsm::new(journal()),
                Author(1),
                RecorderConfig::new(journal()),
                writer,
            )
            .unwrap();

            let mut file = recorder.new_writable_file("/a").unwrap();
            file.append(&[0x42; 50]).unwrap();
            recorder.rename_file("/a", "/b").unwrap();
            let end = recorder.sync_barrier().unwrap();
            (recorder, file.fnode(), end)
        })
    };
    let (recorder, fnode, end) = recording.await.unwrap();

    let content = read_through_tail(&tail, end).await;
    assert_eq!(content.len() as u64, end);

    let mut fsm = Fsm::new(journal());
    let report = replay(&mut fsm, &content, 0).unwrap();

    assert!(report.skipped.is_empty());
    assert_eq!(
        fsm.links().clone(),
        BTreeMap::from([("/b".to_string(), fnode)])
    );
    assert_eq!(fsm.link("/a"), None);
    assert_eq!(fsm.fnode_size(fnode), Some(50));
    recorder.with_fsm(|recorded| {
        assert_eq!(recorded.build_hints().live_nodes, fsm.build_hints().live_nodes);
    });

    writer.close();
    tail.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn recording_resumes_from_replayed_hints() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("journals");

    // First recorder lifetime.
    let hints = {
        let writer = FileWriter::open(FileWriterConfig::new(&dir)).unwrap();
        let hints = tokio::task::spawn_blocking({
            let writer = writer.clone();
            move || {
                let recorder = Recorder::new(
                    Fsm::new(journal()),
                    Author(1),
                    RecorderConfig::new(journal()),
                    writer,
                )
                .unwrap();
                let mut old = recorder.new_writable_file("/old.log").unwrap();
                old.append(b"obsolete").unwrap();
                let mut sst = recorder.new_writable_file("/000002.sst").unwrap();
                sst.append(b"table").unwrap();
                recorder.delete_file("/old.log").unwrap();
                recorder.sync_barrier().unwrap();
                recorder.build_hints().unwrap()
            }
        })
        .await
        .unwrap();
        writer.close();
        hints
    };

    // Second lifetime: replay from hints, then continue recording.
    let writer = FileWriter::open(FileWriterConfig::new(&dir)).unwrap();
    let log = std::fs::read(writer.journal_path(&journal())).unwrap();
    let start = hints.log_mark.offset;
    let mut fsm = Fsm::from_hints(&hints);
    replay(&mut fsm, &log[start as usize..], start).unwrap();
    assert_eq!(
        fsm.links().keys().cloned().collect::<Vec<_>>(),
        vec!["/000002.sst".to_string()]
    );

    let next_seq_no = fsm.next_seq_no();
    let recorder = tokio::task::spawn_blocking({
        let writer = writer.clone();
        move || {
            let recorder =
                Recorder::new(fsm, Author(2), RecorderConfig::new(journal()), writer).unwrap();
            recorder.new_writable_file("/000003.sst").unwrap();
            recorder.sync_barrier().unwrap();
            recorder
        }
    })
    .await
    .unwrap();

    // A full replay sees one continuous lineage across both authors.
    let log = std::fs::read(writer.journal_path(&journal())).unwrap();
    let mut full = Fsm::new(journal());
    let report = replay(&mut full, &log, 0).unwrap();
    assert!(report.skipped.is_empty());
    assert_eq!(full.link("/000003.sst"), Some(Fnode(next_seq_no)));
    recorder.with_fsm(|recorded| assert_eq!(recorded.links(), full.links()));

    writer.close();
}
