//! Shared helpers for behavioral specs

pub use gz_core::{FakeWriter, Fragment, JournalName};
pub use gz_recoverylog::{
    replay, Author, EnvObserver, Fnode, Fsm, OpKind, RecordedOp, Recorder, RecorderConfig,
    WritableFileObserver,
};

use gz_core::framing::{self, FrameReader};

pub const JOURNAL: &str = "recovery/specs";

pub fn journal() -> JournalName {
    JournalName::new(JOURNAL)
}

/// A recorder writing to a fake journal writer
pub fn fake_recorder() -> (Recorder<FakeWriter>, FakeWriter) {
    let writer = FakeWriter::new();
    let recorder = Recorder::new(
        Fsm::new(journal()),
        Author(0x5eed),
        RecorderConfig::new(journal()),
        writer.clone(),
    )
    .unwrap();
    (recorder, writer)
}

/// Ops framed within one append, skipping write data
pub fn ops_of(bytes: &[u8]) -> Vec<OpKind> {
    let mut reader = FrameReader::new(bytes, 0);
    let mut ops = Vec::new();
    while let Some(frame) = reader.next() {
        let op: RecordedOp = framing::decode(frame.unwrap().payload).unwrap();
        if let OpKind::Write { length, .. } = op.op {
            reader.skip_bytes(length).unwrap();
        }
        ops.push(op.op);
    }
    ops
}

/// Fragment of the shared test journal
pub fn fragment(begin: u64, end: u64) -> Fragment {
    Fragment::new(journal(), begin, end)
}
