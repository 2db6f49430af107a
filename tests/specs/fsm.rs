//! Specs for state machine ordering

use crate::prelude::*;
use gz_core::framing;
use gz_recoverylog::FsmError;

/// Frame `kind` as the next op `fsm` expects, returning the op and its payload
fn next_op(fsm: &Fsm, kind: OpKind) -> (RecordedOp, Vec<u8>) {
    let op = RecordedOp {
        seq_no: fsm.next_seq_no(),
        checksum: fsm.next_checksum(),
        author: Author(3),
        op: kind,
    };
    let mut buf = Vec::new();
    let payload = framing::encode(&op, &mut buf).unwrap();
    (op, buf[payload].to_vec())
}

#[test]
fn next_seq_no_follows_applied_ops() {
    let mut fsm = Fsm::new(journal());
    let kinds = [
        OpKind::create("/a"),
        OpKind::write(Fnode(1), 0, 10),
        OpKind::link(Fnode(1), "/b"),
        OpKind::unlink(Fnode(1), "/a"),
    ];

    for (n, kind) in kinds.into_iter().enumerate() {
        let (op, payload) = next_op(&fsm, kind);
        assert_eq!(op.seq_no, n as u64 + 1);
        fsm.apply(&op, &payload).unwrap();
        assert_eq!(fsm.next_seq_no(), n as u64 + 2);
    }
}

#[test]
fn mismatched_op_fails_without_mutation() {
    let mut fsm = Fsm::new(journal());
    let (op, payload) = next_op(&fsm, OpKind::create("/a"));
    fsm.apply(&op, &payload).unwrap();
    let links = fsm.links().clone();
    let checksum = fsm.next_checksum();

    let (mut wrong_seq, payload) = next_op(&fsm, OpKind::create("/b"));
    wrong_seq.seq_no += 1;
    assert!(matches!(
        fsm.apply(&wrong_seq, &payload),
        Err(FsmError::WrongSeqNo { .. })
    ));

    let (mut wrong_sum, payload) = next_op(&fsm, OpKind::create("/b"));
    wrong_sum.checksum ^= 1;
    assert!(matches!(
        fsm.apply(&wrong_sum, &payload),
        Err(FsmError::WrongChecksum { .. })
    ));

    assert_eq!(fsm.links(), &links);
    assert_eq!(fsm.next_seq_no(), 2);
    assert_eq!(fsm.next_checksum(), checksum);
}
