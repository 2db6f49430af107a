//! Specs for how observed mutations are framed into appends

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn rename_onto_occupied_target_is_one_append_of_three_ops() {
    let (recorder, writer) = fake_recorder();
    let src = recorder.new_writable_file("/src").unwrap().fnode();
    let target = recorder.new_writable_file("/target").unwrap().fnode();
    let appends = writer.calls().len();

    recorder.rename_file("/src", "/target").unwrap();

    let calls = writer.calls();
    assert_eq!(calls.len(), appends + 1);
    assert_eq!(
        ops_of(&calls[appends].bytes),
        vec![
            OpKind::unlink(target, "/target"),
            OpKind::link(src, "/target"),
            OpKind::unlink(src, "/src"),
        ]
    );
    recorder.with_fsm(|fsm| {
        assert_eq!(fsm.link("/target"), Some(src));
        assert_eq!(fsm.link("/src"), None);
    });
}

#[test]
fn rename_onto_property_path_records_content_not_link() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().to_str().unwrap().to_string();
    let writer = FakeWriter::new();
    let recorder = Recorder::new(
        Fsm::new(journal()),
        Author(7),
        RecorderConfig::new(journal()).with_strip_prefix(root.clone()),
        writer.clone(),
    )
    .unwrap();

    // The engine writes the file under a temporary name, then renames it.
    let tmp = format!("{root}/000001.dbtmp");
    let mut file = recorder.new_writable_file(&tmp).unwrap();
    file.append(b"8d3c1c2e-identity\n").unwrap();
    std::fs::write(&tmp, "8d3c1c2e-identity\n").unwrap();
    std::fs::rename(&tmp, format!("{root}/IDENTITY")).unwrap();
    recorder
        .rename_file(&tmp, &format!("{root}/IDENTITY"))
        .unwrap();

    let ops = ops_of(&writer.calls().last().unwrap().bytes);
    assert_eq!(
        ops,
        vec![
            OpKind::property("/IDENTITY", "8d3c1c2e-identity\n"),
            OpKind::unlink(file.fnode(), "/000001.dbtmp"),
        ]
    );
    recorder.with_fsm(|fsm| {
        assert_eq!(fsm.link("/IDENTITY"), None);
        assert_eq!(
            fsm.properties().get("/IDENTITY").cloned(),
            Some("8d3c1c2e-identity\n".to_string())
        );
    });
}

#[test]
fn append_frames_write_op_with_its_data() {
    let (recorder, writer) = fake_recorder();
    let mut file = recorder.new_writable_file("/data").unwrap();

    file.append(b"0123456789").unwrap();
    file.append(b"abc").unwrap();

    let calls = writer.calls();
    let first = &calls[calls.len() - 2];
    let second = &calls[calls.len() - 1];
    assert!(first.bytes.ends_with(b"0123456789"));
    assert_eq!(ops_of(&first.bytes), vec![OpKind::write(file.fnode(), 0, 10)]);
    assert_eq!(ops_of(&second.bytes), vec![OpKind::write(file.fnode(), 10, 3)]);
}
