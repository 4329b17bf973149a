use crate::buffer::CodeBuffer;

#[test]
fn append_keeps_order() {
    let mut buffer = CodeBuffer::new();
    let a = buffer.append(&[0x01]);
    let b = buffer.append(&[0x25, 7]);

    assert_eq!(buffer.len(), 2);
    assert_eq!(buffer.iter().collect::<Vec<_>>(), [a, b]);
    assert_eq!(buffer.get_bytes(b), [0x25, 7]);
    assert_eq!(buffer.get_opcode(b), Some(0x25));
    assert_eq!(buffer.byte(b, 1), Some(7));
    assert_eq!(buffer.byte(b, 2), None);
}

#[test]
fn references_survive_insertions() {
    let mut buffer = CodeBuffer::new();
    let a = buffer.append(&[0x01]);
    let c = buffer.append(&[0x03]);
    let b = buffer.insert_before(c, &[0x02]);
    let first = buffer.insert_before(a, &[0x00]);
    let last = buffer.insert_after(c, &[0x04]);

    let bytes: Vec<u8> = buffer.iter().map(|r| buffer.get_bytes(r)[0]).collect();
    assert_eq!(bytes, [0x00, 0x01, 0x02, 0x03, 0x04]);
    assert_eq!(buffer.position(first), 0);
    assert_eq!(buffer.position(a), 1);
    assert_eq!(buffer.position(b), 2);
    assert_eq!(buffer.position(c), 3);
    assert_eq!(buffer.position(last), 4);
    assert_eq!(buffer.get(3), Some(c));
    assert_eq!(buffer.get(5), None);
}

#[test]
fn shrinking_update_is_in_place() {
    let mut buffer = CodeBuffer::new();
    let a = buffer.append(&[0x43, 0x10, 0x00]);
    buffer.update(a, &[0x3D, 0x10]);

    assert_eq!(buffer.get_bytes(a), [0x3D, 0x10]);
    assert_eq!(buffer.byte_len(a), 2);
    assert_eq!(buffer.dead_bytes(), 1);
}

#[test]
fn growing_update_repoints() {
    let mut buffer = CodeBuffer::new();
    let enter = buffer.append(&[0x2D, 0, 0, 0, 0]);
    let next = buffer.append(&[0x2E, 0, 0]);
    buffer.update(enter, &[0x2D, 0, 4, 0, 3, b'f', b'n', 0]);

    assert_eq!(buffer.get_bytes(enter), [0x2D, 0, 4, 0, 3, b'f', b'n', 0]);
    assert_eq!(buffer.get_bytes(next), [0x2E, 0, 0]);
    assert_eq!(buffer.position(enter), 0);
    assert_eq!(buffer.dead_bytes(), 5);
    assert_eq!(buffer.code_len(), 11);
}

#[test]
fn remove_keeps_slot() {
    let mut buffer = CodeBuffer::new();
    let a = buffer.append(&[0x01]);
    let b = buffer.append(&[0x02]);
    buffer.remove(a);

    assert_eq!(buffer.len(), 2);
    assert!(buffer.is_removed(a));
    assert_eq!(buffer.byte_len(a), 0);
    assert_eq!(buffer.get_opcode(a), None);
    assert_eq!(buffer.position(b), 1);

    let c = buffer.insert_after(a, &[0x03]);
    assert_eq!(buffer.position(c), 1);
    assert_eq!(buffer.position(b), 2);
}

#[test]
fn markers_are_zero_length() {
    let mut buffer = CodeBuffer::new();
    let marker = buffer.append_marker();
    let code = buffer.append(&[0x00]);

    assert!(buffer.is_marker(marker));
    assert!(!buffer.is_marker(code));
    assert!(!buffer.is_removed(marker));
    assert!(buffer.get_bytes(marker).is_empty());
    assert_eq!(buffer.code_len(), 1);
}

#[test]
fn updating_removed_slot_revives_it() {
    let mut buffer = CodeBuffer::new();
    let a = buffer.append(&[0x01]);
    buffer.remove(a);
    buffer.update(a, &[0x02]);

    assert!(!buffer.is_removed(a));
    assert_eq!(buffer.get_bytes(a), [0x02]);
}
