use super::*;

#[test]
fn accepts_data_under_capacity() {
    let mut buf = CappedBuffer::new(16);
    buf.write(b"hello");
    assert_eq!(buf.len(), 5);
    assert!(!buf.truncated());
    assert_eq!(buf.into_string(), "hello");
}

#[test]
fn truncates_at_capacity_and_sets_flag() {
    let mut buf = CappedBuffer::new(5);
    buf.write(b"hello world");
    assert_eq!(buf.len(), 5);
    assert!(buf.truncated());
    assert_eq!(buf.into_string(), "hello");
}

#[test]
fn further_writes_after_full_stay_truncated_without_growing() {
    let mut buf = CappedBuffer::new(4);
    buf.write(b"abcd");
    assert!(!buf.truncated());
    buf.write(b"e");
    assert!(buf.truncated());
    assert_eq!(buf.len(), 4);
}
