use crate::LogBuffer;

use googletest::assert_that;
use googletest::prelude::eq;

#[test]
fn given_appends_past_cap_when_appending_then_keeps_suffix_within_cap() {
    // Given
    let mut buffer = LogBuffer::new(10);

    // When
    buffer.append_line("first");
    buffer.append_line("second");

    // Then
    assert_that!(buffer.len_chars(), eq(10));
    assert_that!(buffer.as_str(), eq("st\nsecond\n"));
}

#[test]
fn given_many_appends_when_appending_then_never_exceeds_cap() {
    // Given
    let mut buffer = LogBuffer::new(64);

    // When / Then
    for i in 0..500 {
        buffer.append_line(&format!("line {i}"));
        assert!(buffer.as_str().chars().count() <= 64);
        assert_that!(buffer.len_chars(), eq(buffer.as_str().chars().count()));
    }
    assert!(buffer.as_str().ends_with("line 499\n"));
}

#[test]
fn given_multibyte_text_when_trimming_then_cuts_on_char_boundary() {
    // Given
    let mut buffer = LogBuffer::new(4);

    // When
    buffer.append_line("héllo");

    // Then
    assert_that!(buffer.as_str(), eq("llo\n"));
}

#[test]
fn given_text_longer_than_cap_when_replacing_then_keeps_tail() {
    // Given
    let mut buffer = LogBuffer::new(5);
    buffer.append_line("ab");

    // When
    buffer.replace("0123456789");

    // Then
    assert_that!(buffer.as_str(), eq("56789"));
    assert_that!(buffer.len_chars(), eq(5));
}

#[test]
fn given_content_when_cleared_then_empty() {
    // Given
    let mut buffer = LogBuffer::new(100);
    buffer.append_line("something");

    // When
    buffer.clear();

    // Then
    assert!(buffer.is_empty());
    assert_that!(buffer.len_chars(), eq(0));
    assert_that!(buffer.cap(), eq(100));
}
