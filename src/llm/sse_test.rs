use super::*;

#[test]
fn single_data_line() {
    let mut decoder = SseDecoder::new();
    let out = decoder.push(b"data: {\"x\":1}\n");
    assert_eq!(out, vec!["{\"x\":1}"]);
}

#[test]
fn data_line_without_space_after_colon() {
    let mut decoder = SseDecoder::new();
    let out = decoder.push(b"data:{\"x\":1}\n");
    assert_eq!(out, vec!["{\"x\":1}"]);
}

#[test]
fn line_split_across_chunks() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.push(b"data: hel").is_empty());
    let out = decoder.push(b"lo\n");
    assert_eq!(out, vec!["hello"]);
}

#[test]
fn multibyte_char_split_across_chunks() {
    let mut decoder = SseDecoder::new();
    let bytes = "data: héllo\n".as_bytes();
    // Split in the middle of the two-byte 'é'.
    let split = bytes.iter().position(|&b| b == 0xc3).unwrap() + 1;
    assert!(decoder.push(&bytes[..split]).is_empty());
    let out = decoder.push(&bytes[split..]);
    assert_eq!(out, vec!["héllo"]);
}

#[test]
fn multiple_lines_in_one_chunk() {
    let mut decoder = SseDecoder::new();
    let out = decoder.push(b"event: message\ndata: one\n\ndata: two\n");
    assert_eq!(out, vec!["one", "two"]);
}

#[test]
fn comments_and_event_lines_are_skipped() {
    let mut decoder = SseDecoder::new();
    let out = decoder.push(b": keep-alive\nevent: ping\n\n");
    assert!(out.is_empty());
}

#[test]
fn done_marker_passes_through() {
    let mut decoder = SseDecoder::new();
    let out = decoder.push(b"data: [DONE]\n");
    assert_eq!(out, vec!["[DONE]"]);
}

#[test]
fn crlf_line_endings() {
    let mut decoder = SseDecoder::new();
    let out = decoder.push(b"data: one\r\ndata: two\r\n");
    assert_eq!(out, vec!["one", "two"]);
}

#[test]
fn finish_flushes_trailing_line() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.push(b"data: tail").is_empty());
    assert_eq!(decoder.finish(), Some("tail".to_string()));
    assert_eq!(decoder.finish(), None);
}

#[test]
fn finish_on_empty_buffer_is_none() {
    let mut decoder = SseDecoder::new();
    assert_eq!(decoder.finish(), None);
}

#[test]
fn non_data_field_lines_are_ignored() {
    let mut decoder = SseDecoder::new();
    let out = decoder.push(b"id: 42\nretry: 1000\ndata: payload\n");
    assert_eq!(out, vec!["payload"]);
}
