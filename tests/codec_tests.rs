//! Codec Tests
//!
//! Tests for message encoding/decoding and the stream helpers.

use std::io::Cursor;

use qooil::protocol::{copy_exact, read_message, write_message, Message};

/// Every registry message with its header width
fn registry() -> Vec<(Message, usize)> {
    vec![
        (Message::Read { length: 5 }, 2),
        (Message::File { size: 9 }, 8),
        (Message::List { length: 1 }, 2),
        (
            Message::Entry {
                length: 5,
                is_dir: true,
            },
            2,
        ),
        (Message::End, 0),
        (Message::Cd { length: 300 }, 2),
        (Message::Pwd, 0),
        (Message::Path { length: 1 }, 2),
        (Message::Ok, 0),
        (Message::GetInfo, 0),
        (
            Message::Info {
                max_name: 255,
                max_path: 4096,
            },
            16,
        ),
        (Message::Ping, 0),
        (Message::PingReply, 0),
        (Message::Quit, 0),
        (Message::QuitReply, 0),
        (Message::Write { length: 5 }, 2),
        (Message::Delete { length: 5 }, 2),
        (
            Message::Error {
                code: 1,
                arg1: 9,
                arg2: 0,
            },
            10,
        ),
    ]
}

// =============================================================================
// Round-Trip Tests
// =============================================================================

#[test]
fn test_round_trip_every_message() {
    for (message, header_len) in registry() {
        let mut encoded = Vec::new();
        write_message(&mut encoded, &message).unwrap();
        assert_eq!(
            encoded.len(),
            2 + header_len,
            "wrong frame width for {message:?}"
        );

        let mut cursor = Cursor::new(&encoded);
        let decoded = read_message(&mut cursor).unwrap().unwrap();
        assert_eq!(decoded, message);
        assert_eq!(cursor.position() as usize, encoded.len());
    }
}

#[test]
fn test_stream_multiple_messages() {
    let messages: Vec<Message> = registry().into_iter().map(|(m, _)| m).collect();

    let mut buffer = Vec::new();
    for message in &messages {
        write_message(&mut buffer, message).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &messages {
        let decoded = read_message(&mut cursor).unwrap().unwrap();
        assert_eq!(decoded, *expected);
    }
    assert_eq!(read_message(&mut cursor).unwrap(), None);
}

// =============================================================================
// Wire Format Verification Tests
// =============================================================================

#[test]
fn test_wire_format_read() {
    let mut encoded = Vec::new();
    write_message(&mut encoded, &Message::Read { length: 5 }).unwrap();

    // Expected: [0x01 0x00][0x05 0x00]
    //           tag(LE)    length(LE)
    assert_eq!(encoded, [0x01, 0x00, 0x05, 0x00]);
}

#[test]
fn test_wire_format_file() {
    let mut encoded = Vec::new();
    write_message(&mut encoded, &Message::File { size: 9 }).unwrap();

    assert_eq!(encoded, [0x02, 0x00, 0x09, 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn test_wire_format_entry() {
    let mut encoded = Vec::new();
    write_message(
        &mut encoded,
        &Message::Entry {
            length: 5,
            is_dir: false,
        },
    )
    .unwrap();
    assert_eq!(encoded, [0x04, 0x00, 0x05, 0x00]);

    let mut encoded = Vec::new();
    write_message(
        &mut encoded,
        &Message::Entry {
            length: 3,
            is_dir: true,
        },
    )
    .unwrap();
    assert_eq!(encoded, [0x04, 0x00, 0x03, 0x01]);
}

#[test]
fn test_wire_format_info() {
    let mut encoded = Vec::new();
    write_message(
        &mut encoded,
        &Message::Info {
            max_name: 255,
            max_path: 4096,
        },
    )
    .unwrap();

    // Tag 11, then two u64 LE words
    assert_eq!(
        encoded,
        [
            0x0B, 0x00, // tag
            0xFF, 0, 0, 0, 0, 0, 0, 0, // max_name = 255
            0x00, 0x10, 0, 0, 0, 0, 0, 0, // max_path = 4096
        ]
    );
}

#[test]
fn test_wire_format_error() {
    let mut encoded = Vec::new();
    write_message(
        &mut encoded,
        &Message::Error {
            code: 2,
            arg1: 0xEEEE,
            arg2: 0,
        },
    )
    .unwrap();

    assert_eq!(
        encoded,
        [
            0x13, 0x00, // tag 19
            0x02, 0x00, // code
            0xEE, 0xEE, 0, 0, // arg1
            0, 0, 0, 0, // arg2
        ]
    );
}

#[test]
fn test_wire_format_bare_messages() {
    for (message, tag) in [
        (Message::End, 5u16),
        (Message::Pwd, 7),
        (Message::Ok, 9),
        (Message::GetInfo, 10),
        (Message::Ping, 12),
        (Message::PingReply, 13),
        (Message::Quit, 14),
        (Message::QuitReply, 15),
    ] {
        let mut encoded = Vec::new();
        write_message(&mut encoded, &message).unwrap();
        assert_eq!(encoded, tag.to_le_bytes());
    }
}

// =============================================================================
// Unknown Tag Handling
// =============================================================================

#[test]
fn test_unknown_tag_yields_corrupt() {
    let mut cursor = Cursor::new(vec![0xEE, 0xEE]);
    let decoded = read_message(&mut cursor).unwrap().unwrap();
    assert_eq!(decoded, Message::Corrupt { tag: 0xEEEE });
    // Exactly the 2 tag bytes are consumed
    assert_eq!(cursor.position(), 2);
}

#[test]
fn test_unknown_tag_preserves_framing() {
    // Corrupt tag followed by a valid Ping: the Ping survives
    let mut cursor = Cursor::new(vec![0xEE, 0xEE, 0x0C, 0x00]);
    assert_eq!(
        read_message(&mut cursor).unwrap().unwrap(),
        Message::Corrupt { tag: 0xEEEE }
    );
    assert_eq!(read_message(&mut cursor).unwrap().unwrap(), Message::Ping);
}

#[test]
fn test_corrupt_refuses_to_encode() {
    let mut buffer = Vec::new();
    let result = write_message(&mut buffer, &Message::Corrupt { tag: 0xEEEE });
    assert!(result.is_err());
    assert!(buffer.is_empty());
}

// =============================================================================
// Short Read Handling
// =============================================================================

#[test]
fn test_clean_eof_is_none() {
    let mut cursor = Cursor::new(Vec::<u8>::new());
    assert_eq!(read_message(&mut cursor).unwrap(), None);
}

#[test]
fn test_eof_inside_tag() {
    let mut cursor = Cursor::new(vec![0x01]);
    let err = read_message(&mut cursor).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
}

#[test]
fn test_eof_inside_header() {
    // Read header wants 2 bytes, only 1 present
    let mut cursor = Cursor::new(vec![0x01, 0x00, 0x05]);
    let err = read_message(&mut cursor).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
}

// =============================================================================
// Stream Helper Tests
// =============================================================================

#[test]
fn test_copy_exact() {
    let data = b"some data".to_vec();
    let mut reader = Cursor::new(data.clone());
    let mut out = Vec::new();
    copy_exact(&mut reader, &mut out, 9).unwrap();
    assert_eq!(out, data);
}

#[test]
fn test_copy_exact_zero_bytes() {
    let mut reader = Cursor::new(b"untouched".to_vec());
    let mut out = Vec::new();
    copy_exact(&mut reader, &mut out, 0).unwrap();
    assert!(out.is_empty());
    assert_eq!(reader.position(), 0);
}

#[test]
fn test_copy_exact_stops_at_size() {
    let mut reader = Cursor::new(b"some data and more".to_vec());
    let mut out = Vec::new();
    copy_exact(&mut reader, &mut out, 9).unwrap();
    assert_eq!(out, b"some data");
}

#[test]
fn test_copy_exact_short_input() {
    let mut reader = Cursor::new(b"tiny".to_vec());
    let mut out = Vec::new();
    let err = copy_exact(&mut reader, &mut out, 9).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    // What did arrive was still written
    assert_eq!(out, b"tiny");
}
