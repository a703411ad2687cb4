//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! Headers are serialized field by field with explicit little-endian byte
//! order; host struct layout and padding never reach the wire. Decoding an
//! unknown tag consumes exactly the 2 tag bytes and yields a local
//! [`Message::Corrupt`] value so the caller can report it without losing
//! stream framing.

use std::io::{self, Read, Write};

use super::Message;

/// Chunk size for streaming file payloads
pub const CHUNK_SIZE: usize = 8 * 1024;

// =============================================================================
// Encoding
// =============================================================================

/// Encode one message onto a stream
///
/// Writes the tag followed by the packed header. Any variable payload is the
/// caller's to write directly on the same stream afterwards.
///
/// [`Message::Corrupt`] is decoder-local and refuses to encode.
pub fn write_message<W: Write>(writer: &mut W, message: &Message) -> io::Result<()> {
    if let Message::Corrupt { .. } = message {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "Corrupt is not a wire message",
        ));
    }

    let mut frame = [0u8; 18];
    let tag = message.tag() as u16;
    frame[..2].copy_from_slice(&tag.to_le_bytes());

    let header_len = match *message {
        Message::Read { length }
        | Message::List { length }
        | Message::Cd { length }
        | Message::Path { length }
        | Message::Write { length }
        | Message::Delete { length } => {
            frame[2..4].copy_from_slice(&length.to_le_bytes());
            2
        }
        Message::File { size } => {
            frame[2..10].copy_from_slice(&size.to_le_bytes());
            8
        }
        Message::Entry { length, is_dir } => {
            frame[2] = length;
            frame[3] = u8::from(is_dir);
            2
        }
        Message::Info { max_name, max_path } => {
            frame[2..10].copy_from_slice(&max_name.to_le_bytes());
            frame[10..18].copy_from_slice(&max_path.to_le_bytes());
            16
        }
        Message::Error { code, arg1, arg2 } => {
            frame[2..4].copy_from_slice(&code.to_le_bytes());
            frame[4..8].copy_from_slice(&arg1.to_le_bytes());
            frame[8..12].copy_from_slice(&arg2.to_le_bytes());
            10
        }
        Message::End
        | Message::Pwd
        | Message::Ok
        | Message::GetInfo
        | Message::Ping
        | Message::PingReply
        | Message::Quit
        | Message::QuitReply => 0,
        Message::Corrupt { .. } => unreachable!(),
    };

    writer.write_all(&frame[..2 + header_len])
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode one message from a stream
///
/// Returns `Ok(None)` on a clean end of stream (no bytes before the tag).
/// A stream that ends inside a tag or header is an `UnexpectedEof` error;
/// no partial message is ever returned.
///
/// A tag outside the registry yields `Message::Corrupt { tag }` without
/// consuming any bytes beyond the tag itself.
pub fn read_message<R: Read>(reader: &mut R) -> io::Result<Option<Message>> {
    let mut tag_bytes = [0u8; 2];
    if !read_or_eof(reader, &mut tag_bytes)? {
        return Ok(None);
    }
    let tag = u16::from_le_bytes(tag_bytes);

    let message = match tag {
        1 => Message::Read {
            length: read_u16(reader)?,
        },
        2 => Message::File {
            size: read_u64(reader)?,
        },
        3 => Message::List {
            length: read_u16(reader)?,
        },
        4 => {
            let mut header = [0u8; 2];
            reader.read_exact(&mut header)?;
            Message::Entry {
                length: header[0],
                is_dir: header[1] != 0,
            }
        }
        5 => Message::End,
        6 => Message::Cd {
            length: read_u16(reader)?,
        },
        7 => Message::Pwd,
        8 => Message::Path {
            length: read_u16(reader)?,
        },
        9 => Message::Ok,
        10 => Message::GetInfo,
        11 => Message::Info {
            max_name: read_u64(reader)?,
            max_path: read_u64(reader)?,
        },
        12 => Message::Ping,
        13 => Message::PingReply,
        14 => Message::Quit,
        15 => Message::QuitReply,
        16 => Message::Write {
            length: read_u16(reader)?,
        },
        17 => Message::Delete {
            length: read_u16(reader)?,
        },
        // Tag 18 (Corrupt) is not a wire message; seeing it on the wire is
        // itself an out-of-spec byte sequence.
        19 => Message::Error {
            code: read_u16(reader)?,
            arg1: read_u32(reader)?,
            arg2: read_u32(reader)?,
        },
        unknown => Message::Corrupt { tag: unknown },
    };

    Ok(Some(message))
}

// =============================================================================
// Stream helpers
// =============================================================================

/// Copy exactly `size` bytes from `reader` to `writer` in fixed-size chunks
///
/// An early end of input surfaces as `UnexpectedEof` with the copy left
/// partially applied.
pub fn copy_exact<R: Read, W: Write>(reader: &mut R, writer: &mut W, size: u64) -> io::Result<()> {
    let mut buf = [0u8; CHUNK_SIZE];
    let mut remaining = size;

    while remaining > 0 {
        let want = remaining.min(CHUNK_SIZE as u64) as usize;
        let got = reader.read(&mut buf[..want])?;
        if got == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended before declared length",
            ));
        }
        writer.write_all(&buf[..got])?;
        remaining -= got as u64;
    }

    Ok(())
}

/// Fill `buf` from the reader, distinguishing a clean EOF before the first
/// byte (`Ok(false)`) from a truncated read (`UnexpectedEof` error)
fn read_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside a frame",
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

fn read_u16<R: Read>(reader: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
