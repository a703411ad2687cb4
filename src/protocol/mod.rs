//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Wire Format
//!
//! Every message is a tag followed by a fixed-width header:
//!
//! ```text
//! ┌────────────┬──────────────────────┬─────────────────────────┐
//! │ Tag (2 LE) │ Header (per-tag len) │ Payload (optional)      │
//! └────────────┴──────────────────────┴─────────────────────────┘
//! ```
//!
//! All integer fields are little-endian regardless of host. Booleans are one
//! byte (0/1). There is no frame separator and no checksum; variable payloads
//! follow the header directly on the stream, their length dictated by a
//! header field.
//!
//! ### Tag Registry
//!
//! | Tag | Message   | Header                       | Payload            |
//! |-----|-----------|------------------------------|--------------------|
//! | 1   | Read      | length: u16                  | path bytes         |
//! | 2   | File      | size: u64                    | content bytes      |
//! | 3   | List      | length: u16                  | path bytes         |
//! | 4   | Entry     | length: u8, is_dir: u8       | name bytes         |
//! | 5   | End       | —                            | —                  |
//! | 6   | Cd        | length: u16                  | path bytes         |
//! | 7   | Pwd       | —                            | —                  |
//! | 8   | Path      | length: u16                  | path bytes         |
//! | 9   | Ok        | —                            | —                  |
//! | 10  | GetInfo   | —                            | —                  |
//! | 11  | Info      | max_name: u64, max_path: u64 | —                  |
//! | 12  | Ping      | —                            | —                  |
//! | 13  | PingReply | —                            | —                  |
//! | 14  | Quit      | —                            | —                  |
//! | 15  | QuitReply | —                            | —                  |
//! | 16  | Write     | length: u16                  | path bytes         |
//! | 17  | Delete    | length: u16                  | path bytes         |
//! | 18  | Corrupt   | tag: u16                     | — (never sent)     |
//! | 19  | Error     | code: u16, arg1/arg2: u32    | —                  |
//!
//! `Corrupt` is produced locally by the decoder when it meets a tag outside
//! the registry; it never appears on the wire.

mod codec;
mod errors;
mod message;

pub use codec::{copy_exact, read_message, write_message, CHUNK_SIZE};
pub use errors::ErrorKind;
pub use message::{Message, Tag};
