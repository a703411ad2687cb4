//! Message definitions
//!
//! The tagged-union message type shared by both ends of a connection.

/// Wire tags, one per message kind
///
/// The numeric values are part of the wire format and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Tag {
    Read = 1,
    File = 2,
    List = 3,
    Entry = 4,
    End = 5,
    Cd = 6,
    Pwd = 7,
    Path = 8,
    Ok = 9,
    GetInfo = 10,
    Info = 11,
    Ping = 12,
    PingReply = 13,
    Quit = 14,
    QuitReply = 15,
    Write = 16,
    Delete = 17,
    Corrupt = 18,
    Error = 19,
}

/// A decoded protocol message
///
/// Each variant holds the fixed-width header fields for its tag. Variable
/// payloads (path bytes, file content, entry names) are not part of the
/// message value; they follow on the stream and are transferred by the
/// session and client layers using the lengths carried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// Request to download a file; `length` path bytes follow
    Read { length: u16 },

    /// File content announcement; `size` content bytes follow
    File { size: u64 },

    /// Request to list a directory; `length` path bytes follow
    List { length: u16 },

    /// One directory entry; `length` name bytes follow
    Entry { length: u8, is_dir: bool },

    /// Terminates an Entry stream
    End,

    /// Change the virtual working directory; `length` path bytes follow
    Cd { length: u16 },

    /// Request the virtual working directory
    Pwd,

    /// Reply carrying a path; `length` path bytes follow
    Path { length: u16 },

    /// Generic success reply
    Ok,

    /// Request the server limits
    GetInfo,

    /// Server limits reply
    Info { max_name: u64, max_path: u64 },

    /// Liveness probe
    Ping,

    /// Reply to Ping
    PingReply,

    /// Request session termination
    Quit,

    /// Reply to Quit; the session ends after this frame
    QuitReply,

    /// Request to upload a file; `length` path bytes follow
    Write { length: u16 },

    /// Request to delete a file; `length` path bytes follow
    Delete { length: u16 },

    /// Decoder-local marker for an unrecognized wire tag; never transmitted
    Corrupt { tag: u16 },

    /// Protocol-level failure reply
    Error { code: u16, arg1: u32, arg2: u32 },
}

impl Message {
    /// The wire tag for this message
    pub fn tag(&self) -> Tag {
        match self {
            Message::Read { .. } => Tag::Read,
            Message::File { .. } => Tag::File,
            Message::List { .. } => Tag::List,
            Message::Entry { .. } => Tag::Entry,
            Message::End => Tag::End,
            Message::Cd { .. } => Tag::Cd,
            Message::Pwd => Tag::Pwd,
            Message::Path { .. } => Tag::Path,
            Message::Ok => Tag::Ok,
            Message::GetInfo => Tag::GetInfo,
            Message::Info { .. } => Tag::Info,
            Message::Ping => Tag::Ping,
            Message::PingReply => Tag::PingReply,
            Message::Quit => Tag::Quit,
            Message::QuitReply => Tag::QuitReply,
            Message::Write { .. } => Tag::Write,
            Message::Delete { .. } => Tag::Delete,
            Message::Corrupt { .. } => Tag::Corrupt,
            Message::Error { .. } => Tag::Error,
        }
    }
}
