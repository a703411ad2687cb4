//! Protocol error taxonomy
//!
//! A closed set of failure kinds with stable numeric codes carried in the
//! `code` field of an Error frame. Everything outside this set is either a
//! transport fault (fatal for the session) or an internal bug.

/// Protocol-level failure kinds
///
/// The numeric codes are part of the wire format. `Unrecognized` is a
/// decoder-local sentinel for an Error frame carrying an unknown code; it is
/// never sent by a conforming server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[repr(u16)]
pub enum ErrorKind {
    /// Request tag is unexpected in the current session state; arg1 carries
    /// the received tag
    #[error("unexpected message")]
    UnexpectedMessage = 1,

    /// The decoder met a tag outside the registry; arg1 carries the tag
    #[error("corrupt message tag")]
    CorruptMessageTag = 2,

    /// Name length exceeds the server limit; arg1 carries the requested
    /// length
    #[error("invalid file name")]
    InvalidFileName = 3,

    /// Payload bytes were shorter than the declared length
    #[error("unexpected end of connection")]
    UnexpectedEndOfConnection = 4,

    /// Target path does not exist
    #[error("non existing")]
    NonExisting = 5,

    /// Target exists but is not a regular file
    #[error("is not a file")]
    IsNotFile = 6,

    /// Target exists but is not a directory
    #[error("is not a directory")]
    IsNotDir = 7,

    /// The OS denied access
    #[error("access denied")]
    AccessDenied = 8,

    /// Any other open/stat failure
    #[error("can't open")]
    CantOpen = 9,

    /// Decoder-local sentinel for an unknown Error code
    #[error("unrecognized error code")]
    Unrecognized = 0xFFFF,
}

impl ErrorKind {
    /// The stable wire code for this kind
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Decode a wire code, mapping anything outside the set to
    /// [`ErrorKind::Unrecognized`]
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => ErrorKind::UnexpectedMessage,
            2 => ErrorKind::CorruptMessageTag,
            3 => ErrorKind::InvalidFileName,
            4 => ErrorKind::UnexpectedEndOfConnection,
            5 => ErrorKind::NonExisting,
            6 => ErrorKind::IsNotFile,
            7 => ErrorKind::IsNotDir,
            8 => ErrorKind::AccessDenied,
            9 => ErrorKind::CantOpen,
            _ => ErrorKind::Unrecognized,
        }
    }
}
