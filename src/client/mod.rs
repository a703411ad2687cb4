//! Client Module
//!
//! The client side of the protocol: a [`Client`] owns one TCP stream,
//! issues requests, and consumes the framed responses. It is the exact
//! mirror of the server session.
//!
//! At most one multi-frame response may be outstanding: the Entry stream
//! following a List. While it is open, any other operation first drains the
//! remaining Entry frames up to the terminal End.
//!
//! A server that breaks protocol (a corrupt tag, an unrecognized error
//! code, a reply that does not match the request) makes the connection
//! untrusted; the client drops the stream before reporting the failure.

pub mod repl;

use std::borrow::Cow;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use crate::error::{QooilError, Result};
use crate::protocol::{copy_exact, read_message, write_message, ErrorKind, Message};

/// Server limits, as advertised by an Info reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerInfo {
    /// Longest path field the server accepts in a request
    pub max_name: u64,

    /// Longest virtual path the server will report
    pub max_path: u64,
}

/// One directory entry received from a List stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Name bytes, without any directory component
    pub name: Vec<u8>,

    /// Whether the entry is a directory
    pub is_dir: bool,
}

impl Entry {
    /// The entry name for display
    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }
}

/// A connection to a Qooil server
pub struct Client {
    /// Exclusively owned transport, dropped once the connection is
    /// untrusted or closed
    stream: Option<TcpStream>,

    /// True while an Entry stream from a List is outstanding
    reading_entries: bool,

    /// Cached Info reply
    info: Option<ServerInfo>,

    /// Arguments of the last Error frame received
    last_error_args: (u32, u32),
}

impl Client {
    /// Connect to a server
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream: Some(stream),
            reading_entries: false,
            info: None,
            last_error_args: (0, 0),
        })
    }

    /// Whether the transport is still open
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// `arg1`/`arg2` of the most recent Error frame
    pub fn last_error_args(&self) -> (u32, u32) {
        self.last_error_args
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Liveness probe
    pub fn ping(&mut self) -> Result<()> {
        self.finish_entries()?;
        self.send(&Message::Ping)?;
        match self.recv_checked()? {
            Message::PingReply => Ok(()),
            other => self.unexpected_reply(other),
        }
    }

    /// Fetch the server limits; cached after the first call
    pub fn info(&mut self) -> Result<ServerInfo> {
        if let Some(info) = self.info {
            return Ok(info);
        }
        self.finish_entries()?;
        self.send(&Message::GetInfo)?;
        match self.recv_checked()? {
            Message::Info { max_name, max_path } => {
                let info = ServerInfo { max_name, max_path };
                self.info = Some(info);
                Ok(info)
            }
            other => self.unexpected_reply(other),
        }
    }

    /// Change the server-side virtual working directory
    pub fn set_cwd(&mut self, path: &str) -> Result<()> {
        self.finish_entries()?;
        self.send_with_path(Message::Cd { length: 0 }, path)?;
        self.expect_ok()
    }

    /// Fetch the server-side virtual working directory
    pub fn cwd(&mut self) -> Result<String> {
        self.finish_entries()?;
        self.send(&Message::Pwd)?;
        let length = match self.recv_checked()? {
            Message::Path { length } => length,
            other => return self.unexpected_reply(other),
        };
        let bytes = self.recv_payload(u64::from(length))?;
        String::from_utf8(bytes)
            .map_err(|_| QooilError::Fault("Path payload is not valid UTF-8".to_string()))
    }

    /// Download the file at `path`, streaming its content into `writer`
    ///
    /// Returns the number of bytes transferred.
    pub fn get_file(&mut self, path: &str, writer: &mut impl Write) -> Result<u64> {
        self.finish_entries()?;
        self.send_with_path(Message::Read { length: 0 }, path)?;
        let size = match self.recv_checked()? {
            Message::File { size } => size,
            other => return self.unexpected_reply(other),
        };

        let stream = self.stream.as_mut().ok_or(QooilError::NotConnected)?;
        if let Err(e) = copy_exact(stream, writer, size) {
            // Mid-payload failure leaves the stream unframed.
            self.drop_stream();
            return Err(e.into());
        }
        Ok(size)
    }

    /// Upload `size` bytes from `reader` to the file at `path`
    pub fn put_file(&mut self, path: &str, reader: &mut impl Read, size: u64) -> Result<()> {
        self.finish_entries()?;
        self.send_with_path(Message::Write { length: 0 }, path)?;
        self.expect_ok()?;

        self.send(&Message::File { size })?;
        let stream = self.stream.as_mut().ok_or(QooilError::NotConnected)?;
        if let Err(e) = copy_exact(reader, &mut *stream, size) {
            // The server is still owed bytes we cannot produce.
            self.drop_stream();
            return Err(e.into());
        }
        self.stream.as_mut().ok_or(QooilError::NotConnected)?.flush()?;

        self.expect_ok()
    }

    /// Delete the regular file at `path`
    pub fn delete_file(&mut self, path: &str) -> Result<()> {
        self.finish_entries()?;
        self.send_with_path(Message::Delete { length: 0 }, path)?;
        self.expect_ok()
    }

    /// List the directory at `path`, opening an Entry stream
    ///
    /// Consume it with [`read_entry`](Self::read_entry); any other
    /// operation drains the stream first.
    pub fn list_entries(&mut self, path: &str) -> Result<()> {
        self.finish_entries()?;
        self.send_with_path(Message::List { length: 0 }, path)?;
        self.expect_ok()?;
        self.reading_entries = true;
        Ok(())
    }

    /// Consume one Entry frame, or the terminal End
    ///
    /// Returns `None` once the stream is exhausted (or none is open).
    pub fn read_entry(&mut self) -> Result<Option<Entry>> {
        if !self.reading_entries {
            return Ok(None);
        }
        match self.recv_checked() {
            Ok(Message::Entry { length, is_dir }) => {
                let name = self.recv_payload(u64::from(length))?;
                Ok(Some(Entry { name, is_dir }))
            }
            Ok(Message::End) => {
                self.reading_entries = false;
                Ok(None)
            }
            Ok(other) => {
                self.reading_entries = false;
                self.unexpected_reply(other)
            }
            Err(e) => {
                self.reading_entries = false;
                Err(e)
            }
        }
    }

    /// Quit the session and close the transport
    pub fn close(&mut self) -> Result<()> {
        if self.stream.is_none() {
            return Ok(());
        }
        self.finish_entries()?;
        self.send(&Message::Quit)?;
        match self.recv_checked()? {
            Message::QuitReply => {
                if let Some(stream) = self.stream.take() {
                    let _ = stream.shutdown(Shutdown::Both);
                }
                Ok(())
            }
            other => self.unexpected_reply(other),
        }
    }

    // -------------------------------------------------------------------------
    // Framing helpers
    // -------------------------------------------------------------------------

    /// Drain an outstanding Entry stream so the connection is quiescent
    fn finish_entries(&mut self) -> Result<()> {
        while self.reading_entries {
            let _ = self.read_entry()?;
        }
        Ok(())
    }

    fn send(&mut self, message: &Message) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(QooilError::NotConnected)?;
        write_message(&mut *stream, message)?;
        stream.flush()?;
        Ok(())
    }

    /// Send a path-carrying request: the header with the path length
    /// patched in, then the path bytes
    fn send_with_path(&mut self, message: Message, path: &str) -> Result<()> {
        let length = u16::try_from(path.len()).map_err(|_| {
            QooilError::protocol_args(ErrorKind::InvalidFileName, path.len() as u32, 0)
        })?;
        let message = match message {
            Message::Read { .. } => Message::Read { length },
            Message::List { .. } => Message::List { length },
            Message::Cd { .. } => Message::Cd { length },
            Message::Write { .. } => Message::Write { length },
            Message::Delete { .. } => Message::Delete { length },
            other => unreachable!("{other:?} does not carry a path"),
        };
        let stream = self.stream.as_mut().ok_or(QooilError::NotConnected)?;
        write_message(&mut *stream, &message)?;
        stream.write_all(path.as_bytes())?;
        stream.flush()?;
        Ok(())
    }

    /// Receive one message, turning Error frames and corrupt tags into
    /// typed failures
    fn recv_checked(&mut self) -> Result<Message> {
        let stream = self.stream.as_mut().ok_or(QooilError::NotConnected)?;
        let message = match read_message(stream) {
            Ok(Some(message)) => message,
            Ok(None) => {
                self.drop_stream();
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "server closed the connection",
                )
                .into());
            }
            Err(e) => {
                self.drop_stream();
                return Err(e.into());
            }
        };

        match message {
            Message::Corrupt { tag } => {
                self.drop_stream();
                Err(QooilError::Fault(format!(
                    "corrupt tag 0x{tag:04X} from server"
                )))
            }
            Message::Error { code, arg1, arg2 } => {
                self.last_error_args = (arg1, arg2);
                let kind = ErrorKind::from_code(code);
                if kind == ErrorKind::Unrecognized {
                    // An error code outside the taxonomy means we no longer
                    // understand the peer.
                    self.drop_stream();
                }
                Err(QooilError::Protocol { kind, arg1, arg2 })
            }
            other => Ok(other),
        }
    }

    fn expect_ok(&mut self) -> Result<()> {
        match self.recv_checked()? {
            Message::Ok => Ok(()),
            other => self.unexpected_reply(other),
        }
    }

    /// Read an exact-length payload following a header frame
    fn recv_payload(&mut self, length: u64) -> Result<Vec<u8>> {
        let stream = self.stream.as_mut().ok_or(QooilError::NotConnected)?;
        let mut bytes = vec![0u8; length as usize];
        if let Err(e) = stream.read_exact(&mut bytes) {
            self.drop_stream();
            return Err(e.into());
        }
        Ok(bytes)
    }

    fn unexpected_reply<T>(&mut self, message: Message) -> Result<T> {
        self.drop_stream();
        Err(QooilError::Fault(format!(
            "unexpected reply: {:?}",
            message.tag()
        )))
    }

    fn drop_stream(&mut self) {
        self.reading_entries = false;
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if self.stream.is_some() {
            let _ = self.close();
        }
    }
}
