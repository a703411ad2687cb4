//! Session Handler
//!
//! The per-connection state machine. One session exclusively owns one
//! transport stream and a [`Sandbox`]; it loops decoding one request per
//! iteration, dispatching it, and writing the response frames.
//!
//! Every iteration is atomic with respect to the protocol: either a
//! well-formed response (possibly multi-frame, for List/Read/Write) is
//! written, or exactly one Error frame is written, or the session ends.
//! Taxonomy failures become Error frames and the session continues;
//! transport faults end the session.

use std::io::{self, Read, Write};

use crate::config::Config;
use crate::error::{QooilError, Result};
use crate::protocol::{copy_exact, read_message, write_message, ErrorKind, Message};
use crate::sandbox::Sandbox;

/// The state and control loop for one connected client
pub struct Session<S> {
    /// Exclusively owned transport stream
    stream: S,

    /// Configuration snapshot, passed by value at accept time
    config: Config,

    /// Sandboxed filesystem window (root, virtual cwd, depth)
    sandbox: Sandbox,

    /// Set by Quit; terminates the receive loop after the QuitReply
    is_exiting: bool,
}

impl<S: Read + Write> Session<S> {
    /// Create a session over an accepted stream
    ///
    /// Captures the sandbox root: the configured root directory, or the
    /// process working directory when none is configured.
    pub fn new(stream: S, config: Config) -> io::Result<Self> {
        let sandbox = match &config.root_dir {
            Some(dir) => Sandbox::with_root(dir)?,
            None => Sandbox::new()?,
        };
        Ok(Self {
            stream,
            config,
            sandbox,
            is_exiting: false,
        })
    }

    /// Receive loop; returns when the client quits, disconnects, or the
    /// transport fails
    pub fn run(&mut self) -> Result<()> {
        while !self.is_exiting {
            let message = match read_message(&mut self.stream)? {
                Some(message) => message,
                None => break,
            };
            tracing::debug!(?message, "request");

            if let Err(e) = self.dispatch(message) {
                match e {
                    QooilError::Protocol { kind, arg1, arg2 } => {
                        tracing::debug!(%kind, arg1, arg2, "protocol error");
                        write_message(
                            &mut self.stream,
                            &Message::Error {
                                code: kind.code(),
                                arg1,
                                arg2,
                            },
                        )?;
                        self.stream.flush()?;
                    }
                    fatal => return Err(fatal),
                }
            } else {
                self.stream.flush()?;
            }
        }
        Ok(())
    }

    /// Route one decoded message to its handler
    fn dispatch(&mut self, message: Message) -> Result<()> {
        match message {
            Message::Ping => self.reply(Message::PingReply),
            Message::Quit => {
                self.is_exiting = true;
                self.reply(Message::QuitReply)
            }
            Message::GetInfo => self.reply(Message::Info {
                max_name: self.config.max_name,
                max_path: self.config.max_path,
            }),
            Message::Cd { length } => self.handle_cd(length),
            Message::Pwd => self.handle_pwd(),
            Message::List { length } => self.handle_list(length),
            Message::Read { length } => self.handle_read(length),
            Message::Write { length } => self.handle_write(length),
            Message::Delete { length } => self.handle_delete(length),
            Message::Corrupt { tag } => Err(QooilError::protocol_args(
                ErrorKind::CorruptMessageTag,
                u32::from(tag),
                0,
            )),
            other => Err(QooilError::protocol_args(
                ErrorKind::UnexpectedMessage,
                other.tag() as u32,
                0,
            )),
        }
    }

    fn handle_cd(&mut self, length: u16) -> Result<()> {
        let path = self.read_path(length)?;
        self.sandbox.chdir(&path)?;
        tracing::debug!(depth = self.sandbox.depth(), "cwd replaced");
        self.reply(Message::Ok)
    }

    fn handle_pwd(&mut self) -> Result<()> {
        let path = self.sandbox.virtual_path()?;
        self.reply(Message::Path {
            length: path.len() as u16,
        })?;
        self.stream.write_all(&path)?;
        Ok(())
    }

    fn handle_list(&mut self, length: u16) -> Result<()> {
        let path = self.read_path(length)?;
        // Collected up front so a resolution failure is a single Error
        // frame rather than a truncated entry stream.
        let entries = self.sandbox.read_dir(&path)?;

        self.reply(Message::Ok)?;
        for entry in &entries {
            self.reply(Message::Entry {
                length: entry.name.len() as u8,
                is_dir: entry.is_dir,
            })?;
            self.stream.write_all(&entry.name)?;
        }
        self.reply(Message::End)
    }

    fn handle_read(&mut self, length: u16) -> Result<()> {
        let path = self.read_path(length)?;
        let (mut file, size) = self.sandbox.open_file(&path)?;

        self.reply(Message::File { size })?;
        // The declared size is a promise: once the File header is out, a
        // short read from disk leaves the stream unrecoverable, so any
        // failure here ends the session.
        copy_exact(&mut file, &mut self.stream, size)?;
        Ok(())
    }

    fn handle_write(&mut self, length: u16) -> Result<()> {
        let path = self.read_path(length)?;
        let mut file = self.sandbox.create_file(&path)?;
        self.reply(Message::Ok)?;
        self.stream.flush()?;

        let message = read_message(&mut self.stream)?.ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended awaiting File")
        })?;
        match message {
            Message::File { size } => {
                match copy_exact(&mut self.stream, &mut file, size) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                        return Err(QooilError::protocol(ErrorKind::UnexpectedEndOfConnection))
                    }
                    Err(e) => return Err(e.into()),
                }
                self.reply(Message::Ok)
            }
            // The file stays created-but-empty; no rollback.
            Message::Corrupt { tag } => Err(QooilError::protocol_args(
                ErrorKind::CorruptMessageTag,
                u32::from(tag),
                0,
            )),
            other => Err(QooilError::protocol_args(
                ErrorKind::UnexpectedMessage,
                other.tag() as u32,
                0,
            )),
        }
    }

    fn handle_delete(&mut self, length: u16) -> Result<()> {
        let path = self.read_path(length)?;
        self.sandbox.remove_file(&path)?;
        self.reply(Message::Ok)
    }

    /// Read a request's path payload of `length` bytes
    ///
    /// A length over the advertised limit still consumes exactly `length`
    /// bytes from the stream (framing stays aligned) before reporting
    /// InvalidFileName. A payload cut short by the peer is
    /// UnexpectedEndOfConnection.
    fn read_path(&mut self, length: u16) -> Result<Vec<u8>> {
        if u64::from(length) > self.config.max_name {
            match copy_exact(&mut self.stream, &mut io::sink(), u64::from(length)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(QooilError::protocol(ErrorKind::UnexpectedEndOfConnection))
                }
                Err(e) => return Err(e.into()),
            }
            return Err(QooilError::protocol_args(
                ErrorKind::InvalidFileName,
                u32::from(length),
                0,
            ));
        }

        let mut path = vec![0u8; usize::from(length)];
        match self.stream.read_exact(&mut path) {
            Ok(()) => Ok(path),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(QooilError::protocol(ErrorKind::UnexpectedEndOfConnection))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn reply(&mut self, message: Message) -> Result<()> {
        write_message(&mut self.stream, &message)?;
        Ok(())
    }
}
