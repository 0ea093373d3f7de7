use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use crate::cmd::completion::CompletionState;
pub use crate::cmd::completion::{CompletionHandle, Outcome};
use crate::connection::frame::Frame;
use crate::error::MiniRedisCommandError;

pub mod completion;

/// Source of command identifiers. Identifiers are never reused within a
/// process.
static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// Enumeration of the Redis commands issued through an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    Append,
    Del,
    Exists,
    Expire,
    Get,
    Incr,
    Ping,
    Publish,
    Set,
}

impl CommandType {
    /// Returns the command name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Append => "APPEND",
            CommandType::Del => "DEL",
            CommandType::Exists => "EXISTS",
            CommandType::Expire => "EXPIRE",
            CommandType::Get => "GET",
            CommandType::Incr => "INCR",
            CommandType::Ping => "PING",
            CommandType::Publish => "PUBLISH",
            CommandType::Set => "SET",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single outbound request, tracked until it completes.
///
/// Cloning a `Command` is shallow with respect to its completion: all clones
/// and all handles share one completion state, and it can be resolved only
/// once.
#[derive(Debug, Clone)]
pub struct Command {
    id: u64,
    kind: CommandType,
    args: Vec<Bytes>,
    state: Arc<CompletionState>,
}

impl Command {
    /// Create a new pending command without arguments.
    pub fn new(kind: CommandType) -> Command {
        Command {
            id: NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            args: Vec::new(),
            state: Arc::new(CompletionState::new()),
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<Bytes>) -> Command {
        self.args.push(arg.into());
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> CommandType {
        self.kind
    }

    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// Returns a handle observing this command's completion.
    pub fn handle(&self) -> CompletionHandle {
        CompletionHandle::new(self.id, self.state.clone())
    }

    /// Converts the command into an equivalent `Frame`, an array of bulk
    /// strings starting with the command name.
    pub fn into_frame(self) -> Frame {
        let name = Bytes::from_static(self.kind.as_str().as_bytes());
        Frame::bulk_array(std::iter::once(name).chain(self.args))
    }

    /// Complete the command with a reply.
    ///
    /// Returns `false`, leaving the command untouched, if it is already done.
    pub fn complete(&self, value: Frame) -> bool {
        self.state.complete(value)
    }

    /// Complete the command with a frame read from the server.
    ///
    /// `Error` frames fail the command with `MiniRedisCommandError::Server`,
    /// every other frame completes it. Returns `false` if it is already done.
    pub fn complete_reply(&self, reply: Frame) -> bool {
        match reply {
            Frame::Error(msg) => self.complete_exceptionally(MiniRedisCommandError::Server(msg)),
            frame => self.complete(frame),
        }
    }

    /// Fail the command.
    ///
    /// Returns `false`, leaving the command untouched, if it is already done.
    pub fn complete_exceptionally(&self, err: MiniRedisCommandError) -> bool {
        self.state.complete_exceptionally(err)
    }

    pub fn cancel(&self) -> bool {
        self.state.cancel()
    }

    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }
}
