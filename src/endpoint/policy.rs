use std::fmt;
use std::str::FromStr;

use crate::error::MiniRedisConfigError;

/// Connection state of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    /// Terminal.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// What an endpoint does with commands submitted while it has no connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectedBehavior {
    /// Queue up to the configured capacity while disconnected.
    #[default]
    Default,
    /// Always queue, subject to capacity.
    AcceptCommands,
    /// Fail commands immediately while disconnected.
    RejectCommands,
}

/// Action taken for a submitted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Hand the command to the writer now.
    PassThrough,
    /// Put the command into the disconnected buffer.
    Enqueue,
    /// Fail the command right away.
    Reject,
}

impl DisconnectedBehavior {
    /// Decide how to dispatch a command submitted in `state`.
    ///
    /// `Default` and `AcceptCommands` behave the same here. They only differ
    /// for a connected-but-not-yet-initialized connection, which this endpoint
    /// reports as `Disconnected`; a new state would get its own row here.
    pub fn decide(self, state: ConnectionState) -> Dispatch {
        match (self, state) {
            (_, ConnectionState::Closed) => Dispatch::Reject,
            (_, ConnectionState::Connected) => Dispatch::PassThrough,
            (DisconnectedBehavior::Default, ConnectionState::Disconnected)
            | (DisconnectedBehavior::AcceptCommands, ConnectionState::Disconnected) => {
                Dispatch::Enqueue
            }
            (DisconnectedBehavior::RejectCommands, ConnectionState::Disconnected) => {
                Dispatch::Reject
            }
        }
    }
}

impl FromStr for DisconnectedBehavior {
    type Err = MiniRedisConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "default" => Ok(DisconnectedBehavior::Default),
            "accept_commands" => Ok(DisconnectedBehavior::AcceptCommands),
            "reject_commands" => Ok(DisconnectedBehavior::RejectCommands),
            _ => Err(MiniRedisConfigError::UnknownBehavior(s.to_string())),
        }
    }
}
