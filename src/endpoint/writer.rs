use async_stream::stream;
use log::debug;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_stream::Stream;

use crate::cmd::Command;
use crate::error::{MiniRedisConfigError, MiniRedisWriteError};

/// Downstream collaborator that dispatches commands over the wire.
///
/// On `Ok` the writer owns the command and must eventually drive it to a
/// terminal state. On `Err` it has not taken the command; the endpoint fails
/// the command with the returned error.
///
/// `write` must not block and must not call back into the endpoint that
/// invoked it.
pub trait CommandWriter: Send + Sync {
    fn write(&self, command: Command) -> Result<(), MiniRedisWriteError>;
}

impl<W: CommandWriter + ?Sized> CommandWriter for std::sync::Arc<W> {
    fn write(&self, command: Command) -> Result<(), MiniRedisWriteError> {
        (**self).write(command)
    }
}

/// Create a writer that hands commands to a transport task through a bounded
/// channel of `buffer` commands.
///
/// # Errors
///
/// Returns `Err` if `buffer` is zero.
pub fn channel(buffer: usize) -> Result<(ChannelWriter, CommandReceiver), MiniRedisConfigError> {
    if buffer == 0 {
        return Err(MiniRedisConfigError::InvalidBufferSize(buffer));
    }

    let (tx, rx) = mpsc::channel(buffer);
    Ok((ChannelWriter { tx }, CommandReceiver { rx }))
}

/// Writer half of `channel`.
#[derive(Debug, Clone)]
pub struct ChannelWriter {
    tx: mpsc::Sender<Command>,
}

impl CommandWriter for ChannelWriter {
    fn write(&self, command: Command) -> Result<(), MiniRedisWriteError> {
        match self.tx.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(command)) => {
                debug!("transport buffer full, refusing command {}", command.id());
                Err(MiniRedisWriteError::Backpressure)
            }
            Err(TrySendError::Closed(command)) => {
                debug!("transport gone, refusing command {}", command.id());
                Err(MiniRedisWriteError::Disconnect)
            }
        }
    }
}

/// Transport side of `channel`.
///
/// The transport receives commands in the order the endpoint wrote them and
/// is responsible for completing each one.
#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::Receiver<Command>,
}

impl CommandReceiver {
    /// Receive the next command, waiting if necessary.
    ///
    /// `None` once every `ChannelWriter` has been dropped and the buffer is
    /// empty.
    pub async fn recv(&mut self) -> Option<Command> {
        self.rx.recv().await
    }

    /// Convert the receiver into a `Stream` of written commands.
    pub fn into_stream(mut self) -> impl Stream<Item = Command> {
        stream! {
            while let Some(command) = self.recv().await {
                yield command;
            }
        }
    }
}
