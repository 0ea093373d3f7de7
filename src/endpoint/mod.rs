//! Per-node command endpoint.
//!
//! An `Endpoint` accepts commands from any number of callers and hands them to
//! a `CommandWriter` while connected. While disconnected it buffers or rejects
//! them according to the configured `DisconnectedBehavior`, and it drains the
//! buffer when the connection comes back or when the endpoint is closed.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, info, warn};

use crate::cmd::{Command, CompletionHandle};
use crate::config::ClientOptions;
use crate::endpoint::policy::{ConnectionState, Dispatch};
use crate::endpoint::queue::DisconnectedQueue;
use crate::endpoint::writer::CommandWriter;
use crate::error::{MiniRedisCommandError, MiniRedisConfigError};

pub mod policy;
pub mod queue;
pub mod writer;

/// Tally of one drain of the disconnected buffer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Drained {
    forwarded: usize,
    skipped: usize,
    failed: usize,
}

/// Command endpoint for a single cluster node.
///
/// All methods take `&self`; share an endpoint between the caller threads and
/// the connection-management task with an `Arc`.
#[derive(Debug)]
pub struct Endpoint<W> {
    options: ClientOptions,

    /// Current connection state.
    ///
    /// `submit` holds the read lock for its whole decision and action, state
    /// transitions hold the write lock while they drain. A drain therefore
    /// sees every command queued before it, and no command can be queued
    /// behind a drain that already ran.
    state: RwLock<ConnectionState>,

    /// Commands accepted while disconnected.
    disconnected_queue: DisconnectedQueue,

    /// Set at construction and never replaced.
    writer: W,
}

impl<W: CommandWriter> Endpoint<W> {
    /// Create a disconnected endpoint.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `options` is invalid.
    pub fn new(options: ClientOptions, writer: W) -> Result<Endpoint<W>, MiniRedisConfigError> {
        options.validate()?;

        Ok(Endpoint {
            disconnected_queue: DisconnectedQueue::new(options.request_queue_size),
            state: RwLock::new(ConnectionState::Disconnected),
            options,
            writer,
        })
    }

    /// Submit a command.
    ///
    /// The command is written, queued, or failed right away depending on the
    /// connection state and the disconnected behavior. Failures are never
    /// returned from here; they complete the command and show up through the
    /// returned handle.
    pub fn submit(&self, command: Command) -> CompletionHandle {
        let handle = command.handle();

        if command.is_done() {
            debug!("command {} already done, not submitting", command.id());
            return handle;
        }

        let state = self.read_state();

        match self.options.disconnected_behavior.decide(*state) {
            Dispatch::PassThrough => {
                self.write_or_fail(command);
            }
            Dispatch::Enqueue => {
                if let Err(command) = self.disconnected_queue.offer(command) {
                    warn!(
                        "disconnected buffer full ({}), rejecting command {}",
                        self.disconnected_queue.capacity(),
                        command.id()
                    );
                    command.complete_exceptionally(MiniRedisCommandError::QueueFull {
                        capacity: self.disconnected_queue.capacity(),
                    });
                } else {
                    debug!("queued command {} while {}", handle.id(), *state);
                }
            }
            Dispatch::Reject => {
                let err = if *state == ConnectionState::Closed {
                    MiniRedisCommandError::EndpointClosed
                } else {
                    MiniRedisCommandError::NotConnected
                };
                debug!("rejecting command {}: {}", command.id(), err);
                command.complete_exceptionally(err);
            }
        }

        handle
    }

    /// The connection became usable.
    ///
    /// Forwards the disconnected buffer to the writer in submission order.
    /// No-op when already connected or closed.
    pub fn on_connected(&self) {
        let mut state = self.write_state();

        if *state != ConnectionState::Disconnected {
            debug!("ignoring connect while {}", *state);
            return;
        }
        *state = ConnectionState::Connected;

        let drained = self.drain_and_forward();
        info!(
            "endpoint connected, forwarded {} queued commands ({} skipped, {} failed)",
            drained.forwarded, drained.skipped, drained.failed
        );
    }

    /// The connection was lost. No-op when closed.
    pub fn on_disconnected(&self) {
        let mut state = self.write_state();

        if *state == ConnectionState::Connected {
            *state = ConnectionState::Disconnected;
            info!("endpoint disconnected");
        }
    }

    /// Close the endpoint.
    ///
    /// Queued commands that are not yet done are handed to the writer one
    /// last time; the ones it refuses are failed. Commands submitted afterwards
    /// fail with `EndpointClosed`. Closing twice is a no-op.
    pub fn close(&self) {
        let mut state = self.write_state();

        if *state == ConnectionState::Closed {
            return;
        }
        *state = ConnectionState::Closed;

        let drained = self.drain_and_forward();
        info!(
            "endpoint closed, flushed {} queued commands ({} skipped, {} failed)",
            drained.forwarded, drained.skipped, drained.failed
        );
    }

    /// Cancel every command waiting in the disconnected buffer.
    ///
    /// The connection state is left as it is.
    pub fn reset(&self) {
        let _state = self.write_state();

        let cancelled = self
            .disconnected_queue
            .drain_in_order()
            .iter()
            .filter(|command| command.cancel())
            .count();

        info!("endpoint reset, cancelled {} queued commands", cancelled);
    }

    pub fn state(&self) -> ConnectionState {
        *self.read_state()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    /// Number of commands waiting in the disconnected buffer.
    pub fn queued_len(&self) -> usize {
        self.disconnected_queue.len()
    }

    /// Snapshot of the disconnected buffer, in submission order.
    pub fn queued_commands(&self) -> Vec<Command> {
        self.disconnected_queue.snapshot()
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Drain the disconnected buffer into the writer.
    ///
    /// Commands already done are left as they are. A command the writer
    /// refuses is failed with the writer's error and the drain moves on.
    ///
    /// Callers hold the state write lock.
    fn drain_and_forward(&self) -> Drained {
        let mut drained = Drained::default();

        for command in self.disconnected_queue.drain_in_order() {
            if command.is_done() {
                debug!(
                    "skipping command {} (cancelled: {})",
                    command.id(),
                    command.is_cancelled()
                );
                drained.skipped += 1;
                continue;
            }

            if self.write_or_fail(command) {
                drained.forwarded += 1;
            } else {
                drained.failed += 1;
            }
        }

        drained
    }

    /// Hand `command` to the writer, failing it if the writer refuses.
    fn write_or_fail(&self, command: Command) -> bool {
        let handle = command.handle();

        match self.writer.write(command) {
            Ok(()) => true,
            Err(err) => {
                warn!("failed to write command {}: {}", handle.id(), err);
                handle.complete_exceptionally(err.into());
                false
            }
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ConnectionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ConnectionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
