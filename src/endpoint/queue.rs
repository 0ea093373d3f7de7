use std::collections::VecDeque;
use std::mem;
use std::sync::{Mutex, PoisonError};

use crate::cmd::Command;

/// Bounded FIFO holding commands accepted while an endpoint has no usable
/// connection.
///
/// `offer` and `drain_in_order` are each atomic with respect to one another,
/// so a command is observed by at most one drain and is never lost between an
/// offer and a concurrent drain.
#[derive(Debug)]
pub struct DisconnectedQueue {
    capacity: usize,

    /// The queued commands. A `std::sync::Mutex` is enough: the critical
    /// sections are short and never hold the lock across an `.await`.
    commands: Mutex<VecDeque<Command>>,
}

impl DisconnectedQueue {
    pub fn new(capacity: usize) -> DisconnectedQueue {
        DisconnectedQueue {
            capacity,
            commands: Mutex::new(VecDeque::new()),
        }
    }

    /// Append `command` if capacity remains.
    ///
    /// When the queue is full the command is handed back untouched; the
    /// caller is responsible for failing it.
    pub fn offer(&self, command: Command) -> Result<(), Command> {
        let mut commands = self.lock();

        if commands.len() >= self.capacity {
            return Err(command);
        }

        commands.push_back(command);
        Ok(())
    }

    /// Remove and return every queued command in submission order, leaving
    /// the queue empty.
    pub fn drain_in_order(&self) -> Vec<Command> {
        let drained = mem::take(&mut *self.lock());
        drained.into()
    }

    /// Clones of the queued commands, in order. The clones share completion
    /// state with the queued commands.
    pub fn snapshot(&self) -> Vec<Command> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Command>> {
        self.commands.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::cmd::CommandType;

    fn ids(commands: &[Command]) -> Vec<u64> {
        commands.iter().map(Command::id).collect()
    }

    #[test]
    fn drains_in_fifo_order() {
        let queue = DisconnectedQueue::new(8);
        let commands: Vec<_> = (0..3).map(|_| Command::new(CommandType::Ping)).collect();

        for cmd in &commands {
            queue.offer(cmd.clone()).unwrap();
        }

        assert_eq!(ids(&queue.drain_in_order()), ids(&commands));
        assert!(queue.is_empty());
        assert!(queue.drain_in_order().is_empty());
    }

    #[test]
    fn full_queue_hands_command_back() {
        let queue = DisconnectedQueue::new(1);
        let first = Command::new(CommandType::Get).arg("a");
        let second = Command::new(CommandType::Get).arg("b");

        assert!(queue.offer(first).is_ok());
        let rejected = queue.offer(second.clone()).unwrap_err();

        assert_eq!(rejected.id(), second.id());
        assert!(!rejected.is_done());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.capacity(), 1);
    }

    #[test]
    fn snapshot_does_not_drain() {
        let queue = DisconnectedQueue::new(4);
        let cmd = Command::new(CommandType::Incr).arg("counter");
        queue.offer(cmd.clone()).unwrap();

        assert_eq!(ids(&queue.snapshot()), vec![cmd.id()]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn concurrent_offers_and_drains_neither_lose_nor_duplicate() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 500;

        let queue = Arc::new(DisconnectedQueue::new(PRODUCERS * PER_PRODUCER));

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || {
                    let mut offered = Vec::with_capacity(PER_PRODUCER);
                    for _ in 0..PER_PRODUCER {
                        let cmd = Command::new(CommandType::Ping);
                        offered.push(cmd.id());
                        queue.offer(cmd).unwrap();
                    }
                    offered
                })
            })
            .collect();

        let mut drained = Vec::new();
        while producers.iter().any(|p| !p.is_finished()) {
            drained.extend(ids(&queue.drain_in_order()));
        }

        let offered: Vec<u64> = producers
            .into_iter()
            .flat_map(|p| p.join().unwrap())
            .collect();
        drained.extend(ids(&queue.drain_in_order()));

        let unique: HashSet<_> = drained.iter().copied().collect();
        assert_eq!(drained.len(), offered.len());
        assert_eq!(unique, offered.into_iter().collect::<HashSet<_>>());
    }
}
