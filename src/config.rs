//! Endpoint configuration.
//!
//! Options are consumed once when an endpoint is built and are not reloaded.

use std::env;

use crate::consts::{DEFAULT_REQUEST_QUEUE_SIZE, ENV_DISCONNECTED_BEHAVIOR, ENV_REQUEST_QUEUE_SIZE};
use crate::endpoint::policy::DisconnectedBehavior;
use crate::error::MiniRedisConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Capacity of the disconnected buffer.
    pub request_queue_size: usize,

    pub disconnected_behavior: DisconnectedBehavior,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            request_queue_size: DEFAULT_REQUEST_QUEUE_SIZE,
            disconnected_behavior: DisconnectedBehavior::default(),
        }
    }
}

impl ClientOptions {
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder {
            options: ClientOptions::default(),
        }
    }

    /// Load options from the environment, falling back to the defaults for
    /// unset variables.
    ///
    /// Binaries call `dotenv().ok()` before this so a `.env` file is honored.
    pub fn from_env() -> Result<ClientOptions, MiniRedisConfigError> {
        let mut options = ClientOptions::default();

        if let Ok(size) = env::var(ENV_REQUEST_QUEUE_SIZE) {
            options.request_queue_size = size.trim().parse()?;
        }
        if let Ok(behavior) = env::var(ENV_DISCONNECTED_BEHAVIOR) {
            options.disconnected_behavior = behavior.parse()?;
        }

        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), MiniRedisConfigError> {
        if self.request_queue_size == 0 {
            return Err(MiniRedisConfigError::InvalidQueueSize(
                self.request_queue_size,
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptionsBuilder {
    options: ClientOptions,
}

impl ClientOptionsBuilder {
    pub fn request_queue_size(mut self, size: usize) -> Self {
        self.options.request_queue_size = size;
        self
    }

    pub fn disconnected_behavior(mut self, behavior: DisconnectedBehavior) -> Self {
        self.options.disconnected_behavior = behavior;
        self
    }

    pub fn build(self) -> Result<ClientOptions, MiniRedisConfigError> {
        self.options.validate()?;
        Ok(self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let options = ClientOptions::default();

        assert!(options.validate().is_ok());
        assert_eq!(options.disconnected_behavior, DisconnectedBehavior::Default);
        assert_eq!(options.request_queue_size, DEFAULT_REQUEST_QUEUE_SIZE);
    }

    #[test]
    fn builder_rejects_zero_capacity() {
        let err = ClientOptions::builder()
            .request_queue_size(0)
            .build()
            .unwrap_err();

        assert!(matches!(err, MiniRedisConfigError::InvalidQueueSize(0)));
    }

    #[test]
    fn builder_sets_fields() {
        let options = ClientOptions::builder()
            .request_queue_size(3)
            .disconnected_behavior(DisconnectedBehavior::RejectCommands)
            .build()
            .unwrap();

        assert_eq!(options.request_queue_size, 3);
        assert_eq!(
            options.disconnected_behavior,
            DisconnectedBehavior::RejectCommands
        );
    }

    // The only test touching these variables, so it cannot race another one.
    #[test]
    fn from_env_reads_overrides() {
        env::set_var(ENV_REQUEST_QUEUE_SIZE, "12");
        env::set_var(ENV_DISCONNECTED_BEHAVIOR, "accept_commands");

        let options = ClientOptions::from_env();

        env::set_var(ENV_REQUEST_QUEUE_SIZE, "nope");
        let bad_size = ClientOptions::from_env();

        env::remove_var(ENV_REQUEST_QUEUE_SIZE);
        env::remove_var(ENV_DISCONNECTED_BEHAVIOR);

        let options = options.unwrap();
        assert_eq!(options.request_queue_size, 12);
        assert_eq!(
            options.disconnected_behavior,
            DisconnectedBehavior::AcceptCommands
        );
        assert!(matches!(bad_size, Err(MiniRedisConfigError::ParseInt(_))));
    }
}
