/// Default capacity of the disconnected buffer of an endpoint.
///
/// Used if no queue size is configured.
pub const DEFAULT_REQUEST_QUEUE_SIZE: usize = 2048;

/// Default number of commands the channel writer buffers for the transport
/// task before it starts failing writes with backpressure.
pub const DEFAULT_TRANSPORT_BUFFER: usize = 1024;

/// Environment variable overriding the request queue size.
pub const ENV_REQUEST_QUEUE_SIZE: &str = "MINI_REDIS_REQUEST_QUEUE_SIZE";

/// Environment variable overriding the disconnected behavior.
pub const ENV_DISCONNECTED_BEHAVIOR: &str = "MINI_REDIS_DISCONNECTED_BEHAVIOR";
