pub mod cmd;
pub mod config;
pub mod consts;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod logger;

pub use cmd::{Command, CommandType, CompletionHandle};
pub use config::ClientOptions;
pub use endpoint::policy::{ConnectionState, DisconnectedBehavior, Dispatch};
pub use endpoint::writer::{channel, ChannelWriter, CommandReceiver, CommandWriter};
pub use endpoint::Endpoint;
