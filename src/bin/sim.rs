//! Endpoint simulation.
//!
//! Drives an endpoint with a fake transport and a flapping connection, then
//! closes it and reports how every submitted command ended. Useful to watch
//! the disconnected buffer at work:
//!
//!     RUST_LOG=debug cargo run --bin mini-redis-endpoint-sim -- --flaps 3
//!
//! The `clap` crate is used for parsing arguments.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dotenv::dotenv;
use log::{debug, error, info};
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_stream::StreamExt;

use mini_redis_endpoint::connection::frame::Frame;
use mini_redis_endpoint::consts::DEFAULT_TRANSPORT_BUFFER;
use mini_redis_endpoint::error::{MiniRedisCommandError, MiniRedisConfigError};
use mini_redis_endpoint::{
    channel, logger, ClientOptions, Command, CommandReceiver, CommandType, DisconnectedBehavior,
    Endpoint,
};

#[derive(Parser, Debug)]
#[clap(
    name = "mini-redis-endpoint-sim",
    version,
    author,
    about = "Simulate an endpoint over a flapping connection"
)]
struct Cli {
    /// Capacity of the disconnected buffer, defaults to the environment
    #[clap(long)]
    queue_size: Option<usize>,

    /// default, accept_commands or reject_commands
    #[clap(long)]
    behavior: Option<DisconnectedBehavior>,

    /// Number of commands to submit
    #[clap(long, default_value_t = 200)]
    commands: usize,

    /// Number of disconnect / reconnect cycles
    #[clap(long, default_value_t = 5)]
    flaps: usize,

    /// Commands buffered between the endpoint and the transport
    #[clap(long, default_value_t = DEFAULT_TRANSPORT_BUFFER)]
    buffer: usize,
}

#[derive(Debug, Default)]
struct Tally {
    ok: usize,
    unexpected_reply: usize,
    cancelled: usize,
    queue_full: usize,
    not_connected: usize,
    closed: usize,
    write_failed: usize,
    server_error: usize,
    unresolved: usize,
}

#[tokio::main]
pub async fn main() -> Result<(), MiniRedisConfigError> {
    let cli = init();

    let mut options = ClientOptions::from_env()?;
    if let Some(size) = cli.queue_size {
        options.request_queue_size = size;
    }
    if let Some(behavior) = cli.behavior {
        options.disconnected_behavior = behavior;
    }

    let (writer, receiver) = channel(cli.buffer)?;
    let endpoint = Arc::new(Endpoint::new(options, writer)?);
    info!("simulating endpoint with {:?}", endpoint.options());

    tokio::spawn(transport(receiver));
    let flapper = tokio::spawn(flap(endpoint.clone(), cli.flaps));

    let mut handles = Vec::with_capacity(cli.commands);
    for i in 0..cli.commands {
        let command = Command::new(CommandType::Set)
            .arg(format!("key:{}", i))
            .arg(i.to_string());
        let handle = endpoint.submit(command);

        if rand::thread_rng().gen_bool(0.05) {
            handle.cancel();
        }
        handles.push(handle);

        time::sleep(Duration::from_millis(1)).await;
    }

    join_flapper(flapper).await;
    endpoint.close();

    let mut tally = Tally::default();
    for handle in handles {
        match handle.get_timeout(Duration::from_secs(1)).await {
            Some(Ok(ref reply)) if *reply == "OK" => tally.ok += 1,
            Some(Ok(_)) => tally.unexpected_reply += 1,
            Some(Err(MiniRedisCommandError::Cancelled)) => tally.cancelled += 1,
            Some(Err(MiniRedisCommandError::QueueFull { .. })) => tally.queue_full += 1,
            Some(Err(MiniRedisCommandError::NotConnected)) => tally.not_connected += 1,
            Some(Err(MiniRedisCommandError::EndpointClosed)) => tally.closed += 1,
            Some(Err(MiniRedisCommandError::Write(_))) => tally.write_failed += 1,
            Some(Err(MiniRedisCommandError::Server(_))) => tally.server_error += 1,
            None => tally.unresolved += 1,
        }
    }

    info!("simulation finished: {:?}", tally);

    Ok(())
}

/// Fake transport: answers every written command after a short delay.
async fn transport(receiver: CommandReceiver) {
    let stream = receiver.into_stream();
    tokio::pin!(stream);

    while let Some(command) = stream.next().await {
        let (delay, fail) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(0..3), rng.gen_bool(0.02))
        };
        time::sleep(Duration::from_millis(delay)).await;

        let reply = if fail {
            Frame::Error("ERR simulated failure".into())
        } else {
            Frame::Simple("OK".into())
        };

        if !command.complete_reply(reply) {
            debug!("reply for command {} discarded, already done", command.id());
        }
    }
}

/// Toggle the connection `flaps` times, ending connected.
async fn flap<W>(endpoint: Arc<Endpoint<W>>, flaps: usize)
where
    W: mini_redis_endpoint::CommandWriter,
{
    for _ in 0..flaps {
        time::sleep(random_pause()).await;
        endpoint.on_connected();
        time::sleep(random_pause()).await;
        endpoint.on_disconnected();
    }

    time::sleep(random_pause()).await;
    endpoint.on_connected();
}

/// Wait for the flapper, returning `false` if it did not run to completion.
async fn join_flapper(flapper: JoinHandle<()>) -> bool {
    match flapper.await {
        Ok(()) => true,
        Err(err) => {
            error!("connection flapper failed: {}", err);
            false
        }
    }
}

fn random_pause() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(10..60))
}

fn init() -> Cli {
    dotenv().ok();
    logger::init();
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_flapper_is_reported() {
        let finished = tokio::spawn(async {});
        let panicked = tokio::spawn(async { panic!("flapper died") });

        assert!(join_flapper(finished).await);
        assert!(!join_flapper(panicked).await);
    }
}
