use std::sync::Arc;
use std::time::Duration;

use tokio_stream::StreamExt;

use mini_redis_endpoint::connection::frame::Frame;
use mini_redis_endpoint::error::{MiniRedisCommandError, MiniRedisWriteError};
use mini_redis_endpoint::{
    channel, ClientOptions, Command, CommandReceiver, CommandType, DisconnectedBehavior, Endpoint,
};

/// Answers `PING` with `PONG` and everything else with the rendered request.
fn spawn_transport(receiver: CommandReceiver) {
    tokio::spawn(async move {
        let stream = receiver.into_stream();
        tokio::pin!(stream);

        while let Some(command) = stream.next().await {
            let reply = match command.kind() {
                CommandType::Ping => Frame::Simple("PONG".into()),
                _ => Frame::Simple(command.clone().into_frame().to_string()),
            };
            command.complete(reply);
        }
    });
}

#[tokio::test]
async fn queued_commands_complete_after_reconnect() {
    let (writer, receiver) = channel(16).unwrap();
    let endpoint = Endpoint::new(ClientOptions::default(), writer).unwrap();
    spawn_transport(receiver);

    let ping = endpoint.submit(Command::new(CommandType::Ping));
    let set = endpoint.submit(Command::new(CommandType::Set).arg("foo").arg("bar"));
    assert!(!ping.is_done());

    endpoint.on_connected();

    assert_eq!(ping.get().await, Ok(Frame::Simple("PONG".into())));
    assert_eq!(set.get().await, Ok(Frame::Simple("SET foo bar".into())));
}

#[tokio::test]
async fn transport_backpressure_fails_the_overflow() {
    let (writer, _receiver) = channel(1).unwrap();
    let endpoint = Endpoint::new(ClientOptions::default(), writer).unwrap();
    endpoint.on_connected();

    let first = endpoint.submit(Command::new(CommandType::Get).arg("a"));
    let second = endpoint.submit(Command::new(CommandType::Get).arg("b"));

    assert!(!first.is_done());
    assert_eq!(
        second.get().await,
        Err(MiniRedisCommandError::Write(MiniRedisWriteError::Backpressure))
    );
}

#[tokio::test]
async fn close_after_transport_is_gone_fails_queued_commands() {
    let (writer, receiver) = channel(4).unwrap();
    let endpoint = Endpoint::new(ClientOptions::default(), writer).unwrap();
    drop(receiver);

    let handle = endpoint.submit(Command::new(CommandType::Incr).arg("counter"));
    endpoint.close();

    assert_eq!(
        handle.get().await,
        Err(MiniRedisCommandError::Write(MiniRedisWriteError::Disconnect))
    );
}

#[tokio::test]
async fn cancelled_while_in_flight_stays_cancelled() {
    let (writer, mut receiver) = channel(4).unwrap();
    let options = ClientOptions::builder()
        .disconnected_behavior(DisconnectedBehavior::RejectCommands)
        .build()
        .unwrap();
    let endpoint = Endpoint::new(options, writer).unwrap();
    endpoint.on_connected();

    let handle = endpoint.submit(Command::new(CommandType::Get).arg("slow"));
    let in_flight = receiver.recv().await.unwrap();

    assert!(handle.cancel());
    assert!(!in_flight.complete(Frame::Null));
    assert_eq!(handle.get().await, Err(MiniRedisCommandError::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn every_handle_resolves_across_flapping() {
    let (writer, receiver) = channel(256).unwrap();
    let endpoint = Arc::new(Endpoint::new(ClientOptions::default(), writer).unwrap());
    spawn_transport(receiver);

    let flapper = {
        let endpoint = endpoint.clone();
        tokio::spawn(async move {
            for _ in 0..10 {
                endpoint.on_connected();
                tokio::time::sleep(Duration::from_millis(2)).await;
                endpoint.on_disconnected();
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
    };

    let mut handles = Vec::new();
    for i in 0..100u32 {
        handles.push(endpoint.submit(Command::new(CommandType::Ping).arg(i.to_string())));
        tokio::task::yield_now().await;
    }

    flapper.await.unwrap();
    endpoint.close();

    for handle in handles {
        let outcome = handle
            .get_timeout(Duration::from_secs(5))
            .await
            .expect("command left pending");
        assert_eq!(outcome, Ok(Frame::Simple("PONG".into())));
    }
}
