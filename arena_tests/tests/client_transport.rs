//! Socket-based tests: fake game server → framed TCP → client core.

use std::time::Duration;

use arena_client::client::{pump, MessageSource, ReplaySource, TcpSource};
use arena_client::input::InputFrame;
use arena_client::sync::EntityKey;
use arena_shared::math::Vec2;
use arena_shared::net::{encode_message, ServerMessage};
use arena_tests::{game_state, headless_client, init_tracing, player, serve_script};
use tokio::sync::mpsc;

#[tokio::test]
async fn tcp_session_drives_entities_and_clears_on_close() -> anyhow::Result<()> {
    init_tracing();

    let script = vec![
        ServerMessage::MapState,
        game_state(1, vec![player("p1", Vec2::ZERO, Vec2::ZERO)], vec![]),
        game_state(
            2,
            vec![
                player("p1", Vec2::ZERO, Vec2::new(50.0, 0.0)),
                player("p2", Vec2::ZERO, Vec2::ZERO),
            ],
            vec![],
        ),
    ];
    let (addr, server) = serve_script(script).await?;

    let source = TcpSource::connect(&addr.to_string()).await?;
    let (tx, mut rx) = mpsc::channel(16);
    let network = tokio::spawn(pump(source, tx));

    let mut client = headless_client();
    while let Some(msg) = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await? {
        client.push_message(msg);
    }
    client.tick(100.0, &InputFrame::default());

    server.await??;
    assert_eq!(network.await??, 3);

    let p1 = client
        .router()
        .avatars()
        .get(&EntityKey::new("p1"))
        .expect("p1 live");
    assert!(p1.position().x > 0.0);
    assert!(client.router().avatars().get(&EntityKey::new("p2")).is_none());

    client.disconnect();
    assert_eq!(client.scene().live(), 0);
    Ok(())
}

#[tokio::test]
async fn replay_file_is_read_in_order() -> anyhow::Result<()> {
    init_tracing();

    let path = std::env::temp_dir().join(format!("arena-replay-{}.jsonl", std::process::id()));
    let mut text = String::new();
    for msg in [
        game_state(1, vec![player("a", Vec2::ZERO, Vec2::ZERO)], vec![]),
        game_state(2, vec![player("a", Vec2::ZERO, Vec2::ZERO)], vec![]),
        ServerMessage::GameEnd,
    ] {
        text.push_str(std::str::from_utf8(&encode_message(&msg)?)?);
        text.push('\n');
    }
    text.push_str("not json\n\n");
    tokio::fs::write(&path, text).await?;

    let mut source = ReplaySource::open(&path, Duration::ZERO).await?;
    let mut kinds = Vec::new();
    while let Some(msg) = source.next_message().await? {
        kinds.push(msg.kind());
    }
    assert_eq!(kinds, vec![1, 1, 5]);

    tokio::fs::remove_file(&path).await?;
    Ok(())
}
