//! End-to-end properties of snapshot diffing and interpolation, driven
//! through the client shell.

use std::collections::BTreeSet;

use arena_client::input::InputFrame;
use arena_client::sync::EntityKey;
use arena_shared::math::Vec2;
use arena_shared::net::{decode_message, ServerMessage, WirePlayer};
use arena_tests::{coin, game_state, headless_client, player, projectile};

fn avatar_keys(c: &arena_client::GameClient<arena_shared::render::HeadlessScene>) -> BTreeSet<String> {
    c.router()
        .avatars()
        .keys()
        .map(|k| k.as_str().to_string())
        .collect()
}

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn live_keys_match_previous_payload() {
    let mut c = headless_client();
    let still = |n: &str| player(n, Vec2::ZERO, Vec2::ZERO);
    let payloads: Vec<Vec<WirePlayer>> = vec![
        vec![still("a"), still("b")],
        vec![still("b"), still("c"), still("d")],
        vec![],
        vec![still("a")],
        vec![still("a"), still("e")],
    ];

    let mut previous = BTreeSet::new();
    for (i, players) in payloads.into_iter().enumerate() {
        let keys: BTreeSet<String> = players.iter().filter_map(|p| p.name.clone()).collect();
        c.push_message(game_state(i as u32 + 10, players, vec![]));
        c.tick(16.0, &InputFrame::default());
        assert_eq!(avatar_keys(&c), previous, "after payload {i}");
        previous = keys;
    }
}

#[test]
fn steady_payload_creates_nothing_new() {
    let mut c = headless_client();
    let payload = || vec![player("a", Vec2::ZERO, Vec2::ZERO), player("b", Vec2::ZERO, Vec2::ZERO)];
    for tick in 0..2 {
        c.push_message(game_state(tick + 10, payload(), vec![coin("c1", Vec2::ZERO)]));
        c.tick(16.0, &InputFrame::default());
    }
    let spawned = c.scene().spawned();

    for tick in 2..6 {
        c.push_message(game_state(tick + 10, payload(), vec![coin("c1", Vec2::ZERO)]));
        c.tick(16.0, &InputFrame::default());
    }
    assert_eq!(c.scene().spawned(), spawned);
    assert_eq!(c.scene().despawned(), 0);
}

#[test]
fn avatar_starts_moving_then_leaves() {
    let mut c = headless_client();
    let key = EntityKey::new("p1");

    c.push_message(game_state(10, vec![player("p1", Vec2::ZERO, Vec2::ZERO)], vec![]));
    c.tick(16.0, &InputFrame::default());
    assert!(c.router().avatars().is_empty());

    c.push_message(game_state(
        11,
        vec![player("p1", Vec2::ZERO, Vec2::new(10.0, 0.0))],
        vec![],
    ));
    c.tick(0.0, &InputFrame::default());
    let p1 = c.router().avatars().get(&key).expect("p1 created");
    assert_eq!(p1.position(), Vec2::ZERO);
    assert_eq!(p1.destination(), Vec2::new(10.0, 0.0));

    // 34.5 units/s: 10 units take a bit under 300 ms.
    let mut last = 0.0;
    for _ in 0..10 {
        c.tick(16.0, &InputFrame::default());
        let x = c.router().avatars().get(&key).unwrap().position().x;
        assert!(x >= last && x <= 10.0);
        last = x;
    }
    assert!(last > 0.0 && last < 10.0);
    for _ in 0..30 {
        c.tick(16.0, &InputFrame::default());
    }
    assert_eq!(
        c.router().avatars().get(&key).unwrap().position(),
        Vec2::new(10.0, 0.0)
    );

    c.push_message(game_state(12, vec![], vec![]));
    c.tick(16.0, &InputFrame::default());
    assert!(c.router().avatars().get(&key).is_some());

    c.push_message(game_state(13, vec![], vec![]));
    c.tick(16.0, &InputFrame::default());
    assert!(c.router().avatars().is_empty());
    assert_eq!(c.scene().live(), 0);
}

#[test]
fn stationary_projectile_lands_exactly_once() {
    let mut c = headless_client();
    let here = Vec2::new(5.0, 5.0);
    let mut owner = player("p1", Vec2::ZERO, Vec2::ZERO);
    owner.projectiles = vec![projectile("b1", here, here)];

    c.push_message(game_state(10, vec![owner.clone()], vec![]));
    c.push_message(game_state(11, vec![owner.clone()], vec![]));
    c.tick(16.0, &InputFrame::default());

    // Created and landed within the same frame; only the avatar and its blade remain.
    assert_eq!(c.router().projectiles().len(), 1);
    assert!(c.router().projectiles().get(&EntityKey::new("b1")).is_none());
    assert_eq!(c.scene().live(), 2);
    let despawned = c.scene().despawned();
    assert_eq!(despawned, 1);

    for tick in 12..16 {
        c.push_message(game_state(tick, vec![owner.clone()], vec![]));
        c.tick(16.0, &InputFrame::default());
    }
    assert_eq!(c.scene().despawned(), despawned);

    c.push_message(game_state(16, vec![player("p1", Vec2::ZERO, Vec2::ZERO)], vec![]));
    c.tick(16.0, &InputFrame::default());
    c.push_message(game_state(17, vec![player("p1", Vec2::ZERO, Vec2::ZERO)], vec![]));
    c.tick(16.0, &InputFrame::default());
    assert!(c.router().projectiles().is_empty());
    assert_eq!(c.scene().despawned(), despawned);
}

#[test]
fn projectile_flies_to_destination_then_vanishes() {
    let mut c = headless_client();
    let mut owner = player("p1", Vec2::ZERO, Vec2::ZERO);
    owner.projectiles = vec![projectile("b1", Vec2::ZERO, Vec2::new(90.0, 0.0))];
    c.push_message(game_state(10, vec![owner.clone()], vec![]));
    c.push_message(game_state(11, vec![owner], vec![]));

    c.tick(500.0, &InputFrame::default());
    let b1 = c.router().projectiles().get(&EntityKey::new("b1")).unwrap();
    assert!(b1.position().approx_eq(Vec2::new(45.0, 0.0), 1e-3));

    c.tick(600.0, &InputFrame::default());
    assert!(c.router().projectiles().get(&EntityKey::new("b1")).is_none());
}

#[test]
fn game_end_then_new_game_starts_clean() {
    let mut c = headless_client();
    let players = vec![player("p1", Vec2::ZERO, Vec2::ZERO)];
    c.push_message(game_state(10, players.clone(), vec![coin("c", Vec2::ZERO)]));
    c.push_message(game_state(11, players.clone(), vec![coin("c", Vec2::ZERO)]));
    c.push_message(ServerMessage::GameEnd);
    c.tick(16.0, &InputFrame::default());
    assert_eq!(c.scene().live(), 0);

    // The staged generation was dropped with the clear: nothing comes back.
    c.push_message(game_state(1, players.clone(), vec![]));
    c.tick(16.0, &InputFrame::default());
    assert!(c.router().avatars().is_empty());

    c.push_message(game_state(2, players, vec![]));
    c.tick(16.0, &InputFrame::default());
    assert_eq!(c.router().avatars().len(), 1);
}

#[test]
fn mistyped_player_does_not_cost_the_tick() -> anyhow::Result<()> {
    let mut c = headless_client();
    for tick in 10..12 {
        let raw = format!(
            r#"{{"type": 1, "tick": {tick}, "players": [
                {{"name": "good", "pos": {{"x": 4.0, "y": 2.0}}}},
                {{"name": "bad", "pos": {{"x": "oops", "y": 0}}}}
            ]}}"#
        );
        c.push_message(decode_message(raw.as_bytes())?);
    }
    c.tick(16.0, &InputFrame::default());

    let good = c.router().avatars().get(&EntityKey::new("good"));
    assert_eq!(good.map(|a| a.position()), Some(Vec2::new(4.0, 2.0)));
    assert_eq!(c.router().avatars().len(), 1);
    Ok(())
}
