//! Full socket-based integration tests for client ↔ server communication.

use std::net::SocketAddr;
use std::time::Duration;

use sim_client::input::InputState;
use sim_client::GameClient;
use sim_server::server::bind_ephemeral;
use sim_shared::math::{Transform, Vec3};
use sim_shared::net::{
    decode_from_bytes, encode_to_bytes, ClientId, NetMsg, ReliableConn, PROTOCOL_VERSION,
};
use sim_shared::object::ObjectId;
use tokio::net::TcpStream;

const DT: f32 = 1.0 / 60.0;

/// Unit-style test: protocol messages roundtrip correctly.
#[test]
fn protocol_messages_roundtrip() -> anyhow::Result<()> {
    let hello = NetMsg::Hello {
        protocol: PROTOCOL_VERSION,
    };
    assert_eq!(decode_from_bytes(&encode_to_bytes(&hello)?)?, hello);

    let welcome = NetMsg::Welcome {
        client_id: ClientId(1),
    };
    assert_eq!(decode_from_bytes(&encode_to_bytes(&welcome)?)?, welcome);

    let pickup = NetMsg::Pickup {
        id: ObjectId(3),
        client_id: ClientId(2),
    };
    assert_eq!(decode_from_bytes(&encode_to_bytes(&pickup)?)?, pickup);

    Ok(())
}

/// Full integration: spawn server with one object, connect a client,
/// receive authoritative snapshots, pick the object up and throw it.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_server_pickup_throw_roundtrip() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();

    let (mut server, cfg) = bind_ephemeral(60).await?;
    let oid = server
        .spawn_object(Transform::from_position(Vec3::new(100.0, 0.0, 50.0)))
        .await?;

    // Handshake runs on both ends concurrently.
    let (accepted, client) = tokio::join!(server.accept_one(), GameClient::connect(&cfg));
    accepted?;
    let mut client = client?;

    let idle = InputState::default();

    // Drain the spawn announcement.
    for _ in 0..3 {
        client.frame(DT, &idle).await?;
    }
    assert!(client.objects.contains_key(&oid), "spawn not mirrored");

    // One full replication interval: the authority body falls under
    // gravity and broadcasts a snapshot.
    for _ in 0..61 {
        server.step(DT).await?;
    }
    for _ in 0..5 {
        client.frame(DT, &idle).await?;
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let obj = &client.objects[&oid];
    assert!(
        obj.true_state().transform.position.z < 50.0,
        "no authoritative snapshot applied"
    );
    // Hard snap at receipt: body equals the snapshot exactly.
    assert_eq!(obj.body.snapshot(), obj.true_state());

    // The default camera looks down +x from the origin, straight at the
    // object; a focus frame then an interact frame issues the pickup.
    client.frame(DT, &idle).await?;
    assert_eq!(client.character.focused(), Some(oid));

    let interact = InputState {
        interact: true,
        ..Default::default()
    };
    client.frame(DT, &interact).await?;
    // Membership waits for the server's confirmation.
    assert!(client.character.inventory.is_empty());

    // Server validates and multicasts the transition.
    for _ in 0..3 {
        server.step(DT).await?;
    }
    for _ in 0..5 {
        client.frame(DT, &idle).await?;
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    assert!(server.object(oid).unwrap().is_hidden());
    let obj = &client.objects[&oid];
    assert!(obj.is_hidden());
    assert!(!obj.collision_enabled());
    assert!(!obj.tick_enabled());
    assert_eq!(client.character.inventory.items(), &[oid]);
    assert_eq!(client.character.inventory.selected(), 0);

    // Throw it back out.
    let throw = InputState {
        throw: true,
        ..Default::default()
    };
    client.frame(DT, &throw).await?;
    // Still held until the multicast lands.
    assert_eq!(client.character.inventory.items(), &[oid]);

    for _ in 0..3 {
        server.step(DT).await?;
    }
    for _ in 0..5 {
        client.frame(DT, &idle).await?;
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let obj = &client.objects[&oid];
    assert!(!obj.is_hidden());
    assert!(obj.collision_enabled());
    assert!(obj.tick_enabled());
    // Velocity is exactly direction * force; the camera looked down +x.
    assert_eq!(obj.body.velocity, Vec3::new(10.0, 0.0, 0.0));
    assert!(client.character.inventory.is_empty());

    Ok(())
}

/// Only the client that holds an object may throw it; a throw request
/// from any other connection is rejected.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn throw_from_non_holder_is_rejected() -> anyhow::Result<()> {
    let (mut server, cfg) = bind_ephemeral(60).await?;
    let oid = server
        .spawn_object(Transform::from_position(Vec3::new(100.0, 0.0, 0.0)))
        .await?;

    let (accepted, client) = tokio::join!(server.accept_one(), GameClient::connect(&cfg));
    accepted?;
    let mut holder = client?;

    // Second connection driven at the protocol level.
    let addr: SocketAddr = cfg.server_addr.parse()?;
    let accept = server.accept_one();
    let connect = async {
        let stream = TcpStream::connect(addr).await?;
        let mut conn = ReliableConn::new(stream);
        conn.send(&NetMsg::Hello {
            protocol: PROTOCOL_VERSION,
        })
        .await?;
        anyhow::Ok(conn)
    };
    let (accepted, conn) = tokio::join!(accept, connect);
    accepted?;
    let mut intruder = conn?;
    let intruder_id = match intruder.recv().await? {
        NetMsg::Welcome { client_id } => client_id,
        other => anyhow::bail!("expected Welcome, got {other:?}"),
    };
    // Drain the world-state announcement.
    let _ = intruder.recv().await?;

    let idle = InputState::default();
    for _ in 0..3 {
        holder.frame(DT, &idle).await?;
    }
    holder.frame(DT, &idle).await?;
    assert_eq!(holder.character.focused(), Some(oid));
    let interact = InputState {
        interact: true,
        ..Default::default()
    };
    holder.frame(DT, &interact).await?;
    for _ in 0..3 {
        server.step(DT).await?;
    }
    assert!(server.object(oid).unwrap().is_hidden());

    // The intruder tries to throw the object the holder carries.
    intruder
        .send(&NetMsg::ThrowRequest {
            client_id: intruder_id,
            id: oid,
            position: Vec3::ZERO,
            direction: Vec3::new(1.0, 0.0, 0.0),
            force: 10.0,
        })
        .await?;
    for _ in 0..3 {
        server.step(DT).await?;
    }

    // Still held by the original client.
    assert!(server.object(oid).unwrap().is_hidden());
    Ok(())
}

/// A client that joins while an object is held receives the held state.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn late_joiner_sees_held_object() -> anyhow::Result<()> {
    let (mut server, cfg) = bind_ephemeral(60).await?;
    let oid = server
        .spawn_object(Transform::from_position(Vec3::new(100.0, 0.0, 0.0)))
        .await?;

    let (accepted, client) = tokio::join!(server.accept_one(), GameClient::connect(&cfg));
    accepted?;
    let mut first = client?;

    let idle = InputState::default();
    for _ in 0..3 {
        first.frame(DT, &idle).await?;
    }

    // First client picks the object up.
    first.frame(DT, &idle).await?;
    assert_eq!(first.character.focused(), Some(oid));
    let interact = InputState {
        interact: true,
        ..Default::default()
    };
    first.frame(DT, &interact).await?;
    for _ in 0..3 {
        server.step(DT).await?;
    }
    assert!(server.object(oid).unwrap().is_hidden());

    // Second client joins afterwards.
    let (accepted, client) = tokio::join!(server.accept_one(), GameClient::connect(&cfg));
    accepted?;
    let mut second = client?;
    for _ in 0..5 {
        second.frame(DT, &idle).await?;
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let obj = &second.objects[&oid];
    assert!(obj.is_hidden());
    assert!(!obj.collision_enabled());
    // The held flag is attributed to the first client, not the joiner.
    assert!(second.character.inventory.is_empty());

    Ok(())
}
