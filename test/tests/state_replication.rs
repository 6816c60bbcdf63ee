/// Dirty-state sweep and inbound state handling

use replica_shared::{
    ChannelType, Frame, NetworkObjectRole, NetworkSerialize, NetworkStream, ReplicationMessage,
    StateDeltaMessage, SERVER_CLIENT_ID,
};
use replica_test::{Player, Position, TestNetwork};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn position_state(position: &Position) -> Vec<u8> {
    let mut stream = NetworkStream::new();
    position.serialize(&mut stream);
    stream.into_bytes()
}

fn state_delta(object_id: replica_shared::ObjectId, frame: Frame, position: &Position) -> ReplicationMessage {
    ReplicationMessage::StateDelta(StateDeltaMessage {
        object_id,
        frame,
        state: position_state(position),
    })
}

#[test]
fn dirty_owner_state_reaches_mirrors() {
    init_logger();
    let mut network = TestNetwork::new(2);
    let object_id = network.server.create_and_spawn(Player::new("hp", 100));
    network.settle();

    network.server.get_mut::<Player>(object_id).unwrap().health = 42;
    network.server.replicator.dirty_object(object_id);
    network.settle();

    for client in &network.clients {
        assert_eq!(client.get::<Player>(object_id).map(|player| player.health), Some(42));
    }
}

#[test]
fn clean_objects_are_not_sent() {
    init_logger();
    let mut network = TestNetwork::new(1);
    let object_id = network.server.create_and_spawn(Position::default());
    network.settle();
    network.hub.clear_history();

    network.server.get_mut::<Position>(object_id).unwrap().x = 5.0;
    network.settle();

    assert!(network.hub.history().is_empty());
    assert_eq!(network.client(1).get::<Position>(object_id), Some(&Position::default()));
}

#[test]
fn state_travels_on_the_state_channel() {
    init_logger();
    let mut network = TestNetwork::new(1);
    let object_id = network.server.create_and_spawn(Position::default());
    network.settle();
    network.hub.clear_history();

    network.server.replicator.dirty_object(object_id);
    network.tick_all();

    let history = network.hub.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].channel, ChannelType::Unreliable);
    assert!(matches!(history[0].message, ReplicationMessage::StateDelta(_)));
}

#[test]
fn client_owner_state_is_relayed_but_not_echoed() {
    init_logger();
    let mut network = TestNetwork::new(3);
    let object_id = network.client_mut(1).create_and_spawn(Position::new(0.0, 0.0));
    network.settle();
    network.hub.clear_history();

    let owner = network.client_mut(1);
    *owner.get_mut::<Position>(object_id).unwrap() = Position::new(3.0, -1.0);
    owner.replicator.dirty_object(object_id);
    network.settle();

    assert_eq!(network.server.get::<Position>(object_id), Some(&Position::new(3.0, -1.0)));
    assert_eq!(network.client(2).get::<Position>(object_id), Some(&Position::new(3.0, -1.0)));
    assert_eq!(network.client(3).get::<Position>(object_id), Some(&Position::new(3.0, -1.0)));
    assert!(network.hub.delivered_to(1).is_empty());
}

/// No inbound state ever changes an object the receiver owns
#[test]
fn owned_objects_ignore_inbound_state() {
    init_logger();
    let mut network = TestNetwork::new(1);
    let object_id = network.client_mut(1).create_and_spawn(Position::new(1.0, 2.0));
    network.settle();

    for frame in 1..20 {
        let forged = state_delta(object_id, frame, &Position::new(frame as f32, 0.0));
        network.hub.inject(1, SERVER_CLIENT_ID, &forged);
    }
    network.settle();

    let owner = network.client(1);
    assert_eq!(owner.get::<Position>(object_id), Some(&Position::new(1.0, 2.0)));
    assert_eq!(owner.role(object_id), NetworkObjectRole::OwnedAuthoritative);
}

#[test]
fn stale_frames_are_dropped() {
    init_logger();
    let mut network = TestNetwork::new(1);
    let object_id = network.server.create_and_spawn(Position::default());
    network.settle();

    network
        .hub
        .inject(1, SERVER_CLIENT_ID, &state_delta(object_id, 1_000, &Position::new(10.0, 10.0)));
    network
        .hub
        .inject(1, SERVER_CLIENT_ID, &state_delta(object_id, 999, &Position::new(5.0, 5.0)));
    network.settle();

    assert_eq!(network.client(1).get::<Position>(object_id), Some(&Position::new(10.0, 10.0)));
}

#[test]
fn frames_stay_ordered_across_the_wrap() {
    init_logger();
    let mut network = TestNetwork::new(1);
    let object_id = network.server.create_and_spawn(Position::default());
    network.settle();

    network
        .hub
        .inject(1, SERVER_CLIENT_ID, &state_delta(object_id, Frame::MAX - 1, &Position::new(1.0, 1.0)));
    network
        .hub
        .inject(1, SERVER_CLIENT_ID, &state_delta(object_id, 2, &Position::new(2.0, 2.0)));
    network
        .hub
        .inject(1, SERVER_CLIENT_ID, &state_delta(object_id, Frame::MAX, &Position::new(3.0, 3.0)));
    network.settle();

    assert_eq!(network.client(1).get::<Position>(object_id), Some(&Position::new(2.0, 2.0)));
}

#[test]
fn state_from_a_non_owner_is_rejected() {
    init_logger();
    let mut network = TestNetwork::new(2);
    let object_id = network.client_mut(1).create_and_spawn(Position::new(1.0, 1.0));
    network.settle();

    network
        .hub
        .inject(SERVER_CLIENT_ID, 2, &state_delta(object_id, 50, &Position::new(-7.0, -7.0)));
    network.settle();

    assert_eq!(network.server.get::<Position>(object_id), Some(&Position::new(1.0, 1.0)));
    assert_eq!(network.client(2).get::<Position>(object_id), Some(&Position::new(1.0, 1.0)));
}

#[test]
fn simulated_client_state_never_becomes_authoritative() {
    init_logger();
    let mut network = TestNetwork::new(2);
    let object_id = network.client_mut(1).create_and_spawn(Position::new(0.0, 0.0));
    network.settle();

    let predictor = network.client_mut(2);
    predictor
        .replicator
        .try_set_object_ownership(object_id, 1, NetworkObjectRole::ReplicatedSimulated, false)
        .unwrap();
    *predictor.get_mut::<Position>(object_id).unwrap() = Position::new(8.0, 8.0);
    predictor.replicator.dirty_object(object_id);
    network.settle();

    assert_eq!(network.server.get::<Position>(object_id), Some(&Position::new(0.0, 0.0)));
    assert_eq!(network.client(1).get::<Position>(object_id), Some(&Position::new(0.0, 0.0)));

    // the owner's next update overrides the prediction
    let owner = network.client_mut(1);
    *owner.get_mut::<Position>(object_id).unwrap() = Position::new(1.0, 0.0);
    owner.replicator.dirty_object(object_id);
    network.settle();

    assert_eq!(network.client(2).get::<Position>(object_id), Some(&Position::new(1.0, 0.0)));
}

#[test]
fn server_prediction_never_reaches_mirrors() {
    init_logger();
    let mut network = TestNetwork::new(2);
    let object_id = network.client_mut(1).create_and_spawn(Position::new(1.0, 1.0));
    network.settle();

    network
        .server
        .replicator
        .try_set_object_ownership(object_id, 1, NetworkObjectRole::ReplicatedSimulated, false)
        .unwrap();
    *network.server.get_mut::<Position>(object_id).unwrap() = Position::new(99.0, 99.0);
    network.server.replicator.dirty_object(object_id);
    network.hub.clear_history();
    network.settle();

    assert!(network.hub.history().is_empty());
    for client in &network.clients {
        assert_eq!(client.get::<Position>(object_id), Some(&Position::new(1.0, 1.0)));
    }

    // the owner's next update still reaches every mirror through the server
    let owner = network.client_mut(1);
    *owner.get_mut::<Position>(object_id).unwrap() = Position::new(4.0, 4.0);
    owner.replicator.dirty_object(object_id);
    network.settle();

    assert_eq!(network.server.get::<Position>(object_id), Some(&Position::new(4.0, 4.0)));
    assert_eq!(network.client(2).get::<Position>(object_id), Some(&Position::new(4.0, 4.0)));
}

#[test]
fn state_for_despawned_objects_is_dropped() {
    init_logger();
    let mut network = TestNetwork::new(1);
    let object_id = network.server.create_and_spawn(Position::default());
    network.settle();
    network.server.replicator.try_despawn_object(object_id).unwrap();
    network.settle();

    network
        .hub
        .inject(1, SERVER_CLIENT_ID, &state_delta(object_id, 10_000, &Position::new(1.0, 1.0)));
    network.settle();

    assert!(!network.client(1).world.contains(object_id));
    assert!(!network.client(1).replicator.has_object(object_id));
}

#[test]
fn lost_state_is_superseded_by_the_next_update() {
    init_logger();
    let mut network = TestNetwork::new(1);
    let object_id = network.server.create_and_spawn(Player::new("lossy", 10));
    network.settle();

    network.hub.drop_channel(ChannelType::Unreliable);
    network.server.get_mut::<Player>(object_id).unwrap().health = 11;
    network.server.replicator.dirty_object(object_id);
    network.settle();
    assert_eq!(network.client(1).get::<Player>(object_id).map(|player| player.health), Some(10));

    network.hub.restore_channel(ChannelType::Unreliable);
    network.server.get_mut::<Player>(object_id).unwrap().health = 12;
    network.server.replicator.dirty_object(object_id);
    network.settle();
    assert_eq!(network.client(1).get::<Player>(object_id).map(|player| player.health), Some(12));
}
