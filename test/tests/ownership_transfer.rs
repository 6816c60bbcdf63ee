/// Ownership changes across participants, including hierarchical hand-over

use replica_shared::{
    NetworkObjectRole, OwnershipChangeMessage, ReplicationError, ReplicationMessage,
    SERVER_CLIENT_ID,
};
use replica_test::{Player, Position, TestNetwork, Weapon};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A owns O (child C) and hands both to B
#[test]
fn hierarchical_hand_over_between_clients() {
    init_logger();
    let mut network = TestNetwork::new(2);
    let a = network.client_mut(1);
    let o = a.create_and_spawn(Player::new("o", 50));
    let c = a.create(Weapon { damage: 7 }, Some(o));
    a.replicator.try_spawn_object(&mut a.world, c, None).unwrap();
    network.settle();

    network
        .client_mut(1)
        .replicator
        .try_set_object_ownership(o, 2, NetworkObjectRole::Replicated, true)
        .unwrap();
    network.settle();

    for object_id in [o, c] {
        assert_eq!(network.client(1).owner(object_id), Some(2));
        assert_eq!(network.client(1).role(object_id), NetworkObjectRole::Replicated);
        assert_eq!(network.server.owner(object_id), Some(2));
        assert_eq!(network.server.role(object_id), NetworkObjectRole::Replicated);
        assert_eq!(network.client(2).owner(object_id), Some(2));
        assert_eq!(network.client(2).role(object_id), NetworkObjectRole::OwnedAuthoritative);
    }
}

#[test]
fn new_owner_drives_state_after_hand_over() {
    init_logger();
    let mut network = TestNetwork::new(2);
    let object_id = network.client_mut(1).create_and_spawn(Position::new(0.0, 0.0));
    network.settle();
    network
        .client_mut(1)
        .replicator
        .try_set_object_ownership(object_id, 2, NetworkObjectRole::Replicated, false)
        .unwrap();
    network.settle();

    let b = network.client_mut(2);
    *b.get_mut::<Position>(object_id).unwrap() = Position::new(9.0, 9.0);
    b.replicator.try_dirty_object(object_id).unwrap();
    network.settle();

    assert_eq!(network.server.get::<Position>(object_id), Some(&Position::new(9.0, 9.0)));
    assert_eq!(network.client(1).get::<Position>(object_id), Some(&Position::new(9.0, 9.0)));
}

#[test]
fn server_assigns_ownership_before_spawning() {
    init_logger();
    let mut network = TestNetwork::new(2);
    let object_id = network.server.create(Player::new("avatar", 100), None);
    network
        .server
        .replicator
        .try_set_object_ownership(object_id, 1, NetworkObjectRole::Replicated, false)
        .unwrap();
    network
        .server
        .replicator
        .try_spawn_object(&mut network.server.world, object_id, None)
        .unwrap();
    network.settle();

    assert!(network.client(1).replicator.is_object_owned(object_id));
    assert_eq!(network.client(2).role(object_id), NetworkObjectRole::Replicated);
    assert_eq!(network.client(2).owner(object_id), Some(1));
}

#[test]
fn server_reclaims_a_client_object() {
    init_logger();
    let mut network = TestNetwork::new(2);
    let object_id = network.client_mut(1).create_and_spawn(Position::default());
    network.settle();

    network
        .server
        .replicator
        .try_set_object_ownership(
            object_id,
            SERVER_CLIENT_ID,
            NetworkObjectRole::OwnedAuthoritative,
            false,
        )
        .unwrap();
    network.settle();

    assert_eq!(network.client(1).owner(object_id), Some(SERVER_CLIENT_ID));
    assert_eq!(network.client(1).role(object_id), NetworkObjectRole::Replicated);
    assert_eq!(network.client(2).owner(object_id), Some(SERVER_CLIENT_ID));
}

#[test]
fn forged_ownership_change_is_rejected() {
    init_logger();
    let mut network = TestNetwork::new(2);
    let object_id = network.client_mut(1).create_and_spawn(Position::default());
    network.settle();

    let forged = ReplicationMessage::OwnershipChange(OwnershipChangeMessage {
        object_id,
        new_owner_client_id: 2,
        new_role: NetworkObjectRole::Replicated,
        hierarchical: false,
    });
    network.hub.inject(SERVER_CLIENT_ID, 2, &forged);
    network.settle();

    assert_eq!(network.server.owner(object_id), Some(1));
    assert_eq!(network.client(2).owner(object_id), Some(1));
    assert!(network.client(1).replicator.is_object_owned(object_id));
}

#[test]
fn non_owner_client_cannot_hand_over() {
    init_logger();
    let mut network = TestNetwork::new(2);
    let object_id = network.server.create_and_spawn(Position::default());
    network.settle();

    let result = network.client_mut(1).replicator.try_set_object_ownership(
        object_id,
        2,
        NetworkObjectRole::Replicated,
        false,
    );

    assert!(matches!(result, Err(ReplicationError::AuthorityViolation { .. })));
    assert_eq!(network.client(1).owner(object_id), Some(SERVER_CLIENT_ID));
}

#[test]
fn at_most_one_authoritative_participant() {
    init_logger();
    let mut network = TestNetwork::new(3);
    let object_id = network.client_mut(1).create_and_spawn(Player::new("baton", 1));
    network.settle();

    for next_owner in [2, 3, 1] {
        let current = network
            .clients
            .iter()
            .find(|client| client.replicator.is_object_owned(object_id))
            .map(|client| client.client_id)
            .expect("someone owns the object");
        network
            .client_mut(current)
            .replicator
            .try_set_object_ownership(object_id, next_owner, NetworkObjectRole::Replicated, false)
            .unwrap();
        network.settle();

        let owners: Vec<_> = network
            .clients
            .iter()
            .filter(|client| client.replicator.is_object_owned(object_id))
            .map(|client| client.client_id)
            .collect();
        assert_eq!(owners, vec![next_owner]);
        assert!(!network.server.replicator.is_object_owned(object_id));
    }
}

#[test]
fn server_hand_over_requires_a_mirror_on_the_new_owner() {
    init_logger();
    let mut network = TestNetwork::new(2);
    let object_id = network.server.create(Position::new(3.0, 3.0), None);
    network
        .server
        .replicator
        .try_spawn_object(&mut network.server.world, object_id, Some(&[1][..]))
        .unwrap();
    network.settle();

    let result = network.server.replicator.try_set_object_ownership(
        object_id,
        2,
        NetworkObjectRole::Replicated,
        false,
    );
    network.settle();

    assert_eq!(
        result,
        Err(ReplicationError::OwnerWithoutMirror {
            object_id,
            client_id: 2,
        })
    );
    assert!(network.server.replicator.is_object_owned(object_id));
    assert_eq!(network.client(1).owner(object_id), Some(SERVER_CLIENT_ID));

    // once the client holds a mirror the hand-over goes through
    network
        .server
        .replicator
        .try_spawn_object(&mut network.server.world, object_id, Some(&[2][..]))
        .unwrap();
    network
        .server
        .replicator
        .try_set_object_ownership(object_id, 2, NetworkObjectRole::Replicated, false)
        .unwrap();
    network.settle();

    assert!(network.client(2).replicator.is_object_owned(object_id));
    assert_eq!(network.client(1).owner(object_id), Some(2));
    assert_eq!(network.server.owner(object_id), Some(2));
}

/// A client owner cannot see who holds mirrors, so the server introduces the
/// object to a new owner that has none
#[test]
fn client_hand_over_spawns_to_an_unmirrored_owner() {
    init_logger();
    let mut network = TestNetwork::new(2);
    let a = network.client_mut(1);
    let o = a.create(Player::new("o", 10), None);
    a.replicator
        .try_spawn_object(&mut a.world, o, Some(&[][..]))
        .unwrap();
    let c = a.create(Weapon { damage: 4 }, Some(o));
    a.replicator
        .try_spawn_object(&mut a.world, c, Some(&[][..]))
        .unwrap();
    network.settle();
    assert!(!network.client(2).replicator.has_object(o));

    network
        .client_mut(1)
        .replicator
        .try_set_object_ownership(o, 2, NetworkObjectRole::Replicated, true)
        .unwrap();
    network.settle();

    let b = network.client(2);
    assert_eq!(b.get::<Player>(o), Some(&Player::new("o", 10)));
    assert_eq!(b.get::<Weapon>(c), Some(&Weapon { damage: 4 }));
    for object_id in [o, c] {
        assert!(b.replicator.is_object_owned(object_id));
        assert_eq!(network.server.owner(object_id), Some(2));
        assert_eq!(network.client(1).role(object_id), NetworkObjectRole::Replicated);
    }

    // the new owner's state flows back to the former one
    let b = network.client_mut(2);
    b.get_mut::<Player>(o).unwrap().health = 55;
    b.replicator.try_dirty_object(o).unwrap();
    network.settle();

    assert_eq!(network.client(1).get::<Player>(o).map(|player| player.health), Some(55));
}
