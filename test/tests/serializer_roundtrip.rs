/// Registered serializers carry object state through a stream unchanged

use proptest::prelude::*;

use replica_shared::{NetworkStream, SerializeMode, TypeKey};
use replica_test::{protocol, Player, Position, Weapon};

fn round_trip<T: Default + 'static>(value: &mut T) -> T {
    let protocol = protocol();
    let type_key = TypeKey::of::<T>();
    let mut stream = NetworkStream::new();
    protocol
        .serializers()
        .invoke_serializer(&type_key, value, &mut stream, SerializeMode::Serialize)
        .unwrap();

    let mut received = T::default();
    protocol
        .serializers()
        .invoke_serializer(&type_key, &mut received, &mut stream, SerializeMode::Deserialize)
        .unwrap();
    assert_eq!(stream.remaining(), 0);
    received
}

proptest! {
    #[test]
    fn positions_survive(x in any::<f32>().prop_filter("comparable", |v| !v.is_nan()),
                         y in any::<f32>().prop_filter("comparable", |v| !v.is_nan())) {
        let mut position = Position::new(x, y);
        prop_assert_eq!(round_trip(&mut position), position);
    }

    #[test]
    fn players_survive(name in ".{0,40}", health in any::<u16>()) {
        let mut player = Player::new(&name, health);
        prop_assert_eq!(round_trip(&mut player), player);
    }

    #[test]
    fn weapons_survive(damage in any::<u32>()) {
        let mut weapon = Weapon { damage };
        prop_assert_eq!(round_trip(&mut weapon), weapon);
    }

    #[test]
    fn truncated_player_state_is_rejected(name in ".{1,40}", health in any::<u16>(), cut in 1usize..3) {
        let protocol = protocol();
        let type_key = TypeKey::of::<Player>();
        let mut player = Player::new(&name, health);
        let mut stream = NetworkStream::new();
        protocol
            .serializers()
            .invoke_serializer(&type_key, &mut player, &mut stream, SerializeMode::Serialize)
            .unwrap();

        let bytes = stream.into_bytes();
        let mut short = NetworkStream::from_bytes(bytes[..bytes.len() - cut].to_vec());
        let mut received = Player::new("untouched", 7);
        let result = protocol.serializers().invoke_serializer(
            &type_key,
            &mut received,
            &mut short,
            SerializeMode::Deserialize,
        );

        prop_assert!(result.is_err());
        prop_assert_eq!(received, Player::new("untouched", 7));
        // a failed read leaves the stream where it started
        prop_assert_eq!(short.read_position(), 0);
    }
}

#[test]
fn local_only_fields_are_not_replicated() {
    let mut player = Player::new("ann", 90);
    player.last_pinged_by = Some(3);

    let received = round_trip(&mut player);

    assert_eq!(received.name, "ann");
    assert_eq!(received.health, 90);
    assert_eq!(received.last_pinged_by, None);
}
