/// Test protocol for E2E testing: a few replicated types and their RPCs

use replica_shared::{
    ChannelType, ClientId, NetworkSerialize, NetworkStream, Protocol, SerdeErr,
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl NetworkSerialize for Position {
    fn serialize(&self, stream: &mut NetworkStream) {
        stream.write(&self.x);
        stream.write(&self.y);
    }

    fn deserialize(&mut self, stream: &mut NetworkStream) -> Result<(), SerdeErr> {
        self.x = stream.read()?;
        self.y = stream.read()?;
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Player {
    pub name: String,
    pub health: u16,
    /// Local only, set by the `Ping` RPC
    pub last_pinged_by: Option<ClientId>,
}

impl Player {
    pub fn new(name: &str, health: u16) -> Self {
        Self {
            name: name.to_string(),
            health,
            last_pinged_by: None,
        }
    }
}

impl NetworkSerialize for Player {
    fn serialize(&self, stream: &mut NetworkStream) {
        stream.write(&self.name);
        stream.write(&self.health);
    }

    fn deserialize(&mut self, stream: &mut NetworkStream) -> Result<(), SerdeErr> {
        // read into temporaries so a short stream leaves the player untouched
        let name: String = stream.read()?;
        let health: u16 = stream.read()?;
        self.name = name;
        self.health = health;
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Weapon {
    pub damage: u32,
}

impl NetworkSerialize for Weapon {
    fn serialize(&self, stream: &mut NetworkStream) {
        stream.write(&self.damage);
    }

    fn deserialize(&mut self, stream: &mut NetworkStream) -> Result<(), SerdeErr> {
        self.damage = stream.read()?;
        Ok(())
    }
}

/// Client to server: move by `(dx, dy)`
pub const MOVE: &str = "Move";
/// Server to clients: jump to `(x, y)`
pub const TELEPORT: &str = "Teleport";
/// Either direction: remember who called
pub const PING: &str = "Ping";

pub fn protocol() -> Protocol {
    Protocol::builder()
        .add_serializable::<Position>()
        .add_serializable::<Player>()
        .add_serializable::<Weapon>()
        .add_rpc_for::<Position, _>(MOVE, false, true, ChannelType::ReliableOrdered, |position, args, _| {
            let dx: f32 = args.read()?;
            let dy: f32 = args.read()?;
            position.x += dx;
            position.y += dy;
            Ok(())
        })
        .add_rpc_for::<Position, _>(TELEPORT, true, false, ChannelType::Reliable, |position, args, _| {
            position.x = args.read()?;
            position.y = args.read()?;
            Ok(())
        })
        .add_rpc_for::<Player, _>(PING, true, true, ChannelType::Unreliable, |player, _, context| {
            player.last_pinged_by = Some(context.sender);
            Ok(())
        })
        .build()
}
