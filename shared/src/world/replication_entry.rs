use std::collections::HashSet;

use crate::{ClientId, Frame, NetworkObjectRole, ObjectId, TypeKey};

/// Replication metadata kept for every registered object
#[derive(Clone, Debug)]
pub struct ReplicationEntry {
    pub object_id: ObjectId,
    pub type_key: TypeKey,
    pub owner_client_id: Option<ClientId>,
    pub role: NetworkObjectRole,
    pub parent: Option<ObjectId>,
    pub dirty: bool,
    pub spawned: bool,
    /// Built locally from a Spawn message rather than added by the application
    pub is_mirror: bool,
    /// Subset the object was spawned to, `None` for every participant
    pub target_clients: Option<HashSet<ClientId>>,
    /// Remote participants known to hold a mirror
    pub mirrored_on: HashSet<ClientId>,
    /// Frame of the newest state applied from the owner
    pub last_owner_frame: Option<Frame>,
    /// State received from a client owner that still has to be forwarded
    pub relay_pending: bool,
}

impl ReplicationEntry {
    pub fn new(object_id: ObjectId, type_key: TypeKey, parent: Option<ObjectId>) -> Self {
        Self {
            object_id,
            type_key,
            owner_client_id: None,
            role: NetworkObjectRole::None,
            parent,
            dirty: false,
            spawned: false,
            is_mirror: false,
            target_clients: None,
            mirrored_on: HashSet::new(),
            last_owner_frame: None,
            relay_pending: false,
        }
    }

    pub fn is_owned_by(&self, client_id: ClientId) -> bool {
        self.owner_client_id == Some(client_id)
    }

    /// Whether `client_id` was included when the object was spawned
    pub fn is_targeted(&self, client_id: ClientId) -> bool {
        match &self.target_clients {
            Some(targets) => targets.contains(&client_id),
            None => true,
        }
    }

    /// Every participant that has to hear about changes to this object
    pub fn audience(&self) -> Vec<ClientId> {
        let mut audience: Vec<ClientId> = self.mirrored_on.iter().copied().collect();
        if let Some(owner) = self.owner_client_id {
            audience.push(owner);
        }
        audience
    }
}
