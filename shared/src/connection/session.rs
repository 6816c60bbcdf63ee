use std::collections::HashSet;

use log::trace;

use crate::{
    messages::replication_message::OutgoingMessage,
    transport::Transport,
    world::object_id::{ObjectId, ObjectIdGenerator},
    ClientId, HostType, SERVER_CLIENT_ID,
};

/// An active network session: who we are, who we can talk to, and how.
///
/// While no session exists every offline-tolerant operation is a no-op.
pub struct Session {
    host_type: HostType,
    local_client_id: ClientId,
    participants: HashSet<ClientId>,
    id_generator: ObjectIdGenerator,
    transport: Box<dyn Transport>,
}

impl Session {
    pub fn server(transport: Box<dyn Transport>) -> Self {
        Self::new(HostType::Server, SERVER_CLIENT_ID, transport)
    }

    pub fn client(local_client_id: ClientId, transport: Box<dyn Transport>) -> Self {
        Self::new(HostType::Client, local_client_id, transport)
    }

    fn new(host_type: HostType, local_client_id: ClientId, transport: Box<dyn Transport>) -> Self {
        let participants = HashSet::from([SERVER_CLIENT_ID, local_client_id]);
        Self {
            host_type,
            local_client_id,
            participants,
            id_generator: ObjectIdGenerator::new(local_client_id),
            transport,
        }
    }

    pub fn host_type(&self) -> HostType {
        self.host_type
    }

    pub fn is_server(&self) -> bool {
        self.host_type == HostType::Server
    }

    pub fn local_client_id(&self) -> ClientId {
        self.local_client_id
    }

    pub fn is_participant(&self, client_id: ClientId) -> bool {
        self.participants.contains(&client_id)
    }

    /// Returns false if the participant was already known
    pub fn add_participant(&mut self, client_id: ClientId) -> bool {
        self.participants.insert(client_id)
    }

    /// The server and the local participant cannot be removed
    pub fn remove_participant(&mut self, client_id: ClientId) -> bool {
        if client_id == SERVER_CLIENT_ID || client_id == self.local_client_id {
            return false;
        }
        self.participants.remove(&client_id)
    }

    /// Connected participants other than the server and ourselves, ascending
    pub fn remote_clients(&self) -> Vec<ClientId> {
        let mut clients: Vec<ClientId> = self
            .participants
            .iter()
            .copied()
            .filter(|id| *id != SERVER_CLIENT_ID && *id != self.local_client_id)
            .collect();
        clients.sort();
        clients
    }

    pub fn next_object_id(&mut self) -> ObjectId {
        self.id_generator.generate()
    }

    /// Resolves who actually receives a message meant for `audience`.
    ///
    /// Clients only ever talk to the server. The server sends to the
    /// connected members of `audience`, never to itself or `exclude`.
    pub fn recipients(
        &self,
        audience: impl IntoIterator<Item = ClientId>,
        exclude: Option<ClientId>,
    ) -> Vec<ClientId> {
        if !self.is_server() {
            return if exclude == Some(SERVER_CLIENT_ID) {
                Vec::new()
            } else {
                vec![SERVER_CLIENT_ID]
            };
        }

        let mut recipients: Vec<ClientId> = audience
            .into_iter()
            .filter(|id| {
                *id != self.local_client_id
                    && Some(*id) != exclude
                    && self.participants.contains(id)
            })
            .collect();
        recipients.sort();
        recipients.dedup();
        recipients
    }

    pub fn send(&mut self, outgoing: &OutgoingMessage) {
        if outgoing.targets.is_empty() {
            return;
        }
        trace!(
            "Sending {:?} for {} to {:?}",
            outgoing.message.message_type(),
            outgoing.message.object_id(),
            outgoing.targets
        );
        let payload = outgoing.message.to_bytes();
        self.transport
            .send(&outgoing.targets, outgoing.channel, &payload);
    }

    pub fn receive(&mut self) -> Option<(ClientId, Vec<u8>)> {
        self.transport.receive()
    }
}
