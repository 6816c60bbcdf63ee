use std::collections::{HashMap, HashSet, VecDeque};

use log::warn;

use crate::{
    error::ReplicationError, world::replication_entry::ReplicationEntry, ClientId,
    NetworkObjectRole, ObjectId,
};

/// What is replicated, and who owns it
pub struct ReplicationRegistry {
    entries: HashMap<ObjectId, ReplicationEntry>,
    children: HashMap<ObjectId, HashSet<ObjectId>>,
    max_hierarchy_depth: usize,
}

impl ReplicationRegistry {
    pub fn new(max_hierarchy_depth: usize) -> Self {
        Self {
            entries: HashMap::new(),
            children: HashMap::new(),
            max_hierarchy_depth,
        }
    }

    /// Inserts `entry`, refusing duplicates and parent links that would
    /// make the object its own ancestor
    pub fn try_add(&mut self, entry: ReplicationEntry) -> Result<(), ReplicationError> {
        let object_id = entry.object_id;
        if self.entries.contains_key(&object_id) {
            return Err(ReplicationError::ObjectAlreadyRegistered { object_id });
        }
        if let Some(parent) = entry.parent {
            if self.is_ancestor_or_self(&object_id, parent) {
                return Err(ReplicationError::ParentCycle { object_id, parent });
            }
            self.children.entry(parent).or_default().insert(object_id);
        }
        self.entries.insert(object_id, entry);
        Ok(())
    }

    // Walks up from `start`; parents that are not registered end the chain
    fn is_ancestor_or_self(&self, object_id: &ObjectId, start: ObjectId) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(start);
        while let Some(id) = current {
            if id == *object_id {
                return true;
            }
            if !visited.insert(id) {
                return false;
            }
            current = self.entries.get(&id).and_then(|entry| entry.parent);
        }
        false
    }

    pub fn remove(&mut self, object_id: &ObjectId) -> Option<ReplicationEntry> {
        let entry = self.entries.remove(object_id)?;
        if let Some(parent) = entry.parent {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.remove(object_id);
                if siblings.is_empty() {
                    self.children.remove(&parent);
                }
            }
        }
        Some(entry)
    }

    pub fn contains(&self, object_id: &ObjectId) -> bool {
        self.entries.contains_key(object_id)
    }

    pub fn get(&self, object_id: &ObjectId) -> Option<&ReplicationEntry> {
        self.entries.get(object_id)
    }

    pub fn get_mut(&mut self, object_id: &ObjectId) -> Option<&mut ReplicationEntry> {
        self.entries.get_mut(object_id)
    }

    /// `None` for unregistered objects
    pub fn owner_client_id(&self, object_id: &ObjectId) -> Option<ClientId> {
        self.entries
            .get(object_id)
            .and_then(|entry| entry.owner_client_id)
    }

    /// `NetworkObjectRole::None` for unregistered objects
    pub fn role(&self, object_id: &ObjectId) -> NetworkObjectRole {
        self.entries
            .get(object_id)
            .map(|entry| entry.role)
            .unwrap_or_default()
    }

    /// `root` followed by every registered descendant, breadth first.
    ///
    /// The walk stops descending past the configured maximum depth.
    pub fn hierarchy(&self, root: &ObjectId) -> Vec<ObjectId> {
        if !self.entries.contains_key(root) {
            return Vec::new();
        }

        let mut output = vec![*root];
        let mut visited = HashSet::from([*root]);
        let mut queue = VecDeque::from([(*root, 0usize)]);

        while let Some((id, depth)) = queue.pop_front() {
            let Some(children) = self.children.get(&id) else {
                continue;
            };
            if depth >= self.max_hierarchy_depth {
                warn!(
                    "Hierarchy below {} is deeper than {} levels, not descending further",
                    root, self.max_hierarchy_depth
                );
                continue;
            }
            let mut children: Vec<ObjectId> = children.iter().copied().collect();
            children.sort();
            for child in children {
                if self.entries.contains_key(&child) && visited.insert(child) {
                    output.push(child);
                    queue.push_back((child, depth + 1));
                }
            }
        }

        output
    }

    /// Registered ids in ascending order
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.entries.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn entries(&self) -> impl Iterator<Item = &ReplicationEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.children.clear();
    }
}
