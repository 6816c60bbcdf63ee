use std::collections::{HashSet, VecDeque};

use crate::ObjectId;

/// Bounded memory of recently despawned objects, oldest forgotten first
pub struct RecentIds {
    order: VecDeque<ObjectId>,
    members: HashSet<ObjectId>,
    capacity: usize,
}

impl RecentIds {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            members: HashSet::new(),
            capacity,
        }
    }

    pub fn remember(&mut self, object_id: ObjectId) {
        if self.capacity == 0 || !self.members.insert(object_id) {
            return;
        }
        self.order.push_back(object_id);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
    }

    pub fn forget(&mut self, object_id: &ObjectId) {
        if self.members.remove(object_id) {
            self.order.retain(|id| id != object_id);
        }
    }

    pub fn contains(&self, object_id: &ObjectId) -> bool {
        self.members.contains(object_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}
