/// Simple ObjectWorld implementation for E2E testing

use std::any::Any;
use std::collections::HashMap;

use replica_shared::{ObjectId, ObjectWorld, TypeKey};

type Factory = fn() -> Box<dyn Any>;

fn build<T: Default + Any>() -> Box<dyn Any> {
    Box::new(T::default())
}

/// HashMap-backed object store that can build mirrors of the types it knows
#[derive(Default)]
pub struct TestWorld {
    objects: HashMap<ObjectId, Box<dyn Any>>,
    factories: HashMap<TypeKey, Factory>,
}

impl TestWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows mirrors of `T` to be constructed from Spawn messages
    pub fn with_factory<T: Default + Any>(mut self) -> Self {
        self.factories.insert(TypeKey::of::<T>(), build::<T>);
        self
    }

    pub fn insert<T: Any>(&mut self, object_id: ObjectId, value: T) {
        self.objects.insert(object_id, Box::new(value));
    }

    pub fn get<T: Any>(&self, object_id: ObjectId) -> Option<&T> {
        self.objects.get(&object_id)?.downcast_ref::<T>()
    }

    pub fn get_mut<T: Any>(&mut self, object_id: ObjectId) -> Option<&mut T> {
        self.objects.get_mut(&object_id)?.downcast_mut::<T>()
    }

    pub fn contains(&self, object_id: ObjectId) -> bool {
        self.objects.contains_key(&object_id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectWorld for TestWorld {
    fn object_mut(&mut self, object_id: &ObjectId) -> Option<&mut dyn Any> {
        self.objects.get_mut(object_id).map(|object| object.as_mut())
    }

    fn construct_object(&mut self, object_id: &ObjectId, type_key: &TypeKey) -> bool {
        let Some(factory) = self.factories.get(type_key) else {
            return false;
        };
        self.objects.insert(*object_id, factory());
        true
    }

    fn destroy_object(&mut self, object_id: &ObjectId) {
        self.objects.remove(object_id);
    }
}
