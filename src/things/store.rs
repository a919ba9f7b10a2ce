use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thing {
    pub id: String,
    pub available: bool,
}

impl Thing {
    pub fn new(id: impl Into<String>, available: bool) -> Self {
        Self { id: id.into(), available }
    }
}

/// In-memory thing storage, safe to share across requests.
#[derive(Debug, Default)]
pub struct ThingStore {
    things: RwLock<HashMap<String, Thing>>,
}

impl ThingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding `abd`, `eek`, `yik` and `yak`, all available.
    pub fn seeded() -> Self {
        let things = ["abd", "eek", "yik", "yak"]
            .into_iter()
            .map(|id| (id.to_owned(), Thing::new(id, true)))
            .collect();
        Self { things: RwLock::new(things) }
    }

    pub fn find(&self, id: &str) -> Option<Thing> {
        self.things.read().get(id).cloned()
    }

    /// Inserts `thing` unless its id is taken. Returns `false` on a duplicate.
    pub fn save(&self, thing: Thing) -> bool {
        let mut things = self.things.write();
        if things.contains_key(&thing.id) {
            return false;
        }
        things.insert(thing.id.clone(), thing);
        true
    }

    pub fn remove(&self, id: &str) -> Option<Thing> {
        self.things.write().remove(id)
    }

    /// Every thing, sorted by id.
    pub fn all(&self) -> Vec<Thing> {
        let mut all: Vec<_> = self.things.read().values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn len(&self) -> usize {
        self.things.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
