use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::store::{Thing, ThingStore};
use crate::classify::{Classify, ErrorClass, Unimplemented};
use crate::service::Shutdown;

#[derive(Debug, thiserror::Error)]
pub enum ThingError {
    #[error("thing `{0}` not found")]
    NotFound(String),

    #[error("thing `{0}` already exists")]
    AlreadyExists(String),

    #[error(transparent)]
    Unimplemented(#[from] Unimplemented),
}

impl Classify for ThingError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::AlreadyExists(_) => ErrorClass::Conflict,
            Self::Unimplemented(_) => ErrorClass::Internal,
        }
    }
}

/// The thing-lookup capability set.
///
/// Decorators implement it too and forward to an inner `Arc<dyn Things>`.
#[async_trait]
pub trait Things: Send + Sync {
    async fn get_thing(&self, id: &str) -> Result<Thing, ThingError>;

    async fn all_things(&self) -> Result<Vec<Thing>, ThingError>;

    async fn add_thing(&self, thing: Thing) -> Result<Thing, ThingError>;

    async fn remove_thing(&self, id: &str) -> Result<Thing, ThingError> {
        let _ = id;
        Err(Unimplemented { operation: "remove_thing" }.into())
    }

    /// The shutdown hook, when the implementation has one. Decorators
    /// delegate to what they wrap.
    fn as_shutdown(&self) -> Option<&dyn Shutdown> {
        None
    }
}

/// [`Things`] over a [`ThingStore`].
#[derive(Debug, Clone)]
pub struct StoreThings {
    store: Arc<ThingStore>,
}

impl StoreThings {
    pub fn new(store: Arc<ThingStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Things for StoreThings {
    async fn get_thing(&self, id: &str) -> Result<Thing, ThingError> {
        self.store.find(id).ok_or_else(|| ThingError::NotFound(id.to_owned()))
    }

    async fn all_things(&self) -> Result<Vec<Thing>, ThingError> {
        Ok(self.store.all())
    }

    async fn add_thing(&self, thing: Thing) -> Result<Thing, ThingError> {
        if self.store.save(thing.clone()) {
            Ok(thing)
        } else {
            Err(ThingError::AlreadyExists(thing.id))
        }
    }

    async fn remove_thing(&self, id: &str) -> Result<Thing, ThingError> {
        self.store.remove(id).ok_or_else(|| ThingError::NotFound(id.to_owned()))
    }

    fn as_shutdown(&self) -> Option<&dyn Shutdown> {
        Some(self)
    }
}

impl Shutdown for StoreThings {
    fn shutdown(&self) {
        info!(things = self.store.len(), "thing service shutting down");
    }
}
