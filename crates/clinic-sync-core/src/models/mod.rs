//! Domain models for the clinic.

macro_rules! impl_entity {
    ($ty:ty, $collection:expr) => {
        impl $crate::models::Entity for $ty {
            const COLLECTION: $crate::store::Collection = $collection;

            fn id(&self) -> Option<$crate::models::RecordId> {
                self.id
            }
        }
    };
}

pub(crate) use impl_entity;

mod doctor;
mod patient;
mod practice;
mod prescription;
mod session;
mod social_work;

pub use doctor::*;
pub use patient::*;
pub use practice::*;
pub use prescription::*;
pub use session::*;
pub use social_work::*;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::store::Collection;

/// Server-assigned record identifier.
pub type RecordId = i64;

/// A record type stored in exactly one server collection.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection this record lives in.
    const COLLECTION: Collection;

    /// Identifier assigned by the store, `None` until first insert.
    fn id(&self) -> Option<RecordId>;
}
