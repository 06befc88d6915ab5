use survey_spec::{Fields, WireError};
use thiserror::Error;

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("document store refused the credentials ({status}): {message}")]
    Unauthorized { status: u16, message: String },
    #[error("document '{collection}/{id}' does not exist")]
    NotFound { collection: String, id: String },
    #[error("document store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected document store response: {0}")]
    Decode(String),
    #[error("document has an unreadable field: {0}")]
    Wire(#[from] WireError),
}

/// Insert-one and merge-update access to a collection of survey records.
pub trait DocumentStore {
    /// Inserts a new document and returns its generated identifier.
    fn create(&self, collection: &str, fields: &Fields) -> Result<String, StoreError>;

    /// Replaces the top-level keys present in `fields` on an existing document.
    /// Fails with [`StoreError::NotFound`] instead of creating.
    fn update(&self, collection: &str, id: &str, fields: &Fields) -> Result<(), StoreError>;

    fn fetch(&self, collection: &str, id: &str) -> Result<Fields, StoreError>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn create(&self, collection: &str, fields: &Fields) -> Result<String, StoreError> {
        (**self).create(collection, fields)
    }

    fn update(&self, collection: &str, id: &str, fields: &Fields) -> Result<(), StoreError> {
        (**self).update(collection, id, fields)
    }

    fn fetch(&self, collection: &str, id: &str) -> Result<Fields, StoreError> {
        (**self).fetch(collection, id)
    }
}

impl<T: DocumentStore + ?Sized> DocumentStore for Box<T> {
    fn create(&self, collection: &str, fields: &Fields) -> Result<String, StoreError> {
        (**self).create(collection, fields)
    }

    fn update(&self, collection: &str, id: &str, fields: &Fields) -> Result<(), StoreError> {
        (**self).update(collection, id, fields)
    }

    fn fetch(&self, collection: &str, id: &str) -> Result<Fields, StoreError> {
        (**self).fetch(collection, id)
    }
}
