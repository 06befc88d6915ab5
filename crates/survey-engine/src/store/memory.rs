use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use survey_spec::{Fields, wire};
use uuid::Uuid;

use crate::store::{DocumentStore, StoreError};

type Collections = BTreeMap<String, BTreeMap<String, Fields>>;

/// In-process store for offline runs and tests.
///
/// Documents pass through the wire encoding on every write so that values
/// the remote store could not represent fail here too.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.lock()
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn through_wire(fields: &Fields) -> Result<Fields, StoreError> {
    let document = wire::encode_document(fields);
    Ok(wire::decode_fields(document.get("fields"))?)
}

impl DocumentStore for MemoryStore {
    fn create(&self, collection: &str, fields: &Fields) -> Result<String, StoreError> {
        let stored = through_wire(fields)?;
        let id = Uuid::new_v4().simple().to_string();
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), stored);
        Ok(id)
    }

    fn update(&self, collection: &str, id: &str, fields: &Fields) -> Result<(), StoreError> {
        let patch = through_wire(fields)?;
        let mut collections = self.lock();
        let document = collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        document.extend(patch);
        Ok(())
    }

    fn fetch(&self, collection: &str, id: &str) -> Result<Fields, StoreError> {
        self.lock()
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_spec::FieldValue;

    #[test]
    fn update_merges_top_level_keys() {
        let store = MemoryStore::new();
        let mut first = Fields::new();
        first.insert("a".into(), 1_i64.into());
        first.insert("b".into(), "keep".into());
        let id = store.create("records", &first).expect("create");

        let mut patch = Fields::new();
        patch.insert("a".into(), 2_i64.into());
        store.update("records", &id, &patch).expect("update");

        let stored = store.fetch("records", &id).expect("fetch");
        assert_eq!(stored["a"], FieldValue::Integer(2));
        assert_eq!(stored["b"], FieldValue::from("keep"));
    }

    #[test]
    fn update_never_creates() {
        let store = MemoryStore::new();
        let error = store
            .update("records", "missing", &Fields::new())
            .unwrap_err();
        assert!(matches!(error, StoreError::NotFound { .. }));
        assert_eq!(store.document_count("records"), 0);
    }
}
