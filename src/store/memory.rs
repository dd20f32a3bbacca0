use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde_json::{Map, Value};

use super::{DocumentStore, StoreError};

/// An in-memory document store with the same path semantics as the real
/// one. Push keys are deterministic so tests can assert on them.
pub struct MemoryStore {
    root: Mutex<Value>,
    next_key: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            root: Mutex::new(Value::Object(Map::new())),
            next_key: AtomicU64::new(0),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Walk down to the value at `path`, if present.
fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments(path) {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Walk down to the value at `path`, creating intermediate objects.
fn lookup_mut<'a>(root: &'a mut Value, path: &str) -> &'a mut Value {
    let mut current = root;
    for segment in segments(path) {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        current = current
            .as_object_mut()
            .unwrap()
            .entry(segment.to_string())
            .or_insert(Value::Null);
    }
    current
}

#[rocket::async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let root = self.root.lock().unwrap();
        Ok(lookup(&root, path).filter(|v| !v.is_null()).cloned())
    }

    async fn write(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        let mut root = self.root.lock().unwrap();
        *lookup_mut(&mut root, path) = value.clone();
        Ok(())
    }

    async fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<(), StoreError> {
        let mut root = self.root.lock().unwrap();
        let target = lookup_mut(&mut root, path);
        if !target.is_object() {
            *target = Value::Object(Map::new());
        }
        let object = target.as_object_mut().unwrap();
        for (key, value) in fields {
            object.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn push(&self, path: &str, value: &Value) -> Result<String, StoreError> {
        let key = format!("-K{:010}", self.next_key.fetch_add(1, Ordering::Relaxed));
        let mut root = self.root.lock().unwrap();
        let target = lookup_mut(&mut root, path);
        if !target.is_object() {
            *target = Value::Object(Map::new());
        }
        target
            .as_object_mut()
            .unwrap()
            .insert(key.clone(), value.clone());
        Ok(key)
    }

    async fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<&Value>,
        value: &Value,
    ) -> Result<bool, StoreError> {
        let mut root = self.root.lock().unwrap();
        let current = lookup(&root, path).filter(|v| !v.is_null());
        if current != expected {
            return Ok(false);
        }
        *lookup_mut(&mut root, path) = value.clone();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[rocket::async_test]
    async fn read_write_nested() {
        let store = MemoryStore::new();
        assert_eq!(store.read("users/u1").await.unwrap(), None);

        store
            .write("users/u1", &json!({"name": "Ada", "account": 10}))
            .await
            .unwrap();
        assert_eq!(
            store.read("users/u1/name").await.unwrap(),
            Some(json!("Ada"))
        );
        assert_eq!(
            store.read("users").await.unwrap(),
            Some(json!({"u1": {"name": "Ada", "account": 10}}))
        );
    }

    #[rocket::async_test]
    async fn update_merges_shallowly() {
        let store = MemoryStore::new();
        store
            .write("elections/e1", &json!({"electionName": "a", "candidates": ["x"]}))
            .await
            .unwrap();

        let mut fields = Map::new();
        fields.insert("electionName".to_string(), json!("b"));
        store.update("elections/e1", &fields).await.unwrap();

        assert_eq!(
            store.read("elections/e1").await.unwrap(),
            Some(json!({"electionName": "b", "candidates": ["x"]}))
        );
    }

    #[rocket::async_test]
    async fn push_generates_distinct_keys() {
        let store = MemoryStore::new();
        let a = store.push("elections", &json!(1)).await.unwrap();
        let b = store.push("elections", &json!(2)).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.read(&format!("elections/{b}")).await.unwrap(), Some(json!(2)));
    }

    #[rocket::async_test]
    async fn compare_and_swap_guards_against_races() {
        let store = MemoryStore::new();

        // First writer claims the absent slot.
        assert!(store
            .compare_and_swap("elections/e1/address", None, &json!("0xabc"))
            .await
            .unwrap());

        // Second writer expected absence and must lose.
        assert!(!store
            .compare_and_swap("elections/e1/address", None, &json!("0xdef"))
            .await
            .unwrap());
        assert_eq!(
            store.read("elections/e1/address").await.unwrap(),
            Some(json!("0xabc"))
        );

        // Swapping from the known current value succeeds.
        assert!(store
            .compare_and_swap("elections/e1/address", Some(&json!("0xabc")), &json!("0xdef"))
            .await
            .unwrap());
    }
}
