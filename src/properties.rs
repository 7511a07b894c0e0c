//! Process-lifetime property bag for cross-module coordination.
//!
//! A string-keyed, freely-typed map owned by the composition root and shared
//! by reference into every phase context. Modules use it to hand values to
//! each other during configuration (feature toggles, collected registrations,
//! deferred callbacks) without inventing a service interface for every scrap
//! of state. Created once at startup; never torn down.

use parking_lot::RwLock;
use std::{any::Any, collections::HashMap, fmt, sync::Arc};

type Boxed = Arc<dyn Any + Send + Sync>;

/// String-keyed, freely-typed map. Values are stored as `Arc` so readers can
/// hold on to them past the write that replaced them.
pub struct PropertyBag {
    map: RwLock<HashMap<String, Boxed>>,
}

impl PropertyBag {
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    /// Store `value` under `key`, replacing any previous value of any type.
    pub fn insert<T>(&self, key: impl Into<String>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.insert_arc(key, Arc::new(value));
    }

    /// Store an already-shared value under `key`.
    pub fn insert_arc<T>(&self, key: impl Into<String>, value: Arc<T>)
    where
        T: Send + Sync + 'static,
    {
        self.map.write().insert(key.into(), value);
    }

    /// Fetch the value under `key` as `T`. Returns `None` when the key is
    /// absent or holds a value of a different type.
    #[must_use]
    pub fn get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let r = self.map.read();
        let value = r.get(key)?;
        Arc::clone(value).downcast::<T>().ok()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.map.read().contains_key(key)
    }

    /// Remove the value under `key`; returns whether something was removed.
    pub fn remove(&self, key: &str) -> bool {
        self.map.write().remove(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl Default for PropertyBag {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.map.read();
        let mut keys: Vec<&str> = r.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("PropertyBag").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::PropertyBag;
    use std::sync::Arc;

    #[test]
    fn insert_and_get_typed_value() {
        let bag = PropertyBag::new();
        bag.insert("retries", 3u32);

        assert_eq!(*bag.get::<u32>("retries").unwrap(), 3);
        assert!(bag.contains("retries"));
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn get_with_wrong_type_returns_none() {
        let bag = PropertyBag::new();
        bag.insert("name", "core".to_owned());

        assert!(bag.get::<u32>("name").is_none());
        assert_eq!(*bag.get::<String>("name").unwrap(), "core");
    }

    #[test]
    fn insert_replaces_previous_value_of_any_type() {
        let bag = PropertyBag::new();
        bag.insert("slot", 1u32);
        bag.insert("slot", "now a string".to_owned());

        assert!(bag.get::<u32>("slot").is_none());
        assert_eq!(*bag.get::<String>("slot").unwrap(), "now a string");
    }

    #[test]
    fn readers_keep_replaced_values_alive() {
        let bag = PropertyBag::new();
        bag.insert("v", 1u32);
        let held = bag.get::<u32>("v").unwrap();

        bag.insert("v", 2u32);
        assert_eq!(*held, 1);
        assert_eq!(*bag.get::<u32>("v").unwrap(), 2);
    }

    #[test]
    fn insert_arc_shares_the_instance() {
        let bag = PropertyBag::new();
        let shared = Arc::new(vec![1, 2, 3]);
        bag.insert_arc("list", Arc::clone(&shared));

        let got = bag.get::<Vec<i32>>("list").unwrap();
        assert!(Arc::ptr_eq(&got, &shared));
    }

    #[test]
    fn remove_reports_presence() {
        let bag = PropertyBag::new();
        bag.insert("k", ());
        assert!(bag.remove("k"));
        assert!(!bag.remove("k"));
        assert!(bag.is_empty());
    }
}
