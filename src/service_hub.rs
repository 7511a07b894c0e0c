//! Minimalistic, type-safe service hub.
//!
//! Design goals:
//! - Module singletons and module-provided APIs register an implementation once.
//! - Consumers fetch by *interface type* (trait object) without knowing who
//!   provided it.
//! - Optional scopes: short-lived resolution scopes layer registrations over
//!   the global ones and are cleared when the scope ends.
//!
//! Implementation details:
//! - Key = (type name, scope). We use `type_name::<T>()`, which works for
//!   `T = dyn Trait`.
//! - Value = `Arc<T>` stored as `Box<dyn Any + Send + Sync>` (downcast on read).
//! - Sync hot path: `get()` takes a read lock; no hidden lazy slots.
//!
//! Notes:
//! - Re-registering overwrites the previous value; existing `Arc`s held by
//!   consumers remain valid.
//! - `clear` is intended mainly for tests and one-off reconfiguration flows.

use parking_lot::RwLock;
use std::{any::Any, collections::HashMap, fmt, sync::Arc};

/// Global scope constant.
pub const GLOBAL_SCOPE: &str = "global";

/// Stable type key for trait objects — uses fully-qualified `type_name::<T>()`.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct TypeKey(&'static str);

impl TypeKey {
    #[inline]
    fn of<T: ?Sized + 'static>() -> Self {
        TypeKey(std::any::type_name::<T>())
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Scope a registration lives in (`global`, or a short-lived named scope).
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct ScopeKey(Arc<str>);

impl ScopeKey {
    #[inline]
    fn named(s: impl Into<Arc<str>>) -> Self {
        ScopeKey(s.into())
    }
}

impl fmt::Debug for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceHubError {
    #[error("service not found: type={type_key:?}, scope={scope:?}")]
    NotFound { type_key: TypeKey, scope: ScopeKey },

    #[error("type mismatch in hub for type={type_key:?}, scope={scope:?}")]
    TypeMismatch { type_key: TypeKey, scope: ScopeKey },
}

type Boxed = Box<dyn Any + Send + Sync>;

/// Internal map type for the hub.
type ServiceMap = HashMap<(TypeKey, ScopeKey), Boxed>;

/// Type-safe registry of services keyed by (interface type, scope).
///
/// This is the mutable registry surface of the composition pipeline: modules
/// populate it during the configuration group, and the built resolver exposes
/// the read side afterwards.
pub struct ServiceHub {
    map: RwLock<ServiceMap>,
}

impl ServiceHub {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for ServiceHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceHub {
    /// Register a singleton in the *global* scope under the interface type `T`.
    /// `T` can be a trait object like `dyn my_module::contract::MyApi`.
    pub fn register<T>(&self, service: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register_scoped::<T>(GLOBAL_SCOPE, service);
    }

    /// Register a singleton in a *named* scope under the interface type `T`.
    pub fn register_scoped<T>(&self, scope: impl Into<Arc<str>>, service: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let type_key = TypeKey::of::<T>();
        let scope_key = ScopeKey::named(scope);
        let mut w = self.map.write();
        w.insert((type_key, scope_key), Box::new(service));
    }

    /// Fetch a service from the *global* scope by interface type `T`.
    ///
    /// # Errors
    /// Returns [`ServiceHubError::NotFound`] when nothing is registered under
    /// `T`, and [`ServiceHubError::TypeMismatch`] when the stored value does
    /// not downcast (indicates hub corruption).
    pub fn get<T>(&self) -> Result<Arc<T>, ServiceHubError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_scoped::<T>(GLOBAL_SCOPE)
    }

    /// Fetch a service from a *named* scope by interface type `T`.
    ///
    /// # Errors
    /// Same surface as [`ServiceHub::get`]; the lookup does not fall back to
    /// the global scope (see the resolver's scope type for layered lookup).
    pub fn get_scoped<T>(&self, scope: impl Into<Arc<str>>) -> Result<Arc<T>, ServiceHubError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let type_key = TypeKey::of::<T>();
        let scope_key = ScopeKey::named(scope);
        let r = self.map.read();

        let boxed = r
            .get(&(type_key.clone(), scope_key.clone()))
            .ok_or_else(|| ServiceHubError::NotFound {
                type_key: type_key.clone(),
                scope: scope_key.clone(),
            })?;

        boxed
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or(ServiceHubError::TypeMismatch {
                type_key,
                scope: scope_key,
            })
    }

    /// Whether something is registered for `T` in the global scope.
    #[must_use]
    pub fn contains<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = (TypeKey::of::<T>(), ScopeKey::named(GLOBAL_SCOPE));
        self.map.read().contains_key(&key)
    }

    /// Drop every registration made in `scope`. Used when a short-lived
    /// resolution scope ends; clearing the global scope this way is a no-op
    /// guard against accidents.
    pub fn clear_scope(&self, scope: &str) {
        if scope == GLOBAL_SCOPE {
            return;
        }
        let scope_key = ScopeKey::named(scope);
        self.map.write().retain(|(_, s), _| *s != scope_key);
    }

    /// Remove everything. Test helper.
    pub fn clear(&self) {
        self.map.write().clear();
    }
}

impl fmt::Debug for ServiceHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.map.read();
        f.debug_struct("ServiceHub").field("len", &r.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::{ServiceHub, ServiceHubError};
    use std::sync::Arc;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct EnglishGreeter;

    impl Greeter for EnglishGreeter {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[test]
    fn register_and_get_concrete_type() {
        let hub = ServiceHub::new();
        hub.register::<u32>(Arc::new(7));
        assert_eq!(*hub.get::<u32>().unwrap(), 7);
        assert!(hub.contains::<u32>());
        assert!(!hub.contains::<String>());
    }

    #[test]
    fn register_and_get_trait_object() {
        let hub = ServiceHub::new();
        let greeter: Arc<dyn Greeter> = Arc::new(EnglishGreeter);
        hub.register(greeter);

        let resolved = hub.get::<dyn Greeter>().unwrap();
        assert_eq!(resolved.greet(), "hello");
    }

    #[test]
    fn get_missing_is_not_found() {
        let hub = ServiceHub::new();
        let err = hub.get::<u32>().unwrap_err();
        assert!(matches!(err, ServiceHubError::NotFound { .. }));
    }

    #[test]
    fn re_register_overwrites_but_old_arcs_stay_valid() {
        let hub = ServiceHub::new();
        hub.register::<String>(Arc::new("first".to_owned()));
        let first = hub.get::<String>().unwrap();

        hub.register::<String>(Arc::new("second".to_owned()));
        assert_eq!(*hub.get::<String>().unwrap(), "second");
        assert_eq!(*first, "first");
    }

    #[test]
    fn scoped_registration_is_invisible_globally() {
        let hub = ServiceHub::new();
        hub.register_scoped::<u32>("request-1", Arc::new(1));

        assert!(hub.get::<u32>().is_err());
        assert_eq!(*hub.get_scoped::<u32>("request-1").unwrap(), 1);
    }

    #[test]
    fn clear_scope_removes_only_that_scope() {
        let hub = ServiceHub::new();
        hub.register::<u32>(Arc::new(1));
        hub.register_scoped::<u32>("tmp", Arc::new(2));

        hub.clear_scope("tmp");
        assert!(hub.get_scoped::<u32>("tmp").is_err());
        assert_eq!(*hub.get::<u32>().unwrap(), 1);
    }

    #[test]
    fn clear_scope_on_global_is_a_no_op() {
        let hub = ServiceHub::new();
        hub.register::<u32>(Arc::new(1));
        hub.clear_scope(super::GLOBAL_SCOPE);
        assert_eq!(*hub.get::<u32>().unwrap(), 1);
    }

    #[test]
    fn clear_empties_everything() {
        let hub = ServiceHub::new();
        hub.register::<u32>(Arc::new(1));
        hub.register_scoped::<u32>("tmp", Arc::new(2));

        hub.clear();
        assert!(hub.get::<u32>().is_err());
        assert!(hub.get_scoped::<u32>("tmp").is_err());
    }
}
