//! Class catalog and type loading
//!
//! Owner classes are registered by name before they are resolved. The global
//! catalog is the ambient loader used when a resolver is not handed one.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::error::LoadError;
use super::native::NativeClass;

/// Loads native classes by fully qualified name.
pub trait TypeLoader: Send + Sync {
    /// Load a class; absence is [`LoadError::NotFound`].
    fn load(&self, name: &str) -> Result<Arc<NativeClass>, LoadError>;
}

/// Name-keyed class registry.
pub struct ClassCatalog {
    classes: RwLock<HashMap<String, Arc<NativeClass>>>,
}

static CATALOG: Lazy<ClassCatalog> = Lazy::new(ClassCatalog::new);

impl ClassCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self {
            classes: RwLock::new(HashMap::new()),
        }
    }

    /// Access the global catalog singleton.
    pub fn global() -> &'static Self {
        &CATALOG
    }

    /// Register a class under its name, replacing any previous registration.
    pub fn register(&self, class: Arc<NativeClass>) {
        self.classes.write().insert(class.name().to_string(), class);
    }

    /// Remove a class.
    pub fn unregister(&self, name: &str) -> Option<Arc<NativeClass>> {
        self.classes.write().remove(name)
    }

    /// Registered class by name.
    pub fn get(&self, name: &str) -> Option<Arc<NativeClass>> {
        self.classes.read().get(name).cloned()
    }

    /// Check if a class is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.classes.read().contains_key(name)
    }

    /// Registered class names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ClassCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeLoader for ClassCatalog {
    fn load(&self, name: &str) -> Result<Arc<NativeClass>, LoadError> {
        self.get(name)
            .ok_or_else(|| LoadError::NotFound(name.to_string()))
    }
}

/// Loader backed by [`ClassCatalog::global`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalLoader;

impl TypeLoader for GlobalLoader {
    fn load(&self, name: &str) -> Result<Arc<NativeClass>, LoadError> {
        ClassCatalog::global().load(name)
    }
}
