//! The model registry.
//!
//! All model definitions are registered up front and verified together:
//! [`RegistryBuilder::build`] rejects duplicate names and relations that
//! point at models nobody registered. After that the registry is immutable,
//! so lookups cannot fail for configuration reasons at call time.

use crate::error::{Error, Result};
use crate::model::ModelDef;
use std::collections::HashMap;
use std::sync::Arc;

/// Collects model definitions before verification.
///
/// # Examples
///
/// ```
/// use facund_orm::model::ModelDef;
/// use facund_orm::registry::RegistryBuilder;
///
/// let registry = RegistryBuilder::new()
///     .register(ModelDef::builder("article").build())
///     .register(ModelDef::builder("user").build())
///     .build()
///     .unwrap();
///
/// assert!(registry.contains("article"));
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    defs: Vec<ModelDef>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, def: ModelDef) -> Self {
        self.defs.push(def);
        self
    }

    /// Verifies the collected definitions and freezes them.
    pub fn build(self) -> Result<Registry> {
        let mut models: HashMap<String, Arc<ModelDef>> = HashMap::new();
        for def in self.defs {
            if models.contains_key(&def.name) {
                return Err(Error::DuplicateModel(def.name));
            }
            models.insert(def.name.clone(), Arc::new(def));
        }

        for def in models.values() {
            for (name, relation) in &def.relations {
                let target = relation.related();
                if !models.contains_key(target) {
                    return Err(Error::DanglingRelation {
                        model: def.name.clone(),
                        relation: name.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }

        Ok(Registry { models })
    }
}

/// Immutable set of verified model definitions.
#[derive(Debug)]
pub struct Registry {
    models: HashMap<String, Arc<ModelDef>>,
}

impl Registry {
    pub fn get(&self, name: &str) -> Result<Arc<ModelDef>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownModel(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}
