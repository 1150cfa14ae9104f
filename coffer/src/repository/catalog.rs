use crate::common::{atomic, Atomic, ReadExecutor, WriteExecutor};
use crate::errors::{CofferError, CofferResult, ErrorKind};
use crate::schema::Schema;
use indexmap::IndexMap;
use std::sync::Arc;

/// Registry of the schemas a repository serves, by collection name.
///
/// Clones share the same registry.
#[derive(Clone, Default)]
pub struct Catalog {
    schemas: Atomic<IndexMap<String, Arc<Schema>>>,
}

impl Catalog {
    pub fn new() -> Catalog {
        Catalog {
            schemas: atomic(IndexMap::new()),
        }
    }

    /// Registers a schema under its collection name.
    ///
    /// # Errors
    ///
    /// Returns a `SchemaError` if the collection name is taken.
    pub fn register(&self, schema: Arc<Schema>) -> CofferResult<()> {
        self.schemas.write_with(|schemas| {
            let name = schema.collection_name().to_string();
            if schemas.contains_key(&name) {
                log::error!("Collection {} is already registered", name);
                return Err(CofferError::new(
                    &format!("collection {} is already registered", name),
                    ErrorKind::SchemaError,
                ));
            }
            schemas.insert(name, schema);
            Ok(())
        })
    }

    /// Returns the schema of collection `name`.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error for unknown collections.
    pub fn schema(&self, name: &str) -> CofferResult<Arc<Schema>> {
        self.schemas.read_with(|schemas| match schemas.get(name) {
            Some(schema) => Ok(Arc::clone(schema)),
            None => {
                log::error!("Collection {} is not registered", name);
                Err(CofferError::new(
                    &format!("unknown collection {}", name),
                    ErrorKind::NotFound,
                ))
            }
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.read_with(|schemas| schemas.contains_key(name))
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.schemas.read_with(|schemas| schemas.keys().cloned().collect())
    }
}
