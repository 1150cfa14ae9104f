//! Item type declarations.
//!
//! A [Schema] describes one item type and the collection holding it: its
//! properties and keys, its relations to other collections, its indexes and
//! the lifecycle hooks that run around creation, loading, saving and
//! deletion. Schemas are built once with a [SchemaBuilder] and then shared
//! as `Arc<Schema>` by every collection and item of that type.
//!
//! ```rust,ignore
//! use coffer::schema::*;
//!
//! let vaults = Schema::builder("Vaults", "Vault")
//!     .add_primary_key_property("id", PropertyType::String, KeyOptions::default())
//!     .add_property("name", PropertyType::String)
//!     .add_has_many_relation("files", "Files", "vaultId")
//!     .build()?;
//! ```

mod index;
mod lifecycle;
mod property;
mod relation;

pub use index::*;
pub use lifecycle::*;
pub use property::*;
pub use relation::*;

use crate::collection::{Document, FindOptions, ItemOptions};
use crate::common::{Value, DEFAULT_CREATED_ON_NAME, DEFAULT_MAX_KEY_VALUE, DEFAULT_UPDATED_ON_NAME};
use crate::errors::{CofferError, CofferResult, ErrorKind};
use crate::item::Item;
use chrono::Utc;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// An immutable item type declaration.
#[derive(Clone)]
pub struct Schema {
    collection_name: String,
    item_name: String,
    class_names: Vec<String>,
    properties: IndexMap<String, Property>,
    primary_key: Option<String>,
    max_key_value: i64,
    key_properties: Vec<String>,
    foreign_keys: Vec<String>,
    relations: IndexMap<String, Relation>,
    indexes: Vec<IndexDefinition>,
    hooks: HookRegistry,
}

impl Schema {
    /// Starts a declaration of the item type `item_name` stored in the
    /// collection `collection_name`.
    pub fn builder(collection_name: &str, item_name: &str) -> SchemaBuilder {
        SchemaBuilder::new(collection_name, item_name)
    }

    /// Starts a declaration that inherits every property, relation, index
    /// and hook of this schema.
    pub fn extend(&self, collection_name: &str, item_name: &str) -> SchemaBuilder {
        let mut schema = self.clone();
        schema.collection_name = collection_name.to_string();
        schema.item_name = item_name.to_string();
        schema.class_names = vec![item_name.to_string()];
        if self.primary_key.is_some() {
            for name in &self.class_names {
                if !schema.class_names.contains(name) {
                    schema.class_names.push(name.clone());
                }
            }
        }
        SchemaBuilder {
            schema,
            error: None,
        }
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    /// Names of this item type followed by the keyed types it extends.
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Returns `true` if this type is `name` or extends it.
    pub fn is_kind_of(&self, name: &str) -> bool {
        self.class_names.iter().any(|n| n == name)
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Returns the primary key property.
    ///
    /// # Errors
    ///
    /// Returns a `MissingPrimaryKey` error if none was declared.
    pub fn primary_key_property(&self) -> CofferResult<&Property> {
        let property = self
            .primary_key
            .as_ref()
            .and_then(|name| self.properties.get(name));
        match property {
            Some(property) => Ok(property),
            None => {
                log::error!("{} has no primary key property", self.item_name);
                Err(CofferError::new(
                    "primary key property is missing",
                    ErrorKind::MissingPrimaryKey,
                ))
            }
        }
    }

    pub fn primary_key_name(&self) -> CofferResult<&str> {
        self.primary_key_property().map(|p| p.name())
    }

    /// Upper bound of generated numeric keys.
    pub fn max_key_value(&self) -> i64 {
        self.max_key_value
    }

    /// Every key property, primary and foreign ones included.
    pub fn key_property_names(&self) -> &[String] {
        &self.key_properties
    }

    pub fn foreign_key_names(&self) -> &[String] {
        &self.foreign_keys
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn indexes(&self) -> &[IndexDefinition] {
        &self.indexes
    }

    pub fn hooks(&self, phase: LifecyclePhase) -> Vec<Hook> {
        self.hooks.hooks(phase)
    }

    /// Checks `document` against the declared properties.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` naming the first required property that
    /// is unset or the first property whose value has the wrong type.
    pub fn validate(&self, document: &Document) -> CofferResult<()> {
        for property in self.properties.values() {
            let value = document.get(property.name()).unwrap_or(&Value::Null);
            if property.is_required() && value.is_null() {
                log::error!("{}.{} is required", self.item_name, property.name());
                return Err(CofferError::new(
                    &format!("{} is required", property.name()),
                    ErrorKind::ValidationError,
                ));
            }
            if !property.property_type().accepts(value) {
                log::error!(
                    "{}.{} expects {}, got {}",
                    self.item_name,
                    property.name(),
                    property.property_type().name(),
                    value.type_name()
                );
                return Err(CofferError::new(
                    &format!(
                        "{} must be of type {}",
                        property.name(),
                        property.property_type().name()
                    ),
                    ErrorKind::ValidationError,
                ));
            }
        }
        Ok(())
    }

    /// Restores declared types lost by serialization.
    pub(crate) fn coerce(&self, document: &mut Document) {
        for property in self.properties.values() {
            if let Some(value) = document.get_mut(property.name()) {
                let raw = value.take();
                *value = property.property_type().coerce(raw);
            }
        }
    }

    /// Fills unset properties that declare a default value.
    pub(crate) fn apply_defaults(&self, document: &mut Document) -> CofferResult<()> {
        for property in self.properties.values() {
            if let Some(default) = property.default_value() {
                let unset = document.get(property.name()).map_or(true, |v| v.is_null());
                if unset {
                    document.put(property.name(), default.clone())?;
                }
            }
        }
        Ok(())
    }
}

impl Debug for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("collection_name", &self.collection_name)
            .field("item_name", &self.item_name)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("primary_key", &self.primary_key)
            .field("relations", &self.relations.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Fluent declaration of a [Schema].
///
/// Declaration errors are captured and returned by [SchemaBuilder::build],
/// so a chain of calls never has to be interrupted.
pub struct SchemaBuilder {
    schema: Schema,
    error: Option<CofferError>,
}

impl SchemaBuilder {
    fn new(collection_name: &str, item_name: &str) -> Self {
        let mut builder = SchemaBuilder {
            schema: Schema {
                collection_name: collection_name.to_string(),
                item_name: item_name.to_string(),
                class_names: vec![item_name.to_string()],
                properties: IndexMap::new(),
                primary_key: None,
                max_key_value: DEFAULT_MAX_KEY_VALUE,
                key_properties: Vec::new(),
                foreign_keys: Vec::new(),
                relations: IndexMap::new(),
                indexes: Vec::new(),
                hooks: HookRegistry::default(),
            },
            error: None,
        };
        if collection_name.is_empty() || item_name.is_empty() {
            builder.fail(CofferError::new(
                "collection and item names are required",
                ErrorKind::SchemaError,
            ));
        }
        builder
    }

    fn fail(&mut self, error: CofferError) {
        if self.error.is_none() {
            log::error!("Invalid schema {}: {}", self.schema.item_name, error);
            self.error = Some(error);
        }
    }

    fn declare(&mut self, name: &str, property_type: PropertyType, options: PropertyOptions) {
        if name.is_empty() {
            self.fail(CofferError::new("name is missing", ErrorKind::SchemaError));
            return;
        }
        let property = Property::new(name, property_type, options);
        self.schema.properties.insert(name.to_string(), property);
    }

    fn declare_key(&mut self, name: &str, property_type: PropertyType, auto: bool) {
        self.declare(name, property_type, PropertyOptions::default());
        if name.is_empty() {
            return;
        }
        if !self.schema.key_properties.iter().any(|k| k == name) {
            self.schema.key_properties.push(name.to_string());
        }
        if auto {
            let key_name = name.to_string();
            self.register(
                LifecyclePhase::WillSave,
                Hook::from_fn(move |item, _options| {
                    if item.repository().is_local() {
                        item.generate_key_value(&key_name)?;
                    }
                    Ok(())
                }),
            );
        }
    }

    fn register(&mut self, phase: LifecyclePhase, hook: Hook) {
        if let Err(e) = self.schema.hooks.register(phase, hook) {
            self.fail(e);
        }
    }

    pub fn add_property(mut self, name: &str, property_type: PropertyType) -> Self {
        self.declare(name, property_type, PropertyOptions::default());
        self
    }

    pub fn add_property_with(
        mut self,
        name: &str,
        property_type: PropertyType,
        options: PropertyOptions,
    ) -> Self {
        self.declare(name, property_type, options);
        self
    }

    /// Declares the primary key. Keys are generated on save by local
    /// repositories unless `options.auto(false)` is given.
    pub fn add_primary_key_property(
        mut self,
        name: &str,
        property_type: PropertyType,
        options: KeyOptions,
    ) -> Self {
        if let Some(existing) = &self.schema.primary_key {
            let message = format!("primary key already declared as {}", existing);
            self.fail(CofferError::new(&message, ErrorKind::SchemaError));
            return self;
        }
        if let Some(max) = options.max {
            if max < 1 {
                self.fail(CofferError::new(
                    "max key value must be positive",
                    ErrorKind::SchemaError,
                ));
                return self;
            }
            self.schema.max_key_value = max;
        }
        self.declare_key(name, property_type, options.auto.unwrap_or(true));
        if !name.is_empty() {
            self.schema.primary_key = Some(name.to_string());
        }
        self
    }

    /// Declares a secondary key. Keys are only generated when
    /// `options.auto(true)` is given.
    pub fn add_key_property(
        mut self,
        name: &str,
        property_type: PropertyType,
        options: KeyOptions,
    ) -> Self {
        self.declare_key(name, property_type, options.auto.unwrap_or(false));
        self
    }

    /// Declares a key property that references an item of another
    /// collection.
    pub fn add_foreign_key_property(
        mut self,
        name: &str,
        property_type: PropertyType,
        options: KeyOptions,
    ) -> Self {
        self.declare_key(name, property_type, options.auto.unwrap_or(false));
        if !name.is_empty() && !self.schema.foreign_keys.iter().any(|k| k == name) {
            self.schema.foreign_keys.push(name.to_string());
        }
        self
    }

    /// Declares a date property set once, on the first save to a local
    /// repository. `None` uses `createdOn`.
    pub fn add_created_on_property(mut self, name: Option<&str>) -> Self {
        let name = name.unwrap_or(DEFAULT_CREATED_ON_NAME).to_string();
        self.declare(&name, PropertyType::Date, PropertyOptions::default());
        self.register(
            LifecyclePhase::WillSave,
            Hook::from_fn(move |item, _options| {
                if !item.repository().is_local() {
                    return Ok(());
                }
                let unset = item.get(&name).map_or(true, |v| v.is_null());
                if unset {
                    item.set(&name, Utc::now())?;
                }
                Ok(())
            }),
        );
        self
    }

    /// Declares a date property refreshed on every save to a local
    /// repository, unless the save comes from replication or archiving.
    /// `None` uses `updatedOn`.
    pub fn add_updated_on_property(mut self, name: Option<&str>) -> Self {
        let name = name.unwrap_or(DEFAULT_UPDATED_ON_NAME).to_string();
        self.declare(&name, PropertyType::Date, PropertyOptions::default());
        self.register(
            LifecyclePhase::WillSave,
            Hook::from_fn(move |item, options| {
                if !item.repository().is_local() || options.source.is_replicated() {
                    return Ok(());
                }
                item.set(&name, Utc::now())
            }),
        );
        self
    }

    /// Declares a one-to-many relation to `collection_name`, whose items
    /// reference this item through `foreign_key`. Deleting an item from a
    /// local repository deletes its related items.
    pub fn add_has_many_relation(
        mut self,
        name: &str,
        collection_name: &str,
        foreign_key: &str,
    ) -> Self {
        let relation = match Relation::new(name, collection_name, foreign_key, RelationKind::HasMany) {
            Ok(relation) => relation,
            Err(e) => {
                self.fail(e);
                return self;
            }
        };
        if self.schema.relations.contains_key(name) || self.schema.properties.contains_key(name) {
            let message = format!("{} is already declared", name);
            self.fail(CofferError::new(&message, ErrorKind::InvalidRelation));
            return self;
        }
        self.schema.relations.insert(name.to_string(), relation);

        let relation_name = name.to_string();
        self.register(
            LifecyclePhase::DidDelete,
            Hook::from_async_fn(move |item, _options| {
                let relation_name = relation_name.clone();
                Box::pin(async move { delete_related_items(item, &relation_name).await })
            }),
        );
        self
    }

    pub fn add_index(mut self, properties: Vec<&str>, options: IndexOptions) -> Self {
        if properties.is_empty() {
            self.fail(CofferError::new(
                "an index needs at least one property",
                ErrorKind::SchemaError,
            ));
            return self;
        }
        let properties = properties.iter().map(|p| p.to_string()).collect();
        self.schema.indexes.push(IndexDefinition::new(properties, options));
        self
    }

    /// Registers a synchronous hook.
    pub fn on<F>(mut self, phase: LifecyclePhase, hook: F) -> Self
    where
        F: Fn(&mut Item, &ItemOptions) -> CofferResult<()> + Send + Sync + 'static,
    {
        self.register(phase, Hook::from_fn(hook));
        self
    }

    /// Registers an asynchronous hook. Only the save and delete phases
    /// accept one.
    pub fn on_async<F>(mut self, phase: LifecyclePhase, hook: F) -> Self
    where
        F: for<'a> Fn(&'a mut Item, &'a ItemOptions) -> BoxFuture<'a, CofferResult<()>>
            + Send
            + Sync
            + 'static,
    {
        self.register(phase, Hook::from_async_fn(hook));
        self
    }

    /// Finishes the declaration.
    ///
    /// # Errors
    ///
    /// Returns the first error captured while declaring.
    pub fn build(self) -> CofferResult<Arc<Schema>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(Arc::new(self.schema)),
        }
    }
}

async fn delete_related_items(item: &mut Item, relation_name: &str) -> CofferResult<()> {
    if !item.repository().is_local() {
        return Ok(());
    }
    let related = item.relation(relation_name)?;
    let children = related.find_items(FindOptions::default()).await?;
    let options = ItemOptions::default()
        .error_if_missing(false)
        .source(crate::collection::Source::Computer);
    for mut child in children {
        child.delete(options.clone()).await?;
    }
    Ok(())
}
