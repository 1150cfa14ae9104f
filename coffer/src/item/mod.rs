//! Items: typed records bound to a collection.

mod key_generator;

pub(crate) use key_generator::generate_key;

use crate::collection::{CallOptions, Collection, Document, FixedForeignKey, ItemOptions};
use crate::common::Value;
use crate::errors::{CofferError, CofferResult, ErrorKind};
use crate::repository::Repository;
use crate::schema::{Hook, LifecyclePhase, Schema};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A record of some item type, bound to the collection it came from.
///
/// An item tracks whether it was ever saved (`is_new`) and whether it
/// changed since it was created, loaded or saved (`is_modified`). Those
/// flags are maintained by built-in lifecycle handling that runs before
/// any user hook of the same phase.
#[derive(Clone)]
pub struct Item {
    collection: Collection,
    value: Document,
    is_new: bool,
    is_modified: bool,
    is_saving: bool,
    is_deleting: bool,
    relations: HashMap<String, Collection>,
}

impl Item {
    pub(crate) fn created(collection: Collection, mut value: Document) -> CofferResult<Item> {
        collection.schema().apply_defaults(&mut value)?;
        Ok(Item::with_flags(collection, value, true))
    }

    pub(crate) fn unserialized(collection: Collection, mut value: Document) -> Item {
        collection.schema().coerce(&mut value);
        Item::with_flags(collection, value, false)
    }

    fn with_flags(collection: Collection, value: Document, is_new: bool) -> Item {
        Item {
            collection,
            value,
            is_new,
            is_modified: false,
            is_saving: false,
            is_deleting: false,
            relations: HashMap::new(),
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.collection.schema()
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        self.collection.repository()
    }

    /// Name of the application the repository belongs to, if any.
    pub fn app(&self) -> Option<&str> {
        self.repository().app()
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn set_is_new(&mut self, is_new: bool) {
        self.is_new = is_new;
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    pub fn set_is_modified(&mut self, is_modified: bool) {
        self.is_modified = is_modified;
    }

    /// `true` while a save of this item is in progress.
    pub fn is_saving(&self) -> bool {
        self.is_saving
    }

    /// `true` while a deletion of this item is in progress.
    pub fn is_deleting(&self) -> bool {
        self.is_deleting
    }

    fn mark(&mut self, operation: Operation, active: bool) {
        match operation {
            Operation::Saving => self.is_saving = active,
            Operation::Deleting => self.is_deleting = active,
        }
    }

    pub fn is_inside_transaction(&self) -> bool {
        self.repository().is_inside_transaction()
    }

    pub fn value(&self) -> &Document {
        &self.value
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.value.get(name)
    }

    /// Sets a property and marks the item as modified.
    pub fn set<T: Into<Value>>(&mut self, name: &str, value: T) -> CofferResult<()> {
        self.value.put(name, value)?;
        self.emit_sync(LifecyclePhase::DidChange, &ItemOptions::default())
    }

    /// Replaces the whole value without running change hooks.
    pub fn replace_value(&mut self, value: Document) {
        self.value = value;
    }

    /// Returns a copy of the plain data.
    pub fn serialize(&self) -> Document {
        self.value.clone()
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.value.to_json()
    }

    pub fn primary_key_name(&self) -> CofferResult<&str> {
        self.schema().primary_key_name()
    }

    /// Current primary key value, `Null` when unset.
    pub fn primary_key_value(&self) -> CofferResult<Value> {
        let name = self.primary_key_name()?;
        Ok(self.value.get(name).cloned().unwrap_or(Value::Null))
    }

    pub fn foreign_key_names(&self) -> &[String] {
        self.schema().foreign_key_names()
    }

    /// Fills the key property `name` with a random value unless it is
    /// already set.
    ///
    /// # Errors
    ///
    /// Returns a `SchemaError` for an undeclared property and an
    /// `UnsupportedKeyType` error if its type cannot be generated.
    pub fn generate_key_value(&mut self, name: &str) -> CofferResult<()> {
        let property_type = match self.schema().property(name) {
            Some(property) => property.property_type(),
            None => {
                log::error!("{} has no property {}", self.schema().item_name(), name);
                return Err(CofferError::new(
                    &format!("unknown property {}", name),
                    ErrorKind::SchemaError,
                ));
            }
        };
        if self.value.get(name).is_some_and(|v| !v.is_empty_key()) {
            return Ok(());
        }
        let key = generate_key(property_type, self.schema().max_key_value())?;
        self.set(name, key)
    }

    pub fn generate_primary_key_value(&mut self) -> CofferResult<()> {
        let name = self.primary_key_name()?.to_string();
        self.generate_key_value(&name)
    }

    /// Returns the collection of items related to this one through the
    /// relation `name`, scoped to this item's primary key.
    ///
    /// # Errors
    ///
    /// Fails for undeclared relations, when the item has no primary key
    /// value yet, or when the repository does not know the related
    /// collection.
    pub fn relation(&mut self, name: &str) -> CofferResult<Collection> {
        if let Some(collection) = self.relations.get(name) {
            return Ok(collection.clone());
        }
        let relation = match self.schema().relation(name) {
            Some(relation) => relation.clone(),
            None => {
                log::error!("{} has no relation {}", self.schema().item_name(), name);
                return Err(CofferError::new(
                    &format!("unknown relation {}", name),
                    ErrorKind::InvalidRelation,
                ));
            }
        };
        let primary_key = self.primary_key_value()?;
        if primary_key.is_empty_key() {
            log::error!("Cannot resolve {} before {} has a key", name, self.schema().item_name());
            return Err(CofferError::new(
                "primary key value is missing",
                ErrorKind::InvalidOperation,
            ));
        }
        let collection = Arc::clone(self.repository())
            .create_collection(relation.collection_name())?
            .with_fixed_foreign_key(FixedForeignKey::new(relation.foreign_key(), primary_key));
        self.relations.insert(name.to_string(), collection.clone());
        Ok(collection)
    }

    /// Builds the address of this item, or of one of its methods.
    pub fn make_url(&self, method: Option<&str>, options: &CallOptions) -> CofferResult<String> {
        self.repository()
            .make_url(&self.collection, Some(self), method, options)
    }

    /// Loads the stored state of this item, replacing its value.
    ///
    /// With `error_if_missing(false)` a missing item leaves this one
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns an `IdentityMismatch` error if the repository answers with a
    /// different item.
    pub async fn load(&mut self, options: ItemOptions) -> CofferResult<()> {
        let collection = self.collection.clone();
        let error_if_missing = options.error_if_missing;
        let loaded = collection.get_item(&mut *self, options).await?;
        let loaded = match loaded {
            Some(loaded) => loaded,
            None if error_if_missing == Some(false) => return Ok(()),
            None => {
                log::error!("{} was not found", self.schema().item_name());
                return Err(CofferError::new("item not found", ErrorKind::NotFound));
            }
        };
        if loaded.schema().item_name() != self.schema().item_name()
            || loaded.primary_key_value()? != self.primary_key_value()?
        {
            log::error!(
                "Loading {} returned a different item ({})",
                self.schema().item_name(),
                loaded.schema().item_name()
            );
            return Err(CofferError::new(
                "load() returned an item with a different identity",
                ErrorKind::IdentityMismatch,
            ));
        }
        self.value = loaded.value;
        self.is_new = loaded.is_new;
        self.is_modified = loaded.is_modified;
        Ok(())
    }

    pub async fn save(&mut self, options: ItemOptions) -> CofferResult<()> {
        let collection = self.collection.clone();
        collection.put_item(&mut *self, options).await?;
        Ok(())
    }

    /// Deletes this item. Returns whether something was deleted.
    pub async fn delete(&mut self, options: ItemOptions) -> CofferResult<bool> {
        let collection = self.collection.clone();
        collection.delete_item(&mut *self, options).await
    }

    pub async fn call(
        &self,
        method: &str,
        options: CallOptions,
        body: Option<Value>,
    ) -> CofferResult<Value> {
        self.collection
            .call_existing_item(self, method, options, body)
            .await
    }

    /// Runs `f` on a copy of this item bound to a transactional repository.
    ///
    /// The copy is committed and copied back when `f` succeeds. On failure
    /// the transaction is rolled back and this item keeps its previous
    /// state. Inside a running transaction `f` runs on this item directly.
    pub async fn transaction<F, R>(&mut self, f: F) -> CofferResult<R>
    where
        F: for<'a> FnOnce(&'a mut Item) -> BoxFuture<'a, CofferResult<R>> + Send,
        R: Send,
    {
        if self.is_inside_transaction() {
            return f(self).await;
        }

        let value = self.value.clone();
        let is_new = self.is_new;
        let is_modified = self.is_modified;
        let is_saving = self.is_saving;
        let is_deleting = self.is_deleting;
        let (result, transactional_item) = self
            .collection
            .transaction(move |collection| async move {
                let mut transactional_item = collection.unserialize_item(value)?;
                transactional_item.is_new = is_new;
                transactional_item.is_modified = is_modified;
                transactional_item.is_saving = is_saving;
                transactional_item.is_deleting = is_deleting;
                let result = f(&mut transactional_item).await?;
                Ok((result, transactional_item))
            })
            .await?;

        self.value = transactional_item.value;
        self.is_new = transactional_item.is_new;
        self.is_modified = transactional_item.is_modified;
        Ok(result)
    }

    pub fn validate(&self) -> CofferResult<()> {
        self.schema().validate(&self.value)
    }

    fn apply_builtin(&mut self, phase: LifecyclePhase) {
        match phase {
            LifecyclePhase::DidCreate => self.is_modified = false,
            LifecyclePhase::DidLoad | LifecyclePhase::DidSave => {
                self.is_new = false;
                self.is_modified = false;
            }
            LifecyclePhase::DidChange => self.is_modified = true,
            _ => {}
        }
    }

    /// Runs the hooks of a synchronous phase.
    pub(crate) fn emit_sync(&mut self, phase: LifecyclePhase, options: &ItemOptions) -> CofferResult<()> {
        self.apply_builtin(phase);
        let hooks = self.schema().hooks(phase);
        for hook in hooks {
            match hook {
                Hook::Sync(hook) => hook(self, options)?,
                Hook::Async(_) => {
                    log::error!("Asynchronous hook found for {}", phase);
                    return Err(CofferError::new(
                        &format!("{} hooks must be synchronous", phase),
                        ErrorKind::InternalError,
                    ));
                }
            }
        }
        Ok(())
    }

    /// Runs the hooks of any phase, awaiting asynchronous ones in turn.
    pub(crate) async fn emit(&mut self, phase: LifecyclePhase, options: &ItemOptions) -> CofferResult<()> {
        self.apply_builtin(phase);
        let hooks = self.schema().hooks(phase);
        for hook in hooks {
            match hook {
                Hook::Sync(hook) => hook(self, options)?,
                Hook::Async(hook) => hook(self, options).await?,
            }
        }
        Ok(())
    }
}

impl Debug for Item {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Item")
            .field("type", &self.schema().item_name())
            .field("value", &self.value)
            .field("is_new", &self.is_new)
            .field("is_modified", &self.is_modified)
            .finish()
    }
}

/// An operation that flags the item while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Saving,
    Deleting,
}

/// Keeps `is_saving` or `is_deleting` set on an item until dropped, so the
/// flag is cleared when the operation fails or its future is dropped.
pub(crate) struct OperationGuard<'i> {
    item: &'i mut Item,
    operation: Operation,
}

impl<'i> OperationGuard<'i> {
    pub(crate) fn new(item: &'i mut Item, operation: Operation) -> Self {
        item.mark(operation, true);
        OperationGuard { item, operation }
    }
}

impl Deref for OperationGuard<'_> {
    type Target = Item;

    fn deref(&self) -> &Item {
        self.item
    }
}

impl DerefMut for OperationGuard<'_> {
    fn deref_mut(&mut self) -> &mut Item {
        self.item
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.item.mark(self.operation, false);
    }
}
