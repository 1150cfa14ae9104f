use crate::collection::item_ref::ResolvedItem;
use crate::collection::{CallOptions, Document, FindOptions, ItemOptions, ItemRef};
use crate::common::Value;
use crate::errors::{CofferError, CofferResult, ErrorKind};
use crate::item::{Item, Operation, OperationGuard};
use crate::repository::{ItemVisitor, Repository};
use crate::schema::{LifecyclePhase, Schema};
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::sync::Arc;

/// A foreign key every item of a scoped collection is bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedForeignKey {
    name: String,
    value: Value,
}

impl FixedForeignKey {
    pub fn new<T: Into<Value>>(name: &str, value: T) -> Self {
        FixedForeignKey {
            name: name.to_string(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// A named group of items of one type, bound to a [Repository].
///
/// A collection translates item operations into repository calls and runs
/// the item lifecycle around them. A collection may be scoped by a
/// [FixedForeignKey]: items it creates carry the key, and its queries and
/// calls only see items carrying it.
///
/// Collections are cheap to clone and share their state.
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

struct CollectionInner {
    schema: Arc<Schema>,
    repository: Arc<dyn Repository>,
    fixed_foreign_key: Option<FixedForeignKey>,
}

impl Collection {
    pub fn new(schema: Arc<Schema>, repository: Arc<dyn Repository>) -> Self {
        Collection {
            inner: Arc::new(CollectionInner {
                schema,
                repository,
                fixed_foreign_key: None,
            }),
        }
    }

    /// Returns a copy of this collection scoped by `fixed_foreign_key`.
    pub fn with_fixed_foreign_key(&self, fixed_foreign_key: FixedForeignKey) -> Collection {
        Collection {
            inner: Arc::new(CollectionInner {
                schema: Arc::clone(&self.inner.schema),
                repository: Arc::clone(&self.inner.repository),
                fixed_foreign_key: Some(fixed_foreign_key),
            }),
        }
    }

    fn with_repository(&self, repository: Arc<dyn Repository>) -> Collection {
        Collection {
            inner: Arc::new(CollectionInner {
                schema: Arc::clone(&self.inner.schema),
                repository,
                fixed_foreign_key: self.inner.fixed_foreign_key.clone(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.schema.collection_name()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.inner.schema
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.inner.repository
    }

    pub fn fixed_foreign_key(&self) -> Option<&FixedForeignKey> {
        self.inner.fixed_foreign_key.as_ref()
    }

    pub fn is_inside_transaction(&self) -> bool {
        self.inner.repository.is_inside_transaction()
    }

    /// Creates a new, unsaved item. A document becomes the item value; any
    /// other non-null scalar is taken as the primary key.
    pub fn create_item<T: Into<Value>>(&self, value: T) -> CofferResult<Item> {
        let document = self.to_document(value.into())?;
        let item = Item::created(self.clone(), document)?;
        self.finish_item(item)
    }

    /// Rebuilds an item from stored data. The item is neither new nor
    /// modified.
    pub fn unserialize_item<T: Into<Value>>(&self, value: T) -> CofferResult<Item> {
        let document = self.to_document(value.into())?;
        let item = Item::unserialized(self.clone(), document);
        self.finish_item(item)
    }

    /// Unserializes then serializes `value`, returning its canonical form.
    pub fn normalize<T: Into<Value>>(&self, value: T) -> CofferResult<Document> {
        Ok(self.unserialize_item(value)?.serialize())
    }

    fn to_document(&self, value: Value) -> CofferResult<Document> {
        match value {
            Value::Document(document) => Ok(document),
            Value::Null | Value::Array(_) => {
                log::error!("Cannot build {} from {}", self.schema().item_name(), value.type_name());
                Err(CofferError::new(
                    &format!("cannot build an item from {}", value.type_name()),
                    ErrorKind::InvalidArgument,
                ))
            }
            key => {
                let mut document = Document::new();
                document.put(self.schema().primary_key_name()?, key)?;
                Ok(document)
            }
        }
    }

    fn finish_item(&self, mut item: Item) -> CofferResult<Item> {
        if let Some(fixed) = self.fixed_foreign_key() {
            let mut value = item.serialize();
            value.put(fixed.name(), fixed.value().clone())?;
            item.replace_value(value);
        }
        item.emit_sync(LifecyclePhase::DidCreate, &ItemOptions::default())?;
        Ok(item)
    }

    fn resolve<'a>(&self, item: ItemRef<'a>) -> CofferResult<ResolvedItem<'a>> {
        match item {
            ItemRef::Key(key) => {
                if key.is_empty_key() {
                    log::error!("Empty key passed to {}", self.name());
                    return Err(CofferError::new(
                        "key or item is empty",
                        ErrorKind::InvalidArgument,
                    ));
                }
                Ok(ResolvedItem::Owned(Box::new(self.create_item(key)?)))
            }
            ItemRef::Partial(document) => {
                Ok(ResolvedItem::Owned(Box::new(self.create_item(document)?)))
            }
            ItemRef::Existing(item) => {
                if item.schema().is_kind_of(self.schema().item_name()) {
                    Ok(ResolvedItem::Borrowed(item))
                } else {
                    log::warn!(
                        "{} is not a {}, using a copy",
                        item.schema().item_name(),
                        self.schema().item_name()
                    );
                    let copy = self.create_item(item.serialize())?;
                    Ok(ResolvedItem::Owned(Box::new(copy)))
                }
            }
        }
    }

    fn scoped(&self, mut query: Document) -> CofferResult<Document> {
        if let Some(fixed) = self.fixed_foreign_key() {
            query.put(fixed.name(), fixed.value().clone())?;
        }
        Ok(query)
    }

    fn scoped_find_options(&self, mut options: FindOptions) -> CofferResult<FindOptions> {
        options.query = self.scoped(options.query)?;
        Ok(options)
    }

    /// Fetches an item by key, partial value or existing item.
    ///
    /// Returns `None` only when `error_if_missing` is `Some(false)` and the
    /// item does not exist.
    pub async fn get_item<'a, I>(&self, item: I, options: ItemOptions) -> CofferResult<Option<Item>>
    where
        I: Into<ItemRef<'a>>,
    {
        let item = self.resolve(item.into())?;
        let found = self
            .repository()
            .get_item(self, &item, &options)
            .await?;
        match found {
            Some(mut found) => {
                found.emit_sync(LifecyclePhase::DidLoad, &options)?;
                Ok(Some(found))
            }
            None => Ok(None),
        }
    }

    /// Saves an item inside a transaction, running the save hooks and
    /// validation. An existing item passed by reference is updated in
    /// place; the saved item is returned either way.
    pub async fn put_item<'a, I>(&self, item: I, options: ItemOptions) -> CofferResult<Item>
    where
        I: Into<ItemRef<'a>>,
    {
        let mut item = self.resolve(item.into())?;
        {
            let mut saving = OperationGuard::new(&mut item, Operation::Saving);
            saving
                .transaction(move |saving_item| save_item(saving_item, options).boxed())
                .await?;
        }
        Ok(item.into_item())
    }

    /// Deletes an item inside a transaction, running the delete hooks.
    /// Returns whether the repository deleted something.
    pub async fn delete_item<'a, I>(&self, item: I, options: ItemOptions) -> CofferResult<bool>
    where
        I: Into<ItemRef<'a>>,
    {
        let mut item = self.resolve(item.into())?;
        let mut deleting = OperationGuard::new(&mut item, Operation::Deleting);
        let deleted = deleting
            .transaction(move |deleting_item| delete_item(deleting_item, options).boxed())
            .await?;
        Ok(deleted)
    }

    pub async fn get_items(&self, items: Vec<ItemRef<'_>>, options: ItemOptions) -> CofferResult<Vec<Item>> {
        let mut resolved = Vec::with_capacity(items.len());
        for item in items {
            resolved.push(self.resolve(item)?.into_item());
        }
        let mut found = self
            .repository()
            .get_items(self, &resolved, &options)
            .await?;
        for item in found.iter_mut() {
            item.emit_sync(LifecyclePhase::DidLoad, &options)?;
        }
        Ok(found)
    }

    /// Same as [Collection::get_items] for keys or partial values held in
    /// a [Value], which must be an array.
    pub async fn get_items_by_keys(&self, keys: &Value, options: ItemOptions) -> CofferResult<Vec<Item>> {
        let keys = match keys.as_array() {
            Some(keys) => keys,
            None => {
                log::error!("get_items expects an array, got {}", keys.type_name());
                return Err(CofferError::new(
                    "invalid 'items' parameter (should be an array)",
                    ErrorKind::InvalidArgument,
                ));
            }
        };
        let items = keys.iter().cloned().map(ItemRef::from).collect();
        self.get_items(items, options).await
    }

    pub async fn find_items(&self, options: FindOptions) -> CofferResult<Vec<Item>> {
        let options = self.scoped_find_options(options)?;
        let item_options = ItemOptions::from(&options);
        let mut items = self
            .repository()
            .find_items(self, &options)
            .await?;
        for item in items.iter_mut() {
            item.emit_sync(LifecyclePhase::DidLoad, &item_options)?;
        }
        Ok(items)
    }

    pub async fn count_items(&self, options: FindOptions) -> CofferResult<usize> {
        let options = self.scoped_find_options(options)?;
        self.repository().count_items(self, &options).await
    }

    /// Visits the matching items one at a time, in query order. The first
    /// error returned by `f` stops the iteration.
    pub async fn for_each_items<'f, F, Fut>(&self, options: FindOptions, mut f: F) -> CofferResult<()>
    where
        F: FnMut(Item) -> Fut + Send + 'f,
        Fut: Future<Output = CofferResult<()>> + Send + 'f,
    {
        let options = self.scoped_find_options(options)?;
        let item_options = ItemOptions::from(&options);
        let mut visitor = move |mut item: Item| -> BoxFuture<'f, CofferResult<()>> {
            if let Err(e) = item.emit_sync(LifecyclePhase::DidLoad, &item_options) {
                return future::ready(Err(e)).boxed();
            }
            f(item).boxed()
        };
        let visitor: &mut ItemVisitor<'f> = &mut visitor;
        self.repository()
            .for_each_items(self, &options, visitor)
            .await
    }

    /// Deletes every matching item in the repository and returns how many
    /// were deleted. Item hooks do not run and relations do not cascade.
    pub async fn find_and_delete_items(&self, options: FindOptions) -> CofferResult<usize> {
        let options = self.scoped_find_options(options)?;
        self.repository()
            .find_and_delete_items(self, &options)
            .await
    }

    /// Same as [Collection::call_collection].
    pub async fn call(&self, method: &str, options: CallOptions, body: Option<Value>) -> CofferResult<Value> {
        self.call_collection(method, options, body).await
    }

    /// Invokes a repository method on this collection.
    pub async fn call_collection(
        &self,
        method: &str,
        mut options: CallOptions,
        body: Option<Value>,
    ) -> CofferResult<Value> {
        options.query = self.scoped(options.query)?;
        self.repository()
            .call(self, None, method, &options, body)
            .await
    }

    /// Invokes a repository method on one item.
    pub async fn call_item<'a, I>(
        &self,
        item: I,
        method: &str,
        options: CallOptions,
        body: Option<Value>,
    ) -> CofferResult<Value>
    where
        I: Into<ItemRef<'a>>,
    {
        let item = self.resolve(item.into())?;
        self.call_existing_item(&item, method, options, body).await
    }

    pub(crate) async fn call_existing_item(
        &self,
        item: &Item,
        method: &str,
        options: CallOptions,
        body: Option<Value>,
    ) -> CofferResult<Value> {
        self.repository()
            .call(self, Some(item), method, &options, body)
            .await
    }

    /// Runs `f` with a collection bound to a transactional repository,
    /// committing when it succeeds and rolling back when it fails. Inside
    /// a running transaction `f` gets this collection and no new
    /// transaction is opened.
    pub async fn transaction<F, Fut, R>(&self, f: F) -> CofferResult<R>
    where
        F: FnOnce(Collection) -> Fut,
        Fut: Future<Output = CofferResult<R>>,
    {
        if self.is_inside_transaction() {
            return f(self.clone()).await;
        }

        let repository = self.repository().begin_transaction().await?;
        let collection = self.with_repository(Arc::clone(&repository));
        match f(collection).await {
            Ok(result) => {
                repository.commit().await?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_error) = repository.rollback().await {
                    log::error!("Failed to rollback transaction: {}", rollback_error);
                }
                Err(e)
            }
        }
    }

    /// Builds the address of this collection, or of one of its methods.
    pub fn make_url(&self, method: Option<&str>, options: &CallOptions) -> CofferResult<String> {
        self.repository().make_url(self, None, method, options)
    }
}

impl Debug for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name())
            .field("repository", &self.repository().name())
            .field("fixed_foreign_key", &self.fixed_foreign_key())
            .finish()
    }
}

fn location(repository: &dyn Repository) -> &'static str {
    if repository.is_local() {
        "local"
    } else {
        "remote"
    }
}

async fn save_item(item: &mut Item, options: ItemOptions) -> CofferResult<()> {
    item.emit(LifecyclePhase::WillSave, &options).await?;
    if options.validate != Some(false) {
        item.validate()?;
    }

    let mut put_options = options.clone();
    if item.is_new() && put_options.error_if_exists.is_none() {
        put_options.error_if_exists = Some(true);
    }
    let collection = item.collection().clone();
    let repository = collection.repository();
    repository.put_item(&collection, item, &put_options).await?;

    item.emit(LifecyclePhase::DidSave, &options).await?;
    log::debug!(
        "{}#{} saved to {} repository",
        item.schema().item_name(),
        item.primary_key_value()?.to_key_string(),
        location(repository.as_ref())
    );
    Ok(())
}

async fn delete_item(item: &mut Item, options: ItemOptions) -> CofferResult<bool> {
    item.emit(LifecyclePhase::WillDelete, &options).await?;
    let collection = item.collection().clone();
    let repository = collection.repository();
    let deleted = repository.delete_item(&collection, item, &options).await?;
    if deleted {
        item.emit(LifecyclePhase::DidDelete, &options).await?;
        log::debug!(
            "{}#{} deleted from {} repository",
            item.schema().item_name(),
            item.primary_key_value()?.to_key_string(),
            location(repository.as_ref())
        );
    }
    Ok(deleted)
}
