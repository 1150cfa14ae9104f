use super::query::{project, Query, SortKey};
use super::store::{not_found, MemoryStore, StoreView, TransactionalStore, WriteCheck};
use crate::collection::{CallOptions, Collection, Document, FindOptions, ItemOptions};
use crate::common::{atomic, Atomic, ReadExecutor, Value, WriteExecutor};
use crate::config::{RepositoryConfig, RepositoryConfigBuilder};
use crate::errors::{CofferError, CofferResult, ErrorKind};
use crate::item::Item;
use crate::repository::{Catalog, ItemVisitor, Repository};
use crate::schema::Schema;
use async_trait::async_trait;
use itertools::Itertools;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// An invocation of a registered method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// Name of the collection the method was called on.
    pub collection: String,
    /// Primary key of the item, for item methods.
    pub key: Option<Value>,
    pub query: Document,
    pub params: Document,
    pub body: Option<Value>,
}

pub type MethodHandler = Arc<dyn Fn(MethodCall) -> CofferResult<Value> + Send + Sync>;

/// A [Repository] keeping items in memory.
///
/// Handles returned by [Repository::begin_transaction] share the tables,
/// the catalog and the registered methods of the repository that opened
/// them.
pub struct MemoryRepository {
    config: RepositoryConfig,
    catalog: Catalog,
    store: MemoryStore,
    transaction: Option<Arc<TransactionalStore>>,
    methods: Atomic<HashMap<String, MethodHandler>>,
    transaction_count: Arc<AtomicUsize>,
}

impl MemoryRepository {
    pub fn builder() -> MemoryRepositoryBuilder {
        MemoryRepositoryBuilder::new()
    }

    /// Creates a repository serving the schemas of `catalog`.
    pub fn new(config: RepositoryConfig, catalog: Catalog) -> Self {
        MemoryRepository {
            config,
            catalog,
            store: MemoryStore::new(),
            transaction: None,
            methods: atomic(HashMap::new()),
            transaction_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Number of transactions opened so far.
    pub fn transaction_count(&self) -> usize {
        self.transaction_count.load(Ordering::SeqCst)
    }

    /// Number of committed items in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.store.len(collection)
    }

    /// Registers the handler of method `method` of `collection`, replacing
    /// any previous one.
    pub fn register_method<F>(&self, collection: &str, method: &str, handler: F)
    where
        F: Fn(MethodCall) -> CofferResult<Value> + Send + Sync + 'static,
    {
        let key = method_key(collection, method);
        self.methods
            .write_with(|methods| methods.insert(key, Arc::new(handler)));
    }

    fn view(&self) -> StoreView {
        match &self.transaction {
            Some(transaction) => StoreView::Transactional(Arc::clone(transaction)),
            None => StoreView::Primary(self.store.clone()),
        }
    }

    fn transaction(&self) -> CofferResult<&Arc<TransactionalStore>> {
        match &self.transaction {
            Some(transaction) => Ok(transaction),
            None => {
                log::error!("No transaction in progress on {}", self.config.name());
                Err(CofferError::new(
                    "no transaction in progress",
                    ErrorKind::InvalidOperation,
                ))
            }
        }
    }

    fn load(&self, collection: &Collection, document: Document, properties: Option<&Vec<String>>) -> CofferResult<Item> {
        let document = match properties {
            Some(properties) => project(document, properties, collection.schema().primary_key_name()?),
            None => document,
        };
        collection.unserialize_item(document)
    }

    fn fetch(&self, collection: &Collection, item: &Item, options: &ItemOptions) -> CofferResult<Option<Item>> {
        let key = key_of(item)?;
        match self.view().get(collection.name(), &key)? {
            Some(document) => Ok(Some(self.load(collection, document, options.properties.as_ref())?)),
            None if options.error_if_missing == Some(false) => Ok(None),
            None => {
                log::error!("{}#{} not found in {}", collection.name(), key.to_key_string(), self.config.name());
                Err(not_found(collection.name(), &key))
            }
        }
    }

    fn select(
        &self,
        collection: &Collection,
        options: &FindOptions,
    ) -> CofferResult<Vec<(SortKey, Document)>> {
        let primary_key = collection.schema().primary_key_name()?;
        let query = Query::new(options, primary_key)?;
        let table = self.view().snapshot(collection.name())?;
        Ok(query.select(table.into_values(), options.limit))
    }
}

fn method_key(collection: &str, method: &str) -> String {
    format!("{}:{}", collection, method)
}

fn key_of(item: &Item) -> CofferResult<Value> {
    let key = item.primary_key_value()?;
    if key.is_empty_key() {
        log::error!("{} has no primary key value", item.schema().item_name());
        return Err(CofferError::new(
            "primary key value is missing",
            ErrorKind::InvalidArgument,
        ));
    }
    Ok(key)
}

#[async_trait]
impl Repository for MemoryRepository {
    fn name(&self) -> &str {
        self.config.name()
    }

    fn is_local(&self) -> bool {
        self.config.is_local()
    }

    fn is_inside_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    fn app(&self) -> Option<&str> {
        self.config.app()
    }

    fn create_collection(self: Arc<Self>, name: &str) -> CofferResult<Collection> {
        let schema = self.catalog.schema(name)?;
        Ok(Collection::new(schema, self))
    }

    async fn begin_transaction(&self) -> CofferResult<Arc<dyn Repository>> {
        if self.transaction.is_some() {
            log::error!("Nested transaction requested on {}", self.config.name());
            return Err(CofferError::new(
                "a transaction is already in progress",
                ErrorKind::TransactionError,
            ));
        }
        let transaction = TransactionalStore::new(self.store.clone());
        self.transaction_count.fetch_add(1, Ordering::SeqCst);
        log::debug!("Transaction {} started on {}", transaction.id(), self.config.name());
        Ok(Arc::new(MemoryRepository {
            config: self.config.clone(),
            catalog: self.catalog.clone(),
            store: self.store.clone(),
            transaction: Some(Arc::new(transaction)),
            methods: Arc::clone(&self.methods),
            transaction_count: Arc::clone(&self.transaction_count),
        }))
    }

    async fn commit(&self) -> CofferResult<()> {
        let transaction = self.transaction()?;
        transaction.commit()?;
        log::debug!("Transaction {} committed", transaction.id());
        Ok(())
    }

    async fn rollback(&self) -> CofferResult<()> {
        let transaction = self.transaction()?;
        transaction.rollback()?;
        log::debug!("Transaction {} rolled back", transaction.id());
        Ok(())
    }

    async fn get_item(
        &self,
        collection: &Collection,
        item: &Item,
        options: &ItemOptions,
    ) -> CofferResult<Option<Item>> {
        self.fetch(collection, item, options)
    }

    async fn put_item(
        &self,
        collection: &Collection,
        item: &mut Item,
        options: &ItemOptions,
    ) -> CofferResult<()> {
        let key = key_of(item)?;
        let check = WriteCheck {
            error_if_exists: options.error_if_exists == Some(true),
            error_if_missing: options.error_if_missing == Some(true),
        };
        self.view()
            .put(collection.name(), key, item.serialize(), check)
    }

    async fn delete_item(
        &self,
        collection: &Collection,
        item: &Item,
        options: &ItemOptions,
    ) -> CofferResult<bool> {
        let key = key_of(item)?;
        let deleted = self.view().remove(collection.name(), &key)?;
        if !deleted && options.error_if_missing != Some(false) {
            log::error!("{}#{} not found in {}", collection.name(), key.to_key_string(), self.config.name());
            return Err(not_found(collection.name(), &key));
        }
        Ok(deleted)
    }

    async fn get_items(
        &self,
        collection: &Collection,
        items: &[Item],
        options: &ItemOptions,
    ) -> CofferResult<Vec<Item>> {
        let mut found = Vec::with_capacity(items.len());
        for item in items {
            if let Some(item) = self.fetch(collection, item, options)? {
                found.push(item);
            }
        }
        Ok(found)
    }

    async fn find_items(
        &self,
        collection: &Collection,
        options: &FindOptions,
    ) -> CofferResult<Vec<Item>> {
        let selected = self.select(collection, options)?;
        selected
            .into_iter()
            .map(|(_, document)| self.load(collection, document, options.properties.as_ref()))
            .collect()
    }

    async fn count_items(&self, collection: &Collection, options: &FindOptions) -> CofferResult<usize> {
        Ok(self.select(collection, options)?.len())
    }

    async fn for_each_items<'v>(
        &self,
        collection: &Collection,
        options: &FindOptions,
        visitor: &mut ItemVisitor<'v>,
    ) -> CofferResult<()> {
        let primary_key = collection.schema().primary_key_name()?;
        let query = Query::new(options, primary_key)?;
        let view = self.view();
        let keys = query
            .select(view.snapshot(collection.name())?.into_values(), options.limit)
            .into_iter()
            .map(|(_, document)| document.get(primary_key).cloned().unwrap_or(Value::Null))
            .collect_vec();

        for page in keys.chunks(self.config.page_size()) {
            let documents = view.get_many(collection.name(), page)?;
            // items removed or changed by earlier visits are skipped
            for document in documents.into_iter().flatten() {
                if !query.matches(&document) {
                    continue;
                }
                let item = self.load(collection, document, options.properties.as_ref())?;
                visitor(item).await?;
            }
        }
        Ok(())
    }

    async fn find_and_delete_items(
        &self,
        collection: &Collection,
        options: &FindOptions,
    ) -> CofferResult<usize> {
        let primary_key = collection.schema().primary_key_name()?;
        let keys = self
            .select(collection, options)?
            .into_iter()
            .map(|(_, document)| document.get(primary_key).cloned().unwrap_or(Value::Null))
            .collect_vec();
        let deleted = self.view().remove_all(collection.name(), &keys)?;
        log::debug!("{} items deleted from {}", deleted, collection.name());
        Ok(deleted)
    }

    async fn call(
        &self,
        collection: &Collection,
        item: Option<&Item>,
        method: &str,
        options: &CallOptions,
        body: Option<Value>,
    ) -> CofferResult<Value> {
        let handler = self
            .methods
            .read_with(|methods| methods.get(&method_key(collection.name(), method)).cloned());
        let handler = match handler {
            Some(handler) => handler,
            None => {
                log::error!("Method {} is not registered on {}", method, collection.name());
                return Err(CofferError::new(
                    &format!("unknown method {}", method),
                    ErrorKind::InvalidOperation,
                ));
            }
        };
        let key = match item {
            Some(item) => Some(key_of(item)?),
            None => None,
        };
        handler(MethodCall {
            collection: collection.name().to_string(),
            key,
            query: options.query.clone(),
            params: options.params.clone(),
            body,
        })
    }

    fn make_url(
        &self,
        collection: &Collection,
        item: Option<&Item>,
        method: Option<&str>,
        options: &CallOptions,
    ) -> CofferResult<String> {
        let base_url = match self.config.base_url() {
            Some(base_url) => base_url,
            None => {
                log::error!("{} has no base url", self.config.name());
                return Err(CofferError::new(
                    "base url is not configured",
                    ErrorKind::InvalidOperation,
                ));
            }
        };
        let mut url = format!("{}/{}", base_url, collection.name());
        if let Some(item) = item {
            url.push('/');
            url.push_str(&key_of(item)?.to_key_string());
        }
        if let Some(method) = method {
            url.push(':');
            url.push_str(method);
        }
        if !options.query.is_empty() {
            let query = options
                .query
                .iter()
                .map(|(name, value)| format!("{}={}", name, value.to_key_string()))
                .join("&");
            url.push('?');
            url.push_str(&query);
        }
        Ok(url)
    }
}

/// Builder for [MemoryRepository].
///
/// ```rust,ignore
/// let mirror = MemoryRepository::builder()
///     .name("mirror")
///     .local(false)
///     .schema(vaults)
///     .build()?;
/// ```
#[derive(Default)]
pub struct MemoryRepositoryBuilder {
    config: RepositoryConfigBuilder,
    schemas: Vec<Arc<Schema>>,
}

impl MemoryRepositoryBuilder {
    pub fn new() -> Self {
        MemoryRepositoryBuilder {
            config: RepositoryConfigBuilder::new(),
            schemas: Vec::new(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.config = self.config.name(name);
        self
    }

    pub fn local(mut self, local: bool) -> Self {
        self.config = self.config.local(local);
        self
    }

    pub fn app(mut self, app: &str) -> Self {
        self.config = self.config.app(app);
        self
    }

    pub fn base_url(mut self, base_url: &str) -> Self {
        self.config = self.config.base_url(base_url);
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.config = self.config.page_size(page_size);
        self
    }

    /// Registers a collection.
    pub fn schema(mut self, schema: Arc<Schema>) -> Self {
        self.schemas.push(schema);
        self
    }

    pub fn build(self) -> CofferResult<Arc<MemoryRepository>> {
        let config = self.config.build()?;
        let catalog = Catalog::new();
        for schema in self.schemas {
            catalog.register(schema)?;
        }
        log::debug!(
            "Memory repository {} created with collections {:?}",
            config.name(),
            catalog.collection_names()
        );
        Ok(Arc::new(MemoryRepository::new(config, catalog)))
    }
}
