//! Storage backends.
//!
//! A [Repository] persists items for collections and provides the
//! transactions they run in. Collections call it through
//! `Arc<dyn Repository>`, so local stores and remote mirrors are
//! interchangeable. [memory::MemoryRepository] is the in-process backend.

mod catalog;
pub mod memory;

pub use catalog::*;

use crate::collection::{CallOptions, Collection, FindOptions, ItemOptions};
use crate::common::Value;
use crate::errors::CofferResult;
use crate::item::Item;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Callback invoked by [Repository::for_each_items] for every item.
pub type ItemVisitor<'v> = dyn FnMut(Item) -> BoxFuture<'v, CofferResult<()>> + Send + 'v;

/// A store of items.
///
/// Implementations signal missing or duplicate items according to the
/// `error_if_missing` and `error_if_exists` options, and return a
/// transactional handle from [Repository::begin_transaction] whose
/// [Repository::is_inside_transaction] is `true`.
#[async_trait]
pub trait Repository: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this repository owns the data rather than mirroring it.
    fn is_local(&self) -> bool;

    fn is_inside_transaction(&self) -> bool;

    fn app(&self) -> Option<&str>;

    /// Returns the collection registered under `name`, bound to this
    /// repository.
    fn create_collection(self: Arc<Self>, name: &str) -> CofferResult<Collection>;

    /// Opens a transaction and returns the handle to use until it is
    /// committed or rolled back.
    async fn begin_transaction(&self) -> CofferResult<Arc<dyn Repository>>;

    async fn commit(&self) -> CofferResult<()>;

    async fn rollback(&self) -> CofferResult<()>;

    async fn get_item(
        &self,
        collection: &Collection,
        item: &Item,
        options: &ItemOptions,
    ) -> CofferResult<Option<Item>>;

    /// Stores `item`. The repository may update the item value, for
    /// instance with fields assigned by a server.
    async fn put_item(
        &self,
        collection: &Collection,
        item: &mut Item,
        options: &ItemOptions,
    ) -> CofferResult<()>;

    async fn delete_item(
        &self,
        collection: &Collection,
        item: &Item,
        options: &ItemOptions,
    ) -> CofferResult<bool>;

    async fn get_items(
        &self,
        collection: &Collection,
        items: &[Item],
        options: &ItemOptions,
    ) -> CofferResult<Vec<Item>>;

    async fn find_items(
        &self,
        collection: &Collection,
        options: &FindOptions,
    ) -> CofferResult<Vec<Item>>;

    async fn count_items(&self, collection: &Collection, options: &FindOptions) -> CofferResult<usize>;

    async fn for_each_items<'v>(
        &self,
        collection: &Collection,
        options: &FindOptions,
        visitor: &mut ItemVisitor<'v>,
    ) -> CofferResult<()>;

    async fn find_and_delete_items(
        &self,
        collection: &Collection,
        options: &FindOptions,
    ) -> CofferResult<usize>;

    /// Invokes a named method on a collection, or on one of its items.
    async fn call(
        &self,
        collection: &Collection,
        item: Option<&Item>,
        method: &str,
        options: &CallOptions,
        body: Option<Value>,
    ) -> CofferResult<Value>;

    fn make_url(
        &self,
        collection: &Collection,
        item: Option<&Item>,
        method: Option<&str>,
        options: &CallOptions,
    ) -> CofferResult<String>;
}
