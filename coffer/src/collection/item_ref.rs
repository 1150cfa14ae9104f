use crate::collection::Document;
use crate::common::Value;
use crate::item::Item;
use std::ops::{Deref, DerefMut};

/// The ways an operation can designate an item: a bare primary key, a
/// partial value, or an existing item that is updated in place.
#[derive(Debug)]
pub enum ItemRef<'a> {
    Key(Value),
    Partial(Document),
    Existing(&'a mut Item),
}

impl<'a> From<&'a mut Item> for ItemRef<'a> {
    fn from(item: &'a mut Item) -> Self {
        ItemRef::Existing(item)
    }
}

impl From<Document> for ItemRef<'_> {
    fn from(document: Document) -> Self {
        ItemRef::Partial(document)
    }
}

impl From<Value> for ItemRef<'_> {
    fn from(value: Value) -> Self {
        match value {
            Value::Document(document) => ItemRef::Partial(document),
            other => ItemRef::Key(other),
        }
    }
}

impl From<&str> for ItemRef<'_> {
    fn from(key: &str) -> Self {
        ItemRef::Key(Value::from(key))
    }
}

impl From<String> for ItemRef<'_> {
    fn from(key: String) -> Self {
        ItemRef::Key(Value::from(key))
    }
}

impl From<i64> for ItemRef<'_> {
    fn from(key: i64) -> Self {
        ItemRef::Key(Value::from(key))
    }
}

impl From<i32> for ItemRef<'_> {
    fn from(key: i32) -> Self {
        ItemRef::Key(Value::from(key))
    }
}

/// An item resolved from an [ItemRef]: either built for the operation or
/// borrowed from the caller.
pub(crate) enum ResolvedItem<'a> {
    Owned(Box<Item>),
    Borrowed(&'a mut Item),
}

impl ResolvedItem<'_> {
    pub(crate) fn into_item(self) -> Item {
        match self {
            ResolvedItem::Owned(item) => *item,
            ResolvedItem::Borrowed(item) => item.clone(),
        }
    }
}

impl Deref for ResolvedItem<'_> {
    type Target = Item;

    fn deref(&self) -> &Item {
        match self {
            ResolvedItem::Owned(item) => item,
            ResolvedItem::Borrowed(item) => item,
        }
    }
}

impl DerefMut for ResolvedItem<'_> {
    fn deref_mut(&mut self) -> &mut Item {
        match self {
            ResolvedItem::Owned(item) => item,
            ResolvedItem::Borrowed(item) => item,
        }
    }
}
