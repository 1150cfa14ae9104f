//! Collections, documents and operation options.
//!
//! A [Collection] is the entry point for working with items of one type:
//! it creates and unserializes items, fetches, saves and deletes them
//! through its repository, queries them with [FindOptions] and runs
//! operations in transactions.
//!
//! ```rust,ignore
//! let vaults = repository.clone().create_collection("Vaults")?;
//! let mut vault = vaults.create_item(doc! { name: "Personal" })?;
//! vault.save(ItemOptions::default()).await?;
//!
//! let files = vault.relation("files")?;
//! files.put_item(doc! { name: "notes.txt" }, ItemOptions::default()).await?;
//! assert_eq!(files.count_items(FindOptions::default()).await?, 1);
//! ```

#[allow(clippy::module_inception)]
mod collection;
mod document;
pub(crate) mod item_ref;
mod options;

pub use collection::*;
pub use document::*;
pub use item_ref::ItemRef;
pub use options::*;
