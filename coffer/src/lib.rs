#![allow(dead_code)]
//! # Coffer - schema-aware item collections
//!
//! Coffer models application data as typed items grouped in collections
//! and stored in repositories. It provides:
//!
//! - **Schemas**: declared properties, primary/foreign keys with random key
//!   generation, creation and update timestamps, indexes and one-to-many
//!   relations, built once and shared by every item of a type
//! - **Lifecycle hooks**: synchronous and asynchronous callbacks around
//!   creation, loading, change, save and deletion
//! - **Transactions**: every save and delete runs in a transaction, nested
//!   operations (cascading deletes included) join the running one
//! - **Scoping**: collections bound to a fixed foreign key, as returned by
//!   item relations
//! - **Pluggable storage**: any [repository::Repository] implementation,
//!   with an in-memory backend included
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use coffer::collection::{FindOptions, ItemOptions};
//! use coffer::doc;
//! use coffer::repository::memory::MemoryRepository;
//! use coffer::repository::Repository;
//! use coffer::schema::{KeyOptions, PropertyType, Schema};
//!
//! let vaults = Schema::builder("Vaults", "Vault")
//!     .add_primary_key_property("id", PropertyType::String, KeyOptions::default())
//!     .add_property("name", PropertyType::String)
//!     .add_has_many_relation("files", "Files", "vaultId")
//!     .build()?;
//! let files = Schema::builder("Files", "File")
//!     .add_primary_key_property("id", PropertyType::String, KeyOptions::default())
//!     .add_foreign_key_property("vaultId", PropertyType::String, KeyOptions::default())
//!     .build()?;
//!
//! let repository = MemoryRepository::builder().schema(vaults).schema(files).build()?;
//! let vaults = repository.clone().create_collection("Vaults")?;
//!
//! let mut vault = vaults.create_item(doc! { name: "Personal" })?;
//! vault.save(ItemOptions::default()).await?;
//! vault.relation("files")?
//!     .put_item(doc! { name: "todo.txt" }, ItemOptions::default())
//!     .await?;
//!
//! // deleting the vault deletes its files
//! vault.delete(ItemOptions::default()).await?;
//! ```
//!
//! ## Module Organization
//!
//! - [`collection`] - Collections, documents and operation options
//! - [`common`] - Values, lock helpers and constants
//! - [`config`] - Repository configuration
//! - [`errors`] - Error types and result definitions
//! - [`item`] - Items and key generation
//! - [`repository`] - The repository contract and the in-memory backend
//! - [`schema`] - Item type declarations and lifecycle hooks

pub mod collection;
pub mod common;
pub mod config;
pub mod errors;
pub mod item;
pub mod repository;
pub mod schema;

pub use collection::{Collection, Document, FindOptions, ItemOptions};
pub use errors::{CofferError, CofferResult, ErrorKind};
pub use item::Item;
pub use repository::Repository;
