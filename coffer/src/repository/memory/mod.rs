//! In-process repository backend.
//!
//! Items live in ordered in-memory tables, one per collection. Transactions
//! are copy-on-write: a transactional handle records its writes and
//! deletions on the side and applies them to the tables on commit.
//!
//! ```rust,ignore
//! let repository = MemoryRepository::builder()
//!     .schema(vaults_schema)
//!     .schema(files_schema)
//!     .build()?;
//! let vaults = repository.clone().create_collection("Vaults")?;
//! ```

mod query;
mod repository;
mod store;

pub use repository::*;
