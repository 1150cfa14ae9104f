use crate::collection::Document;
use crate::common::{atomic, Atomic, ReadExecutor, Value, WriteExecutor};
use crate::errors::{CofferError, CofferResult, ErrorKind};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

pub(crate) type Table = BTreeMap<Value, Document>;

/// Write preconditions checked atomically with the write.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WriteCheck {
    pub(crate) error_if_exists: bool,
    pub(crate) error_if_missing: bool,
}

impl WriteCheck {
    fn verify(&self, table: &str, key: &Value, exists: bool) -> CofferResult<()> {
        if self.error_if_exists && exists {
            log::error!("{}#{} already exists", table, key.to_key_string());
            return Err(CofferError::new(
                &format!("item already exists (collection: '{}', key: '{}')", table, key.to_key_string()),
                ErrorKind::AlreadyExists,
            ));
        }
        if self.error_if_missing && !exists {
            return Err(not_found(table, key));
        }
        Ok(())
    }
}

pub(crate) fn not_found(table: &str, key: &Value) -> CofferError {
    CofferError::new(
        &format!("item not found (collection: '{}', key: '{}')", table, key.to_key_string()),
        ErrorKind::NotFound,
    )
}

/// The committed tables, one ordered map per collection.
#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    tables: Atomic<HashMap<String, Table>>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        MemoryStore {
            tables: atomic(HashMap::new()),
        }
    }

    fn get(&self, table: &str, key: &Value) -> Option<Document> {
        self.tables
            .read_with(|tables| tables.get(table).and_then(|t| t.get(key)).cloned())
    }

    fn get_many(&self, table: &str, keys: &[Value]) -> Vec<Option<Document>> {
        self.tables.read_with(|tables| {
            let entries = tables.get(table);
            keys.iter()
                .map(|key| entries.and_then(|t| t.get(key)).cloned())
                .collect()
        })
    }

    fn contains(&self, table: &str, key: &Value) -> bool {
        self.tables
            .read_with(|tables| tables.get(table).is_some_and(|t| t.contains_key(key)))
    }

    fn put(&self, table: &str, key: Value, document: Document, check: WriteCheck) -> CofferResult<()> {
        self.tables.write_with(|tables| {
            let entries = tables.entry(table.to_string()).or_default();
            check.verify(table, &key, entries.contains_key(&key))?;
            entries.insert(key, document);
            Ok(())
        })
    }

    fn remove(&self, table: &str, key: &Value) -> bool {
        self.tables.write_with(|tables| {
            tables
                .get_mut(table)
                .is_some_and(|t| t.remove(key).is_some())
        })
    }

    fn remove_all(&self, table: &str, keys: &[Value]) -> usize {
        self.tables.write_with(|tables| match tables.get_mut(table) {
            Some(entries) => keys.iter().filter(|k| entries.remove(*k).is_some()).count(),
            None => 0,
        })
    }

    fn snapshot(&self, table: &str) -> Table {
        self.tables
            .read_with(|tables| tables.get(table).cloned().unwrap_or_default())
    }

    fn apply(&self, writes: HashMap<String, Table>, tombstones: HashMap<String, HashSet<Value>>) {
        self.tables.write_with(|tables| {
            for (table, keys) in tombstones {
                if let Some(entries) = tables.get_mut(&table) {
                    for key in keys {
                        entries.remove(&key);
                    }
                }
            }
            for (table, written) in writes {
                tables.entry(table).or_default().extend(written);
            }
        })
    }

    pub(crate) fn len(&self, table: &str) -> usize {
        self.tables
            .read_with(|tables| tables.get(table).map_or(0, |t| t.len()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

#[derive(Default)]
struct Changes {
    writes: HashMap<String, Table>,
    tombstones: HashMap<String, HashSet<Value>>,
}

/// Uncommitted changes layered over a [MemoryStore].
///
/// Writes go to a backing table and deletions to a tombstone set. Reads
/// look at both before falling through to the committed tables.
pub(crate) struct TransactionalStore {
    id: String,
    primary: MemoryStore,
    changes: Atomic<Changes>,
    state: Atomic<TransactionState>,
}

impl TransactionalStore {
    pub(crate) fn new(primary: MemoryStore) -> Self {
        TransactionalStore {
            id: uuid::Uuid::new_v4().to_string(),
            primary,
            changes: atomic(Changes::default()),
            state: atomic(TransactionState::Active),
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    fn ensure_active(&self) -> CofferResult<()> {
        match *self.state.read() {
            TransactionState::Active => Ok(()),
            state => {
                log::error!("Transaction {} is no longer active ({:?})", self.id, state);
                Err(CofferError::new(
                    "transaction is already closed",
                    ErrorKind::InvalidOperation,
                ))
            }
        }
    }

    fn close(&self, state: TransactionState) -> CofferResult<()> {
        self.state.write_with(|current| {
            if *current != TransactionState::Active {
                log::error!("Transaction {} is already {:?}", self.id, current);
                return Err(CofferError::new(
                    "transaction is already closed",
                    ErrorKind::InvalidOperation,
                ));
            }
            *current = state;
            Ok(())
        })
    }

    fn lookup(&self, changes: &Changes, table: &str, key: &Value) -> Option<Document> {
        if changes.tombstones.get(table).is_some_and(|t| t.contains(key)) {
            return None;
        }
        match changes.writes.get(table).and_then(|t| t.get(key)) {
            Some(document) => Some(document.clone()),
            None => self.primary.get(table, key),
        }
    }

    fn get(&self, table: &str, key: &Value) -> CofferResult<Option<Document>> {
        self.ensure_active()?;
        Ok(self.changes.read_with(|changes| self.lookup(changes, table, key)))
    }

    fn get_many(&self, table: &str, keys: &[Value]) -> CofferResult<Vec<Option<Document>>> {
        self.ensure_active()?;
        Ok(self.changes.read_with(|changes| {
            keys.iter()
                .map(|key| self.lookup(changes, table, key))
                .collect()
        }))
    }

    fn put(&self, table: &str, key: Value, document: Document, check: WriteCheck) -> CofferResult<()> {
        self.ensure_active()?;
        self.changes.write_with(|changes| {
            let exists = self.lookup(changes, table, &key).is_some();
            check.verify(table, &key, exists)?;
            if let Some(tombstones) = changes.tombstones.get_mut(table) {
                tombstones.remove(&key);
            }
            changes
                .writes
                .entry(table.to_string())
                .or_default()
                .insert(key, document);
            Ok(())
        })
    }

    fn remove(&self, table: &str, key: &Value) -> CofferResult<bool> {
        self.ensure_active()?;
        Ok(self.changes.write_with(|changes| {
            let existed = self.lookup(changes, table, key).is_some();
            if let Some(writes) = changes.writes.get_mut(table) {
                writes.remove(key);
            }
            changes
                .tombstones
                .entry(table.to_string())
                .or_default()
                .insert(key.clone());
            existed
        }))
    }

    fn snapshot(&self, table: &str) -> CofferResult<Table> {
        self.ensure_active()?;
        let mut entries = self.primary.snapshot(table);
        self.changes.read_with(|changes| {
            if let Some(tombstones) = changes.tombstones.get(table) {
                entries.retain(|key, _| !tombstones.contains(key));
            }
            if let Some(writes) = changes.writes.get(table) {
                entries.extend(writes.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        });
        Ok(entries)
    }

    pub(crate) fn commit(&self) -> CofferResult<()> {
        self.close(TransactionState::Committed)?;
        let changes = self.changes.take_with();
        self.primary.apply(changes.writes, changes.tombstones);
        Ok(())
    }

    pub(crate) fn rollback(&self) -> CofferResult<()> {
        self.close(TransactionState::RolledBack)?;
        self.changes.take_with();
        Ok(())
    }
}

/// The tables as seen by one repository handle.
#[derive(Clone)]
pub(crate) enum StoreView {
    Primary(MemoryStore),
    Transactional(Arc<TransactionalStore>),
}

impl StoreView {
    pub(crate) fn get(&self, table: &str, key: &Value) -> CofferResult<Option<Document>> {
        match self {
            StoreView::Primary(store) => Ok(store.get(table, key)),
            StoreView::Transactional(store) => store.get(table, key),
        }
    }

    /// The documents stored under `keys`, in the order of `keys`.
    pub(crate) fn get_many(&self, table: &str, keys: &[Value]) -> CofferResult<Vec<Option<Document>>> {
        match self {
            StoreView::Primary(store) => Ok(store.get_many(table, keys)),
            StoreView::Transactional(store) => store.get_many(table, keys),
        }
    }

    pub(crate) fn contains(&self, table: &str, key: &Value) -> CofferResult<bool> {
        match self {
            StoreView::Primary(store) => Ok(store.contains(table, key)),
            StoreView::Transactional(store) => Ok(store.get(table, key)?.is_some()),
        }
    }

    pub(crate) fn put(
        &self,
        table: &str,
        key: Value,
        document: Document,
        check: WriteCheck,
    ) -> CofferResult<()> {
        match self {
            StoreView::Primary(store) => store.put(table, key, document, check),
            StoreView::Transactional(store) => store.put(table, key, document, check),
        }
    }

    pub(crate) fn remove(&self, table: &str, key: &Value) -> CofferResult<bool> {
        match self {
            StoreView::Primary(store) => Ok(store.remove(table, key)),
            StoreView::Transactional(store) => store.remove(table, key),
        }
    }

    pub(crate) fn remove_all(&self, table: &str, keys: &[Value]) -> CofferResult<usize> {
        match self {
            StoreView::Primary(store) => Ok(store.remove_all(table, keys)),
            StoreView::Transactional(store) => {
                let mut removed = 0;
                for key in keys {
                    if store.remove(table, key)? {
                        removed += 1;
                    }
                }
                Ok(removed)
            }
        }
    }

    /// Every document of `table`, in key order.
    pub(crate) fn snapshot(&self, table: &str) -> CofferResult<Table> {
        match self {
            StoreView::Primary(store) => Ok(store.snapshot(table)),
            StoreView::Transactional(store) => store.snapshot(table),
        }
    }
}
