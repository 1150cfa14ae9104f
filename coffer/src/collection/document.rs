use crate::common::Value;
use crate::errors::{CofferError, CofferResult, ErrorKind};
use indexmap::IndexMap;
use itertools::Itertools;
use std::cmp::Ordering;
use std::fmt::{Debug, Display};
use std::hash::{Hash, Hasher};

/// The plain data mapping behind every item.
///
/// A document is an insertion-ordered map of field names to [Value]s.
/// Equality, ordering and hashing ignore insertion order, so two documents
/// holding the same fields are the same document.
#[derive(Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct Document {
    data: IndexMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    ///
    /// ```ignore
    /// let doc = Document::new();
    /// assert!(doc.is_empty());
    /// ```
    pub fn new() -> Self {
        Document {
            data: IndexMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Associates `value` with `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidArgument` error if the key is empty.
    pub fn put<T: Into<Value>>(&mut self, key: impl Into<String>, value: T) -> CofferResult<()> {
        let key = key.into();
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(CofferError::new(
                "Document does not support empty key",
                ErrorKind::InvalidArgument,
            ));
        }
        self.data.insert(key, value.into());
        Ok(())
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.data.get_mut(key)
    }

    /// Removes `key`, keeping the order of the remaining fields.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    /// Copies every field of `other` into this document.
    pub fn merge(&mut self, other: &Document) {
        for (key, value) in other.iter() {
            self.data.insert(key.clone(), value.clone());
        }
    }

    /// Returns a copy holding only the listed fields.
    pub fn project(&self, fields: &[String]) -> Document {
        let mut projected = Document::new();
        for field in fields {
            if let Some(value) = self.data.get(field) {
                projected.data.insert(field.clone(), value.clone());
            }
        }
        projected
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .data
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<String, serde_json::Value>>();
        serde_json::Value::Object(map)
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    pub(crate) fn from_json_map(map: serde_json::Map<String, serde_json::Value>) -> Document {
        let mut doc = Document::new();
        for (key, value) in map {
            doc.data.insert(key, Value::from_json(value));
        }
        doc
    }

    /// Builds a document from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns an `EncodingError` if `json` is not an object.
    pub fn from_json(json: serde_json::Value) -> CofferResult<Document> {
        match json {
            serde_json::Value::Object(map) => Ok(Document::from_json_map(map)),
            other => {
                log::error!("Cannot build a document from {}", other);
                Err(CofferError::new(
                    &format!("expected a JSON object, got {}", other),
                    ErrorKind::EncodingError,
                ))
            }
        }
    }

    /// Parses a JSON string into a document.
    pub fn from_json_str(json: &str) -> CofferResult<Document> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Document::from_json(value)
    }

    fn sorted_entries(&self) -> Vec<(&String, &Value)> {
        self.data.iter().sorted_by(|a, b| a.0.cmp(b.0)).collect()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Document {}

impl PartialOrd for Document {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Document {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sorted_entries().cmp(&other.sorted_entries())
    }
}

impl Hash for Document {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (key, value) in self.sorted_entries() {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Document {
            data: iter.into_iter().collect(),
        }
    }
}

pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a Document with JSON-like syntax.
///
/// ```rust
/// use coffer::doc;
///
/// let empty = doc!{};
///
/// let vault = doc!{
///     name: "Personal",
///     owner: { first: "Ann", roles: ["admin"] },
///     "quota": 1024
/// };
/// assert_eq!(vault.size(), 3);
/// ```
#[macro_export]
macro_rules! doc {
    ({}) => {
        $crate::collection::Document::new()
    };

    () => {
        $crate::collection::Document::new()
    };

    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::doc!($($key : $value),*)
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::collection::Document::new();
            $(
                doc.put($crate::collection::normalize(stringify!($key)), $crate::doc_value!($value))
                .expect(&format!("Failed to put value {} in document", stringify!($value)));
            )*
            doc
        }
    };
}

/// Helper macro to convert values for the doc! macro.
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        {
            $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
        }
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
