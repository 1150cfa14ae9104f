use crate::collection::Document;
use crate::common::Value;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Who initiated an operation.
///
/// Hooks read it to tell user edits from replication and archiving, which
/// must not refresh bookkeeping such as modification dates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Source {
    #[default]
    User,
    Computer,
    LocalSynchronizer,
    RemoteSynchronizer,
    Archive,
    Other(String),
}

impl Source {
    /// Returns `true` for sources that replay changes made elsewhere.
    pub fn is_replicated(&self) -> bool {
        matches!(
            self,
            Source::Computer
                | Source::LocalSynchronizer
                | Source::RemoteSynchronizer
                | Source::Archive
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            Source::User => "user",
            Source::Computer => "computer",
            Source::LocalSynchronizer => "localSynchronizer",
            Source::RemoteSynchronizer => "remoteSynchronizer",
            Source::Archive => "archive",
            Source::Other(name) => name,
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Source {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "user" => Source::User,
            "computer" => Source::Computer,
            "localSynchronizer" => Source::LocalSynchronizer,
            "remoteSynchronizer" => Source::RemoteSynchronizer,
            "archive" => Source::Archive,
            other => Source::Other(other.to_string()),
        })
    }
}

/// Options of single-item operations.
///
/// The boolean flags are tri-state: `None` lets the operation pick its
/// default. Fields are public and also settable through the consuming
/// builder methods of the same name.
///
/// ```rust,ignore
/// let options = ItemOptions::new().error_if_missing(false).source(Source::Archive);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemOptions {
    /// Fail when the item does not exist. Repositories treat `None` as `true`.
    pub error_if_missing: Option<bool>,
    /// Fail when the item already exists. Defaults to `true` when saving a
    /// new item.
    pub error_if_exists: Option<bool>,
    /// Run schema validation before saving. `None` means yes.
    pub validate: Option<bool>,
    pub source: Source,
    /// Properties to load. `None` loads everything.
    pub properties: Option<Vec<String>>,
}

impl ItemOptions {
    pub fn new() -> ItemOptions {
        ItemOptions::default()
    }

    pub fn error_if_missing(mut self, value: bool) -> ItemOptions {
        self.error_if_missing = Some(value);
        self
    }

    pub fn error_if_exists(mut self, value: bool) -> ItemOptions {
        self.error_if_exists = Some(value);
        self
    }

    pub fn validate(mut self, value: bool) -> ItemOptions {
        self.validate = Some(value);
        self
    }

    pub fn source(mut self, source: Source) -> ItemOptions {
        self.source = source;
        self
    }

    pub fn properties(mut self, properties: Vec<&str>) -> ItemOptions {
        self.properties = Some(properties.iter().map(|p| p.to_string()).collect());
        self
    }
}

impl From<&FindOptions> for ItemOptions {
    fn from(options: &FindOptions) -> Self {
        ItemOptions {
            properties: options.properties.clone(),
            source: options.source.clone(),
            ..ItemOptions::default()
        }
    }
}

/// Options of multi-item queries.
///
/// `query` holds equality conditions, or operator documents such as
/// `{ "$gte": 10 }`. Results are sorted by the `order` properties (then the
/// primary key). The range bounds apply to the first sort property, or to
/// the primary key when `order` is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub query: Document,
    pub order: Vec<String>,
    pub start: Option<Value>,
    pub start_after: Option<Value>,
    pub end: Option<Value>,
    pub end_before: Option<Value>,
    pub reverse: bool,
    pub properties: Option<Vec<String>>,
    pub limit: Option<usize>,
    pub source: Source,
}

impl FindOptions {
    pub fn new() -> FindOptions {
        FindOptions::default()
    }

    pub fn query(mut self, query: Document) -> FindOptions {
        self.query = query;
        self
    }

    /// Adds (or replaces) one equality condition.
    pub fn where_eq<T: Into<Value>>(mut self, field: &str, value: T) -> FindOptions {
        self.query.merge(&std::iter::once((field.to_string(), value.into())).collect());
        self
    }

    pub fn order(mut self, properties: Vec<&str>) -> FindOptions {
        self.order = properties.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn start<T: Into<Value>>(mut self, value: T) -> FindOptions {
        self.start = Some(value.into());
        self
    }

    pub fn start_after<T: Into<Value>>(mut self, value: T) -> FindOptions {
        self.start_after = Some(value.into());
        self
    }

    pub fn end<T: Into<Value>>(mut self, value: T) -> FindOptions {
        self.end = Some(value.into());
        self
    }

    pub fn end_before<T: Into<Value>>(mut self, value: T) -> FindOptions {
        self.end_before = Some(value.into());
        self
    }

    pub fn reverse(mut self, reverse: bool) -> FindOptions {
        self.reverse = reverse;
        self
    }

    pub fn properties(mut self, properties: Vec<&str>) -> FindOptions {
        self.properties = Some(properties.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn limit(mut self, limit: usize) -> FindOptions {
        self.limit = Some(limit);
        self
    }

    pub fn source(mut self, source: Source) -> FindOptions {
        self.source = source;
        self
    }
}

/// Creates find options with the given query.
pub fn query(query: Document) -> FindOptions {
    FindOptions::new().query(query)
}

/// Creates find options sorted by the given properties.
pub fn order_by(properties: Vec<&str>) -> FindOptions {
    FindOptions::new().order(properties)
}

/// Creates find options returning at most `limit` items.
pub fn limit_to(limit: usize) -> FindOptions {
    FindOptions::new().limit(limit)
}

/// Options of remote method calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOptions {
    /// Selects the items the method applies to.
    pub query: Document,
    /// Extra named parameters.
    pub params: Document,
}

impl CallOptions {
    pub fn new() -> CallOptions {
        CallOptions::default()
    }

    pub fn query(mut self, query: Document) -> CallOptions {
        self.query = query;
        self
    }

    pub fn params(mut self, params: Document) -> CallOptions {
        self.params = params;
        self
    }
}
