use crate::errors::{CofferError, CofferResult, ErrorKind};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Kind of association between two item types. Only one-to-many is
/// supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    HasMany,
}

impl Display for RelationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationKind::HasMany => write!(f, "hasMany"),
        }
    }
}

impl FromStr for RelationKind {
    type Err = CofferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hasMany" => Ok(RelationKind::HasMany),
            "" => Err(invalid("type is missing")),
            _ => Err(invalid("invalid type")),
        }
    }
}

fn invalid(message: &str) -> CofferError {
    log::error!("Invalid relation: {}", message);
    CofferError::new(message, ErrorKind::InvalidRelation)
}

/// A declared association from a parent item type to the child collection
/// whose items point back at the parent through `foreign_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    name: String,
    collection_name: String,
    foreign_key: String,
    kind: RelationKind,
}

impl Relation {
    /// Validates and creates a relation.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidRelation` error if any of the names is empty.
    pub fn new(
        name: &str,
        collection_name: &str,
        foreign_key: &str,
        kind: RelationKind,
    ) -> CofferResult<Self> {
        if name.is_empty() {
            return Err(invalid("name is missing"));
        }
        if collection_name.is_empty() {
            return Err(invalid("collectionName is missing"));
        }
        if foreign_key.is_empty() {
            return Err(invalid("foreignKey is missing"));
        }
        Ok(Relation {
            name: name.to_string(),
            collection_name: collection_name.to_string(),
            foreign_key: foreign_key.to_string(),
            kind,
        })
    }

    /// Same as [Relation::new] with the kind given by name (`"hasMany"`).
    pub fn parse(
        name: &str,
        collection_name: &str,
        foreign_key: &str,
        kind: &str,
    ) -> CofferResult<Self> {
        let kind = kind.parse::<RelationKind>()?;
        Relation::new(name, collection_name, foreign_key, kind)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }
}
