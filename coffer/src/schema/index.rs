/// Options attached to an index declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexOptions {
    pub(crate) projection: Vec<String>,
    pub(crate) unique: bool,
}

impl IndexOptions {
    pub fn new() -> IndexOptions {
        IndexOptions::default()
    }

    /// Properties copied into the index entries.
    pub fn projection(mut self, properties: Vec<&str>) -> IndexOptions {
        self.projection = properties.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn unique(mut self, unique: bool) -> IndexOptions {
        self.unique = unique;
        self
    }
}

/// An index declared on an item type. Indexes are metadata for the
/// repository, which decides whether and how to use them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    properties: Vec<String>,
    projection: Vec<String>,
    unique: bool,
}

impl IndexDefinition {
    pub(crate) fn new(properties: Vec<String>, options: IndexOptions) -> Self {
        IndexDefinition {
            properties,
            projection: options.projection,
            unique: options.unique,
        }
    }

    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    pub fn projection(&self) -> &[String] {
        &self.projection
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }
}
