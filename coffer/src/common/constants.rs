/// Name given to a primary key property declared without one.
pub const DEFAULT_PRIMARY_KEY_NAME: &str = "id";

/// Upper bound (inclusive) of generated numeric keys.
pub const DEFAULT_MAX_KEY_VALUE: i64 = 2_000_000_000;

/// Length of generated string keys.
pub const GENERATED_KEY_LENGTH: usize = 16;

pub const DEFAULT_CREATED_ON_NAME: &str = "createdOn";
pub const DEFAULT_UPDATED_ON_NAME: &str = "updatedOn";

/// Page size used when a repository streams items.
pub const DEFAULT_PAGE_SIZE: usize = 250;

pub const DEFAULT_REPOSITORY_NAME: &str = "memory";
