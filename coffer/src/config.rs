use crate::common::{DEFAULT_PAGE_SIZE, DEFAULT_REPOSITORY_NAME};
use crate::errors::{CofferError, CofferResult, ErrorKind};

/// Settings shared by repository implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    name: String,
    local: bool,
    app: Option<String>,
    base_url: Option<String>,
    page_size: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        RepositoryConfig {
            name: DEFAULT_REPOSITORY_NAME.to_string(),
            local: true,
            app: None,
            base_url: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl RepositoryConfig {
    pub fn builder() -> RepositoryConfigBuilder {
        RepositoryConfigBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the repository owns its data. Only local repositories
    /// generate keys, stamp dates and cascade deletions.
    pub fn is_local(&self) -> bool {
        self.local
    }

    pub fn app(&self) -> Option<&str> {
        self.app.as_deref()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Number of items fetched at a time when streaming.
    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

/// Builder for [RepositoryConfig].
///
/// Invalid values are captured and reported by [RepositoryConfigBuilder::build].
///
/// ```rust,ignore
/// let config = RepositoryConfig::builder()
///     .name("mirror")
///     .local(false)
///     .base_url("https://api.example.com/v1")
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct RepositoryConfigBuilder {
    error: Option<CofferError>,
    config: RepositoryConfig,
}

impl RepositoryConfigBuilder {
    pub fn new() -> Self {
        RepositoryConfigBuilder {
            error: None,
            config: RepositoryConfig::default(),
        }
    }

    fn capture(&mut self, message: &str) {
        if self.error.is_none() {
            log::error!("Invalid repository configuration: {}", message);
            self.error = Some(CofferError::new(message, ErrorKind::InvalidArgument));
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        if name.trim().is_empty() {
            self.capture("repository name cannot be empty");
        } else {
            self.config.name = name.to_string();
        }
        self
    }

    pub fn local(mut self, local: bool) -> Self {
        self.config.local = local;
        self
    }

    pub fn app(mut self, app: &str) -> Self {
        self.config.app = Some(app.to_string());
        self
    }

    pub fn base_url(mut self, base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        if base_url.is_empty() {
            self.capture("base url cannot be empty");
        } else {
            self.config.base_url = Some(base_url.to_string());
        }
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        if page_size == 0 {
            self.capture("page size must be positive");
        } else {
            self.config.page_size = page_size;
        }
        self
    }

    pub fn build(self) -> CofferResult<RepositoryConfig> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.config),
        }
    }
}
