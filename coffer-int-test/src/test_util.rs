use coffer::collection::Collection;
use coffer::errors::CofferResult;
use coffer::repository::memory::{MemoryRepository, MemoryRepositoryBuilder};
use coffer::repository::Repository;
use coffer::schema::{IndexOptions, KeyOptions, PropertyOptions, PropertyType, Schema};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

pub const MIRROR_BASE_URL: &str = "https://vault.example.com/v1";

/// Runs a test against a fresh context and reports a failed result with
/// the time it took.
pub async fn run_test<B, T, Fut>(before: B, test: T)
where
    B: FnOnce() -> CofferResult<TestContext>,
    T: FnOnce(TestContext) -> Fut,
    Fut: Future<Output = CofferResult<()>>,
{
    let start_time = Instant::now();
    let ctx = match before() {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };
    if let Err(e) = test(ctx).await {
        eprintln!("\n==================== TEST FAILED ====================");
        eprintln!("Failed after {:?}", start_time.elapsed());
        eprintln!("Error: {}", e);
        if let Some(cause) = e.cause() {
            eprintln!("Caused by: {}", cause);
        }
        eprintln!("=====================================================\n");
        panic!("Test failed: {:?}", e);
    }
}

#[derive(Clone)]
pub struct TestContext {
    repository: Arc<MemoryRepository>,
}

impl TestContext {
    pub fn new(repository: Arc<MemoryRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> Arc<MemoryRepository> {
        Arc::clone(&self.repository)
    }

    pub fn collection(&self, name: &str) -> CofferResult<Collection> {
        self.repository().create_collection(name)
    }

    pub fn vaults(&self) -> CofferResult<Collection> {
        self.collection("Vaults")
    }

    pub fn files(&self) -> CofferResult<Collection> {
        self.collection("Files")
    }

    pub fn people(&self) -> CofferResult<Collection> {
        self.collection("People")
    }

    pub fn counters(&self) -> CofferResult<Collection> {
        self.collection("Counters")
    }

    pub fn stored(&self, collection: &str) -> usize {
        self.repository.len(collection)
    }
}

/// Vaults own files through the `files` relation.
pub fn vault_schema() -> CofferResult<Arc<Schema>> {
    Schema::builder("Vaults", "Vault")
        .add_primary_key_property("id", PropertyType::String, KeyOptions::default())
        .add_property_with("name", PropertyType::String, PropertyOptions::new().required(true))
        .add_created_on_property(None)
        .add_updated_on_property(None)
        .add_has_many_relation("files", "Files", "vaultId")
        .build()
}

pub fn file_schema() -> CofferResult<Arc<Schema>> {
    Schema::builder("Files", "File")
        .add_primary_key_property("id", PropertyType::String, KeyOptions::default())
        .add_foreign_key_property("vaultId", PropertyType::String, KeyOptions::default())
        .add_property("name", PropertyType::String)
        .add_property_with("size", PropertyType::Integer, PropertyOptions::new().default_value(0))
        .add_index(vec!["vaultId", "name"], IndexOptions::new().projection(vec!["size"]))
        .build()
}

pub fn person_schema() -> CofferResult<Arc<Schema>> {
    Schema::builder("People", "Person")
        .add_primary_key_property("id", PropertyType::String, KeyOptions::default())
        .add_property_with("name", PropertyType::String, PropertyOptions::new().required(true))
        .add_property("age", PropertyType::Integer)
        .add_property("birthday", PropertyType::Date)
        .add_property_with("tags", PropertyType::Array, PropertyOptions::new().default_value(Vec::<String>::new()))
        .add_index(vec!["age"], IndexOptions::default())
        .build()
}

pub fn counter_schema() -> CofferResult<Arc<Schema>> {
    Schema::builder("Counters", "Counter")
        .add_primary_key_property("id", PropertyType::Integer, KeyOptions::new().max(1000))
        .add_property("value", PropertyType::Integer)
        .build()
}

fn builder() -> CofferResult<MemoryRepositoryBuilder> {
    Ok(MemoryRepository::builder()
        .schema(vault_schema()?)
        .schema(file_schema()?)
        .schema(person_schema()?)
        .schema(counter_schema()?))
}

/// A local repository: keys and timestamps are generated on save and
/// deletions cascade.
pub fn create_test_context() -> CofferResult<TestContext> {
    let repository = builder()?.name("local").page_size(2).build()?;
    Ok(TestContext::new(repository))
}

/// A remote mirror: items arrive with their keys and bookkeeping already
/// set, nothing is generated and nothing cascades.
pub fn create_mirror_context() -> CofferResult<TestContext> {
    let repository = builder()?
        .name("mirror")
        .local(false)
        .app("vault-app")
        .base_url(MIRROR_BASE_URL)
        .build()?;
    Ok(TestContext::new(repository))
}
