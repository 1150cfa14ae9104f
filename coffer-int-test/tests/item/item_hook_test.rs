use coffer::collection::{Collection, ItemOptions};
use coffer::common::Value;
use coffer::doc;
use coffer::errors::{CofferResult, ErrorKind};
use coffer::repository::memory::MemoryRepository;
use coffer::repository::Repository;
use coffer::schema::{KeyOptions, LifecyclePhase, PropertyType, Schema};
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::Arc;

type Journal = Arc<Mutex<Vec<String>>>;

fn record(journal: &Journal, phase: LifecyclePhase) -> impl Fn(&mut coffer::Item, &ItemOptions) -> CofferResult<()> {
    let journal = Arc::clone(journal);
    move |item, _options| {
        journal
            .lock()
            .push(format!("{} new={} modified={}", phase, item.is_new(), item.is_modified()));
        Ok(())
    }
}

fn tracked(journal: &Journal) -> CofferResult<Collection> {
    let slug_journal = Arc::clone(journal);
    let delete_journal = Arc::clone(journal);
    let schema = Schema::builder("Articles", "Article")
        .add_primary_key_property("id", PropertyType::String, KeyOptions::default())
        .add_property("title", PropertyType::String)
        .add_property("slug", PropertyType::String)
        .on(LifecyclePhase::DidCreate, record(journal, LifecyclePhase::DidCreate))
        .on(LifecyclePhase::DidLoad, record(journal, LifecyclePhase::DidLoad))
        .on(LifecyclePhase::DidChange, record(journal, LifecyclePhase::DidChange))
        .on_async(LifecyclePhase::WillSave, move |item, _options| {
            let journal = Arc::clone(&slug_journal);
            async move {
                let slug = item
                    .get("title")
                    .and_then(|v| v.as_str())
                    .map(|title| title.to_lowercase().replace(' ', "-"));
                if let Some(slug) = slug {
                    item.set("slug", slug)?;
                }
                journal.lock().push(format!("willSave key={}", !item.primary_key_value()?.is_empty_key()));
                Ok(())
            }
            .boxed()
        })
        .on(LifecyclePhase::DidSave, record(journal, LifecyclePhase::DidSave))
        .on_async(LifecyclePhase::WillDelete, move |item, options| {
            let journal = Arc::clone(&delete_journal);
            let source = options.source.clone();
            async move {
                journal.lock().push(format!("willDelete {} by {}", item.primary_key_value()?.to_key_string(), source));
                Ok(())
            }
            .boxed()
        })
        .on(LifecyclePhase::DidDelete, record(journal, LifecyclePhase::DidDelete))
        .build()?;
    let repository = MemoryRepository::builder().schema(schema).build()?;
    repository.create_collection("Articles")
}

fn drain(journal: &Journal) -> Vec<String> {
    std::mem::take(&mut *journal.lock())
}

#[tokio::test]
async fn test_hooks_run_after_builtin_handling() {
    let journal = Journal::default();
    let articles = tracked(&journal).unwrap();

    let mut article = articles.create_item(doc! { id: "a1", title: "Hello World" }).unwrap();
    assert_eq!(drain(&journal), vec!["didCreate new=true modified=false"]);

    article.set("title", "Hello Rust").unwrap();
    assert_eq!(drain(&journal), vec!["didChange new=true modified=true"]);

    article.save(ItemOptions::default()).await.unwrap();
    assert_eq!(
        drain(&journal),
        vec![
            "didCreate new=false modified=false",
            "didChange new=true modified=true",
            "willSave key=true",
            "didSave new=false modified=false",
        ]
    );
    assert_eq!(article.get("slug"), Some(&Value::from("hello-rust")));
}

#[tokio::test]
async fn test_load_hooks() {
    let journal = Journal::default();
    let articles = tracked(&journal).unwrap();
    articles
        .put_item(doc! { id: "a1", title: "Hello" }, ItemOptions::default())
        .await
        .unwrap();
    drain(&journal);

    let loaded = articles
        .get_item("a1", ItemOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.get("slug"), Some(&Value::from("hello")));
    assert_eq!(
        drain(&journal),
        vec![
            "didCreate new=true modified=false",
            "didCreate new=false modified=false",
            "didLoad new=false modified=false",
        ]
    );
}

#[tokio::test]
async fn test_delete_hooks() {
    let journal = Journal::default();
    let articles = tracked(&journal).unwrap();
    let mut article = articles
        .put_item(doc! { id: "a1", title: "Hello" }, ItemOptions::default())
        .await
        .unwrap();
    drain(&journal);

    article
        .delete(ItemOptions::new().source(coffer::collection::Source::Archive))
        .await
        .unwrap();
    assert_eq!(
        drain(&journal),
        vec![
            "didCreate new=false modified=false",
            "willDelete a1 by archive",
            "didDelete new=false modified=false",
        ]
    );
}

#[test]
fn test_async_hook_on_sync_phase() {
    let err = Schema::builder("Articles", "Article")
        .add_primary_key_property("id", PropertyType::String, KeyOptions::default())
        .on_async(LifecyclePhase::DidLoad, |_item, _options| async { Ok(()) }.boxed())
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::SchemaError);
    assert_eq!(err.message(), "didLoad hooks must be synchronous");
}
