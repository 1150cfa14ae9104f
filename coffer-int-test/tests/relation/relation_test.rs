use coffer::collection::{FindOptions, ItemOptions};
use coffer::common::Value;
use coffer::doc;
use coffer::errors::{CofferError, ErrorKind};
use coffer::repository::memory::MemoryRepository;
use coffer::repository::Repository;
use coffer::schema::{KeyOptions, LifecyclePhase, PropertyType, Schema};
use coffer_int_test::test_util::{create_mirror_context, create_test_context, run_test};

#[tokio::test]
async fn test_relation_is_scoped_to_owner() {
    run_test(create_test_context, |ctx| async move {
        let vaults = ctx.vaults()?;
        let mut personal = vaults
            .put_item(doc! { name: "Personal" }, ItemOptions::default())
            .await?;
        let mut work = vaults
            .put_item(doc! { name: "Work" }, ItemOptions::default())
            .await?;

        let personal_files = personal.relation("files")?;
        for name in ["a.txt", "b.txt"] {
            personal_files
                .put_item(doc! { name: name }, ItemOptions::default())
                .await?;
        }
        work.relation("files")?
            .put_item(doc! { name: "c.txt" }, ItemOptions::default())
            .await?;

        assert_eq!(personal_files.count_items(FindOptions::default()).await?, 2);
        let files = personal_files.find_items(FindOptions::new().order(vec!["name"])).await?;
        for file in &files {
            assert_eq!(file.get("vaultId"), Some(&personal.primary_key_value()?));
        }
        assert_eq!(ctx.stored("Files"), 3);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_delete_cascades_on_local_repository() {
    run_test(create_test_context, |ctx| async move {
        let vaults = ctx.vaults()?;
        let mut vault = vaults
            .put_item(doc! { name: "Personal" }, ItemOptions::default())
            .await?;
        let files = vault.relation("files")?;
        for name in ["a.txt", "b.txt", "c.txt"] {
            files.put_item(doc! { name: name }, ItemOptions::default()).await?;
        }
        ctx.files()?
            .put_item(doc! { name: "other.txt", vaultId: "elsewhere" }, ItemOptions::default())
            .await?;
        let before = ctx.repository().transaction_count();

        assert!(vault.delete(ItemOptions::default()).await?);
        assert_eq!(ctx.stored("Vaults"), 0);
        assert_eq!(ctx.stored("Files"), 1);
        assert_eq!(ctx.repository().transaction_count(), before + 1);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_delete_does_not_cascade_on_mirror() {
    run_test(create_mirror_context, |ctx| async move {
        let vaults = ctx.vaults()?;
        let mut vault = vaults
            .put_item(doc! { id: "v1", name: "Personal" }, ItemOptions::default())
            .await?;
        vault
            .relation("files")?
            .put_item(doc! { id: "f1", name: "a.txt" }, ItemOptions::default())
            .await?;

        vault.delete(ItemOptions::default()).await?;
        assert_eq!(ctx.stored("Vaults"), 0);
        assert_eq!(ctx.stored("Files"), 1);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_failed_cascade_rolls_back_owner() {
    let folders = Schema::builder("Folders", "Folder")
        .add_primary_key_property("id", PropertyType::String, KeyOptions::default())
        .add_has_many_relation("notes", "Notes", "folderId")
        .build()
        .unwrap();
    let notes = Schema::builder("Notes", "Note")
        .add_primary_key_property("id", PropertyType::String, KeyOptions::default())
        .add_foreign_key_property("folderId", PropertyType::String, KeyOptions::default())
        .add_property("locked", PropertyType::Boolean)
        .on(LifecyclePhase::WillDelete, |item, _options| {
            if item.get("locked") == Some(&Value::Bool(true)) {
                return Err(CofferError::new("note is locked", ErrorKind::InvalidOperation));
            }
            Ok(())
        })
        .build()
        .unwrap();
    let repository = MemoryRepository::builder()
        .schema(folders)
        .schema(notes)
        .build()
        .unwrap();

    let folders = repository.clone().create_collection("Folders").unwrap();
    let mut folder = folders
        .put_item(doc! { id: "inbox" }, ItemOptions::default())
        .await
        .unwrap();
    let notes = folder.relation("notes").unwrap();
    notes
        .put_item(doc! { id: "n1", locked: false }, ItemOptions::default())
        .await
        .unwrap();
    notes
        .put_item(doc! { id: "n2", locked: true }, ItemOptions::default())
        .await
        .unwrap();

    let err = folder.delete(ItemOptions::default()).await.unwrap_err();
    assert_eq!(err.message(), "note is locked");
    assert_eq!(repository.len("Folders"), 1);
    assert_eq!(repository.len("Notes"), 2);
}

#[tokio::test]
async fn test_relation_errors() {
    run_test(create_test_context, |ctx| async move {
        let mut vault = ctx.vaults()?.create_item(doc! { name: "Personal" })?;
        let err = vault.relation("files").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidOperation);

        vault.save(ItemOptions::default()).await?;
        let err = vault.relation("photos").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidRelation);

        let files = vault.relation("files")?;
        assert_eq!(files.schema().item_name(), "File");
        Ok(())
    })
    .await;
}
