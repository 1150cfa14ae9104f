use coffer::collection::{FindOptions, FixedForeignKey, ItemOptions};
use coffer::common::Value;
use coffer::doc;
use coffer_int_test::test_util::{create_test_context, run_test};

#[tokio::test]
async fn test_scoped_collection_binds_foreign_key() {
    run_test(create_test_context, |ctx| async move {
        let files = ctx.files()?;
        let scoped = files.with_fixed_foreign_key(FixedForeignKey::new("vaultId", "v1"));

        let file = scoped
            .put_item(doc! { name: "a.txt", vaultId: "v2" }, ItemOptions::default())
            .await?;
        assert_eq!(file.get("vaultId"), Some(&Value::from("v1")));
        assert_eq!(file.get("size"), Some(&Value::I64(0)));

        files
            .put_item(doc! { name: "b.txt", vaultId: "v2" }, ItemOptions::default())
            .await?;
        assert_eq!(scoped.count_items(FindOptions::default()).await?, 1);
        assert_eq!(files.count_items(FindOptions::default()).await?, 2);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_scoped_find_and_delete() {
    run_test(create_test_context, |ctx| async move {
        let files = ctx.files()?;
        for (name, vault) in [("a", "v1"), ("b", "v1"), ("c", "v2")] {
            files
                .put_item(doc! { name: name, vaultId: vault }, ItemOptions::default())
                .await?;
        }
        let scoped = files.with_fixed_foreign_key(FixedForeignKey::new("vaultId", "v1"));

        let deleted = scoped
            .find_and_delete_items(FindOptions::new().where_eq("name", "a"))
            .await?;
        assert_eq!(deleted, 1);

        let deleted = scoped
            .find_and_delete_items(FindOptions::new().where_eq("vaultId", "v2"))
            .await?;
        assert_eq!(deleted, 1);

        let left = files.find_items(FindOptions::default()).await?;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].get("vaultId"), Some(&Value::from("v2")));
        Ok(())
    })
    .await;
}
