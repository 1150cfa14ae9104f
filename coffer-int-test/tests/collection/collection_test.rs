use chrono::{TimeZone, Utc};
use coffer::collection::{CallOptions, ItemOptions, Source};
use coffer::common::Value;
use coffer::doc;
use coffer::errors::ErrorKind;
use coffer::repository::Repository;
use coffer_int_test::test_util::{create_mirror_context, create_test_context, run_test, MIRROR_BASE_URL};

#[tokio::test]
async fn test_unknown_collection() {
    run_test(create_test_context, |ctx| async move {
        let err = ctx.collection("Invoices").unwrap_err();
        assert!(err.is_not_found());
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_put_and_get_item() {
    run_test(create_test_context, |ctx| async move {
        let vaults = ctx.vaults()?;
        let vault = vaults
            .put_item(doc! { name: "Personal" }, ItemOptions::default())
            .await?;
        let key = vault.primary_key_value()?;
        assert_eq!(key.as_str().map(str::len), Some(16));

        let loaded = vaults
            .get_item(key.clone(), ItemOptions::default())
            .await?
            .expect("vault should exist");
        assert_eq!(loaded.primary_key_value()?, key);
        assert_eq!(loaded.get("name"), Some(&Value::from("Personal")));
        assert!(loaded.get("createdOn").is_some_and(|v| v.as_datetime().is_some()));
        assert!(!loaded.is_new());
        assert!(!loaded.is_modified());
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_defaults_and_coercion() {
    run_test(create_test_context, |ctx| async move {
        let people = ctx.people()?;
        let person = people.create_item(doc! { name: "Ann", age: 32.0 })?;
        assert_eq!(person.get("tags"), Some(&Value::Array(vec![])));

        let person = people.unserialize_item(doc! { id: "p1", name: "Ann", birthday: "1990-04-01T00:00:00Z" })?;
        let birthday = Utc.with_ymd_and_hms(1990, 4, 1, 0, 0, 0).unwrap();
        assert_eq!(person.get("birthday"), Some(&Value::from(birthday)));

        let normalized = people.normalize(doc! { id: "p1", age: 32.0 })?;
        assert_eq!(normalized.get("age"), Some(&Value::I64(32)));
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_validation_error() {
    run_test(create_test_context, |ctx| async move {
        let people = ctx.people()?;
        let err = people
            .put_item(doc! { name: "Ann", age: "old" }, ItemOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ValidationError);
        assert_eq!(err.message(), "age must be of type integer");
        assert_eq!(ctx.stored("People"), 0);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_save_existing_key_as_new_item() {
    run_test(create_test_context, |ctx| async move {
        let people = ctx.people()?;
        people
            .put_item(doc! { id: "p1", name: "Ann" }, ItemOptions::default())
            .await?;

        let err = people
            .put_item(doc! { id: "p1", name: "Bob" }, ItemOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::AlreadyExists);

        let mut loaded = people
            .get_item("p1", ItemOptions::default())
            .await?
            .expect("person should exist");
        loaded.set("name", "Bob")?;
        loaded.save(ItemOptions::default()).await?;

        let loaded = people
            .get_item("p1", ItemOptions::default())
            .await?
            .expect("person should exist");
        assert_eq!(loaded.get("name"), Some(&Value::from("Bob")));
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_integer_keys() {
    run_test(create_test_context, |ctx| async move {
        let counters = ctx.counters()?;
        for _ in 0..5 {
            let counter = counters
                .put_item(doc! { value: 0 }, ItemOptions::new().error_if_exists(false))
                .await?;
            let key = counter.primary_key_value()?.as_i64().expect("integer key");
            assert!((1..=1000).contains(&key));
        }
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_updated_on_follows_source() {
    run_test(create_test_context, |ctx| async move {
        let vaults = ctx.vaults()?;
        let mut vault = vaults.create_item(doc! { name: "Work" })?;
        vault.save(ItemOptions::new().source(Source::RemoteSynchronizer)).await?;
        assert!(vault.get("createdOn").is_some());
        assert!(vault.get("updatedOn").is_none());

        vault.set("name", "Office")?;
        vault.save(ItemOptions::default()).await?;
        let created_on = vault.get("createdOn").cloned();
        assert!(vault.get("updatedOn").is_some());

        vault.save(ItemOptions::default()).await?;
        assert_eq!(vault.get("createdOn").cloned(), created_on);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_mirror_keeps_incoming_values() {
    run_test(create_mirror_context, |ctx| async move {
        assert!(!ctx.repository().is_local());
        assert_eq!(ctx.repository().app(), Some("vault-app"));

        let vaults = ctx.vaults()?;
        let err = vaults
            .put_item(doc! { name: "Personal" }, ItemOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidArgument);

        let vault = vaults
            .put_item(doc! { id: "v1", name: "Personal" }, ItemOptions::default())
            .await?;
        assert!(vault.get("createdOn").is_none());
        assert!(vault.get("updatedOn").is_none());
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_urls() {
    run_test(create_mirror_context, |ctx| async move {
        let vaults = ctx.vaults()?;
        assert_eq!(
            vaults.make_url(None, &CallOptions::default())?,
            format!("{}/Vaults", MIRROR_BASE_URL)
        );

        let vault = vaults.create_item("v1")?;
        let options = CallOptions::new().query(doc! { format: "zip" });
        assert_eq!(
            vault.make_url(Some("export"), &options)?,
            format!("{}/Vaults/v1:export?format=zip", MIRROR_BASE_URL)
        );

        let ctx = create_test_context()?;
        let err = ctx.vaults()?.make_url(None, &CallOptions::default()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_calls() {
    run_test(create_test_context, |ctx| async move {
        ctx.repository().register_method("Vaults", "rename", |call| {
            let name = call.params.get("name").cloned().unwrap_or(Value::Null);
            Ok(Value::from(doc! { key: (call.key), name: name }))
        });
        let vaults = ctx.vaults()?;
        let vault = vaults
            .put_item(doc! { id: "v1", name: "Personal" }, ItemOptions::default())
            .await?;

        let result = vault
            .call("rename", CallOptions::new().params(doc! { name: "Home" }), None)
            .await?;
        assert_eq!(result, Value::from(doc! { key: "v1", name: "Home" }));

        let result = vaults
            .call_item("v1", "rename", CallOptions::default(), None)
            .await?;
        assert_eq!(result, Value::from(doc! { key: "v1", name: (Value::Null) }));

        let err = vaults
            .call("archive", CallOptions::default(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
        Ok(())
    })
    .await;
}
