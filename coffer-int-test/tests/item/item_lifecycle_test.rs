use coffer::collection::ItemOptions;
use coffer::common::Value;
use coffer::doc;
use coffer::errors::ErrorKind;
use coffer::schema::{KeyOptions, PropertyType, Schema};
use coffer_int_test::test_util::{create_test_context, run_test};

#[tokio::test]
async fn test_flags_through_lifecycle() {
    run_test(create_test_context, |ctx| async move {
        let vaults = ctx.vaults()?;
        let mut vault = vaults.create_item(doc! { name: "Personal" })?;
        assert!(vault.is_new());
        assert!(!vault.is_modified());

        vault.set("name", "Private")?;
        assert!(vault.is_modified());

        vault.save(ItemOptions::default()).await?;
        assert!(!vault.is_new());
        assert!(!vault.is_modified());

        let stored = vaults.unserialize_item(vault.serialize())?;
        assert!(!stored.is_new());
        assert!(!stored.is_modified());
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_serialized_item_round_trips() {
    run_test(create_test_context, |ctx| async move {
        let vaults = ctx.vaults()?;
        let vault = vaults
            .put_item(doc! { name: "Personal" }, ItemOptions::default())
            .await?;
        let json = vault.to_json();
        let copy = vaults.unserialize_item(Value::from(json.clone()))?;
        assert_eq!(copy.primary_key_value()?, vault.primary_key_value()?);
        assert!(copy.get("createdOn").is_some_and(|v| v.as_datetime().is_some()));
        assert_eq!(copy.to_json(), json);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_load_refreshes_item() {
    run_test(create_test_context, |ctx| async move {
        let vaults = ctx.vaults()?;
        let vault = vaults
            .put_item(doc! { name: "Personal" }, ItemOptions::default())
            .await?;
        let key = vault.primary_key_value()?;

        let mut stale = vaults.create_item(key.clone())?;
        stale.load(ItemOptions::default()).await?;
        assert_eq!(stale.get("name"), Some(&Value::from("Personal")));
        assert!(!stale.is_new());

        let mut missing = vaults.create_item("nowhere")?;
        let err = missing.load(ItemOptions::default()).await.unwrap_err();
        assert!(err.is_not_found());
        missing.load(ItemOptions::new().error_if_missing(false)).await?;
        assert!(missing.is_new());
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_load_properties_subset() {
    run_test(create_test_context, |ctx| async move {
        let people = ctx.people()?;
        people
            .put_item(doc! { id: "p1", name: "Ann", age: 40 }, ItemOptions::default())
            .await?;
        let mut person = people.create_item("p1")?;
        person.load(ItemOptions::new().properties(vec!["age"])).await?;
        assert_eq!(person.get("age"), Some(&Value::I64(40)));
        assert!(person.get("name").is_none());
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_delete_item() {
    run_test(create_test_context, |ctx| async move {
        let people = ctx.people()?;
        let mut person = people
            .put_item(doc! { name: "Ann" }, ItemOptions::default())
            .await?;
        assert!(person.delete(ItemOptions::default()).await?);
        assert_eq!(ctx.stored("People"), 0);

        let err = person.delete(ItemOptions::default()).await.unwrap_err();
        assert!(err.is_not_found());
        Ok(())
    })
    .await;
}

#[test]
fn test_extended_schema() {
    let people = Schema::builder("People", "Person")
        .add_primary_key_property("id", PropertyType::String, KeyOptions::default())
        .add_property("name", PropertyType::String)
        .build()
        .unwrap();
    let employees = people
        .extend("People", "Employee")
        .add_property("company", PropertyType::String)
        .build()
        .unwrap();
    assert!(employees.is_kind_of("Person"));
    assert!(!people.is_kind_of("Employee"));
    assert_eq!(employees.primary_key_name().unwrap(), "id");

    let robots = Schema::builder("Robots", "Robot")
        .add_property("name", PropertyType::String)
        .build()
        .unwrap();
    let androids = robots.extend("Androids", "Android").build().unwrap();
    assert_eq!(androids.class_names(), ["Android".to_string()]);
    let err = androids.primary_key_name().unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::MissingPrimaryKey);
}
