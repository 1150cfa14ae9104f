use coffer::collection::{FindOptions, ItemOptions};
use coffer::common::Value;
use coffer::doc;
use coffer::errors::{CofferError, CofferResult, ErrorKind};
use coffer::repository::Repository;
use coffer_int_test::test_util::{create_test_context, run_test};
use futures::FutureExt;

#[tokio::test]
async fn test_commit() {
    run_test(create_test_context, |ctx| async move {
        let people = ctx.people()?;
        let count = people
            .transaction(|people| async move {
                people
                    .put_item(doc! { id: "p1", name: "Ann" }, ItemOptions::default())
                    .await?;
                people
                    .put_item(doc! { id: "p2", name: "Bob" }, ItemOptions::default())
                    .await?;
                people.count_items(FindOptions::default()).await
            })
            .await?;
        assert_eq!(count, 2);
        assert_eq!(ctx.stored("People"), 2);
        assert_eq!(ctx.repository().transaction_count(), 1);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_writes_are_isolated_until_commit() {
    run_test(create_test_context, |ctx| async move {
        let people = ctx.people()?;
        let outside = people.clone();
        people
            .transaction(|people| async move {
                people
                    .put_item(doc! { id: "p1", name: "Ann" }, ItemOptions::default())
                    .await?;
                assert_eq!(people.count_items(FindOptions::default()).await?, 1);
                assert_eq!(outside.count_items(FindOptions::default()).await?, 0);
                Ok(())
            })
            .await?;
        assert_eq!(ctx.stored("People"), 1);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_rollback_discards_every_write() {
    run_test(create_test_context, |ctx| async move {
        let people = ctx.people()?;
        people
            .put_item(doc! { id: "p0", name: "Zoe" }, ItemOptions::default())
            .await?;

        let result: CofferResult<()> = people
            .transaction(|people| async move {
                people
                    .put_item(doc! { id: "p1", name: "Ann" }, ItemOptions::default())
                    .await?;
                people.delete_item("p0", ItemOptions::default()).await?;
                people
                    .put_item(doc! { id: "p2" }, ItemOptions::default())
                    .await?;
                Ok(())
            })
            .await;
        let err = result.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ValidationError);

        assert_eq!(ctx.stored("People"), 1);
        let survivor = people.get_item("p0", ItemOptions::default()).await?;
        assert!(survivor.is_some());
        let first = people
            .get_item("p1", ItemOptions::new().error_if_missing(false))
            .await?;
        assert!(first.is_none());
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_nested_transactions_reuse_the_running_one() {
    run_test(create_test_context, |ctx| async move {
        let people = ctx.people()?;
        people
            .transaction(|people| async move {
                let mut person = people.create_item(doc! { name: "Ann" })?;
                person.save(ItemOptions::default()).await?;
                assert!(person.is_inside_transaction());
                person.set("age", 30)?;
                person.save(ItemOptions::default()).await?;
                person
                    .transaction(|person| {
                        async move {
                            person.set("age", 31)?;
                            Ok(())
                        }
                        .boxed()
                    })
                    .await?;
                people
                    .transaction(|people| async move { people.count_items(FindOptions::default()).await })
                    .await
            })
            .await?;
        assert_eq!(ctx.repository().transaction_count(), 1);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_item_operations_open_their_own_transaction() {
    run_test(create_test_context, |ctx| async move {
        let people = ctx.people()?;
        let mut person = people
            .put_item(doc! { name: "Ann" }, ItemOptions::default())
            .await?;
        person.set("age", 30)?;
        person.save(ItemOptions::default()).await?;
        person.delete(ItemOptions::default()).await?;
        assert_eq!(ctx.repository().transaction_count(), 3);
        assert!(!person.is_inside_transaction());
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_repository_transaction_handles() {
    run_test(create_test_context, |ctx| async move {
        let repository = ctx.repository();
        let transaction = repository.begin_transaction().await?;
        assert!(transaction.is_inside_transaction());
        assert!(!repository.is_inside_transaction());

        let err = transaction.begin_transaction().await.err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::TransactionError);

        let people = transaction.clone().create_collection("People")?;
        people
            .put_item(doc! { id: "p1", name: "Ann" }, ItemOptions::default())
            .await?;
        assert_eq!(ctx.stored("People"), 0);
        transaction.commit().await?;
        assert_eq!(ctx.stored("People"), 1);

        let err = transaction.rollback().await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_failing_save_keeps_item_unchanged() {
    run_test(create_test_context, |ctx| async move {
        let people = ctx.people()?;
        let mut person = people
            .put_item(doc! { id: "p1", name: "Ann" }, ItemOptions::default())
            .await?;
        person.set("name", Value::Null)?;
        let err = person.save(ItemOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ValidationError);
        assert!(person.is_modified());

        let stored = people.get_item("p1", ItemOptions::default()).await?;
        assert_eq!(
            stored.and_then(|p| p.get("name").cloned()),
            Some(Value::from("Ann"))
        );

        let result: CofferResult<()> = person
            .transaction(|_person| async { Err(CofferError::new("nope", ErrorKind::InternalError)) }.boxed())
            .await;
        assert_eq!(result.unwrap_err().message(), "nope");
        Ok(())
    })
    .await;
}
