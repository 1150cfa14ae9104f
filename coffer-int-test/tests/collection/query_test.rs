use coffer::collection::{limit_to, order_by, query, Collection, FindOptions, ItemOptions};
use coffer::common::Value;
use coffer::doc;
use coffer::errors::{CofferError, CofferResult, ErrorKind};
use coffer::item::Item;
use coffer_int_test::test_util::{create_test_context, run_test};

async fn seed_people(people: &Collection) -> CofferResult<()> {
    let rows = [("p1", "Zoe", 31), ("p2", "Bob", 17), ("p3", "Ann", 45), ("p4", "Max", 28), ("p5", "Eve", 62)];
    for (id, name, age) in rows {
        people
            .put_item(doc! { id: id, name: name, age: age }, ItemOptions::default())
            .await?;
    }
    Ok(())
}

fn keys(items: &[Item]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.get("id").and_then(|v| v.as_str()).map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_find_with_operators() {
    run_test(create_test_context, |ctx| async move {
        let people = ctx.people()?;
        seed_people(&people).await?;

        let adults = people
            .find_items(query(doc! { age: { "$gte": 18 } }).order(vec!["age"]))
            .await?;
        assert_eq!(keys(&adults), vec!["p4", "p1", "p3", "p5"]);

        let named = people
            .find_items(query(doc! { name: { "$in": ["Ann", "Eve"] } }))
            .await?;
        assert_eq!(keys(&named), vec!["p3", "p5"]);
        assert_eq!(people.count_items(FindOptions::new().where_eq("age", 17)).await?, 1);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_find_with_bounds_and_limit() {
    run_test(create_test_context, |ctx| async move {
        let people = ctx.people()?;
        seed_people(&people).await?;

        let middle = people
            .find_items(order_by(vec!["age"]).start(28).end_before(62))
            .await?;
        assert_eq!(keys(&middle), vec!["p4", "p1", "p3"]);

        let oldest = people
            .find_items(order_by(vec!["age"]).reverse(true).limit(2))
            .await?;
        assert_eq!(keys(&oldest), vec!["p5", "p3"]);

        let first = people.find_items(limit_to(1)).await?;
        assert_eq!(keys(&first), vec!["p1"]);
        assert_eq!(people.count_items(limit_to(3)).await?, 3);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_find_with_projection() {
    run_test(create_test_context, |ctx| async move {
        let people = ctx.people()?;
        seed_people(&people).await?;

        let items = people
            .find_items(FindOptions::new().where_eq("name", "Bob").properties(vec!["age"]))
            .await?;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].value(), &doc! { id: "p2", age: 17 });
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_invalid_query() {
    run_test(create_test_context, |ctx| async move {
        let people = ctx.people()?;
        let err = people
            .find_items(query(doc! { age: { "$between": [1, 2] } }))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidArgument);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_get_items() {
    run_test(create_test_context, |ctx| async move {
        let people = ctx.people()?;
        seed_people(&people).await?;

        let found = people
            .get_items(vec!["p5".into(), doc! { id: "p2" }.into()], ItemOptions::default())
            .await?;
        assert_eq!(keys(&found), vec!["p5", "p2"]);

        let err = people
            .get_items(vec!["p1".into(), "p9".into()], ItemOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let found = people
            .get_items_by_keys(
                &Value::from(vec!["p1", "p9"]),
                ItemOptions::new().error_if_missing(false),
            )
            .await?;
        assert_eq!(keys(&found), vec!["p1"]);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn test_for_each_items_pages_through_everything() {
    run_test(create_test_context, |ctx| async move {
        let people = ctx.people()?;
        seed_people(&people).await?;

        let mut names = Vec::new();
        people
            .for_each_items(order_by(vec!["name"]), |person| {
                let name = person.get("name").and_then(|v| v.as_str()).map(str::to_string);
                names.extend(name);
                async { Ok(()) }
            })
            .await?;
        assert_eq!(names, vec!["Ann", "Bob", "Eve", "Max", "Zoe"]);

        let mut visited = 0;
        let err = people
            .for_each_items(FindOptions::default(), |_person| {
                visited += 1;
                let stop = visited == 3;
                async move {
                    if stop {
                        return Err(CofferError::new("enough", ErrorKind::InternalError));
                    }
                    Ok(())
                }
            })
            .await
            .unwrap_err();
        assert_eq!(err.message(), "enough");
        assert_eq!(visited, 3);
        Ok(())
    })
    .await;
}
