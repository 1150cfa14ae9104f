use coffer::collection::{FindOptions, ItemOptions};
use coffer::doc;
use coffer::errors::CofferResult;
use coffer_int_test::test_util::create_test_context;

#[tokio::main]
async fn main() -> CofferResult<()> {
    println!("Starting stress test...");
    let ctx = create_test_context()?;
    let vaults = ctx.vaults()?;

    let count = 10_000;
    let start = std::time::Instant::now();
    let mut vault = vaults
        .put_item(doc! { name: "stress" }, ItemOptions::default())
        .await?;
    let files = vault.relation("files")?;
    for _ in 0..count {
        let name = uuid::Uuid::new_v4().to_string();
        files
            .put_item(doc! { name: name }, ItemOptions::default())
            .await?;
    }
    println!("Inserted {} files in {:?}", count, start.elapsed());

    let start = std::time::Instant::now();
    let mut visited = 0;
    files
        .for_each_items(FindOptions::new().order(vec!["name"]), |_file| {
            visited += 1;
            async { Ok(()) }
        })
        .await?;
    println!("Visited {} files in {:?}", visited, start.elapsed());

    let start = std::time::Instant::now();
    vault.delete(ItemOptions::default()).await?;
    println!(
        "Deleted the vault and {} files in {:?}",
        count - ctx.stored("Files"),
        start.elapsed()
    );
    Ok(())
}
