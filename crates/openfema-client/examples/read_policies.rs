// Read a filtered slice of the NFIP policies dataset
//
// This example shows:
// 1. Connecting to the live OpenFEMA API and listing datasets
// 2. Inspecting one dataset's fields
// 3. Reading a filtered, sorted, capped result into a table
//
// Run with: RUST_LOG=openfema_client=debug cargo run --example read_policies

use openfema_client::{ClientConfig, OpenFemaClient, Operator, Predicate};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== OpenFEMA Policies Example ===\n");

    println!("1. Loading catalog...");
    let client = OpenFemaClient::connect(ClientConfig::builder().page_size(1_000).build()?).await?;
    let datasets = client.list_datasets();
    println!("   {} datasets available", datasets.len());

    println!("\n2. Fields of FimaNfipPolicies:");
    let info = client.dataset_info("FimaNfipPolicies")?;
    for field in info.fields.iter().take(8) {
        println!("   {:<32} {}", field.name, field.column_type);
    }

    println!("\n3. Reading region 1 policies, most expensive first...");
    let query = client
        .query("FimaNfipPolicies")?
        .columns(["propertyState", "policyCost", "policyEffectiveDate"])
        .filter_group([
            Predicate::new("femaRegion", Operator::Eq, 1),
            Predicate::new("policyCost", Operator::Gt, 0),
        ])
        .sort("policyCost", false)
        .top(10)
        .parse_dates(true)
        .build()?;

    let table = client.read_dataset("FimaNfipPolicies", &query).await?;
    println!("   {}", table.column_names().join(" | "));
    for row in table.rows() {
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        println!("   {}", cells.join(" | "));
    }

    println!("\n=== Done: {} rows ===", table.num_rows());
    Ok(())
}
