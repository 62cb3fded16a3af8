use evepi::recipes::resolve_base_resources;
use evepi::sde::SdeClient;
use std::env;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let target_type_id: i64 = env::args()
        .nth(1)
        .expect("usage: resolve_recipe <type_id>")
        .parse()
        .expect("Invalid type id");

    let sde = SdeClient::new().await;
    let resources = resolve_base_resources(&sde, target_type_id)
        .await
        .expect("Recipe resolution failed");

    if resources.is_empty() {
        println!("Type {} has no planetary production chain", target_type_id);
        return;
    }
    println!("Base resources for type {}:", target_type_id);
    for resource in resources {
        println!(
            "  depth {}: {} ({})",
            resource.depth, resource.name, resource.type_id
        );
    }
}
