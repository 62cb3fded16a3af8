use evepi::config::CONFIG;
use evepi::sde::SdeClient;
use evepi::site_finder;
use evepi::starmap::Starmap;
use evepi::util::CancelToken;
use std::env;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = env::args().skip(1);
    let target_type_id: i64 = args
        .next()
        .expect("usage: find_sites <type_id> [max_jumps]")
        .parse()
        .expect("Invalid type id");
    let max_jumps: u32 = args
        .next()
        .map(|raw| raw.parse().expect("Invalid jump count"))
        .unwrap_or(CONFIG.max_jumps);

    let sde = SdeClient::new().await;
    let starmap = Starmap::load(&CONFIG.starmap_path);
    let sites = site_finder::find_sites(
        &sde,
        &starmap,
        target_type_id,
        max_jumps,
        None,
        &CancelToken::new(),
    )
    .await
    .expect("Site search failed");

    if sites.is_empty() {
        println!("No system can produce type {}", target_type_id);
        return;
    }
    for (rank, site) in sites.iter().enumerate() {
        println!(
            "{:>2}. {:<16} {:<20} sec {:>5.2}  score {:>7.1}",
            rank + 1,
            site.system_name,
            site.region_name,
            site.security,
            site.score
        );
        for (resource, (system, jumps)) in &site.neighbour_sources {
            println!("      type {} via system {} ({} jumps)", resource, system, jumps);
        }
    }
}
