use lazy_static::lazy_static;

pub struct Config {
    pub api_base_url: String,
    pub starmap_path: String,
    pub max_jumps: u32,
}

lazy_static! {
    pub static ref CONFIG: Config = {
        let api_base_url = std::env::var("EVE_API_BASE_URL")
            .unwrap_or_else(|_| "https://esi.evetech.net/latest".to_string());
        let starmap_path =
            std::env::var("STARMAP_PATH").unwrap_or_else(|_| "data/starmap.json".to_string());
        let max_jumps = std::env::var("SITE_FINDER_MAX_JUMPS")
            .ok()
            .and_then(|val| val.parse().ok())
            .unwrap_or(3);
        Config {
            api_base_url,
            starmap_path,
            max_jumps,
        }
    };
}
