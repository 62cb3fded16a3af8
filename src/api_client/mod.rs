pub mod api_models;

use crate::config::CONFIG;
use crate::error::{Error, Result};
use api_models::{PlanetDetail, PlanetSummary};
use moka::future::Cache;
use reqwest::StatusCode;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

const CACHE_TTL: Duration = Duration::from_secs(300);

/// Client for the character planetary endpoints. Responses are cached for a
/// short TTL; `force_refresh` bypasses and repopulates the cache.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    access_token: Arc<RwLock<Option<String>>>,
    planet_lists: Cache<i64, Arc<Vec<PlanetSummary>>>,
    planet_details: Cache<(i64, i64), Arc<PlanetDetail>>,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClient {
    pub fn new() -> ApiClient {
        let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let client = reqwest::ClientBuilder::new()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();
        ApiClient {
            client,
            base_url: CONFIG.api_base_url.to_string(),
            access_token: Arc::new(RwLock::new(None)),
            planet_lists: Cache::builder().time_to_live(CACHE_TTL).build(),
            planet_details: Cache::builder().time_to_live(CACHE_TTL).build(),
        }
    }

    pub fn set_access_token(&self, token: &str) {
        let mut access_token = self.access_token.write().unwrap();
        *access_token = Some(token.to_string());
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.read().unwrap().clone()
    }

    /// `GET /characters/{id}/planets/`
    pub async fn fetch_character_planetary(
        &self,
        character_id: i64,
        force_refresh: bool,
    ) -> Result<Vec<PlanetSummary>> {
        if !force_refresh {
            if let Some(cached) = self.planet_lists.get(&character_id).await {
                return Ok(cached.as_ref().clone());
            }
        }
        let planets: Vec<PlanetSummary> = self
            .get(&format!("/characters/{}/planets/", character_id))
            .await?;
        self.planet_lists
            .insert(character_id, Arc::new(planets.clone()))
            .await;
        Ok(planets)
    }

    /// `GET /characters/{id}/planets/{planet_id}/`
    pub async fn fetch_planetary_detail(
        &self,
        character_id: i64,
        planet_id: i64,
        force_refresh: bool,
    ) -> Result<PlanetDetail> {
        let key = (character_id, planet_id);
        if !force_refresh {
            if let Some(cached) = self.planet_details.get(&key).await {
                return Ok(cached.as_ref().clone());
            }
        }
        let detail: PlanetDetail = self
            .get(&format!(
                "/characters/{}/planets/{}/",
                character_id, planet_id
            ))
            .await?;
        self.planet_details.insert(key, Arc::new(detail.clone())).await;
        Ok(detail)
    }

    async fn get<T>(&self, path: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url);
        if let Some(token) = self.access_token() {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        let response = request.send().await.map_err(Error::NetworkFailure)?;
        let status = response.status();
        debug!("{} GET {}", status.as_u16(), path);
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Unauthorised(status.as_u16()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::InvalidResponse(format!(
                "{} {}: {}",
                status.as_u16(),
                path,
                body
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|err| Error::InvalidResponse(err.to_string()))
    }
}
