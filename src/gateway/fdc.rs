// ABOUTME: FoodData Central HTTP gateway with caching and rate limiting
// ABOUTME: Maps FDC search/detail payloads into ReferenceEntry records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! `FoodData` Central gateway.
//!
//! Production implementation of [`CandidateGateway`](super::CandidateGateway)
//! against the USDA `FoodData` Central API. Responses are cached with a
//! jittered TTL and requests ride a sliding-window rate limiter so a batch
//! of resolutions cannot exhaust the API quota.
//!
//! API reference: <https://fdc.nal.usda.gov/api-guide.html>

use super::CandidateGateway;
use crate::errors::AppError;
use crate::models::{CookMethod, FoodForm, MacroProfile, ProvenanceTier, ReferenceEntry};
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

/// FDC nutrient numbers for the macro profile
const NUTRIENT_PROTEIN: u32 = 1003;
const NUTRIENT_FAT: u32 = 1004;
const NUTRIENT_CARBS: u32 = 1005;
const NUTRIENT_ENERGY_KCAL: u32 = 1008;
const NUTRIENT_FIBER: u32 = 1079;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct FdcGatewayConfig {
    /// API key (free from the FDC signup page)
    pub api_key: String,
    /// Base URL
    pub base_url: String,
    /// Cache TTL in seconds
    pub cache_ttl_secs: u64,
    /// Requests allowed per minute
    pub rate_limit_per_minute: u32,
}

impl Default for FdcGatewayConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.nal.usda.gov/fdc/v1".to_owned(),
            cache_ttl_secs: 86_400,
            rate_limit_per_minute: 30,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    expires_at: Instant,
}

/// Sliding-window rate limiter
#[derive(Debug)]
struct RateLimiter {
    requests: Vec<Instant>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    const fn new(limit: u32, window: Duration) -> Self {
        Self {
            requests: Vec::new(),
            limit,
            window,
        }
    }

    fn can_request(&mut self) -> bool {
        let now = Instant::now();
        self.requests
            .retain(|&t| now.duration_since(t) < self.window);
        self.requests.len() < self.limit as usize
    }

    fn record_request(&mut self) {
        self.requests.push(Instant::now());
    }

    async fn wait_if_needed(&mut self) {
        while !self.can_request() {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}

// ---- FDC wire payloads ----

#[derive(Debug, Deserialize)]
struct SearchResponse {
    foods: Vec<SearchFood>,
}

#[derive(Debug, Deserialize)]
struct SearchFood {
    #[serde(rename = "fdcId")]
    fdc_id: u64,
    description: String,
    #[serde(rename = "dataType")]
    data_type: String,
    #[serde(rename = "brandOwner")]
    brand_owner: Option<String>,
    #[serde(rename = "foodNutrients", default)]
    food_nutrients: Vec<WireNutrient>,
}

#[derive(Debug, Deserialize)]
struct WireNutrient {
    #[serde(rename = "nutrientId")]
    nutrient_id: Option<u32>,
    nutrient: Option<WireNutrientInfo>,
    #[serde(alias = "value")]
    amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireNutrientInfo {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    #[serde(rename = "fdcId")]
    fdc_id: u64,
    description: String,
    #[serde(rename = "dataType")]
    data_type: String,
    #[serde(rename = "brandOwner")]
    brand_owner: Option<String>,
    #[serde(rename = "foodNutrients", default)]
    food_nutrients: Vec<WireNutrient>,
}

impl WireNutrient {
    fn id(&self) -> Option<u32> {
        self.nutrient_id
            .or_else(|| self.nutrient.as_ref().map(|n| n.id))
    }
}

fn profile_from_nutrients(nutrients: &[WireNutrient]) -> MacroProfile {
    let mut p = MacroProfile::default();
    for n in nutrients {
        let (Some(id), Some(amount)) = (n.id(), n.amount) else {
            continue;
        };
        match id {
            NUTRIENT_PROTEIN => p.protein_g = amount,
            NUTRIENT_FAT => p.fat_g = amount,
            NUTRIENT_CARBS => p.carbs_g = amount,
            NUTRIENT_ENERGY_KCAL => p.kcal = amount,
            NUTRIENT_FIBER => p.fiber_g = amount,
            _ => {}
        }
    }
    p
}

fn tier_from_data_type(data_type: &str) -> Option<ProvenanceTier> {
    match data_type {
        "Foundation" => Some(ProvenanceTier::Foundation),
        "SR Legacy" => Some(ProvenanceTier::SrLegacy),
        "Branded" => Some(ProvenanceTier::Branded),
        _ => None,
    }
}

/// Derive form/method from an FDC description ("Chicken, breast, meat only,
/// cooked, roasted"). The store's comma-separated descriptors carry the
/// preparation state at the tail.
fn parse_form_and_method(description: &str) -> (FoodForm, Option<CookMethod>) {
    let lower = description.to_lowercase();
    let method = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .find_map(CookMethod::from_token)
        .filter(|m| *m != CookMethod::Raw);
    if let Some(m) = method {
        return (FoodForm::Cooked, Some(m));
    }
    if lower.contains("cooked") {
        return (FoodForm::Cooked, None);
    }
    (FoodForm::Raw, None)
}

/// Core class key: first two comma-separated descriptors, normalized
fn class_from_description(description: &str) -> String {
    description
        .split(',')
        .take(2)
        .flat_map(|part| {
            part.split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|t| !t.is_empty())
        })
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

fn entry_from_parts(
    fdc_id: u64,
    description: &str,
    data_type: &str,
    brand: Option<String>,
    nutrients: &[WireNutrient],
) -> Option<ReferenceEntry> {
    let tier = tier_from_data_type(data_type)?;
    let (form, method) = parse_form_and_method(description);
    let per_100g = profile_from_nutrients(nutrients);
    if !per_100g.is_non_negative() {
        warn!(fdc_id, "dropping record with negative nutrient values");
        return None;
    }
    Some(ReferenceEntry {
        id: fdc_id,
        core_class: class_from_description(description),
        name: description.to_owned(),
        tier,
        form,
        method,
        per_100g,
        brand,
    })
}

/// `FoodData` Central API gateway
pub struct FdcGateway {
    config: FdcGatewayConfig,
    http_client: reqwest::Client,
    search_cache: RwLock<HashMap<String, CacheEntry<Vec<ReferenceEntry>>>>,
    details_cache: RwLock<HashMap<u64, CacheEntry<Option<ReferenceEntry>>>>,
    rate_limiter: RwLock<RateLimiter>,
}

impl FdcGateway {
    /// Create a gateway from configuration
    #[must_use]
    pub fn new(config: FdcGatewayConfig) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit_per_minute, Duration::from_secs(60));
        Self {
            config,
            http_client: reqwest::Client::new(),
            search_cache: RwLock::new(HashMap::new()),
            details_cache: RwLock::new(HashMap::new()),
            rate_limiter: RwLock::new(rate_limiter),
        }
    }

    /// Jittered expiry so a batch's cache entries don't all lapse at once
    fn jittered_expiry(&self) -> Instant {
        let jitter = rand::thread_rng().gen_range(0.9..1.1);
        Instant::now() + Duration::from_secs_f64(self.config.cache_ttl_secs as f64 * jitter)
    }

    async fn throttle(&self) {
        let mut limiter = self.rate_limiter.write().await;
        limiter.wait_if_needed().await;
        limiter.record_request();
    }

    fn map_transport_error(err: &reqwest::Error) -> AppError {
        if err.is_connect() || err.is_timeout() {
            AppError::unavailable("FDC API", err.to_string())
        } else {
            AppError::external_service("FDC API", err.to_string())
        }
    }

    /// Clear both caches (tests and long-lived processes)
    pub async fn clear_caches(&self) {
        self.search_cache.write().await.clear();
        self.details_cache.write().await.clear();
    }
}

#[async_trait]
impl CandidateGateway for FdcGateway {
    async fn search(
        &self,
        query: &str,
        tier_filter: Option<ProvenanceTier>,
        limit: u32,
    ) -> Result<Vec<ReferenceEntry>, AppError> {
        if query.is_empty() {
            return Err(AppError::invalid_input("Search query cannot be empty"));
        }
        if limit == 0 || limit > 200 {
            return Err(AppError::invalid_input("Limit must be between 1 and 200"));
        }

        let cache_key = format!("{query}:{limit}:{tier_filter:?}");
        {
            let cache = self.search_cache.read().await;
            if let Some(entry) = cache.get(&cache_key) {
                if Instant::now() < entry.expires_at {
                    return Ok(entry.data.clone());
                }
            }
        }

        self.throttle().await;

        let url = format!("{}/foods/search", self.config.base_url);
        let data_type = tier_filter.map(|t| match t {
            ProvenanceTier::Foundation => "Foundation",
            ProvenanceTier::SrLegacy => "SR Legacy",
            ProvenanceTier::Branded => "Branded",
        });
        let mut params: Vec<(&str, String)> = vec![
            ("query", query.to_owned()),
            ("pageSize", limit.to_string()),
            ("api_key", self.config.api_key.clone()),
        ];
        if let Some(dt) = data_type {
            params.push(("dataType", dt.to_owned()));
        }

        let response = self
            .http_client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| Self::map_transport_error(&e))?;

        if !response.status().is_success() {
            return Err(AppError::external_service(
                "FDC API",
                format!("HTTP {}", response.status()),
            ));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::external_service("FDC API", format!("JSON parse error: {e}")))?;

        let entries: Vec<ReferenceEntry> = search
            .foods
            .into_iter()
            .filter_map(|f| {
                entry_from_parts(
                    f.fdc_id,
                    &f.description,
                    &f.data_type,
                    f.brand_owner,
                    &f.food_nutrients,
                )
            })
            .collect();

        self.search_cache.write().await.insert(
            cache_key,
            CacheEntry {
                data: entries.clone(),
                expires_at: self.jittered_expiry(),
            },
        );

        Ok(entries)
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<ReferenceEntry>, AppError> {
        {
            let cache = self.details_cache.read().await;
            if let Some(entry) = cache.get(&id) {
                if Instant::now() < entry.expires_at {
                    return Ok(entry.data.clone());
                }
            }
        }

        self.throttle().await;

        let url = format!("{}/food/{id}", self.config.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|e| Self::map_transport_error(&e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::external_service(
                "FDC API",
                format!("HTTP {}", response.status()),
            ));
        }

        let detail: DetailResponse = response
            .json()
            .await
            .map_err(|e| AppError::external_service("FDC API", format!("JSON parse error: {e}")))?;

        let entry = entry_from_parts(
            detail.fdc_id,
            &detail.description,
            &detail.data_type,
            detail.brand_owner,
            &detail.food_nutrients,
        );

        self.details_cache.write().await.insert(
            id,
            CacheEntry {
                data: entry.clone(),
                expires_at: self.jittered_expiry(),
            },
        );

        Ok(entry)
    }
}
