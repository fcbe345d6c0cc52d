//! Analytics API client (feature `fetch`)
//!
//! Thin collaborator layer over the combat-log analytics GraphQL API:
//! OAuth client-credentials token with an on-disk expiry cache, paginated
//! report/fight/event queries, and bounded retry with backoff on rate
//! limits. Every function either returns complete data or fails outright;
//! the analysis core never sees a partial page.

use crate::config::get_config;
use crate::models::{Difficulty, DungeonPull, EventLog, Fight, PhaseTransition, RawEvent};
use crate::store::Store;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Kill filter passed through to the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum KillType {
    Encounters,
    Kills,
}

impl KillType {
    fn as_str(&self) -> &'static str {
        match self {
            KillType::Encounters => "Encounters",
            KillType::Kills => "Kills",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedToken {
    access_token: String,
    expires_at: i64,
}

/// Index of report codes cached per zone.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportIndex {
    #[serde(rename = "zoneID")]
    pub zone_id: i64,
    pub codes: Vec<String>,
}

pub struct ApiClient {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl ApiClient {
    /// Authenticate, reusing a cached token while it is still valid.
    pub async fn connect(token_path: &Path) -> Result<Self> {
        let config = get_config();

        let token = match load_cached_token(token_path) {
            Some(token) => token,
            None => {
                let token = acquire_token().await?;
                if let Some(parent) = token_path.parent() {
                    fs::create_dir_all(parent).ok();
                }
                fs::write(token_path, serde_json::to_string(&token)?)
                    .with_context(|| format!("failed to cache token at {}", token_path.display()))?;
                token
            }
        };

        Ok(Self {
            http: reqwest::Client::new(),
            url: config.api.url.clone(),
            token: token.access_token,
        })
    }

    /// Execute one GraphQL query, retrying with doubling delay while the API
    /// reports a rate limit.
    async fn query(&self, query: &str, variables: Value) -> Result<Value> {
        let config = get_config();
        let mut delay = Duration::from_millis(config.api.retry_delay_ms);

        for attempt in 0..=config.api.max_retries {
            let response = self
                .http
                .post(&self.url)
                .bearer_auth(&self.token)
                .json(&json!({ "query": query, "variables": variables }))
                .send()
                .await
                .context("API request failed")?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                warn!(attempt, delay_ms = delay.as_millis() as u64, "Rate limited, backing off");
                tokio::time::sleep(delay).await;
                delay *= 2;
                continue;
            }
            if !response.status().is_success() {
                bail!("API request failed with status {}", response.status());
            }

            let body: Value = response.json().await.context("failed to parse API response")?;
            if let Some(errors) = body.get("errors") {
                bail!("API returned errors: {}", errors);
            }
            return Ok(body["data"].clone());
        }

        bail!("rate limited after {} retries", config.api.max_retries)
    }

    /// Page through the zone's report listing and collect report codes.
    pub async fn fetch_report_codes(&self, zone: i64, max_pages: usize) -> Result<Vec<String>> {
        const QUERY: &str = r#"
        query ($page: Int!, $zoneID: Int!, $limit: Int) {
            reportData {
                reports(page: $page, zoneID: $zoneID, limit: $limit) {
                    data { code }
                    has_more_pages
                }
            }
        }"#;

        let config = get_config();
        let mut codes = Vec::new();

        for page in 1..=max_pages as i64 {
            info!(zone, page, "Fetching report page");
            let data = self
                .query(
                    QUERY,
                    json!({ "page": page, "zoneID": zone, "limit": config.api.page_limit }),
                )
                .await?;
            let reports = &data["reportData"]["reports"];

            let page_codes: Vec<String> = reports["data"]
                .as_array()
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|r| r["code"].as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default();
            debug!(count = page_codes.len(), page, "Report page fetched");
            codes.extend(page_codes);

            if !reports["has_more_pages"].as_bool().unwrap_or(false) {
                break;
            }
        }

        Ok(codes)
    }

    /// Fetch the fights of one report matching the encounter filter.
    pub async fn fetch_fights(
        &self,
        code: &str,
        encounter: i64,
        difficulty: Difficulty,
        kill_type: KillType,
    ) -> Result<Vec<Fight>> {
        const QUERY: &str = r#"
        query ($code: String, $difficulty: Int, $encounterID: Int, $killType: KillType) {
            reportData {
                report(code: $code) {
                    fights(difficulty: $difficulty, encounterID: $encounterID, killType: $killType) {
                        id
                        startTime
                        endTime
                        fightPercentage
                        keystoneLevel
                        phaseTransitions { id startTime }
                        dungeonPulls { encounterID startTime endTime }
                    }
                }
            }
        }"#;

        let data = self
            .query(
                QUERY,
                json!({
                    "code": code,
                    "difficulty": difficulty.as_id(),
                    "encounterID": encounter,
                    "killType": kill_type.as_str(),
                }),
            )
            .await?;

        let raw_fights: Vec<ApiFight> =
            serde_json::from_value(data["reportData"]["report"]["fights"].clone())
                .context("unexpected fight shape in API response")?;

        Ok(raw_fights
            .into_iter()
            .filter(|f| f.start_time.is_some())
            .map(|f| Fight {
                code: code.to_string(),
                id: f.id,
                start_time: f.start_time.unwrap_or(0),
                end_time: f.end_time,
                fight_percentage: f.fight_percentage,
                keystone_level: f.keystone_level,
                phase_transitions: f.phase_transitions,
                dungeon_pulls: f.dungeon_pulls,
            })
            .collect())
    }

    /// Fetch the full cast-event stream of one fight, following
    /// `nextPageTimestamp` until the feed is exhausted.
    pub async fn fetch_events(&self, code: &str, fight_id: i64) -> Result<Vec<RawEvent>> {
        const QUERY: &str = r#"
        query ($code: String, $fightIDs: [Int], $startTime: Float) {
            reportData {
                report(code: $code) {
                    events(fightIDs: $fightIDs, dataType: Casts, hostilityType: Enemies,
                           limit: 10000, startTime: $startTime, wipeCutoff: 0) {
                        data
                        nextPageTimestamp
                    }
                }
            }
        }"#;

        let mut events = Vec::new();
        let mut start_time = 0.0;

        loop {
            let data = self
                .query(
                    QUERY,
                    json!({ "code": code, "fightIDs": [fight_id], "startTime": start_time }),
                )
                .await?;
            let page = &data["reportData"]["report"]["events"];

            let page_events: Vec<RawEvent> = serde_json::from_value(page["data"].clone())
                .context("unexpected event shape in API response")?;
            debug!(code, fight_id, count = page_events.len(), "Event page fetched");
            events.extend(page_events);

            match page["nextPageTimestamp"].as_f64() {
                Some(next) => start_time = next,
                None => break,
            }
        }

        Ok(events)
    }
}

#[derive(Debug, Deserialize)]
struct ApiFight {
    id: i64,
    #[serde(rename = "startTime")]
    start_time: Option<i64>,
    #[serde(rename = "endTime", default)]
    end_time: Option<i64>,
    #[serde(rename = "fightPercentage", default)]
    fight_percentage: Option<f64>,
    #[serde(rename = "keystoneLevel", default)]
    keystone_level: Option<i64>,
    #[serde(rename = "phaseTransitions", default)]
    phase_transitions: Option<Vec<PhaseTransition>>,
    #[serde(rename = "dungeonPulls", default)]
    dungeon_pulls: Option<Vec<DungeonPull>>,
}

fn load_cached_token(path: &Path) -> Option<CachedToken> {
    let content = fs::read_to_string(path).ok()?;
    let token: CachedToken = serde_json::from_str(&content).ok()?;
    if token.expires_at > Utc::now().timestamp() {
        Some(token)
    } else {
        None
    }
}

async fn acquire_token() -> Result<CachedToken> {
    let config = get_config();
    let client_id = config
        .api
        .client_id
        .as_deref()
        .context("CLIENT_ID is not configured")?;
    let client_secret = config
        .api
        .client_secret
        .as_deref()
        .context("CLIENT_SECRET is not configured")?;

    info!("Requesting new API access token");
    let response = reqwest::Client::new()
        .post(&config.api.token_url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ])
        .send()
        .await
        .context("token request failed")?
        .error_for_status()
        .context("token request rejected")?;

    #[derive(Deserialize)]
    struct TokenResponse {
        access_token: String,
        expires_in: i64,
    }
    let token: TokenResponse = response.json().await.context("failed to parse token response")?;

    Ok(CachedToken {
        access_token: token.access_token,
        // Renew a minute early so in-flight requests never race expiry.
        expires_at: Utc::now().timestamp() + token.expires_in - 60,
    })
}

fn token_path(store_dir: &Path) -> PathBuf {
    store_dir.join("token.json")
}

/// Fetch a zone's report codes and cache them.
pub async fn fetch_and_save_reports(store: &Store, data_dir: &Path, zone: i64, max_pages: usize) -> Result<()> {
    let client = ApiClient::connect(&token_path(data_dir)).await?;
    let codes = client.fetch_report_codes(zone, max_pages).await?;
    info!(zone, count = codes.len(), "Fetched report codes");

    let index = ReportIndex { zone_id: zone, codes };
    store.save_json(&store.reports_path(zone), &index)?;
    Ok(())
}

/// Fetch the fight lists for every cached report code of a zone.
pub async fn fetch_and_save_fights(
    store: &Store,
    data_dir: &Path,
    zone: i64,
    encounter: i64,
    difficulty: Difficulty,
    kill_type: KillType,
) -> Result<()> {
    let client = ApiClient::connect(&token_path(data_dir)).await?;

    let index_content = fs::read_to_string(store.reports_path(zone))
        .with_context(|| format!("no cached report index for zone {}; run fetch-reports first", zone))?;
    let index: ReportIndex = serde_json::from_str(&index_content)?;

    let mut fights = Vec::new();
    for code in &index.codes {
        match client.fetch_fights(code, encounter, difficulty, kill_type).await {
            Ok(report_fights) => {
                debug!(code = %code, count = report_fights.len(), "Fetched fights");
                fights.extend(report_fights);
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Skipping report");
            }
        }
    }

    info!(zone, encounter, count = fights.len(), "Fight list assembled");
    store.save_json(&store.fights_path(zone, encounter, difficulty), &fights)?;
    Ok(())
}

/// Fetch and cache the event logs for every fight in a cached fight list.
pub async fn fetch_and_save_events(
    store: &Store,
    data_dir: &Path,
    zone: i64,
    encounter: i64,
    difficulty: Difficulty,
) -> Result<()> {
    let client = ApiClient::connect(&token_path(data_dir)).await?;
    let fights = store.load_fight_list(zone, encounter, difficulty)?;

    for fight in &fights {
        match client.fetch_events(&fight.code, fight.id).await {
            Ok(events) if !events.is_empty() => {
                let log = EventLog {
                    start_time: fight.start_time,
                    end_time: fight.end_time,
                    pull_id: None,
                    events,
                };
                let path =
                    store.events_path(zone, encounter, difficulty, &fight.code, fight.id);
                store.save_json(&path, &log)?;
            }
            Ok(_) => {
                debug!(code = %fight.code, fight_id = fight.id, "No events, nothing cached");
            }
            Err(e) => {
                warn!(code = %fight.code, fight_id = fight.id, error = %e, "Skipping fight");
            }
        }
    }

    Ok(())
}
