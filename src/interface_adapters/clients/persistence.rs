use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

use crate::use_cases::persistence::{DeathSubmission, GatewayError, PersistenceGateway};

#[derive(Debug, Serialize)]
struct DeathRecordRequest<'a> {
    account_id: &'a str,
    display_name: &'a str,
    wave: u32,
    level: u32,
    kills: u64,
    survival_time_seconds: u64,
    combo_max: u32,
    boss_kills: u64,
}

// Thin reqwest client for the progression service's death-record endpoint.
#[derive(Clone)]
pub struct ProgressionClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProgressionClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

impl PersistenceGateway for ProgressionClient {
    async fn record(&self, submission: &DeathSubmission) -> Result<(), GatewayError> {
        let url = format!("{}/progression/deaths", self.base_url);
        let stats = submission.stats;
        let response = self
            .http
            .post(url)
            .json(&DeathRecordRequest {
                account_id: &submission.account_id,
                display_name: &submission.display_name,
                wave: stats.wave,
                level: stats.level,
                kills: stats.kills,
                survival_time_seconds: stats.survival_time_seconds,
                combo_max: stats.combo_max,
                boss_kills: stats.boss_kills,
            })
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::REQUEST_TIMEOUT => Err(GatewayError::Transport("timeout".to_string())),
            s => Err(GatewayError::Status(s.as_u16())),
        }
    }
}
