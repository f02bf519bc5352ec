use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

use super::error::ApiError;
use super::ApiState;
use crate::adapter::{AnyProxy, ProbeError, ProxyInfo};
use crate::health::ranges::StatusRanges;

#[derive(Serialize)]
pub struct GroupList {
    pub proxies: Vec<ProxyInfo>,
}

/// Query of the on-demand delay test. Kept as strings so bad input maps to 400.
#[derive(Debug, Default, Deserialize)]
pub struct DelayQuery {
    pub url: Option<String>,
    #[serde(rename = "statusCodeRange")]
    pub status_code_range: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DelayResponse {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub now: Option<String>,
    pub delays: BTreeMap<String, u16>,
    pub errors: BTreeMap<String, String>,
}

pub async fn get_groups(State(state): State<ApiState>) -> Json<GroupList> {
    let proxies = state.registry.groups().iter().map(|g| g.info()).collect();
    Json(GroupList { proxies })
}

pub async fn get_group(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<ProxyInfo>, ApiError> {
    let proxy = find_proxy(&state, &name)?;
    if proxy.as_group().is_none() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(proxy.info()))
}

/// Run an immediate round for one group with caller-supplied parameters.
pub async fn get_group_delay(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(query): Query<DelayQuery>,
) -> Result<Json<DelayResponse>, ApiError> {
    let proxy = find_proxy(&state, &name)?;
    let group = proxy.as_group().ok_or(ApiError::NotFound)?;

    let timeout = parse_timeout(query.timeout.as_deref())?;
    let url = parse_url(query.url.as_deref())?;
    let expected = StatusRanges::parse_lenient(query.status_code_range.as_deref().unwrap_or(""));

    tracing::debug!(
        group = %name,
        url = %url,
        timeout_ms = timeout.as_millis() as u64,
        "On-demand delay test"
    );

    let deadline = Instant::now() + timeout;
    let report = match tokio::time::timeout_at(deadline, group.delay_test(&url, &expected, deadline)).await {
        Ok(Ok(report)) => report,
        Ok(Err(ProbeError::Timeout)) | Err(_) => {
            return Err(ApiError::GatewayTimeout(format!(
                "timeout after {}ms",
                timeout.as_millis()
            )))
        }
        Ok(Err(e)) => return Err(ApiError::GatewayTimeout(e.to_string())),
    };

    Ok(Json(DelayResponse {
        name: proxy.name().to_string(),
        kind: proxy.kind().to_string(),
        now: group.now(),
        delays: report.delays,
        errors: report.errors,
    }))
}

#[derive(Debug, Serialize)]
pub struct SelectResponse {
    pub name: String,
    pub now: Option<String>,
}

/// Pick the member a connection should use. Counts as use of the group for lazy checks.
pub async fn select_group(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<SelectResponse>, ApiError> {
    let proxy = find_proxy(&state, &name)?;
    let group = proxy.as_group().ok_or(ApiError::NotFound)?;

    let now = group.select().map(|p| p.name().to_string());
    tracing::debug!(group = %name, now = ?now, "Group selected");

    Ok(Json(SelectResponse {
        name: proxy.name().to_string(),
        now,
    }))
}

fn find_proxy(state: &ApiState, name: &str) -> Result<AnyProxy, ApiError> {
    state.registry.get(name).ok_or(ApiError::NotFound)
}

/// Timeout in milliseconds: a positive 32-bit integer.
fn parse_timeout(raw: Option<&str>) -> Result<Duration, ApiError> {
    let raw = raw.ok_or_else(|| ApiError::BadRequest("missing timeout".to_string()))?;
    match raw.trim().parse::<i32>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms as u64)),
        _ => Err(ApiError::BadRequest(format!("invalid timeout: {:?}", raw))),
    }
}

fn parse_url(raw: Option<&str>) -> Result<String, ApiError> {
    let raw = raw
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing url".to_string()))?;
    Url::parse(raw).map_err(|e| ApiError::BadRequest(format!("invalid url: {}", e)))?;
    Ok(raw.to_string())
}
