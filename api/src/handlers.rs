//! HTTP request handlers.
//!
//! Handlers parse and shape requests; every rule lives in `souk-market`.

use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use souk_market::{
    AccessStatus, AdminDesk, ListingView, Marketplace, PurchaseRequest, Receipt, SubmitListing,
};
use souk_types::{ListingCategory, RiskLevel};

use crate::error::{ApiError, ApiResult};
use crate::session::{presented_token, session_cookie};

/// Header naming the browsing wallet on listing reads.
pub const WALLET_HEADER: &str = "x-wallet";

// ── Request / response bodies ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct WalletBody {
    pub wallet: String,
}

#[derive(Deserialize)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub wallet: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskBody {
    pub risk_level: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBody {
    pub listing_id: String,
    pub reporter_wallet: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub expires_at: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub success: bool,
    pub reports_count: u32,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

/// Caller address: first `x-forwarded-for` hop, else the socket peer.
fn client_ip(headers: &HeaderMap, peer: Option<ConnectInfo<SocketAddr>>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
}

fn admin(market: &Marketplace) -> ApiResult<&AdminDesk> {
    market.admin.as_ref().ok_or(ApiError::RouteDisabled)
}

/// The admin desk, once the request's session checks out.
fn admin_session<'a>(market: &'a Marketplace, headers: &HeaderMap) -> ApiResult<&'a AdminDesk> {
    let desk = admin(market)?;
    let token = presented_token(headers).ok_or(souk_market::MarketError::Unauthorized)?;
    desk.verify_session(&token)?;
    Ok(desk)
}

// ── Listings ─────────────────────────────────────────────────────────────

pub async fn submit_listing(
    State(market): State<Marketplace>,
    payload: Result<Json<SubmitListing>, JsonRejection>,
) -> ApiResult<Json<ListingView>> {
    let input = body(payload)?;
    market.require_access(&input.wallet)?;
    Ok(Json(market.lifecycle.submit(&input)?))
}

pub async fn list_listings(
    State(market): State<Marketplace>,
    Query(query): Query<ListingQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<ListingView>>> {
    if let Some(wallet) = query.wallet.as_deref() {
        return Ok(Json(market.lifecycle.list_by_wallet(wallet)?));
    }

    if market.enforces_access() {
        let wallet = headers
            .get(WALLET_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                souk_market::MarketError::AccessDenied("connect a wallet to browse".into())
            })?;
        market.require_access(wallet)?;
    }

    let category = query
        .category
        .as_deref()
        .filter(|c| !c.is_empty() && *c != "All")
        .map(ListingCategory::parse)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(market.lifecycle.list_live(category)?))
}

pub async fn get_listing(
    State(market): State<Marketplace>,
    Path(id): Path<String>,
) -> ApiResult<Json<ListingView>> {
    Ok(Json(market.lifecycle.get(&id)?))
}

pub async fn withdraw_listing(
    State(market): State<Marketplace>,
    Path(id): Path<String>,
    payload: Result<Json<WalletBody>, JsonRejection>,
) -> ApiResult<Json<ListingView>> {
    let WalletBody { wallet } = body(payload)?;
    Ok(Json(market.lifecycle.withdraw(&id, &wallet)?))
}

pub async fn delete_listing(
    State(market): State<Marketplace>,
    Path(id): Path<String>,
    payload: Result<Json<WalletBody>, JsonRejection>,
) -> ApiResult<Json<Ack>> {
    let WalletBody { wallet } = body(payload)?;
    market.lifecycle.delete(&id, &wallet)?;
    Ok(Ack::ok())
}

// ── Purchase ─────────────────────────────────────────────────────────────

pub async fn purchase(
    State(market): State<Marketplace>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> ApiResult<Json<Receipt>> {
    let mut request = body(payload)?;
    request.caller_ip = client_ip(&headers, peer);
    market.require_access(&request.buyer_wallet)?;
    Ok(Json(market.settlement.purchase(&request).await?))
}

// ── Access ───────────────────────────────────────────────────────────────

pub async fn connect(
    State(market): State<Marketplace>,
    payload: Result<Json<WalletBody>, JsonRejection>,
) -> ApiResult<Json<AccessStatus>> {
    let WalletBody { wallet } = body(payload)?;
    Ok(Json(market.access.check_access(&wallet).await?))
}

pub async fn accept_tos(
    State(market): State<Marketplace>,
    payload: Result<Json<WalletBody>, JsonRejection>,
) -> ApiResult<Json<Ack>> {
    let WalletBody { wallet } = body(payload)?;
    market.access.accept_tos(&wallet)?;
    Ok(Ack::ok())
}

pub async fn decline_tos(
    State(market): State<Marketplace>,
    payload: Result<Json<WalletBody>, JsonRejection>,
) -> ApiResult<Json<Ack>> {
    let WalletBody { wallet } = body(payload)?;
    market.access.decline_tos(&wallet)?;
    Ok(Ack::ok())
}

// ── Reports ──────────────────────────────────────────────────────────────

pub async fn report_listing(
    State(market): State<Marketplace>,
    payload: Result<Json<ReportBody>, JsonRejection>,
) -> ApiResult<Json<ReportResponse>> {
    let report = body(payload)?;
    let reports_count = market.reports.report(
        &report.listing_id,
        &report.reporter_wallet,
        report.reason.as_deref(),
    )?;
    Ok(Json(ReportResponse {
        success: true,
        reports_count,
    }))
}

// ── Admin ────────────────────────────────────────────────────────────────

pub async fn admin_login(
    State(market): State<Marketplace>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<LoginBody>, JsonRejection>,
) -> ApiResult<Response> {
    let desk = admin(&market)?;
    let LoginBody { code } = body(payload)?;
    let ip = client_ip(&headers, peer);
    let session = desk.login(&code, ip.as_deref())?;

    let body = Json(LoginResponse {
        success: true,
        expires_at: session.expires_at.as_secs(),
    });
    Ok(match session_cookie(&session) {
        Some(cookie) => (AppendHeaders([(header::SET_COOKIE, cookie)]), body).into_response(),
        None => body.into_response(),
    })
}

pub async fn admin_list_all(
    State(market): State<Marketplace>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<ListingView>>> {
    Ok(Json(admin_session(&market, &headers)?.list_all()?))
}

pub async fn admin_approve(
    State(market): State<Marketplace>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<ListingView>> {
    Ok(Json(admin_session(&market, &headers)?.approve(&id)?))
}

pub async fn admin_reject(
    State(market): State<Marketplace>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<ListingView>> {
    Ok(Json(admin_session(&market, &headers)?.reject(&id)?))
}

pub async fn admin_set_risk(
    State(market): State<Marketplace>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<RiskBody>, JsonRejection>,
) -> ApiResult<Json<ListingView>> {
    let desk = admin_session(&market, &headers)?;
    let RiskBody { risk_level } = body(payload)?;
    let level = RiskLevel::parse(&risk_level).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(desk.set_risk(&id, level)?))
}

// ── Operations ───────────────────────────────────────────────────────────

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics(State(market): State<Marketplace>) -> Response {
    match market.metrics.encode_text() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
