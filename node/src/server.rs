// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use axum_extra::TypedHeader;
use chrono::{DateTime, Utc};
use headers::authorization::Bearer;
use headers::Authorization;
use mams_kernel::access::{authorize, Actor, Operation};
use mams_kernel::event::LedgerEvent;
use mams_kernel::metrics::InventoryMetrics;
use mams_kernel::types::{AssetId, EventKind};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::api::*;
use crate::auth::gate::ADMIN_TOOL_HEADER;
use crate::auth::{users, AuthError, AuthGate, UserStore};
use crate::engine::{Breakdown, Engine, Health, ReplaceOutcome, Summary};
use crate::errors::EngineError;
use crate::events::CommitResult;
use crate::telemetry;

pub type SharedEngine = Arc<Mutex<Engine>>;

#[derive(Clone)]
pub struct AppState {
    pub engine: SharedEngine,
    pub users: Arc<Mutex<UserStore>>,
    pub gate: Arc<AuthGate>,
}

impl AppState {
    pub fn new(engine: Engine, users: UserStore, gate: AuthGate) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            users: Arc::new(Mutex::new(users)),
            gate: Arc::new(gate),
        }
    }
}

type BearerHeader = Option<TypedHeader<Authorization<Bearer>>>;

fn auth_failed(mode: &'static str, e: AuthError) -> EngineError {
    metrics::increment_counter!(telemetry::AUTH_FAILURES, "mode" => mode);
    tracing::debug!("{} auth failed: {}", mode, e);
    e.into()
}

/// Strict mode: a valid session token or 401.
async fn require_session(
    State(state): State<AppState>,
    bearer: BearerHeader,
    mut req: Request,
    next: Next,
) -> Result<Response, EngineError> {
    let token = bearer.as_ref().map(|TypedHeader(auth)| auth.token());
    let actor = state
        .gate
        .strict(token, Utc::now())
        .map_err(|e| auth_failed("session", e))?;
    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

/// Tool mode: a session token, or the configured admin tool key.
async fn require_tool_grant(
    State(state): State<AppState>,
    bearer: BearerHeader,
    mut req: Request,
    next: Next,
) -> Result<Response, EngineError> {
    let token = bearer.as_ref().map(|TypedHeader(auth)| auth.token());
    let tool_key = req
        .headers()
        .get(ADMIN_TOOL_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let actor = state
        .gate
        .tool(token, tool_key.as_deref(), Utc::now())
        .map_err(|e| auth_failed("tool", e))?;
    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

fn permit(actor: &Actor, operation: Operation) -> Result<(), EngineError> {
    authorize(actor, operation).map_err(|denied| {
        metrics::increment_counter!(telemetry::AUTH_FAILURES, "mode" => "forbidden");
        tracing::debug!("{} denied: {}", actor.username, denied);
        EngineError::from(denied)
    })
}

pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler));

    let session = Router::new()
        .route("/assets", get(list_assets).post(create_asset))
        .route("/assets/:id", get(get_asset).put(update_asset).delete(retire_asset))
        .route("/purchases", get(list_purchases).post(record_purchase))
        .route("/transfers", get(list_transfers).post(record_transfer))
        .route("/assignments", get(list_assignments).post(record_assignment))
        .route("/expenditures", get(list_expenditures).post(record_expenditure))
        .route("/dashboard/summary", get(summary))
        .route("/dashboard/metrics", get(dashboard_metrics))
        .route("/dashboard/breakdown", get(breakdown))
        .route("/events", get(audit_log))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    let tool = Router::new()
        .route("/admin/:kind/replace", post(replace_events))
        .route_layer(from_fn_with_state(state.clone(), require_tool_grant));

    Router::new()
        .merge(public)
        .merge(session)
        .merge(tool)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---- Auth ----

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserView>), EngineError> {
    let Json(req) = payload?;
    let role = req.role()?;
    let username = req.username.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    let user = users::register(&state.users, &username, &password, role, Utc::now()).await?;
    tracing::info!("Registered {} ({})", user.username, user.role);
    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, EngineError> {
    let Json(req) = payload?;
    let username = req.username.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    let user = users::authenticate(&state.users, &username, &password)
        .await
        .map_err(|e| auth_failed("login", e))?;
    let token = state
        .gate
        .signer()
        .issue(user.id, &user.username, user.role, Utc::now())?;
    Ok(Json(LoginResponse {
        token,
        user: UserView::from(&user),
    }))
}

// ---- Assets ----

async fn list_assets(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<AssetView>>, EngineError> {
    permit(&actor, Operation::ListAssets)?;
    let engine = state.engine.lock().await;
    Ok(Json(engine.list_assets().iter().map(AssetView::from).collect()))
}

async fn get_asset(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<AssetView>, EngineError> {
    permit(&actor, Operation::ReadAsset)?;
    let Path(id) = id?;
    let engine = state.engine.lock().await;
    Ok(Json(AssetView::from(&engine.get_asset(AssetId(id))?)))
}

async fn create_asset(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<CreateAssetRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AssetView>), EngineError> {
    permit(&actor, Operation::CreateAsset)?;
    let Json(req) = payload?;
    let key = req.key()?;
    let values = req.values()?;

    let mut engine = state.engine.lock().await;
    let entry = engine.create_asset(key, values, req.notes, &actor, Utc::now())?;
    Ok((StatusCode::CREATED, Json(AssetView::from(&entry))))
}

async fn update_asset(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<UpdateAssetRequest>, JsonRejection>,
) -> Result<Json<AssetView>, EngineError> {
    permit(&actor, Operation::UpdateAsset)?;
    let Path(id) = id?;
    let Json(req) = payload?;
    let values = req.values()?;

    let mut engine = state.engine.lock().await;
    let entry = engine.update_asset(AssetId(id), values, req.notes, &actor, Utc::now())?;
    Ok(Json(AssetView::from(&entry)))
}

async fn retire_asset(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<StatusCode, EngineError> {
    permit(&actor, Operation::RetireAsset)?;
    let Path(id) = id?;
    let mut engine = state.engine.lock().await;
    engine.retire_asset(AssetId(id), &actor, Utc::now())?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- Events ----

async fn commit(
    state: &AppState,
    event: LedgerEvent,
    actor: &Actor,
    client_ref: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<(StatusCode, Json<EventView>), EngineError> {
    let mut engine = state.engine.lock().await;
    let result = engine.record(event, actor, client_ref, now)?;
    let status = match result {
        CommitResult::Committed(_) => StatusCode::CREATED,
        CommitResult::Duplicate(_) => StatusCode::OK,
    };
    Ok((status, Json(EventView::from(result.record()))))
}

async fn record_purchase(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EventView>), EngineError> {
    permit(&actor, Operation::RecordPurchase)?;
    let Json(req) = payload?;
    let now = Utc::now();
    let client_ref = req.client_ref;
    commit(&state, req.into_event(now)?, &actor, client_ref, now).await
}

async fn record_transfer(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EventView>), EngineError> {
    permit(&actor, Operation::RecordTransfer)?;
    let Json(req) = payload?;
    let now = Utc::now();
    let client_ref = req.client_ref;
    commit(&state, req.into_event(now)?, &actor, client_ref, now).await
}

async fn record_assignment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<AssignmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EventView>), EngineError> {
    permit(&actor, Operation::RecordAssignment)?;
    let Json(req) = payload?;
    let now = Utc::now();
    let client_ref = req.client_ref;
    commit(&state, req.into_event(now)?, &actor, client_ref, now).await
}

async fn record_expenditure(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<ExpenditureRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EventView>), EngineError> {
    permit(&actor, Operation::RecordExpenditure)?;
    let Json(req) = payload?;
    let now = Utc::now();
    let client_ref = req.client_ref;
    commit(&state, req.into_event(now)?, &actor, client_ref, now).await
}

async fn list_kind(
    state: &AppState,
    query: Result<Query<FilterQuery>, QueryRejection>,
    kind: Option<EventKind>,
) -> Result<Json<Vec<EventView>>, EngineError> {
    let Query(query) = query?;
    let engine = state.engine.lock().await;
    let mut filter = query.to_filter(engine.utc_offset())?;
    if kind.is_some() {
        filter.kind = kind;
    }
    Ok(Json(engine.list_events(&filter).iter().map(EventView::from).collect()))
}

async fn list_purchases(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> Result<Json<Vec<EventView>>, EngineError> {
    permit(&actor, Operation::ListEvents)?;
    list_kind(&state, query, Some(EventKind::Purchase)).await
}

async fn list_transfers(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> Result<Json<Vec<EventView>>, EngineError> {
    permit(&actor, Operation::ListEvents)?;
    list_kind(&state, query, Some(EventKind::Transfer)).await
}

async fn list_assignments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> Result<Json<Vec<EventView>>, EngineError> {
    permit(&actor, Operation::ListEvents)?;
    list_kind(&state, query, Some(EventKind::Assignment)).await
}

async fn list_expenditures(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> Result<Json<Vec<EventView>>, EngineError> {
    permit(&actor, Operation::ListEvents)?;
    list_kind(&state, query, Some(EventKind::Expenditure)).await
}

/// Admin audit log: every visible event, optionally narrowed by `?kind=`.
async fn audit_log(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> Result<Json<Vec<EventView>>, EngineError> {
    permit(&actor, Operation::AuditLog)?;
    list_kind(&state, query, None).await
}

// ---- Dashboard ----

async fn summary(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Summary>, EngineError> {
    permit(&actor, Operation::ViewDashboard)?;
    let engine = state.engine.lock().await;
    Ok(Json(engine.summary()))
}

async fn dashboard_metrics(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> Result<Json<InventoryMetrics>, EngineError> {
    permit(&actor, Operation::ViewDashboard)?;
    let Query(query) = query?;
    let engine = state.engine.lock().await;
    let filter = query.to_filter(engine.utc_offset())?;
    Ok(Json(engine.metrics(&filter)))
}

async fn breakdown(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> Result<Json<Breakdown>, EngineError> {
    permit(&actor, Operation::ViewDashboard)?;
    let Query(query) = query?;
    let engine = state.engine.lock().await;
    let filter = query.to_filter(engine.utc_offset())?;
    Ok(Json(engine.breakdown(&filter)))
}

// ---- Admin tools ----

async fn replace_events(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    kind: Result<Path<String>, PathRejection>,
    payload: Result<Json<ReplaceRequest>, JsonRejection>,
) -> Result<Json<ReplaceOutcome>, EngineError> {
    permit(&actor, Operation::ReplaceEvents)?;
    let Path(raw) = kind?;
    let kind = raw
        .parse::<EventKind>()
        .ok()
        .filter(|kind| *kind != EventKind::Adjustment)
        .ok_or_else(|| EngineError::NotFound(format!("Collection '{}'", raw)))?;
    let Json(req) = payload?;

    let now = Utc::now();
    let items = req.items.into_iter().map(move |item| replace_item(kind, item, now));
    let mut engine = state.engine.lock().await;
    Ok(Json(engine.replace(kind, items, &actor, now)?))
}

// ---- Ops ----

async fn health(State(state): State<AppState>) -> Json<Health> {
    let engine = state.engine.lock().await;
    Json(engine.health())
}

async fn metrics_handler() -> String {
    telemetry::render()
}
