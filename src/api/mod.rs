// HTTP API routes (monkey CRUD, breeding, fights, users).

use axum::{
    extract::{Json, Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::auth;
use crate::db::{self, Database, MonkeyChanges};
use crate::engine::config::{STAT_MAX, STAT_MIN};
use crate::engine::error::LabError;
use crate::engine::lab;
use crate::engine::monkey::{stat_in_range, MonkeyId, NewMonkey};
use crate::metrics;

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateMonkeyRequest {
    pub name: String,
    pub age: i32,
    pub is_cool: bool,
    pub strength: i32,
    pub intelligence: i32,
    pub speed: i32,
}

#[derive(Deserialize)]
pub struct BreedRequest {
    pub parent1_id: MonkeyId,
    pub parent2_id: MonkeyId,
}

#[derive(Deserialize)]
pub struct FightRequest {
    pub monkey1_id: MonkeyId,
    pub monkey2_id: MonkeyId,
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

// ── Error helpers ─────────────────────────────────────────────────────

fn json_error(status: StatusCode, msg: &str) -> impl IntoResponse {
    (status, Json(json!({ "error": msg })))
}

fn internal_error(e: sqlx::Error) -> impl IntoResponse {
    tracing::error!("Database error: {e}");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Translate a lab failure into a response.
fn lab_error(e: LabError) -> Response {
    let status = match &e {
        LabError::NotFound(_) => StatusCode::NOT_FOUND,
        LabError::Breeding(_) | LabError::Combat(_) => StatusCode::BAD_REQUEST,
        LabError::NamesExhausted(_) | LabError::Conflict(_) => StatusCode::CONFLICT,
        LabError::Repository(source) => {
            tracing::error!("Lab storage error: {source}");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                .into_response();
        }
    };
    (status, Json(json!({ "error": e.to_string(), "reason": e.reason() }))).into_response()
}

fn stat_range_error(field: &str) -> String {
    format!("{field} must be between {STAT_MIN} and {STAT_MAX}")
}

fn validate_intake(monkey: &NewMonkey) -> Result<(), String> {
    if monkey.name.is_empty() {
        return Err("name must not be empty".into());
    }
    if monkey.age < 0 {
        return Err("age must not be negative".into());
    }
    match monkey.stats().out_of_bounds() {
        Some(field) => Err(stat_range_error(field)),
        None => Ok(()),
    }
}

fn validate_changes(changes: &MonkeyChanges) -> Result<(), String> {
    if changes.name.as_deref().is_some_and(str::is_empty) {
        return Err("name must not be empty".into());
    }
    if changes.age.is_some_and(|age| age < 0) {
        return Err("age must not be negative".into());
    }
    for (field, value) in [
        ("strength", changes.strength),
        ("intelligence", changes.intelligence),
        ("speed", changes.speed),
    ] {
        if value.is_some_and(|v| !stat_in_range(v)) {
            return Err(stat_range_error(field));
        }
    }
    Ok(())
}

// ── Router ────────────────────────────────────────────────────────────

/// Full application: health, metrics, auth and the API routes.
pub fn app(db: Arc<Database>) -> Router {
    metrics::register_metrics();

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        // Auth routes
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .with_state(db.clone())
        .merge(router(db))
        .layer(middleware::from_fn(track_metrics))
        .layer(CorsLayer::permissive())
}

pub fn router(db: Arc<Database>) -> Router {
    let state = AppState { db };

    Router::new()
        // Monkeys
        .route("/api/monkey", get(list_monkeys).post(create_monkey))
        .route("/api/monkey/breed", post(breed_monkeys))
        .route("/api/monkey/fight", post(fight_monkeys))
        .route(
            "/api/monkey/{id}",
            get(get_monkey).put(update_monkey).delete(delete_monkey),
        )
        // Users
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "monkey-backend" }))
}

async fn get_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

async fn track_metrics(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let endpoint = metrics::normalize_path(req.uri().path());
    let start = std::time::Instant::now();

    let response = next.run(req).await;

    metrics::API_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint.as_str()])
        .observe(start.elapsed().as_secs_f64());
    metrics::API_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), endpoint.as_str(), response.status().as_str()])
        .inc();
    response
}

// ── Monkey handlers ───────────────────────────────────────────────────

async fn list_monkeys(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.list_monkeys().await {
        Ok(monkeys) => (StatusCode::OK, Json(json!(monkeys))).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn create_monkey(
    State(state): State<AppState>,
    Json(req): Json<CreateMonkeyRequest>,
) -> impl IntoResponse {
    let monkey = NewMonkey {
        name: req.name,
        age: req.age,
        is_cool: req.is_cool,
        strength: req.strength,
        intelligence: req.intelligence,
        speed: req.speed,
        parent1_id: None,
        parent2_id: None,
    };
    if let Err(msg) = validate_intake(&monkey) {
        return json_error(StatusCode::BAD_REQUEST, &msg).into_response();
    }
    match state.db.create_monkey(&monkey).await {
        Ok(monkey) => (StatusCode::CREATED, Json(json!(monkey))).into_response(),
        Err(e) if db::is_unique_violation(&e) => {
            json_error(StatusCode::CONFLICT, "A monkey with this name already exists")
                .into_response()
        }
        Err(e) => internal_error(e).into_response(),
    }
}

async fn get_monkey(State(state): State<AppState>, Path(id): Path<MonkeyId>) -> impl IntoResponse {
    match state.db.get_monkey(id).await {
        Ok(Some(monkey)) => (StatusCode::OK, Json(json!(monkey))).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "Monkey not found").into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn update_monkey(
    State(state): State<AppState>,
    Path(id): Path<MonkeyId>,
    Json(changes): Json<MonkeyChanges>,
) -> impl IntoResponse {
    if let Err(msg) = validate_changes(&changes) {
        return json_error(StatusCode::BAD_REQUEST, &msg).into_response();
    }
    match state.db.update_monkey(id, &changes).await {
        Ok(Some(monkey)) => (StatusCode::OK, Json(json!(monkey))).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "Monkey not found").into_response(),
        Err(e) if db::is_unique_violation(&e) => {
            json_error(StatusCode::CONFLICT, "A monkey with this name already exists")
                .into_response()
        }
        Err(e) => internal_error(e).into_response(),
    }
}

async fn delete_monkey(
    State(state): State<AppState>,
    Path(id): Path<MonkeyId>,
) -> impl IntoResponse {
    match state.db.delete_monkey(id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => json_error(StatusCode::NOT_FOUND, "Monkey not found").into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn breed_monkeys(
    State(state): State<AppState>,
    Json(req): Json<BreedRequest>,
) -> impl IntoResponse {
    let mut rng = StdRng::from_entropy();
    match lab::breed(state.db.as_ref(), &mut rng, req.parent1_id, req.parent2_id).await {
        Ok(child) => (StatusCode::CREATED, Json(json!(child))).into_response(),
        Err(e) => lab_error(e),
    }
}

async fn fight_monkeys(
    State(state): State<AppState>,
    Json(req): Json<FightRequest>,
) -> impl IntoResponse {
    let mut rng = StdRng::from_entropy();
    match lab::fight(state.db.as_ref(), &mut rng, req.monkey1_id, req.monkey2_id).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "winner": outcome.winner,
                "eliminated_id": outcome.loser_id,
                "winner_score": outcome.winner_score,
                "loser_score": outcome.loser_score,
            })),
        )
            .into_response(),
        Err(e) => lab_error(e),
    }
}

// ── User handlers ─────────────────────────────────────────────────────

async fn list_users(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.list_users().await {
        Ok(users) => (StatusCode::OK, Json(json!(users))).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match state.db.get_user(id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(json!(user))).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "User not found").into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    if let Err(msg) = auth::validate_credentials(&req.email, &req.password) {
        return json_error(StatusCode::BAD_REQUEST, msg).into_response();
    }
    let password_hash = match auth::hash_password(&req.password) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("Password hash error: {e}");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                .into_response();
        }
    };
    match state.db.create_user(&req.email, &password_hash).await {
        Ok(user) => (StatusCode::CREATED, Json(json!(user))).into_response(),
        Err(e) if db::is_unique_violation(&e) => {
            json_error(StatusCode::CONFLICT, "User already exists").into_response()
        }
        Err(e) => internal_error(e).into_response(),
    }
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    if req.email.as_deref().is_some_and(|e| !e.contains('@')) {
        return json_error(StatusCode::BAD_REQUEST, "email is invalid").into_response();
    }
    let password_hash = match req.password.as_deref() {
        Some(p) if p.len() < auth::MIN_PASSWORD_LEN => {
            return json_error(
                StatusCode::BAD_REQUEST,
                "password must be at least 8 characters",
            )
            .into_response();
        }
        Some(p) => match auth::hash_password(p) {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::error!("Password hash error: {e}");
                return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                    .into_response();
            }
        },
        None => None,
    };
    match state
        .db
        .update_user(id, req.email.as_deref(), password_hash.as_deref())
        .await
    {
        Ok(Some(user)) => (StatusCode::OK, Json(json!(user))).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "User not found").into_response(),
        Err(e) if db::is_unique_violation(&e) => {
            json_error(StatusCode::CONFLICT, "User already exists").into_response()
        }
        Err(e) => internal_error(e).into_response(),
    }
}

async fn delete_user(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match state.db.delete_user(id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => json_error(StatusCode::NOT_FOUND, "User not found").into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}
