use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use festa_domain::schema::RecordKind;
use festa_service::{
    CreateRequest, Error as ServiceError, EventSummary, GetOneRequest, SearchRequest,
    SearchResponse, UpdateRequest,
};
use festa_storage::store::Document;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/posts/search", post(search))
        .route("/api/v1/posts/{id}/likes/{user_id}", post(like).delete(unlike))
        .route("/api/v1/users/{id}/membership", get(membership))
        .route("/api/v1/users/{id}/deactivate", post(deactivate))
        .route("/api/v1/users/{id}/guest-events", post(link_guest_events))
        .route("/api/v1/events/guest-lookup", get(guest_lookup))
        .route("/api/v1/{kind}", post(create).get(get_all))
        .route("/api/v1/{kind}/{id}", get(get_one).patch(update).delete(del_one))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

fn parse_kind(raw: &str) -> Result<RecordKind, ApiError> {
    RecordKind::parse(raw).ok_or_else(|| {
        json_error(
            StatusCode::NOT_FOUND,
            "unknown_collection",
            format!("'{raw}' is not a known collection."),
            None,
        )
    })
}

async fn create(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let kind = parse_kind(&kind)?;
    let doc = state.service.create(CreateRequest { kind, fields }).await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn get_all(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let docs = state.service.get_all(kind, &params).await?;
    Ok(Json(docs))
}

#[derive(Debug, Default, Deserialize)]
struct GetOneParams {
    include: Option<String>,
    relations: Option<String>,
}

fn split_csv(raw: Option<String>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

async fn get_one(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Query(params): Query<GetOneParams>,
) -> Result<Json<Document>, ApiError> {
    let kind = parse_kind(&kind)?;
    let doc = state
        .service
        .get_one(GetOneRequest {
            kind,
            id,
            include: split_csv(params.include),
            relations: split_csv(params.relations),
        })
        .await?;
    Ok(Json(doc))
}

async fn update(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<Json<Document>, ApiError> {
    let kind = parse_kind(&kind)?;
    let doc = state.service.update(UpdateRequest { kind, id, fields }).await?;
    Ok(Json(doc))
}

async fn del_one(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let kind = parse_kind(&kind)?;
    state.service.delete(kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn search(
    State(state): State<AppState>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let response = state.service.search(payload).await?;
    Ok(Json(response))
}

async fn like(
    State(state): State<AppState>,
    Path((post_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.service.like(post_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unlike(
    State(state): State<AppState>,
    Path((post_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.service.unlike(post_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct MembershipResponse {
    events: Vec<Uuid>,
}

async fn membership(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let events = state.service.resolve_membership(id).await?;
    Ok(Json(MembershipResponse { events: events.into_iter().collect() }))
}

async fn deactivate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.service.deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct GuestEventsResponse {
    events: Vec<Uuid>,
}

async fn link_guest_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GuestEventsResponse>, ApiError> {
    let events = state.service.link_guest_events(id).await?;
    Ok(Json(GuestEventsResponse { events }))
}

#[derive(Debug, Deserialize)]
struct GuestLookupParams {
    phone: String,
    event: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct GuestLookupResponse {
    events: Vec<EventSummary>,
}

async fn guest_lookup(
    State(state): State<AppState>,
    Query(params): Query<GuestLookupParams>,
) -> Result<Json<GuestLookupResponse>, ApiError> {
    let events = state.service.match_guest_phone(&params.phone, params.event).await?;
    Ok(Json(GuestLookupResponse { events }))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error_code: String,
    message: String,
    fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error_code: String,
    message: String,
    fields: Option<Vec<String>>,
}

impl ApiError {
    fn new(
        status: StatusCode,
        error_code: impl Into<String>,
        message: impl Into<String>,
        fields: Option<Vec<String>>,
    ) -> Self {
        Self {
            status,
            error_code: error_code.into(),
            message: message.into(),
            fields,
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
    fields: Option<Vec<String>>,
) -> ApiError {
    ApiError::new(status, code, message, fields)
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation { message, fields } => json_error(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                message,
                if fields.is_empty() { None } else { Some(fields) },
            ),
            ServiceError::SchemaMismatch { kind, field } => json_error(
                StatusCode::BAD_REQUEST,
                "schema_mismatch",
                format!("Unknown field '{field}' on record kind '{kind}'."),
                Some(vec![field]),
            ),
            ServiceError::NotFound { message } => {
                json_error(StatusCode::NOT_FOUND, "not_found", message, None)
            }
            ServiceError::Forbidden { message } => {
                json_error(StatusCode::FORBIDDEN, "forbidden", message, None)
            }
            ServiceError::Storage { message } => {
                tracing::error!(%message, "Storage failure.");
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage",
                    "Storage failure.",
                    None,
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error_code: self.error_code,
            message: self.message,
            fields: self.fields,
        };
        (self.status, Json(body)).into_response()
    }
}
