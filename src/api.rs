// REST API - axum router over the docket service
//
// Every response is wrapped in { success, data?, error? }

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::convert::Infallible;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::board::Board;
use crate::db::Event;
use crate::entities::case::{Case, Contact, NewCase, NewContact};
use crate::entities::document::{Document, DocumentPatch, MovementRecord, NewDocument, StageTarget};
use crate::entities::document_type::DocumentType;
use crate::entities::stage::{Stage, StageRemoval};
use crate::error::DocketError;
use crate::movement::{MoveOutcome, MoveRequest};
use crate::service::DocketService;
use crate::session::{Role, Session};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: DocketService,
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, DocketError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

impl DocketError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DocketError::NotFound { .. } => StatusCode::NOT_FOUND,
            DocketError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DocketError::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DocketError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, Json(ApiResponse::<()>::failure(self.to_string()))).into_response()
    }
}

// ============================================================================
// Session extraction
// ============================================================================

pub const ACTOR_HEADER: &str = "x-actor";
pub const ROLE_HEADER: &str = "x-role";

fn header_value<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(actor) = header_value(&parts.headers, ACTOR_HEADER) else {
            return Ok(Session::anonymous());
        };
        let role = header_value(&parts.headers, ROLE_HEADER)
            .map(Role::parse)
            .unwrap_or(Role::User);
        Ok(Session::new(actor, role))
    }
}

// ============================================================================
// Request bodies
// ============================================================================

/// `Json` whose rejections (bad syntax, missing fields) come back as a 422
/// inside the response envelope
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = DocketError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(DocketError::validation("body", rejection.body_text())),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NamePayload {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewStagePayload {
    pub name: String,
    #[serde(default)]
    pub order: Option<i64>,
}

/// `stage` is required; `null` or `""` mean "unassigned"
#[derive(Debug, Default, Deserialize)]
pub struct MovePayload {
    #[serde(default, deserialize_with = "crate::entities::document::present_field")]
    pub stage: Option<Option<String>>,
    #[serde(default)]
    pub notes: Option<String>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::ok("OK"))
}

// --- cases -------------------------------------------------------------------

async fn list_cases(State(state): State<AppState>) -> ApiResult<Vec<Case>> {
    ok(state.service.list_cases()?)
}

async fn get_case(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Case> {
    ok(state.service.get_case(&id)?)
}

async fn create_case(
    State(state): State<AppState>,
    session: Session,
    ApiJson(input): ApiJson<NewCase>,
) -> Result<(StatusCode, Json<ApiResponse<Case>>), DocketError> {
    let case = state.service.create_case(&session, input)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(case))))
}

async fn delete_case(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<Case> {
    ok(state.service.delete_case(&session, &id)?)
}

/// GET /api/cases/:id/board - Board projection (columns + cards)
async fn case_board(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Board> {
    ok(state.service.board(&id)?)
}

/// GET /api/cases/:id/timeline.csv - Document timeline download
async fn case_timeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, DocketError> {
    let mut body = Vec::new();
    state.service.export_timeline(&id, &mut body)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"timeline-{}.csv\"", id),
            ),
        ],
        body,
    )
        .into_response())
}

// --- contacts ----------------------------------------------------------------

async fn list_contacts(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> ApiResult<Vec<Contact>> {
    ok(state.service.list_contacts(&case_id)?)
}

async fn create_contact(
    State(state): State<AppState>,
    session: Session,
    ApiJson(input): ApiJson<NewContact>,
) -> Result<(StatusCode, Json<ApiResponse<Contact>>), DocketError> {
    let contact = state.service.create_contact(&session, input)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(contact))))
}

async fn delete_contact(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<Contact> {
    ok(state.service.delete_contact(&session, &id)?)
}

// --- documents ---------------------------------------------------------------

async fn list_case_documents(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> ApiResult<Vec<Document>> {
    ok(state.service.list_case_documents(&case_id)?)
}

async fn create_document(
    State(state): State<AppState>,
    session: Session,
    ApiJson(input): ApiJson<NewDocument>,
) -> Result<(StatusCode, Json<ApiResponse<Document>>), DocketError> {
    let document = state.service.create_document(&session, input)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(document))))
}

async fn update_document(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<DocumentPatch>,
) -> ApiResult<Document> {
    ok(state.service.update_document(&session, &id, patch)?)
}

async fn delete_document(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<Document> {
    ok(state.service.delete_document(&session, &id)?)
}

/// POST /api/documents/:id/move - Move Protocol
async fn move_document(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<MovePayload>,
) -> ApiResult<MoveOutcome> {
    let Some(stage) = payload.stage else {
        return Err(DocketError::validation(
            "stage",
            "target stage is required (null or \"\" to unassign)",
        ));
    };
    let mut request = MoveRequest::new(id, StageTarget::from_wire(stage.as_deref()));
    request.notes = payload.notes;
    ok(state.service.move_document(&session, &request)?)
}

/// GET /api/documents/:id/history - Movement records, oldest first
async fn document_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<MovementRecord>> {
    ok(state.service.document_history(&id)?)
}

// --- stages ------------------------------------------------------------------

async fn list_stages(State(state): State<AppState>) -> ApiResult<Vec<Stage>> {
    ok(state.service.list_stages()?)
}

async fn create_stage(
    State(state): State<AppState>,
    session: Session,
    ApiJson(payload): ApiJson<NewStagePayload>,
) -> Result<(StatusCode, Json<ApiResponse<Stage>>), DocketError> {
    let stage = state
        .service
        .create_stage(&session, &payload.name, payload.order)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(stage))))
}

async fn delete_stage(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<StageRemoval> {
    ok(state.service.delete_stage(&session, &id)?)
}

// --- document types ----------------------------------------------------------

async fn list_document_types(State(state): State<AppState>) -> ApiResult<Vec<DocumentType>> {
    ok(state.service.list_document_types()?)
}

async fn create_document_type(
    State(state): State<AppState>,
    session: Session,
    ApiJson(payload): ApiJson<NamePayload>,
) -> Result<(StatusCode, Json<ApiResponse<DocumentType>>), DocketError> {
    let doc_type = state.service.create_document_type(&session, &payload.name)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(doc_type))))
}

async fn rename_document_type(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<NamePayload>,
) -> ApiResult<DocumentType> {
    ok(state
        .service
        .rename_document_type(&session, &id, &payload.name)?)
}

async fn delete_document_type(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<DocumentType> {
    ok(state.service.delete_document_type(&session, &id)?)
}

// --- audit trail -------------------------------------------------------------

async fn entity_events(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> ApiResult<Vec<Event>> {
    ok(state.service.events_for(&entity_type, &entity_id)?)
}

// ============================================================================
// Router
// ============================================================================

/// Build the `/api` router around a service
pub fn router(service: DocketService) -> Router {
    let state = AppState { service };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/cases", get(list_cases).post(create_case))
        .route("/cases/:id", get(get_case).delete(delete_case))
        .route("/cases/:id/board", get(case_board))
        .route("/cases/:id/timeline.csv", get(case_timeline))
        .route("/contacts", post(create_contact))
        .route("/contacts/:id", get(list_contacts).delete(delete_contact))
        .route("/documents", post(create_document))
        .route("/documents/case/:case_id", get(list_case_documents))
        .route("/documents/:id", axum::routing::put(update_document).delete(delete_document))
        .route("/documents/:id/move", post(move_document))
        .route("/documents/:id/history", get(document_history))
        .route("/document-stages", get(list_stages).post(create_stage))
        .route("/document-stages/:id", axum::routing::delete(delete_stage))
        .route(
            "/document-types",
            get(list_document_types).post(create_document_type),
        )
        .route(
            "/document-types/:id",
            axum::routing::put(rename_document_type).delete(delete_document_type),
        )
        .route("/events/:entity_type/:entity_id", get(entity_events))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================
