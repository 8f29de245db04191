//! Handlers HTTP (§6.1). Cada handler autentica (extractor `Principal`),
//! verifica propiedad de sesión contra el `owner_subject` del principal, y
//! traduce el resultado del store/dispatcher a la envoltura JSON descrita
//! por la tabla de endpoints. Ningún handler ejecuta trabajo de IA o de red
//! en el propio proceso de la petición: `*_start` sólo despacha.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use mediaflow_core::model::job::{
    DescriptionHistoryEntry, DescriptionJob, DownloadJob, EnhancementJob, FeedbackEntry, JobPayload, JobStatus, PublishJob,
    SelectionJob, TriageJob,
};
use mediaflow_core::{Session, Step};
use mediaflow_dispatch::DispatchKind;
use mediaflow_processors::post_group::build_post_group;

use crate::auth::Principal;
use crate::error::ApiError;
use crate::state::AppState;

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub trip_context: Option<String>,
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Principal(subject): Principal,
    Json(body): Json<CreateSessionRequest>,
) -> Result<Json<Value>, ApiError> {
    let session = Session::new(new_id(), subject, body.trip_context, now());
    state.store.put_session(&session, now()).await?;
    Ok(Json(json!({ "id": session.id })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateRequest {
    pub from_step: Step,
}

pub async fn invalidate(
    State(state): State<Arc<AppState>>,
    Principal(subject): Principal,
    Path(session_id): Path<String>,
    Json(body): Json<InvalidateRequest>,
) -> Result<Json<Value>, ApiError> {
    state.store.get_session_for_owner(&session_id, &subject).await?;
    let deleted = state.store.invalidate_downstream(&session_id, body.from_step).await?;
    Ok(Json(json!({ "deletedSortKeys": deleted })))
}

// ---------------------------------------------------------------------------
// Grouping (synchronous, no dispatcher involved — see post_group.rs)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub session_id: String,
    pub name: String,
    pub media_keys: Vec<String>,
}

pub async fn create_group(
    State(state): State<Arc<AppState>>,
    Principal(subject): Principal,
    Json(body): Json<CreateGroupRequest>,
) -> Result<Json<Value>, ApiError> {
    state.store.get_session_for_owner(&body.session_id, &subject).await?;
    let group = build_post_group(new_id(), body.name, body.media_keys)?;
    let id = group.id.clone();
    state.store.put_post_group(&body.session_id, &group, now()).await?;
    Ok(Json(json!({ "id": id })))
}

// ---------------------------------------------------------------------------
// Start endpoints (§4.4 dispatch table)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOnlyRequest {
    pub session_id: String,
}

pub async fn start_triage(
    State(state): State<Arc<AppState>>,
    Principal(subject): Principal,
    Json(body): Json<SessionOnlyRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let session = state.store.get_session_for_owner(&body.session_id, &subject).await?;
    let total_files = session.uploaded_keys.map(|k| k.len()).unwrap_or(0);
    let id = state
        .dispatcher
        .dispatch(&body.session_id, DispatchKind::Triage, |id| JobPayload::Triage(TriageJob::pending(id, total_files)), now())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "id": id }))))
}

pub async fn start_selection(
    State(state): State<Arc<AppState>>,
    Principal(subject): Principal,
    Json(body): Json<SessionOnlyRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state.store.get_session_for_owner(&body.session_id, &subject).await?;
    let id = state
        .dispatcher
        .dispatch(&body.session_id, DispatchKind::Selection, |id| JobPayload::Selection(SelectionJob::pending(id)), now())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "id": id }))))
}

pub async fn start_enhancement(
    State(state): State<Arc<AppState>>,
    Principal(subject): Principal,
    Json(body): Json<SessionOnlyRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let session = state.store.get_session_for_owner(&body.session_id, &subject).await?;
    let total_count = session.uploaded_keys.map(|k| k.len()).unwrap_or(0);
    let id = state
        .dispatcher
        .dispatch(
            &body.session_id,
            DispatchKind::EnhancementStart,
            |id| JobPayload::Enhancement(EnhancementJob::pending(id, total_count)),
            now(),
        )
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "id": id }))))
}

pub async fn start_download(
    State(state): State<Arc<AppState>>,
    Principal(subject): Principal,
    Json(body): Json<SessionOnlyRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state.store.get_session_for_owner(&body.session_id, &subject).await?;
    let id = state
        .dispatcher
        .dispatch(&body.session_id, DispatchKind::Download, |id| JobPayload::Download(DownloadJob::pending(id)), now())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "id": id }))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDescriptionRequest {
    pub session_id: String,
    pub media_keys: Vec<String>,
}

pub async fn start_description(
    State(state): State<Arc<AppState>>,
    Principal(subject): Principal,
    Json(body): Json<StartDescriptionRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state.store.get_session_for_owner(&body.session_id, &subject).await?;
    let id = state
        .dispatcher
        .dispatch(
            &body.session_id,
            DispatchKind::Description,
            |id| JobPayload::Description(DescriptionJob::pending(id, body.media_keys)),
            now(),
        )
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "id": id }))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPublishRequest {
    pub session_id: String,
    pub group_id: String,
}

pub async fn start_publish(
    State(state): State<Arc<AppState>>,
    Principal(subject): Principal,
    Json(body): Json<StartPublishRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state.store.get_session_for_owner(&body.session_id, &subject).await?;
    let groups = state.store.get_post_groups(&body.session_id).await?;
    let group = groups
        .into_iter()
        .find(|g| g.id == body.group_id)
        .ok_or_else(|| ApiError::not_found(format!("group {} not found", body.group_id)))?;
    let total_items = group.media_keys.len();
    let id = state
        .dispatcher
        .dispatch(
            &body.session_id,
            DispatchKind::Publish,
            |id| JobPayload::Publish(PublishJob::pending(id, body.group_id.clone(), total_items)),
            now(),
        )
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "id": id }))))
}

// ---------------------------------------------------------------------------
// Completion polling (C6, §4.6)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

pub async fn results(
    State(state): State<Arc<AppState>>,
    Principal(subject): Principal,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<Value>, ApiError> {
    state.store.get_session_for_owner(&query.session_id, &subject).await?;

    let payload = match kind.as_str() {
        "triage" => JobPayload::Triage(state.store.get_triage_job(&query.session_id, &id).await?),
        "selection" => JobPayload::Selection(state.store.get_selection_job(&query.session_id, &id).await?),
        "enhancement" => JobPayload::Enhancement(state.store.get_enhancement_job(&query.session_id, &id).await?),
        "download" => JobPayload::Download(state.store.get_download_job(&query.session_id, &id).await?),
        "description" => JobPayload::Description(state.store.get_description_job(&query.session_id, &id).await?),
        "publish" => JobPayload::Publish(state.store.get_publish_job(&query.session_id, &id).await?),
        other => return Err(ApiError::validation(format!("unknown job kind: {other}"))),
    };

    Ok(Json(serde_json::to_value(&payload)?))
}

// ---------------------------------------------------------------------------
// Feedback (description, enhancement) — redispatch preserving the job id
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionFeedbackRequest {
    pub session_id: String,
    pub feedback: String,
}

pub async fn description_feedback(
    State(state): State<Arc<AppState>>,
    Principal(subject): Principal,
    Path(id): Path<String>,
    Json(body): Json<DescriptionFeedbackRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state.store.get_session_for_owner(&body.session_id, &subject).await?;
    let mut job = state.store.get_description_job(&body.session_id, &id).await?;
    job.history.push(DescriptionHistoryEntry { user_feedback: body.feedback, model_response: String::new(), at: now() });
    job.status = JobStatus::Pending;
    state
        .dispatcher
        .redispatch(&body.session_id, DispatchKind::Description, JobPayload::Description(job), now())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "pending" }))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementFeedbackRequest {
    pub session_id: String,
    pub filename: String,
    pub feedback: String,
}

pub async fn enhancement_feedback(
    State(state): State<Arc<AppState>>,
    Principal(subject): Principal,
    Path(id): Path<String>,
    Json(body): Json<EnhancementFeedbackRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state.store.get_session_for_owner(&body.session_id, &subject).await?;
    let mut job = state.store.get_enhancement_job(&body.session_id, &id).await?;
    let item = job
        .items
        .iter_mut()
        .find(|item| item.filename == body.filename)
        .ok_or_else(|| ApiError::not_found(format!("no enhancement item for {}", body.filename)))?;
    item.feedback_history.push(FeedbackEntry { requested_at: now(), user_feedback: body.feedback });
    item.phase = mediaflow_core::model::job::EnhancementPhase::Editing;
    job.status = JobStatus::Pending;
    state
        .dispatcher
        .redispatch(&body.session_id, DispatchKind::EnhancementFeedback, JobPayload::Enhancement(job), now())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "pending" }))))
}

// ---------------------------------------------------------------------------
// Confirm (triage deletion side effect, §6.1)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub session_id: String,
}

pub async fn confirm_triage(
    State(state): State<Arc<AppState>>,
    Principal(subject): Principal,
    Path(id): Path<String>,
    Json(body): Json<ConfirmRequest>,
) -> Result<Json<Value>, ApiError> {
    state.store.get_session_for_owner(&body.session_id, &subject).await?;
    let job = state.store.get_triage_job(&body.session_id, &id).await?;

    let mut deleted = Vec::with_capacity(job.discard.len());
    for item in &job.discard {
        if let Err(e) = state.blobs.delete(&item.blob_key).await {
            log::warn!("confirm triage {id}: failed to delete discarded blob {}: {e}", item.blob_key);
            continue;
        }
        deleted.push(item.blob_key.clone());
    }

    Ok(Json(json!({ "deleted": deleted })))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    #[serde(rename = "buildTime")]
    pub build_time: String,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", version: state.app_version.clone(), build_time: state.build_time.clone() })
}
