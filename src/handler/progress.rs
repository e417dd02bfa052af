use crate::{
    AppState,
    db::{ContentExt, ProgramExt, ProgressExt},
    dtos::{CompletionInputDto, CompletionListResponseDto, Response},
    error::{ErrorMessage, HttpError},
    middleware::JWTAuthMiddleware,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::instrument;
use uuid::Uuid;

/// Router for per-user progress. Auth is applied at the nest in
/// routes.rs; every record is scoped to the authenticated user.
pub fn progress_handler() -> Router<AppState> {
    Router::new()
        .route("/{program_id}", get(get_completions))
        .route("/complete", post(mark_complete))
}

/// All completion records of the current user within one program.
#[instrument(skip(app_state, user), fields(user_id = %user.user.id))]
pub async fn get_completions(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(program_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let completions = app_state
        .db_client
        .get_completions(user.user.id, program_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting completions: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = CompletionListResponseDto {
        status: "success".to_string(),
        results: completions.len(),
        data: completions,
    };
    Ok(Json(response))
}

/// Record a completion for the current user. Append-only: completing
/// the same content again adds another record. The submitted ancestor
/// ids must agree with the stored content; the record itself is built
/// from the stored ids.
#[instrument(skip(app_state, user, body), fields(user_id = %user.user.id))]
pub async fn mark_complete(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<CompletionInputDto>,
) -> Result<impl IntoResponse, HttpError> {
    let content = app_state
        .db_client
        .get_content(body.content_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting content: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Content not found".to_string()))?;

    if content.topic_id != body.topic_id
        || content.unit_id != body.unit_id
        || content.program_id != body.program_id
    {
        return Err(HttpError::bad_request(
            "Ancestor ids do not match the content record".to_string(),
        ));
    }

    let program = app_state
        .db_client
        .get_program(content.program_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting program: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Program not found".to_string()))?;

    if !program.grants_access(Some(&user.user)) {
        return Err(HttpError::forbidden(
            ErrorMessage::PremiumRequired.to_string(),
        ));
    }

    app_state
        .db_client
        .mark_complete(
            user.user.id,
            content.id,
            content.topic_id,
            content.unit_id,
            content.program_id,
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, marking completion: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(content_id = %content.id, "mark_complete successful");
    Ok((
        StatusCode::CREATED,
        Json(Response {
            status: "success",
            message: "Completion recorded".to_string(),
        }),
    ))
}
