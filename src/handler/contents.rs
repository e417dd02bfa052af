use crate::{
    AppState,
    db::{ContentExt, ProgramExt, ProgressExt, TopicExt},
    dtos::{
        ContentCreateDto, ContentListResponseDto, ContentResponseDto, ContentUpdateDto,
        ContentsQueryDto, QuizAttemptDto, QuizAttemptResponseDto, Response, UploadResponse,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, MaybeUser, auth, maybe_auth, role_check},
    models::{Content, ContentKind, User, UserRole},
    quiz::{Advance, QuizSession},
};
use axum::{
    Extension, Json, Router,
    extract::{Multipart, Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

/// Router for the content level: gated delivery, quiz attempts, and
/// the admin authoring surface including PDF upload.
pub fn contents_handler(app_state: AppState) -> Router<AppState> {
    let delivery = Router::new()
        .route("/", get(get_contents))
        .route("/{content_id}", get(get_content))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            maybe_auth,
        ));

    let attempts = Router::new()
        .route("/{content_id}/quiz/attempt", post(attempt_quiz))
        .layer(middleware::from_fn_with_state(app_state.clone(), auth));

    let admin = Router::new()
        .route("/", post(create_content))
        .route("/{content_id}", put(update_content).delete(delete_content))
        .route("/{content_id}/pdf", post(upload_pdf))
        .layer(middleware::from_fn(|req, next| {
            role_check(req, next, vec![UserRole::Admin])
        }))
        .layer(middleware::from_fn_with_state(app_state, auth));

    delivery.merge(attempts).merge(admin)
}

/// The premium gate for content delivery: resolves the owning program
/// and rejects with 403 before any gated payload leaves the server.
async fn check_program_access(
    app_state: &AppState,
    program_id: Uuid,
    user: Option<&User>,
) -> Result<(), HttpError> {
    let program = app_state
        .db_client
        .get_program(program_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting program: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Program not found".to_string()))?;

    if !program.grants_access(user) {
        return Err(HttpError::forbidden(
            ErrorMessage::PremiumRequired.to_string(),
        ));
    }

    Ok(())
}

/// Contents of one topic: ?topicId=... Premium programs require an
/// active subscription.
#[instrument(skip(app_state, maybe_user))]
pub async fn get_contents(
    Query(query): Query<ContentsQueryDto>,
    State(app_state): State<AppState>,
    Extension(maybe_user): Extension<MaybeUser>,
) -> Result<impl IntoResponse, HttpError> {
    let topic = app_state
        .db_client
        .get_topic(query.topic_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting topic: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Topic not found".to_string()))?;

    check_program_access(&app_state, topic.program_id, maybe_user.0.as_ref()).await?;

    let contents = app_state
        .db_client
        .get_contents(query.topic_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting contents: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = ContentListResponseDto {
        status: "success".to_string(),
        results: contents.len(),
        data: contents,
    };
    Ok(Json(response))
}

#[instrument(skip(app_state, maybe_user))]
pub async fn get_content(
    State(app_state): State<AppState>,
    Extension(maybe_user): Extension<MaybeUser>,
    Path(content_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let content = fetch_content(&app_state, content_id).await?;

    check_program_access(&app_state, content.program_id, maybe_user.0.as_ref()).await?;

    let response = ContentResponseDto {
        status: "success".to_string(),
        data: content,
    };
    Ok(Json(response))
}

async fn fetch_content(app_state: &AppState, content_id: Uuid) -> Result<Content, HttpError> {
    app_state
        .db_client
        .get_content(content_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting content: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Content not found".to_string()))
}

/// Replay a full quiz run server-side: one answer label per question,
/// in question order. Scoring and the at-most-once completion signal
/// follow the same state machine the client runs.
#[instrument(skip(app_state, user, body), fields(user_id = %user.user.id))]
pub async fn attempt_quiz(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(content_id): Path<Uuid>,
    Json(body): Json<QuizAttemptDto>,
) -> Result<impl IntoResponse, HttpError> {
    let content = fetch_content(&app_state, content_id).await?;

    check_program_access(&app_state, content.program_id, Some(&user.user)).await?;

    let questions = content
        .payload
        .questions()
        .ok_or_else(|| HttpError::bad_request("This content is not a quiz".to_string()))?;

    let already_completed = app_state
        .db_client
        .has_completed(user.user.id, content_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking completion: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let mut session = QuizSession::new(questions.to_vec(), already_completed)
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    if body.answers.len() != session.total_questions() {
        return Err(HttpError::bad_request(format!(
            "Expected {} answers, got {}",
            session.total_questions(),
            body.answers.len()
        )));
    }

    let mut outcome = Advance::Finished {
        emit_completion: false,
    };
    for answer in &body.answers {
        // A blank answer counts as unanswered, same as in the client.
        if !answer.trim().is_empty() {
            session.select_option(answer.clone());
        }
        outcome = session.advance().map_err(|e| {
            let position = session.current_index().map(|i| i + 1).unwrap_or_default();
            HttpError::bad_request(format!("Question {position}: {e}"))
        })?;
    }

    debug_assert!(session.is_finished());

    let emit_completion = matches!(
        outcome,
        Advance::Finished {
            emit_completion: true
        }
    );

    if emit_completion {
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
    }

    let score = session.score();
    tracing::info!(
        content_id = %content.id,
        percent = score.percent,
        completion_recorded = emit_completion,
        "attempt_quiz successful"
    );
    Ok(Json(QuizAttemptResponseDto {
        status: "success".to_string(),
        correct: score.correct,
        total: score.total,
        percent: score.percent,
        completion_recorded: emit_completion,
    }))
}

/// Creates a content record (admin). The payload fields are validated
/// against the declared kind, and the submitted ancestor ids must
/// match the parent topic.
#[instrument(skip(app_state, body), fields(title = %body.title))]
pub async fn create_content(
    State(app_state): State<AppState>,
    Json(body): Json<ContentCreateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_content input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let (title, order, topic_id, unit_id, program_id, payload) = body
        .into_payload()
        .map_err(HttpError::bad_request)?;

    let topic = app_state
        .db_client
        .get_topic(topic_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting topic: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::bad_request("Parent topic does not exist".to_string()))?;

    if topic.unit_id != unit_id || topic.program_id != program_id {
        return Err(HttpError::bad_request(
            "unitId/programId do not match the parent topic".to_string(),
        ));
    }

    let content = app_state
        .db_client
        .save_content(topic_id, unit_id, program_id, &title, order, &payload)
        .await
        .map_err(|e| {
            tracing::error!("DB error, saving content: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(content_id = %content.id, "create_content successful");
    let response = ContentResponseDto {
        status: "success".to_string(),
        data: content,
    };
    Ok(Json(response))
}

/// Partial update (admin). Submitted payload fields are merged over
/// the stored record and the result re-validated, so a kind change
/// must arrive with a payload consistent for the new kind.
#[instrument(skip(app_state, body))]
pub async fn update_content(
    State(app_state): State<AppState>,
    Path(content_id): Path<Uuid>,
    Json(body): Json<ContentUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_content input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let existing = fetch_content(&app_state, content_id).await?;

    let payload = body
        .merged_payload(&existing.payload)
        .map_err(HttpError::bad_request)?;

    let content = app_state
        .db_client
        .update_content(content_id, body.title.as_deref(), body.order, &payload)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating content: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(content_id = %content.id, "update_content successful");
    let response = ContentResponseDto {
        status: "success".to_string(),
        data: content,
    };
    Ok(Json(response))
}

#[instrument(skip(app_state))]
pub async fn delete_content(
    State(app_state): State<AppState>,
    Path(content_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_content(content_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Content not found".to_string()),
            e => {
                tracing::error!("DB error, deleting content: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(%content_id, "delete_content successful");
    Ok(Json(Response {
        status: "success",
        message: "Content deleted".to_string(),
    }))
}

/// Multipart PDF upload (admin). Stores the file under the upload root
/// and attaches its public URL to the pdf-kind record.
#[instrument(skip(app_state, multipart))]
pub async fn upload_pdf(
    State(app_state): State<AppState>,
    Path(content_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let content = fetch_content(&app_state, content_id).await?;

    if content.payload.kind() != ContentKind::Pdf {
        return Err(HttpError::bad_request(
            "Only pdf contents accept file uploads".to_string(),
        ));
    }

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Multipart error: {}", e);
        HttpError::bad_request("Malformed multipart body".to_string())
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(sanitize_file_name)
            .unwrap_or_else(|| "upload.pdf".to_string());
        let bytes = field.bytes().await.map_err(|e| {
            tracing::error!("Multipart read error: {}", e);
            HttpError::bad_request("Malformed multipart body".to_string())
        })?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| HttpError::bad_request("Missing 'file' field".to_string()))?;

    if bytes.is_empty() {
        return Err(HttpError::bad_request("Uploaded file is empty".to_string()));
    }

    let key = format!("contents/{}/{}", content_id, file_name);
    let url = app_state.storage.put(&key, &bytes).await.map_err(|e| {
        tracing::error!("Storage error, writing upload: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    app_state
        .db_client
        .set_pdf_url(content_id, &url)
        .await
        .map_err(|e| {
            tracing::error!("DB error, setting pdf url: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(%content_id, %url, "upload_pdf successful");
    Ok(Json(UploadResponse { location: url }))
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    if cleaned.trim_matches(['_', '.']).is_empty() {
        "upload.pdf".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("notes v2.pdf"), "notes_v2.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("///"), "upload.pdf");
    }
}
