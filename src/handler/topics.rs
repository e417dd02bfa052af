use crate::{
    AppState,
    db::{TopicExt, UnitExt},
    dtos::{
        Response, TopicCreateDto, TopicListResponseDto, TopicResponseDto, TopicUpdateDto,
        TopicsQueryDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{auth, role_check},
    models::UserRole,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

/// Router for the topic level; same shape as the unit router.
pub fn topics_handler(app_state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(get_topics))
        .route("/{topic_id}", get(get_topic));

    let admin = Router::new()
        .route("/", post(create_topic))
        .route("/{topic_id}", put(update_topic).delete(delete_topic))
        .layer(middleware::from_fn(|req, next| {
            role_check(req, next, vec![UserRole::Admin])
        }))
        .layer(middleware::from_fn_with_state(app_state, auth));

    public.merge(admin)
}

/// Topics of one unit: ?unitId=...
#[instrument(skip(app_state))]
pub async fn get_topics(
    Query(query): Query<TopicsQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let topics = app_state
        .db_client
        .get_topics(query.unit_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting topics: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = TopicListResponseDto {
        status: "success".to_string(),
        results: topics.len(),
        data: topics,
    };
    Ok(Json(response))
}

#[instrument(skip(app_state))]
pub async fn get_topic(
    State(app_state): State<AppState>,
    Path(topic_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let topic = app_state
        .db_client
        .get_topic(topic_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting topic: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Topic not found".to_string()))?;

    let response = TopicResponseDto {
        status: "success".to_string(),
        data: topic,
    };
    Ok(Json(response))
}

/// Creates a topic under an existing unit. The submitted `programId`
/// must match the parent unit's program; the denormalized ancestor
/// reference is never allowed to drift.
#[instrument(skip(app_state, body), fields(slug = %body.slug))]
pub async fn create_topic(
    State(app_state): State<AppState>,
    Json(body): Json<TopicCreateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_topic input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let unit = app_state
        .db_client
        .get_unit(body.unit_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting unit: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::bad_request("Parent unit does not exist".to_string()))?;

    if unit.program_id != body.program_id {
        return Err(HttpError::bad_request(
            "programId does not match the parent unit's program".to_string(),
        ));
    }

    let topic = app_state
        .db_client
        .save_topic(
            body.unit_id,
            body.program_id,
            &body.title,
            &body.slug,
            &body.description,
            body.order,
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, saving topic: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(topic_id = %topic.id, "create_topic successful");
    let response = TopicResponseDto {
        status: "success".to_string(),
        data: topic,
    };
    Ok(Json(response))
}

/// Partial update; parent unit and program are fixed at creation.
#[instrument(skip(app_state, body))]
pub async fn update_topic(
    State(app_state): State<AppState>,
    Path(topic_id): Path<Uuid>,
    Json(body): Json<TopicUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_topic input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let topic = app_state
        .db_client
        .update_topic(
            topic_id,
            body.title.as_deref(),
            body.slug.as_deref(),
            body.description.as_deref(),
            body.order,
        )
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Topic not found".to_string()),
            e => {
                tracing::error!("DB error, updating topic: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(topic_id = %topic.id, "update_topic successful");
    let response = TopicResponseDto {
        status: "success".to_string(),
        data: topic,
    };
    Ok(Json(response))
}

/// Deletes the topic together with its contents in one transaction.
#[instrument(skip(app_state))]
pub async fn delete_topic(
    State(app_state): State<AppState>,
    Path(topic_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_topic(topic_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Topic not found".to_string()),
            e => {
                tracing::error!("DB error, deleting topic: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(%topic_id, "delete_topic successful");
    Ok(Json(Response {
        status: "success",
        message: "Topic and its contents deleted".to_string(),
    }))
}
