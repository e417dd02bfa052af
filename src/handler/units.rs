use crate::{
    AppState,
    db::{ProgramExt, UnitExt},
    dtos::{
        Response, UnitCreateDto, UnitListResponseDto, UnitResponseDto, UnitUpdateDto,
        UnitsQueryDto,
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

/// Router for the unit level. Reads are public (the premium gate sits
/// on content delivery, not on structure); authoring is admin-only.
pub fn units_handler(app_state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(get_units))
        .route("/{unit_id}", get(get_unit));

    let admin = Router::new()
        .route("/", post(create_unit))
        .route("/{unit_id}", put(update_unit).delete(delete_unit))
        .layer(middleware::from_fn(|req, next| {
            role_check(req, next, vec![UserRole::Admin])
        }))
        .layer(middleware::from_fn_with_state(app_state, auth));

    public.merge(admin)
}

/// Units of one program: ?programId=...
#[instrument(skip(app_state))]
pub async fn get_units(
    Query(query): Query<UnitsQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let units = app_state
        .db_client
        .get_units(query.program_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting units: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = UnitListResponseDto {
        status: "success".to_string(),
        results: units.len(),
        data: units,
    };
    Ok(Json(response))
}

#[instrument(skip(app_state))]
pub async fn get_unit(
    State(app_state): State<AppState>,
    Path(unit_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let unit = app_state
        .db_client
        .get_unit(unit_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting unit: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Unit not found".to_string()))?;

    let response = UnitResponseDto {
        status: "success".to_string(),
        data: unit,
    };
    Ok(Json(response))
}

/// Creates a unit under an existing program; a dangling parent id is a
/// validation error, not a server error.
#[instrument(skip(app_state, body), fields(slug = %body.slug))]
pub async fn create_unit(
    State(app_state): State<AppState>,
    Json(body): Json<UnitCreateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_unit input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    app_state
        .db_client
        .get_program(body.program_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting program: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::bad_request("Parent program does not exist".to_string()))?;

    let unit = app_state
        .db_client
        .save_unit(
            body.program_id,
            &body.title,
            &body.slug,
            &body.description,
            body.order,
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, saving unit: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(unit_id = %unit.id, "create_unit successful");
    let response = UnitResponseDto {
        status: "success".to_string(),
        data: unit,
    };
    Ok(Json(response))
}

/// Partial update. The parent program is fixed at creation; moving a
/// unit between programs is not supported.
#[instrument(skip(app_state, body))]
pub async fn update_unit(
    State(app_state): State<AppState>,
    Path(unit_id): Path<Uuid>,
    Json(body): Json<UnitUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_unit input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let unit = app_state
        .db_client
        .update_unit(
            unit_id,
            body.title.as_deref(),
            body.slug.as_deref(),
            body.description.as_deref(),
            body.order,
        )
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Unit not found".to_string()),
            e => {
                tracing::error!("DB error, updating unit: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(unit_id = %unit.id, "update_unit successful");
    let response = UnitResponseDto {
        status: "success".to_string(),
        data: unit,
    };
    Ok(Json(response))
}

/// Deletes the unit with its topics and contents in one transaction.
#[instrument(skip(app_state))]
pub async fn delete_unit(
    State(app_state): State<AppState>,
    Path(unit_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_unit(unit_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Unit not found".to_string()),
            e => {
                tracing::error!("DB error, deleting unit: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(%unit_id, "delete_unit successful");
    Ok(Json(Response {
        status: "success",
        message: "Unit and its topics deleted".to_string(),
    }))
}
