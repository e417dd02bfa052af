use crate::{
    AppState,
    db::ProgramExt,
    dtos::{
        ProgramCreateDto, ProgramListResponseDto, ProgramResponseDto, ProgramTreeDto,
        ProgramTreeResponseDto, ProgramTreesResponseDto, ProgramUpdateDto, Response,
    },
    error::{ErrorMessage, HttpError},
    middleware::{MaybeUser, auth, maybe_auth, role_check},
    models::UserRole,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

/// Router for the program level of the curriculum.
///
/// Summaries are public. The tree endpoints run behind `maybe_auth`:
/// anonymous callers still get free programs, while premium curricula
/// are gated server-side before serialization. Authoring is admin-only.
pub fn programs_handler(app_state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(get_programs))
        .route("/{program_id}", get(get_program))
        .route(
            "/trees",
            get(get_program_trees).layer(middleware::from_fn_with_state(
                app_state.clone(),
                maybe_auth,
            )),
        )
        .route(
            "/{program_id}/tree",
            get(get_program_tree).layer(middleware::from_fn_with_state(
                app_state.clone(),
                maybe_auth,
            )),
        );

    let admin = Router::new()
        .route("/", post(create_program))
        .route("/{program_id}", put(update_program).delete(delete_program))
        .layer(middleware::from_fn(|req, next| {
            role_check(req, next, vec![UserRole::Admin])
        }))
        .layer(middleware::from_fn_with_state(app_state, auth));

    public.merge(admin)
}

/// Public program catalog: summaries only, no curriculum and no gating.
#[instrument(skip(app_state))]
pub async fn get_programs(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let programs = app_state.db_client.get_programs().await.map_err(|e| {
        tracing::error!("DB error, getting programs: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let response = ProgramListResponseDto {
        status: "success".to_string(),
        results: programs.len(),
        data: programs,
    };
    Ok(Json(response))
}

#[instrument(skip(app_state))]
pub async fn get_program(
    State(app_state): State<AppState>,
    Path(program_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let program = app_state
        .db_client
        .get_program(program_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting program: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Program not found".to_string()))?;

    let response = ProgramResponseDto {
        status: "success".to_string(),
        data: program,
    };
    Ok(Json(response))
}

/// Dashboard listing: every program, with the curriculum attached only
/// where the caller has access. Inaccessible premium programs come
/// back as locked summaries, never a 403.
#[instrument(skip(app_state, maybe_user))]
pub async fn get_program_trees(
    State(app_state): State<AppState>,
    Extension(maybe_user): Extension<MaybeUser>,
) -> Result<impl IntoResponse, HttpError> {
    let trees = app_state
        .db_client
        .get_all_program_trees()
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting program trees: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let user = maybe_user.0.as_ref();
    let data = trees
        .into_iter()
        .map(|tree| {
            if tree.program.grants_access(user) {
                ProgramTreeDto::unlocked(tree)
            } else {
                ProgramTreeDto::locked(tree.program)
            }
        })
        .collect::<Vec<_>>();

    let response = ProgramTreesResponseDto {
        status: "success".to_string(),
        data,
    };
    Ok(Json(response))
}

/// Full curriculum of one program. 403 when the program is premium and
/// the caller holds no active premium access.
#[instrument(skip(app_state, maybe_user))]
pub async fn get_program_tree(
    State(app_state): State<AppState>,
    Extension(maybe_user): Extension<MaybeUser>,
    Path(program_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let tree = app_state
        .db_client
        .get_program_tree(program_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting program tree: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Program not found".to_string()))?;

    if !tree.program.grants_access(maybe_user.0.as_ref()) {
        return Err(HttpError::forbidden(
            ErrorMessage::PremiumRequired.to_string(),
        ));
    }

    let response = ProgramTreeResponseDto {
        status: "success".to_string(),
        data: ProgramTreeDto::unlocked(tree),
    };
    Ok(Json(response))
}

#[instrument(skip(app_state, body), fields(slug = %body.slug))]
pub async fn create_program(
    State(app_state): State<AppState>,
    Json(body): Json<ProgramCreateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_program input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let program = app_state
        .db_client
        .save_program(
            &body.title,
            &body.slug,
            &body.description,
            body.kind,
            body.order,
        )
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                HttpError::unique_constraint_violation(
                    "A program with this slug already exists".to_string(),
                )
            }
            e => {
                tracing::error!("DB error, saving program: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(program_id = %program.id, "create_program successful");
    let response = ProgramResponseDto {
        status: "success".to_string(),
        data: program,
    };
    Ok(Json(response))
}

#[instrument(skip(app_state, body))]
pub async fn update_program(
    State(app_state): State<AppState>,
    Path(program_id): Path<Uuid>,
    Json(body): Json<ProgramUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_program input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let program = app_state
        .db_client
        .update_program(
            program_id,
            body.title.as_deref(),
            body.slug.as_deref(),
            body.description.as_deref(),
            body.kind,
            body.order,
        )
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Program not found".to_string()),
            e => {
                tracing::error!("DB error, updating program: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(program_id = %program.id, "update_program successful");
    let response = ProgramResponseDto {
        status: "success".to_string(),
        data: program,
    };
    Ok(Json(response))
}

/// Deletes the program and its whole subtree in one transaction.
#[instrument(skip(app_state))]
pub async fn delete_program(
    State(app_state): State<AppState>,
    Path(program_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_program(program_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Program not found".to_string()),
            e => {
                tracing::error!("DB error, deleting program: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(%program_id, "delete_program successful");
    Ok(Json(Response {
        status: "success",
        message: "Program and its curriculum deleted".to_string(),
    }))
}
