use crate::{
    AppState,
    db::UserExt,
    dtos::{
        FilterUserDto, RequestQueryDto, Response, RoleUpdateDto, UserData, UserListResponseDto,
        UserResponseDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, role_check},
    models::UserRole,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use axum_extra::extract::cookie::Cookie;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

/// Router for user management endpoints.
///
/// All routes are protected by the auth middleware (applied in
/// routes.rs); listing and role grants are additionally admin-only.
pub fn users_handler() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/logout", post(logout))
        .route(
            "/",
            get(get_users).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Admin])
            })),
        )
        .route(
            "/{user_id}/role",
            put(update_user_role).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Admin])
            })),
        )
}

/// Current user's profile.
#[instrument(skip(user), fields(user_id = %user.user.id))]
pub async fn get_me(
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let response = UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&user.user),
        },
    };
    tracing::info!("get_me successful");
    Ok(Json(response))
}

/// Clear the access token cookie.
#[instrument(skip(user), fields(user_id = %user.user.id))]
pub async fn logout(
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let expired_cookie = Cookie::build(("access_token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .secure(true)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        expired_cookie
            .to_string()
            .parse()
            .map_err(|_| HttpError::server_error(ErrorMessage::ServerError.to_string()))?,
    );

    let response = Json(Response {
        status: "success",
        message: "Logged out".to_string(),
    });

    let mut response = response.into_response();
    response.headers_mut().extend(headers);
    tracing::info!("Logout successful");
    Ok(response)
}

/// Paginated user listing (admin only). Query params: ?page=1&limit=10
#[instrument(skip(app_state))]
pub async fn get_users(
    Query(query_params): Query<RequestQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate().map_err(|e| {
        tracing::error!("Invalid get_users input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let users = app_state
        .db_client
        .get_users(page as u32, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting users: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let user_count = app_state.db_client.get_user_count().await.map_err(|e| {
        tracing::error!("DB error, getting user count: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let response = UserListResponseDto {
        status: "success".to_string(),
        users: FilterUserDto::filter_users(&users),
        results: user_count,
    };
    tracing::info!("get_users successful");
    Ok(Json(response))
}

/// Grant or revoke a tier (admin only). A premium grant carries the
/// expiry that makes it meaningful; granting without one produces a
/// premium user whose access is already inactive.
#[instrument(skip(app_state, body))]
pub async fn update_user_role(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<RoleUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state
        .db_client
        .update_user_role(user_id, body.role, body.premium_until)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("User not found".to_string()),
            e => {
                tracing::error!("DB error, updating user role: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    let response = UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&user),
        },
    };
    tracing::info!(user_id = %user.id, role = %user.role.to_str(), "update_user_role successful");
    Ok(Json(response))
}
