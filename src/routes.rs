use axum::{Router, middleware};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    AppState,
    handler::{
        auth::auth_handler, contents::contents_handler, programs::programs_handler,
        progress::progress_handler, topics::topics_handler, units::units_handler,
        users::users_handler,
    },
    middleware::auth,
};

pub fn create_router(app_state: AppState) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest(
            "/users",
            users_handler().layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .nest("/programs", programs_handler(app_state.clone()))
        .nest("/units", units_handler(app_state.clone()))
        .nest("/topics", topics_handler(app_state.clone()))
        .nest("/contents", contents_handler(app_state.clone()))
        .nest(
            "/progress",
            progress_handler().layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state.clone());

    Router::new()
        .nest("/api", api_route)
        .nest_service("/uploads", ServeDir::new(&app_state.env.upload_dir))
}
