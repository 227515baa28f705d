// src/routes.rs

use axum::{
    Extension, Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, contribution, files, groups, quiz, quiz_set},
    models::session::AppVariant,
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Routes shared by both quiz applications. The variant reaches handlers as an
/// `Extension<AppVariant>`.
fn variant_routes(state: &AppState, variant: AppVariant) -> Router<AppState> {
    let mut protected = Router::new()
        .route("/quiz/create", post(quiz::create_quiz))
        .route("/quiz/save", post(quiz::save_quiz))
        .route("/quiz/list", get(quiz::list_own))
        .route("/quiz/qr/scan", post(contribution::scan))
        .route("/quiz/attempt", post(contribution::attempt));

    if variant.uses_next_location() {
        protected = protected.route("/quiz/{id}/next-location", put(quiz::set_next_location));
    }

    Router::new()
        .route("/quiz/qr/{id}", get(quiz::get_by_qr))
        .route("/ranking", get(contribution::ranking))
        .merge(protected.layer(middleware::from_fn_with_state(state.clone(), auth_middleware)))
        .layer(Extension(variant))
}

/// Assembles the main application router.
///
/// * Nests auth, per-variant quiz, legacy quiz-set, file and admin routers.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, AI generator).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::RANGE]);

    let auth_routes = Router::new()
        .route("/user/signup", post(auth::signup))
        .route("/user/login", post(auth::login))
        .route("/admin/login", post(auth::admin_login))
        .merge(
            Router::new()
                .route("/user/check", get(auth::check).post(auth::check))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let admin_routes = Router::new()
        .route("/teams", get(admin::list_teams))
        .route("/teams/{id}", put(admin::update_team))
        .route("/groups", post(groups::create_group))
        .route("/questions", get(admin::list_questions))
        .route("/quiz-sets", post(quiz_set::create_quiz_set))
        .route("/quiz-sets/{id}", get(quiz_set::admin_get_quiz_set))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let mut app = Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .route("/api/groups", get(groups::list_groups))
        .route("/api/quiz-sets", get(quiz_set::list_quiz_sets))
        .route("/api/quiz-sets/{id}", get(quiz_set::get_quiz_set))
        .route("/api/file_serving", get(files::serve_file));

    for variant in AppVariant::ALL {
        app = app.nest(&format!("/api/{}", variant.as_str()), variant_routes(&state, variant));
    }

    app
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
