// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, enrollment, exams, profile, results, review},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, student_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, profile, exams, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (record store + config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    // Any authenticated user manages their own account.
    let profile_routes = Router::new()
        .route("/", get(profile::get_profile).put(profile::update_profile))
        .route("/password", put(profile::change_password))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let exam_routes = Router::new()
        .route("/", get(exams::list_exams))
        .route("/{id}", get(exams::exam_session))
        .route("/{id}/request", post(enrollment::request_exam))
        .route("/{id}/submit", post(exams::submit_exam))
        // Double middleware protection: Auth first, then role check
        .layer(middleware::from_fn_with_state(
            state.clone(),
            student_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/staff", post(admin::register_staff))
        .route("/exams", get(admin::list_exams).post(admin::create_exam))
        .route(
            "/exams/{id}",
            get(admin::get_exam)
                .put(admin::update_exam)
                .delete(admin::delete_exam),
        )
        .route("/exams/{id}/questions", post(admin::upsert_question))
        .route(
            "/exams/{id}/questions/{index}",
            delete(admin::remove_question),
        )
        .route("/enrollments", get(enrollment::list_enrollments))
        .route("/enrollments/{id}/status", put(enrollment::set_status))
        .route("/enrollments/{id}", delete(enrollment::delete_request))
        .route("/review", get(review::list_pending))
        .route("/review/conflicts", get(review::list_conflicts))
        .route("/review/{id}/finalize", post(review::finalize))
        .route("/results", get(results::list_results))
        .route(
            "/results/{id}",
            get(results::result_details).delete(results::delete_result),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
