use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod auth;
mod companies;
mod health;
mod invitations;
mod jobs;
mod questions;
mod users;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth routes
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        // Companies
        .route(
            "/companies",
            post(companies::create_company).get(companies::list_companies),
        )
        .route(
            "/companies/:id",
            get(companies::get_company)
                .patch(companies::update_company)
                .delete(companies::delete_company),
        )
        .route(
            "/companies/:id/address",
            put(companies::upsert_address).delete(companies::delete_address),
        )
        .route("/companies/:id/users", get(users::list_company_users))
        .route(
            "/companies/:id/invitations",
            post(invitations::create_invitation).get(invitations::list_invitations),
        )
        .route("/companies/:id/jobs", post(jobs::create_job))
        .route("/companies/:id/jobs/stats", get(jobs::job_stats))
        // Users
        .route("/users/:id", delete(users::delete_user))
        .route("/users/:id/active", patch(users::set_user_active))
        // Invitations
        .route("/invitations/accept", post(invitations::accept_invitation))
        // Jobs
        .route("/jobs", get(jobs::list_jobs))
        .route(
            "/jobs/:id",
            get(jobs::get_job).patch(jobs::update_job).delete(jobs::delete_job),
        )
        .route("/jobs/:id/status", post(jobs::change_status))
        .route("/jobs/:id/apply", post(jobs::apply))
        .route(
            "/jobs/:id/questions",
            post(questions::create_question).get(questions::list_questions),
        )
        .route(
            "/questions/:id",
            patch(questions::update_question).delete(questions::delete_question),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
