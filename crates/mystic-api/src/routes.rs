use axum::Router;
use axum::routing::{delete, get, post};

use crate::auth::{self, AppState};
use crate::dashboard;
use crate::feedback;
use crate::middleware::require_auth;

/// Everything under /api/v1. Public routes (register, login, the anonymous
/// feedback surface) merge with protected routes behind the session gate.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/v1/user/register", post(auth::register))
        .route("/api/v1/user/login", post(auth::login))
        .route("/api/v1/feedback/question", get(feedback::get_question))
        .route("/api/v1/feedback/username", get(feedback::get_username))
        .route("/api/v1/feedback/send-message", post(feedback::send_message))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/api/v1/user/logout", post(auth::logout))
        .route("/api/v1/user/current-user", get(auth::current_user))
        .route(
            "/api/v1/dashboard/questions",
            post(dashboard::create_question).get(dashboard::list_questions),
        )
        .route(
            "/api/v1/dashboard/questions/{question_id}",
            delete(dashboard::delete_question),
        )
        .route(
            "/api/v1/dashboard/questions/{question_id}/messages",
            get(dashboard::get_question_messages).delete(dashboard::delete_all_messages),
        )
        .route(
            "/api/v1/dashboard/questions/{question_id}/message-acceptance",
            get(dashboard::get_acceptance).put(dashboard::update_acceptance),
        )
        .route(
            "/api/v1/dashboard/messages/{message_id}",
            delete(dashboard::delete_message),
        )
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public).merge(protected)
}
