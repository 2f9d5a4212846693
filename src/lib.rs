pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod store;

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post, put},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::Config, services::discussion_service::DiscussionService};

#[derive(Clone)]
pub struct AppState {
    pub discussions: Arc<DiscussionService>,
    pub config: Arc<Config>,
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    let discussion_routes = Router::new()
        .route(
            "/api/discussions/{kind}/{slug}",
            get(handlers::discussions::get_discussion),
        )
        .route(
            "/api/discussions/{kind}/{slug}/comments",
            post(handlers::discussions::create_comment),
        )
        .route(
            "/api/threads/{thread_id}/locked",
            put(handlers::discussions::lock_thread),
        );

    let comment_routes = Router::new()
        .route(
            "/api/comments/{comment_id}",
            get(handlers::comments::get_comment)
                .put(handlers::comments::update_comment)
                .delete(handlers::comments::delete_comment),
        )
        .route(
            "/api/comments/{comment_id}/replies",
            get(handlers::comments::get_comment_replies).post(handlers::comments::create_reply),
        )
        .route(
            "/api/comments/{comment_id}/vote",
            post(handlers::comments::vote_comment),
        )
        .route(
            "/api/comments/{comment_id}/hidden",
            put(handlers::comments::hide_comment),
        )
        .route(
            "/api/comments/{comment_id}/pinned",
            put(handlers::comments::pin_comment),
        );

    Router::new()
        .merge(discussion_routes)
        .merge(comment_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
