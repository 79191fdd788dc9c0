use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use std::any::Any;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;

use crate::api::artifact_handlers::{self, TemplateFields, Templates};
use crate::api::handlers;
use crate::api::instance_handlers;
use crate::api::state::AppState;
use crate::error::{ErrorKey, ErrorResponse};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Templates
        .route(
            "/templates",
            get(artifact_handlers::list_artifacts::<S, Templates>)
                .post(artifact_handlers::create_artifact::<S, Templates>),
        )
        .route(
            "/templates/:id",
            get(artifact_handlers::get_artifact::<S, Templates>)
                .put(artifact_handlers::update_artifact::<S, Templates>)
                .delete(artifact_handlers::delete_artifact::<S, Templates>),
        )
        // Template fields
        .route(
            "/template-fields",
            get(artifact_handlers::list_artifacts::<S, TemplateFields>)
                .post(artifact_handlers::create_artifact::<S, TemplateFields>),
        )
        .route(
            "/template-fields/:id",
            get(artifact_handlers::get_artifact::<S, TemplateFields>)
                .put(artifact_handlers::update_artifact::<S, TemplateFields>)
                .delete(artifact_handlers::delete_artifact::<S, TemplateFields>),
        )
        // Template instances, also served under /instances
        .route(
            "/template-instances",
            get(instance_handlers::list_instances::<S>).post(instance_handlers::create_instance::<S>),
        )
        .route(
            "/template-instances/:id",
            get(instance_handlers::get_instance::<S>)
                .put(instance_handlers::update_instance::<S>)
                .delete(instance_handlers::delete_instance::<S>),
        )
        .route(
            "/instances",
            get(instance_handlers::list_instances::<S>).post(instance_handlers::create_instance::<S>),
        )
        .route(
            "/instances/:id",
            get(instance_handlers::get_instance::<S>)
                .put(instance_handlers::update_instance::<S>)
                .delete(instance_handlers::delete_instance::<S>),
        )
        .layer(ServiceBuilder::new().layer(CatchPanicLayer::custom(handle_panic)))
}

/// A panicking handler becomes a generic 500; the panic text is only logged
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    log::error!("Request handler panicked: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(
            ErrorKey::InternalError,
            "An unexpected error occurred",
        )),
    )
        .into_response()
}
