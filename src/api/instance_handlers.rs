use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;

use crate::api::artifact_handlers::page_response;
use crate::api::common::{artifact_url, insert_header, parse_body, validation_headers};
use crate::api::state::AppState;
use crate::error::ApiError;
use crate::logic::{InstanceLifecycle, ListQuery, RenderedBody};
use crate::model::{ArtifactKind, Id, Operation, Permission, UserContext};
use crate::store::traits::Store;

const KIND: ArtifactKind = ArtifactKind::TemplateInstance;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceQuery {
    pub import_mode: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FormatQuery {
    pub format: Option<String>,
}

pub async fn create_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    request_headers: HeaderMap,
    Query(query): Query<CreateInstanceQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    // Capability is checked before the body is looked at
    user.require(Permission::for_operation(KIND, Operation::Create))?;
    let instance = parse_body(&body)?;
    let created = InstanceLifecycle::new(state.store.as_ref(), &state.config)
        .create(&user, instance, query.import_mode.unwrap_or(false))
        .await?;

    let mut headers = validation_headers(&created.report, true)?;
    insert_header(
        &mut headers,
        header::LOCATION.as_str(),
        &artifact_url(&request_headers, KIND, created.id()),
    )?;
    Ok((StatusCode::CREATED, headers, Json(created.document)).into_response())
}

pub async fn get_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(id): Path<Id>,
    Query(query): Query<FormatQuery>,
) -> Result<Response, ApiError> {
    let rendered = InstanceLifecycle::new(state.store.as_ref(), &state.config)
        .find(&user, &id, query.format.as_deref())
        .await?;

    let response = match rendered.body {
        RenderedBody::Json(document) => Json(document).into_response(),
        RenderedBody::Text(text) => {
            ([(header::CONTENT_TYPE, rendered.content_type)], text).into_response()
        }
    };
    Ok(response)
}

pub async fn list_instances<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    request_headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let page = InstanceLifecycle::new(state.store.as_ref(), &state.config)
        .find_all(&user, &query)
        .await?;
    page_response(&request_headers, KIND, page)
}

pub async fn update_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(id): Path<Id>,
    body: Bytes,
) -> Result<Response, ApiError> {
    user.require(Permission::for_operation(KIND, Operation::Update))?;
    let instance = parse_body(&body)?;
    let updated = InstanceLifecycle::new(state.store.as_ref(), &state.config)
        .update(&user, &id, instance)
        .await?;

    let headers = validation_headers(&updated.report, true)?;
    Ok((StatusCode::OK, headers, Json(updated.document)).into_response())
}

pub async fn delete_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(id): Path<Id>,
) -> Result<StatusCode, ApiError> {
    InstanceLifecycle::new(state.store.as_ref(), &state.config)
        .delete(&user, &id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
