use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};

use crate::api::common::{
    artifact_url, collection_url, insert_header, parse_body, validation_headers, TOTAL_COUNT_HEADER,
};
use crate::api::state::AppState;
use crate::error::ApiError;
use crate::logic::{paging_link_header, ArtifactLifecycle, ListQuery, Page, Upserted};
use crate::model::{ArtifactKind, Id, Operation, Permission, UserContext};
use crate::store::traits::Store;

/// Selects the collection a generic artifact handler serves
pub trait ArtifactRoute: Send + Sync + 'static {
    const KIND: ArtifactKind;
}

pub struct Templates;
pub struct TemplateFields;

impl ArtifactRoute for Templates {
    const KIND: ArtifactKind = ArtifactKind::Template;
}

impl ArtifactRoute for TemplateFields {
    const KIND: ArtifactKind = ArtifactKind::TemplateField;
}

/// 200 with the page body, `X-Total-Count` and, when paging applies, `Link`
pub fn page_response(
    request_headers: &HeaderMap,
    kind: ArtifactKind,
    page: Page,
) -> Result<Response, ApiError> {
    let mut headers = HeaderMap::new();
    insert_header(&mut headers, TOTAL_COUNT_HEADER, &page.total.to_string())?;
    let link = paging_link_header(
        &collection_url(request_headers, kind),
        page.total,
        page.limit,
        page.offset,
    );
    if let Some(link) = link {
        insert_header(&mut headers, header::LINK.as_str(), &link)?;
    }
    Ok((StatusCode::OK, headers, Json(page.items)).into_response())
}

fn lifecycle<S: Store, R: ArtifactRoute>(state: &AppState<S>) -> ArtifactLifecycle<'_, S> {
    ArtifactLifecycle::new(state.store.as_ref(), &state.config, R::KIND)
}

pub async fn create_artifact<S: Store, R: ArtifactRoute>(
    State(state): State<AppState<S>>,
    user: UserContext,
    request_headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    // Capability is checked before the body is looked at
    user.require(Permission::for_operation(R::KIND, Operation::Create))?;
    let artifact = parse_body(&body)?;
    let created = lifecycle::<S, R>(&state).create(&user, artifact).await?;

    let mut headers = validation_headers(&created.report, false)?;
    insert_header(
        &mut headers,
        header::LOCATION.as_str(),
        &artifact_url(&request_headers, R::KIND, created.id()),
    )?;
    Ok((StatusCode::CREATED, headers, Json(created.document)).into_response())
}

pub async fn get_artifact<S: Store, R: ArtifactRoute>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(id): Path<Id>,
) -> Result<Response, ApiError> {
    let artifact = lifecycle::<S, R>(&state).find(&user, &id).await?;
    Ok(Json(artifact).into_response())
}

pub async fn list_artifacts<S: Store, R: ArtifactRoute>(
    State(state): State<AppState<S>>,
    user: UserContext,
    request_headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let page = lifecycle::<S, R>(&state).find_all(&user, &query).await?;
    page_response(&request_headers, R::KIND, page)
}

pub async fn update_artifact<S: Store, R: ArtifactRoute>(
    State(state): State<AppState<S>>,
    user: UserContext,
    request_headers: HeaderMap,
    Path(id): Path<Id>,
    body: Bytes,
) -> Result<Response, ApiError> {
    user.require(Permission::for_operation(R::KIND, Operation::Update))?;
    let artifact = parse_body(&body)?;

    match lifecycle::<S, R>(&state).update(&user, &id, artifact).await? {
        Upserted::Updated(updated) => {
            let headers = validation_headers(&updated.report, false)?;
            Ok((StatusCode::OK, headers, Json(updated.document)).into_response())
        }
        Upserted::Created(created) => {
            let mut headers = validation_headers(&created.report, false)?;
            insert_header(
                &mut headers,
                header::LOCATION.as_str(),
                &artifact_url(&request_headers, R::KIND, created.id()),
            )?;
            Ok((StatusCode::CREATED, headers, Json(created.document)).into_response())
        }
    }
}

pub async fn delete_artifact<S: Store, R: ArtifactRoute>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(id): Path<Id>,
) -> Result<StatusCode, ApiError> {
    lifecycle::<S, R>(&state).delete(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
