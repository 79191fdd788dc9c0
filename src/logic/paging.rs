use itertools::Itertools;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::{PaginationConfig, RestApiConfig};
use crate::error::ApiError;
use crate::model::document::strip_internal_id;
use crate::model::{ArtifactKind, Projection};
use crate::store::traits::ArtifactStore;

/// Query parameters shared by every list endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub summary: Option<bool>,
    pub field_names: Option<String>,
}

/// One page of a collection, storage ids already stripped
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Error, PartialEq)]
pub enum PagingError {
    #[error("{0}")]
    InvalidParameter(String),

    #[error("The 'summary' and 'fieldNames' parameters cannot be used together")]
    FieldNamesConflict,
}

/// Validated `limit`/`offset` pair of a list request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagedQuery {
    pub limit: usize,
    pub offset: usize,
}

impl PagedQuery {
    pub fn new(
        config: &PaginationConfig,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Self, PagingError> {
        let limit = match limit {
            None => config.default_page_size,
            Some(l) if l >= 1 && (l as u64) <= config.max_page_size as u64 => l as usize,
            Some(l) => {
                return Err(PagingError::InvalidParameter(format!(
                    "Parameter 'limit' must be between 1 and {}, got {}",
                    config.max_page_size, l
                )))
            }
        };
        let offset = match offset {
            None => 0,
            Some(o) if o >= 0 => o as usize,
            Some(o) => {
                return Err(PagingError::InvalidParameter(format!(
                    "Parameter 'offset' must be positive, got {}",
                    o
                )))
            }
        };
        Ok(Self { limit, offset })
    }

    /// A non-zero offset must point inside the collection
    pub fn check_offset_against_total(&self, total: u64) -> Result<(), PagingError> {
        if self.offset != 0 && self.offset as u64 >= total {
            return Err(PagingError::InvalidParameter(format!(
                "Parameter 'offset' must be smaller than the total count of objects, which is {}",
                total
            )));
        }
        Ok(())
    }
}

/// RFC 5988 `Link` header for a page; `None` when everything fits on one page
pub fn paging_link_header(base_url: &str, total: u64, limit: usize, offset: usize) -> Option<String> {
    let total = total as usize;
    if limit == 0 || (offset == 0 && total <= limit) {
        return None;
    }

    let last = if total == 0 { 0 } else { (total - 1) / limit * limit };
    let mut links = vec![(0, "first")];
    if offset > 0 {
        links.push((offset.saturating_sub(limit), "prev"));
    }
    if offset + limit < total {
        links.push((offset + limit, "next"));
    }
    links.push((last, "last"));

    Some(
        links
            .into_iter()
            .map(|(page_offset, rel)| {
                format!(
                    "<{}?offset={}&limit={}>; rel=\"{}\"",
                    base_url, page_offset, limit, rel
                )
            })
            .join(", "),
    )
}

/// Pick the list projection from the `summary` and `fieldNames` parameters.
///
/// `fieldNames` is comma separated; blank entries are ignored. Without
/// either parameter the configured exclusions are applied.
pub fn resolve_projection(
    summary: bool,
    field_names: Option<&str>,
    summary_fields: &[String],
    exclusions: &[String],
) -> Result<Projection, PagingError> {
    match (summary, field_names) {
        (true, Some(raw)) if !raw.trim().is_empty() => Err(PagingError::FieldNamesConflict),
        (true, _) => Ok(Projection::Include(summary_fields.to_vec())),
        (false, Some(raw)) => {
            let names: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .unique()
                .collect();
            if names.is_empty() {
                return Err(PagingError::InvalidParameter(
                    "Parameter 'fieldNames' must list at least one field".to_string(),
                ));
            }
            Ok(Projection::Include(names))
        }
        (false, None) => Ok(Projection::Exclude(exclusions.to_vec())),
    }
}

fn summary_fields(rest_api: &RestApiConfig, kind: ArtifactKind) -> &[String] {
    match kind {
        ArtifactKind::Template => &rest_api.summaries.template,
        ArtifactKind::TemplateField => &rest_api.summaries.field,
        ArtifactKind::TemplateInstance => &rest_api.summaries.instance,
    }
}

/// Fetch one projected page of a collection along with its total size
pub async fn fetch_page<S: ArtifactStore + ?Sized>(
    store: &S,
    rest_api: &RestApiConfig,
    kind: ArtifactKind,
    query: &ListQuery,
) -> Result<Page, ApiError> {
    let paged = PagedQuery::new(&rest_api.pagination, query.limit, query.offset)?;
    let projection = resolve_projection(
        query.summary.unwrap_or(false),
        query.field_names.as_deref(),
        summary_fields(rest_api, kind),
        &rest_api.exclusions,
    )?;

    let not_listed = |e: anyhow::Error| {
        ApiError::internal(
            kind.not_listed_key(),
            format!("The {}s can not be listed", kind.label()),
            e,
        )
    };
    let items = store
        .find_all(kind, paged.limit, paged.offset, &projection)
        .await
        .map_err(not_listed)?;
    let total = store.count(kind).await.map_err(not_listed)?;
    paged.check_offset_against_total(total)?;

    Ok(Page {
        items: items.into_iter().map(strip_internal_id).collect(),
        total,
        limit: paged.limit,
        offset: paged.offset,
    })
}
