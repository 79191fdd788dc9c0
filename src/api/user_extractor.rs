use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::collections::BTreeSet;
use std::convert::Infallible;

use crate::model::{Permission, UserContext};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_PERMISSIONS_HEADER: &str = "x-user-permissions";

/// Axum extractor for UserContext from request headers
///
/// This extractor looks for user information in request headers:
/// - X-User-Id: user identifier; without it the caller is anonymous
/// - X-User-Email: Optional user email
/// - X-User-Name: Optional user display name
/// - X-User-Permissions: comma-separated capability tokens, `*` grants all
///
/// These headers are trusted as sent. The server must sit behind an
/// authenticating proxy that strips them from client requests and sets them
/// itself; otherwise any caller can claim `X-User-Permissions: *`.
///
/// Extraction never fails; permission checks happen in the operations.
#[async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;

        match extract_header_value(headers, USER_ID_HEADER) {
            Some(user_id) => Ok(UserContext::with_details(
                user_id,
                extract_header_value(headers, USER_EMAIL_HEADER),
                extract_header_value(headers, USER_NAME_HEADER),
                extract_header_value(headers, USER_PERMISSIONS_HEADER)
                    .map(|raw| parse_permissions(&raw))
                    .unwrap_or_default(),
            )),
            None => Ok(UserContext::anonymous()),
        }
    }
}

/// Extract a non-blank header value as string
fn extract_header_value(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Unknown tokens are ignored. The header is only meaningful when set by the
/// trusted upstream proxy, including the `template-instance-import` grant.
pub fn parse_permissions(raw: &str) -> BTreeSet<Permission> {
    let tokens: Vec<&str> = raw.split(',').map(str::trim).collect();
    if tokens.contains(&"*") {
        return Permission::ALL.into_iter().collect();
    }
    tokens.into_iter().filter_map(Permission::parse).collect()
}
