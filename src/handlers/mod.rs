pub mod auth;
pub mod report;

pub use auth::*;

use crate::services::generation::{GenerationTicket, RequestGenerations};
use axum::http::HeaderMap;

pub const VIEW_ID_HEADER: &str = "x-view-id";

/// Open a generation ticket for the view named in `X-View-Id`. Requests
/// without the header are never considered stale.
pub(crate) fn begin_view_request(
    headers: &HeaderMap,
    generations: &RequestGenerations,
) -> Option<GenerationTicket> {
    let view = headers
        .get(VIEW_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())?;
    Some(generations.begin(view))
}
