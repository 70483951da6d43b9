use crate::error::HandlerError;
use crate::handlers::form::{form_to_document, parse_form};
use crate::startup::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::IntoResponse,
};
use percent_encoding::percent_decode_str;

pub const DATA_PREFIX: &str = "/data/";

/// Collection addressed by a `/data/<collection>` path.
///
/// Exactly one `/data/` prefix is removed; the remainder is percent-decoded
/// and used as-is, slashes included.
pub fn collection_from_path(path: &str) -> Option<String> {
    let raw = path.strip_prefix(DATA_PREFIX)?;
    let name = percent_decode_str(raw).decode_utf8().ok()?;
    if name.is_empty() {
        return None;
    }
    Some(name.into_owned())
}

fn collection(uri: &Uri) -> Result<String, HandlerError> {
    collection_from_path(uri.path())
        .ok_or_else(|| HandlerError::MissingCollection(uri.path().to_string()))
}

/// `GET /data/<collection>`: the most recent document, pretty-printed.
pub async fn get_data(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<impl IntoResponse, HandlerError> {
    let collection = collection(&uri)?;

    let document = state
        .data
        .fetch_latest(&collection, state.config.store_timeout)
        .await
        .map_err(HandlerError::Read)?;

    let body = serde_json::to_string_pretty(&document)?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    ))
}

/// `POST /data/<collection>`: store the submitted form as a new document.
pub async fn post_data(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, HandlerError> {
    let collection = collection(&uri)?;

    let fields = parse_form(&headers, &body, uri.query())?;
    let document = form_to_document(fields);

    state
        .data
        .insert(&collection, &document, state.config.store_timeout)
        .await
        .map_err(HandlerError::Write)?;

    tracing::info!(collection = %collection, fields = document.len(), "Stored form submission");
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix_exactly_once() {
        assert_eq!(collection_from_path("/data/people").as_deref(), Some("people"));
        // Leading characters that also appear in the prefix are kept.
        assert_eq!(collection_from_path("/data/data").as_deref(), Some("data"));
        assert_eq!(collection_from_path("/data/tad").as_deref(), Some("tad"));
        assert_eq!(
            collection_from_path("/data//data/x").as_deref(),
            Some("/data/x")
        );
    }

    #[test]
    fn decodes_percent_escapes() {
        assert_eq!(
            collection_from_path("/data/my%20things").as_deref(),
            Some("my things")
        );
    }

    #[test]
    fn rejects_paths_without_a_collection() {
        assert_eq!(collection_from_path("/data/"), None);
        assert_eq!(collection_from_path("/info"), None);
        assert_eq!(collection_from_path("/data/%ff"), None);
    }
}
