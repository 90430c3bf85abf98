//! Document content: `GET /view/<pack>[/<sub-path>]`.
//!
//! Per request: parse and decode the path, look up the pack, normalize the
//! sub-path, then answer from the path cache when the client already holds
//! the cached entity tag. Every other request resolves the path against the
//! repository again, refreshes the cache entry, then fetches and sends the blob.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::mime;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use docity_core::{ContentHash, ObjectIdentity, RepoPath, VIEW_PREFIX};
use docity_repo::RepoError;
use percent_encoding::percent_decode_str;
use std::time::Instant;
use tracing::{debug, warn};

/// A content request split into pack name and sub-path, both decoded.
#[derive(Debug, PartialEq, Eq)]
pub struct ViewRequest {
    pub pack: String,
    /// Everything after the pack segment, leading slash included.
    /// `None` when the request names the pack root.
    pub sub_path: Option<String>,
}

impl ViewRequest {
    /// Parse a raw (still percent-encoded) request path.
    ///
    /// The split happens before decoding, so an encoded slash stays part of
    /// the segment it was written in.
    pub fn parse(raw_path: &str) -> ApiResult<Self> {
        let rest = raw_path
            .strip_prefix(VIEW_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| ApiError::BadRequest(format!("not a view path: {raw_path}")))?;

        // The sub-path keeps its leading slash; a doubled slash stays visible
        let (pack, sub_path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };

        Ok(Self {
            pack: decode(pack)?,
            sub_path: match sub_path {
                "" | "/" => None,
                sub_path => Some(decode(sub_path)?),
            },
        })
    }
}

fn decode(raw: &str) -> ApiResult<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ApiError::BadRequest(format!("invalid UTF-8 in path segment: {raw}")))
}

/// Entity tags listed in `If-None-Match`, with weak prefixes stripped.
#[derive(Debug, Default)]
pub struct IfNoneMatch(Vec<String>);

impl IfNoneMatch {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let tags = headers
            .get_all(IF_NONE_MATCH)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .map(|tag| tag.strip_prefix("W/").unwrap_or(tag))
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();
        Self(tags)
    }

    /// Weak comparison against the entity tag for `hash`.
    pub fn matches(&self, hash: &ContentHash) -> bool {
        let etag = hash.etag();
        self.0.iter().any(|tag| *tag == etag)
    }
}

/// GET /view/{*rest}
pub async fn view(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Response {
    let response = serve(&state, uri.path(), &headers)
        .await
        .unwrap_or_else(|e| e.into_response());
    metrics::record_view_response(response.status());
    response
}

async fn serve(state: &AppState, raw_path: &str, headers: &HeaderMap) -> ApiResult<Response> {
    let request = ViewRequest::parse(raw_path)?;
    let pack = state
        .registry
        .lookup(&request.pack)
        .ok_or_else(|| ApiError::NotFound(format!("docpack \"{}\" not found", request.pack)))?;

    let path = match &request.sub_path {
        None => pack.index_page().clone(),
        Some(sub_path) => RepoPath::parse(sub_path)?,
    };
    // A trailing slash names a directory
    if request.sub_path.as_deref().is_some_and(|sub_path| sub_path.ends_with('/')) {
        return Err(ApiError::NotFound(format!("git object \"{path}/\" is not a file")));
    }
    let repo_id = pack.repository_id();
    let conditional = IfNoneMatch::from_headers(headers);

    if let Some(identity) = state.cache.get(repo_id, &path)
        && conditional.matches(&identity.content_hash)
    {
        debug!(pack = %repo_id, path = %path, "Conditional request answered from cache");
        return not_modified(state, &identity.content_hash);
    }

    let identity = match locate(state, repo_id, &path).await {
        Ok(identity) if identity.is_blob() => identity,
        Ok(identity) => {
            state.cache.remove(repo_id, &path);
            return Err(ApiError::NotFound(format!(
                "git object \"{path}\" is a {}, not a file",
                identity.kind
            )));
        }
        Err(e) => {
            state.cache.remove(repo_id, &path);
            return Err(e);
        }
    };
    // Links are cached under their final target once fetched
    if !identity.is_symlink() {
        state.cache.put(repo_id, &path, identity.clone());
    }

    let blob = state
        .resolver
        .fetch(repo_id, &identity)
        .await
        .map_err(|e| {
            log_repo_error(repo_id, &path, &e);
            state.cache.remove(repo_id, &path);
            if identity.is_symlink() {
                ApiError::NotFound(format!("symlink \"{path}\" could not be resolved"))
            } else {
                ApiError::NotFound(format!(
                    "hash content \"{}\" not found",
                    identity.content_hash
                ))
            }
        })?;
    if identity.is_symlink() {
        state.cache.put(repo_id, &path, blob.identity.clone());
    }

    let hash = &blob.identity.content_hash;
    if conditional.matches(hash) {
        return not_modified(state, hash);
    }

    metrics::BYTES_SERVED.inc_by(blob.content.len() as u64);
    let mut response = Response::new(Body::from(blob.content));
    let response_headers = response.headers_mut();
    response_headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(mime::content_type(path.extension())),
    );
    set_validators(state, response_headers, hash)?;
    Ok(response)
}

async fn locate(state: &AppState, repo_id: &str, path: &RepoPath) -> ApiResult<ObjectIdentity> {
    let started = Instant::now();
    let result = state.resolver.locate(repo_id, path).await;
    metrics::LOCATE_DURATION.observe(started.elapsed().as_secs_f64());

    result.map_err(|e| {
        log_repo_error(repo_id, path, &e);
        ApiError::NotFound(format!("git object \"{path}\" not found"))
    })
}

fn log_repo_error(repo_id: &str, path: &RepoPath, err: &RepoError) {
    metrics::record_repo_failure(err.kind());
    if err.is_not_found() {
        debug!(pack = %repo_id, path = %path, error = %err, "Object not found");
    } else {
        warn!(
            pack = %repo_id,
            path = %path,
            kind = err.kind(),
            error = %err,
            "Repository call failed"
        );
    }
}

fn not_modified(state: &AppState, hash: &ContentHash) -> ApiResult<Response> {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    set_validators(state, response.headers_mut(), hash)?;
    Ok(response)
}

fn set_validators(state: &AppState, headers: &mut HeaderMap, hash: &ContentHash) -> ApiResult<()> {
    let etag = HeaderValue::from_str(&hash.etag())
        .map_err(|e| ApiError::Internal(format!("invalid etag header: {e}")))?;
    let cache_control = HeaderValue::from_str(&state.config.server.cache_control())
        .map_err(|e| ApiError::Internal(format!("invalid cache-control header: {e}")))?;
    headers.insert(ETAG, etag);
    headers.insert(CACHE_CONTROL, cache_control);
    Ok(())
}
