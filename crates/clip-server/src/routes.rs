//! HTTP routes.
//!
//! | Route            | Auth | |
//! |------------------|------|-|
//! | `GET /`          | no   | discovery JSON |
//! | `GET /verify`    | yes  | empty 200 |
//! | `GET /install`   | no   | installer script |
//! | `GET /get`       | no   | this executable |
//! | `GET /clip/:id`  | yes  | clip contents, sniffed |
//! | `PUT /clip/:id`  | yes  | store clip |

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Query, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use shared_auth::{Authenticator, FileId, TimeSource, PROTOCOL_VERSION};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tower::ServiceBuilder;
use tracing::debug;

use crate::content_type::ContentTypeWriter;
use crate::domain::StoreError;
use crate::install::install_script;
use crate::middleware::{HmacAuthLayer, TracingLayer};
use crate::ports::{ClipReader, ClipStore};
use crate::sniff::SNIFF_LEN;

const CHUNK_SIZE: usize = 64 * 1024;

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    pub salt_b64: Arc<str>,
    pub server_addr: Option<Arc<str>>,
    pub store: Arc<dyn ClipStore>,
}

/// Discovery body.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InfoResponse {
    pub version: u32,
    pub salt: String,
}

#[derive(Debug, Default, Deserialize)]
struct ClipQuery {
    download: Option<String>,
}

impl ClipQuery {
    fn download(&self) -> bool {
        matches!(self.download.as_deref(), Some(v) if v != "0" && v != "false")
    }
}

/// Clip identifier taken from the raw request path, before any
/// percent-decoding, so it is checked on the same bytes the MAC covers.
struct ClipId(FileId);

const CLIP_PREFIX: &str = "/clip/";

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClipId {
    type Rejection = StoreError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .uri
            .path()
            .strip_prefix(CLIP_PREFIX)
            .unwrap_or_default();
        Ok(Self(FileId::parse(raw)?))
    }
}

/// Full router. Authentication wraps only the protected routes and runs
/// before their handlers.
pub fn build_router(
    state: AppState,
    authenticator: Arc<Authenticator>,
    clock: Arc<dyn TimeSource>,
) -> Router {
    let protected = Router::new()
        .route("/verify", get(handle_verify))
        .route("/clip/:id", get(handle_paste).put(handle_copy))
        .route_layer(HmacAuthLayer::new(authenticator, clock));

    Router::new()
        .route("/", get(handle_info))
        .route("/install", get(handle_install))
        .route("/get", get(handle_get))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(TracingLayer::new()))
        .with_state(state)
}

async fn handle_info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        version: PROTOCOL_VERSION,
        salt: state.salt_b64.to_string(),
    })
}

async fn handle_verify() -> StatusCode {
    StatusCode::OK
}

async fn handle_install(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/x-shellscript; charset=utf-8")],
        install_script(state.server_addr.as_deref()),
    )
}

async fn handle_get() -> Result<Response, StoreError> {
    let exe = std::env::current_exe()?;
    let file = tokio::fs::File::open(&exe).await?;
    let mut response = stream_body(Bytes::new(), Box::pin(file)).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    Ok(response)
}

async fn handle_paste(
    State(state): State<AppState>,
    ClipId(id): ClipId,
    Query(query): Query<ClipQuery>,
) -> Result<Response, StoreError> {
    let mut reader = state.store.open(&id).await?;

    let first = read_prefix(&mut reader, SNIFF_LEN).await?;
    let headers = ContentTypeWriter::new(id.as_str(), query.download())
        .observe(&first)
        .unwrap_or_else(HeaderMap::new);

    debug!(id = %id, download = query.download(), "Serving clip");
    Ok((headers, stream_body(first, reader)).into_response())
}

async fn handle_copy(
    State(state): State<AppState>,
    ClipId(id): ClipId,
    body: Body,
) -> Result<StatusCode, StoreError> {
    let stream = body
        .into_data_stream()
        .map_err(std::io::Error::other)
        .boxed();
    let written = state.store.create(&id, stream).await?;
    debug!(id = %id, bytes = written, "Clip received");
    Ok(StatusCode::OK)
}

/// Read until `limit` bytes or EOF.
async fn read_prefix(reader: &mut ClipReader, limit: usize) -> std::io::Result<Bytes> {
    let mut buf = vec![0u8; limit];
    let mut filled = 0;
    while filled < limit {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(Bytes::from(buf))
}

/// `first` followed by the rest of `reader`, chunk by chunk.
fn stream_body(first: Bytes, reader: ClipReader) -> Body {
    let head = futures::stream::once(async move { Ok::<_, std::io::Error>(first) })
        .try_filter(|chunk| futures::future::ready(!chunk.is_empty()));
    let rest = futures::stream::try_unfold(reader, |mut reader| async move {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok::<_, std::io::Error>(None);
        }
        buf.truncate(n);
        Ok(Some((Bytes::from(buf), reader)))
    });
    Body::from_stream(head.chain(rest))
}
