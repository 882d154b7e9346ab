//! Swift client implementation
//!
//! Wraps a reqwest client and implements the BackingStore trait from swiftfs-core.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use url::Url;

use swiftfs_core::{
    AuthToken, BackingStore, ByteRange, ContainerListing, Credentials, Error, ObjectData,
    ObjectRecord, Result,
};

/// Objects requested per listing page
pub const LISTING_PAGE_SIZE: usize = 10_000;

const HEADER_AUTH_USER: &str = "X-Auth-User";
const HEADER_AUTH_KEY: &str = "X-Auth-Key";
const HEADER_AUTH_TOKEN: &str = "X-Auth-Token";
const HEADER_STORAGE_URL: &str = "X-Storage-Url";

/// Swift client wrapper
#[derive(Debug, Clone)]
pub struct SwiftClient {
    http: reqwest::Client,
}

impl SwiftClient {
    /// Create a new Swift client, reading HTTP settings from the credentials
    ///
    /// Recognised keys: `connect_timeout_ms`, `read_timeout_ms`, `insecure`.
    pub fn new(credentials: &Credentials) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("swiftfs/", env!("CARGO_PKG_VERSION")));

        if let Some(ms) = credentials.get_u64("connect_timeout_ms")? {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = credentials.get_u64("read_timeout_ms")? {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if credentials.get_bool("insecure")? {
            tracing::warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder
            .build()
            .map_err(|e| Error::General(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Create a client from an existing reqwest client
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn list_page(
        &self,
        auth: &AuthToken,
        container: &str,
        marker: Option<&str>,
    ) -> Result<(HeaderMap, Vec<ObjectRecord>)> {
        let url = listing_url(&auth.storage_url, container, marker)?;
        tracing::debug!(%url, "listing container page");

        let response = self
            .http
            .get(url)
            .header(HEADER_AUTH_TOKEN, &auth.token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, container));
        }

        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(transport_error)?;
        if status == StatusCode::NO_CONTENT || body.is_empty() {
            return Ok((headers, Vec::new()));
        }

        let page: Vec<ObjectRecord> = serde_json::from_slice(&body)?;
        Ok((headers, page))
    }
}

#[async_trait]
impl BackingStore for SwiftClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken> {
        if let (Some(storage_url), Some(token)) =
            (credentials.get("storage_url"), credentials.get("auth_token"))
            && !storage_url.is_empty()
            && !token.is_empty()
        {
            Url::parse(storage_url)?;
            tracing::debug!(storage_url, "using pre-authenticated storage url");
            return Ok(AuthToken::new(storage_url, token));
        }

        let auth_url = Url::parse(credentials.require("auth_url")?)?;
        let user = credentials.require("user")?;
        let key = credentials.require("key")?;

        let response = self
            .http
            .get(auth_url.clone())
            .header(HEADER_AUTH_USER, user)
            .header(HEADER_AUTH_KEY, key)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Auth(format!("{auth_url}: {status}")));
        }

        let headers = response.headers();
        let storage_url = header_str(headers, HEADER_STORAGE_URL).ok_or_else(|| {
            Error::Auth(format!("{auth_url}: response missing {HEADER_STORAGE_URL}"))
        })?;
        let token = header_str(headers, HEADER_AUTH_TOKEN).ok_or_else(|| {
            Error::Auth(format!("{auth_url}: response missing {HEADER_AUTH_TOKEN}"))
        })?;

        Ok(AuthToken::new(storage_url, token))
    }

    async fn list_container(&self, auth: &AuthToken, container: &str) -> Result<ContainerListing> {
        let (headers, mut objects) = self.list_page(auth, container, None).await?;
        let mut last_page = objects.len();

        while last_page >= LISTING_PAGE_SIZE {
            let marker = match objects.last() {
                Some(record) => record.name.clone(),
                None => break,
            };
            let (_, page) = self.list_page(auth, container, Some(&marker)).await?;
            last_page = page.len();
            objects.extend(page);
        }

        tracing::debug!(container, objects = objects.len(), "listed container");
        Ok(ContainerListing {
            metadata: header_map(&headers),
            objects,
        })
    }

    async fn get_object_range(
        &self,
        auth: &AuthToken,
        container: &str,
        object: &str,
        range: ByteRange,
    ) -> Result<ObjectData> {
        let url = object_url(&auth.storage_url, container, object)?;
        let mut request = self.http.get(url).header(HEADER_AUTH_TOKEN, &auth.token);
        if let Some(value) = range.header_value() {
            request = request.header(reqwest::header::RANGE, value);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();

        // Range starting at or past the end of the object
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(ObjectData {
                metadata: header_map(response.headers()),
                data: Vec::new(),
            });
        }
        if !status.is_success() {
            return Err(status_error(status, &format!("{container}/{object}")));
        }

        let metadata = header_map(response.headers());
        let data = response.bytes().await.map_err(transport_error)?.to_vec();
        Ok(ObjectData { metadata, data })
    }
}

/// Map a non-success status to an error
pub fn status_error(status: StatusCode, context: &str) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Auth(format!("{context}: {status}"))
        }
        StatusCode::NOT_FOUND => Error::RemoteNotFound(context.to_string()),
        _ => Error::Remote(format!("{context}: {status}")),
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Remote(format!("request timed out: {err}"))
    } else {
        Error::Remote(err.to_string())
    }
}

/// Response headers as a map with lowercased keys
///
/// Values that are not valid visible ASCII are skipped.
pub fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// URL of a container listing page
pub fn listing_url(storage_url: &str, container: &str, marker: Option<&str>) -> Result<Url> {
    let mut url = container_url(storage_url, container)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("format", "json");
        query.append_pair("limit", &LISTING_PAGE_SIZE.to_string());
        if let Some(marker) = marker {
            query.append_pair("marker", marker);
        }
    }
    Ok(url)
}

/// URL of one object
///
/// The object name is kept verbatim: each `/`-separated part becomes one
/// percent-encoded path segment, empty parts included.
pub fn object_url(storage_url: &str, container: &str, object: &str) -> Result<Url> {
    let mut url = container_url(storage_url, container)?;
    url.path_segments_mut()
        .map_err(|_| Error::Config(format!("storage url cannot be a base: {storage_url}")))?
        .extend(object.split('/'));
    Ok(url)
}

fn container_url(storage_url: &str, container: &str) -> Result<Url> {
    let mut url = Url::parse(storage_url)?;
    url.path_segments_mut()
        .map_err(|_| Error::Config(format!("storage url cannot be a base: {storage_url}")))?
        .pop_if_empty()
        .push(container);
    Ok(url)
}
