use async_trait::async_trait;
use azcache_config::{build_http_client, CacheConfig, ConfigError, ContainerAccess};
use chrono::Utc;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, Response, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use super::auth::SharedKeyCredential;
use crate::store::validate_key;
use crate::{BlobStore, CacheError};

/// REST API version sent with every request.
pub const API_VERSION: &str = "2020-10-02";

/// Largest payload a single Put Blob call accepts for [`API_VERSION`].
pub const MAX_SINGLE_PUT_SIZE: u64 = 5000 * 1024 * 1024;

const ERROR_CODE_HEADER: &str = "x-ms-error-code";

/// Blob service client talking to the REST API directly.
#[derive(Debug, Clone)]
pub struct AzureBlobClient {
    http: reqwest::Client,
    credential: SharedKeyCredential,
    endpoint: Url,
}

impl AzureBlobClient {
    /// Build a client from a resolved config. Fails with
    /// [`CacheError::Connection`] when the account key cannot be used to sign
    /// requests.
    pub fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let credential =
            SharedKeyCredential::new(&config.account_name, &config.account_key)?;
        let http = build_http_client(&config.http).map_err(|e| {
            CacheError::Connection(format!("failed to build HTTP client: {e}"))
        })?;
        Self::with_http_client(http, credential, &config.blob_endpoint())
    }

    pub fn with_http_client(
        http: reqwest::Client,
        credential: SharedKeyCredential,
        endpoint: &str,
    ) -> Result<Self, CacheError> {
        let invalid = || ConfigError::InvalidValue {
            key: "azure.endpoint".to_string(),
            value: endpoint.to_string(),
        };
        let endpoint = Url::parse(endpoint).map_err(|_| invalid())?;
        if endpoint.cannot_be_a_base() {
            return Err(invalid().into());
        }

        Ok(Self {
            http,
            credential,
            endpoint,
        })
    }

    pub fn account(&self) -> &str {
        self.credential.account()
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn container_url(&self, container: &str) -> Result<Url, CacheError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| CacheError::InvalidKey(container.to_string()))?
            .pop_if_empty()
            .push(container);
        Ok(url)
    }

    /// Blob URL with every `/`-separated part of `key` percent-encoded.
    fn blob_url(&self, container: &str, key: &str) -> Result<Url, CacheError> {
        validate_key(key)?;
        let mut url = self.container_url(container)?;
        url.path_segments_mut()
            .map_err(|_| CacheError::InvalidKey(key.to_string()))?
            .extend(key.split('/'));
        Ok(url)
    }

    /// Sign and send one request.
    async fn send(
        &self,
        method: Method,
        url: Url,
        mut headers: HeaderMap,
        body: Option<Vec<u8>>,
    ) -> Result<Response, CacheError> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        headers.insert("x-ms-date", header_value(&date)?);
        headers.insert("x-ms-version", HeaderValue::from_static(API_VERSION));

        let mut builder = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let mut request = builder.build()?;

        let authorization = self.credential.authorization(
            request.method(),
            request.url(),
            request.headers(),
        )?;
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, header_value(&authorization)?);

        self.http.execute(request).await.map_err(transport_error)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, CacheError> {
    HeaderValue::from_str(value).map_err(|e| {
        CacheError::Connection(format!("invalid header value: {e}"))
    })
}

fn content_length(len: usize) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers
}

fn transport_error(err: reqwest::Error) -> CacheError {
    if err.is_connect() {
        CacheError::Connection(err.to_string())
    } else {
        CacheError::Transport(err)
    }
}

fn error_code(response: &Response) -> Option<String> {
    response
        .headers()
        .get(ERROR_CODE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Pull the text of `<Message>` out of an XML error body.
fn error_message(body: &str) -> Option<&str> {
    let start = body.find("<Message>")? + "<Message>".len();
    let end = body[start..].find("</Message>")? + start;
    Some(body[start..end].trim())
}

/// Turn a non-success response into an error. A rejected signature means the
/// client is not authenticated and is reported as a connection failure.
async fn service_error(response: Response) -> CacheError {
    let status = response.status();
    let code = error_code(&response);
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body)
        .map(str::to_string)
        .unwrap_or_else(|| {
            status.canonical_reason().unwrap_or("unknown error").to_string()
        });

    if status == StatusCode::FORBIDDEN
        && code.as_deref() == Some("AuthenticationFailed")
    {
        return CacheError::Connection(format!("authentication failed: {message}"));
    }

    CacheError::RemoteService {
        status: status.as_u16(),
        code,
        message,
    }
}

/// 404 for the blob itself, as opposed to the container or the account.
fn is_blob_not_found(status: StatusCode, code: Option<&str>) -> bool {
    status == StatusCode::NOT_FOUND && matches!(code, None | Some("BlobNotFound"))
}

#[async_trait]
impl BlobStore for AzureBlobClient {
    #[instrument(skip(self), fields(account = %self.account()))]
    async fn create_container_if_not_exists(
        &self,
        container: &str,
        access: ContainerAccess,
    ) -> Result<bool, CacheError> {
        let mut url = self.container_url(container)?;
        url.query_pairs_mut().append_pair("restype", "container");

        let mut headers = content_length(0);
        if let Some(level) = access.header_value() {
            headers.insert("x-ms-blob-public-access", HeaderValue::from_static(level));
        }

        let response = self.send(Method::PUT, url, headers, None).await?;
        match response.status() {
            StatusCode::CREATED => {
                debug!("container created");
                Ok(true)
            }
            StatusCode::CONFLICT
                if error_code(&response).as_deref()
                    == Some("ContainerAlreadyExists") =>
            {
                debug!("container already exists");
                Ok(false)
            }
            _ => Err(service_error(response).await),
        }
    }

    #[instrument(skip(self), fields(account = %self.account()))]
    async fn get_blob(
        &self,
        container: &str,
        key: &str,
    ) -> Result<Vec<u8>, CacheError> {
        let url = self.blob_url(container, key)?;
        let response = self.send(Method::GET, url, HeaderMap::new(), None).await?;

        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await.map_err(|e| CacheError::BodyRead {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
            debug!(bytes = body.len(), "blob read");
            return Ok(body.to_vec());
        }

        if is_blob_not_found(status, error_code(&response).as_deref()) {
            debug!("blob not found");
            return Err(CacheError::NotFound(key.to_string()));
        }
        Err(service_error(response).await)
    }

    #[instrument(skip(self, value), fields(account = %self.account(), bytes = value.len()))]
    async fn put_block_blob(
        &self,
        container: &str,
        key: &str,
        value: &[u8],
    ) -> Result<(), CacheError> {
        let size = value.len() as u64;
        if size > MAX_SINGLE_PUT_SIZE {
            return Err(CacheError::PayloadTooLarge {
                size,
                limit: MAX_SINGLE_PUT_SIZE,
            });
        }
        let url = self.blob_url(container, key)?;

        let mut headers = content_length(value.len());
        headers.insert("x-ms-blob-type", HeaderValue::from_static("BlockBlob"));

        let response = self
            .send(Method::PUT, url, headers, Some(value.to_vec()))
            .await?;
        if response.status() == StatusCode::CREATED {
            debug!("blob uploaded");
            return Ok(());
        }
        Err(service_error(response).await)
    }

    #[instrument(skip(self), fields(account = %self.account()))]
    async fn delete_blob_if_exists(
        &self,
        container: &str,
        key: &str,
    ) -> Result<bool, CacheError> {
        let url = self.blob_url(container, key)?;
        let response = self
            .send(Method::DELETE, url, HeaderMap::new(), None)
            .await?;

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            debug!("blob deleted");
            return Ok(true);
        }
        if is_blob_not_found(status, error_code(&response).as_deref()) {
            debug!("blob did not exist");
            return Ok(false);
        }
        Err(service_error(response).await)
    }
}
