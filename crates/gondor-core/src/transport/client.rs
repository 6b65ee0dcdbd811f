//! HTTP implementation of [`RemoteApi`].

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, multipart};
use tracing::debug;
use url::Url;

use super::{FormFields, RemoteApi, Upload};
use crate::CLIENT_VERSION;
use crate::config::Credentials;
use crate::error::{GondorError, GondorResult};
use crate::transport::ApiResponse;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for small form requests. Uploads and downloads are unbounded.
const FORM_TIMEOUT: Duration = Duration::from_secs(120);

/// Join an endpoint-relative path (e.g. `deploy/`) onto the API base URL.
pub fn endpoint_url(base: &Url, path: &str) -> GondorResult<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim_start_matches('/'))
        .map_err(|e| GondorError::Config(format!("invalid endpoint path '{}': {}", path, e)))
}

/// Authenticated client for the Gondor API.
pub struct ApiClient {
    http: Client,
    endpoint: Url,
    credentials: Credentials,
}

impl ApiClient {
    pub fn new(endpoint: Url, credentials: Credentials) -> GondorResult<Self> {
        let http = Client::builder()
            .user_agent(format!("gondor/{}", CLIENT_VERSION))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None::<Duration>)
            .build()?;
        Ok(Self {
            http,
            endpoint,
            credentials,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request(&self, path: &str) -> GondorResult<RequestBuilder> {
        let url = endpoint_url(&self.endpoint, path)?;
        debug!(%url, "POST");
        Ok(self.http.post(url).basic_auth(
            &self.credentials.username,
            Some(&self.credentials.password),
        ))
    }

    fn send(&self, request: RequestBuilder) -> GondorResult<ApiResponse> {
        let response = request.send()?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().unwrap_or_default();
            return Err(GondorError::Http {
                status: status.as_u16(),
                body,
            });
        }
        let text = response.text()?;
        debug!(status = status.as_u16(), bytes = text.len(), "response received");
        ApiResponse::from_json(&text)
    }
}

impl RemoteApi for ApiClient {
    fn post_form(&self, path: &str, fields: &FormFields) -> GondorResult<ApiResponse> {
        let fields = fields.with_version(CLIENT_VERSION);
        let request = self
            .request(path)?
            .timeout(FORM_TIMEOUT)
            .form(fields.pairs());
        self.send(request)
    }

    fn post_multipart(
        &self,
        path: &str,
        fields: &FormFields,
        upload: Option<Upload>,
    ) -> GondorResult<ApiResponse> {
        let fields = fields.with_version(CLIENT_VERSION);
        let mut form = multipart::Form::new();
        for (key, value) in fields.pairs() {
            form = form.text(key.clone(), value.clone());
        }

        let cancel = upload.as_ref().map(|u| u.cancel.clone());
        if let Some(upload) = upload {
            let (reader, length) = upload.open()?;
            debug!(file = %upload.path.display(), length, "attaching upload");
            let part = multipart::Part::reader_with_length(reader, length)
                .file_name(upload.file_name.clone());
            form = form.part(upload.field.clone(), part);
        }

        let request = self.request(path)?.multipart(form);
        match self.send(request) {
            Err(_) if cancel.as_ref().is_some_and(|c| c.is_cancelled()) => {
                Err(GondorError::Interrupted)
            }
            other => other,
        }
    }

    fn download(&self, url: &str) -> GondorResult<Box<dyn Read + Send>> {
        debug!(%url, "GET");
        let response = self.http.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GondorError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(Box::new(response))
    }
}
