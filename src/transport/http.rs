use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::Proxy;
use serde_json::Value;
use std::env;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::sigv4::{AwsCredentials, Signer};
use super::TransportError;
use crate::api::{ComprehendApi, Operation, Service};
use crate::error_code::ComprehendErrorCode;
use crate::{Error, ErrorContext, Result};

const AMZ_JSON: &str = "application/x-amz-json-1.1";

#[derive(Debug, Clone, Default)]
pub struct HttpClientConfig {
    pub region: String,
    /// Replaces the per-service `https://<service>.<region>.amazonaws.com/` endpoint.
    pub endpoint: Option<String>,
    pub timeout: Option<Duration>,
    /// Falls back to the `AWS_*` environment variables when unset.
    pub credentials: Option<AwsCredentials>,
}

impl HttpClientConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_credentials(mut self, credentials: AwsCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// reqwest client speaking the AWS JSON 1.1 protocol.
pub struct HttpComprehendClient {
    client: reqwest::Client,
    region: String,
    endpoint: Option<Url>,
    credentials: AwsCredentials,
    timeout: Duration,
}

impl HttpComprehendClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let ctx = || ErrorContext::new().with_source("http_client");

        let credentials = config.credentials.or_else(AwsCredentials::from_env).ok_or_else(|| {
            Error::configuration_with_context(
                "No AWS credentials configured and AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY are not set",
                ctx().with_field_path("api_configuration_preset.aws_access_key"),
            )
        })?;

        if config.region.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "AWS region is empty",
                ctx().with_field_path("api_configuration_preset.aws_region"),
            ));
        }

        let endpoint = config
            .endpoint
            .or_else(|| env::var("COMPREHEND_ENDPOINT_URL").ok())
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                Url::parse(&s).map_err(|e| {
                    Error::configuration_with_context(
                        format!("Invalid endpoint URL '{}': {}", s, e),
                        ctx().with_field_path("api_configuration_preset.endpoint_url"),
                    )
                })
            })
            .transpose()?;

        let timeout = config.timeout.unwrap_or_else(|| {
            Duration::from_secs(
                env::var("COMPREHEND_HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(30),
            )
        });

        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(
                env::var("COMPREHEND_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("COMPREHEND_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            region: config.region,
            endpoint,
            credentials,
            timeout,
        })
    }

    fn endpoint_for(&self, service: Service) -> Result<Url> {
        match &self.endpoint {
            Some(url) => Ok(url.clone()),
            None => Url::parse(&service.default_endpoint(&self.region)).map_err(|e| {
                Error::configuration_with_context(
                    format!("Cannot build endpoint for region '{}': {}", self.region, e),
                    ErrorContext::new().with_field_path("api_configuration_preset.aws_region"),
                )
            }),
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Transport(TransportError::Timeout(self.timeout.as_millis() as u64))
        } else {
            Error::Transport(TransportError::Http(e))
        }
    }
}

/// Turns a non-2xx AWS JSON response into [`Error::Remote`].
pub(crate) fn classify_error(status: u16, header_type: Option<&str>, body: &str) -> Error {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let raw_type = parsed
        .as_ref()
        .and_then(|v| v.get("__type"))
        .and_then(Value::as_str)
        .or(header_type)
        .unwrap_or_default();
    let provider_type = raw_type
        .rsplit('#')
        .next()
        .unwrap_or_default()
        .split(':')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("Message")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string());

    let code = match ComprehendErrorCode::from_provider_code(&provider_type) {
        ComprehendErrorCode::Unknown => ComprehendErrorCode::from_http_status(status),
        code => code,
    };
    let provider_type = if provider_type.is_empty() {
        code.name().to_string()
    } else {
        provider_type
    };

    Error::Remote {
        status,
        code,
        provider_type,
        message,
    }
}

#[async_trait]
impl ComprehendApi for HttpComprehendClient {
    async fn invoke(&self, operation: Operation, payload: Value) -> Result<Value> {
        let service = operation.service();
        let url = self.endpoint_for(service)?;
        let body = serde_json::to_vec(&payload)?;
        let target = operation.target();

        let signer = Signer {
            credentials: &self.credentials,
            region: &self.region,
            service: service.signing_name(),
        };
        let signed = signer.sign(
            "POST",
            &url,
            &[("content-type", AMZ_JSON), ("x-amz-target", &target)],
            &body,
            Utc::now(),
        )?;

        let invocation_id = uuid::Uuid::new_v4().to_string();
        debug!(operation = operation.name(), invocation_id = %invocation_id, bytes = body.len(), "invoking Comprehend");

        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, AMZ_JSON)
            .header("x-amz-target", &target)
            .header("amz-sdk-invocation-id", &invocation_id);
        for (name, value) in signed {
            request = request.header(name, value);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let header_type = response
            .headers()
            .get("x-amzn-errortype")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let err = classify_error(status.as_u16(), header_type.as_deref(), &text);
            debug!(operation = operation.name(), invocation_id = %invocation_id, error = %err, "Comprehend call failed");
            return Err(err);
        }

        if text.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(&text).map_err(|e| Error::MalformedResponse {
            message: format!("{} returned invalid JSON: {}", operation, e),
            raw: text,
        })
    }
}
