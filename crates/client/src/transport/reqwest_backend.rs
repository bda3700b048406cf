use std::error::Error as StdError;
use std::io;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use wire::{FailureKind, Method, RawResponse, SendFailure};

use super::{HttpBackend, HttpRequest};
use crate::config::{ClientConfig, ConfigError};

/// Blocking HTTP backend built on `reqwest`.
///
/// The per-request timeout from [`HttpRequest::timeout`] bounds the whole
/// exchange; the connect timeout comes from the [`ClientConfig`].
#[derive(Clone, Debug)]
pub struct ReqwestBackend {
    client: Client,
}

impl ReqwestBackend {
    /// Builds a backend using the connect timeout and user agent from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent())
            .build()
            .map_err(|error| ConfigError::HttpClient(error.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpBackend for ReqwestBackend {
    fn execute(&self, request: &HttpRequest) -> Result<RawResponse, SendFailure> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, request.url.clone())
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let response = builder.send().map_err(|error| map_error(&error))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().map_err(|error| map_error(&error))?;

        Ok(RawResponse::new(status, content_type, body.to_vec()))
    }
}

fn map_error(error: &reqwest::Error) -> SendFailure {
    let kind = if error.is_timeout() {
        FailureKind::Timeout
    } else if connection_dropped(error) {
        FailureKind::ConnectionReset
    } else {
        FailureKind::ConnectionFailed
    };
    SendFailure::new(kind, describe(error))
}

/// Walks the source chain looking for an I/O error that means the peer went away.
fn connection_dropped(error: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(io_error) = err.downcast_ref::<io::Error>()
            && matches!(
                io_error.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            )
        {
            return true;
        }
        current = err.source();
    }
    false
}

fn describe(error: &reqwest::Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
