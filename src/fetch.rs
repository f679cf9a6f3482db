use crate::config::FetchConfig;
use crate::element::Element;
use crate::error::{RenderError, RenderResult};
use crate::resolver::{ComponentFetcher, RequestContext};
use std::time::Duration;

/// Fetches external components over HTTP(S).
///
/// Blocking: the render thread waits for the response. Do not call from
/// inside an async runtime worker.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> RenderResult<Self> {
        Self::from_config(&FetchConfig::default())
    }

    pub fn from_config(config: &FetchConfig) -> RenderResult<Self> {
        let mut builder = reqwest::blocking::Client::builder().user_agent(&config.user_agent);
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| RenderError::Config(format!("http client: {}", e)))?;
        Ok(Self { client })
    }
}

impl ComponentFetcher for HttpFetcher {
    fn fetch(&self, url: &str, request: &RequestContext) -> RenderResult<Element> {
        let mut outbound = self.client.get(url);
        for (name, value) in request.forwarded_headers() {
            outbound = outbound.header(name, value);
        }

        let response = outbound.send().map_err(|e| RenderError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().map_err(|e| RenderError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let element = decode_component(url, &body)?;
        tracing::debug!(url, kind = %element.kind, "fetched external component");
        Ok(element)
    }
}

/// Decode a fetched body as an element, naming the URL on failure
pub fn decode_component(url: &str, body: &[u8]) -> RenderResult<Element> {
    serde_json::from_slice(body).map_err(|e| RenderError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}
