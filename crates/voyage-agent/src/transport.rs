//! HTTP plumbing shared by the API client and the generator

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Proxy, Response};
use serde::de::DeserializeOwned;
use voyage_core::{ProxyAssignment, Result, VoyageError};

use crate::user_agent::random_user_agent;

/// Build a one-shot client: fresh random user agent, optional proxy for all traffic
pub fn build_client(proxy: Option<&ProxyAssignment>) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut builder = Client::builder()
        .user_agent(random_user_agent())
        .default_headers(headers);

    if let Some(proxy) = proxy {
        let proxy = Proxy::all(&proxy.uri).map_err(|e| {
            VoyageError::Config(format!("Invalid proxy {}: {}", proxy.uri, e))
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| VoyageError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Map a transport error
pub(crate) fn network_error(context: &str, err: reqwest::Error) -> VoyageError {
    VoyageError::Network(format!("{}: {}", context, err))
}

/// Check the status and decode the JSON body
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown".to_string());
        return Err(VoyageError::Status {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| VoyageError::Validation(format!("Failed to parse response: {}", e)))
}
