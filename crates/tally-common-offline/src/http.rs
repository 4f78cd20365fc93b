// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::api::{ApiClient, ApiResponse};
use crate::error::ApiError;

/// [`ApiClient`] that talks to the dashboard REST API over HTTP.
///
/// Sends each request exactly once; retrying is the sync engine's job, on
/// its next run.
pub struct HttpApiClient {
	base_url: Url,
	http: reqwest::Client,
	auth_token: Option<String>,
}

impl HttpApiClient {
	pub fn new(mut base_url: Url, http: reqwest::Client) -> Self {
		// Url::join drops the last path segment unless it ends with '/'.
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());
			base_url.set_path(&path);
		}

		Self {
			base_url,
			http,
			auth_token: None,
		}
	}

	/// Parse `base_url` and build a client with the shared User-Agent and `timeout`.
	pub fn from_base_url(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
		let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
		let http = tally_common_http::new_client_with_timeout(timeout)?;
		Ok(Self::new(base_url, http))
	}

	pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
		self.auth_token = Some(token.into());
		self
	}

	fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
		if let Some(token) = &self.auth_token {
			req.bearer_auth(token)
		} else {
			req
		}
	}

	/// Resolve a logical endpoint such as `/projects/42` under the base URL.
	pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, ApiError> {
		self
			.base_url
			.join(endpoint.trim_start_matches('/'))
			.map_err(|e| ApiError::InvalidUrl(e.to_string()))
	}

	async fn send(&self, req: reqwest::RequestBuilder) -> Result<ApiResponse, ApiError> {
		let response = self.apply_auth(req).send().await.map_err(|e| {
			if e.is_timeout() {
				ApiError::Timeout
			} else {
				ApiError::Network(e)
			}
		})?;

		Ok(ApiResponse::new(response.status().as_u16()))
	}
}

#[async_trait]
impl ApiClient for HttpApiClient {
	async fn post(&self, endpoint: &str, payload: &Value) -> Result<ApiResponse, ApiError> {
		let url = self.endpoint_url(endpoint)?;
		debug!(url = %url, "POST");
		self.send(self.http.post(url).json(payload)).await
	}

	async fn put(&self, endpoint: &str, payload: &Value) -> Result<ApiResponse, ApiError> {
		let url = self.endpoint_url(endpoint)?;
		debug!(url = %url, "PUT");
		self.send(self.http.put(url).json(payload)).await
	}

	async fn delete(&self, endpoint: &str) -> Result<ApiResponse, ApiError> {
		let url = self.endpoint_url(endpoint)?;
		debug!(url = %url, "DELETE");
		self.send(self.http.delete(url)).await
	}
}
