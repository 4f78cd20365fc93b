// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiError;

/// What the server answered for one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	pub status: u16,
}

impl ApiResponse {
	pub fn new(status: u16) -> Self {
		Self { status }
	}

	/// 2xx statuses confirm the mutation was applied.
	pub fn is_success(&self) -> bool {
		(200..=299).contains(&self.status)
	}
}

/// Remote API the sync engine replays queued operations against.
///
/// Replays are at-least-once, so implementations must tolerate receiving the
/// same operation twice.
#[async_trait]
pub trait ApiClient: Send + Sync {
	async fn post(&self, endpoint: &str, payload: &Value) -> Result<ApiResponse, ApiError>;
	async fn put(&self, endpoint: &str, payload: &Value) -> Result<ApiResponse, ApiError>;
	async fn delete(&self, endpoint: &str) -> Result<ApiResponse, ApiError>;
}
