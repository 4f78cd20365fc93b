// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::OfflineError;

/// Field every entity record must carry.
pub const ID_FIELD: &str = "id";

/// Entity collections cached locally, one durable table each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
	Projects,
	Revenue,
	Expenses,
	Billing,
	Collections,
}

impl Collection {
	pub const ALL: [Collection; 5] = [
		Collection::Projects,
		Collection::Revenue,
		Collection::Expenses,
		Collection::Billing,
		Collection::Collections,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Projects => "projects",
			Self::Revenue => "revenue",
			Self::Expenses => "expenses",
			Self::Billing => "billing",
			Self::Collections => "collections",
		}
	}
}

impl fmt::Display for Collection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Collection {
	type Err = OfflineError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| OfflineError::InvalidCollection(s.to_string()))
	}
}

/// Canonical string form of a record identifier.
///
/// Integer ids are stored by their decimal representation so `42` and `"42"`
/// address the same record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
	pub fn from_value(value: &Value) -> Result<Self, OfflineError> {
		match value {
			Value::String(s) if !s.is_empty() => Ok(Self(s.clone())),
			Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Self(n.to_string())),
			other => Err(OfflineError::InvalidRecord(format!(
				"identifier must be a non-empty string or an integer, got {other}"
			))),
		}
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for RecordKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for RecordKey {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

impl From<String> for RecordKey {
	fn from(s: String) -> Self {
		Self(s)
	}
}

impl From<i64> for RecordKey {
	fn from(n: i64) -> Self {
		Self(n.to_string())
	}
}

/// An opaque JSON object that carries an `id` field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct EntityRecord {
	key: RecordKey,
	fields: Map<String, Value>,
}

impl EntityRecord {
	pub fn new(value: Value) -> Result<Self, OfflineError> {
		let Value::Object(fields) = value else {
			return Err(OfflineError::InvalidRecord(
				"record must be a JSON object".to_string(),
			));
		};

		let id = fields.get(ID_FIELD).ok_or_else(|| {
			OfflineError::InvalidRecord(format!("record is missing the '{ID_FIELD}' field"))
		})?;
		let key = RecordKey::from_value(id)?;

		Ok(Self { key, fields })
	}

	pub fn key(&self) -> &RecordKey {
		&self.key
	}

	pub fn get(&self, field: &str) -> Option<&Value> {
		self.fields.get(field)
	}

	pub fn into_value(self) -> Value {
		Value::Object(self.fields)
	}
}

impl TryFrom<Value> for EntityRecord {
	type Error = OfflineError;

	fn try_from(value: Value) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

impl From<EntityRecord> for Value {
	fn from(record: EntityRecord) -> Self {
		record.into_value()
	}
}

/// Mutation intent carried by a queued operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationMethod {
	#[serde(rename = "POST", alias = "CREATE")]
	Create,
	#[serde(rename = "PUT", alias = "UPDATE")]
	Update,
	#[serde(rename = "DELETE")]
	Delete,
}

impl OperationMethod {
	pub fn http_verb(&self) -> &'static str {
		match self {
			Self::Create => "POST",
			Self::Update => "PUT",
			Self::Delete => "DELETE",
		}
	}
}

impl fmt::Display for OperationMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.http_verb())
	}
}

impl FromStr for OperationMethod {
	type Err = OfflineError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"POST" | "CREATE" => Ok(Self::Create),
			"PUT" | "UPDATE" => Ok(Self::Update),
			"DELETE" => Ok(Self::Delete),
			_ => Err(OfflineError::InvalidMethod(s.to_string())),
		}
	}
}

/// A queued, not-yet-confirmed mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
	pub sequence_id: i64,
	#[serde(rename = "type")]
	pub op_type: String,
	pub payload: Value,
	pub endpoint: String,
	pub method: OperationMethod,
	pub timestamp: DateTime<Utc>,
}
