// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Operator CLI for the Tally offline store and pending-operation queue.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tally_common_offline::{Collection, OperationMethod};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[command(
	name = "tally-offline",
	about = "Inspect and replay the Tally offline store",
	version
)]
struct Args {
	/// Config file (defaults to $XDG_CONFIG_HOME/tally/offline.toml)
	#[arg(long, global = true, env = "TALLY_OFFLINE_CONFIG")]
	config: Option<PathBuf>,

	/// Override the store's database file
	#[arg(long, global = true, conflicts_with = "database_url")]
	database_path: Option<PathBuf>,

	/// Override the store with an explicit `sqlite:` URL
	#[arg(long, global = true)]
	database_url: Option<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Create the store and its collections if missing
	Init,
	/// Write a JSON record (must carry an `id`) into a collection
	Put {
		collection: Collection,
		record: String,
	},
	/// Print one record, or the whole collection when no id is given
	Get {
		collection: Collection,
		id: Option<String>,
	},
	/// Delete a record by id
	Remove { collection: Collection, id: String },
	/// Append an operation to the pending queue
	Enqueue {
		/// Entity kind tag, e.g. `project`
		#[arg(long = "type")]
		op_type: String,
		/// CREATE/UPDATE/DELETE or POST/PUT/DELETE
		#[arg(long)]
		method: OperationMethod,
		#[arg(long)]
		endpoint: String,
		/// JSON payload
		#[arg(default_value = "{}")]
		payload: String,
	},
	/// List pending operations in replay order
	Pending,
	/// Drop one pending operation by sequence id
	Clear { sequence_id: i64 },
	/// Replay the pending queue against the remote API
	Sync {
		/// Treat the host as offline; the run is skipped
		#[arg(long)]
		offline: bool,
	},
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let mut config = match &args.config {
		Some(path) => tally_offline_config::load_config_with_file(path)?,
		None => tally_offline_config::load_config()?,
	};
	if let Some(path) = args.database_path.clone() {
		config.store.database_path = path;
		config.store.database_url = None;
	}
	if let Some(url) = args.database_url.clone() {
		config.store.database_url = Some(url);
	}

	// Stdout carries command output; logs go to stderr.
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	tracing::debug!(
			database = %config.store.location(),
			command = ?args.command,
			"starting tally-offline"
	);

	let store = commands::open_store(&config.store).await?;
	let mut out = std::io::stdout().lock();

	let result = match args.command {
		Command::Init => commands::init(&store, &mut out).await,
		Command::Put { collection, record } => {
			commands::put(&store, collection, &record, &mut out).await
		}
		Command::Get { collection, id } => {
			commands::get(&store, collection, id.as_deref(), &mut out).await
		}
		Command::Remove { collection, id } => {
			commands::remove(&store, collection, &id, &mut out).await
		}
		Command::Enqueue {
			op_type,
			method,
			endpoint,
			payload,
		} => commands::enqueue(&store, &op_type, method, &endpoint, &payload, &mut out).await,
		Command::Pending => commands::pending(&store, &mut out).await,
		Command::Clear { sequence_id } => commands::clear(&store, sequence_id, &mut out).await,
		Command::Sync { offline } => {
			commands::sync(store.clone(), &config.sync, offline, &mut out).await
		}
	};

	commands::close(&store).await;
	result
}
