// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keeper_cli::config::{default_token_file, DEFAULT_ADDRESS};
use keeper_cli::{ClientConfig, Keeper, Mirror};
use keeper_common_crypto::FieldCipher;
use keeper_common_vault::SecretKind;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "keeper", version, about = "Keeper secret storage client", long_about = None)]
struct Args {
	/// Server address as host:port
	#[arg(long, short = 'a', env = "KEEPER_ADDRESS", default_value = DEFAULT_ADDRESS)]
	address: String,

	/// File holding the passphrase used to encrypt record fields
	#[arg(long, env = "KEEPER_CRYPTO_KEY_FILE")]
	crypto_key_file: Option<PathBuf>,

	/// How often `watch` asks for a fresh snapshot
	#[arg(long, env = "KEEPER_SYNC_INTERVAL", default_value = "3s", value_parser = humantime::parse_duration)]
	sync_interval: Duration,

	/// Where the bearer token is cached between runs
	#[arg(long, env = "KEEPER_TOKEN_FILE")]
	token_file: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Create an account and log in
	Register {
		login: String,
		#[arg(long, env = "KEEPER_PASSWORD")]
		password: String,
	},
	/// Log in and cache the token
	Login {
		login: String,
		#[arg(long, env = "KEEPER_PASSWORD")]
		password: String,
	},
	/// Forget the cached token
	Logout,
	/// Delete the account and everything it owns
	DeleteAccount {
		login: String,
		#[arg(long, env = "KEEPER_PASSWORD")]
		password: String,
	},
	/// Store a login/password pair
	PutPair {
		#[arg(long)]
		uid: Option<String>,
		#[arg(long = "type", default_value = "")]
		type_pair: String,
		name: String,
		password: String,
	},
	/// Store a text note
	PutNote {
		#[arg(long)]
		uid: Option<String>,
		text: String,
	},
	/// Store a bank card
	PutCard {
		#[arg(long)]
		uid: Option<String>,
		number: String,
		cvc: String,
		#[arg(long)]
		expiry: Option<String>,
	},
	/// Delete a record (kind: pairs, text, binary, card)
	Delete { kind: SecretKind, uid: String },
	/// Upload a file
	Upload {
		path: PathBuf,
		#[arg(long)]
		uid: Option<String>,
	},
	/// Download a file by uid
	Download { uid: String, dest: PathBuf },
	/// Print the current records
	List { kind: Option<SecretKind> },
	/// Keep printing records as the server reports changes
	Watch,
	/// Print build information
	Version,
}

fn init_tracing() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keeper=warn"));
	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr))
		.init();
}

fn print_mirror(mirror: &Mirror, kinds: &[SecretKind], cipher: &FieldCipher) {
	for kind in kinds {
		println!("{kind}");
		for (primary, secondary) in mirror.labels(*kind, cipher) {
			println!("  {primary:<38} {secondary}");
		}
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let _ = dotenvy::dotenv();
	let args = Args::parse();
	init_tracing();

	let config = ClientConfig {
		address: args.address,
		crypto_key_file: args.crypto_key_file,
		sync_interval: args.sync_interval,
		token_file: args.token_file.unwrap_or_else(default_token_file),
	};
	let keeper = Keeper::new(config);

	match args.command {
		Command::Version => println!("{}", keeper_common_version::format_build_info("keeper")),
		Command::Register { login, password } => {
			keeper.register(&login, &password).await.context("registration failed")?;
			println!("registered as {login}");
		}
		Command::Login { login, password } => {
			keeper.login(&login, &password).await.context("login failed")?;
			println!("logged in as {login}");
		}
		Command::Logout => keeper.logout()?,
		Command::DeleteAccount { login, password } => {
			keeper.delete_account(&login, &password).await.context("account deletion failed")?;
			println!("account {login} deleted");
		}
		Command::PutPair { uid, type_pair, name, password } => {
			let uid = keeper.put_pair(uid, &type_pair, &name, &password).await?;
			println!("{uid}");
		}
		Command::PutNote { uid, text } => {
			let uid = keeper.put_note(uid, &text).await?;
			println!("{uid}");
		}
		Command::PutCard { uid, number, cvc, expiry } => {
			let uid = keeper.put_card(uid, &number, &cvc, expiry).await?;
			println!("{uid}");
		}
		Command::Delete { kind, uid } => keeper.delete(kind, &uid).await?,
		Command::Upload { path, uid } => {
			let (uid, summary) = keeper
				.upload(&path, uid)
				.await
				.with_context(|| format!("upload of {} failed", path.display()))?;
			println!("{uid} ({} bytes in {} chunks)", summary.bytes, summary.chunks);
		}
		Command::Download { uid, dest } => {
			let summary = keeper.download(&uid, &dest).await.context("download failed")?;
			println!("{} ({} bytes)", dest.display(), summary.bytes);
		}
		Command::List { kind } => {
			let cipher = keeper.cipher()?;
			let mirror = keeper.snapshot().await?;
			let kinds = kind.map(|k| vec![k]).unwrap_or_else(|| SecretKind::ALL.to_vec());
			print_mirror(&mirror, &kinds, &cipher);
		}
		Command::Watch => {
			let cipher = keeper.cipher()?;
			let token = keeper.token()?;
			let mut mirror = Mirror::new();
			let shutdown = async {
				let _ = tokio::signal::ctrl_c().await;
			};
			info!("watching for changes");
			keeper_cli::sync::watch(keeper.config(), &token, &mut mirror, shutdown, |m| {
				println!("--- generation {}", m.generation());
				print_mirror(m, &SecretKind::ALL, &cipher);
			})
			.await?;
		}
	}
	Ok(())
}
