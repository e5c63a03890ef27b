// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sync and transfer sockets against a live listener.

mod support;

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use keeper_common_crypto::{decompress_or_raw, FieldCipher};
use keeper_common_vault::{plan_portions, reassemble, FileChunk, Secret, SecretKind, SnapshotFrame};
use keeper_server::ServerConfig;
use serde_json::json;
use support::TestApp;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderName;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: SocketAddr, path: &str, headers: &[(&str, &str)]) -> Result<Socket, WsError> {
	let mut request = format!("ws://{addr}{path}").into_client_request().unwrap();
	for (name, value) in headers {
		request
			.headers_mut()
			.insert(HeaderName::from_bytes(name.as_bytes()).unwrap(), value.parse().unwrap());
	}
	connect_async(request).await.map(|(socket, _)| socket)
}

/// Send the token and collect one full snapshot.
async fn snapshot(socket: &mut Socket, token: &str) -> Vec<SnapshotFrame> {
	socket.send(Message::Text(token.to_string())).await.unwrap();
	let mut frames = Vec::new();
	loop {
		let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
			.await
			.expect("snapshot frame in time")
			.expect("socket open")
			.unwrap();
		let Message::Binary(data) = msg else {
			continue;
		};
		let frame: SnapshotFrame = serde_json::from_slice(&decompress_or_raw(&data).unwrap()).unwrap();
		let done = frame.is_terminator();
		frames.push(frame);
		if done {
			return frames;
		}
	}
}

/// Read until the server's close frame and return its code and reason.
async fn server_close(socket: &mut Socket) -> (CloseCode, String) {
	loop {
		let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
			.await
			.expect("close frame in time");
		match msg {
			Some(Ok(Message::Close(Some(frame)))) => return (frame.code, frame.reason.to_string()),
			Some(Ok(Message::Close(None))) | None => panic!("closed without a reason"),
			Some(Ok(_)) => continue,
			Some(Err(e)) => panic!("socket error before close: {e}"),
		}
	}
}

fn chunk_frame(uid: &str, portion: u64) -> Message {
	let chunk = FileChunk {
		file_uid: uid.to_string(),
		portion,
		len: 1,
		body: format!("body-{portion}"),
	};
	Message::Binary(keeper_common_crypto::compress(&serde_json::to_vec(&chunk).unwrap()).unwrap())
}

async fn stage_file(app: &TestApp, token: &str, uid: &str) {
	app.post_json(
		"/api/user/binary",
		json!({ "uid": uid, "name": "a", "expansion": "bin", "size": 2, "patch": "/a.bin" }),
		Some(token),
	)
	.await;
}

fn records_of(frames: &[SnapshotFrame], kind: SecretKind) -> Vec<Secret> {
	frames
		.iter()
		.filter(|f| f.kind == kind.as_str())
		.flat_map(|f| f.clone().records().unwrap().map(|(_, r)| r).unwrap_or_default())
		.collect()
}

#[tokio::test]
async fn sync_sends_one_frame_per_kind_then_terminator() {
	let app = TestApp::new().await;
	let token = app.register("test", "secret").await;
	app.post_json("/api/user/text", json!({ "uid": "n1", "text": "enc" }), Some(&token))
		.await;
	app.flush().await;
	let addr = app.spawn().await;

	let mut socket = connect(addr, "/socket", &[]).await.unwrap();
	let frames = snapshot(&mut socket, &token).await;

	assert_eq!(frames.len(), 5);
	assert!(frames[4].is_terminator());
	let notes = records_of(&frames, SecretKind::Note);
	assert_eq!(notes.len(), 1);
	assert_eq!(notes[0].uid(), "n1");
	assert!(records_of(&frames, SecretKind::PaymentCard).is_empty());

	// Asking again on the same socket gets a fresh batch.
	assert_eq!(snapshot(&mut socket, &token).await.len(), 5);
}

#[tokio::test]
async fn staged_write_is_visible_within_a_few_flush_intervals() {
	let mut config = ServerConfig::default();
	config.flush.interval = Duration::from_millis(100);
	let app = TestApp::with_config(config).await;
	let token = app.register("test", "secret").await;
	let addr = app.spawn().await;
	let mut socket = connect(addr, "/socket", &[]).await.unwrap();

	let started = tokio::time::Instant::now();
	app.post_json(
		"/api/user/card",
		json!({ "uid": "c1", "number": "enc", "cvc": "enc", "date": "12/27" }),
		Some(&token),
	)
	.await;

	loop {
		let frames = snapshot(&mut socket, &token).await;
		if !records_of(&frames, SecretKind::PaymentCard).is_empty() {
			break;
		}
		assert!(started.elapsed() < Duration::from_secs(2), "write never became visible");
		tokio::time::sleep(Duration::from_millis(25)).await;
	}
}

#[tokio::test]
async fn sync_with_bad_token_is_closed() {
	let app = TestApp::new().await;
	let addr = app.spawn().await;
	let mut socket = connect(addr, "/socket", &[]).await.unwrap();

	socket.send(Message::Text("not-a-token".to_string())).await.unwrap();
	let msg = tokio::time::timeout(Duration::from_secs(5), socket.next()).await.unwrap();
	match msg {
		Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {}
		Some(Ok(other)) => panic!("expected close, got {other:?}"),
	}
}

#[tokio::test]
async fn upload_then_download_reconstructs_file() {
	let app = TestApp::new().await;
	let token = app.register("test", "secret").await;
	let addr = app.spawn().await;
	let cipher = FieldCipher::new("passphrase");
	let data: Vec<u8> = (0..1_100_000u32).map(|i| (i % 251) as u8).collect();

	app.post_json(
		"/api/user/binary",
		json!({ "uid": "f1", "name": "data", "expansion": "bin", "size": data.len(), "patch": "/data.bin" }),
		Some(&token),
	)
	.await;

	let mut upload = connect(addr, "/socket_file", &[("Authorization", token.as_str())]).await.unwrap();
	// Last block first; offsets carry the order.
	for (portion, len) in plan_portions(data.len() as u64, keeper_common_vault::BLOCK_SIZE).into_iter().rev() {
		let block = &data[portion as usize..(portion + len) as usize];
		let chunk = FileChunk {
			file_uid: "f1".to_string(),
			portion,
			len,
			body: cipher.encrypt(block).unwrap(),
		};
		let frame = keeper_common_crypto::compress(&serde_json::to_vec(&chunk).unwrap()).unwrap();
		upload.send(Message::Binary(frame)).await.unwrap();
	}
	upload.close(None).await.unwrap();
	while upload.next().await.is_some() {}

	let mut download = connect(addr, "/socket_download_file", &[("Authorization", token.as_str()), ("UID", "f1")])
		.await
		.unwrap();
	let mut blocks = Vec::new();
	while let Some(Ok(msg)) = download.next().await {
		if let Message::Binary(frame) = msg {
			let chunk: FileChunk = serde_json::from_slice(&decompress_or_raw(&frame).unwrap()).unwrap();
			let plain = cipher.decrypt(&chunk.body).unwrap();
			assert_eq!(plain.len() as u64, chunk.len);
			blocks.push((chunk.portion, plain));
		}
	}

	assert_eq!(blocks.len(), 3);
	let rebuilt = reassemble(blocks.iter().map(|(o, b)| (*o, b.as_slice())));
	assert_eq!(rebuilt, data);
}

#[tokio::test]
async fn transfer_sockets_check_ownership() {
	let app = TestApp::new().await;
	let alice = app.register("alice", "a").await;
	let bob = app.register("bob", "b").await;
	app.post_json(
		"/api/user/binary",
		json!({ "uid": "f1", "name": "a", "expansion": "txt", "size": 1, "patch": "/a" }),
		Some(&alice),
	)
	.await;
	let addr = app.spawn().await;

	match connect(addr, "/socket_download_file", &[("Authorization", bob.as_str()), ("UID", "f1")]).await {
		Err(WsError::Http(response)) => assert_eq!(response.status(), 409),
		other => panic!("expected rejected handshake, got {:?}", other.map(|_| ())),
	}
	match connect(addr, "/socket_file", &[]).await {
		Err(WsError::Http(response)) => assert_eq!(response.status(), 401),
		other => panic!("expected rejected handshake, got {:?}", other.map(|_| ())),
	}

	let mut upload = connect(addr, "/socket_file", &[("Authorization", bob.as_str())]).await.unwrap();
	let chunk = FileChunk {
		file_uid: "f1".to_string(),
		portion: 0,
		len: 1,
		body: "x".to_string(),
	};
	upload
		.send(Message::Text(serde_json::to_string(&chunk).unwrap()))
		.await
		.unwrap();
	let msg = tokio::time::timeout(Duration::from_secs(5), upload.next()).await.unwrap();
	assert!(matches!(msg, Some(Ok(Message::Close(_))) | None | Some(Err(_))));
	assert!(app.state.chunks.select_chunks("f1").await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_chunk_frame_aborts_upload() {
	let app = TestApp::new().await;
	let token = app.register("test", "secret").await;
	stage_file(&app, &token, "f1").await;
	let addr = app.spawn().await;

	let mut upload = connect(addr, "/socket_file", &[("Authorization", token.as_str())]).await.unwrap();
	upload.send(chunk_frame("f1", 0)).await.unwrap();
	upload.send(Message::Text("{not json".to_string())).await.unwrap();

	let (code, reason) = server_close(&mut upload).await;
	assert_eq!(code, CloseCode::Policy);
	assert_eq!(reason, "invalid_format");

	let portions: Vec<_> = app
		.state
		.chunks
		.select_chunks("f1")
		.await
		.unwrap()
		.into_iter()
		.map(|c| c.portion)
		.collect();
	assert_eq!(portions, vec![0]);
}

#[tokio::test]
async fn chunk_store_failure_aborts_upload() {
	let app = TestApp::new().await;
	let token = app.register("test", "secret").await;
	stage_file(&app, &token, "f1").await;
	let addr = app.spawn().await;
	sqlx::query("DROP TABLE file_chunks").execute(&app.state.pool).await.unwrap();

	let mut upload = connect(addr, "/socket_file", &[("Authorization", token.as_str())]).await.unwrap();
	upload.send(chunk_frame("f1", 0)).await.unwrap();

	let (code, reason) = server_close(&mut upload).await;
	assert_eq!(code, CloseCode::Error);
	assert_eq!(reason, "server_fault");
}

#[tokio::test]
async fn chunks_need_file_metadata() {
	let app = TestApp::new().await;
	let token = app.register("test", "secret").await;
	let addr = app.spawn().await;

	let mut upload = connect(addr, "/socket_file", &[("Authorization", token.as_str())]).await.unwrap();
	upload.send(chunk_frame("orphan", 0)).await.unwrap();

	let (code, reason) = server_close(&mut upload).await;
	assert_eq!(code, CloseCode::Policy);
	assert_eq!(reason, "no_content");
	assert!(app.state.chunks.select_chunks("orphan").await.unwrap().is_empty());
}

#[tokio::test]
async fn deleted_account_cannot_sync() {
	let app = TestApp::new().await;
	let token = app.register("test", "secret").await;
	app.state.users.delete_user("test").await.unwrap();
	let addr = app.spawn().await;

	let mut socket = connect(addr, "/socket", &[]).await.unwrap();
	socket.send(Message::Text(token.clone())).await.unwrap();
	let (code, reason) = server_close(&mut socket).await;
	assert_eq!(code, CloseCode::Policy);
	assert_eq!(reason, "unauthenticated");

	match connect(addr, "/socket_file", &[("Authorization", token.as_str())]).await {
		Err(WsError::Http(response)) => assert_eq!(response.status(), 401),
		other => panic!("expected rejected handshake, got {:?}", other.map(|_| ())),
	}
}
