//! Canned JSON-RPC node for exercising the client over a real socket.

use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

type Handler = Arc<dyn Fn(&str, &Value) -> Result<Value, Value> + Send + Sync>;

/// HTTP server answering each JSON-RPC method through a handler.
///
/// The handler returns the `result` on `Ok` and the `error` object on `Err`.
pub struct TestNode {
	url: String,
	hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl TestNode {
	pub async fn start<F>(handler: F) -> Self
	where
		F: Fn(&str, &Value) -> Result<Value, Value> + Send + Sync + 'static,
	{
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let url = format!("http://{}", listener.local_addr().unwrap());
		let hits = Arc::new(Mutex::new(HashMap::new()));
		let handler: Handler = Arc::new(handler);

		let served = hits.clone();
		tokio::spawn(async move {
			while let Ok((stream, _)) = listener.accept().await {
				tokio::spawn(serve(stream, handler.clone(), served.clone()));
			}
		});

		Self { url, hits }
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	/// Number of requests received for `method`.
	pub fn hits(&self, method: &str) -> usize {
		self.hits
			.lock()
			.unwrap()
			.get(method)
			.copied()
			.unwrap_or(0)
	}
}

async fn serve(stream: TcpStream, handler: Handler, hits: Arc<Mutex<HashMap<String, usize>>>) {
	let mut reader = BufReader::new(stream);

	loop {
		let mut content_length = 0;
		let mut line = String::new();
		// request line, then headers
		loop {
			line.clear();
			match reader.read_line(&mut line).await {
				Ok(0) | Err(_) => return,
				Ok(_) => {}
			}
			let header = line.trim_end();
			if header.is_empty() {
				break;
			}
			if let Some((name, value)) = header.split_once(':') {
				if name.eq_ignore_ascii_case("content-length") {
					content_length = value.trim().parse().unwrap_or(0);
				}
			}
		}

		let mut body = vec![0u8; content_length];
		if reader.read_exact(&mut body).await.is_err() {
			return;
		}
		let request: Value = serde_json::from_slice(&body).unwrap();
		let method = request["method"].as_str().unwrap_or_default().to_string();
		*hits.lock().unwrap().entry(method.clone()).or_insert(0) += 1;

		let response = match handler(&method, &request["params"]) {
			Ok(result) => json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }),
			Err(error) => json!({ "jsonrpc": "2.0", "id": request["id"], "error": error }),
		};
		let payload = response.to_string();
		let reply = format!(
			"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
			payload.len(),
			payload
		);
		if reader.get_mut().write_all(reply.as_bytes()).await.is_err() {
			return;
		}
	}
}

/// `0x`-prefixed 32-byte hash whose low bits are `n`.
pub fn hash(n: u64) -> String {
	format!("0x{:064x}", n)
}

/// Receipt as a node returns it.
pub fn receipt(block: u64, status: u64) -> Value {
	json!({
		"transactionHash": hash(0xbeef),
		"transactionIndex": "0x0",
		"blockHash": hash(block),
		"blockNumber": format!("0x{:x}", block),
		"from": format!("0x{:040x}", 0x0d),
		"to": format!("0x{:040x}", 0x5a),
		"cumulativeGasUsed": "0x5208",
		"gasUsed": "0x5208",
		"contractAddress": null,
		"logs": [],
		"status": format!("0x{:x}", status),
		"root": null,
		"logsBloom": format!("0x{}", "0".repeat(512)),
		"type": "0x2",
		"effectiveGasPrice": "0x3b9aca00"
	})
}

/// Error object of a reverted call.
pub fn revert() -> Value {
	json!({ "code": 3, "message": "execution reverted", "data": "0x" })
}
