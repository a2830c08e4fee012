#![allow(dead_code)]

use std::fs;
use std::process::{Command, Output};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Helper struct to run foodshare commands in an isolated temp directory
pub struct FoodshareTest {
    pub temp_dir: TempDir,
    binary_path: String,
}

impl FoodshareTest {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let binary_path = if cfg!(debug_assertions) {
            concat!(env!("CARGO_MANIFEST_DIR"), "/target/debug/foodshare")
        } else {
            concat!(env!("CARGO_MANIFEST_DIR"), "/target/release/foodshare")
        };

        let binary_path = if std::path::Path::new(binary_path).exists() {
            binary_path.to_string()
        } else {
            env!("CARGO_BIN_EXE_foodshare").to_string()
        };

        FoodshareTest {
            temp_dir,
            binary_path,
        }
    }

    pub fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(&self.binary_path);
        command
            .args(args)
            .current_dir(self.temp_dir.path())
            .env_remove("FOODSHARE_BASE_URL")
            .env_remove("FOODSHARE_LOG");
        command
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.command(args)
            .output()
            .expect("Failed to execute foodshare command")
    }

    /// Run a command without blocking the async runtime serving it
    pub async fn run_async(&self, args: &[&str]) -> Output {
        let mut command = self.command(args);
        tokio::task::spawn_blocking(move || command.output())
            .await
            .expect("Command task panicked")
            .expect("Failed to execute foodshare command")
    }

    pub async fn run_success_async(&self, args: &[&str]) -> String {
        let output = self.run_async(args).await;
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub async fn run_failure_async(&self, args: &[&str]) -> String {
        let output = self.run_async(args).await;
        assert!(
            !output.status.success(),
            "Expected command {:?} to fail, but it succeeded",
            args
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    /// Point the config at a listings server
    pub fn use_server(&self, server: &ListingsServer) {
        self.write_config(&format!("server:\n  base_url: {}\n", server.base_url));
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "Expected command {:?} to fail, but it succeeded",
            args
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    pub fn read_config(&self) -> String {
        let path = self.temp_dir.path().join(".foodshare").join("config.yaml");
        fs::read_to_string(path).expect("Failed to read config file")
    }

    pub fn write_config(&self, content: &str) {
        let dir = self.temp_dir.path().join(".foodshare");
        fs::create_dir_all(&dir).expect("Failed to create .foodshare directory");
        fs::write(dir.join("config.yaml"), content).expect("Failed to write config file");
    }
}

type Responder = dyn Fn(&Value) -> (u16, String) + Send + Sync;

/// Local HTTP server answering listings requests with canned replies
pub struct ListingsServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl ListingsServer {
    /// Serve `respond(body)` for every request body received
    pub async fn start(respond: impl Fn(&Value) -> (u16, String) + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listings server");
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let respond: Arc<Responder> = Arc::new(respond);

        tokio::spawn({
            let requests = Arc::clone(&requests);
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let requests = Arc::clone(&requests);
                    let respond = Arc::clone(&respond);
                    tokio::spawn(async move { answer(stream, requests, respond).await });
                }
            }
        });

        ListingsServer { base_url, requests }
    }

    /// Serve slices of `items` according to the paging fields of each request
    pub async fn paged(items: Vec<Value>) -> Self {
        Self::start(move |body| {
            let filters = &body["filters"];
            let offset = filters["retrievalOffset"].as_u64().unwrap_or(0) as usize;
            let amount = filters["retrievalAmount"].as_u64().unwrap_or(0) as usize;
            let start = offset.min(items.len());
            let end = (start + amount).min(items.len());
            let reply = json!({
                "listData": &items[start..end],
                "success": true,
                "message": "",
                "loginRequired": false,
                "signupConfirmRequired": false,
            });
            (200, reply.to_string())
        })
        .await
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().clone()
    }
}

/// A food listing as the server sends it
pub fn listing(id: u64) -> Value {
    json!({
        "id": id,
        "foodTitle": format!("Donation {id}"),
        "foodType": "produce",
        "perishable": id % 2 == 0,
        "quantity": 3.0,
        "unitLabel": "boxes",
        "expireDate": "2026-11-01",
        "donorName": "Community Garden",
    })
}

async fn answer(mut stream: TcpStream, requests: Arc<Mutex<Vec<Value>>>, respond: Arc<Responder>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < header_end + length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let body: Value =
        serde_json::from_slice(&buf[header_end..header_end + length]).unwrap_or(Value::Null);
    let (status, reply) = respond(&body);
    requests.lock().push(body);

    let response = format!(
        "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{reply}",
        reply.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}
