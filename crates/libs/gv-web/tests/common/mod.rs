use std::{fs, net::SocketAddr, path::Path};

use gv_store::store::RunStore;
use gv_web::api::{AppState, setup_api};
use reqwest::Response;
use serde_json::json;
use tempfile::TempDir;

pub const RUN: &str = "run-20240101T120000Z";
pub const IMAGE_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake";
pub const MAX_AGE_S: u64 = 600;

/// A storage root with one complete run and a few decoys, served on an ephemeral port.
pub struct TestServer {
    pub root: TempDir,
    pub addr: SocketAddr,
}

fn write_fixture(root: &Path) {
    let run_dir = root.join(RUN);
    fs::create_dir_all(run_dir.join("images")).expect("Failed to create run dir");
    fs::write(
        run_dir.join("run.json"),
        json!({
            "run_id": "20240101T120000Z-abcd1234",
            "created_at": "2024-01-01T12:00:00+00:00",
            "dry_run": false,
            "selection": {"x_indexes": [0, 1], "y_indexes": [0], "x_count": 2, "y_count": 1}
        })
        .to_string(),
    )
    .expect("Failed to write descriptor");
    fs::write(
        run_dir.join("metadata.jsonl"),
        [
            json!({"x_index": 0, "y_index": 0, "status": "success", "y_value": "artist:a",
                   "x_fields": {"characters": "miku"},
                   "local_image_paths": ["images/x0-y0.png"]})
            .to_string(),
            String::from("{\"x_index\": 1, \"y_index\""),
        ]
        .join("\n"),
    )
    .expect("Failed to write event log");
    fs::write(run_dir.join("images/x0-y0.png"), IMAGE_BYTES).expect("Failed to write image");

    // Well-formed identifier, no descriptor.
    fs::create_dir(root.join("run-20240202T000000Z")).expect("Failed to create decoy");
    // Not a run identifier at all.
    fs::create_dir(root.join("scratch")).expect("Failed to create decoy");
    fs::write(root.join("secret.txt"), b"secret").expect("Failed to write secret");
}

impl TestServer {
    pub async fn start() -> Self {
        let root = tempfile::tempdir().expect("Failed to create storage root");
        write_fixture(root.path());
        let state = AppState::new(RunStore::new(root.path()), MAX_AGE_S);
        let bind = "127.0.0.1:0".parse().expect("Invalid bind address");
        let (addr, _handle) = setup_api(state, bind)
            .await
            .expect("Failed to start server");
        Self { root, addr }
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("http://{}/{endpoint}", self.addr)
    }

    pub async fn get(&self, endpoint: &str) -> Response {
        reqwest::get(self.url(endpoint))
            .await
            .expect("Failed to send http request")
    }
}
