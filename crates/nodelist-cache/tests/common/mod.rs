//! In-process mock of the aggregate API and a fleet of compute nodes.
//!
//! ```text
//! MockFleet::start(nodes)
//!   └─ TcpListener::bind("127.0.0.1:0")
//!   └─ axum::serve(listener, router)      (background task)
//!   └─ Arc<Mutex<FleetState>>             (responses, failures, hit counters)
//!
//! GET /api/v0/aggregates/{file}?keys=corechannel   roster built from `nodes`
//! GET /api/v0/aggregates/{file}?keys=settings      settings aggregate
//! GET /nodes/{name}/status/config
//! GET /nodes/{name}/about/usage/system
//! GET /nodes/{name}/status/check/ipv6
//! ```

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use nodelist_cache::{CacheConfig, DataCache};
use nodelist_reqwest::{
    ClientConfig, PATH_ABOUT_USAGE_SYSTEM, PATH_STATUS_CHECK_IPV6, PATH_STATUS_CONFIG,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const FIXTURE_HASH: &str = "e9423d9f1ad2c8e2e6c6a3b4e8a4a3b1f2d9c8e7a6b5c4d3e2f1a0b9c8d7e6f5";

/// One node served by the mock.
#[derive(Debug, Clone)]
pub struct MockNode {
    pub name: String,
    pub hash: String,
    pub score: f64,
    pub inactive_since: Option<u64>,
    /// Advertised address; defaults to the mock's own `/nodes/{name}`.
    pub address: Option<String>,
    pub config: Value,
    pub usage: Value,
    pub ipv6: Value,
}

impl MockNode {
    /// A healthy GPU node with the standard fixtures.
    pub fn gpu(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            hash: format!("hash-{name}"),
            score: 0.9,
            inactive_since: None,
            address: None,
            config: fixture_config(),
            usage: fixture_usage(),
            ipv6: json!({ "host": true, "vm": true }),
        }
    }

    pub fn with_hash(mut self, hash: &str) -> Self {
        self.hash = hash.to_owned();
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn inactive_since(mut self, height: u64) -> Self {
        self.inactive_since = Some(height);
        self
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.address = Some(address.to_owned());
        self
    }
}

pub fn fixture_config() -> Value {
    json!({
        "DOMAIN_NAME": "gpu-test-02.nergame.app",
        "version": "1.3.0-41-g7303587",
        "computing": {
            "ENABLE_QEMU_SUPPORT": true,
            "INSTANCE_DEFAULT_HYPERVISOR": "qemu",
            "ENABLE_CONFIDENTIAL_COMPUTING": false,
            "ENABLE_GPU_SUPPORT": true
        },
        "payment": {
            "PAYMENT_RECEIVER_ADDRESS": "0xA07B1214bAe0D5ccAA25449C3149c0aC83658874",
            "PAYMENT_MONITOR_INTERVAL": 60.0
        }
    })
}

pub fn fixture_usage() -> Value {
    json!({
        "cpu": { "count": 20, "load_average": { "load1": 2.28, "load5": 2.27, "load15": 2.27 } },
        "mem": { "total_kB": 67219543, "available_kB": 40982622 },
        "disk": { "total_kB": 1853812338, "available_kB": 1450697875 },
        "gpu": {
            "devices": [
                {
                    "vendor": "NVIDIA",
                    "device_name": "AD104GL [RTX 4000 SFF Ada Generation]",
                    "device_class": "0300",
                    "pci_host": "01:00.0",
                    "device_id": "10de:27b0"
                },
                {
                    "vendor": "unknown",
                    "device_name": "Unlisted accelerator",
                    "device_class": "0000",
                    "pci_host": "02:00.0",
                    "device_id": "1111:1111"
                }
            ],
            "available_devices": [
                {
                    "vendor": "unknown",
                    "device_name": "Unlisted accelerator",
                    "device_class": "0000",
                    "pci_host": "02:00.0",
                    "device_id": "1111:1111"
                }
            ]
        },
        "active": true
    })
}

pub fn fixture_settings() -> Value {
    json!({
        "address": "0xA07B1214bAe0D5ccAA25449C3149c0aC83658874",
        "data": {
            "settings": {
                "community_wallet_address": "0x5aBd3258C5492fD378EBC2e0017416E199e5Da56",
                "compatible_standard_gpus": [
                    { "vendor": "NVIDIA", "model": "RTX 4000 ADA", "name": "RTX 4000 SFF Ada Generation", "vendor_id": "10de", "device_id": "27b0" },
                    { "vendor": "NVIDIA", "model": "RTX 4090", "name": "RTX 4090", "vendor_id": "10de", "device_id": "2684" }
                ],
                "compatible_premium_gpus": [
                    { "vendor": "NVIDIA", "model": "H100", "name": "H100", "vendor_id": "10de", "device_id": "2336" }
                ]
            }
        },
        "info": {}
    })
}

#[derive(Debug)]
struct FleetState {
    base_url: String,
    nodes: Vec<MockNode>,
    raw_entries: Vec<Value>,
    roster_status: StatusCode,
    roster_delay: Duration,
    settings_status: StatusCode,
    node_delay: Duration,
    failures: HashMap<(String, String), StatusCode>,
    hits: HashMap<String, usize>,
}

impl FleetState {
    fn hit(&mut self, key: String) {
        *self.hits.entry(key).or_default() += 1;
    }

    fn roster(&self) -> Value {
        let mut nodes: Vec<Value> = self
            .nodes
            .iter()
            .map(|node| {
                let address = node
                    .address
                    .clone()
                    .unwrap_or_else(|| format!("{}/nodes/{}/", self.base_url, node.name));
                json!({
                    "hash": node.hash,
                    "name": node.name,
                    "address": address,
                    "score": node.score,
                    "owner": "0x7c1d8e3b3e58a9d2fb9e1f8e2ad0b6f2c3a1d4e5",
                    "status": "linked",
                    "locked": "",
                    "type": "compute",
                    "inactive_since": node.inactive_since,
                })
            })
            .collect();
        nodes.extend(self.raw_entries.iter().cloned());

        json!({
            "address": "0xa1B3bb7d2332383D96b7796B908fB7f7F3c2Be10",
            "data": { "corechannel": { "nodes": [], "resource_nodes": nodes } },
            "info": {}
        })
    }
}

type SharedState = Arc<Mutex<FleetState>>;

/// Running mock server.
pub struct MockFleet {
    addr: SocketAddr,
    state: SharedState,
}

impl MockFleet {
    pub async fn start(nodes: Vec<MockNode>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = Arc::new(Mutex::new(FleetState {
            base_url: format!("http://{addr}"),
            nodes,
            raw_entries: Vec::new(),
            roster_status: StatusCode::OK,
            roster_delay: Duration::ZERO,
            settings_status: StatusCode::OK,
            node_delay: Duration::ZERO,
            failures: HashMap::new(),
            hits: HashMap::new(),
        }));

        let router = Router::new()
            .route("/api/v0/aggregates/{file}", get(aggregate))
            .route(
                &format!("/nodes/{{name}}{PATH_STATUS_CONFIG}"),
                get(|state: State<SharedState>, name: Path<String>| {
                    endpoint(state, name, PATH_STATUS_CONFIG)
                }),
            )
            .route(
                &format!("/nodes/{{name}}{PATH_ABOUT_USAGE_SYSTEM}"),
                get(|state: State<SharedState>, name: Path<String>| {
                    endpoint(state, name, PATH_ABOUT_USAGE_SYSTEM)
                }),
            )
            .route(
                &format!("/nodes/{{name}}{PATH_STATUS_CHECK_IPV6}"),
                get(|state: State<SharedState>, name: Path<String>| {
                    endpoint(state, name, PATH_STATUS_CHECK_IPV6)
                }),
            )
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Cache configuration pointing at this mock.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::default().with_api_host(self.url())
    }

    /// Cache with a short client timeout and the given configuration.
    pub fn cache_with(&self, config: CacheConfig) -> DataCache {
        let client = ClientConfig::default()
            .with_timeout(5)
            .with_max_concurrent_fetches(16);
        DataCache::new(config, client).unwrap()
    }

    pub fn cache(&self) -> DataCache {
        self.cache_with(self.cache_config())
    }

    pub fn set_roster_status(&self, status: StatusCode) {
        self.state.lock().unwrap().roster_status = status;
    }

    pub fn set_roster_delay(&self, delay: Duration) {
        self.state.lock().unwrap().roster_delay = delay;
    }

    pub fn set_settings_status(&self, status: StatusCode) {
        self.state.lock().unwrap().settings_status = status;
    }

    pub fn set_node_delay(&self, delay: Duration) {
        self.state.lock().unwrap().node_delay = delay;
    }

    pub fn set_nodes(&self, nodes: Vec<MockNode>) {
        self.state.lock().unwrap().nodes = nodes;
    }

    /// Appends an arbitrary entry to the published roster.
    pub fn push_raw_entry(&self, entry: Value) {
        self.state.lock().unwrap().raw_entries.push(entry);
    }

    /// Makes `path` of node `name` answer with `status`.
    pub fn fail(&self, name: &str, path: &str, status: StatusCode) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert((name.to_owned(), path.to_owned()), status);
    }

    pub fn roster_hits(&self) -> usize {
        self.hits("corechannel")
    }

    pub fn settings_hits(&self) -> usize {
        self.hits("settings")
    }

    pub fn node_hits(&self, name: &str, path: &str) -> usize {
        self.hits(&format!("{name}{path}"))
    }

    fn hits(&self, key: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .hits
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}

async fn aggregate(
    State(state): State<SharedState>,
    Path(_file): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let key = query.get("keys").cloned().unwrap_or_default();

    let (status, delay, body) = {
        let mut state = state.lock().unwrap();
        state.hit(key.clone());
        match key.as_str() {
            "corechannel" => (state.roster_status, state.roster_delay, state.roster()),
            "settings" => (state.settings_status, Duration::ZERO, fixture_settings()),
            _ => (StatusCode::NOT_FOUND, Duration::ZERO, json!({})),
        }
    };

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    if status.is_success() {
        Json(body).into_response()
    } else {
        status.into_response()
    }
}

async fn endpoint(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    path: &'static str,
) -> Response {
    let (outcome, delay) = {
        let mut state = state.lock().unwrap();
        state.hit(format!("{name}{path}"));

        let failure = state.failures.get(&(name.clone(), path.to_owned())).copied();
        let node = state.nodes.iter().find(|node| node.name == name);
        let outcome = match (failure, node) {
            (Some(status), _) => Err(status),
            (None, None) => Err(StatusCode::NOT_FOUND),
            (None, Some(node)) => Ok(match path {
                PATH_STATUS_CONFIG => node.config.clone(),
                PATH_ABOUT_USAGE_SYSTEM => node.usage.clone(),
                _ => node.ipv6.clone(),
            }),
        };
        (outcome, state.node_delay)
    };

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    match outcome {
        Ok(body) => Json(body).into_response(),
        Err(status) => status.into_response(),
    }
}
