//! Merging of roster entries with their cached node data.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::compat::GpuCompatibility;
use crate::schema::{ConnectivityCheck, GpuDevice, NodeDescriptor, SystemUsage};
use crate::{DataCache, NodeRecord};

/// Tracing target for response assembly.
const TRACING_TARGET: &str = "nodelist_cache::assemble";

/// Externally served view of the fleet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Time of the last successful roster fetch.
    pub last_refresh: Option<Timestamp>,
    /// One object per node, in roster order.
    pub crns: Vec<serde_json::Value>,
}

impl Snapshot {
    /// Returns the entry for the node `hash`, if present.
    pub fn node(&self, hash: &str) -> Option<&serde_json::Value> {
        self.crns
            .iter()
            .find(|entry| entry.get("hash").and_then(serde_json::Value::as_str) == Some(hash))
    }
}

/// Descriptor fields followed by the data derived from the node record.
#[derive(Serialize)]
struct NodeEntry<'a> {
    #[serde(flatten)]
    descriptor: &'a NodeDescriptor,
    config_from_crn: bool,
    debug_config_from_crn_at: Option<Timestamp>,
    debug_config_from_crn_error: Option<&'a str>,
    gpu_support: Option<bool>,
    confidential_support: Option<bool>,
    qemu_support: Option<bool>,
    payment_receiver_address: Option<&'a str>,
    version: Option<&'a str>,
    system_usage: Option<&'a SystemUsage>,
    debug_system_usage_at: Option<Timestamp>,
    debug_system_usage_error: Option<&'a str>,
    ipv6_check: Option<&'a ConnectivityCheck>,
    debug_ipv6_check_at: Option<Timestamp>,
    debug_ipv6_check_error: Option<&'a str>,
    compatible_gpus: Vec<&'a GpuDevice>,
    compatible_available_gpus: Vec<&'a GpuDevice>,
}

impl<'a> NodeEntry<'a> {
    fn new(
        descriptor: &'a NodeDescriptor,
        record: &'a NodeRecord,
        compatibility: Option<&GpuCompatibility>,
    ) -> Self {
        let usage = record.system_info.data.as_ref();
        let (compatible_gpus, compatible_available_gpus) = match (usage, compatibility) {
            (Some(usage), Some(compatibility)) => (
                compatibility.filter(usage.devices()),
                compatibility.filter(usage.available_devices()),
            ),
            _ => (Vec::new(), Vec::new()),
        };

        Self {
            descriptor,
            config_from_crn: record.config.has_data(),
            debug_config_from_crn_at: record.config.fetched_at,
            debug_config_from_crn_error: record.config.error_message(),
            gpu_support: record.gpu_support(),
            confidential_support: record.confidential_support(),
            qemu_support: record.qemu_support(),
            payment_receiver_address: record.payment_receiver_address(),
            version: record.version(),
            system_usage: usage,
            debug_system_usage_at: record.system_info.fetched_at,
            debug_system_usage_error: record.system_info.error_message(),
            ipv6_check: record.connectivity_check.data.as_ref(),
            debug_ipv6_check_at: record.connectivity_check.fetched_at,
            debug_ipv6_check_error: record.connectivity_check.error_message(),
            compatible_gpus,
            compatible_available_gpus,
        }
    }
}

impl DataCache {
    /// Builds the served snapshot from the current cache state.
    ///
    /// Reads whatever the last cycle committed and never triggers a node
    /// fetch. Only the compatibility list may be refetched, on its own timer.
    /// When `filter_inactive` is set, nodes with `inactive_since` are skipped.
    pub async fn assemble(&self, filter_inactive: bool) -> Snapshot {
        let compatibility = self.inner.compatibility.get().await;
        if compatibility.is_none() {
            tracing::error!(
                target: TRACING_TARGET,
                "No settings aggregate, cannot filter GPU devices"
            );
        }

        let roster = self.inner.roster.read().await;
        let nodes = self.inner.nodes.read().await;
        let empty = NodeRecord::default();

        let descriptors = roster.data.as_ref().map(|r| r.nodes()).unwrap_or_default();
        let mut crns = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            if filter_inactive && !descriptor.is_active() {
                continue;
            }

            let record = nodes.get(&descriptor.hash).unwrap_or(&empty);
            let entry = NodeEntry::new(descriptor, record, compatibility.as_ref());
            match serde_json::to_value(&entry) {
                Ok(value) => crns.push(value),
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        node = %descriptor.hash,
                        error = %error,
                        "Omitting node that failed to serialize"
                    );
                }
            }
        }

        tracing::debug!(
            target: TRACING_TARGET,
            nodes = crns.len(),
            filter_inactive,
            "Assembled snapshot"
        );

        Snapshot {
            last_refresh: roster.fetched_at,
            crns,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ErrorInfo;
    use crate::schema::Settings;

    fn descriptor() -> NodeDescriptor {
        serde_json::from_value(json!({
            "hash": "e9423d9f",
            "name": "gpu-test-02",
            "address": "https://gpu-test-02.nergame.app/",
            "score": 0.9,
            "owner": "0x1234",
            "inactive_since": null
        }))
        .unwrap()
    }

    fn compatibility() -> GpuCompatibility {
        let settings: Settings = serde_json::from_value(json!({
            "compatible_standard_gpus": [{ "vendor_id": "10de", "device_id": "27b0" }]
        }))
        .unwrap();
        GpuCompatibility::from_settings(&settings)
    }

    #[test]
    fn test_entry_without_data() {
        let descriptor = descriptor();
        let record = NodeRecord::default();
        let value = serde_json::to_value(NodeEntry::new(&descriptor, &record, None)).unwrap();

        assert_eq!(value["hash"], "e9423d9f");
        assert_eq!(value["owner"], "0x1234");
        assert_eq!(value["config_from_crn"], false);
        assert!(value["debug_config_from_crn_at"].is_null());
        assert!(value["debug_config_from_crn_error"].is_null());
        assert!(value["gpu_support"].is_null());
        assert!(value["system_usage"].is_null());
        assert!(value["ipv6_check"].is_null());
        assert_eq!(value["compatible_gpus"], json!([]));
        assert_eq!(value["compatible_available_gpus"], json!([]));
    }

    #[test]
    fn test_entry_with_data() {
        let descriptor = descriptor();
        let mut record = NodeRecord::new(&descriptor.address);
        record.config.set_data(
            serde_json::from_value(json!({
                "version": "1.3.0-41-g7303587",
                "computing": { "ENABLE_GPU_SUPPORT": true, "ENABLE_QEMU_SUPPORT": false }
            }))
            .unwrap(),
        );
        record.system_info.set_data(
            serde_json::from_value(json!({
                "gpu": {
                    "devices": [
                        { "vendor": "NVIDIA", "device_id": "10de:27b0" },
                        { "vendor": "unknown", "device_id": "1111:1111" }
                    ],
                    "available_devices": [{ "vendor": "NVIDIA", "device_id": "10de:27b0" }]
                }
            }))
            .unwrap(),
        );
        record.connectivity_check.set_error(ErrorInfo::new(
            nodelist_reqwest::ErrorKind::Timeout,
            "timed out",
        ));

        let compatibility = compatibility();
        let value =
            serde_json::to_value(NodeEntry::new(&descriptor, &record, Some(&compatibility)))
                .unwrap();

        assert_eq!(value["config_from_crn"], true);
        assert!(value["debug_config_from_crn_at"].is_string());
        assert_eq!(value["gpu_support"], true);
        assert_eq!(value["qemu_support"], false);
        assert!(value["confidential_support"].is_null());
        assert_eq!(value["version"], "1.3.0-41-g7303587");
        assert_eq!(value["compatible_gpus"].as_array().unwrap().len(), 1);
        assert_eq!(value["compatible_gpus"][0]["device_id"], "10de:27b0");
        assert_eq!(value["compatible_available_gpus"].as_array().unwrap().len(), 1);
        assert!(value["ipv6_check"].is_null());
        assert_eq!(value["debug_ipv6_check_error"], "timed out");
    }

    #[test]
    fn test_no_compatibility_list_yields_empty_lists() {
        let descriptor = descriptor();
        let mut record = NodeRecord::default();
        record.system_info.set_data(
            serde_json::from_value(json!({
                "gpu": { "devices": [{ "device_id": "10de:27b0" }], "available_devices": [] }
            }))
            .unwrap(),
        );

        let value = serde_json::to_value(NodeEntry::new(&descriptor, &record, None)).unwrap();
        assert_eq!(value["compatible_gpus"], json!([]));
        assert_eq!(value["system_usage"]["gpu"]["devices"][0]["device_id"], "10de:27b0");
    }

    #[test]
    fn test_snapshot_lookup() {
        let snapshot = Snapshot {
            last_refresh: None,
            crns: vec![json!({ "hash": "a" }), json!({ "hash": "b" })],
        };
        assert!(snapshot.node("b").is_some());
        assert!(snapshot.node("c").is_none());
    }
}
