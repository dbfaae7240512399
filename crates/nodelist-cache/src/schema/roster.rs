//! Node roster published in the `corechannel` aggregate.

use serde::{Deserialize, Serialize};

use super::Extra;

/// Tracing target for roster decoding.
const TRACING_TARGET: &str = "nodelist_cache::schema::roster";

/// Full aggregate document as returned by the API.
///
/// Only `data.corechannel.resource_nodes` is interpreted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterDocument {
    data: Option<RosterData>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RosterData {
    corechannel: Option<CoreChannel>,
    #[serde(flatten)]
    extra: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct CoreChannel {
    /// Kept undecoded so that one malformed entry cannot reject the rest.
    resource_nodes: Option<Vec<serde_json::Value>>,
    #[serde(flatten)]
    extra: Extra,
}

impl RosterDocument {
    /// Extracts the roster, or `None` if the document does not carry one.
    ///
    /// Entries that do not decode as a [`NodeDescriptor`] are logged and
    /// skipped.
    pub fn into_roster(self) -> Option<Roster> {
        let entries = self.data?.corechannel?.resource_nodes?;
        let total = entries.len();

        let nodes: Vec<_> = entries
            .into_iter()
            .filter_map(|entry| {
                let hash = entry.get("hash").cloned();
                serde_json::from_value::<NodeDescriptor>(entry)
                    .inspect_err(|err| {
                        tracing::warn!(
                            target: TRACING_TARGET,
                            hash = ?hash,
                            error = %err,
                            "Skipping malformed roster entry"
                        );
                    })
                    .ok()
            })
            .collect();

        if nodes.len() < total {
            tracing::info!(
                target: TRACING_TARGET,
                kept = nodes.len(),
                skipped = total - nodes.len(),
                "Roster decoded with skipped entries"
            );
        }

        Some(Roster::new(nodes))
    }
}

/// One compute node as advertised in the roster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDescriptor {
    /// Identity of the node.
    pub hash: String,
    pub name: Option<String>,
    /// Advertised base URL; untrusted.
    pub address: String,
    pub score: f64,
    /// Set once the node stopped being active.
    pub inactive_since: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl NodeDescriptor {
    /// Returns `true` unless the node is marked inactive.
    pub fn is_active(&self) -> bool {
        self.inactive_since
            .as_ref()
            .is_none_or(serde_json::Value::is_null)
    }

    /// Returns whether the advertised address passes the sanitizer.
    pub fn is_address_valid(&self) -> bool {
        nodelist_reqwest::is_valid(&self.address)
    }
}

/// Known node descriptors, ordered by descending score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    nodes: Vec<NodeDescriptor>,
}

impl Roster {
    /// Creates a roster, sorting the nodes by descending score.
    pub fn new(mut nodes: Vec<NodeDescriptor>) -> Self {
        nodes.sort_by(|a, b| b.score.total_cmp(&a.score));
        Self { nodes }
    }

    /// Returns the nodes in score order.
    pub fn nodes(&self) -> &[NodeDescriptor] {
        &self.nodes
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the roster has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of nodes whose address passes the sanitizer.
    pub fn valid_address_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.is_address_valid())
            .count()
    }
}
