use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashSet;
use hyper::client::HttpConnector;
use hyper::{Client, Uri};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::block::Block;
use super::chain::{validate_blocks, Chain};
use super::ledger::Ledger;

/// Errors that can occur while talking to peers
#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("Invalid node URL {0:?}")]
    InvalidNodeUrl(String),

    #[error("Peer {node} unavailable: {reason}")]
    PeerUnavailable { node: String, reason: String },

    #[error("Peer {node} sent a malformed chain: {reason}")]
    MalformedResponse { node: String, reason: String },
}

/// A node's full chain as served on `/get_chain`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChainSnapshot {
    /// Number of blocks the node reports
    pub length: usize,

    /// The blocks, genesis first
    pub chain: Vec<Block>,
}

impl ChainSnapshot {
    pub fn new(chain: Vec<Block>) -> Self {
        ChainSnapshot {
            length: chain.len(),
            chain,
        }
    }
}

/// Source of remote chains. Any failure means "skip this peer".
#[async_trait]
pub trait PeerFetcher: Send + Sync {
    async fn fetch_chain(&self, node: &str) -> Result<ChainSnapshot, ConsensusError>;
}

/// Fetches `http://{node}/get_chain`, giving up on a peer after `timeout`
pub struct HttpPeerFetcher {
    client: Client<HttpConnector>,
    timeout: Duration,
}

impl HttpPeerFetcher {
    pub fn new(timeout: Duration) -> Self {
        HttpPeerFetcher {
            client: Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl PeerFetcher for HttpPeerFetcher {
    async fn fetch_chain(&self, node: &str) -> Result<ChainSnapshot, ConsensusError> {
        let unavailable = |reason: String| ConsensusError::PeerUnavailable {
            node: node.to_string(),
            reason,
        };

        let uri: Uri = format!("http://{}/get_chain", node)
            .parse()
            .map_err(|e: hyper::http::uri::InvalidUri| unavailable(e.to_string()))?;

        let request = async {
            let response = self
                .client
                .get(uri)
                .await
                .map_err(|e| unavailable(e.to_string()))?;

            if !response.status().is_success() {
                return Err(unavailable(format!("status {}", response.status())));
            }

            let body = hyper::body::to_bytes(response.into_body())
                .await
                .map_err(|e| unavailable(e.to_string()))?;

            serde_json::from_slice::<ChainSnapshot>(&body).map_err(|e| {
                ConsensusError::MalformedResponse {
                    node: node.to_string(),
                    reason: e.to_string(),
                }
            })
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| unavailable(format!("no response within {:?}", self.timeout)))?
    }
}

/// Extracts `host[:port]` from a peer URL. The URL needs a scheme.
pub fn network_location(url: &str) -> Result<String, ConsensusError> {
    let invalid = || ConsensusError::InvalidNodeUrl(url.to_string());

    let uri: Uri = url.trim().parse().map_err(|_| invalid())?;
    if uri.scheme().is_none() {
        return Err(invalid());
    }

    let host = uri.host().filter(|host| !host.is_empty()).ok_or_else(invalid)?;
    Ok(match uri.port_u16() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Keeps the set of known peers and applies the longest-valid-chain rule.
///
/// Only chain length decides. Peers are not required to share our genesis block.
pub struct ConsensusEngine {
    ledger: Arc<Ledger>,
    nodes: DashSet<String>,
    fetcher: Box<dyn PeerFetcher>,
}

impl ConsensusEngine {
    pub fn new(ledger: Arc<Ledger>, fetcher: Box<dyn PeerFetcher>) -> Self {
        ConsensusEngine {
            ledger,
            nodes: DashSet::new(),
            fetcher,
        }
    }

    /// Records the network location of `url`. Adding a known peer again is a no-op.
    pub fn add_node(&self, url: &str) -> Result<String, ConsensusError> {
        let location = network_location(url)?;
        self.register(&location);
        Ok(location)
    }

    /// Records every URL, or none of them if any is invalid
    pub fn add_nodes<S: AsRef<str>>(&self, urls: &[S]) -> Result<Vec<String>, ConsensusError> {
        let locations = urls
            .iter()
            .map(|url| network_location(url.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        for location in &locations {
            self.register(location);
        }
        Ok(locations)
    }

    fn register(&self, location: &str) {
        if self.nodes.insert(location.to_string()) {
            info!("Added peer {}", location);
        }
    }

    /// Known peers, sorted
    pub fn nodes(&self) -> Vec<String> {
        let mut nodes: Vec<String> = self.nodes.iter().map(|node| node.key().clone()).collect();
        nodes.sort();
        nodes
    }

    /// Asks every peer for its chain and adopts the longest one that is
    /// strictly longer than ours and validates.
    ///
    /// Peers are queried one after another; any that fail or answer with
    /// something unusable are skipped. The final comparison and the swap run
    /// under the ledger lock on the blocking pool, so they see the chain as it
    /// is at that moment without stalling the async workers.
    ///
    /// # Returns
    ///
    /// `true` if the local chain was replaced
    pub async fn replace_chain(&self) -> bool {
        let mut candidates = Vec::new();

        for node in self.nodes() {
            match self.fetcher.fetch_chain(&node).await {
                Ok(snapshot) if snapshot.length != snapshot.chain.len() => {
                    warn!(
                        "Skipping peer {}: reported length {} but sent {} blocks",
                        node,
                        snapshot.length,
                        snapshot.chain.len()
                    );
                }
                Ok(snapshot) => candidates.push((node, snapshot)),
                Err(err) => warn!("Skipping peer: {}", err),
            }
        }

        let ledger = self.ledger.clone();
        let replaced = match tokio::task::spawn_blocking(move || {
            ledger.replace_chain_with(|current| select_longest(current, candidates))
        })
        .await
        {
            Ok(replaced) => replaced,
            Err(err) => {
                error!("Chain selection did not complete: {}", err);
                return false;
            }
        };
        if !replaced {
            info!(
                "Local chain of length {} is already the longest valid chain",
                self.ledger.len()
            );
        }
        replaced
    }
}

fn select_longest(current: &Chain, candidates: Vec<(String, ChainSnapshot)>) -> Option<Vec<Block>> {
    let pow = current.pow();
    let mut max_length = current.len();
    let mut longest = None;

    for (node, snapshot) in candidates {
        if snapshot.length <= max_length {
            debug!(
                "Peer {} has length {}, not longer than {}",
                node, snapshot.length, max_length
            );
            continue;
        }

        match validate_blocks(&pow, &snapshot.chain) {
            Ok(()) => {
                info!("Peer {} has a longer valid chain of length {}", node, snapshot.length);
                max_length = snapshot.length;
                longest = Some(snapshot.chain);
            }
            Err(err) => warn!("Ignoring chain from peer {}: {}", node, err),
        }
    }

    longest
}
