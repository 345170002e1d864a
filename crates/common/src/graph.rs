//! The graph delta emitter: maintains seen-node/seen-edge sets and emits
//! typed JSON deltas over a viewer socket.
//!
//! Two capability traits replace the source's runtime interface probing:
//! [`DeltaSink`] is the transport the emitter writes JSON deltas to, and
//! anything implementing it gets both the `add_hostname_connection` graph
//! capability and the `notify_start_crawl`/`notify_end_crawl` notifier
//! capability for free, since both are just methods on [`GraphEmitter`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::interner::StringInterner;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeAttributes {
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GraphDelta {
    Node {
        data: NodeData,
    },
    #[serde(rename = "nodeupdate")]
    NodeUpdate {
        data: NodeUpdateData,
    },
    Edge {
        data: EdgeData,
    },
    #[serde(rename = "startcrawl")]
    StartCrawl {
        worker: String,
        data: NodeUpdateData,
    },
    #[serde(rename = "endcrawl")]
    EndCrawl {
        worker: String,
        data: EndCrawlData,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeData {
    pub key: String,
    pub attributes: NodeAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeUpdateData {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeData {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndCrawlData {
    pub key: String,
    pub deadend: bool,
}

/// Somewhere a [`GraphDelta`] can be written. Implemented by the viewer
/// socket wrapper; a test sink just appends to a `Vec` for assertions.
#[async_trait::async_trait]
pub trait DeltaSink: Send + Sync {
    async fn send_delta(&self, delta: GraphDelta);
}

#[async_trait::async_trait]
impl<T: DeltaSink + ?Sized> DeltaSink for std::sync::Arc<T> {
    async fn send_delta(&self, delta: GraphDelta) {
        (**self).send_delta(delta).await
    }
}

#[derive(Debug, Default)]
struct EmitterState {
    seen_nodes: HashSet<String>,
    seen_edges: HashSet<String>,
    edge_count: u64,
}

pub struct GraphEmitter<S> {
    interner: StringInterner,
    state: Mutex<EmitterState>,
    sink: S,
}

impl<S: DeltaSink> GraphEmitter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            interner: StringInterner::new(),
            state: Mutex::new(EmitterState::default()),
            sink,
        }
    }

    /// Records a (possibly new) directed connection from `from_host` to
    /// `to_host`, emitting whichever of `node`/`nodeupdate`/`edge` deltas
    /// are warranted. All deltas produced by one call arrive on the sink
    /// contiguously, since the state lock is held across the whole call.
    pub async fn add_hostname_connection(&self, from_host: &str, to_host: &str) {
        let from_id = self.interner.hash(from_host).to_string();
        let to_id = self.interner.hash(to_host).to_string();

        let mut state = self.state.lock().await;

        if state.seen_nodes.insert(from_id.clone()) {
            self.sink
                .send_delta(GraphDelta::Node {
                    data: NodeData {
                        key: from_id.clone(),
                        attributes: NodeAttributes {
                            label: from_host.to_string(),
                        },
                    },
                })
                .await;
        } else {
            self.sink
                .send_delta(GraphDelta::NodeUpdate {
                    data: NodeUpdateData {
                        key: from_id.clone(),
                    },
                })
                .await;
        }

        if state.seen_nodes.insert(to_id.clone()) {
            self.sink
                .send_delta(GraphDelta::Node {
                    data: NodeData {
                        key: to_id.clone(),
                        attributes: NodeAttributes {
                            label: to_host.to_string(),
                        },
                    },
                })
                .await;
        }

        let edge_key = format!("{from_id}\t{to_id}");
        let reverse_key = format!("{to_id}\t{from_id}");
        if !state.seen_edges.contains(&edge_key) && !state.seen_edges.contains(&reverse_key) {
            state.seen_edges.insert(edge_key);
            state.edge_count += 1;
            self.sink
                .send_delta(GraphDelta::Edge {
                    data: EdgeData {
                        from: from_id,
                        to: to_id,
                    },
                })
                .await;
        }
    }

    pub async fn notify_start_crawl(&self, worker_id: u32, hostname: &str) {
        let id = self.interner.hash(hostname).to_string();
        self.sink
            .send_delta(GraphDelta::StartCrawl {
                worker: worker_id.to_string(),
                data: NodeUpdateData { key: id },
            })
            .await;
    }

    pub async fn notify_end_crawl(&self, worker_id: u32, hostname: &str, dead_end: bool) {
        let id = self.interner.hash(hostname).to_string();
        self.sink
            .send_delta(GraphDelta::EndCrawl {
                worker: worker_id.to_string(),
                data: EndCrawlData {
                    key: id,
                    deadend: dead_end,
                },
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex as TokioMutex;

    #[derive(Default)]
    struct RecordingSink {
        deltas: TokioMutex<Vec<GraphDelta>>,
    }

    #[async_trait::async_trait]
    impl DeltaSink for RecordingSink {
        async fn send_delta(&self, delta: GraphDelta) {
            self.deltas.lock().await.push(delta);
        }
    }

    #[tokio::test]
    async fn s4_delta_sequence() {
        let emitter = GraphEmitter::new(RecordingSink::default());

        emitter.add_hostname_connection("a", "b").await;
        emitter.add_hostname_connection("a", "c").await;
        emitter.add_hostname_connection("b", "a").await;

        let got = emitter.sink.deltas.lock().await.clone();

        let want = vec![
            GraphDelta::Node {
                data: NodeData {
                    key: "1".into(),
                    attributes: NodeAttributes { label: "a".into() },
                },
            },
            GraphDelta::Node {
                data: NodeData {
                    key: "2".into(),
                    attributes: NodeAttributes { label: "b".into() },
                },
            },
            GraphDelta::Edge {
                data: EdgeData {
                    from: "1".into(),
                    to: "2".into(),
                },
            },
            GraphDelta::NodeUpdate {
                data: NodeUpdateData { key: "1".into() },
            },
            GraphDelta::Node {
                data: NodeData {
                    key: "3".into(),
                    attributes: NodeAttributes { label: "c".into() },
                },
            },
            GraphDelta::Edge {
                data: EdgeData {
                    from: "1".into(),
                    to: "3".into(),
                },
            },
            GraphDelta::NodeUpdate {
                data: NodeUpdateData { key: "2".into() },
            },
        ];

        assert_eq!(got, want);
    }

    #[test]
    fn node_delta_serializes_to_wire_shape() {
        let delta = GraphDelta::Node {
            data: NodeData {
                key: "1".into(),
                attributes: NodeAttributes {
                    label: "example.com".into(),
                },
            },
        };
        let json = serde_json::to_value(&delta).unwrap();
        assert_eq!(json["type"], "node");
        assert_eq!(json["data"]["key"], "1");
        assert_eq!(json["data"]["attributes"]["label"], "example.com");
    }

    #[test]
    fn endcrawl_delta_serializes_to_wire_shape() {
        let delta = GraphDelta::EndCrawl {
            worker: "1".into(),
            data: EndCrawlData {
                key: "1".into(),
                deadend: true,
            },
        };
        let json = serde_json::to_value(&delta).unwrap();
        assert_eq!(json["type"], "endcrawl");
        assert_eq!(json["worker"], "1");
        assert_eq!(json["data"]["deadend"], true);
    }
}
