//! Shared fakes for integration tests: an in-memory graph store and a
//! scriptable LLM client, both implementing the crate's public
//! capability traits the way a real adapter would.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use strata::error::StrataError;
use strata::graph::{GraphStore, GraphTableView};
use strata::llm::{ChatCompletion, LlmClient, ResponseFormat};
use strata::models::{ColumnNode, KnowledgeGraph, Message, RelationshipEdge, TableNode};

/// An in-memory `GraphStore` built directly from a loaded `KnowledgeGraph`,
/// enough to drive `context_builder` and the conversational engine without
/// a Neo4j instance.
#[derive(Default)]
pub struct InMemoryGraphStore {
    clients: Mutex<BTreeMap<String, KnowledgeGraph>>,
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn load(&self, client_id: &str, graph: &KnowledgeGraph) -> Result<(), StrataError> {
        self.clients
            .lock()
            .unwrap()
            .insert(client_id.to_string(), graph.clone());
        Ok(())
    }

    async fn tables_for_client(&self, client_id: &str) -> Result<Vec<GraphTableView>, StrataError> {
        let clients = self.clients.lock().unwrap();
        let Some(graph) = clients.get(client_id) else {
            return Ok(vec![]);
        };

        let views = graph
            .tables
            .iter()
            .map(|table: &TableNode| {
                let columns: Vec<ColumnNode> = graph
                    .columns
                    .iter()
                    .filter(|c| c.table == table.name)
                    .cloned()
                    .collect();
                let outgoing: Vec<RelationshipEdge> = graph
                    .edges
                    .iter()
                    .filter(|e| e.source_table == table.name)
                    .cloned()
                    .collect();
                GraphTableView {
                    table: table.clone(),
                    columns,
                    outgoing,
                }
            })
            .collect();
        Ok(views)
    }

    async fn purge_client(&self, client_id: &str) -> Result<(), StrataError> {
        self.clients.lock().unwrap().remove(client_id);
        Ok(())
    }
}

/// A fully scripted `LlmClient`: each call to `chat` pops the next queued
/// reply, in order, panicking if the script runs dry. Used to drive the
/// conversational engine through a fixed sequence of plan/summarize turns.
pub struct ScriptedLlm {
    replies: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(
        &self,
        _model: &str,
        _messages: &[Message],
        _temperature: f32,
        _max_tokens: u32,
        _response_format: ResponseFormat,
    ) -> Result<ChatCompletion, StrataError> {
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            panic!("ScriptedLlm ran out of queued replies");
        }
        let content = replies.remove(0);
        Ok(ChatCompletion {
            content,
            input_tokens: 10,
            output_tokens: 10,
        })
    }
}
