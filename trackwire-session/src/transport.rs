//! Remote call boundary.
//!
//! The session hands a [`Transport`] one encoded batch at a time and blocks
//! until the server answers. Implementations only move bytes and map
//! connection-level failures; interpreting results is the session's job.

use trackwire_types::Result;

/// Sends an encoded batch to the server.
pub trait Transport {
    /// Sends `batch` (a JSON array of instructions) and returns the decoded
    /// response body.
    fn call(&self, batch: &serde_json::Value) -> Result<serde_json::Value>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn call(&self, batch: &serde_json::Value) -> Result<serde_json::Value> {
        (**self).call(batch)
    }
}

/// An in-process transport for testing.
pub mod mock {
    use super::*;
    use serde_json::{Value as Json, json};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use trackwire_types::Error;

    #[derive(Default)]
    struct MockState {
        schemas: Vec<Json>,
        query_results: VecDeque<Vec<Json>>,
        calls: Vec<Json>,
        fail_next: Option<Error>,
        exception_next: Option<String>,
    }

    /// A scripted server.
    ///
    /// Serves the configured schemas, answers queries from a queue of
    /// scripted result sets, echoes create and update payloads back as the
    /// server's view of the record and records every batch it receives.
    /// Clones share state, so a test can keep one handle while the session
    /// owns another.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        state: Rc<RefCell<MockState>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a transport serving `schemas` to `query_schemas`.
        pub fn with_schemas(schemas: Vec<Json>) -> Self {
            let transport = Self::default();
            transport.state.borrow_mut().schemas = schemas;
            transport
        }

        /// Queues the rows returned by the next `query` instruction.
        pub fn push_query_result(&self, rows: Vec<Json>) {
            self.state.borrow_mut().query_results.push_back(rows);
        }

        /// Makes the next call fail with `error`.
        pub fn fail_next(&self, error: Error) {
            self.state.borrow_mut().fail_next = Some(error);
        }

        /// Makes the next call answer with a server-reported exception.
        pub fn raise_next(&self, content: impl Into<String>) {
            self.state.borrow_mut().exception_next = Some(content.into());
        }

        /// Every batch received so far.
        pub fn calls(&self) -> Vec<Json> {
            self.state.borrow().calls.clone()
        }

        pub fn call_count(&self) -> usize {
            self.state.borrow().calls.len()
        }

        pub fn last_call(&self) -> Option<Json> {
            self.state.borrow().calls.last().cloned()
        }

        /// Action names of the last batch, in order.
        pub fn last_actions(&self) -> Vec<String> {
            self.last_call()
                .and_then(|batch| batch.as_array().cloned())
                .unwrap_or_default()
                .iter()
                .filter_map(|instruction| instruction["action"].as_str().map(str::to_string))
                .collect()
        }

        /// Expressions of every query sent so far.
        pub fn queries(&self) -> Vec<String> {
            self.state
                .borrow()
                .calls
                .iter()
                .filter_map(Json::as_array)
                .flatten()
                .filter(|instruction| instruction["action"] == "query")
                .filter_map(|instruction| instruction["expression"].as_str().map(str::to_string))
                .collect()
        }

        fn answer(&self, instruction: &Json) -> Result<Json> {
            let action = instruction["action"].as_str().unwrap_or_default();
            match action {
                "query_schemas" => Ok(Json::Array(self.state.borrow().schemas.clone())),
                "query" => {
                    let rows = self
                        .state
                        .borrow_mut()
                        .query_results
                        .pop_front()
                        .unwrap_or_default();
                    Ok(json!({ "action": "query", "data": rows }))
                }
                "create" | "update" => Ok(json!({
                    "action": action,
                    "data": instruction["entity_data"].clone(),
                })),
                "delete" => Ok(json!({ "action": "delete", "data": true })),
                other => Err(Error::Server(format!("unsupported action {other:?}"))),
            }
        }
    }

    impl Transport for MockTransport {
        fn call(&self, batch: &Json) -> Result<Json> {
            self.state.borrow_mut().calls.push(batch.clone());

            if let Some(error) = self.state.borrow_mut().fail_next.take() {
                return Err(error);
            }
            if let Some(content) = self.state.borrow_mut().exception_next.take() {
                return Ok(json!({ "exception": "ServerError", "content": content }));
            }

            let instructions = batch.as_array().cloned().unwrap_or_default();
            let results = instructions
                .iter()
                .map(|instruction| self.answer(instruction))
                .collect::<Result<Vec<_>>>()?;
            Ok(Json::Array(results))
        }
    }
}
