//! Reference model of the server store.
//!
//! Plain vectors and linear scans, no resend bookkeeping. It assumes every
//! definitive response is acknowledged immediately, which is how the
//! model-based tests drive the real store.

use tuplespace_proto::{Operation, Tuple};

/// Response the model expects the store to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelResponse {
    /// Tuple delivered to a requester
    Tuple {
        /// Requester index
        requester: usize,
        /// Delivered tuple
        tuple: Tuple,
    },
    /// Request queued
    Awaiting {
        /// Requester index
        requester: usize,
    },
    /// Non-blocking request found nothing
    Lack {
        /// Requester index
        requester: usize,
    },
    /// `out` acknowledged
    Received {
        /// Sender index
        requester: usize,
    },
}

#[derive(Debug, Clone)]
struct Waiting {
    requester: usize,
    template: Tuple,
    removes: bool,
}

/// Stash and queue in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ModelStore {
    stash: Vec<Tuple>,
    queue: Vec<Waiting>,
}

impl ModelStore {
    /// Empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stashed tuples.
    pub fn stashed(&self) -> usize {
        self.stash.len()
    }

    /// Stashed tuples of one arity.
    pub fn stashed_with_arity(&self, arity: usize) -> usize {
        self.stash.iter().filter(|t| t.arity() == arity).count()
    }

    /// Queued requests.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Templates of queued requests, oldest first.
    pub fn queued_templates(&self) -> impl Iterator<Item = &Tuple> {
        self.queue.iter().map(|w| &w.template)
    }

    /// `out` from `requester`.
    pub fn out(&mut self, requester: usize, tuple: Tuple) -> Vec<ModelResponse> {
        let mut responses = Vec::new();
        let mut taken = false;

        let mut remaining = Vec::with_capacity(self.queue.len());
        for waiting in std::mem::take(&mut self.queue) {
            if taken || !waiting.template.matches(&tuple) {
                remaining.push(waiting);
                continue;
            }
            responses.push(ModelResponse::Tuple {
                requester: waiting.requester,
                tuple: tuple.clone(),
            });
            taken = waiting.removes;
        }
        self.queue = remaining;

        if !taken {
            self.stash.push(tuple);
        }
        responses.push(ModelResponse::Received { requester });
        responses
    }

    /// Template request from `requester`.
    pub fn get(
        &mut self,
        requester: usize,
        template: Tuple,
        operation: Operation,
    ) -> Vec<ModelResponse> {
        let removes = operation.removes();
        let duplicate = self.queue.iter().any(|w| {
            w.requester == requester && w.removes == removes && w.template == template
        });
        if operation.is_blocking() && duplicate {
            return vec![ModelResponse::Awaiting { requester }];
        }
        self.queue.retain(|w| w.requester != requester);

        if let Some(pos) = self.stash.iter().position(|t| template.matches(t)) {
            let tuple = if removes { self.stash.remove(pos) } else { self.stash[pos].clone() };
            return vec![ModelResponse::Tuple { requester, tuple }];
        }
        if operation.is_blocking() {
            self.queue.push(Waiting { requester, template, removes });
            vec![ModelResponse::Awaiting { requester }]
        } else {
            vec![ModelResponse::Lack { requester }]
        }
    }
}
