//! Process-wide chat history with rollback on failure.
//!
//! A request opens a `PendingTurn` that appends the user turn. The turn is
//! either committed (assistant reply appended) or retracted. Dropping an
//! unfinished `PendingTurn` retracts it, so a failed, timed-out, or
//! cancelled request never leaves an unanswered user turn behind.
//!
//! Only answered exchanges count toward the cap and reach the context.
//! A pending user turn stays in place until its outcome is known, and the
//! reply is inserted directly after it, so concurrent requests keep each
//! question next to its own answer.
//!
//! History lives only in memory and resets on restart.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug)]
struct Entry {
    id: u64,
    turn: Turn,
    pending: bool,
}

#[derive(Debug, Default)]
struct Inner {
    turns: VecDeque<Entry>,
    next_id: u64,
}

/// Bounded conversation history, shared by all chat requests.
#[derive(Clone, Debug)]
pub struct ConversationHistory {
    inner: Arc<Mutex<Inner>>,
    cap: usize,
}

impl ConversationHistory {
    /// History keeping at most `cap` answered turns (user and assistant each count).
    pub fn new(cap: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            cap,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the oldest answered turns until at most `cap` remain.
    fn trim(&self, inner: &mut Inner) {
        let mut settled = inner.turns.iter().filter(|e| !e.pending).count();
        while settled > self.cap {
            match inner.turns.iter().position(|e| !e.pending) {
                Some(pos) => {
                    inner.turns.remove(pos);
                    settled -= 1;
                }
                None => break,
            }
        }
    }

    /// Append the user turn and return it with the answered turns before it.
    pub fn begin(&self, prompt: &str) -> (PendingTurn, Vec<Turn>) {
        let mut inner = self.lock();
        let prior = inner
            .turns
            .iter()
            .filter(|e| !e.pending)
            .map(|e| e.turn.clone())
            .collect();

        let id = inner.next_id;
        inner.next_id += 1;
        inner.turns.push_back(Entry {
            id,
            turn: Turn::user(prompt),
            pending: true,
        });

        let pending = PendingTurn {
            history: self.clone(),
            id,
            finished: false,
        };
        (pending, prior)
    }

    /// Copy of the current turns, oldest first.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.lock().turns.iter().map(|e| e.turn.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Settle user turn `id` and place the reply right after it.
    fn commit(&self, id: u64, reply: String) {
        let mut inner = self.lock();
        let Some(pos) = inner.turns.iter().position(|e| e.id == id) else {
            tracing::debug!(turn = id, "user turn gone, reply dropped");
            return;
        };
        inner.turns[pos].pending = false;
        let reply_id = inner.next_id;
        inner.next_id += 1;
        inner.turns.insert(
            pos + 1,
            Entry {
                id: reply_id,
                turn: Turn::assistant(reply),
                pending: false,
            },
        );
        self.trim(&mut inner);
    }

    /// Remove the user turn `id`.
    fn retract(&self, id: u64) -> bool {
        let mut inner = self.lock();
        match inner.turns.iter().position(|e| e.id == id) {
            Some(pos) => {
                inner.turns.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// A user turn awaiting its outcome.
#[derive(Debug)]
pub struct PendingTurn {
    history: ConversationHistory,
    id: u64,
    finished: bool,
}

impl PendingTurn {
    /// Record the assistant reply.
    pub fn commit(mut self, reply: impl Into<String>) {
        self.finished = true;
        self.history.commit(self.id, reply.into());
    }

    /// Remove the user turn.
    pub fn retract(mut self) {
        self.finished = true;
        self.history.retract(self.id);
    }
}

impl Drop for PendingTurn {
    fn drop(&mut self) {
        if !self.finished && self.history.retract(self.id) {
            tracing::debug!(turn = self.id, "unfinished user turn retracted");
        }
    }
}

/// Build the text sent to the generator: knowledge preamble, prior turns,
/// then the current question.
pub fn build_context(knowledge: &str, prior: &[Turn], prompt: &str) -> String {
    let mut context = format!("Only use this info to answer:\n{knowledge}\n\n");
    if !prior.is_empty() {
        context.push_str("Previous conversation:\n");
        for turn in prior {
            let label = match turn.role {
                Role::User => "Human",
                Role::Assistant => "Assistant",
            };
            context.push_str(label);
            context.push_str(": ");
            context.push_str(&turn.content);
            context.push('\n');
        }
        context.push('\n');
    }
    context.push_str("Current question: ");
    context.push_str(prompt);
    context
}
