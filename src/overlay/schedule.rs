//! Deferred removal: per-document command hooks and one-shot timers.

use super::types::{AnnotationId, Category, DocumentId};
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

/// Pending "before next command" hooks, one per (document, category).
///
/// A hook fires at most once: [`CommandHooks::take`] hands out and forgets
/// every hook of a document.
#[derive(Debug, Default)]
pub struct CommandHooks {
    pending: HashMap<DocumentId, BTreeSet<Category>>,
}

impl CommandHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook; registering an existing pair is a no-op.
    pub fn register(&mut self, doc: &DocumentId, category: &Category) {
        self.pending
            .entry(doc.clone())
            .or_default()
            .insert(category.clone());
    }

    pub fn deregister(&mut self, doc: &DocumentId, category: &Category) -> bool {
        let Some(categories) = self.pending.get_mut(doc) else {
            return false;
        };
        let removed = categories.remove(category);
        if categories.is_empty() {
            self.pending.remove(doc);
        }
        removed
    }

    pub fn is_pending(&self, doc: &DocumentId, category: &Category) -> bool {
        self.pending
            .get(doc)
            .is_some_and(|categories| categories.contains(category))
    }

    /// Remove and return every hook registered for `doc`.
    pub fn take(&mut self, doc: &DocumentId) -> Vec<Category> {
        self.pending
            .remove(doc)
            .map(|categories| categories.into_iter().collect())
            .unwrap_or_default()
    }

    pub fn clear_document(&mut self, doc: &DocumentId) {
        self.pending.remove(doc);
    }
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    annotation: AnnotationId,
    deadline: Instant,
}

/// One-shot removal timers keyed by annotation.
#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: Vec<Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, annotation: AnnotationId, deadline: Instant) {
        self.cancel(annotation);
        self.timers.push(Timer { annotation, deadline });
    }

    pub fn cancel(&mut self, annotation: AnnotationId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.annotation != annotation);
        self.timers.len() != before
    }

    pub fn cancel_all(&mut self, annotations: impl IntoIterator<Item = AnnotationId>) {
        for id in annotations {
            self.cancel(id);
        }
    }

    /// Remove and return timers whose deadline is at or before `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<AnnotationId> {
        let (mut due, pending): (Vec<Timer>, Vec<Timer>) =
            self.timers.drain(..).partition(|t| t.deadline <= now);
        self.timers = pending;
        due.sort_by_key(|t| t.deadline);
        due.into_iter().map(|t| t.annotation).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.deadline).min()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
