//! The annotation manager: placement, exclusivity, invalidation and removal.

use super::config::{AnnotationOptions, OverlayConfig};
use super::format::{self, max_line_width};
use super::host::{EditorSurface, Viewport};
use super::schedule::{CommandHooks, TimerQueue};
use super::types::{
    Annotation, AnnotationId, AnnotationStyle, Category, DocumentId, RemovalPolicy, Span,
    StyleLayer, TextEdit,
};
use crate::util::{
    display_column, line_end, line_of, line_start, preceding_form_start, skip_whitespace_backward,
};
use std::collections::HashMap;
use std::fmt::Display;
use std::time::Instant;

/// Where to attach an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// The document's cursor, resolved like [`Location::Point`].
    Cursor,
    /// Attach to the form ending at (or before whitespace preceding) this offset,
    /// through the end of its line.
    Point(usize),
    /// Attach to exactly this span.
    Span(Span),
}

/// Owns every live annotation and its pending removals.
#[derive(Debug, Default)]
pub struct AnnotationManager {
    config: OverlayConfig,
    next_id: u64,
    documents: HashMap<DocumentId, Vec<Annotation>>,
    hooks: CommandHooks,
    timers: TimerQueue,
}

impl AnnotationManager {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Options carrying the configured defaults.
    pub fn default_options(&self) -> AnnotationOptions {
        self.config.default_options()
    }

    /// Place an annotation showing `value` at `location`.
    ///
    /// Returns the annotation when it is confirmed visible in the document's
    /// viewport. `None` tells the caller to present the value elsewhere; the
    /// annotation stays attached unless the target was invalid or it was
    /// removed on the spot because no command is running.
    pub fn create(
        &mut self,
        surface: &dyn EditorSurface,
        doc: &DocumentId,
        location: Location,
        value: &dyn Display,
        options: &AnnotationOptions,
    ) -> Option<Annotation> {
        let Some(text) = surface.text(doc) else {
            tracing::debug!("Not annotating closed document {}", doc);
            return None;
        };
        let Some(span) = resolve_span(text, location, surface.cursor(doc)) else {
            tracing::debug!("Invalid location {:?} in {}", location, doc);
            return None;
        };

        let viewport = surface.viewport(doc);
        let width = viewport
            .map(|v| v.width)
            .unwrap_or(self.config.fallback_width)
            .max(1);
        let column = display_column(text, span.end);
        let anchor_line = line_of(text, span.end);

        let value_text = value.to_string();
        let display_text = format::layout(&options.display_format, &value_text, width, column);

        let face = options
            .face
            .clone()
            .unwrap_or_else(|| self.config.style.for_mode(surface.display_mode()).clone());
        let style = AnnotationStyle {
            face,
            layer: if options.syntax_coloring {
                StyleLayer::BelowSyntax
            } else {
                StyleLayer::Uniform
            },
            extra: options.extra.clone(),
        };

        self.remove_by_category(doc, &options.category, Some(span));

        let id = self.allocate_id();
        let annotation = Annotation {
            id,
            document: doc.clone(),
            span,
            display_text,
            value_text,
            category: options.category.clone(),
            removal_policy: options.removal_policy,
            style,
            cursor_hint: 0,
        };
        self.documents
            .entry(doc.clone())
            .or_default()
            .push(annotation.clone());
        tracing::debug!(
            "Created annotation {:?} in {} at {}..{}",
            id,
            doc,
            span.start,
            span.end
        );

        match options.removal_policy {
            RemovalPolicy::Never => {}
            RemovalPolicy::AfterDuration(delay) => match Instant::now().checked_add(delay) {
                Some(deadline) => self.timers.schedule(id, deadline),
                None => {
                    tracing::warn!("Delay {:?} out of range, {:?} stays until removed", delay, id)
                }
            },
            RemovalPolicy::BeforeNextCommand => {
                if surface.command_in_progress() {
                    self.hooks.register(doc, &options.category);
                } else {
                    // No command boundary will come to clear it.
                    self.remove(id);
                    return None;
                }
            }
        }

        let visible = viewport
            .is_some_and(|vp| is_visible(&vp, anchor_line, column, &annotation.display_text));
        visible.then_some(annotation)
    }

    /// Remove one annotation. Removing a missing annotation is a no-op.
    pub fn remove(&mut self, id: AnnotationId) -> bool {
        let Some((doc, category)) = self.locate(id) else {
            return false;
        };
        if let Some(list) = self.documents.get_mut(&doc) {
            list.retain(|a| a.id != id);
            if list.is_empty() {
                self.documents.remove(&doc);
            }
        }
        self.timers.cancel(id);
        self.release_hook_if_idle(&doc, &category);
        tracing::debug!("Removed annotation {:?} from {}", id, doc);
        true
    }

    /// Remove annotations of `category` in `doc`, optionally only those
    /// overlapping `span`. Returns how many were removed.
    pub fn remove_by_category(
        &mut self,
        doc: &DocumentId,
        category: &Category,
        span: Option<Span>,
    ) -> usize {
        let mut removed = Vec::new();
        if let Some(list) = self.documents.get_mut(doc) {
            list.retain(|a| {
                let hit = a.category == *category && span.map_or(true, |s| a.span.overlaps(&s));
                if hit {
                    removed.push(a.id);
                }
                !hit
            });
            if list.is_empty() {
                self.documents.remove(doc);
            }
        }

        self.timers.cancel_all(removed.iter().copied());
        self.release_hook_if_idle(doc, category);
        if !removed.is_empty() {
            tracing::debug!("Removed {} '{}' annotation(s) from {}", removed.len(), category, doc);
        }
        removed.len()
    }

    /// Forward a text change in `doc`.
    ///
    /// Annotations whose span the edit touches are removed; the rest move
    /// with the text.
    pub fn text_edited(&mut self, doc: &DocumentId, edit: TextEdit) -> usize {
        let Some(list) = self.documents.get_mut(doc) else {
            return 0;
        };

        let mut removed = Vec::new();
        list.retain_mut(|a| {
            if edit.touches(&a.span) {
                removed.push((a.id, a.category.clone()));
                return false;
            }
            a.span = Span::new(edit.shift(a.span.start), edit.shift(a.span.end));
            true
        });
        if list.is_empty() {
            self.documents.remove(doc);
        }

        for (id, category) in &removed {
            self.timers.cancel(*id);
            self.release_hook_if_idle(doc, category);
        }
        if !removed.is_empty() {
            tracing::debug!("Edit invalidated {} annotation(s) in {}", removed.len(), doc);
        }
        removed.len()
    }

    /// A user command is about to run in `doc`: fire its pending hooks.
    pub fn pre_command(&mut self, doc: &DocumentId) -> usize {
        self.hooks
            .take(doc)
            .into_iter()
            .map(|category| self.remove_by_category(doc, &category, None))
            .sum()
    }

    /// Fire every timer due at `now`.
    pub fn fire_due_timers(&mut self, now: Instant) -> usize {
        self.timers
            .take_due(now)
            .into_iter()
            .filter(|&id| self.remove(id))
            .count()
    }

    /// Earliest pending timer deadline, for hosts that sleep between events.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Drop everything associated with a closed document.
    pub fn close_document(&mut self, doc: &DocumentId) {
        if let Some(list) = self.documents.remove(doc) {
            self.timers.cancel_all(list.iter().map(|a| a.id));
            tracing::debug!("Dropped {} annotation(s) of closed {}", list.len(), doc);
        }
        self.hooks.clear_document(doc);
    }

    pub fn annotations(&self, doc: &DocumentId) -> &[Annotation] {
        self.documents.get(doc).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Annotations of `category` in `doc`, optionally overlapping `span`.
    pub fn find(
        &self,
        doc: &DocumentId,
        category: &Category,
        span: Option<Span>,
    ) -> Vec<&Annotation> {
        self.annotations(doc)
            .iter()
            .filter(|a| a.category == *category && span.map_or(true, |s| a.span.overlaps(&s)))
            .collect()
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.documents.values().flatten().find(|a| a.id == id)
    }

    pub fn has_pending_hook(&self, doc: &DocumentId, category: &Category) -> bool {
        self.hooks.is_pending(doc, category)
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    fn allocate_id(&mut self) -> AnnotationId {
        self.next_id += 1;
        AnnotationId(self.next_id)
    }

    fn locate(&self, id: AnnotationId) -> Option<(DocumentId, Category)> {
        self.get(id).map(|a| (a.document.clone(), a.category.clone()))
    }

    /// Drop the next-command hook once nothing of `category` waits for it.
    fn release_hook_if_idle(&mut self, doc: &DocumentId, category: &Category) {
        let waiting = self.annotations(doc).iter().any(|a| {
            a.category == *category && a.removal_policy == RemovalPolicy::BeforeNextCommand
        });
        if !waiting {
            self.hooks.deregister(doc, category);
        }
    }
}

/// Turn a location into the span an annotation attaches to.
fn resolve_span(text: &str, location: Location, cursor: Option<usize>) -> Option<Span> {
    let point = match location {
        Location::Span(span) => {
            let valid = span.end <= text.len()
                && text.is_char_boundary(span.start)
                && text.is_char_boundary(span.end);
            return valid.then_some(span);
        }
        Location::Point(offset) => offset,
        Location::Cursor => cursor?,
    };
    if point > text.len() || !text.is_char_boundary(point) {
        return None;
    }

    let form_end = skip_whitespace_backward(text, point);
    let start = preceding_form_start(text, form_end).unwrap_or_else(|| line_start(text, form_end));
    Some(Span::new(start, line_end(text, form_end)))
}

/// Whether rendered text anchored at `line`/`column` is fully on screen.
fn is_visible(viewport: &Viewport, line: u32, column: usize, display_text: &str) -> bool {
    if !viewport.shows_line(line) {
        return false;
    }
    if viewport.soft_wrap {
        return true;
    }
    match display_text.strip_prefix('\n') {
        Some(rest) => max_line_width(rest) <= viewport.width,
        None => column + max_line_width(display_text) <= viewport.width,
    }
}
