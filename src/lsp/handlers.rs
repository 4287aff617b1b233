//! LSP request and notification handlers.

use super::workspace::{doc_id, ServerConfig, Workspace};
use crate::eval::{evaluate_and_annotate, last_form_span, EvalError, SexpEvaluator};
use crate::output::{find_annotation_at_position, format_hover, format_inlay_hints};
use crate::overlay::{AnnotationManager, Category, EditorSurface, ResultSink, Span, TextEdit};
use crate::util::position_to_offset;
use anyhow::Result;
use lsp_server::{Message, Notification, Request, RequestId};
use lsp_types::notification::{LogMessage, ShowMessage};
use lsp_types::request::{InlayHintRefreshRequest, Request as _};
use lsp_types::{
    ExecuteCommandParams, Hover, HoverParams, InlayHint, InlayHintParams, LogMessageParams,
    MessageType, Position, Range, ShowMessageParams, TextDocumentContentChangeEvent, Uri,
};
use serde::Deserialize;
use std::time::Instant;
use thiserror::Error;

type Url = Uri;

pub const EVALUATE_COMMAND: &str = "evalOverlay.evaluate";
pub const CLEAR_COMMAND: &str = "evalOverlay.clear";

/// Failures of `workspace/executeCommand`.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("document not open: {0}")]
    UnknownDocument(String),
    #[error("no form before the given position")]
    NoForm,
    #[error(transparent)]
    Evaluation(#[from] EvalError),
}

impl CommandError {
    /// Whether the client sent something unusable, as opposed to a failed evaluation.
    pub fn is_invalid_params(&self) -> bool {
        matches!(self, Self::UnknownCommand(_) | Self::InvalidArguments(_))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateArgs {
    uri: Url,
    range: Option<Range>,
    position: Option<Position>,
}

#[derive(Debug, Deserialize)]
struct ClearArgs {
    uri: Url,
}

/// Results go to the client's log, which always shows them.
struct LogSink<'a> {
    outbox: &'a mut Vec<Message>,
}

impl ResultSink for LogSink<'_> {
    fn publish(&mut self, value: &str) {
        self.outbox.push(notification::<LogMessage>(LogMessageParams {
            typ: MessageType::LOG,
            message: value.to_string(),
        }));
    }
}

fn notification<N>(params: N::Params) -> Message
where
    N: lsp_types::notification::Notification,
{
    Message::Notification(Notification::new(N::METHOD.to_string(), params))
}

/// State for the LSP server.
pub struct ServerState {
    workspace: Workspace,
    manager: AnnotationManager,
    evaluator: SexpEvaluator,
    /// Messages to send once the current one is handled.
    outbox: Vec<Message>,
    refresh_pending: bool,
    /// The client accepts `workspace/inlayHint/refresh`.
    refresh_supported: bool,
    next_request_id: i32,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            workspace: Workspace::new(&config),
            manager: AnnotationManager::new(config.overlay),
            evaluator: SexpEvaluator::new(),
            outbox: Vec::new(),
            refresh_pending: false,
            refresh_supported: false,
            next_request_id: 0,
        }
    }

    pub fn with_inlay_hint_refresh(mut self, supported: bool) -> Self {
        self.refresh_supported = supported;
        self
    }

    pub fn manager(&self) -> &AnnotationManager {
        &self.manager
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Open a document.
    pub fn open_document(&mut self, uri: Url, content: String) {
        let doc = doc_id(&uri);
        self.manager.close_document(&doc);
        self.workspace.open(doc, content);
    }

    /// Apply content changes. Every change notification starts a new command.
    pub fn change_document(&mut self, uri: &Url, changes: Vec<TextDocumentContentChangeEvent>) {
        let doc = doc_id(uri);
        let mut removed = self.manager.pre_command(&doc);

        for change in changes {
            let Some(text) = self.workspace.text_mut(&doc) else {
                tracing::warn!("Change for unknown document: {}", uri.as_str());
                return;
            };
            match change.range {
                Some(range) => {
                    let start = position_to_offset(text, range.start);
                    let end = position_to_offset(text, range.end).max(start);
                    let edit = TextEdit::replacement(Span::new(start, end), change.text.len());
                    removed += self.manager.text_edited(&doc, edit);
                    text.replace_range(start..end, &change.text);
                }
                None => {
                    *text = change.text;
                    removed += self.manager.annotations(&doc).len();
                    self.manager.close_document(&doc);
                }
            }
        }

        if removed > 0 {
            self.refresh_pending = true;
        }
    }

    /// Close a document.
    pub fn close_document(&mut self, uri: &Url) {
        let doc = doc_id(uri);
        self.manager.close_document(&doc);
        self.workspace.close(&doc);
    }

    /// Expire timed annotations.
    pub fn fire_due_timers(&mut self, now: Instant) {
        if self.manager.fire_due_timers(now) > 0 {
            self.refresh_pending = true;
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.manager.next_deadline()
    }

    /// Take pending outgoing messages, adding a hint refresh when annotations changed.
    pub fn drain_outbox(&mut self) -> Vec<Message> {
        if std::mem::take(&mut self.refresh_pending) && self.refresh_supported {
            let id = RequestId::from(self.next_request_id);
            self.next_request_id += 1;
            self.outbox.push(Message::Request(Request::new(
                id,
                InlayHintRefreshRequest::METHOD.to_string(),
                (),
            )));
        }
        std::mem::take(&mut self.outbox)
    }

    fn evaluate(&mut self, args: EvaluateArgs) -> Result<Option<serde_json::Value>, CommandError> {
        let doc = doc_id(&args.uri);
        if self.manager.pre_command(&doc) > 0 {
            self.refresh_pending = true;
        }

        let text = self
            .workspace
            .text(&doc)
            .ok_or_else(|| CommandError::UnknownDocument(args.uri.as_str().to_string()))?;
        let (span, cursor) = match (args.range, args.position) {
            (Some(range), _) => {
                let start = position_to_offset(text, range.start);
                let end = position_to_offset(text, range.end);
                (Span::new(start, end), end.max(start))
            }
            (None, Some(position)) => {
                let offset = position_to_offset(text, position);
                (last_form_span(text, offset).ok_or(CommandError::NoForm)?, offset)
            }
            (None, None) => {
                return Err(CommandError::InvalidArguments(
                    "expected `range` or `position`".to_string(),
                ))
            }
        };
        self.workspace.set_cursor(&doc, cursor);

        let options = self.manager.default_options();
        self.workspace.set_in_command(true);
        let result = evaluate_and_annotate(
            &mut self.manager,
            &self.workspace,
            &mut self.evaluator,
            &mut LogSink { outbox: &mut self.outbox },
            &doc,
            span,
            &options,
        );
        self.workspace.set_in_command(false);

        let Some(evaluation) = result? else {
            return Ok(None);
        };
        let shown = evaluation.value.to_string();
        match &evaluation.annotation {
            Some(annotation) => {
                tracing::info!(
                    "Annotated {} at {}..{}",
                    doc,
                    annotation.span.start,
                    annotation.span.end
                );
                self.refresh_pending = true;
            }
            None => {
                tracing::debug!("Annotation not visible in {}, showing message", doc);
                self.outbox.push(notification::<ShowMessage>(ShowMessageParams {
                    typ: MessageType::INFO,
                    message: format!("{}{}", self.manager.config().result_prefix, shown),
                }));
            }
        }
        Ok(Some(serde_json::Value::String(shown)))
    }

    fn clear(&mut self, args: ClearArgs) -> usize {
        let doc = doc_id(&args.uri);
        let removed = self.manager.remove_by_category(&doc, &Category::default(), None);
        if removed > 0 {
            self.refresh_pending = true;
        }
        removed
    }
}

/// Handle workspace/executeCommand request.
pub fn handle_execute_command(
    state: &mut ServerState,
    params: ExecuteCommandParams,
) -> Result<Option<serde_json::Value>, CommandError> {
    tracing::info!("Execute command: {}", params.command);
    let argument = params.arguments.into_iter().next().unwrap_or_default();

    match params.command.as_str() {
        EVALUATE_COMMAND => {
            let args: EvaluateArgs = serde_json::from_value(argument)
                .map_err(|e| CommandError::InvalidArguments(e.to_string()))?;
            state.evaluate(args)
        }
        CLEAR_COMMAND => {
            let args: ClearArgs = serde_json::from_value(argument)
                .map_err(|e| CommandError::InvalidArguments(e.to_string()))?;
            let removed = state.clear(args);
            Ok(Some(serde_json::Value::from(removed)))
        }
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

/// Handle textDocument/inlayHint request.
///
/// The requested range is taken as the visible part of the document.
pub fn handle_inlay_hints(
    state: &mut ServerState,
    params: InlayHintParams,
) -> Result<Option<Vec<InlayHint>>> {
    let uri = &params.text_document.uri;
    let doc = doc_id(uri);
    tracing::debug!("Inlay hint request for: {}", uri.as_str());

    if state.workspace.text(&doc).is_none() {
        tracing::warn!("Document not found: {}", uri.as_str());
        return Ok(None);
    }
    state
        .workspace
        .set_visible_lines(&doc, params.range.start.line, params.range.end.line);

    let document = state.workspace.text(&doc).unwrap_or_default();

    let hints = format_inlay_hints(state.manager.annotations(&doc), document, params.range);
    tracing::debug!("Returning {} inlay hints", hints.len());
    Ok(Some(hints))
}

/// Handle textDocument/hover request.
pub fn handle_hover(state: &ServerState, params: HoverParams) -> Result<Option<Hover>> {
    let uri = &params.text_document_position_params.text_document.uri;
    let position = params.text_document_position_params.position;
    let doc = doc_id(uri);

    let Some(document) = state.workspace.text(&doc) else {
        return Ok(None);
    };

    Ok(
        find_annotation_at_position(state.manager.annotations(&doc), document, position)
            .map(|annotation| format_hover(annotation, document)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{Annotation, OverlayConfig, RemovalPolicy};
    use lsp_types::{
        HoverContents, TextDocumentIdentifier, TextDocumentPositionParams, WorkDoneProgressParams,
    };
    use std::str::FromStr;

    fn uri() -> Url {
        Url::from_str("file:///tmp/scratch.lisp").unwrap()
    }

    fn annotations(state: &ServerState) -> &[Annotation] {
        state.manager().annotations(&doc_id(&uri()))
    }

    fn state_with(text: &str) -> ServerState {
        let mut state = ServerState::new(ServerConfig::default()).with_inlay_hint_refresh(true);
        state.open_document(uri(), text.to_string());
        state
    }

    fn pos(line: u32, character: u32) -> Position {
        Position { line, character }
    }

    fn show_lines(state: &mut ServerState, first: u32, last: u32) -> Vec<InlayHint> {
        let params = InlayHintParams {
            work_done_progress_params: WorkDoneProgressParams::default(),
            text_document: TextDocumentIdentifier { uri: uri() },
            range: Range { start: pos(first, 0), end: pos(last, 0) },
        };
        handle_inlay_hints(state, params).unwrap().unwrap_or_default()
    }

    fn evaluate_at(
        state: &mut ServerState,
        position: Position,
    ) -> Result<Option<serde_json::Value>, CommandError> {
        let params = ExecuteCommandParams {
            command: EVALUATE_COMMAND.to_string(),
            arguments: vec![serde_json::json!({ "uri": uri().as_str(), "position": position })],
            work_done_progress_params: WorkDoneProgressParams::default(),
        };
        handle_execute_command(state, params)
    }

    fn methods(messages: &[Message]) -> Vec<String> {
        messages
            .iter()
            .map(|m| match m {
                Message::Request(r) => r.method.clone(),
                Message::Notification(n) => n.method.clone(),
                Message::Response(_) => "response".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_evaluate_in_visible_range_annotates() {
        let mut state = state_with("(+ 1 2)\n");
        show_lines(&mut state, 0, 10);

        let value = evaluate_at(&mut state, pos(0, 7)).unwrap();
        assert_eq!(value, Some(serde_json::json!("3")));
        assert_eq!(annotations(&state).len(), 1);

        let hints = show_lines(&mut state, 0, 10);
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].position, pos(0, 7));

        let sent = methods(&state.drain_outbox());
        assert_eq!(sent, vec!["window/logMessage", "workspace/inlayHint/refresh"]);
    }

    #[test]
    fn test_evaluate_without_viewport_falls_back_to_message() {
        let mut state = state_with("(* 6 7)");

        let value = evaluate_at(&mut state, pos(0, 7)).unwrap();
        assert_eq!(value, Some(serde_json::json!("42")));
        // Placed, but nothing says the client can see it.
        assert_eq!(annotations(&state).len(), 1);

        let sent = methods(&state.drain_outbox());
        assert_eq!(sent, vec!["window/logMessage", "window/showMessage"]);
    }

    #[test]
    fn test_evaluation_error_reports_and_leaves_nothing() {
        let mut state = state_with("(/ 1 0)");
        show_lines(&mut state, 0, 1);

        let err = evaluate_at(&mut state, pos(0, 7)).unwrap_err();
        assert!(matches!(err, CommandError::Evaluation(EvalError::DivisionByZero)));
        assert!(!err.is_invalid_params());
        assert!(annotations(&state).is_empty());
    }

    #[test]
    fn test_change_is_a_command_boundary() {
        let mut state = state_with("(+ 1 2)\n");
        show_lines(&mut state, 0, 10);
        evaluate_at(&mut state, pos(0, 7)).unwrap();
        state.drain_outbox();

        state.change_document(
            &uri(),
            vec![TextDocumentContentChangeEvent {
                range: Some(Range { start: pos(1, 0), end: pos(1, 0) }),
                range_length: None,
                text: "x".to_string(),
            }],
        );

        assert!(annotations(&state).is_empty());
        assert_eq!(state.workspace().text(&doc_id(&uri())), Some("(+ 1 2)\nx"));
        assert_eq!(methods(&state.drain_outbox()), vec!["workspace/inlayHint/refresh"]);
    }

    #[test]
    fn test_no_refresh_request_without_client_support() {
        let mut state = ServerState::new(ServerConfig::default());
        state.open_document(uri(), "(+ 1 2)\n".to_string());
        show_lines(&mut state, 0, 10);
        evaluate_at(&mut state, pos(0, 7)).unwrap();

        assert_eq!(methods(&state.drain_outbox()), vec!["window/logMessage"]);
        state.change_document(
            &uri(),
            vec![TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: "(+ 2 2)\n".to_string(),
            }],
        );
        assert!(annotations(&state).is_empty());
        assert!(state.drain_outbox().is_empty());
    }

    #[test]
    fn test_clear_and_hover() {
        let mut state = ServerState::new(ServerConfig {
            overlay: OverlayConfig::new().with_removal_policy(RemovalPolicy::Never),
            ..ServerConfig::default()
        });
        state.open_document(uri(), "(list 1 2)".to_string());
        show_lines(&mut state, 0, 1);
        evaluate_at(&mut state, pos(0, 10)).unwrap();

        let hover = handle_hover(
            &state,
            HoverParams {
                text_document_position_params: TextDocumentPositionParams {
                    text_document: TextDocumentIdentifier { uri: uri() },
                    position: pos(0, 3),
                },
                work_done_progress_params: WorkDoneProgressParams::default(),
            },
        )
        .unwrap()
        .unwrap();
        let HoverContents::Markup(markup) = hover.contents else {
            panic!("expected markup hover");
        };
        assert!(markup.value.contains("(1 2)"));

        let params = ExecuteCommandParams {
            command: CLEAR_COMMAND.to_string(),
            arguments: vec![serde_json::json!({ "uri": uri().as_str() })],
            work_done_progress_params: WorkDoneProgressParams::default(),
        };
        assert_eq!(
            handle_execute_command(&mut state, params).unwrap(),
            Some(serde_json::json!(1))
        );
        assert!(annotations(&state).is_empty());
    }

    #[test]
    fn test_unknown_command_is_invalid_params() {
        let mut state = state_with("");
        let params = ExecuteCommandParams {
            command: "evalOverlay.nope".to_string(),
            arguments: vec![],
            work_done_progress_params: WorkDoneProgressParams::default(),
        };
        let err = handle_execute_command(&mut state, params).unwrap_err();
        assert!(err.is_invalid_params());
    }
}
