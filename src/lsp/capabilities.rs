//! LSP server capabilities registration.

use super::handlers::{CLEAR_COMMAND, EVALUATE_COMMAND};
use lsp_types::{
    ExecuteCommandOptions, HoverProviderCapability, InlayHintOptions, InlayHintServerCapabilities,
    PositionEncodingKind, ServerCapabilities, TextDocumentSyncCapability, TextDocumentSyncKind,
};

/// Build the server capabilities to advertise to clients.
pub fn server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        // Columns are counted in UTF-16 code units
        position_encoding: Some(PositionEncodingKind::UTF16),

        // Edits arrive as ranges so annotations away from them can shift
        text_document_sync: Some(TextDocumentSyncCapability::Kind(
            TextDocumentSyncKind::INCREMENTAL,
        )),

        // Full values behind truncated annotations
        hover_provider: Some(HoverProviderCapability::Simple(true)),

        // Annotations themselves
        inlay_hint_provider: Some(lsp_types::OneOf::Right(InlayHintServerCapabilities::Options(
            InlayHintOptions {
                resolve_provider: Some(false),
                work_done_progress_options: Default::default(),
            },
        ))),

        execute_command_provider: Some(ExecuteCommandOptions {
            commands: vec![EVALUATE_COMMAND.to_string(), CLEAR_COMMAND.to_string()],
            work_done_progress_options: Default::default(),
        }),

        ..Default::default()
    }
}
