//! Open documents and client-reported geometry, seen as an editing surface.

use crate::overlay::{DisplayMode, DocumentId, EditorSurface, OverlayConfig, Viewport};
use lsp_types::Uri;
use serde::Deserialize;
use std::collections::HashMap;

/// Settings read from `initializationOptions`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(flatten)]
    pub overlay: OverlayConfig,
    /// Columns assumed for editor windows; LSP does not report them.
    pub viewport_width: usize,
    pub soft_wrap: bool,
    pub display_mode: DisplayMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            overlay: OverlayConfig::default(),
            viewport_width: 100,
            soft_wrap: false,
            display_mode: DisplayMode::default(),
        }
    }
}

pub fn doc_id(uri: &Uri) -> DocumentId {
    DocumentId::new(uri.as_str())
}

/// Document texts plus the last visible range the client asked hints for.
#[derive(Debug, Default)]
pub struct Workspace {
    documents: HashMap<DocumentId, String>,
    viewports: HashMap<DocumentId, Viewport>,
    cursors: HashMap<DocumentId, usize>,
    viewport_width: usize,
    soft_wrap: bool,
    display_mode: DisplayMode,
    in_command: bool,
}

impl Workspace {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            viewport_width: config.viewport_width.max(1),
            soft_wrap: config.soft_wrap,
            display_mode: config.display_mode,
            ..Default::default()
        }
    }

    pub fn open(&mut self, doc: DocumentId, text: String) {
        self.viewports.remove(&doc);
        self.cursors.remove(&doc);
        self.documents.insert(doc, text);
    }

    pub fn close(&mut self, doc: &DocumentId) {
        self.documents.remove(doc);
        self.viewports.remove(doc);
        self.cursors.remove(doc);
    }

    pub fn text_mut(&mut self, doc: &DocumentId) -> Option<&mut String> {
        self.documents.get_mut(doc)
    }

    /// Record the lines the client is displaying.
    pub fn set_visible_lines(&mut self, doc: &DocumentId, first: u32, last: u32) {
        let viewport =
            Viewport::new(first, last.max(first), self.viewport_width).with_soft_wrap(self.soft_wrap);
        self.viewports.insert(doc.clone(), viewport);
    }

    pub fn set_cursor(&mut self, doc: &DocumentId, offset: usize) {
        self.cursors.insert(doc.clone(), offset);
    }

    pub fn set_in_command(&mut self, in_command: bool) {
        self.in_command = in_command;
    }
}

impl EditorSurface for Workspace {
    fn text(&self, doc: &DocumentId) -> Option<&str> {
        self.documents.get(doc).map(String::as_str)
    }

    fn cursor(&self, doc: &DocumentId) -> Option<usize> {
        self.cursors.get(doc).copied()
    }

    fn viewport(&self, doc: &DocumentId) -> Option<Viewport> {
        self.viewports.get(doc).copied()
    }

    fn command_in_progress(&self) -> bool {
        self.in_command
    }

    fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::RemovalPolicy;

    #[test]
    fn test_server_config_from_initialization_options() {
        let config: ServerConfig = serde_json::from_value(serde_json::json!({
            "resultPrefix": "∴ ",
            "removalPolicy": { "kind": "never" },
            "viewportWidth": 120,
            "softWrap": true,
            "displayMode": "dark"
        }))
        .unwrap();

        assert_eq!(config.overlay.result_prefix, "∴ ");
        assert_eq!(config.overlay.removal_policy, RemovalPolicy::Never);
        assert_eq!(config.viewport_width, 120);
        assert!(config.soft_wrap);
        assert_eq!(config.display_mode, DisplayMode::Dark);
    }

    #[test]
    fn test_empty_options_use_defaults() {
        let config: ServerConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_visible_lines_become_viewport() {
        let config = ServerConfig::default();
        let mut workspace = Workspace::new(&config);
        let doc = DocumentId::from("file:///a.lisp");
        workspace.open(doc.clone(), "(+ 1 2)".to_string());
        assert_eq!(workspace.viewport(&doc), None);

        workspace.set_visible_lines(&doc, 3, 40);
        assert_eq!(workspace.viewport(&doc), Some(Viewport::new(3, 40, 100)));
        workspace.close(&doc);
        assert_eq!(workspace.text(&doc), None);
        assert_eq!(workspace.viewport(&doc), None);
    }
}
