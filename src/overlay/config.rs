//! Configuration for annotation placement and styling.

use super::format::DisplayFormat;
use super::types::{Category, DisplayMode, Face, RemovalPolicy};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Glyphs placed before the rendered value.
pub const DEFAULT_RESULT_PREFIX: &str = "=> ";

/// Width assumed for documents without a viewport.
pub const DEFAULT_FALLBACK_WIDTH: usize = 80;

/// Faces for light and dark displays.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThemedFace {
    pub light: Face,
    pub dark: Face,
}

impl Default for ThemedFace {
    fn default() -> Self {
        Self {
            light: Face::new("grey90", "yellow"),
            dark: Face::new("grey10", "yellow"),
        }
    }
}

impl ThemedFace {
    pub fn for_mode(&self, mode: DisplayMode) -> &Face {
        match mode {
            DisplayMode::Light => &self.light,
            DisplayMode::Dark => &self.dark,
        }
    }
}

/// Manager-wide defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlayConfig {
    /// Prepended to the rendered value.
    pub result_prefix: String,
    /// Colorize rendered values as source instead of a flat face.
    pub use_syntax_coloring: bool,
    pub removal_policy: RemovalPolicy,
    pub style: ThemedFace,
    pub fallback_width: usize,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayConfig {
    pub fn new() -> Self {
        Self {
            result_prefix: DEFAULT_RESULT_PREFIX.to_string(),
            use_syntax_coloring: true,
            removal_policy: RemovalPolicy::default(),
            style: ThemedFace::default(),
            fallback_width: DEFAULT_FALLBACK_WIDTH,
        }
    }

    pub fn with_result_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.result_prefix = prefix.into();
        self
    }

    pub fn with_syntax_coloring(mut self, enabled: bool) -> Self {
        self.use_syntax_coloring = enabled;
        self
    }

    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = policy;
        self
    }

    pub fn with_style(mut self, style: ThemedFace) -> Self {
        self.style = style;
        self
    }

    pub fn with_fallback_width(mut self, width: usize) -> Self {
        self.fallback_width = width.max(1);
        self
    }

    /// Per-call options carrying this config's defaults.
    pub fn default_options(&self) -> AnnotationOptions {
        AnnotationOptions {
            category: Category::default(),
            removal_policy: self.removal_policy,
            display_format: DisplayFormat::with_prefix(&self.result_prefix),
            syntax_coloring: self.use_syntax_coloring,
            face: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Options for a single `create` call.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationOptions {
    pub category: Category,
    pub removal_policy: RemovalPolicy,
    pub display_format: DisplayFormat,
    pub syntax_coloring: bool,
    /// Overrides the configured light/dark face.
    pub face: Option<Face>,
    /// Pass-through style attributes.
    pub extra: BTreeMap<String, String>,
}

impl Default for AnnotationOptions {
    fn default() -> Self {
        OverlayConfig::default().default_options()
    }
}

impl AnnotationOptions {
    pub fn with_category(mut self, category: impl Into<Category>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = policy;
        self
    }

    pub fn with_display_format(mut self, format: DisplayFormat) -> Self {
        self.display_format = format;
        self
    }

    pub fn with_syntax_coloring(mut self, enabled: bool) -> Self {
        self.syntax_coloring = enabled;
        self
    }

    pub fn with_face(mut self, face: Face) -> Self {
        self.face = Some(face);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}
