//! Evaluation options.

use crate::draft::Draft;
use std::sync::Arc;

/// Shape of the evaluation result (see `result`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// A single boolean, no detail. Enables short-circuiting.
    Flag,
    /// A flat list of per-location outcomes.
    List,
    /// The full result tree.
    Hierarchical,
}

/// A structured trace event, delivered to the optional trace callback.
#[derive(Debug, Clone, Copy)]
pub struct TraceEvent<'a> {
    pub evaluation_path: &'a str,
    pub instance_location: &'a str,
    pub message: &'a str,
}

pub type TraceFn = dyn Fn(TraceEvent<'_>) + Send + Sync;

/// Options for one evaluation call.
#[derive(Clone)]
pub struct EvalOptions {
    /// Shape of the result.
    pub output_format: OutputFormat,
    /// Overrides the schema's `$schema` declaration when set.
    pub evaluate_as: Option<Draft>,
    /// When false, keywords outside the active vocabularies are dropped
    /// instead of being collected as annotations.
    pub process_custom_keywords: bool,
    /// When true, `format` asserts instead of merely annotating.
    pub require_format_validation: bool,
    /// Base URI for root schemas that carry no `$id`.
    pub default_base_uri: String,
    /// Optional structured trace callback.
    pub trace: Option<Arc<TraceFn>>,
}

pub const DEFAULT_BASE_URI: &str = "https://jsonworks.local/schema";

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            output_format: OutputFormat::Hierarchical,
            evaluate_as: None,
            process_custom_keywords: false,
            require_format_validation: false,
            default_base_uri: DEFAULT_BASE_URI.to_string(),
            trace: None,
        }
    }
}

impl EvalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_evaluate_as(mut self, draft: Draft) -> Self {
        self.evaluate_as = Some(draft);
        self
    }

    pub fn with_custom_keywords(mut self, process: bool) -> Self {
        self.process_custom_keywords = process;
        self
    }

    pub fn with_format_validation(mut self, require: bool) -> Self {
        self.require_format_validation = require;
        self
    }

    pub fn with_default_base_uri(mut self, uri: impl Into<String>) -> Self {
        self.default_base_uri = uri.into();
        self
    }

    pub fn with_trace(mut self, trace: Arc<TraceFn>) -> Self {
        self.trace = Some(trace);
        self
    }
}

impl std::fmt::Debug for EvalOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalOptions")
            .field("output_format", &self.output_format)
            .field("evaluate_as", &self.evaluate_as)
            .field("process_custom_keywords", &self.process_custom_keywords)
            .field("require_format_validation", &self.require_format_validation)
            .field("default_base_uri", &self.default_base_uri)
            .field("trace", &self.trace.as_ref().map(|_| "fn"))
            .finish()
    }
}
