//! Evaluate source text and annotate the result.

mod sexp;

pub use sexp::{read, EvalError, ReadError, SexpEvaluator, Value};

use crate::overlay::{
    Annotation, AnnotationManager, AnnotationOptions, DocumentId, EditorSurface, Evaluator,
    Location, ResultSink, Span,
};
use crate::util::{form_end, preceding_form_start, skip_whitespace_backward};

/// Outcome of a successful evaluation.
#[derive(Debug, Clone)]
pub struct Evaluation<V> {
    pub value: V,
    /// The placed annotation when it is confirmed visible.
    pub annotation: Option<Annotation>,
}

/// Span of the form that ends before `offset`, ignoring trailing whitespace.
pub fn last_form_span(text: &str, offset: usize) -> Option<Span> {
    let end = skip_whitespace_backward(text, offset);
    let start = preceding_form_start(text, end)?;
    Some(Span::new(start, end))
}

/// Evaluate the text of `source_span` and show the value inline.
///
/// The value always goes to `sink`, visible annotation or not. Returns
/// `Ok(None)` when the document or span is no longer valid; evaluator errors
/// come back untouched and leave no annotation behind.
pub fn evaluate_and_annotate<E: Evaluator>(
    manager: &mut AnnotationManager,
    surface: &dyn EditorSurface,
    evaluator: &mut E,
    sink: &mut dyn ResultSink,
    doc: &DocumentId,
    source_span: Span,
    options: &AnnotationOptions,
) -> Result<Option<Evaluation<E::Value>>, E::Error> {
    let Some(text) = surface.text(doc) else {
        tracing::debug!("Skipping evaluation in closed document {}", doc);
        return Ok(None);
    };
    let Some(raw) = text.get(source_span.start..source_span.end) else {
        tracing::debug!(
            "Skipping evaluation of invalid span {}..{} in {}",
            source_span.start,
            source_span.end,
            doc
        );
        return Ok(None);
    };

    let source = raw.trim();
    let form_start = source_span.start + (raw.len() - raw.trim_start().len());
    let source_end = form_start + source.len();

    let value = evaluator.evaluate(source)?;

    let anchor = form_end(text, form_start).map_or(source_end, |end| end.max(source_end));
    let annotation = manager.create(surface, doc, Location::Point(anchor), &value, options);

    let shown = value.to_string();
    tracing::debug!("Evaluated {:?} => {}", source, shown);
    sink.publish(&shown);

    Ok(Some(Evaluation { value, annotation }))
}
