//! Integration tests for the annotation lifecycle.
//!
//! Each test drives an [`AnnotationManager`] through a [`MemorySurface`]
//! the way an editor host would: open a document, place annotations, then
//! deliver command boundaries, edits and timer ticks.

use eval_overlay::eval::{evaluate_and_annotate, SexpEvaluator, Value};
use eval_overlay::overlay::format::{truncate, wrap};
use eval_overlay::overlay::{
    AnnotationId, AnnotationManager, Category, DocumentId, Location, MemorySurface,
    OverlayConfig, RemovalPolicy, Span, Viewport, TRUNCATION_MARKER,
};
use std::time::{Duration, Instant};

fn open(text: &str, width: usize) -> (MemorySurface, DocumentId) {
    let doc = DocumentId::from("scratch.lisp");
    let mut surface = MemorySurface::new();
    surface.open(doc.clone(), text);
    surface.show_all(&doc, width);
    (surface, doc)
}

fn manager_with(policy: RemovalPolicy) -> AnnotationManager {
    AnnotationManager::new(OverlayConfig::new().with_removal_policy(policy))
}

#[test]
fn test_same_category_annotations_are_exclusive() {
    let (surface, doc) = open("(foo bar)\n(baz)\n", 80);
    let mut manager = manager_with(RemovalPolicy::Never);
    let options = manager.default_options();

    manager.create(&surface, &doc, Location::Point(9), &"first", &options);
    manager.create(&surface, &doc, Location::Point(9), &"second", &options);

    let found = manager.find(&doc, &Category::default(), None);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].value_text, "second");

    let other = options.clone().with_category("trace");
    manager.create(&surface, &doc, Location::Point(9), &"third", &other);
    assert_eq!(manager.annotations(&doc).len(), 2);

    // A different line does not overlap.
    manager.create(&surface, &doc, Location::Point(15), &"fourth", &options);
    assert_eq!(manager.find(&doc, &Category::default(), None).len(), 2);
}

#[test]
fn test_removal_is_idempotent() {
    let (surface, doc) = open("(a)", 80);
    let mut manager = manager_with(RemovalPolicy::Never);
    let options = manager.default_options();
    let annotation = manager
        .create(&surface, &doc, Location::Cursor, &1, &options)
        .unwrap();

    assert!(manager.remove(annotation.id));
    assert!(!manager.remove(annotation.id));
    assert!(!manager.remove(AnnotationId(9999)));
    assert_eq!(manager.remove_by_category(&doc, &Category::default(), None), 0);
    assert_eq!(
        manager.remove_by_category(&DocumentId::from("never-opened"), &Category::default(), None),
        0
    );
    assert!(manager.annotations(&doc).is_empty());
}

#[test]
fn test_long_values_are_truncated_at_three_viewport_widths() {
    let (surface, doc) = open("(long)", 10);
    let mut manager = manager_with(RemovalPolicy::Never);
    let options = manager.default_options();
    let value = "x".repeat(50);

    manager.create(&surface, &doc, Location::Cursor, &value, &options);

    let annotation = &manager.annotations(&doc)[0];
    let formatted = format!(" => {} ", value);
    // The marker spans two lines, so the text also wraps.
    assert_eq!(
        annotation.display_text,
        format!("\n{}{}", &formatted[..30], TRUNCATION_MARKER)
    );
    assert_eq!(annotation.value_text, value);
}

#[test]
fn test_truncate_leaves_short_text_alone() {
    assert_eq!(truncate("abc".to_string(), 3), "abc");
    assert_eq!(truncate("abcd".to_string(), 3), format!("abc{}", TRUNCATION_MARKER));
}

#[test]
fn test_wrap_triggers_on_newline_or_lack_of_room() {
    assert_eq!(wrap("abc".to_string(), 10), "abc");
    assert_eq!(wrap("abc".to_string(), 3), "abc");
    assert_eq!(wrap("abcdef".to_string(), 3), "\nabcdef");
    assert_eq!(wrap("a\nb".to_string(), 10), "\na\nb");
}

#[test]
fn test_annotations_outside_the_viewport_are_not_reported_visible() {
    let text: String = (0..30).map(|i| format!("(line {})\n", i)).collect();
    let (mut surface, doc) = open(&text, 80);
    surface.set_viewport(&doc, Some(Viewport::new(0, 5, 80)));
    let mut manager = manager_with(RemovalPolicy::Never);
    let options = manager.default_options();

    let line_20_end = text.match_indices('\n').nth(20).map(|(i, _)| i).unwrap();
    let hidden = manager.create(&surface, &doc, Location::Point(line_20_end), &20, &options);
    assert!(hidden.is_none());
    // Still attached; only the caller's fallback differs.
    assert_eq!(manager.annotations(&doc).len(), 1);

    let line_2_end = text.match_indices('\n').nth(2).map(|(i, _)| i).unwrap();
    let shown = manager.create(&surface, &doc, Location::Point(line_2_end), &2, &options);
    assert!(shown.is_some());
}

#[test]
fn test_narrow_viewport_hides_wide_text_unless_soft_wrapped() {
    let (mut surface, doc) = open("(wide)", 20);
    let mut manager = manager_with(RemovalPolicy::Never);
    let options = manager.default_options();
    let value = "y".repeat(30);

    assert!(manager
        .create(&surface, &doc, Location::Cursor, &value, &options)
        .is_none());

    surface.set_viewport(&doc, Some(Viewport::new(0, 0, 20).with_soft_wrap(true)));
    assert!(manager
        .create(&surface, &doc, Location::Cursor, &value, &options)
        .is_some());
}

#[test]
fn test_evaluate_shows_result_until_next_command() {
    let (mut surface, doc) = open("(+ 1 2)\n", 80);
    let mut manager = AnnotationManager::new(OverlayConfig::default());
    let mut evaluator = SexpEvaluator::new();
    let mut sink: Vec<String> = Vec::new();
    let options = manager.default_options();

    surface.begin_command();
    let evaluation = evaluate_and_annotate(
        &mut manager,
        &surface,
        &mut evaluator,
        &mut sink,
        &doc,
        Span::new(0, 7),
        &options,
    )
    .unwrap()
    .unwrap();
    surface.end_command();

    assert_eq!(evaluation.value, Value::Int(3));
    let annotation = evaluation.annotation.unwrap();
    assert_eq!(annotation.display_text, " => 3 ");
    assert_eq!(annotation.span, Span::new(0, 7));
    assert_eq!(sink, vec!["3".to_string()]);
    assert_eq!(manager.annotations(&doc).len(), 1);

    assert_eq!(manager.pre_command(&doc), 1);
    assert!(manager.annotations(&doc).is_empty());
    assert!(!manager.has_pending_hook(&doc, &Category::default()));
}

#[test]
fn test_next_command_removal_only_fires_once() {
    let (mut surface, doc) = open("(a)\n(b)\n", 80);
    let mut manager = manager_with(RemovalPolicy::BeforeNextCommand);
    let options = manager.default_options();

    surface.begin_command();
    manager.create(&surface, &doc, Location::Point(3), &"a", &options);
    manager.create(&surface, &doc, Location::Point(7), &"b", &options);
    surface.end_command();
    assert_eq!(manager.annotations(&doc).len(), 2);
    assert!(manager.has_pending_hook(&doc, &Category::default()));

    assert_eq!(manager.pre_command(&doc), 2);
    assert_eq!(manager.pre_command(&doc), 0);
    assert!(!manager.has_pending_hook(&doc, &Category::default()));
}

#[test]
fn test_edits_remove_touched_annotations_and_shift_the_rest() {
    let (mut surface, doc) = open("(a)\n(b)\n", 80);
    let mut manager = manager_with(RemovalPolicy::Never);
    let options = manager.default_options();
    manager.create(&surface, &doc, Location::Point(7), &"b", &options);
    assert_eq!(manager.annotations(&doc)[0].span, Span::new(4, 7));

    let edit = surface.edit(&doc, Span::point(0), "xx").unwrap();
    assert_eq!(manager.text_edited(&doc, edit), 0);
    assert_eq!(manager.annotations(&doc)[0].span, Span::new(6, 9));

    let edit = surface.edit(&doc, Span::new(7, 8), "c").unwrap();
    assert_eq!(manager.text_edited(&doc, edit), 1);
    assert!(manager.annotations(&doc).is_empty());
}

#[test]
fn test_timers_fire_after_deadline_and_cancel_on_removal() {
    let (surface, doc) = open("(a)\n(b)\n", 80);
    let mut manager = manager_with(RemovalPolicy::AfterDuration(Duration::from_secs(10)));
    let options = manager.default_options();

    let start = Instant::now();
    manager.create(&surface, &doc, Location::Point(3), &"a", &options);
    let b = manager
        .create(&surface, &doc, Location::Point(7), &"b", &options)
        .unwrap();
    assert_eq!(manager.pending_timers(), 2);
    assert!(manager.next_deadline().is_some_and(|d| d >= start + Duration::from_secs(10)));

    assert!(manager.remove(b.id));
    assert_eq!(manager.pending_timers(), 1);

    assert_eq!(manager.fire_due_timers(start), 0);
    assert_eq!(manager.annotations(&doc).len(), 1);
    assert_eq!(manager.fire_due_timers(start + Duration::from_secs(11)), 1);
    assert!(manager.annotations(&doc).is_empty());
    assert_eq!(manager.next_deadline(), None);
}
