//! Query supervisor behavior across multiple sources.

mod common;

use alejandria::QuerySupervisor;
use alejandria::types::{ProgressDetail, ProgressKind, SearchQuery};
use common::mocks::{MockSource, RecordingSink, SourceBehavior};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn supervisor(sources: Vec<(&str, SourceBehavior)>, deadline: Duration) -> QuerySupervisor {
    sources
        .into_iter()
        .fold(QuerySupervisor::new(deadline), |sup, (name, behavior)| {
            sup.with_source(Arc::new(MockSource::new(name, behavior)))
        })
}

#[tokio::test]
async fn test_three_results_emit_full_sequence() {
    let sink = RecordingSink::default();
    let sup = supervisor(vec![("arxiv", SourceBehavior::Items(3))], Duration::from_secs(5));

    let outcome = sup.run(&SearchQuery::new("RAPTOR"), Some(&sink)).await;

    assert_eq!(
        sink.trace(),
        vec![
            ("arxiv".to_string(), ProgressKind::Started),
            ("arxiv".to_string(), ProgressKind::Results),
            ("arxiv".to_string(), ProgressKind::Completed),
            ("all".to_string(), ProgressKind::Summary),
        ]
    );

    let events = sink.events();
    match &events[1].detail {
        ProgressDetail::Results { items } => assert_eq!(items.len(), 3),
        other => panic!("expected results, got {other:?}"),
    }
    match &events[2].detail {
        ProgressDetail::Completed { count } => assert_eq!(*count, 3),
        other => panic!("expected completed, got {other:?}"),
    }
    match &events[3].detail {
        ProgressDetail::Summary {
            sources_searched,
            total_results,
            ..
        } => {
            assert_eq!(*sources_searched, 1);
            assert_eq!(*total_results, 3);
        }
        other => panic!("expected summary, got {other:?}"),
    }

    assert_eq!(outcome.total_results, 3);
    assert_eq!(outcome.results["arxiv"].len(), 3);
}

#[tokio::test]
async fn test_empty_results_skip_results_event() {
    let sink = RecordingSink::default();
    let sup = supervisor(vec![("arxiv", SourceBehavior::Items(0))], Duration::from_secs(5));

    let outcome = sup.run(&SearchQuery::new("nothing"), Some(&sink)).await;

    let kinds: Vec<ProgressKind> = sink.trace().into_iter().map(|(_, k)| k).collect();
    assert_eq!(
        kinds,
        vec![ProgressKind::Started, ProgressKind::Completed, ProgressKind::Summary]
    );
    assert_eq!(outcome.total_results, 0);
    assert_eq!(outcome.sources_searched, 1);
}

#[tokio::test]
async fn test_hanging_source_times_out_near_deadline() {
    let sink = RecordingSink::default();
    let deadline = Duration::from_millis(200);
    let sup = supervisor(vec![("arxiv", SourceBehavior::Hang)], deadline);

    let start = Instant::now();
    let outcome = sup.run(&SearchQuery::new("slow"), Some(&sink)).await;
    let elapsed = start.elapsed();

    assert!(elapsed >= deadline);
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");

    let timeouts = sink
        .trace()
        .into_iter()
        .filter(|(_, k)| *k == ProgressKind::Timeout)
        .count();
    assert_eq!(timeouts, 1);
    assert!(!sink.trace().iter().any(|(_, k)| *k == ProgressKind::Results));
    assert_eq!(outcome.total_results, 0);
}

#[tokio::test]
async fn test_failing_source_does_not_stop_others() {
    let sink = RecordingSink::default();
    let sup = supervisor(
        vec![
            ("broken", SourceBehavior::Fail),
            ("slowpoke", SourceBehavior::Hang),
            ("arxiv", SourceBehavior::Items(2)),
        ],
        Duration::from_millis(150),
    );

    let outcome = sup.run(&SearchQuery::new("mixed"), Some(&sink)).await;

    assert_eq!(outcome.sources_searched, 3);
    assert_eq!(outcome.total_results, 2);
    assert!(outcome.results["broken"].is_empty());
    assert!(outcome.results["slowpoke"].is_empty());

    let trace = sink.trace();
    assert!(trace.contains(&("broken".to_string(), ProgressKind::Error)));
    assert!(trace.contains(&("slowpoke".to_string(), ProgressKind::Timeout)));
    assert!(trace.contains(&("arxiv".to_string(), ProgressKind::Results)));

    // Every source completes, and the summary closes the run.
    let completed = trace
        .iter()
        .filter(|(_, k)| *k == ProgressKind::Completed)
        .count();
    assert_eq!(completed, 3);
    assert_eq!(trace.last(), Some(&("all".to_string(), ProgressKind::Summary)));
}

#[tokio::test]
async fn test_error_message_names_source() {
    let sink = RecordingSink::default();
    let sup = supervisor(vec![("broken", SourceBehavior::Fail)], Duration::from_secs(5));

    sup.run(&SearchQuery::new("q"), Some(&sink)).await;

    let message = sink
        .events()
        .into_iter()
        .find_map(|e| match e.detail {
            ProgressDetail::Error { message } => Some(message),
            _ => None,
        })
        .expect("error event");
    assert!(message.contains("broken"));
    assert!(message.contains("connection refused"));
}

#[tokio::test]
async fn test_slow_source_within_deadline_succeeds() {
    let sink = RecordingSink::default();
    let sup = supervisor(
        vec![("arxiv", SourceBehavior::Slow(Duration::from_millis(50), 1))],
        Duration::from_secs(5),
    );

    let outcome = sup.run(&SearchQuery::new("q"), Some(&sink)).await;
    assert_eq!(outcome.total_results, 1);
    assert_eq!(
        sink.trace(),
        vec![
            ("arxiv".to_string(), ProgressKind::Started),
            ("arxiv".to_string(), ProgressKind::Results),
            ("arxiv".to_string(), ProgressKind::Completed),
            ("all".to_string(), ProgressKind::Summary),
        ]
    );
}

#[tokio::test]
async fn test_results_arriving_after_deadline_are_discarded() {
    let sink = RecordingSink::default();
    let deadline = Duration::from_millis(100);
    let sup = supervisor(
        vec![("arxiv", SourceBehavior::Slow(deadline + Duration::from_millis(50), 2))],
        deadline,
    );

    let outcome = sup.run(&SearchQuery::new("late"), Some(&sink)).await;
    // Give the abandoned fetch time to finish before checking nothing leaked.
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(outcome.total_results, 0);
    assert!(outcome.results["arxiv"].is_empty());

    let trace = sink.trace();
    assert!(!trace.iter().any(|(_, k)| *k == ProgressKind::Results));
    assert_eq!(
        trace.iter().filter(|(_, k)| *k == ProgressKind::Timeout).count(),
        1
    );
    assert_eq!(
        trace.last(),
        Some(&("all".to_string(), ProgressKind::Summary))
    );
}
