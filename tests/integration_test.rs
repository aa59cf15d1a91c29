use std::sync::Arc;
use veda_arena::prelude::*;

fn coordinator(capacity: usize, num_tasks: usize, delay_ms: u64) -> (Coordinator, Arc<MemorySink>) {
    let config = Config::builder()
        .capacity(capacity)
        .num_tasks(num_tasks)
        .build()
        .unwrap();
    let sink = Arc::new(MemorySink::new());
    let coordinator = Coordinator::new(config)
        .unwrap()
        .with_delay_provider(Arc::new(FixedDelay::from_millis(delay_ms)))
        .with_event_sink(sink.clone());
    (coordinator, sink)
}

#[test]
fn test_submit_in_scope_join_outside_never_violates() {
    let (mut coordinator, sink) = coordinator(3, 100, 2);

    let report = coordinator.run_strategy(Strategy::SubmitInScope);

    assert_eq!(report.submitted(), 100);
    assert_eq!(report.completed(), 100);
    assert_eq!(report.violations(), 0);
    assert!(report.satisfied());
    assert_eq!(sink.count(|e| matches!(e, Event::Violation { .. })), 0);
}

#[test]
fn test_join_in_admitting_scope_recruits_reserved_thread() {
    let (mut coordinator, sink) = coordinator(3, 100, 5);

    let report = coordinator.run_strategy(Strategy::JoinInScope);

    assert_eq!(report.completed(), 100);
    assert!(report.violations() >= 1);
    assert!(!report.satisfied());
    assert!(sink.count(|e| matches!(e, Event::Violation { .. })) >= 1);
    assert!(sink.count(|e| matches!(e, Event::StrategyFailed { .. })) >= 1);
}

#[test]
fn test_ambient_group_runs_on_reserved_thread() {
    let (mut coordinator, _sink) = coordinator(3, 100, 0);

    let report = coordinator.run_strategy(Strategy::Ambient);

    assert_eq!(report.completed(), 100);
    assert!(report.violations() >= 1);
    let pattern = report.pattern("Strategy 1").unwrap();
    assert_eq!(pattern.failed, pattern.violations);
    assert!(pattern.error.as_deref().unwrap().contains("reserved thread"));
}

#[test]
fn test_dedicated_thread_patterns_never_violate() {
    let (mut coordinator, sink) = coordinator(2, 100, 1);

    let report = coordinator.run_strategy(Strategy::Dedicated);

    assert!(report.error.is_none());
    assert_eq!(report.patterns.len(), 3);
    for label in ["Strategy 4a", "Strategy 4b", "Strategy 4c"] {
        let pattern = report.pattern(label).unwrap();
        assert_eq!(pattern.completed, 100, "{}", label);
        assert_eq!(pattern.violations, 0, "{}", label);
    }
    assert_eq!(sink.count(|e| matches!(e, Event::Violation { .. })), 0);
}

#[test]
fn test_isolated_strategy_keeps_reserved_thread_idle() {
    let (mut coordinator, _sink) = coordinator(3, 100, 2);

    let report = coordinator.run_strategy(Strategy::Isolated);

    assert_eq!(report.completed(), 100);
    assert_eq!(report.violations(), 0);
}

#[test]
fn test_custom_thread_with_excluding_pool_never_violates() {
    let (coordinator, sink) = coordinator(2, 40, 1);
    let mut coordinator = coordinator.with_custom_delay_provider(Arc::new(FixedDelay::from_millis(3)));

    let report = coordinator.run_strategy(Strategy::CustomThread);

    assert!(report.error.is_none());
    assert_eq!(report.completed(), 40);
    assert_eq!(report.violations(), 0);
    assert!(report.satisfied());
    assert_eq!(sink.count(|e| matches!(e, Event::Violation { .. })), 0);
    assert_eq!(
        sink.count(|e| matches!(
            e,
            Event::TaskStarted {
                role: ThreadRole::Worker { .. },
                ..
            }
        )),
        40
    );
}

#[test]
fn test_exclusion_across_capacities_and_task_counts() {
    for capacity in 1..=4 {
        for num_tasks in [1, 7, 30] {
            let (mut coordinator, _sink) = coordinator(capacity, num_tasks, 1);
            let report = coordinator.run_all(&[
                Strategy::SubmitInScope,
                Strategy::Dedicated,
                Strategy::CustomThread,
            ]);

            for strategy in &report.strategies {
                assert_eq!(
                    strategy.violations(),
                    0,
                    "{} capacity={} tasks={}",
                    strategy.strategy,
                    capacity,
                    num_tasks
                );
            }
            assert_eq!(report.strategies[0].completed(), num_tasks);
            assert_eq!(report.strategies[1].completed(), 3 * num_tasks);
            assert_eq!(report.strategies[2].completed(), num_tasks);
        }
    }
}

#[test]
fn test_ambient_violation_with_single_task() {
    let (mut coordinator, _sink) = coordinator(1, 1, 0);
    let report = coordinator.run_strategy(Strategy::Ambient);
    assert_eq!(report.violations(), 1);
    assert_eq!(report.completed(), 1);
}

#[test]
fn test_compare_runs_all_canonical_strategies() {
    let (mut coordinator, sink) = coordinator(3, 20, 2);

    let report = coordinator.compare();

    let labels: Vec<_> = report.strategies.iter().map(|r| r.strategy).collect();
    assert_eq!(labels, Strategy::CANONICAL.to_vec());
    for strategy in &report.strategies {
        assert_eq!(strategy.completed(), strategy.submitted());
    }

    let satisfying: Vec<_> = report.satisfying().map(|r| r.strategy).collect();
    assert!(satisfying.contains(&Strategy::SubmitInScope));
    assert!(satisfying.contains(&Strategy::Dedicated));
    assert!(!satisfying.contains(&Strategy::Ambient));

    let conclusion: Vec<String> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::Conclusion { line } => Some(line),
            _ => None,
        })
        .collect();
    assert_eq!(conclusion, report.conclusion());
    assert_eq!(coordinator.state(), veda_arena::coordinator::CoordinatorState::AllDone);
}

#[test]
fn test_excluded_caller_makes_join_in_scope_safe() {
    let config = Config::builder()
        .capacity(3)
        .admits_calling_thread(false)
        .num_tasks(50)
        .build()
        .unwrap();
    let mut coordinator = Coordinator::new(config)
        .unwrap()
        .with_delay_provider(Arc::new(FixedDelay::from_millis(1)))
        .with_event_sink(Arc::new(MemorySink::new()));

    let report = coordinator.run_strategy(Strategy::JoinInScope);

    assert_eq!(report.completed(), 50);
    assert_eq!(report.violations(), 0);
}

#[test]
fn test_invalid_capacity_rejected() {
    let err = Config::builder().capacity(0).build().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(matches!(WorkerPool::new(0, false), Err(Error::Config(_))));
}
