//! Strategy orchestration.
//!
//! The [`Coordinator`] runs each [`Strategy`] against a fresh task group and,
//! when the strategy needs one, a fresh [`WorkerPool`]. Every unit checks the
//! [`ReservedThreadGuard`] before sleeping for a delay drawn from the injected
//! [`DelayProvider`]; violations are counted, reported through the
//! [`EventSink`] and never stop the run.

pub mod report;
pub mod strategy;

pub use report::{ComparisonReport, PatternReport, StrategyReport};
pub use strategy::{DelayProfile, JoinPlacement, Pattern, Strategy, Submission};

use crate::config::{Config, PoolConfig};
use crate::context::{self, ContextProvider};
use crate::error::Result;
use crate::executor::{PanicStrategy, UnitId, WorkerPool};
use crate::guard::{ReservedThread, ReservedThreadGuard};
use crate::scope::{isolate, TaskGroup};
use crate::telemetry::{Event, EventSink, TracingSink};
use crate::util::{DelayProvider, UniformDelay};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    NotStarted,
    Running(Strategy),
    Completed(Strategy),
    AllDone,
}

#[derive(Debug)]
pub struct Coordinator {
    config: Config,
    guard: Arc<ReservedThreadGuard>,
    delays: Arc<dyn DelayProvider>,
    custom_delays: Arc<dyn DelayProvider>,
    sink: Arc<dyn EventSink>,
    state: CoordinatorState,
}

impl Coordinator {
    /// Build a coordinator and reserve the calling thread.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let delays = UniformDelay::new(config.delay_lower_ms, config.delay_upper_ms)?;
        let custom_delays =
            UniformDelay::new(config.custom_delay_lower_ms, config.custom_delay_upper_ms)?;
        let guard = ReservedThreadGuard::new(ReservedThread::capture());

        Ok(Self {
            config,
            guard: Arc::new(guard),
            delays: Arc::new(delays),
            custom_delays: Arc::new(custom_delays),
            sink: Arc::new(TracingSink),
            state: CoordinatorState::NotStarted,
        })
    }

    /// Replace the delay source for every unit, custom-thread units included.
    pub fn with_delay_provider(mut self, delays: Arc<dyn DelayProvider>) -> Self {
        self.custom_delays = delays.clone();
        self.delays = delays;
        self
    }

    pub fn with_custom_delay_provider(mut self, delays: Arc<dyn DelayProvider>) -> Self {
        self.custom_delays = delays;
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_context_provider(mut self, contexts: Arc<dyn ContextProvider>) -> Self {
        let reserved = self.guard.reserved();
        self.guard = Arc::new(ReservedThreadGuard::with_provider(reserved, contexts));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn reserved(&self) -> ReservedThread {
        self.guard.reserved()
    }

    pub fn run_strategy(&mut self, strategy: Strategy) -> StrategyReport {
        let label = strategy.label();
        self.state = CoordinatorState::Running(strategy);
        self.sink.emit(Event::StrategyStarted { label });

        let runner = self.runner();
        let report = if strategy.on_dedicated_thread() {
            self.run_dedicated(strategy, runner)
        } else {
            StrategyReport {
                strategy,
                patterns: strategy.patterns().iter().map(|p| runner.run(p)).collect(),
                error: None,
            }
        };

        if let Some(error) = &report.error {
            self.sink.emit(Event::StrategyFailed {
                label,
                error: error.clone(),
            });
        }
        self.sink.emit(Event::StrategyCompleted {
            label,
            completed: report.completed(),
            violations: report.violations(),
        });

        self.state = CoordinatorState::Completed(strategy);
        report
    }

    pub fn run_all(&mut self, strategies: &[Strategy]) -> ComparisonReport {
        let strategies = strategies.iter().map(|s| self.run_strategy(*s)).collect();
        self.state = CoordinatorState::AllDone;
        ComparisonReport { strategies }
    }

    /// Run the four canonical strategies and emit the conclusion.
    pub fn compare(&mut self) -> ComparisonReport {
        let report = self.run_all(&Strategy::CANONICAL);
        for line in report.conclusion() {
            self.sink.emit(Event::Conclusion { line });
        }
        report
    }

    fn runner(&self) -> PatternRunner {
        PatternRunner {
            guard: self.guard.clone(),
            delays: self.delays.clone(),
            custom_delays: self.custom_delays.clone(),
            sink: self.sink.clone(),
            pool_config: self.config.pool_config(),
            num_tasks: self.config.num_tasks,
            poll_interval: self.config.join_poll_interval,
        }
    }

    fn run_dedicated(&self, strategy: Strategy, runner: PatternRunner) -> StrategyReport {
        let label = strategy.label();
        self.step(label, "Creating worker thread");

        let suffix = match strategy {
            Strategy::CustomThread => "custom",
            _ => "dedicated",
        };
        let spawned = thread::Builder::new()
            .name(format!("{}-{}", self.config.thread_name_prefix, suffix))
            .spawn(move || {
                context::mark_dedicated();
                runner.step(label, "Worker thread started");
                strategy
                    .patterns()
                    .iter()
                    .map(|p| runner.run(p))
                    .collect::<Vec<_>>()
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                return StrategyReport {
                    strategy,
                    patterns: Vec::new(),
                    error: Some(format!("spawn failed: {}", e)),
                }
            }
        };

        self.step(label, "Joining worker thread");
        match handle.join() {
            Ok(patterns) => {
                self.step(label, "Worker thread joined");
                StrategyReport {
                    strategy,
                    patterns,
                    error: None,
                }
            }
            Err(_) => StrategyReport {
                strategy,
                patterns: Vec::new(),
                error: Some("dedicated thread panicked".to_string()),
            },
        }
    }

    fn step(&self, label: &'static str, message: impl Into<String>) {
        self.sink.emit(Event::Step {
            label,
            message: message.into(),
        });
    }
}

/// Everything a pattern needs, cloneable onto a dedicated thread.
#[derive(Debug, Clone)]
struct PatternRunner {
    guard: Arc<ReservedThreadGuard>,
    delays: Arc<dyn DelayProvider>,
    custom_delays: Arc<dyn DelayProvider>,
    sink: Arc<dyn EventSink>,
    pool_config: PoolConfig,
    num_tasks: usize,
    poll_interval: Duration,
}

impl PatternRunner {
    fn run(&self, pattern: &Pattern) -> PatternReport {
        let label = pattern.label;
        let start = Instant::now();

        let pool = if pattern.needs_pool() {
            let mut pool_config = self.pool_config.clone();
            if pattern.excludes_caller {
                pool_config.admits_calling_thread = false;
            }
            self.step(
                label,
                format!("Creating task arena with {} threads", pool_config.capacity),
            );
            match WorkerPool::with_config(&pool_config) {
                Ok(pool) => Some(pool),
                Err(err) => {
                    self.sink.emit(Event::StrategyFailed {
                        label,
                        error: err.to_string(),
                    });
                    return PatternReport::aborted(label, err.to_string());
                }
            }
        } else {
            None
        };

        self.step(label, "Creating task group");
        let group = TaskGroup::with_options(PanicStrategy::default(), self.poll_interval);
        let violations = Arc::new(AtomicUsize::new(0));

        let in_scope = pattern.submission != Submission::Ambient;
        self.step(
            label,
            if in_scope {
                "Executing task submission in arena"
            } else {
                "Submitting tasks on the calling thread"
            },
        );
        self.within(pattern, pool.as_ref(), in_scope, || {
            for _ in 0..self.num_tasks {
                let unit = self.unit(pattern, violations.clone());
                match pool.as_ref() {
                    Some(pool) if pattern.submission == Submission::PerUnit => {
                        pool.enter_scope(|| group.submit(unit));
                    }
                    _ => {
                        group.submit(unit);
                    }
                }
            }
        });

        let in_scope = pattern.join == JoinPlacement::InScope;
        self.step(
            label,
            if in_scope {
                "Waiting for all tasks to complete within arena"
            } else {
                "Waiting for all tasks to complete"
            },
        );
        let outcome = self.within(pattern, pool.as_ref(), in_scope, || group.join());

        let error = match outcome {
            Ok(()) => {
                self.step(label, "All tasks completed");
                None
            }
            Err(err) => {
                self.sink.emit(Event::StrategyFailed {
                    label,
                    error: err.to_string(),
                });
                Some(err.to_string())
            }
        };

        drop(pool);

        PatternReport {
            label,
            submitted: group.submitted(),
            completed: group.completed(),
            failed: group.failed(),
            violations: violations.load(Ordering::Acquire),
            elapsed: start.elapsed(),
            error,
        }
    }

    fn within<R>(
        &self,
        pattern: &Pattern,
        pool: Option<&WorkerPool>,
        in_scope: bool,
        body: impl FnOnce() -> R,
    ) -> R {
        let scoped = || match pool {
            Some(pool) if in_scope => pool.enter_scope(body),
            _ => body(),
        };

        if pattern.isolated {
            isolate(scoped)
        } else {
            scoped()
        }
    }

    fn unit(
        &self,
        pattern: &Pattern,
        violations: Arc<AtomicUsize>,
    ) -> impl FnOnce(UnitId) -> Result<()> + Send + 'static {
        let label = pattern.label;
        let guard = self.guard.clone();
        let delays = match pattern.delay {
            DelayProfile::Standard => self.delays.clone(),
            DelayProfile::CustomThread => self.custom_delays.clone(),
        };
        let sink = self.sink.clone();

        move |unit| {
            if let Err(err) = guard.check(label, unit) {
                violations.fetch_add(1, Ordering::AcqRel);
                sink.emit(Event::Violation { label, unit });
                return Err(err);
            }

            let delay = delays.next_delay();
            let thread = thread_label();
            sink.emit(Event::TaskStarted {
                label,
                unit,
                thread: thread.clone(),
                role: context::current_role(),
                delay,
            });
            thread::sleep(delay);
            sink.emit(Event::TaskCompleted {
                label,
                unit,
                thread,
            });
            Ok(())
        }
    }

    fn step(&self, label: &'static str, message: impl Into<String>) {
        self.sink.emit(Event::Step {
            label,
            message: message.into(),
        });
    }
}

fn thread_label() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ExecutionContext, ThreadRole};
    use crate::telemetry::MemorySink;
    use crate::util::FixedDelay;

    fn coordinator(capacity: usize, num_tasks: usize) -> (Coordinator, Arc<MemorySink>) {
        let config = Config::builder()
            .capacity(capacity)
            .num_tasks(num_tasks)
            .build()
            .unwrap();
        let sink = Arc::new(MemorySink::new());
        let coordinator = Coordinator::new(config)
            .unwrap()
            .with_delay_provider(Arc::new(FixedDelay::from_millis(1)))
            .with_event_sink(sink.clone());
        (coordinator, sink)
    }

    #[test]
    fn test_state_machine() {
        let (mut coordinator, _sink) = coordinator(2, 4);
        assert_eq!(coordinator.state(), CoordinatorState::NotStarted);

        coordinator.run_strategy(Strategy::SubmitInScope);
        assert_eq!(
            coordinator.state(),
            CoordinatorState::Completed(Strategy::SubmitInScope)
        );

        coordinator.run_all(&[Strategy::Ambient]);
        assert_eq!(coordinator.state(), CoordinatorState::AllDone);
    }

    #[test]
    fn test_ambient_violates_every_unit() {
        let (mut coordinator, sink) = coordinator(2, 10);
        let report = coordinator.run_strategy(Strategy::Ambient);

        assert_eq!(report.completed(), 10);
        assert_eq!(report.violations(), 10);
        assert!(!report.satisfied());
        assert_eq!(sink.count(|e| matches!(e, Event::Violation { .. })), 10);
        assert_eq!(sink.count(|e| matches!(e, Event::StrategyFailed { .. })), 1);
    }

    #[test]
    fn test_zero_tasks() {
        let (mut coordinator, _sink) = coordinator(2, 0);
        let report = coordinator.run_all(&Strategy::CANONICAL);
        for strategy in report.strategies {
            assert_eq!(strategy.completed(), 0);
            assert_eq!(strategy.violations(), 0);
            assert!(strategy.satisfied());
        }
    }

    #[test]
    fn test_compare_emits_conclusion() {
        let (mut coordinator, sink) = coordinator(2, 5);
        let report = coordinator.compare();

        assert_eq!(report.strategies.len(), 4);
        assert!(sink.count(|e| matches!(e, Event::Conclusion { .. })) > 3);
        assert_eq!(
            sink.count(|e| matches!(e, Event::StrategyStarted { .. })),
            4
        );
    }

    #[test]
    fn test_custom_thread_units_run_on_pool_workers() {
        let (coordinator, sink) = coordinator(2, 12);
        let mut coordinator =
            coordinator.with_custom_delay_provider(Arc::new(FixedDelay::from_millis(2)));

        let report = coordinator.run_strategy(Strategy::CustomThread);

        assert!(report.error.is_none());
        assert_eq!(report.completed(), 12);
        assert_eq!(report.violations(), 0);

        let roles: Vec<ThreadRole> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::TaskStarted { role, delay, .. } => {
                    assert_eq!(delay, Duration::from_millis(2));
                    Some(role)
                }
                _ => None,
            })
            .collect();
        assert_eq!(roles.len(), 12);
        assert!(roles
            .iter()
            .all(|role| matches!(role, ThreadRole::Worker { .. })));
    }

    #[test]
    fn test_standard_patterns_ignore_custom_delays() {
        let (coordinator, sink) = coordinator(2, 3);
        let mut coordinator =
            coordinator.with_custom_delay_provider(Arc::new(FixedDelay::from_millis(7)));

        coordinator.run_strategy(Strategy::SubmitInScope);

        assert_eq!(
            sink.count(|e| matches!(
                e,
                Event::TaskStarted { delay, .. } if *delay == Duration::from_millis(1)
            )),
            3
        );
    }

    #[derive(Debug)]
    struct AlwaysWorker;

    impl ContextProvider for AlwaysWorker {
        fn current(&self) -> ExecutionContext {
            let mut ctx = context::current();
            ctx.role = ThreadRole::Dedicated;
            ctx.thread = thread::spawn(|| thread::current().id()).join().unwrap();
            ctx
        }
    }

    #[test]
    fn test_injected_context_provider_drives_guard() {
        let (coordinator, _sink) = coordinator(2, 5);
        let mut coordinator = coordinator.with_context_provider(Arc::new(AlwaysWorker));

        // units really run on the reserved thread, but the fake says otherwise
        let report = coordinator.run_strategy(Strategy::Ambient);
        assert_eq!(report.completed(), 5);
        assert_eq!(report.violations(), 0);
    }
}
