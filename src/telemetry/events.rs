//! Lifecycle events emitted by the coordinator.

use crate::context::ThreadRole;
use crate::executor::UnitId;
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StrategyStarted {
        label: &'static str,
    },
    /// Narration of what a strategy is doing right now.
    Step {
        label: &'static str,
        message: String,
    },
    TaskStarted {
        label: &'static str,
        unit: UnitId,
        thread: String,
        /// Role of the thread that picked the unit up.
        role: ThreadRole,
        delay: Duration,
    },
    TaskCompleted {
        label: &'static str,
        unit: UnitId,
        thread: String,
    },
    Violation {
        label: &'static str,
        unit: UnitId,
    },
    StrategyFailed {
        label: &'static str,
        error: String,
    },
    StrategyCompleted {
        label: &'static str,
        completed: usize,
        violations: usize,
    },
    Conclusion {
        line: String,
    },
}

impl Event {
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Event::StrategyStarted { label }
            | Event::Step { label, .. }
            | Event::TaskStarted { label, .. }
            | Event::TaskCompleted { label, .. }
            | Event::Violation { label, .. }
            | Event::StrategyFailed { label, .. }
            | Event::StrategyCompleted { label, .. } => Some(*label),
            Event::Conclusion { .. } => None,
        }
    }
}

/// Where lifecycle events go.
pub trait EventSink: fmt::Debug + Send + Sync {
    fn emit(&self, event: Event);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: Event) {
        match event {
            Event::StrategyStarted { label } => tracing::info!("Starting strategy: {}", label),
            Event::Step { label, message } => tracing::info!("{}: {}", label, message),
            Event::TaskStarted {
                label,
                unit,
                thread,
                role,
                delay,
            } => tracing::debug!(
                "[{}][thread={}][{}] Task {} started (waiting for {} ms)",
                label,
                thread,
                role_name(role),
                unit,
                delay.as_millis()
            ),
            Event::TaskCompleted {
                label,
                unit,
                thread,
            } => tracing::debug!("[{}][thread={}] Task {} completed", label, thread, unit),
            Event::Violation { label, unit } => {
                tracing::error!("[{}] Task {} is running on the reserved thread", label, unit)
            }
            Event::StrategyFailed { label, error } => {
                tracing::error!("Exception in strategy {}: {}", label, error)
            }
            Event::StrategyCompleted {
                label,
                completed,
                violations,
            } => tracing::info!(
                completed,
                violations,
                "Completed strategy: {}",
                label
            ),
            Event::Conclusion { line } => tracing::info!("{}", line),
        }
    }
}

fn role_name(role: ThreadRole) -> &'static str {
    match role {
        ThreadRole::Reserved => "reserved",
        ThreadRole::Worker { .. } => "pool worker",
        ThreadRole::Dedicated => "custom thread",
        ThreadRole::Unregistered => "unregistered",
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn count<P>(&self, predicate: P) -> usize
    where
        P: Fn(&Event) -> bool,
    {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.emit(Event::StrategyStarted { label: "Strategy 1" });
        sink.emit(Event::Violation {
            label: "Strategy 1",
            unit: UnitId::new(1),
        });
        sink.emit(Event::Conclusion {
            line: "done".to_string(),
        });

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].label(), Some("Strategy 1"));
        assert_eq!(events[2].label(), None);
        assert_eq!(sink.count(|e| matches!(e, Event::Violation { .. })), 1);

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_role_names() {
        assert_eq!(role_name(ThreadRole::Dedicated), "custom thread");
        assert_eq!(role_name(ThreadRole::Reserved), "reserved");
    }

    #[test]
    fn test_tracing_sink_accepts_every_event() {
        let sink = TracingSink;
        sink.emit(Event::TaskStarted {
            label: "Strategy 2",
            unit: UnitId::new(5),
            thread: "worker".to_string(),
            role: ThreadRole::Dedicated,
            delay: Duration::from_millis(20),
        });
        sink.emit(Event::StrategyCompleted {
            label: "Strategy 2",
            completed: 1,
            violations: 0,
        });
    }
}
