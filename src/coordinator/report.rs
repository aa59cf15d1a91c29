use super::strategy::Strategy;
use std::time::Duration;

/// Outcome of a single submission/join pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternReport {
    pub label: &'static str,
    pub submitted: usize,
    pub completed: usize,
    pub failed: usize,
    pub violations: usize,
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl PatternReport {
    pub(crate) fn aborted(label: &'static str, error: String) -> Self {
        Self {
            label,
            submitted: 0,
            completed: 0,
            failed: 0,
            violations: 0,
            elapsed: Duration::ZERO,
            error: Some(error),
        }
    }

    pub fn satisfied(&self) -> bool {
        self.violations == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyReport {
    pub strategy: Strategy,
    pub patterns: Vec<PatternReport>,
    /// Set when the strategy could not run to completion (e.g. spawn failure).
    pub error: Option<String>,
}

impl StrategyReport {
    pub fn submitted(&self) -> usize {
        self.patterns.iter().map(|p| p.submitted).sum()
    }

    pub fn completed(&self) -> usize {
        self.patterns.iter().map(|p| p.completed).sum()
    }

    pub fn violations(&self) -> usize {
        self.patterns.iter().map(|p| p.violations).sum()
    }

    pub fn satisfied(&self) -> bool {
        self.error.is_none() && self.patterns.iter().all(PatternReport::satisfied)
    }

    pub fn pattern(&self, label: &str) -> Option<&PatternReport> {
        self.patterns.iter().find(|p| p.label == label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonReport {
    pub strategies: Vec<StrategyReport>,
}

impl ComparisonReport {
    pub fn get(&self, strategy: Strategy) -> Option<&StrategyReport> {
        self.strategies.iter().find(|r| r.strategy == strategy)
    }

    pub fn satisfying(&self) -> impl Iterator<Item = &StrategyReport> {
        self.strategies.iter().filter(|r| r.satisfied())
    }

    pub fn violating(&self) -> impl Iterator<Item = &StrategyReport> {
        self.strategies.iter().filter(|r| !r.satisfied())
    }

    pub fn conclusion(&self) -> Vec<String> {
        let mut lines = vec![
            "Conclusion:".to_string(),
            "Strategies that kept every task off the reserved thread:".to_string(),
        ];
        lines.extend(
            self.satisfying()
                .map(|r| format!("- {}: {}", r.strategy, r.strategy.description())),
        );
        lines.push(String::new());
        lines.push("Strategies that executed tasks on the reserved thread:".to_string());
        lines.extend(self.violating().map(|r| {
            format!(
                "- {}: {} ({} violation(s))",
                r.strategy,
                r.strategy.description(),
                r.violations()
            )
        }));

        if self.get(Strategy::Dedicated).map_or(false, StrategyReport::satisfied) {
            lines.push(String::new());
            lines.push(
                "Recommended: Strategy 4. Manage task groups and pools from a dedicated thread and join that thread from the reserved one."
                    .to_string(),
            );
        }

        lines
    }
}
