//! The strategy table.
//!
//! Every strategy is a list of patterns, and every pattern is a
//! (submission context, join placement) pair. Strategies 2 and 3 differ only
//! in where the join sits relative to the admission scope.

use std::fmt;

/// Where units are submitted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// No pool; units are left for the joining thread.
    Ambient,
    /// Inside the pool's admission scope.
    InScope,
    /// Inside the pool's admission scope, re-entering it for every unit.
    PerUnit,
}

/// Which delay range a pattern's units sleep for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayProfile {
    Standard,
    CustomThread,
}

/// Where `join` is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPlacement {
    Ambient,
    InScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    pub label: &'static str,
    pub submission: Submission,
    pub join: JoinPlacement,
    /// Wrap both submission and join in an isolation scope.
    pub isolated: bool,
    /// Build the pool without a slot for the calling thread.
    pub excludes_caller: bool,
    pub delay: DelayProfile,
}

impl Pattern {
    pub fn needs_pool(&self) -> bool {
        self.submission != Submission::Ambient || self.join == JoinPlacement::InScope
    }

    /// Whether the thread running this pattern may end up executing units,
    /// given a pool that admits its caller.
    pub fn recruits_caller(&self) -> bool {
        if self.submission == Submission::Ambient {
            return true;
        }
        !self.isolated && !self.excludes_caller && self.join == JoinPlacement::InScope
    }
}

const AMBIENT: Pattern = Pattern {
    label: "Strategy 1",
    submission: Submission::Ambient,
    join: JoinPlacement::Ambient,
    isolated: false,
    excludes_caller: false,
    delay: DelayProfile::Standard,
};

const SUBMIT_IN_SCOPE: Pattern = Pattern {
    label: "Strategy 2",
    submission: Submission::InScope,
    join: JoinPlacement::Ambient,
    isolated: false,    excludes_caller: false,
    delay: DelayProfile::Standard,
};

const JOIN_IN_SCOPE: Pattern = Pattern {
    label: "Strategy 3",
    submission: Submission::InScope,
    join: JoinPlacement::InScope,
    isolated: false,    excludes_caller: false,
    delay: DelayProfile::Standard,
};

const DEDICATED: [Pattern; 3] = [
    Pattern {
        label: "Strategy 4a",
        ..AMBIENT
    },
    Pattern {
        label: "Strategy 4b",
        ..SUBMIT_IN_SCOPE
    },
    Pattern {
        label: "Strategy 4c",
        ..JOIN_IN_SCOPE
    },
];

const ISOLATED: Pattern = Pattern {
    label: "Isolated",
    isolated: true,
    ..SUBMIT_IN_SCOPE
};

const CUSTOM_THREAD: Pattern = Pattern {
    label: "Custom thread",
    submission: Submission::PerUnit,
    join: JoinPlacement::Ambient,
    isolated: false,
    excludes_caller: true,
    delay: DelayProfile::CustomThread,
};

static AMBIENT_PATTERNS: [Pattern; 1] = [AMBIENT];
static SUBMIT_IN_SCOPE_PATTERNS: [Pattern; 1] = [SUBMIT_IN_SCOPE];
static JOIN_IN_SCOPE_PATTERNS: [Pattern; 1] = [JOIN_IN_SCOPE];
static DEDICATED_PATTERNS: [Pattern; 3] = DEDICATED;
static ISOLATED_PATTERNS: [Pattern; 1] = [ISOLATED];
static CUSTOM_THREAD_PATTERNS: [Pattern; 1] = [CUSTOM_THREAD];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Submit and join with no pool at all.
    Ambient,
    /// Submit inside the admission scope, join outside it.
    SubmitInScope,
    /// Submit and join inside the admission scope.
    JoinInScope,
    /// Run the three patterns above on a dedicated thread.
    Dedicated,
    /// Submit inside the admission scope and join outside it, each step
    /// within an isolation scope.
    Isolated,
    /// A custom thread feeds a pool that reserves no slot for it, one unit
    /// per scope entry, and joins outside the pool.
    CustomThread,
}

impl Strategy {
    pub const CANONICAL: [Strategy; 4] = [
        Strategy::Ambient,
        Strategy::SubmitInScope,
        Strategy::JoinInScope,
        Strategy::Dedicated,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Ambient => "Strategy 1",
            Strategy::SubmitInScope => "Strategy 2",
            Strategy::JoinInScope => "Strategy 3",
            Strategy::Dedicated => "Strategy 4",
            Strategy::Isolated => "Isolated",
            Strategy::CustomThread => "Custom thread",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Strategy::Ambient => {
                "Submit tasks to a task group and wait on the calling thread, without a worker pool"
            }
            Strategy::SubmitInScope => {
                "Submit tasks inside the pool's admission scope, and wait outside it"
            }
            Strategy::JoinInScope => {
                "Submit tasks and wait, both inside the pool's admission scope"
            }
            Strategy::Dedicated => {
                "Dedicated thread; any submission pattern, it never touches the reserved thread"
            }
            Strategy::Isolated => {
                "Submit inside the admission scope and wait outside it, each wrapped in an isolation scope"
            }
            Strategy::CustomThread => {
                "Custom thread submits into a pool that excludes it, then waits outside the pool"
            }
        }
    }

    pub fn patterns(&self) -> &'static [Pattern] {
        match self {
            Strategy::Ambient => &AMBIENT_PATTERNS,
            Strategy::SubmitInScope => &SUBMIT_IN_SCOPE_PATTERNS,
            Strategy::JoinInScope => &JOIN_IN_SCOPE_PATTERNS,
            Strategy::Dedicated => &DEDICATED_PATTERNS,
            Strategy::Isolated => &ISOLATED_PATTERNS,
            Strategy::CustomThread => &CUSTOM_THREAD_PATTERNS,
        }
    }

    pub fn on_dedicated_thread(&self) -> bool {
        matches!(self, Strategy::Dedicated | Strategy::CustomThread)
    }

    /// Whether the reserved thread is kept out of execution by construction.
    pub fn keeps_reserved_thread_idle(&self) -> bool {
        self.on_dedicated_thread() || self.patterns().iter().all(|p| !p.recruits_caller())
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_outcomes_match_table() {
        assert!(!Strategy::Ambient.keeps_reserved_thread_idle());
        assert!(Strategy::SubmitInScope.keeps_reserved_thread_idle());
        assert!(!Strategy::JoinInScope.keeps_reserved_thread_idle());
        assert!(Strategy::Dedicated.keeps_reserved_thread_idle());
        assert!(Strategy::Isolated.keeps_reserved_thread_idle());
        assert!(Strategy::CustomThread.keeps_reserved_thread_idle());
    }

    #[test]
    fn test_custom_thread_pattern() {
        assert!(Strategy::CustomThread.on_dedicated_thread());
        let pattern = Strategy::CustomThread.patterns()[0];
        assert!(pattern.needs_pool());
        assert!(pattern.excludes_caller);
        assert_eq!(pattern.submission, Submission::PerUnit);
        assert_eq!(pattern.join, JoinPlacement::Ambient);
        assert_eq!(pattern.delay, DelayProfile::CustomThread);
    }

    #[test]
    fn test_isolated_joins_outside_scope() {
        let pattern = Strategy::Isolated.patterns()[0];
        assert!(pattern.isolated);
        assert_eq!(pattern.submission, Submission::InScope);
        assert_eq!(pattern.join, JoinPlacement::Ambient);
    }

    #[test]
    fn test_dedicated_reuses_first_three_patterns() {
        let patterns = Strategy::Dedicated.patterns();
        assert_eq!(patterns.len(), 3);
        assert_eq!(patterns[0].label, "Strategy 4a");

        for (sub, base) in patterns.iter().zip(&Strategy::CANONICAL[..3]) {
            let base = base.patterns()[0];
            assert_eq!(sub.submission, base.submission);
            assert_eq!(sub.join, base.join);
            assert_eq!(sub.isolated, base.isolated);
        }
    }

    #[test]
    fn test_only_ambient_pattern_skips_pool() {
        assert!(!Strategy::Ambient.patterns()[0].needs_pool());
        assert!(Strategy::SubmitInScope.patterns()[0].needs_pool());
        assert!(Strategy::Isolated.patterns()[0].needs_pool());
    }
}
