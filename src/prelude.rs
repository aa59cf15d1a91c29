pub use crate::config::{Config, ConfigBuilder, PoolConfig};
pub use crate::context::{ContextProvider, ExecutionContext, ThreadRole};
pub use crate::coordinator::{ComparisonReport, Coordinator, Strategy, StrategyReport};
pub use crate::error::{Error, Result};
pub use crate::executor::{UnitId, WorkerPool};
pub use crate::guard::{ReservedThread, ReservedThreadGuard};
pub use crate::scope::{isolate, TaskGroup};
pub use crate::telemetry::{Event, EventSink, MemorySink, TracingSink};
pub use crate::util::{DelayProvider, FixedDelay, UniformDelay};
