//! Compares task submission strategies and reports which of them keep work
//! off the main thread.

use veda_arena::{telemetry, Config, Coordinator};

fn main() {
    telemetry::init_tracing();

    let config = match Config::builder()
        .capacity(3)
        .num_tasks(100)
        .delay_range(20, 50)
        .build()
    {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("invalid configuration: {}", e);
            return;
        }
    };

    match Coordinator::new(config) {
        Ok(mut coordinator) => {
            let report = coordinator.compare();
            tracing::debug!(
                satisfying = report.satisfying().count(),
                violating = report.violating().count(),
                "comparison finished"
            );
        }
        Err(e) => tracing::error!("failed to start coordinator: {}", e),
    }
}
