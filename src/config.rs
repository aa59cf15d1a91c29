use crate::error::{Error, Result};
use std::time::Duration;

/// Settings for a single [`WorkerPool`](crate::WorkerPool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub capacity: usize,
    pub admits_calling_thread: bool,
    pub stack_size: Option<usize>,
    pub thread_name_prefix: String,
}

impl PoolConfig {
    pub fn new(capacity: usize, admits_calling_thread: bool) -> Self {
        Self {
            capacity,
            admits_calling_thread,
            stack_size: Some(2 * 1024 * 1024),
            thread_name_prefix: "veda-worker".to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::config("capacity must be > 0"));
        }
        if self.capacity > 1024 {
            return Err(Error::config("capacity too large (max 1024)"));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(Error::config("thread_name_prefix must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub capacity: Option<usize>,
    pub admits_calling_thread: bool,
    pub num_tasks: usize,
    pub delay_lower_ms: u64,
    pub delay_upper_ms: u64,
    /// Delay range for units submitted from a custom thread.
    pub custom_delay_lower_ms: u64,
    pub custom_delay_upper_ms: u64,
    pub stack_size: Option<usize>,
    pub thread_name_prefix: String,
    pub join_poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: None,
            admits_calling_thread: true,
            num_tasks: 100,
            delay_lower_ms: 20,
            delay_upper_ms: 50,
            custom_delay_lower_ms: 50,
            custom_delay_upper_ms: 100,
            stack_size: Some(2 * 1024 * 1024),
            thread_name_prefix: "veda-worker".to_string(),
            join_poll_interval: Duration::from_millis(1),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.capacity {
            if n == 0 {
                return Err(Error::config("capacity must be > 0"));
            }
        }

        if self.delay_lower_ms > self.delay_upper_ms {
            return Err(Error::config(format!(
                "delay range is empty: [{}, {}] ms",
                self.delay_lower_ms, self.delay_upper_ms
            )));
        }

        if self.custom_delay_lower_ms > self.custom_delay_upper_ms {
            return Err(Error::config(format!(
                "custom thread delay range is empty: [{}, {}] ms",
                self.custom_delay_lower_ms, self.custom_delay_upper_ms
            )));
        }

        if self.join_poll_interval.is_zero() {
            return Err(Error::config("join_poll_interval must be > 0"));
        }

        self.pool_config().validate()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.unwrap_or_else(num_cpus::get)
    }

    /// Pool settings derived from this config; every arena the coordinator builds uses them.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            capacity: self.capacity(),
            admits_calling_thread: self.admits_calling_thread,
            stack_size: self.stack_size,
            thread_name_prefix: self.thread_name_prefix.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn capacity(mut self, n: usize) -> Self {
        self.config.capacity = Some(n);
        self
    }

    pub fn admits_calling_thread(mut self, admits: bool) -> Self {
        self.config.admits_calling_thread = admits;
        self
    }

    pub fn num_tasks(mut self, n: usize) -> Self {
        self.config.num_tasks = n;
        self
    }

    pub fn delay_range(mut self, lower_ms: u64, upper_ms: u64) -> Self {
        self.config.delay_lower_ms = lower_ms;
        self.config.delay_upper_ms = upper_ms;
        self
    }

    pub fn custom_delay_range(mut self, lower_ms: u64, upper_ms: u64) -> Self {
        self.config.custom_delay_lower_ms = lower_ms;
        self.config.custom_delay_upper_ms = upper_ms;
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn join_poll_interval(mut self, interval: Duration) -> Self {
        self.config.join_poll_interval = interval;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
