use std::{
    fmt,
    sync::{Mutex, PoisonError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiType {
    ImageProcessing,
    AudioProcessing,
}

impl ApiType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiType::ImageProcessing => "image_processing",
            ApiType::AudioProcessing => "audio_processing",
        }
    }
}

impl fmt::Display for ApiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single API call. `tokens` is 0 when the call failed or the
/// endpoint does not report usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageEvent {
    pub api_type: ApiType,
    pub tokens: u64,
    pub success: bool,
}

impl UsageEvent {
    pub fn success(api_type: ApiType, tokens: u64) -> Self {
        Self {
            api_type,
            tokens,
            success: true,
        }
    }

    pub fn failure(api_type: ApiType) -> Self {
        Self {
            api_type,
            tokens: 0,
            success: false,
        }
    }
}

impl fmt::Display for UsageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "USAGE_LOG | type={} | tokens={} | success={}",
            self.api_type,
            self.tokens,
            if self.success { "True" } else { "False" }
        )
    }
}

/// Sink for usage events. Reporting never fails.
pub trait UsageReporter: Send + Sync {
    fn report(&self, event: UsageEvent);
}

/// Writes each event as one info line through the `log` facade.
pub struct LogUsageReporter;

impl UsageReporter for LogUsageReporter {
    fn report(&self, event: UsageEvent) {
        log::info!(target: "usage", "{}", event);
    }
}

pub struct NoopUsageReporter;

impl UsageReporter for NoopUsageReporter {
    fn report(&self, _event: UsageEvent) {}
}

/// Keeps every reported event in memory, in arrival order.
#[derive(Default)]
pub struct MemoryUsageReporter {
    events: Mutex<Vec<UsageEvent>>,
}

impl MemoryUsageReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UsageEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(ToString::to_string).collect()
    }
}

impl UsageReporter for MemoryUsageReporter {
    fn report(&self, event: UsageEvent) {
        // a poisoned lock still holds valid events
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
