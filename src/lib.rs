pub use openai_media::*;
pub use usage_reporter::{
    ApiType, LogUsageReporter, MemoryUsageReporter, NoopUsageReporter, UsageEvent, UsageReporter,
};
