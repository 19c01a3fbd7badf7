use std::sync::{Mutex, Once, PoisonError};

use log::{Level, LevelFilter, Log, Metadata, Record};

/// Process-wide logger that keeps every record. Tests share it, so checks
/// look for one specific record instead of counting.
pub(crate) struct CapturedLogs {
    records: Mutex<Vec<(Level, String, String)>>,
}

static LOGS: CapturedLogs = CapturedLogs {
    records: Mutex::new(Vec::new()),
};

static INSTALL: Once = Once::new();

pub(crate) fn install() -> &'static CapturedLogs {
    INSTALL.call_once(|| {
        log::set_logger(&LOGS).expect("no other logger in the test binary");
        log::set_max_level(LevelFilter::Trace);
    });
    &LOGS
}

impl CapturedLogs {
    pub(crate) fn contains(&self, level: Level, target: &str, message: &str) -> bool {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(l, t, m)| *l == level && t == target && m == message)
    }
}

impl Log for CapturedLogs {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((
                record.level(),
                record.target().to_string(),
                record.args().to_string(),
            ));
    }

    fn flush(&self) {}
}
