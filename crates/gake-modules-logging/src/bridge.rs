use env_filter::{Builder, Filter};
use log::{Log, Metadata, Record};

use crate::priority::{Category, Priority};

/// Routes `log`-facade records (ours and our dependencies') into the Gake logger.
struct LogBridge {
    filter: Filter,
}

impl Log for LogBridge {
    #[inline]
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.filter.enabled(metadata) && Priority::from(metadata.level()).is_enabled()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.filter.matches(record) {
            return;
        }
        let priority = Priority::from(record.level());
        if !priority.is_enabled() {
            return;
        }
        crate::log_args(priority, Category::from_target(record.target()), *record.args());
    }

    fn flush(&self) {}
}

/// Parses an `env_logger`-style directive list, e.g. `info,power=debug`.
fn parse_filter(filter_spec: &str) -> Filter {
    Builder::new().parse(filter_spec).build()
}

/// Installs the bridge once per process. Later calls are no-ops.
pub(crate) fn install(filter_spec: &str) {
    let filter = parse_filter(filter_spec);
    let max = filter.filter();
    if log::set_boxed_logger(Box::new(LogBridge { filter })).is_ok() {
        log::set_max_level(max);
    }
}
