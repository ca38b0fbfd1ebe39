// Stderr logger for the `log` facade
//
// Default: bare messages at Info and above, the way a job log reads.
// --debug: timestamped `LEVEL: message` lines down to Debug.
// --quiet: warnings and errors only.

use log::{Level, LevelFilter, Log, Metadata, Record};

pub struct StderrLogger {
    level: LevelFilter,
    verbose: bool,
    color: bool,
}

impl StderrLogger {
    pub fn new(debug: bool, quiet: bool) -> Self {
        let level = if debug {
            LevelFilter::Debug
        } else if quiet {
            LevelFilter::Warn
        } else {
            LevelFilter::Info
        };
        Self {
            level,
            verbose: debug,
            color: atty::is(atty::Stream::Stderr),
        }
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    fn render(&self, record: &Record) -> String {
        if !self.verbose {
            return record.args().to_string();
        }
        let timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f");
        format!("{} {}: {}", timestamp, self.tag(record.level()), record.args())
    }

    fn tag(&self, level: Level) -> String {
        if !self.color {
            return level.to_string();
        }
        let code = match level {
            Level::Error => "31",
            Level::Warn => "33",
            Level::Info => "32",
            Level::Debug | Level::Trace => "2",
        };
        format!("\x1b[{}m{}\x1b[0m", code, level)
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // HTTP stack chatter stays out of --debug output
        let ours = metadata.target().starts_with("sheetx");
        metadata.level() <= self.level && (ours || metadata.level() <= Level::Info)
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}", self.render(record));
        }
    }

    fn flush(&self) {}
}

/// Install the logger once per process.
pub fn init(debug: bool, quiet: bool) {
    let logger = StderrLogger::new(debug, quiet);
    let level = logger.level();
    if log::set_logger(Box::leak(Box::new(logger))).is_ok() {
        log::set_max_level(level);
    }
}
