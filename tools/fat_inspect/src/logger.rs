use std::fmt::Display;
use std::io::{Stderr, Write};

use log::{Level, LevelFilter, Log};
use owo_colors::OwoColorize;

struct Inner {
    out: Stderr,
}

impl Inner {
    fn write_with_color(&mut self, color: Color, string: impl Display) {
        let string: &dyn Display = match color {
            Color::Default => &string,
            Color::Gray => &string.dimmed(),
            Color::BrightRed => &string.bright_red(),
            Color::BrightYellow => &string.bright_yellow(),
            Color::BrightBlue => &string.bright_blue(),
            Color::BrightCyan => &string.bright_cyan(),
            Color::BrightMagenta => &string.bright_magenta(),
        };
        // Nowhere left to report a failed write to stderr
        let _ = write!(self.out, "{string}");
    }
}

struct InspectLogger {
    inner: spin::Mutex<Option<Inner>>,
}

static LOGGER: InspectLogger = InspectLogger {
    inner: spin::Mutex::new(None),
};

impl Log for InspectLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        let mut guard = self.inner.lock();
        let Some(inner) = guard.as_mut() else {
            return;
        };
        let level = record.level();
        inner.write_with_color(
            match level {
                Level::Error => Color::BrightRed,
                Level::Warn => Color::BrightYellow,
                Level::Info => Color::BrightBlue,
                Level::Debug => Color::BrightCyan,
                Level::Trace => Color::BrightMagenta,
            },
            format_args!("{level:5} "),
        );
        inner.write_with_color(Color::Gray, format_args!("[{}] ", record.target()));
        inner.write_with_color(Color::Default, record.args());
        inner.write_with_color(Color::Default, "\n");
    }

    fn flush(&self) {
        if let Some(inner) = self.inner.lock().as_mut() {
            let _ = inner.out.flush();
        }
    }
}

pub fn init(max_level: LevelFilter) -> Result<(), log::SetLoggerError> {
    *LOGGER.inner.lock() = Some(Inner { out: std::io::stderr() });
    log::set_max_level(max_level);
    log::set_logger(&LOGGER)
}

enum Color {
    Default,
    Gray,
    BrightRed,
    BrightYellow,
    BrightBlue,
    BrightCyan,
    BrightMagenta,
}
