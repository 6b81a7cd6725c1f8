// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use log::{LevelFilter, SetLoggerError};

#[derive(Debug)]
struct ConsoleLogger {
    name: &'static str,
}

impl ConsoleLogger {
    const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl log::Log for ConsoleLogger {
    fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // Everything goes to stderr so command output can be redirected.
        match record.metadata().level() {
            log::Level::Error | log::Level::Warn | log::Level::Info => {
                eprintln!(
                    "[{}] {}: {}",
                    self.name,
                    record.metadata().level().as_str(),
                    record.args()
                );
            }

            log::Level::Debug | log::Level::Trace => {
                eprintln!(
                    "[{}/{}] {} {}",
                    self.name,
                    record.metadata().target(),
                    record.metadata().level().as_str(),
                    record.args()
                );
            }
        };
    }

    fn flush(&self) {}
}

static CONSOLE_LOGGER: ConsoleLogger = ConsoleLogger::new("psptool");

pub fn install_console_logger(verbose: bool) -> Result<(), SetLoggerError> {
    log::set_logger(&CONSOLE_LOGGER)?;
    log::set_max_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    Ok(())
}
