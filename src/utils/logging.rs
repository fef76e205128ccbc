//! Канал журналирования, передаваемый компонентам явно через контекст

use core::fmt;

/// Уровень сообщения
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Приемник сообщений журнала
pub trait LogSink: Sync {
    fn log(&self, level: LogLevel, target: &'static str, args: fmt::Arguments<'_>);
}

/// Отбрасывает все сообщения
pub struct NoopLog;

impl LogSink for NoopLog {
    fn log(&self, _level: LogLevel, _target: &'static str, _args: fmt::Arguments<'_>) {}
}

/// Пересылка в `log` (хост) или в `defmt` (прошивка)
pub struct DefaultLog;

impl LogSink for DefaultLog {
    #[cfg(feature = "defmt")]
    fn log(&self, level: LogLevel, target: &'static str, args: fmt::Arguments<'_>) {
        let msg = defmt::Display2Format(&args);
        match level {
            LogLevel::Error => defmt::error!("{}: {}", target, msg),
            LogLevel::Warn => defmt::warn!("{}: {}", target, msg),
            LogLevel::Info => defmt::info!("{}: {}", target, msg),
            LogLevel::Debug => defmt::debug!("{}: {}", target, msg),
            LogLevel::Trace => defmt::trace!("{}: {}", target, msg),
        }
    }

    #[cfg(all(feature = "std", not(feature = "defmt")))]
    fn log(&self, level: LogLevel, target: &'static str, args: fmt::Arguments<'_>) {
        let level = match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        };
        log::log!(target: target, level, "{}", args);
    }

    #[cfg(not(any(feature = "std", feature = "defmt")))]
    fn log(&self, _level: LogLevel, _target: &'static str, _args: fmt::Arguments<'_>) {}
}

macro_rules! error {
    ($sink:expr, $($arg:tt)+) => {
        $sink.log($crate::utils::logging::LogLevel::Error, module_path!(), format_args!($($arg)+))
    };
}

macro_rules! warn {
    ($sink:expr, $($arg:tt)+) => {
        $sink.log($crate::utils::logging::LogLevel::Warn, module_path!(), format_args!($($arg)+))
    };
}

macro_rules! info {
    ($sink:expr, $($arg:tt)+) => {
        $sink.log($crate::utils::logging::LogLevel::Info, module_path!(), format_args!($($arg)+))
    };
}

#[allow(unused_macros)]
macro_rules! debug {
    ($sink:expr, $($arg:tt)+) => {
        $sink.log($crate::utils::logging::LogLevel::Debug, module_path!(), format_args!($($arg)+))
    };
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use core::cell::RefCell;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_sync::blocking_mutex::Mutex;
    use std::string::{String, ToString};
    use std::vec::Vec;

    /// Запоминает сообщения для проверок в тестах
    pub struct RecordingLog {
        entries: Mutex<CriticalSectionRawMutex, RefCell<Vec<(LogLevel, String)>>>,
    }

    impl RecordingLog {
        pub fn new() -> Self {
            Self {
                entries: Mutex::new(RefCell::new(Vec::new())),
            }
        }

        pub fn count(&self, level: LogLevel) -> usize {
            self.entries
                .lock(|e| e.borrow().iter().filter(|(l, _)| *l == level).count())
        }

        pub fn contains(&self, needle: &str) -> bool {
            self.entries
                .lock(|e| e.borrow().iter().any(|(_, m)| m.contains(needle)))
        }
    }

    impl LogSink for RecordingLog {
        fn log(&self, level: LogLevel, _target: &'static str, args: fmt::Arguments<'_>) {
            let msg = args.to_string();
            self.entries.lock(|e| e.borrow_mut().push((level, msg)));
        }
    }
}
