//! Автомат безопасности, пропускающий управляющее воздействие на объект
//!
//! Idle --start--> Running --stop--> Idle; из любого состояния
//! emergency_stop --> EmergencyStopped; EmergencyStopped --reset--> Idle.
//! Аварийная остановка защелкивается и снимается только явным сбросом.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::error::{CommandError, HardwareError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafetyState {
    Idle,
    Running,
    EmergencyStopped,
}

/// Результат прохождения команды через автомат
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Actuation {
    /// Скважность, фактически записанная в объект
    pub commanded: f32,
    pub result: Result<(), HardwareError>,
}

pub struct SafetyMonitor {
    state: Mutex<CriticalSectionRawMutex, Cell<SafetyState>>,
}

impl SafetyMonitor {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(SafetyState::Idle)),
        }
    }

    pub fn state(&self) -> SafetyState {
        self.state.lock(|s| s.get())
    }

    pub fn is_running(&self) -> bool {
        self.state() == SafetyState::Running
    }

    pub fn is_emergency_stopped(&self) -> bool {
        self.state() == SafetyState::EmergencyStopped
    }

    /// Idle -> Running. Повторный запуск допустим, запуск после аварийной
    /// остановки запрещен до сброса.
    pub fn start(&self) -> Result<(), CommandError> {
        self.state.lock(|s| match s.get() {
            SafetyState::EmergencyStopped => Err(CommandError::EmergencyLatched),
            SafetyState::Idle | SafetyState::Running => {
                s.set(SafetyState::Running);
                Ok(())
            }
        })
    }

    /// Running -> Idle. Возвращает true, если состояние изменилось.
    pub fn stop(&self) -> bool {
        self.state.lock(|s| {
            if s.get() == SafetyState::Running {
                s.set(SafetyState::Idle);
                true
            } else {
                false
            }
        })
    }

    /// Переход в EmergencyStopped из любого состояния. Возвращает прежнее
    /// состояние.
    pub fn emergency_stop(&self) -> SafetyState {
        self.state.lock(|s| s.replace(SafetyState::EmergencyStopped))
    }

    /// Сброс аварийной остановки. Отказ, если внешний сигнал остановки
    /// все еще активен. Без защелки сброс ничего не меняет и успешен.
    pub fn reset(&self, external_stop_asserted: bool) -> bool {
        if external_stop_asserted {
            return false;
        }
        self.state.lock(|s| {
            if s.get() == SafetyState::EmergencyStopped {
                s.set(SafetyState::Idle);
            }
        });
        true
    }

    /// Проверка и запись команды под одной блокировкой: переход в аварийное
    /// состояние, выполненный до вызова, гарантированно дает запись нуля.
    pub fn actuate<F>(&self, requested: f32, write: F) -> Actuation
    where
        F: FnOnce(f32) -> Result<(), HardwareError>,
    {
        self.state.lock(|s| {
            let commanded = if s.get() == SafetyState::Running {
                requested
            } else {
                0.0
            };
            Actuation {
                commanded,
                result: write(commanded),
            }
        })
    }
}

impl Default for SafetyMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_stop_cycle() {
        let monitor = SafetyMonitor::new();
        assert_eq!(monitor.state(), SafetyState::Idle);
        assert_eq!(monitor.start(), Ok(()));
        assert!(monitor.is_running());
        assert!(monitor.stop());
        assert_eq!(monitor.state(), SafetyState::Idle);
        assert!(!monitor.stop());
    }

    #[test]
    fn emergency_stop_is_latched() {
        let monitor = SafetyMonitor::new();
        monitor.start().unwrap();
        assert_eq!(monitor.emergency_stop(), SafetyState::Running);
        assert_eq!(monitor.start(), Err(CommandError::EmergencyLatched));
        assert!(!monitor.stop());
        assert!(monitor.is_emergency_stopped());

        assert!(!monitor.reset(true));
        assert!(monitor.is_emergency_stopped());
        assert!(monitor.reset(false));
        assert_eq!(monitor.state(), SafetyState::Idle);
        assert_eq!(monitor.start(), Ok(()));
    }

    #[test]
    fn emergency_stop_from_idle() {
        let monitor = SafetyMonitor::new();
        assert_eq!(monitor.emergency_stop(), SafetyState::Idle);
        assert!(monitor.is_emergency_stopped());
    }

    #[test]
    fn reset_without_latch_keeps_state() {
        let monitor = SafetyMonitor::new();
        monitor.start().unwrap();
        assert!(monitor.reset(false));
        assert!(monitor.is_running());
    }

    #[test]
    fn actuation_is_gated_by_state() {
        let monitor = SafetyMonitor::new();
        let mut written = None;
        let out = monitor.actuate(42.0, |d| {
            written = Some(d);
            Ok(())
        });
        assert_eq!(out.commanded, 0.0);
        assert_eq!(written, Some(0.0));

        monitor.start().unwrap();
        let out = monitor.actuate(42.0, |d| {
            written = Some(d);
            Err(HardwareError::Pwm)
        });
        assert_eq!(out.commanded, 42.0);
        assert_eq!(out.result, Err(HardwareError::Pwm));
        assert!(monitor.is_running());

        monitor.emergency_stop();
        assert_eq!(monitor.actuate(-80.0, |_| Ok(())).commanded, 0.0);
    }
}
