//! Периодические циклы: управление и мониторинг объекта

pub mod control_task;
pub mod monitor_task;

pub use control_task::{ControlScheduler, TickReport};
pub use monitor_task::PlantMonitor;

use embassy_time::{Duration, Instant, Timer};

use crate::control::safety::{Actuation, SafetyMonitor, SafetyState};
use crate::plant::PlantModel;
use crate::utils::logging::LogSink;

/// Период цикла по частоте в Гц
pub(crate) fn period_from_hz(rate_hz: f32) -> Duration {
    Duration::from_micros(((1_000_000.0 / rate_hz) as u64).max(1))
}

/// Ожидание до конца периода. При перегрузке цикл продолжается сразу,
/// пропущенные такты не догоняются. Возвращает true при перегрузке.
pub(crate) async fn wait_period(started: Instant, period: Duration) -> bool {
    let deadline = started + period;
    if Instant::now() < deadline {
        Timer::at(deadline).await;
        false
    } else {
        // отдаем управление другим задачам исполнителя
        embassy_futures::yield_now().await;
        true
    }
}

/// Аварийная остановка с немедленной записью нулевой скважности
pub(crate) fn emergency_halt(
    safety: &SafetyMonitor,
    plant: &dyn PlantModel,
    log: &dyn LogSink,
) -> SafetyState {
    let previous = safety.emergency_stop();
    let Actuation { result, .. } = safety.actuate(0.0, |duty| plant.set_duty_cycle(duty));
    if let Err(e) = result {
        error!(log, "Аварийная остановка: ошибка записи нуля: {}", e);
    }
    error!(log, "АВАРИЙНАЯ ОСТАНОВКА (из состояния {:?})", previous);
    previous
}
