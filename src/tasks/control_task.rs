//! Цикл управления с фиксированным периодом

use embassy_time::{Duration, Instant};

use super::{period_from_hz, wait_period};
use crate::context::Context;
use crate::control::anfis::{AnfisController, AnfisModel};
use crate::control::safety::SafetyMonitor;
use crate::data::recorder::{Sample, SampleSink};
use crate::data::{Commands, ControlMode};
use crate::plant::PlantModel;
use crate::utils::logging::LogSink;

/// Сколько раз повторять финальную запись нуля
const FINAL_ZERO_ATTEMPTS: u32 = 3;

/// Итог одного такта
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub error: f32,
    pub delta_error: f32,
    /// Выход контроллера до автомата безопасности
    pub computed: f32,
    /// Скважность после автомата безопасности
    pub commanded: f32,
    pub mode: ControlMode,
}

pub struct ControlScheduler<'a> {
    plant: &'a dyn PlantModel,
    safety: &'a SafetyMonitor,
    commands: &'a Commands,
    controller: AnfisController<'a>,
    sink: &'a dyn SampleSink,
    period: Duration,
    overruns: u32,
    hardware_faults: u32,
    log: &'a dyn LogSink,
}

impl<'a> ControlScheduler<'a> {
    pub fn new(
        ctx: Context<'a>,
        plant: &'a dyn PlantModel,
        model: &'a AnfisModel,
        safety: &'a SafetyMonitor,
        commands: &'a Commands,
        sink: &'a dyn SampleSink,
    ) -> Self {
        Self {
            plant,
            safety,
            commands,
            controller: AnfisController::new(ctx, model),
            sink,
            period: period_from_hz(ctx.config.sampling.rate_hz),
            overruns: 0,
            hardware_faults: 0,
            log: ctx.log,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    pub fn hardware_faults(&self) -> u32 {
        self.hardware_faults
    }

    /// Один такт: измерение, ошибка, контроллер, автомат безопасности,
    /// запись в объект и в приемник данных
    pub fn tick(&mut self) -> TickReport {
        let measurements = self.plant.measurements();
        let error = measurements.speed_error();
        let mode = self.commands.mode();

        let (delta_error, computed) = match mode {
            ControlMode::Manual => (self.controller.track(error), self.commands.manual_duty()),
            ControlMode::Adaptive => {
                let out = self.controller.compute(error);
                (out.delta_error, out.output)
            }
        };

        let actuation = self
            .safety
            .actuate(computed, |duty| self.plant.set_duty_cycle(duty));
        if let Err(e) = actuation.result {
            self.hardware_faults = self.hardware_faults.saturating_add(1);
            warn!(self.log, "Ошибка записи скважности {}: {}", actuation.commanded, e);
        }

        self.sink.record(&Sample {
            measurements,
            error,
            delta_error,
            commanded: actuation.commanded,
            mode,
            safety: self.safety.state(),
        });

        TickReport {
            error,
            delta_error,
            computed,
            commanded: actuation.commanded,
            mode,
        }
    }

    /// Цикл до запроса завершения. Последнее действие: нулевая скважность,
    /// в том числе если future цикла уничтожен раньше (например, в `select`).
    pub async fn run(&mut self) {
        info!(self.log, "Цикл управления: период {} мкс", self.period.as_micros());
        let final_zero = FinalZero {
            plant: self.plant,
            log: self.log,
        };
        while !self.commands.shutdown_requested() {
            let started = Instant::now();
            self.tick();
            if wait_period(started, self.period).await {
                self.overruns = self.overruns.saturating_add(1);
                debug!(self.log, "Перегрузка цикла управления ({})", self.overruns);
            }
        }
        drop(final_zero);
        info!(self.log, "Цикл управления остановлен");
    }
}

/// Запись нуля и отключение привода при выходе из цикла
struct FinalZero<'a> {
    plant: &'a dyn PlantModel,
    log: &'a dyn LogSink,
}

impl Drop for FinalZero<'_> {
    fn drop(&mut self) {
        let mut written = false;
        for attempt in 1..=FINAL_ZERO_ATTEMPTS {
            match self.plant.set_duty_cycle(0.0) {
                Ok(()) => {
                    written = true;
                    break;
                }
                Err(e) => error!(self.log, "Финальная запись нуля, попытка {}: {}", attempt, e),
            }
        }
        if !written {
            error!(self.log, "Не удалось записать нулевую скважность");
        }
        if let Err(e) = self.plant.stop_actuation() {
            error!(self.log, "Ошибка отключения привода: {}", e);
        }
    }
}
