//! Цикл мониторинга: обновление состояния объекта и аварийные события

use embassy_time::{Duration, Instant};

use super::{emergency_halt, period_from_hz, wait_period};
use crate::context::Context;
use crate::control::safety::SafetyMonitor;
use crate::data::Commands;
use crate::plant::PlantModel;
use crate::utils::logging::LogSink;

pub struct PlantMonitor<'a> {
    plant: &'a dyn PlantModel,
    safety: &'a SafetyMonitor,
    commands: &'a Commands,
    period: Duration,
    log: &'a dyn LogSink,
}

impl<'a> PlantMonitor<'a> {
    pub fn new(
        ctx: Context<'a>,
        plant: &'a dyn PlantModel,
        safety: &'a SafetyMonitor,
        commands: &'a Commands,
    ) -> Self {
        Self {
            plant,
            safety,
            commands,
            period: period_from_hz(ctx.config.sampling.monitor_rate_hz),
            log: ctx.log,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Один шаг: обновление объекта, реакция на кнопку остановки
    pub fn poll(&self, now: Instant) {
        let events = self.plant.update(now);
        if events.emergency_requested && !self.safety.is_emergency_stopped() {
            emergency_halt(self.safety, self.plant, self.log);
        }
    }

    pub async fn run(&self) {
        info!(
            self.log,
            "Цикл мониторинга: период {} мкс",
            self.period.as_micros()
        );
        while !self.commands.shutdown_requested() {
            let started = Instant::now();
            self.poll(started);
            wait_period(started, self.period).await;
        }
        info!(self.log, "Цикл мониторинга остановлен");
    }
}
