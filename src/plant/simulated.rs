//! Модель двигателя постоянного тока первого порядка

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Instant;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use super::{PlantEvents, PlantModel};
use crate::config::{MotorParams, SimulationParams};
use crate::context::Context;
use crate::data::Measurements;
use crate::error::HardwareError;
use crate::utils::logging::LogSink;
use crate::utils::math::{constrain, constrain_symmetric};

/// Шум ограничен тремя сигмами
const NOISE_BOUND_SIGMA: f32 = 3.0;

struct SimState {
    measurements: Measurements,
    last_step: Option<Instant>,
    active: bool,
    rng: SmallRng,
}

/// Имитация двигателя:
///
/// ```text
/// a = (duty/100 * Kt * w_max - B * w - T_load) / J
/// w = clamp(w + a * dt, 0, w_max) + шум
/// I = I0 + k1 * |duty/100| + k2 * w / w_max + шум
/// ```
///
/// `dt` берется из реального времени между шагами, поэтому неравномерный
/// вызов допустим. Модель интегрируется всегда, в том числе без запуска.
pub struct SimulatedMotor<'a> {
    params: SimulationParams,
    motor: MotorParams,
    duty_limit: f32,
    state: Mutex<CriticalSectionRawMutex, RefCell<SimState>>,
    log: &'a dyn LogSink,
}

impl<'a> SimulatedMotor<'a> {
    pub fn new(ctx: Context<'a>, seed: u64) -> Self {
        info!(
            ctx.log,
            "Симуляция двигателя: J={} B={} Kt={} max {} об/мин",
            ctx.config.simulation.inertia,
            ctx.config.simulation.damping,
            ctx.config.simulation.torque_constant,
            ctx.config.simulation.max_speed_rpm
        );
        Self {
            params: ctx.config.simulation,
            motor: ctx.config.motor,
            duty_limit: ctx.config.actuation.duty_limit,
            state: Mutex::new(RefCell::new(SimState {
                measurements: Measurements::zero(),
                last_step: None,
                active: false,
                rng: SmallRng::seed_from_u64(seed),
            })),
            log: ctx.log,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.lock(|s| s.borrow().active)
    }

    fn bounded_noise(rng: &mut SmallRng, sigma: f32) -> f32 {
        let n: f32 = rng.sample(StandardNormal);
        constrain(n, -NOISE_BOUND_SIGMA, NOISE_BOUND_SIGMA) * sigma
    }

    fn step(&self, state: &mut SimState, dt: f32) {
        let p = &self.params;
        let max_speed = p.max_speed_rpm;
        let duty = state.measurements.duty_cycle / 100.0;
        let speed = state.measurements.speed;

        let acceleration =
            (duty * p.torque_constant * max_speed - p.damping * speed - p.load_torque) / p.inertia;
        let speed = constrain(speed + acceleration * dt, 0.0, max_speed);
        let speed = speed + Self::bounded_noise(&mut state.rng, p.noise_level);
        let speed = constrain(speed, 0.0, max_speed);

        let current = p.base_current
            + p.duty_current_gain * libm::fabsf(duty)
            + p.speed_current_gain * (speed / max_speed)
            + Self::bounded_noise(&mut state.rng, p.current_noise);

        state.measurements.speed = speed;
        state.measurements.current = current.max(0.0);
    }
}

impl PlantModel for SimulatedMotor<'_> {
    fn start_actuation(&self) -> Result<(), HardwareError> {
        self.state.lock(|s| s.borrow_mut().active = true);
        info!(self.log, "Симуляция: привод включен");
        Ok(())
    }

    fn stop_actuation(&self) -> Result<(), HardwareError> {
        self.state.lock(|s| {
            let mut s = s.borrow_mut();
            s.active = false;
            s.measurements.duty_cycle = 0.0;
        });
        info!(self.log, "Симуляция: привод выключен");
        Ok(())
    }

    fn set_duty_cycle(&self, duty: f32) -> Result<(), HardwareError> {
        let duty = constrain_symmetric(duty, self.duty_limit);
        self.state.lock(|s| s.borrow_mut().measurements.duty_cycle = duty);
        #[cfg(feature = "debug-actuators")]
        debug!(self.log, "Скважность: {}", duty);
        Ok(())
    }

    fn set_target_speed(&self, rpm: f32) {
        let rpm = constrain(rpm, self.motor.min_speed_rpm, self.motor.max_speed_rpm);
        self.state.lock(|s| s.borrow_mut().measurements.target_speed = rpm);
    }

    fn measurements(&self) -> Measurements {
        self.state.lock(|s| s.borrow().measurements)
    }

    fn update(&self, now: Instant) -> PlantEvents {
        self.state.lock(|s| {
            let mut state = s.borrow_mut();
            if let Some(last) = state.last_step {
                let dt = now.saturating_duration_since(last).as_micros() as f32 / 1_000_000.0;
                self.step(&mut state, dt);
            }
            state.last_step = Some(now);
            state.measurements.timestamp_us = now.as_micros();
        });
        #[cfg(feature = "debug-sensors")]
        debug!(self.log, "Скорость: {}", self.measurements().speed);
        PlantEvents::default()
    }

    fn emergency_input_asserted(&self) -> bool {
        false
    }
}
