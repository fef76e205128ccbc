//! Реальный двигатель: драйвер H-моста и события датчиков
//!
//! Обработчики фронтов (прерывания) только кладут [`EdgeEvent`] в канал.
//! Цикл мониторинга разбирает очередь в [`PlantModel::update`]: импульсы
//! датчика оборотов идут в оценку скорости, нажатие кнопки остановки
//! превращается в запрос аварийной остановки.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Instant;

use super::{PlantEvents, PlantModel};
use crate::config::MotorParams;
use crate::context::Context;
use crate::data::{EdgeChannel, EdgeLine, Measurements};
use crate::drivers::motor::MotorDriver;
use crate::error::HardwareError;
use crate::sensors::PulseSpeedEstimator;
use crate::utils::logging::LogSink;
use crate::utils::math::{constrain, constrain_symmetric};

struct Shared<D> {
    driver: D,
    measurements: Measurements,
    speed: PulseSpeedEstimator,
}

pub struct RealActuator<'a, D> {
    motor: MotorParams,
    duty_limit: f32,
    events: &'a EdgeChannel,
    shared: Mutex<CriticalSectionRawMutex, RefCell<Shared<D>>>,
    log: &'a dyn LogSink,
}

impl<'a, D: MotorDriver> RealActuator<'a, D> {
    pub fn new(ctx: Context<'a>, driver: D, events: &'a EdgeChannel) -> Self {
        Self {
            motor: ctx.config.motor,
            duty_limit: ctx.config.actuation.duty_limit,
            events,
            shared: Mutex::new(RefCell::new(Shared {
                driver,
                measurements: Measurements::zero(),
                speed: PulseSpeedEstimator::new(ctx.config.motor.pulses_per_revolution),
            })),
            log: ctx.log,
        }
    }

    fn with_driver<R>(&self, f: impl FnOnce(&mut Shared<D>) -> R) -> R {
        self.shared.lock(|s| f(&mut s.borrow_mut()))
    }
}

impl<D: MotorDriver + Send> PlantModel for RealActuator<'_, D> {
    fn start_actuation(&self) -> Result<(), HardwareError> {
        info!(self.log, "Привод включен");
        self.with_driver(|s| {
            s.measurements.duty_cycle = 0.0;
            s.driver.set_output(0.0)
        })
    }

    fn stop_actuation(&self) -> Result<(), HardwareError> {
        let result = self.with_driver(|s| {
            s.measurements.duty_cycle = 0.0;
            s.driver.coast()
        });
        if let Err(e) = result {
            error!(self.log, "Ошибка остановки привода: {}", e);
        }
        result
    }

    fn set_duty_cycle(&self, duty: f32) -> Result<(), HardwareError> {
        let duty = constrain_symmetric(duty, self.duty_limit);
        let result = self.with_driver(|s| {
            let result = s.driver.set_output(duty);
            if result.is_ok() {
                s.measurements.duty_cycle = duty;
            }
            result
        });
        #[cfg(feature = "debug-actuators")]
        debug!(self.log, "Скважность: {}", duty);
        result
    }

    fn set_target_speed(&self, rpm: f32) {
        let rpm = constrain(rpm, self.motor.min_speed_rpm, self.motor.max_speed_rpm);
        self.with_driver(|s| s.measurements.target_speed = rpm);
    }

    fn measurements(&self) -> Measurements {
        self.shared.lock(|s| s.borrow().measurements)
    }

    fn update(&self, now: Instant) -> PlantEvents {
        let mut events = PlantEvents::default();
        self.with_driver(|s| {
            while let Ok(edge) = self.events.try_receive() {
                match edge.line {
                    EdgeLine::Speed => {
                        s.speed.on_edge(edge.at);
                    }
                    EdgeLine::EmergencyStop => events.emergency_requested = true,
                }
            }
            s.measurements.speed = s.speed.speed(now);
            // датчика тока нет
            s.measurements.current = 0.0;
            s.measurements.timestamp_us = now.as_micros();
        });
        #[cfg(feature = "debug-sensors")]
        debug!(self.log, "Скорость: {}", self.measurements().speed);
        if events.emergency_requested {
            warn!(self.log, "Нажата кнопка аварийной остановки");
        }
        events
    }

    fn emergency_input_asserted(&self) -> bool {
        match self.with_driver(|s| s.driver.emergency_asserted()) {
            Ok(asserted) => asserted,
            Err(e) => {
                // состояние кнопки неизвестно: считаем нажатой
                error!(self.log, "Не удалось прочитать кнопку остановки: {}", e);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MotorConfig;
    use crate::data::EdgeEvent;
    use crate::drivers::motor::hbridge::mock::{MockPin, MockPwm};
    use crate::drivers::motor::HBridge;
    use crate::utils::logging::NoopLog;

    type Bridge = HBridge<MockPwm, MockPin, MockPin, MockPin>;

    struct Rig {
        pwm: MockPwm,
        in1: MockPin,
        in2: MockPin,
        stop: MockPin,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                pwm: MockPwm::default(),
                in1: MockPin::default(),
                in2: MockPin::default(),
                stop: MockPin::high(),
            }
        }

        fn bridge(&self) -> Bridge {
            HBridge::new(
                self.pwm.clone(),
                self.in1.clone(),
                self.in2.clone(),
                self.stop.clone(),
            )
        }
    }

    fn edge(line: EdgeLine, ms: u64) -> EdgeEvent {
        EdgeEvent {
            line,
            at: Instant::from_millis(ms),
        }
    }

    #[test]
    fn duty_is_forwarded_to_bridge() {
        let config = MotorConfig::default();
        let channel = EdgeChannel::new();
        let rig = Rig::new();
        let plant = RealActuator::new(Context::new(&config, &NoopLog), rig.bridge(), &channel);

        plant.start_actuation().unwrap();
        plant.set_duty_cycle(-25.0).unwrap();
        assert_eq!(rig.pwm.duty(), 250);
        assert!(rig.in2.is_set() && !rig.in1.is_set());
        assert_eq!(plant.measurements().duty_cycle, -25.0);

        plant.stop_actuation().unwrap();
        assert_eq!(rig.pwm.duty(), 0);
        assert_eq!(plant.measurements().duty_cycle, 0.0);
    }

    #[test]
    fn speed_from_edge_events() {
        let config = MotorConfig::default();
        let channel = EdgeChannel::new();
        let rig = Rig::new();
        let plant = RealActuator::new(Context::new(&config, &NoopLog), rig.bridge(), &channel);

        for ms in [0, 100, 200] {
            channel.try_send(edge(EdgeLine::Speed, ms)).unwrap();
        }
        let events = plant.update(Instant::from_millis(210));
        assert!(!events.emergency_requested);
        let m = plant.measurements();
        assert!((m.speed - 600.0).abs() < 1e-2);
        assert_eq!(m.current, 0.0);
        assert_eq!(m.timestamp_us, 210_000);

        plant.update(Instant::from_millis(1000));
        assert_eq!(plant.measurements().speed, 0.0);
    }

    #[test]
    fn emergency_edge_is_reported() {
        let config = MotorConfig::default();
        let channel = EdgeChannel::new();
        let rig = Rig::new();
        let plant = RealActuator::new(Context::new(&config, &NoopLog), rig.bridge(), &channel);

        channel.try_send(edge(EdgeLine::EmergencyStop, 5)).unwrap();
        assert!(plant.update(Instant::from_millis(10)).emergency_requested);
        assert!(!plant.update(Instant::from_millis(20)).emergency_requested);

        assert!(!plant.emergency_input_asserted());
        rig.stop.set(false);
        assert!(plant.emergency_input_asserted());
    }

    #[test]
    fn failed_write_keeps_last_duty() {
        let config = MotorConfig::default();
        let channel = EdgeChannel::new();
        let bridge = HBridge::new(
            MockPwm::failing(),
            MockPin::default(),
            MockPin::default(),
            MockPin::high(),
        );
        let plant = RealActuator::new(Context::new(&config, &NoopLog), bridge, &channel);
        assert_eq!(plant.set_duty_cycle(40.0), Err(HardwareError::Pwm));
        assert_eq!(plant.measurements().duty_cycle, 0.0);
    }
}
