//! Прошивка RP2040: драйвер H-моста, датчик оборотов, кнопка остановки

#![no_std]
#![no_main]

use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_executor::Spawner;
use embassy_futures::join::join4;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::pwm::{self, Pwm};
use embassy_time::Instant;
use embedded_hal::digital::{ErrorType, InputPin};
use {defmt_rtt as _, panic_probe as _};

use anfis_motor_drive::config::hardware::pwm::{DIVIDER, TOP};
use anfis_motor_drive::data::recorder::NullSink;
use anfis_motor_drive::drivers::motor::HBridge;
use anfis_motor_drive::logging::DefaultLog;
use anfis_motor_drive::{
    Context, ControlMode, EdgeChannel, EdgeEvent, EdgeLine, MotorConfig, MotorSystem,
    RealActuator,
};

static LOG: DefaultLog = DefaultLog;
static EDGES: EdgeChannel = EdgeChannel::new();

/// Уровень кнопки остановки, обновляется задачей ожидания фронтов
static STOP_PRESSED: AtomicBool = AtomicBool::new(false);

/// Вход кнопки для H-моста: пин занят ожиданием фронтов, поэтому драйвер
/// читает зеркало уровня
struct StopLevel;

impl ErrorType for StopLevel {
    type Error = Infallible;
}

impl InputPin for StopLevel {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!STOP_PRESSED.load(Ordering::Relaxed))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(STOP_PRESSED.load(Ordering::Relaxed))
    }
}

fn push_edge(line: EdgeLine) {
    if EDGES
        .try_send(EdgeEvent {
            line,
            at: Instant::now(),
        })
        .is_err()
    {
        defmt::warn!("Очередь фронтов переполнена");
    }
}

async fn speed_edges(mut pin: Input<'static>) {
    loop {
        pin.wait_for_falling_edge().await;
        push_edge(EdgeLine::Speed);
    }
}

async fn stop_edges(mut pin: Input<'static>) {
    STOP_PRESSED.store(pin.is_low(), Ordering::Relaxed);
    loop {
        pin.wait_for_any_edge().await;
        let pressed = pin.is_low();
        STOP_PRESSED.store(pressed, Ordering::Relaxed);
        if pressed {
            push_edge(EdgeLine::EmergencyStop);
        }
    }
}

/// Точка входа в программу
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    defmt::info!("=== ANFIS драйвер двигателя v0.1.0 ===");

    // ШИМ 1 кГц на GPIO18 (PWM1A): 125 МГц / 125 / 1000
    let mut pwm_config = pwm::Config::default();
    pwm_config.divider = DIVIDER.into();
    pwm_config.top = TOP;
    let pwm = Pwm::new_output_a(p.PWM_SLICE1, p.PIN_18, pwm_config);
    let (Some(enable), _) = pwm.split() else {
        defmt::error!("ШИМ канал A недоступен");
        return;
    };

    let in1 = Output::new(p.PIN_20, Level::Low);
    let in2 = Output::new(p.PIN_21, Level::Low);
    let speed_pin = Input::new(p.PIN_16, Pull::Up);
    let stop_pin = Input::new(p.PIN_15, Pull::Up);
    let mut led = Output::new(p.PIN_25, Level::Low);

    let config = MotorConfig::default();
    let ctx = Context::new(&config, &LOG);
    let plant = RealActuator::new(ctx, HBridge::new(enable, in1, in2, StopLevel), &EDGES);
    let system = match MotorSystem::new(ctx, &plant, Instant::now().as_ticks()) {
        Ok(system) => system,
        Err(e) => {
            defmt::error!("Ошибка конфигурации: {}", e);
            return;
        }
    };

    // адаптивное удержание заданной скорости после старта
    system.set_control_mode(ControlMode::Adaptive);
    system.set_target_speed(config.motor.max_speed_rpm / 2.0);
    if system.start().is_ok() {
        led.set_high();
    }

    let mut scheduler = system.scheduler(&NullSink);
    let monitor = system.monitor();
    join4(
        scheduler.run(),
        monitor.run(),
        speed_edges(speed_pin),
        stop_edges(stop_pin),
    )
    .await;
}
