//! Симуляция системы управления двигателем на хосте
//!
//! Запуск: `motor-sim [config.json]`. Без аргумента используется
//! конфигурация по умолчанию. Уровень журнала задается `RUST_LOG`.

use embassy_executor::Spawner;
use embassy_futures::join::join3;
use embassy_time::{Duration, Timer};

use anfis_motor_drive::data::recorder::SessionStatistics;
use anfis_motor_drive::logging::DefaultLog;
use anfis_motor_drive::{
    ConfigError, Context, ControlMode, MotorConfig, MotorSystem, SessionRecorder, SimulatedMotor,
    TrainingSample,
};

/// Емкость записи сеанса (тактов)
const SESSION_CAPACITY: usize = 2048;

/// Зерно генераторов шума и начальных параметров
const SEED: u64 = 2024;

/// Задание скорости для адаптивного режима, об/мин. Ошибка при старте
/// с места лежит внутри термов ошибки.
const ADAPTIVE_TARGET_RPM: f32 = 80.0;

static LOG: DefaultLog = DefaultLog;
static RECORDER: SessionRecorder<SESSION_CAPACITY> = SessionRecorder::new();

fn load_config() -> Result<MotorConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path).map_err(|e| {
                let mut msg = heapless::String::new();
                for ch in format!("{}: {}", path, e).chars() {
                    if msg.push(ch).is_err() {
                        break;
                    }
                }
                ConfigError::Parse(msg)
            })?;
            MotorConfig::from_json(&json)
        }
        None => {
            let config = MotorConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Синтетическая выборка: ПД закон с насыщением
fn synthetic_samples() -> Vec<TrainingSample> {
    let mut samples = Vec::new();
    for i in -20..=20 {
        for j in -5..=5 {
            let error = i as f32 * 5.0;
            let delta_error = j as f32 * 2.0;
            let target = (0.8 * error + 0.5 * delta_error).clamp(-100.0, 100.0);
            samples.push(TrainingSample::new(error, delta_error, target));
        }
    }
    samples
}

fn log_state(system: &MotorSystem<'_>, label: &str) {
    let m = system.measurements();
    log::info!(
        "[{}] t={:.2} с, скорость {:.1} об/мин, ток {:.2} А, скважность {:.1}%, задание {:.0}",
        label,
        m.timestamp_s(),
        m.speed,
        m.current,
        m.duty_cycle,
        m.target_speed
    );
}

fn log_statistics(stats: &SessionStatistics) {
    log::info!("Статистика сеанса: {} тактов", stats.samples);
    for (name, field) in [
        ("скорость", &stats.speed),
        ("ток", &stats.current),
        ("скважность", &stats.duty_cycle),
        ("ошибка", &stats.error),
    ] {
        log::info!(
            "  {}: среднее {:.2}, СКО {:.2}, мин {:.2}, макс {:.2}",
            name,
            field.mean,
            field.std,
            field.min,
            field.max
        );
    }
}

/// Сценарий проверки: ручное управление, обучение, адаптивное управление,
/// аварийная остановка и сброс
async fn demo(system: &MotorSystem<'_>) {
    // даем циклам запуститься
    Timer::after(Duration::from_millis(100)).await;

    log::info!("=== Ручное управление ===");
    system.set_control_mode(ControlMode::Manual);
    if let Err(e) = system.start() {
        log::error!("Запуск невозможен: {}", e);
        system.shutdown();
        return;
    }
    for duty in [30.0, 60.0] {
        if let Err(e) = system.set_duty_cycle(duty) {
            log::warn!("{}", e);
        }
        Timer::after(Duration::from_secs(2)).await;
        log_state(system, "ручной");
    }
    system.stop();

    log::info!("=== Обучение ===");
    let samples = synthetic_samples();
    let epochs = system.context().config.anfis_structure.training_epochs;
    match system.train_async(&samples, epochs).await {
        Ok(report) => log::info!(
            "Эпох: {}, MSE: {:.4}, сходимость: {}",
            report.epochs_run,
            report.final_error,
            report.converged
        ),
        Err(e) => log::error!("Ошибка обучения: {}", e),
    }
    let recorded = RECORDER.training_samples();
    if let Ok(mse) = system.trainer().evaluate(&recorded) {
        log::info!("MSE на записанном ручном сеансе: {:.2}", mse);
    }

    log::info!("=== Адаптивное управление ===");
    system.set_target_speed(ADAPTIVE_TARGET_RPM);
    system.set_control_mode(ControlMode::Adaptive);
    if let Err(e) = system.start() {
        log::error!("Запуск невозможен: {}", e);
    }
    for _ in 0..3 {
        Timer::after(Duration::from_secs(1)).await;
        log_state(system, "адаптивный");
    }

    log::info!("=== Аварийная остановка ===");
    system.emergency_stop();
    Timer::after(Duration::from_millis(200)).await;
    log_state(system, "авария");
    if let Err(e) = system.start() {
        log::info!("Повторный запуск отклонен: {}", e);
    }
    log::info!("Сброс аварийной остановки: {}", system.reset_emergency_stop());

    system.stop();
    system.shutdown();
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("=== ANFIS управление двигателем: симуляция ===");
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Ошибка конфигурации: {}", e);
            std::process::exit(1);
        }
    };

    let ctx = Context::new(&config, &LOG);
    let plant = SimulatedMotor::new(ctx, SEED);
    let system = match MotorSystem::new(ctx, &plant, SEED) {
        Ok(system) => system,
        Err(e) => {
            log::error!("Ошибка создания системы: {}", e);
            std::process::exit(1);
        }
    };

    let mut scheduler = system.scheduler(&RECORDER);
    let monitor = system.monitor();
    join3(scheduler.run(), monitor.run(), demo(&system)).await;

    log::info!(
        "Перегрузок цикла управления: {}, аппаратных ошибок: {}",
        scheduler.overruns(),
        scheduler.hardware_faults()
    );
    log_statistics(&RECORDER.statistics());
    log_state(&system, "итог");
    std::process::exit(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use anfis_motor_drive::control::FuzzyRuleEngine;

    #[test]
    fn adaptive_target_fires_rules_from_rest() {
        let engine = FuzzyRuleEngine::from_config(&MotorConfig::default()).unwrap();
        let total: f32 = engine.firing_strengths(ADAPTIVE_TARGET_RPM, 0.0).iter().sum();
        assert!(total > 0.0);
    }

    #[test]
    fn synthetic_samples_stay_within_output_range() {
        let samples = synthetic_samples();
        assert_eq!(samples.len(), 41 * 11);
        assert!(samples.iter().all(|s| s.target_output.abs() <= 100.0));
    }
}
