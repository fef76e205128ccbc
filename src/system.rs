//! Внешний интерфейс команд системы управления двигателем

use crate::context::Context;
use crate::control::anfis::{AnfisModel, TrainingStatus};
use crate::control::safety::{SafetyMonitor, SafetyState};
use crate::control::training::{AdaptiveTrainer, TrainingReport, TrainingSample};
use crate::data::recorder::SampleSink;
use crate::data::{Commands, ControlMode, Measurements};
use crate::error::{CommandError, ConfigError, TrainingError};
use crate::plant::PlantModel;
use crate::tasks::{emergency_halt, ControlScheduler, PlantMonitor};
use crate::utils::math::constrain_symmetric;

/// Система: объект, контроллер, автомат безопасности и команды оператора
pub struct MotorSystem<'a> {
    ctx: Context<'a>,
    plant: &'a dyn PlantModel,
    model: AnfisModel,
    safety: SafetyMonitor,
    commands: Commands,
}

impl<'a> MotorSystem<'a> {
    /// Создание системы. Некорректная конфигурация отклоняется.
    pub fn new(
        ctx: Context<'a>,
        plant: &'a dyn PlantModel,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        ctx.config.validate()?;
        let model = AnfisModel::new(ctx, seed)?;
        info!(ctx.log, "Система управления двигателем создана");
        Ok(Self {
            ctx,
            plant,
            model,
            safety: SafetyMonitor::new(),
            commands: Commands::new(),
        })
    }

    pub fn context(&self) -> Context<'a> {
        self.ctx
    }

    pub fn model(&self) -> &AnfisModel {
        &self.model
    }

    pub fn safety_state(&self) -> SafetyState {
        self.safety.state()
    }

    pub fn control_mode(&self) -> ControlMode {
        self.commands.mode()
    }

    pub fn measurements(&self) -> Measurements {
        self.plant.measurements()
    }

    pub fn training_status(&self) -> TrainingStatus {
        self.model.status()
    }

    /// Idle -> Running
    pub fn start(&self) -> Result<(), CommandError> {
        if let Err(e) = self.safety.start() {
            warn!(self.ctx.log, "Запуск отклонен: {}", e);
            return Err(e);
        }
        if let Err(e) = self.plant.start_actuation() {
            error!(self.ctx.log, "Ошибка включения привода: {}", e);
        }
        info!(self.ctx.log, "Двигатель запущен");
        Ok(())
    }

    /// Running -> Idle с немедленной записью нуля
    pub fn stop(&self) {
        self.safety.stop();
        self.commands.set_manual_duty(0.0);
        if let Err(e) = self.plant.set_duty_cycle(0.0) {
            error!(self.ctx.log, "Ошибка записи нуля при остановке: {}", e);
        }
        if let Err(e) = self.plant.stop_actuation() {
            error!(self.ctx.log, "Ошибка отключения привода: {}", e);
        }
        info!(self.ctx.log, "Двигатель остановлен");
    }

    /// Переход в EmergencyStopped из любого состояния
    pub fn emergency_stop(&self) {
        self.commands.set_manual_duty(0.0);
        emergency_halt(&self.safety, self.plant, self.ctx.log);
    }

    /// Сброс аварийной остановки. false, если кнопка все еще нажата.
    pub fn reset_emergency_stop(&self) -> bool {
        let asserted = self.plant.emergency_input_asserted();
        let reset = self.safety.reset(asserted);
        if reset {
            info!(self.ctx.log, "Аварийная остановка сброшена");
        } else {
            warn!(self.ctx.log, "Сброс отклонен: сигнал остановки активен");
        }
        reset
    }

    pub fn set_target_speed(&self, rpm: f32) {
        self.plant.set_target_speed(rpm);
        info!(
            self.ctx.log,
            "Заданная скорость: {} об/мин",
            self.plant.measurements().target_speed
        );
    }

    pub fn set_control_mode(&self, mode: ControlMode) {
        self.commands.set_mode(mode);
        info!(self.ctx.log, "Режим управления: {:?}", mode);
    }

    /// Скважность ручного режима, применяется на следующем такте
    pub fn set_duty_cycle(&self, duty: f32) -> Result<(), CommandError> {
        if self.commands.mode() != ControlMode::Manual {
            return Err(CommandError::NotInManualMode);
        }
        let duty = constrain_symmetric(duty, self.ctx.config.actuation.duty_limit);
        self.commands.set_manual_duty(duty);
        Ok(())
    }

    pub fn trainer(&self) -> AdaptiveTrainer<'_> {
        AdaptiveTrainer::new(self.ctx, &self.model)
    }

    /// Обучение с целевой ошибкой из конфигурации
    pub fn train(
        &self,
        samples: &[TrainingSample],
        epochs: u32,
    ) -> Result<TrainingReport, TrainingError> {
        self.trainer().train_configured(samples, epochs)
    }

    /// Обучение без остановки циклов: между эпохами управление
    /// отдается исполнителю
    pub async fn train_async(
        &self,
        samples: &[TrainingSample],
        epochs: u32,
    ) -> Result<TrainingReport, TrainingError> {
        self.trainer().train_configured_async(samples, epochs).await
    }

    /// Цикл управления, пишущий такты в `sink`
    pub fn scheduler<'s>(&'s self, sink: &'s dyn SampleSink) -> ControlScheduler<'s> {
        ControlScheduler::new(
            self.ctx,
            self.plant,
            &self.model,
            &self.safety,
            &self.commands,
            sink,
        )
    }

    pub fn monitor(&self) -> PlantMonitor<'_> {
        PlantMonitor::new(self.ctx, self.plant, &self.safety, &self.commands)
    }

    /// Запрос на завершение обоих циклов
    pub fn shutdown(&self) {
        info!(self.ctx.log, "Завершение работы");
        self.commands.request_shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MotorConfig;
    use crate::data::recorder::NullSink;
    use crate::plant::SimulatedMotor;
    use crate::utils::logging::NoopLog;

    #[test]
    fn rejects_invalid_configuration() {
        let mut config = MotorConfig::default();
        config.sampling.rate_hz = -1.0;
        let ctx = Context::new(&config, &NoopLog);
        let plant = SimulatedMotor::new(ctx, 1);
        assert!(matches!(
            MotorSystem::new(ctx, &plant, 1),
            Err(ConfigError::NonPositiveRate("rate_hz"))
        ));
    }

    #[test]
    fn reset_in_simulation_always_succeeds() {
        let config = MotorConfig::default();
        let ctx = Context::new(&config, &NoopLog);
        let plant = SimulatedMotor::new(ctx, 1);
        let system = MotorSystem::new(ctx, &plant, 1).unwrap();

        system.start().unwrap();
        system.emergency_stop();
        assert_eq!(system.safety_state(), SafetyState::EmergencyStopped);
        assert_eq!(system.start(), Err(CommandError::EmergencyLatched));
        assert!(system.reset_emergency_stop());
        assert_eq!(system.safety_state(), SafetyState::Idle);
    }

    #[test]
    fn reset_is_refused_while_stop_button_is_held() {
        use crate::data::EdgeChannel;
        use crate::drivers::motor::hbridge::mock::{MockPin, MockPwm};
        use crate::drivers::motor::HBridge;
        use crate::plant::RealActuator;

        let config = MotorConfig::default();
        let ctx = Context::new(&config, &NoopLog);
        let channel = EdgeChannel::new();
        let stop = MockPin::high();
        let bridge = HBridge::new(
            MockPwm::default(),
            MockPin::default(),
            MockPin::default(),
            stop.clone(),
        );
        let plant = RealActuator::new(ctx, bridge, &channel);
        let system = MotorSystem::new(ctx, &plant, 1).unwrap();

        system.start().unwrap();
        stop.set(false);
        system.emergency_stop();

        assert!(!system.reset_emergency_stop());
        assert_eq!(system.safety_state(), SafetyState::EmergencyStopped);
        assert_eq!(system.start(), Err(CommandError::EmergencyLatched));

        stop.set(true);
        assert!(system.reset_emergency_stop());
        assert_eq!(system.safety_state(), SafetyState::Idle);
    }

    #[test]
    fn async_training_updates_status() {
        let config = MotorConfig::default();
        let ctx = Context::new(&config, &NoopLog);
        let plant = SimulatedMotor::new(ctx, 1);
        let system = MotorSystem::new(ctx, &plant, 1).unwrap();
        let samples = [
            TrainingSample::new(-50.0, 0.0, -20.0),
            TrainingSample::new(50.0, 0.0, 20.0),
        ];
        let report = embassy_futures::block_on(system.train_async(&samples, 2)).unwrap();
        assert!(report.epochs_run >= 1);
        assert_eq!(system.training_status().epochs, report.epochs_run);
        assert!(system.training_status().trained);
    }

    #[test]
    fn emergency_stop_then_tick_commands_zero() {
        let config = MotorConfig::default();
        let ctx = Context::new(&config, &NoopLog);
        let plant = SimulatedMotor::new(ctx, 1);
        let system = MotorSystem::new(ctx, &plant, 1).unwrap();
        let mut scheduler = system.scheduler(&NullSink);

        system.start().unwrap();
        system.set_duty_cycle(70.0).unwrap();
        assert_eq!(scheduler.tick().commanded, 70.0);

        system.set_duty_cycle(90.0).unwrap();
        system.emergency_stop();
        assert_eq!(plant.measurements().duty_cycle, 0.0);
        let report = scheduler.tick();
        assert_eq!(report.commanded, 0.0);
        assert_eq!(plant.measurements().duty_cycle, 0.0);
    }

    #[test]
    fn duty_command_requires_manual_mode() {
        let config = MotorConfig::default();
        let ctx = Context::new(&config, &NoopLog);
        let plant = SimulatedMotor::new(ctx, 1);
        let system = MotorSystem::new(ctx, &plant, 1).unwrap();

        system.set_control_mode(ControlMode::Adaptive);
        assert_eq!(system.set_duty_cycle(10.0), Err(CommandError::NotInManualMode));
        system.set_control_mode(ControlMode::Manual);
        assert_eq!(system.set_duty_cycle(10.0), Ok(()));
    }

    #[test]
    fn stop_writes_zero_immediately() {
        let config = MotorConfig::default();
        let ctx = Context::new(&config, &NoopLog);
        let plant = SimulatedMotor::new(ctx, 1);
        let system = MotorSystem::new(ctx, &plant, 1).unwrap();
        let mut scheduler = system.scheduler(&NullSink);

        system.start().unwrap();
        system.set_duty_cycle(40.0).unwrap();
        scheduler.tick();
        assert_eq!(plant.measurements().duty_cycle, 40.0);

        system.stop();
        assert_eq!(system.safety_state(), SafetyState::Idle);
        assert_eq!(plant.measurements().duty_cycle, 0.0);
        assert_eq!(scheduler.tick().commanded, 0.0);
    }

    #[test]
    fn target_speed_is_clamped() {
        let config = MotorConfig::default();
        let ctx = Context::new(&config, &NoopLog);
        let plant = SimulatedMotor::new(ctx, 1);
        let system = MotorSystem::new(ctx, &plant, 1).unwrap();
        system.set_target_speed(9000.0);
        assert_eq!(system.measurements().target_speed, config.motor.max_speed_rpm);
    }

    #[test]
    fn training_updates_status() {
        let config = MotorConfig::default();
        let ctx = Context::new(&config, &NoopLog);
        let plant = SimulatedMotor::new(ctx, 1);
        let system = MotorSystem::new(ctx, &plant, 1).unwrap();
        let samples = [
            TrainingSample::new(-50.0, 0.0, -20.0),
            TrainingSample::new(0.0, 0.0, 0.0),
            TrainingSample::new(50.0, 0.0, 20.0),
        ];
        let report = system.train(&samples, 3).unwrap();
        assert!(report.epochs_run >= 1);
        assert!(system.training_status().trained);
        assert_eq!(system.training_status().epochs, report.epochs_run);
    }
}
