//! Драйвер H-моста (L298N и аналоги): ШИМ на входе разрешения и два
//! дискретных входа направления

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;

use super::MotorDriver;
use crate::error::HardwareError;
use crate::utils::math::constrain_symmetric;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Forward,
    Reverse,
    /// Оба входа направления в нуле
    Coast,
}

impl Direction {
    pub fn from_duty(duty: f32) -> Self {
        if duty > 0.0 {
            Direction::Forward
        } else if duty < 0.0 {
            Direction::Reverse
        } else {
            Direction::Coast
        }
    }
}

/// H-мост. `STOP`: вход кнопки аварийной остановки с подтяжкой к питанию,
/// нажатие дает низкий уровень.
pub struct HBridge<PWM, IN1, IN2, STOP> {
    pwm: PWM,
    in1: IN1,
    in2: IN2,
    stop: STOP,
    direction: Direction,
}

impl<PWM, IN1, IN2, STOP> HBridge<PWM, IN1, IN2, STOP>
where
    PWM: SetDutyCycle,
    IN1: OutputPin,
    IN2: OutputPin,
    STOP: InputPin,
{
    pub fn new(pwm: PWM, in1: IN1, in2: IN2, stop: STOP) -> Self {
        Self {
            pwm,
            in1,
            in2,
            stop,
            direction: Direction::Coast,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), HardwareError> {
        let (in1, in2) = match direction {
            Direction::Forward => (true, false),
            Direction::Reverse => (false, true),
            Direction::Coast => (false, false),
        };
        self.in1
            .set_state(in1.into())
            .map_err(|_| HardwareError::Gpio)?;
        self.in2
            .set_state(in2.into())
            .map_err(|_| HardwareError::Gpio)?;
        self.direction = direction;
        Ok(())
    }

    fn set_duty_counts(&mut self, duty: f32) -> Result<(), HardwareError> {
        let max = self.pwm.max_duty_cycle();
        let counts = (libm::fabsf(duty) / 100.0 * max as f32) as u16;
        self.pwm
            .set_duty_cycle(counts.min(max))
            .map_err(|_| HardwareError::Pwm)
    }
}

impl<PWM, IN1, IN2, STOP> MotorDriver for HBridge<PWM, IN1, IN2, STOP>
where
    PWM: SetDutyCycle,
    IN1: OutputPin,
    IN2: OutputPin,
    STOP: InputPin,
{
    fn set_output(&mut self, duty: f32) -> Result<(), HardwareError> {
        let duty = constrain_symmetric(duty, 100.0);
        let direction = Direction::from_duty(duty);
        if direction != self.direction {
            // при смене направления сначала гасим ШИМ
            self.set_duty_counts(0.0)?;
            self.set_direction(direction)?;
        }
        self.set_duty_counts(duty)
    }

    fn coast(&mut self) -> Result<(), HardwareError> {
        self.set_duty_counts(0.0)?;
        self.set_direction(Direction::Coast)
    }

    fn emergency_asserted(&mut self) -> Result<bool, HardwareError> {
        self.stop.is_low().map_err(|_| HardwareError::Gpio)
    }
}
