//! Оценка скорости по интервалам между импульсами датчика оборотов

use embassy_time::{Duration, Instant};

use crate::config::hardware::events::{MIN_PULSE_INTERVAL_US, SPEED_TIMEOUT_MS};
use crate::utils::filters::MovingAverage;

/// Глубина сглаживания скорости
const SMOOTHING: usize = 8;

pub struct PulseSpeedEstimator {
    pulses_per_revolution: u32,
    last_edge: Option<Instant>,
    filter: MovingAverage<SMOOTHING>,
    rpm: f32,
}

impl PulseSpeedEstimator {
    pub fn new(pulses_per_revolution: u32) -> Self {
        Self {
            pulses_per_revolution: pulses_per_revolution.max(1),
            last_edge: None,
            filter: MovingAverage::new(),
            rpm: 0.0,
        }
    }

    /// Обработка фронта. Возвращает новую оценку, если интервал принят.
    pub fn on_edge(&mut self, at: Instant) -> Option<f32> {
        let Some(previous) = self.last_edge else {
            self.last_edge = Some(at);
            return None;
        };
        let period = at.saturating_duration_since(previous);
        if period < Duration::from_micros(MIN_PULSE_INTERVAL_US) {
            // дребезг, фронт игнорируется
            return None;
        }
        self.last_edge = Some(at);

        let period_s = period.as_micros() as f32 / 1_000_000.0;
        let rpm = 60.0 / (period_s * self.pulses_per_revolution as f32);
        self.rpm = self.filter.filter(rpm);
        Some(self.rpm)
    }

    /// Текущая скорость (об/мин). Без импульсов дольше таймаута скорость
    /// считается нулевой.
    pub fn speed(&mut self, now: Instant) -> f32 {
        match self.last_edge {
            Some(last)
                if now.saturating_duration_since(last)
                    <= Duration::from_millis(SPEED_TIMEOUT_MS) =>
            {
                self.rpm
            }
            _ => {
                self.filter.reset();
                self.rpm = 0.0;
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_edge_only_arms_estimator() {
        let mut est = PulseSpeedEstimator::new(1);
        assert_eq!(est.on_edge(Instant::from_millis(100)), None);
        assert_eq!(est.speed(Instant::from_millis(110)), 0.0);
    }

    #[test]
    fn period_converts_to_rpm() {
        let mut est = PulseSpeedEstimator::new(1);
        est.on_edge(Instant::from_millis(0));
        // 50 мс на оборот = 1200 об/мин
        let rpm = est.on_edge(Instant::from_millis(50)).unwrap();
        assert!((rpm - 1200.0).abs() < 1e-2);

        let mut est = PulseSpeedEstimator::new(2);
        est.on_edge(Instant::from_millis(0));
        let rpm = est.on_edge(Instant::from_millis(50)).unwrap();
        assert!((rpm - 600.0).abs() < 1e-2);
    }

    #[test]
    fn estimates_are_smoothed() {
        let mut est = PulseSpeedEstimator::new(1);
        est.on_edge(Instant::from_millis(0));
        est.on_edge(Instant::from_millis(100)); // 600
        let rpm = est.on_edge(Instant::from_millis(150)).unwrap(); // 1200
        assert!((rpm - 900.0).abs() < 1e-2);
    }

    #[test]
    fn bounce_is_ignored() {
        let mut est = PulseSpeedEstimator::new(1);
        est.on_edge(Instant::from_micros(0));
        assert_eq!(est.on_edge(Instant::from_micros(100)), None);
        let rpm = est.on_edge(Instant::from_millis(60)).unwrap();
        assert!((rpm - 1000.0).abs() < 1e-2);
    }

    #[test]
    fn speed_times_out_to_zero() {
        let mut est = PulseSpeedEstimator::new(1);
        est.on_edge(Instant::from_millis(0));
        est.on_edge(Instant::from_millis(100));
        assert!((est.speed(Instant::from_millis(400)) - 600.0).abs() < 1e-2);
        assert_eq!(est.speed(Instant::from_millis(700)), 0.0);
        // после таймаута фильтр начинает заново
        let rpm = est.on_edge(Instant::from_millis(750)).unwrap();
        assert!((rpm - 60.0 / 0.65).abs() < 1e-2);
    }
}
