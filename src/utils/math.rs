//! Математические функции и утилиты

/// Ограничение значения в заданных пределах
#[inline(always)]
pub fn constrain(value: f32, min: f32, max: f32) -> f32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Ограничение симметричным диапазоном [-limit, limit].
/// NaN превращается в 0, чтобы не попасть на исполнительный механизм.
#[inline]
pub fn constrain_symmetric(value: f32, limit: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        constrain(value, -limit, limit)
    }
}

/// Квадратный корень с защитой от отрицательных значений
#[inline]
pub fn safe_sqrt(value: f32) -> f32 {
    if value <= 0.0 {
        0.0
    } else {
        libm::sqrtf(value)
    }
}

/// Накопитель статистики по алгоритму Уэлфорда (среднее, дисперсия, экстремумы)
#[derive(Debug, Clone, Copy)]
pub struct RunningStats {
    count: u32,
    mean: f32,
    m2: f32,
    min: f32,
    max: f32,
}

impl RunningStats {
    pub const fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
        }
    }

    pub fn push(&mut self, value: f32) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f32;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn mean(&self) -> f32 {
        self.mean
    }

    /// Стандартное отклонение генеральной совокупности
    pub fn std_deviation(&self) -> f32 {
        if self.count < 2 {
            0.0
        } else {
            safe_sqrt(self.m2 / self.count as f32)
        }
    }

    pub fn min(&self) -> f32 {
        if self.count == 0 { 0.0 } else { self.min }
    }

    pub fn max(&self) -> f32 {
        if self.count == 0 { 0.0 } else { self.max }
    }
}

impl Default for RunningStats {
    fn default() -> Self {
        Self::new()
    }
}
