//! Треугольные функции принадлежности

use serde::Deserialize;

use crate::error::ConfigError;

/// Треугольный терм: левое основание `a`, вершина `b`, правое основание `c`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "[f32; 3]")]
pub struct TriangularSet {
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl From<[f32; 3]> for TriangularSet {
    fn from([a, b, c]: [f32; 3]) -> Self {
        Self { a, b, c }
    }
}

impl TriangularSet {
    pub const fn new(a: f32, b: f32, c: f32) -> Self {
        Self { a, b, c }
    }

    /// Терм с проверкой формы
    pub fn try_new(a: f32, b: f32, c: f32) -> Result<Self, ConfigError> {
        let set = Self::new(a, b, c);
        if set.is_valid() {
            Ok(set)
        } else {
            Err(ConfigError::InvalidShape)
        }
    }

    /// Конечные параметры и a <= b <= c
    pub fn is_valid(&self) -> bool {
        self.a.is_finite()
            && self.b.is_finite()
            && self.c.is_finite()
            && self.a <= self.b
            && self.b <= self.c
    }

    /// Степень принадлежности `x` терму, всегда в [0, 1].
    ///
    /// Вырожденные стороны (a == b или b == c) ведут себя как вертикальная
    /// ступенька: ровно в общей точке степень равна 1.0, по эту сторону от нее 0.
    /// Поэтому проверка вершины идет первой, до исключения оснований: терм
    /// (0, 100, 100) в точке 100 дает 1.0, а не 0.
    pub fn grade(&self, x: f32) -> f32 {
        let Self { a, b, c } = *self;
        if x == b {
            1.0
        } else if a < x && x < b {
            (x - a) / (b - a)
        } else if b < x && x < c {
            (c - x) / (c - b)
        } else {
            // x <= a, x >= c или NaN
            0.0
        }
    }
}

/// Степень принадлежности для произвольных параметров терма
pub fn grade(x: f32, a: f32, b: f32, c: f32) -> Result<f32, ConfigError> {
    TriangularSet::try_new(a, b, c).map(|set| set.grade(x))
}
