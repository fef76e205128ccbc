//! Цифровые фильтры для обработки сигналов

use heapless::Deque;

/// Скользящее среднее
#[derive(Debug, Clone)]
pub struct MovingAverage<const N: usize> {
    buffer: Deque<f32, N>,
    sum: f32,
}

impl<const N: usize> MovingAverage<N> {
    /// Создание нового фильтра скользящего среднего
    pub const fn new() -> Self {
        Self {
            buffer: Deque::new(),
            sum: 0.0,
        }
    }

    /// Добавление значения и получение среднего
    pub fn filter(&mut self, input: f32) -> f32 {
        // Если буфер полный, удаляем старое значение
        if self.buffer.is_full() {
            if let Some(oldest) = self.buffer.pop_front() {
                self.sum -= oldest;
            }
        }

        if self.buffer.push_back(input).is_ok() {
            self.sum += input;
        }

        self.get_average()
    }

    /// Получение текущего среднего без добавления нового значения
    pub fn get_average(&self) -> f32 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.sum / self.buffer.len() as f32
        }
    }

    /// Сброс фильтра
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.sum = 0.0;
    }
}

impl<const N: usize> Default for MovingAverage<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_average_drops_oldest_sample() {
        let mut avg = MovingAverage::<3>::new();
        assert_eq!(avg.filter(3.0), 3.0);
        assert_eq!(avg.filter(6.0), 4.5);
        assert_eq!(avg.filter(9.0), 6.0);
        // 3.0 вытесняется
        assert_eq!(avg.filter(12.0), 9.0);

        avg.reset();
        assert_eq!(avg.get_average(), 0.0);
    }
}
