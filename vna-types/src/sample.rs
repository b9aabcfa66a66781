use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Откалиброванная точка: сырые отсчёты, делённые на опорный канал.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibratedSample {
    pub s11: Complex64,
    pub s21: Complex64,
    /// |reference|, для диагностики уровня сигнала
    pub reference_magnitude: f64,
    /// Индекс частоты из записи FIFO
    pub freq_index: u16,
}

impl CalibratedSample {
    /// Точка с нулевым опорным каналом: S11 = S21 = 0.
    pub fn zeroed(
        reference_magnitude: f64,
        freq_index: u16,
    ) -> Self {
        Self {
            s11: Complex64::new(0.0, 0.0),
            s21: Complex64::new(0.0, 0.0),
            reference_magnitude,
            freq_index,
        }
    }
}
