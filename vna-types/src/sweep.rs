use serde::Serialize;

use crate::{VnaError, VnaResult};

/// Параметры линейной развёртки по частоте.
///
/// Создаётся только через [`SweepConfig::new`], поэтому всегда
/// `points >= 2` и `stop_hz > start_hz`. Шаг вычисляется целочисленно,
/// дробная часть герца отбрасывается.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepConfig {
    start_hz: u64,
    stop_hz: u64,
    points: u16,
    step_hz: u64,
}

impl SweepConfig {
    /// Проверяет параметры и вычисляет шаг.
    pub fn new(
        start_hz: u64,
        stop_hz: u64,
        points: u16,
    ) -> VnaResult<Self> {
        if points < 2 {
            return Err(VnaError::invalid_sweep(format!(
                "points must be >= 2, got {points}"
            )));
        }

        if stop_hz <= start_hz {
            return Err(VnaError::invalid_sweep(format!(
                "stop ({stop_hz} Hz) must be greater than start ({start_hz} Hz)"
            )));
        }

        Ok(Self {
            start_hz,
            stop_hz,
            points,
            step_hz: step_for(start_hz, stop_hz, points),
        })
    }

    /// Начальная частота (Гц)
    pub fn start_hz(&self) -> u64 {
        self.start_hz
    }

    /// Конечная частота (Гц)
    pub fn stop_hz(&self) -> u64 {
        self.stop_hz
    }

    /// Кол-во точек развёртки
    pub fn points(&self) -> u16 {
        self.points
    }

    /// Шаг между точками (Гц)
    pub fn step_hz(&self) -> u64 {
        self.step_hz
    }

    /// Сколько байт FIFO нужно для полной развёртки.
    pub fn expected_bytes(&self) -> usize {
        self.points as usize * crate::RECORD_SIZE
    }
}

/// `(stop - start) / (points - 1)`, либо 0 для одной точки.
pub fn step_for(
    start_hz: u64,
    stop_hz: u64,
    points: u16,
) -> u64 {
    if points > 1 {
        stop_hz.saturating_sub(start_hz) / (points as u64 - 1)
    } else {
        0
    }
}
