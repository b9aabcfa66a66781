//! Сборка результата развёртки: ось частот + S-параметры 2-порта.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use vna_types::CalibratedSample;

use crate::derived;

/// S-параметр 2-портовой сети.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SParam {
    S11,
    S21,
    S12,
    S22,
}

/// Результат одной развёртки.
///
/// Все последовательности одной длины. `s12` и `s22` не измеряются:
/// это копии `s21` и `s11` (взаимная симметричная пассивная цепь).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Ось частот (Гц), равномерная между start и stop
    pub frequencies_hz: Vec<f64>,
    pub s11: Vec<Complex64>,
    pub s21: Vec<Complex64>,
    pub s12: Vec<Complex64>,
    pub s22: Vec<Complex64>,
    /// freq_index каждой точки в порядке поступления
    pub freq_indices: Vec<u16>,
    /// |reference| каждой точки
    pub reference_magnitudes: Vec<f64>,
}

/// Сводка по измерению для вывода в конце сессии.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSummary {
    pub points: usize,
    pub freq_index_range: Option<(u16, u16)>,
    pub first_reference: Option<f64>,
    pub s11_mag_range: Option<(f64, f64)>,
    pub s11_phase_range_deg: Option<(f64, f64)>,
}

/// `n` равноотстоящих значений от `start` до `stop` включительно.
pub fn linspace(
    start: f64,
    stop: f64,
    n: usize,
) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut v: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            v[n - 1] = stop;
            v
        }
    }
}

/// Собирает [`Measurement`] из откалиброванных точек.
///
/// Ось частот восстанавливается по количеству точек, а не по их
/// `freq_index`: при потере записей в середине развёртки ось смещается.
pub fn assemble(
    samples: &[CalibratedSample],
    start_hz: u64,
    stop_hz: u64,
) -> Measurement {
    let s11: Vec<Complex64> = samples.iter().map(|s| s.s11).collect();
    let s21: Vec<Complex64> = samples.iter().map(|s| s.s21).collect();

    Measurement {
        frequencies_hz: linspace(start_hz as f64, stop_hz as f64, samples.len()),
        s12: s21.clone(),
        s22: s11.clone(),
        s11,
        s21,
        freq_indices: samples.iter().map(|s| s.freq_index).collect(),
        reference_magnitudes: samples.iter().map(|s| s.reference_magnitude).collect(),
    }
}

impl Measurement {
    pub fn len(&self) -> usize {
        self.frequencies_hz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies_hz.is_empty()
    }

    pub fn param(
        &self,
        p: SParam,
    ) -> &[Complex64] {
        match p {
            SParam::S11 => &self.s11,
            SParam::S21 => &self.s21,
            SParam::S12 => &self.s12,
            SParam::S22 => &self.s22,
        }
    }

    pub fn magnitude(
        &self,
        p: SParam,
    ) -> Vec<f64> {
        self.param(p).iter().map(|&x| derived::magnitude(x)).collect()
    }

    /// Фаза в градусах.
    pub fn phase_deg(
        &self,
        p: SParam,
    ) -> Vec<f64> {
        self.param(p).iter().map(|&x| derived::phase_deg(x)).collect()
    }

    pub fn db(
        &self,
        p: SParam,
    ) -> Vec<f64> {
        self.param(p).iter().map(|&x| derived::db(x)).collect()
    }

    /// КСВ по коэффициенту отражения (имеет смысл для S11/S22).
    pub fn vswr(
        &self,
        p: SParam,
    ) -> Vec<f64> {
        self.param(p).iter().map(|&x| derived::vswr(x)).collect()
    }

    pub fn summary(&self) -> MeasurementSummary {
        let mags = self.magnitude(SParam::S11);
        let phases = self.phase_deg(SParam::S11);

        MeasurementSummary {
            points: self.len(),
            freq_index_range: self
                .freq_indices
                .first()
                .zip(self.freq_indices.last())
                .map(|(&a, &b)| (a, b)),
            first_reference: self.reference_magnitudes.first().copied(),
            s11_mag_range: min_max(&mags),
            s11_phase_range_deg: min_max(&phases),
        }
    }
}

fn min_max(v: &[f64]) -> Option<(f64, f64)> {
    if v.is_empty() {
        return None;
    }

    Some(v.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
        (lo.min(x), hi.max(x))
    }))
}

impl std::fmt::Display for MeasurementSummary {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        writeln!(f, "  Points        : {}", self.points)?;

        if let Some((a, b)) = self.freq_index_range {
            writeln!(f, "  freq_index    : {a} - {b}")?;
        }
        if let Some(r) = self.first_reference {
            writeln!(f, "  Reference[0]  : {r:.2}")?;
        }
        if let Some((lo, hi)) = self.s11_mag_range {
            writeln!(f, "  |S11|         : {lo:.3} - {hi:.3}")?;
        }
        match self.s11_phase_range_deg {
            Some((lo, hi)) => write!(f, "  S11 phase     : {lo:.1}° - {hi:.1}°"),
            None => write!(f, "  (no data)"),
        }
    }
}
