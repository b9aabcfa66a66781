//! Производные величины: модуль, фаза, дБ, КСВ.

use num_complex::Complex64;

/// Нижняя граница модуля для логарифма (вместо log(0)).
pub const DB_FLOOR: f64 = 1e-10;

/// Порог |Γ|, начиная с которого КСВ ограничивается.
pub const VSWR_GAMMA_LIMIT: f64 = 0.99;

/// Значение КСВ при |Γ| >= [`VSWR_GAMMA_LIMIT`].
pub const VSWR_CAP: f64 = 10.0;

#[inline]
pub fn magnitude(x: Complex64) -> f64 {
    x.norm()
}

/// Фаза в градусах (-180..=180).
#[inline]
pub fn phase_deg(x: Complex64) -> f64 {
    x.arg().to_degrees()
}

/// `20·log10(max(|x|, 1e-10))`
#[inline]
pub fn db(x: Complex64) -> f64 {
    20.0 * x.norm().max(DB_FLOOR).log10()
}

/// `(1 + |Γ|) / (1 - |Γ|)`, не более 10.
#[inline]
pub fn vswr(gamma: Complex64) -> f64 {
    let mag = gamma.norm();
    if mag >= VSWR_GAMMA_LIMIT {
        VSWR_CAP
    } else {
        (1.0 + mag) / (1.0 - mag)
    }
}
