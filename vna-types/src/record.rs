use num_complex::Complex;

/// Размер одной записи FIFO в байтах
pub const RECORD_SIZE: usize = 32;

/// Сырая запись FIFO (32 байта, little-endian).
///
/// ```text
/// [0..4]   FWD0_RE     i32  опорный канал (падающая волна), Re
/// [4..8]   FWD0_IM     i32  опорный канал, Im
/// [8..12]  REV0_RE     i32  отражённая волна порта 1, Re
/// [12..16] REV0_IM     i32  отражённая волна порта 1, Im
/// [16..20] REV1_RE     i32  волна на порту 2, Re
/// [20..24] REV1_IM     i32  волна на порту 2, Im
/// [24..26] FREQ_INDEX  u16  индекс частоты в развёртке
/// [26..32] RESERVED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord {
    /// Опорный канал (делитель при калибровке)
    pub forward: Complex<i32>,
    /// Отражённая волна порта 1 (→ S11)
    pub reverse_port1: Complex<i32>,
    /// Прошедшая на порт 2 волна (→ S21)
    pub reverse_port2: Complex<i32>,
    /// Индекс частоты, как его сообщило устройство.
    ///
    /// Сохраняется, но ось частот по нему не строится.
    pub freq_index: u16,
}

impl RawRecord {
    pub fn new(
        forward: Complex<i32>,
        reverse_port1: Complex<i32>,
        reverse_port2: Complex<i32>,
        freq_index: u16,
    ) -> Self {
        Self {
            forward,
            reverse_port1,
            reverse_port2,
            freq_index,
        }
    }
}
