//! Ядро протокола S-A-A-2 VNA
//!
//! Кодирование команд, раскладка регистров развёртки, разбор записей FIFO и
//! сборка измерения S-параметров. Ввод/вывод здесь не выполняется: работа с
//! портом находится в `vna-capture`.
//!
//! # Быстрый старт
//!
//! ```
//! use vna_core::{assemble, decode, sweep_commands, RawRecordExt};
//! use vna_types::{RawRecord, SweepConfig};
//! use num_complex::Complex;
//!
//! let sweep = SweepConfig::new(1_000_000, 100_000_000, 11)?;
//! assert_eq!(sweep_commands(&sweep).len(), 20);
//!
//! let rec = RawRecord::new(Complex::new(100, 0), Complex::new(50, 0), Complex::new(0, 0), 0);
//! let out = decode(&rec.serialize());
//! let m = assemble(&out.samples, sweep.start_hz(), sweep.stop_hz());
//! assert_eq!(m.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod binary;
pub mod decoder;
pub mod derived;
pub mod measurement;
pub mod protocol;

pub use binary::*;
pub use decoder::*;
pub use derived::*;
pub use measurement::*;
pub use protocol::*;

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        assert_eq!(OP_INDICATE, 0x0D);
        assert_eq!(vna_types::RECORD_SIZE, 32);
        assert_eq!(DEFAULT_FIFO_BLOCK, 256);
    }
}
