//! Бинарный протокол S-A-A-2 (NanoVNA V2).
//!
//! Устройство управляется через регистровое пространство: каждая команда это
//! опкод и несколько байт аргументов. Многобайтовые значения регистров
//! пишутся побайтово, младший байт первым, по последовательным адресам.
//!
//! ```text
//! INDICATE  0x0D                         ответ: один байт '2'
//! WRITE     0x20 ADDR VALUE              записать байт в регистр
//! READFIFO  0x18 ADDR LEN_LO LEN_HI      прочитать LEN байт из FIFO
//! ```

use vna_types::{SweepConfig, RECORD_SIZE};

use crate::binary::{write_u16_le, write_u64_le};

/// Опкод INDICATE
pub const OP_INDICATE: u8 = 0x0D;

/// Опкод однобайтовой записи в регистр
pub const OP_WRITE: u8 = 0x20;

/// Опкод блочного чтения FIFO
pub const OP_READFIFO: u8 = 0x18;

/// Ожидаемый ответ на INDICATE
pub const INDICATE_REPLY: &[u8] = b"2";

/// sweepStartHz, u64 LE
pub const REG_SWEEP_START: u8 = 0x00;

/// sweepStepHz, u64 LE
pub const REG_SWEEP_STEP: u8 = 0x10;

/// sweepPoints, u16 LE
pub const REG_SWEEP_POINTS: u8 = 0x20;

/// valuesPerFrequency, u16 LE
pub const REG_VALUES_PER_FREQ: u8 = 0x22;

/// FIFO данных; запись любого значения очищает FIFO
pub const REG_FIFO: u8 = 0x30;

/// Всегда одно значение на частоту
pub const VALUES_PER_FREQUENCY: u16 = 1;

/// Размер блока READFIFO по умолчанию: 8 записей
pub const DEFAULT_FIFO_BLOCK: u16 = 8 * RECORD_SIZE as u16;

/// Команда протокола.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Indicate,
    Write { address: u8, value: u8 },
    ReadFifo { address: u8, length: u16 },
}

impl Command {
    /// Байты кадра в том виде, в каком они уходят в порт.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Command::Indicate => vec![OP_INDICATE],
            Command::Write { address, value } => vec![OP_WRITE, address, value],
            Command::ReadFifo { address, length } => {
                let len = write_u16_le(length);
                vec![OP_READFIFO, address, len[0], len[1]]
            }
        }
    }
}

/// Кадр INDICATE.
pub fn indicate_frame() -> Vec<u8> {
    Command::Indicate.encode()
}

/// Кадр WRITE для одного байта.
pub fn write_frame(
    address: u8,
    value: u8,
) -> Vec<u8> {
    Command::Write { address, value }.encode()
}

/// Кадр READFIFO.
pub fn read_fifo_frame(
    address: u8,
    length: u16,
) -> Vec<u8> {
    Command::ReadFifo { address, length }.encode()
}

/// Разворачивает многобайтовое значение в серию WRITE по адресам
/// `base, base+1, ...`.
pub fn register_writes(
    base: u8,
    bytes: &[u8],
) -> Vec<Command> {
    bytes
        .iter()
        .enumerate()
        .map(|(i, &value)| Command::Write {
            address: base.wrapping_add(i as u8),
            value,
        })
        .collect()
}

/// Полная последовательность записей для программирования развёртки.
///
/// Порядок: start (8 байт), step (8 байт), points (2 байта),
/// valuesPerFrequency (2 байта), итого 20 команд WRITE.
pub fn sweep_commands(sweep: &SweepConfig) -> Vec<Command> {
    let mut cmds = Vec::with_capacity(20);

    cmds.extend(register_writes(
        REG_SWEEP_START,
        &write_u64_le(sweep.start_hz()),
    ));
    cmds.extend(register_writes(
        REG_SWEEP_STEP,
        &write_u64_le(sweep.step_hz()),
    ));
    cmds.extend(register_writes(
        REG_SWEEP_POINTS,
        &write_u16_le(sweep.points()),
    ));
    cmds.extend(register_writes(
        REG_VALUES_PER_FREQ,
        &write_u16_le(VALUES_PER_FREQUENCY),
    ));

    cmds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layouts() {
        assert_eq!(indicate_frame(), vec![0x0D]);
        assert_eq!(write_frame(0x30, 0x00), vec![0x20, 0x30, 0x00]);
        assert_eq!(read_fifo_frame(0x30, 256), vec![0x18, 0x30, 0x00, 0x01]);
        assert_eq!(read_fifo_frame(0x30, 1024), vec![0x18, 0x30, 0x00, 0x04]);
        assert_eq!(read_fifo_frame(0x30, 0x1234), vec![0x18, 0x30, 0x34, 0x12]);
    }

    #[test]
    fn test_register_writes_consecutive_addresses() {
        let cmds = register_writes(0x10, &[0xAA, 0xBB, 0xCC]);
        assert_eq!(
            cmds,
            vec![
                Command::Write { address: 0x10, value: 0xAA },
                Command::Write { address: 0x11, value: 0xBB },
                Command::Write { address: 0x12, value: 0xCC },
            ]
        );
    }

    #[test]
    fn test_sweep_commands_byte_exact() {
        let sweep = SweepConfig::new(1_000_000, 100_000_000, 11).unwrap();
        let cmds = sweep_commands(&sweep);
        assert_eq!(cmds.len(), 20);

        let frames: Vec<Vec<u8>> = cmds.iter().map(Command::encode).collect();

        // start = 1_000_000 = 0x000F4240
        let start: Vec<u8> = frames[0..8].iter().map(|f| f[2]).collect();
        assert_eq!(start, vec![0x40, 0x42, 0x0F, 0x00, 0x00, 0x00, 0x00, 0x00]);
        for (i, f) in frames[0..8].iter().enumerate() {
            assert_eq!(f[0], OP_WRITE);
            assert_eq!(f[1], i as u8);
        }

        // step = 9_900_000
        let step: Vec<u8> = frames[8..16].iter().map(|f| f[2]).collect();
        assert_eq!(u64::from_le_bytes(step.try_into().unwrap()), 9_900_000);
        assert_eq!(frames[8][1], 0x10);
        assert_eq!(frames[15][1], 0x17);

        // points = 11, valuesPerFrequency = 1
        assert_eq!(frames[16], vec![0x20, 0x20, 11]);
        assert_eq!(frames[17], vec![0x20, 0x21, 0]);
        assert_eq!(frames[18], vec![0x20, 0x22, 1]);
        assert_eq!(frames[19], vec![0x20, 0x23, 0]);
    }

    #[test]
    fn test_gigahertz_start_bytes() {
        let sweep = SweepConfig::new(1_000_000_000, 3_000_000_000, 3).unwrap();
        let start: Vec<u8> = sweep_commands(&sweep)[0..8]
            .iter()
            .map(|c| c.encode()[2])
            .collect();
        assert_eq!(start, vec![0x00, 0xCA, 0x9A, 0x3B, 0x00, 0x00, 0x00, 0x00]);
    }
}
