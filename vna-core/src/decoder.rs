//! Разбор содержимого FIFO: 32-байтовые записи → откалиброванные точки.

use log::warn;
use num_complex::{Complex, Complex64};
use vna_types::{CalibratedSample, RawRecord, VnaError, VnaResult, RECORD_SIZE};

use crate::binary::{read_i32_le, read_u16_le, write_i32_le};

/// Порог |reference|, ниже которого деление не выполняется.
pub const REFERENCE_EPSILON: f64 = 1e-6;

/// Смещение поля freq_index внутри записи
const FREQ_INDEX_OFFSET: usize = 24;

/// Разбор и сборка одной записи FIFO.
pub trait RawRecordExt: Sized {
    /// Разбирает ровно [`RECORD_SIZE`] байт.
    fn parse(chunk: &[u8]) -> VnaResult<Self>;

    /// Собирает запись обратно в 32 байта (резерв заполнен нулями).
    fn serialize(&self) -> [u8; RECORD_SIZE];

    /// Делит отражённые волны на опорный канал.
    fn calibrate(&self) -> CalibratedSample;
}

impl RawRecordExt for RawRecord {
    fn parse(chunk: &[u8]) -> VnaResult<Self> {
        if chunk.len() != RECORD_SIZE {
            return Err(VnaError::record_decode(
                0,
                format!("record must be {RECORD_SIZE} bytes, got {}", chunk.len()),
            ));
        }

        let mut off = 0;
        let fwd_re = read_i32_le(chunk, &mut off)?;
        let fwd_im = read_i32_le(chunk, &mut off)?;
        let rev1_re = read_i32_le(chunk, &mut off)?;
        let rev1_im = read_i32_le(chunk, &mut off)?;
        let rev2_re = read_i32_le(chunk, &mut off)?;
        let rev2_im = read_i32_le(chunk, &mut off)?;
        let freq_index = read_u16_le(chunk, &mut off)?;

        Ok(RawRecord::new(
            Complex::new(fwd_re, fwd_im),
            Complex::new(rev1_re, rev1_im),
            Complex::new(rev2_re, rev2_im),
            freq_index,
        ))
    }

    fn serialize(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        let mut off = 0;

        for c in [self.forward, self.reverse_port1, self.reverse_port2] {
            write_i32_le(&mut buf, &mut off, c.re);
            write_i32_le(&mut buf, &mut off, c.im);
        }

        buf[FREQ_INDEX_OFFSET..FREQ_INDEX_OFFSET + 2]
            .copy_from_slice(&self.freq_index.to_le_bytes());

        buf
    }

    fn calibrate(&self) -> CalibratedSample {
        let reference = to_f64(self.forward);
        let ref_mag = reference.norm();

        if ref_mag <= REFERENCE_EPSILON {
            return CalibratedSample::zeroed(ref_mag, self.freq_index);
        }

        CalibratedSample {
            s11: to_f64(self.reverse_port1) / reference,
            s21: to_f64(self.reverse_port2) / reference,
            reference_magnitude: ref_mag,
            freq_index: self.freq_index,
        }
    }
}

fn to_f64(c: Complex<i32>) -> Complex64 {
    Complex64::new(c.re as f64, c.im as f64)
}

/// Статистика разбора буфера.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecodeStats {
    /// Успешно разобранных записей.
    pub records_ok: u64,
    /// Записей, пропущенных из-за ошибки разбора.
    pub records_skipped: u64,
    /// Байт в неполной хвостовой записи (отброшены).
    pub trailing_bytes: usize,
}

/// Результат [`decode`].
#[derive(Debug, Clone, Default)]
pub struct DecodeOutput {
    pub samples: Vec<CalibratedSample>,
    pub stats: DecodeStats,
}

/// Итератор по сырым записям буфера.
///
/// Неполный хвост не выдаётся, его длина доступна через
/// [`Records::trailing_bytes`].
pub struct Records<'a> {
    chunks: std::slice::ChunksExact<'a, u8>,
    offset: usize,
}

impl<'a> Records<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            chunks: buf.chunks_exact(RECORD_SIZE),
            offset: 0,
        }
    }

    pub fn trailing_bytes(&self) -> usize {
        self.chunks.remainder().len()
    }
}

impl Iterator for Records<'_> {
    type Item = VnaResult<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.chunks.next()?;
        let at = self.offset;
        self.offset += RECORD_SIZE;

        Some(RawRecord::parse(chunk).map_err(|e| match e {
            VnaError::RecordDecode { offset, reason } => VnaError::RecordDecode {
                offset: at + offset,
                reason,
            },
            other => other,
        }))
    }
}

/// Разбирает весь буфер FIFO.
///
/// Неполная последняя запись молча отбрасывается. [`Records`] выдаёт только
/// целые 32-байтовые записи, поэтому ошибок разбора из буфера не бывает, но
/// [`calibrate_records`] всё равно пропускает их, не прерывая разбор.
pub fn decode(buf: &[u8]) -> DecodeOutput {
    let mut records = Records::new(buf);
    let mut out = calibrate_records(records.by_ref());
    out.stats.trailing_bytes = records.trailing_bytes();
    out
}

/// Калибрует поток записей. Ошибочная запись пропускается с
/// предупреждением в лог и учитывается в `records_skipped`.
pub fn calibrate_records<I>(records: I) -> DecodeOutput
where
    I: IntoIterator<Item = VnaResult<RawRecord>>,
{
    let records = records.into_iter();
    let mut out = DecodeOutput {
        samples: Vec::with_capacity(records.size_hint().0),
        stats: DecodeStats::default(),
    };

    for result in records {
        match result {
            Ok(record) => {
                out.samples.push(record.calibrate());
                out.stats.records_ok += 1;
            }
            Err(e) => {
                warn!("Skipping malformed FIFO record: {e}");
                out.stats.records_skipped += 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        fwd: (i32, i32),
        rev1: (i32, i32),
        rev2: (i32, i32),
        idx: u16,
    ) -> RawRecord {
        RawRecord::new(
            Complex::new(fwd.0, fwd.1),
            Complex::new(rev1.0, rev1.1),
            Complex::new(rev2.0, rev2.1),
            idx,
        )
    }

    #[test]
    fn test_parse_field_offsets() {
        let mut chunk = [0u8; RECORD_SIZE];
        chunk[0..4].copy_from_slice(&1000i32.to_le_bytes());
        chunk[4..8].copy_from_slice(&(-2000i32).to_le_bytes());
        chunk[8..12].copy_from_slice(&300i32.to_le_bytes());
        chunk[12..16].copy_from_slice(&(-400i32).to_le_bytes());
        chunk[16..20].copy_from_slice(&i32::MAX.to_le_bytes());
        chunk[20..24].copy_from_slice(&i32::MIN.to_le_bytes());
        chunk[24..26].copy_from_slice(&0xBEEFu16.to_le_bytes());
        chunk[26..32].copy_from_slice(&[0xFF; 6]); // резерв игнорируется

        let r = RawRecord::parse(&chunk).unwrap();
        assert_eq!(r.forward, Complex::new(1000, -2000));
        assert_eq!(r.reverse_port1, Complex::new(300, -400));
        assert_eq!(r.reverse_port2, Complex::new(i32::MAX, i32::MIN));
        assert_eq!(r.freq_index, 0xBEEF);
    }

    #[test]
    fn test_parse_wrong_length() {
        let err = RawRecord::parse(&[0u8; 31]).unwrap_err();
        assert!(matches!(err, VnaError::RecordDecode { .. }));
    }

    #[test]
    fn test_serialize_layout() {
        let r = record((1, 2), (3, 4), (5, 6), 7);
        let bytes = r.serialize();
        assert_eq!(&bytes[0..4], &[1, 0, 0, 0]);
        assert_eq!(&bytes[20..24], &[6, 0, 0, 0]);
        assert_eq!(&bytes[24..26], &[7, 0]);
        assert_eq!(&bytes[26..], &[0u8; 6]);
        assert_eq!(RawRecord::parse(&bytes).unwrap(), r);
    }

    #[test]
    fn test_zero_reference_guard() {
        let s = record((0, 0), (12345, -999), (i32::MAX, 1), 3).calibrate();
        assert_eq!(s.s11, Complex64::new(0.0, 0.0));
        assert_eq!(s.s21, Complex64::new(0.0, 0.0));
        assert_eq!(s.reference_magnitude, 0.0);
        assert_eq!(s.freq_index, 3);
    }

    #[test]
    fn test_unity_reflection() {
        let s = record((7000, -3000), (7000, -3000), (0, 0), 0).calibrate();
        assert!((s.s11 - Complex64::new(1.0, 0.0)).norm() < 1e-12);
        assert_eq!(s.s21, Complex64::new(0.0, 0.0));
    }

    #[test]
    fn test_division_by_reference() {
        // (0 + 2i) / (2 + 0i) = i ; (-4 + 0i) / 2 = -2
        let s = record((2, 0), (0, 2), (-4, 0), 0).calibrate();
        assert!((s.s11 - Complex64::new(0.0, 1.0)).norm() < 1e-12);
        assert!((s.s21 - Complex64::new(-2.0, 0.0)).norm() < 1e-12);
        assert!((s.reference_magnitude - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_decode_two_records() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&record((10, 0), (5, 0), (1, 0), 0).serialize());
        buf.extend_from_slice(&record((10, 0), (0, 5), (0, 1), 1).serialize());
        assert_eq!(buf.len(), 64);

        let out = decode(&buf);
        assert_eq!(out.samples.len(), 2);
        assert_eq!(out.stats.records_ok, 2);
        assert_eq!(out.stats.trailing_bytes, 0);
        assert_eq!(out.samples[1].freq_index, 1);
    }

    #[test]
    fn test_decode_drops_trailing_partial() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&record((10, 0), (5, 0), (1, 0), 0).serialize());
        buf.extend_from_slice(&record((10, 0), (0, 5), (0, 1), 1).serialize());
        buf.extend_from_slice(&[0xAB; 6]);
        assert_eq!(buf.len(), 70);

        let out = decode(&buf);
        assert_eq!(out.samples.len(), 2);
        assert_eq!(out.stats.trailing_bytes, 6);
        assert_eq!(out.stats.records_skipped, 0);
    }

    #[test]
    fn test_decode_empty_and_short() {
        assert!(decode(&[]).samples.is_empty());

        let out = decode(&[0u8; 31]);
        assert!(out.samples.is_empty());
        assert_eq!(out.stats.trailing_bytes, 31);
    }

    #[test]
    fn test_records_iterator_offsets() {
        let mut buf = Vec::new();
        for i in 0..3u16 {
            buf.extend_from_slice(&record((1, 0), (0, 0), (0, 0), i).serialize());
        }
        let idx: Vec<u16> = Records::new(&buf)
            .map(|r| r.unwrap().freq_index)
            .collect();
        assert_eq!(idx, vec![0, 1, 2]);
    }

    #[test]
    fn test_calibrate_records_skips_bad_record() {
        let records = vec![
            Ok(record((100, 0), (50, 0), (0, 0), 0)),
            RawRecord::parse(&[0u8; 10]),
            Ok(record((100, 0), (0, 50), (0, 0), 2)),
        ];

        let out = calibrate_records(records);

        assert_eq!(out.stats.records_ok, 2);
        assert_eq!(out.stats.records_skipped, 1);
        let idx: Vec<u16> = out.samples.iter().map(|s| s.freq_index).collect();
        assert_eq!(idx, vec![0, 2]);
        assert!((out.samples[1].s11.im - 0.5).abs() < 1e-12);
    }
}
