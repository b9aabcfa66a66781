use num_complex::{Complex, Complex64};
use rand::{rngs::StdRng, Rng, SeedableRng};
use vna_core::{
    assemble, decode, read_fifo_frame, sweep_commands, Command, RawRecordExt, SParam,
    DEFAULT_FIFO_BLOCK, REG_FIFO,
};
use vna_types::{RawRecord, SweepConfig, RECORD_SIZE};

// ===========================================================================
// Helpers: детерминированные тест-данные
// ===========================================================================

/// Запись с опорой `(1000, 0)` и отражением `k / 10`.
fn deterministic_record(idx: u16) -> RawRecord {
    let k = idx as i32;
    RawRecord::new(
        Complex::new(1_000, 0),
        Complex::new(100 * k, -50 * k),
        Complex::new(1_000 - 10 * k, 0),
        idx,
    )
}

/// Буфер FIFO из `n` последовательных записей (Test Vector #1).
fn build_fifo_buffer(n: u16) -> Vec<u8> {
    (0..n)
        .flat_map(|i| deterministic_record(i).serialize())
        .collect()
}

/// Собирает значение регистра обратно из серии WRITE.
fn reassemble(
    cmds: &[Command],
    base: u8,
    width: usize,
) -> u64 {
    let mut bytes = [0u8; 8];
    for cmd in cmds {
        if let Command::Write { address, value } = *cmd {
            if address >= base && ((address - base) as usize) < width {
                bytes[(address - base) as usize] = value;
            }
        }
    }
    u64::from_le_bytes(bytes)
}

// ===========================================================================
// Программирование развёртки
// ===========================================================================

#[test]
fn test_sweep_registers_reassemble() {
    let cases = [
        (1_000_000u64, 100_000_000u64, 11u16),
        (50_000, 4_400_000_000, 1_024),
        (2_400_000_000, 2_500_000_000, 2),
        (0, u32::MAX as u64, 65_535),
    ];

    for (start, stop, points) in cases {
        let sweep = SweepConfig::new(start, stop, points).unwrap();
        let cmds = sweep_commands(&sweep);

        assert_eq!(sweep.step_hz(), (stop - start) / (points as u64 - 1));
        assert_eq!(reassemble(&cmds, 0x00, 8), start, "start");
        assert_eq!(reassemble(&cmds, 0x10, 8), sweep.step_hz(), "step");
        assert_eq!(reassemble(&cmds, 0x20, 2), points as u64, "points");
        assert_eq!(reassemble(&cmds, 0x22, 2), 1, "valuesPerFrequency");
    }
}

#[test]
fn test_sweep_example_frames() {
    let sweep = SweepConfig::new(1_000_000, 100_000_000, 11).unwrap();
    assert_eq!(sweep.step_hz(), 9_900_000);

    let wire: Vec<u8> = sweep_commands(&sweep)
        .iter()
        .flat_map(Command::encode)
        .collect();

    // 20 кадров WRITE по 3 байта
    assert_eq!(wire.len(), 60);
    assert_eq!(&wire[0..3], &[0x20, 0x00, 0x40]);
    assert_eq!(&wire[3..6], &[0x20, 0x01, 0x42]);
    assert_eq!(&wire[6..9], &[0x20, 0x02, 0x0F]);
    assert_eq!(&wire[57..60], &[0x20, 0x23, 0x00]);
}

#[test]
fn test_fifo_read_frame_default_block() {
    assert_eq!(
        read_fifo_frame(REG_FIFO, DEFAULT_FIFO_BLOCK),
        vec![0x18, 0x30, 0x00, 0x01]
    );
}

// ===========================================================================
// Разбор буфера FIFO
// ===========================================================================

#[test]
fn test_buffer_64_and_70_bytes() {
    let buf = build_fifo_buffer(2);
    assert_eq!(buf.len(), 64);
    assert_eq!(decode(&buf).samples.len(), 2);

    let mut buf70 = buf.clone();
    buf70.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
    let out = decode(&buf70);
    assert_eq!(out.samples.len(), 2, "хвост из 6 байт отброшен");
    assert_eq!(out.stats.trailing_bytes, 6);
}

#[test]
fn test_decode_is_deterministic_for_random_records() {
    let mut rng = StdRng::seed_from_u64(0x5AA2);

    for _ in 0..200 {
        let mut chunk = [0u8; RECORD_SIZE];
        rng.fill(&mut chunk[..]);

        let a = decode(&chunk);
        let b = decode(&chunk);
        assert_eq!(a.samples.len(), 1);

        let (sa, sb) = (a.samples[0], b.samples[0]);
        // NaN не возникает: деление только при |ref| > eps
        assert_eq!(sa.s11.re.to_bits(), sb.s11.re.to_bits());
        assert_eq!(sa.s11.im.to_bits(), sb.s11.im.to_bits());
        assert_eq!(sa.s21.re.to_bits(), sb.s21.re.to_bits());
        assert_eq!(sa.s21.im.to_bits(), sb.s21.im.to_bits());
        assert_eq!(sa.freq_index, sb.freq_index);
    }
}

#[test]
fn test_zero_reference_any_reverse_values() {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..100 {
        let rec = RawRecord::new(
            Complex::new(0, 0),
            Complex::new(rng.gen(), rng.gen()),
            Complex::new(rng.gen(), rng.gen()),
            rng.gen(),
        );
        let out = decode(&rec.serialize());
        assert_eq!(out.samples[0].s11, Complex64::new(0.0, 0.0));
        assert_eq!(out.samples[0].s21, Complex64::new(0.0, 0.0));
    }
}

// ===========================================================================
// Полный путь: буфер → измерение
// ===========================================================================

#[test]
fn test_buffer_to_measurement() {
    let sweep = SweepConfig::new(1_000_000, 100_000_000, 11).unwrap();
    let out = decode(&build_fifo_buffer(11));
    let m = assemble(&out.samples, sweep.start_hz(), sweep.stop_hz());

    assert_eq!(m.len(), 11);
    assert_eq!(m.frequencies_hz[0], 1_000_000.0);
    assert_eq!(m.frequencies_hz[10], 100_000_000.0);
    assert_eq!(m.freq_indices, (0..11).collect::<Vec<u16>>());

    // S11[k] = (0.1k, -0.05k)
    assert!((m.s11[4] - Complex64::new(0.4, -0.2)).norm() < 1e-12);
    // S21[k] = 1 - 0.01k
    assert!((m.s21[10] - Complex64::new(0.9, 0.0)).norm() < 1e-12);
    assert_eq!(m.param(SParam::S22), m.param(SParam::S11));
}

#[test]
fn test_under_delivered_buffer_shrinks_axis() {
    let out = decode(&build_fifo_buffer(7));
    let m = assemble(&out.samples, 1_000_000, 100_000_000);

    assert_eq!(m.len(), 7);
    assert_eq!(m.s11.len(), 7);
    assert_eq!(m.s22.len(), 7);
    assert_eq!(m.frequencies_hz[6], 100_000_000.0);
}
