use std::time::Duration;

use log::{info, warn};
use vna_core::sweep_commands;
use vna_types::SweepConfig;

use crate::{CaptureResult, DeviceLink};

/// Минимальная пауза после программирования развёртки: прибору нужно
/// время, чтобы применить новые регистры.
pub const MIN_SWEEP_SETTLE: Duration = Duration::from_millis(500);

/// Программирует развёртку в регистры прибора и ждёт `settle`.
///
/// 20 однобайтовых записей: start `0x00..=0x07`, step `0x10..=0x17`,
/// points `0x20..=0x21`, valuesPerFrequency `0x22..=0x23`.
///
/// `settle` короче [`MIN_SWEEP_SETTLE`] поднимается до минимума.
pub fn configure(
    link: &mut DeviceLink,
    sweep: &SweepConfig,
    settle: Duration,
) -> CaptureResult<()> {
    info!(
        "Configuring sweep: {:.3}-{:.3} MHz, {} points, step {} Hz",
        sweep.start_hz() as f64 / 1e6,
        sweep.stop_hz() as f64 / 1e6,
        sweep.points(),
        sweep.step_hz()
    );

    for cmd in sweep_commands(sweep) {
        link.execute(cmd)?;
    }

    if settle < MIN_SWEEP_SETTLE {
        warn!("Sweep settle {settle:?} raised to {MIN_SWEEP_SETTLE:?}");
    }
    link.sleep(settle.max(MIN_SWEEP_SETTLE));
    Ok(())
}

/// То же, но из сырых параметров: проверка выполняется до отправки байт.
pub fn configure_range(
    link: &mut DeviceLink,
    start_hz: u64,
    stop_hz: u64,
    points: u16,
    settle: Duration,
) -> CaptureResult<SweepConfig> {
    let sweep = SweepConfig::new(start_hz, stop_hz, points)?;
    configure(link, &sweep, settle)?;
    Ok(sweep)
}
