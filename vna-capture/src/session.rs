use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{info, warn};
use vna_core::{assemble, decode, DecodeStats, Measurement};
use vna_types::SweepConfig;

use crate::{
    configure, metrics::CaptureMetrics, CaptureConfig, CaptureEngine, CaptureError,
    CaptureOutcome, CaptureResult, Clock, DeviceKind, DeviceLink, SerialTransport, SimulatedVna,
    Transport,
};

/// Оркестрирует одно измерение: от открытия порта до готовой [`Measurement`].
pub struct MeasurementSession {
    config: CaptureConfig,
    sweep: SweepConfig,
    metrics: Arc<CaptureMetrics>,
    stop_flag: Arc<AtomicBool>,
}

/// Результат сессии.
#[derive(Debug, Clone)]
pub struct CaptureReport {
    pub measurement: Measurement,
    pub sweep: SweepConfig,
    pub requested_points: usize,
    pub capture: CaptureOutcome,
    pub decode: DecodeStats,
}

impl MeasurementSession {
    /// Проверяет конфигурацию. Возвращает также shared-ссылку на метрики.
    pub fn new(config: CaptureConfig) -> CaptureResult<(Self, Arc<CaptureMetrics>)> {
        config.validate()?;
        let sweep = config.sweep()?;
        let metrics = CaptureMetrics::new();

        let s = Self {
            config,
            sweep,
            metrics: metrics.clone(),
            stop_flag: Arc::new(AtomicBool::new(false)),
        };

        Ok((s, metrics))
    }

    /// Флаг остановки. Проверяется между чтениями FIFO.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    pub fn sweep(&self) -> &SweepConfig {
        &self.sweep
    }

    /// Выполняет измерение. Канал закрывается на любом пути выхода.
    pub fn run(
        self,
        transport: Box<dyn Transport>,
        clock: Box<dyn Clock>,
    ) -> CaptureResult<CaptureReport> {
        let mut link = DeviceLink::open(
            transport,
            clock,
            self.config.link_settings(),
            self.metrics.clone(),
        )?;

        let result = self.acquire(&mut link);
        link.close();
        result
    }

    fn acquire(
        &self,
        link: &mut DeviceLink,
    ) -> CaptureResult<CaptureReport> {
        link.identify()?;
        configure(link, &self.sweep, self.config.sweep_settle())?;

        let engine = CaptureEngine::new(self.config.capture_policy())
            .with_stop_flag(self.stop_flag.clone());
        let capture = engine.capture(link, self.sweep.points())?;

        let decoded = decode(&capture.data);
        self.metrics
            .records_decoded
            .fetch_add(decoded.stats.records_ok, Ordering::Relaxed);
        self.metrics
            .records_skipped
            .fetch_add(decoded.stats.records_skipped, Ordering::Relaxed);

        // FIFO отдаёт блоками, поэтому записей обычно больше, чем точек
        let requested = self.sweep.points() as usize;
        let mut samples = decoded.samples;
        samples.truncate(requested);

        let measurement = assemble(&samples, self.sweep.start_hz(), self.sweep.stop_hz());

        let report = CaptureReport {
            measurement,
            sweep: self.sweep,
            requested_points: requested,
            capture,
            decode: decoded.stats,
        };

        if report.is_complete() {
            info!("Captured {} points", report.captured_points());
        } else {
            warn!(
                "Captured {} of {} points ({:.1}%)",
                report.captured_points(),
                report.requested_points,
                report.completeness_pct()
            );
        }

        Ok(report)
    }
}

impl CaptureReport {
    pub fn captured_points(&self) -> usize {
        self.measurement.len()
    }

    /// Сколько точек не хватило до запрошенного количества.
    pub fn shortfall(&self) -> usize {
        self.requested_points.saturating_sub(self.captured_points())
    }

    /// Полнота измерения (0.0-100.0).
    pub fn completeness_pct(&self) -> f64 {
        if self.requested_points == 0 {
            return 100.0;
        }
        self.captured_points() as f64 / self.requested_points as f64 * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.shortfall() == 0
    }

    /// Превращает недобор точек в ошибку для вызывающих, которым нужна
    /// только полная развёртка.
    pub fn ensure_complete(self) -> CaptureResult<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(CaptureError::IncompleteCapture {
                captured: self.captured_points(),
                requested: self.requested_points,
            })
        }
    }
}

/// Создаёт транспорт по конфигурации.
pub fn create_transport(config: &CaptureConfig) -> CaptureResult<Box<dyn Transport>> {
    match config.device {
        DeviceKind::Serial => {
            let t = SerialTransport::open(
                &config.port,
                config.baud_rate,
                config.link_settings().read_timeout,
            )?;
            Ok(Box::new(t))
        }
        DeviceKind::Simulated => Ok(Box::new(SimulatedVna::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ManualClock, SimBehavior};

    fn sim_config(points: u16) -> CaptureConfig {
        CaptureConfig {
            device: DeviceKind::Simulated,
            points,
            ..CaptureConfig::default()
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let cfg = CaptureConfig {
            points: 1,
            ..sim_config(1)
        };
        assert!(MeasurementSession::new(cfg).is_err());
    }

    #[test]
    fn test_report_ratios() {
        let (session, metrics) = MeasurementSession::new(sim_config(11)).unwrap();
        let report = session
            .run(Box::new(SimulatedVna::new()), Box::new(ManualClock::new()))
            .unwrap();

        assert_eq!(report.captured_points(), 11);
        assert_eq!(report.shortfall(), 0);
        assert!((report.completeness_pct() - 100.0).abs() < 1e-9);
        assert_eq!(report.decode.records_ok, 16);
        assert_eq!(metrics.records_decoded.load(Ordering::Relaxed), 16);
        assert!(report.ensure_complete().is_ok());
    }

    #[test]
    fn test_ensure_complete_reports_shortfall() {
        let behavior = SimBehavior {
            record_budget: Some(4),
            ..SimBehavior::default()
        };
        let (session, _) = MeasurementSession::new(sim_config(11)).unwrap();
        let report = session
            .run(
                Box::new(SimulatedVna::with_behavior(behavior)),
                Box::new(ManualClock::new()),
            )
            .unwrap();

        assert_eq!(report.shortfall(), 7);
        match report.ensure_complete() {
            Err(CaptureError::IncompleteCapture {
                captured,
                requested,
            }) => {
                assert_eq!(captured, 4);
                assert_eq!(requested, 11);
            }
            other => panic!("expected IncompleteCapture, got {other:?}"),
        }
    }

    #[test]
    fn test_create_transport_sim() {
        let t = create_transport(&sim_config(11)).unwrap();
        assert_eq!(t.port_name(), "sim://s-a-a-2");
    }
}
