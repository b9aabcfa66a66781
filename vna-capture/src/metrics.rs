use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

/// Счётчики сессии. Пишет канал и движок захвата, читает CLI после
/// завершения.
#[derive(Debug, Default)]
pub struct CaptureMetrics {
    pub commands_sent: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub bytes_received: AtomicU64,
    pub fifo_reads: AtomicU64,
    pub empty_reads: AtomicU64,
    pub records_decoded: AtomicU64,
    pub records_skipped: AtomicU64,
}

/// Snapshot метрик для отображения / тестирования.
#[derive(Debug, Clone)]
pub struct CaptureSummary {
    pub duration_secs: f64,
    pub commands_sent: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub fifo_reads: u64,
    pub empty_reads: u64,
    pub records_decoded: u64,
    pub records_skipped: u64,
    pub empty_read_pct: f64,
}

impl CaptureMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Доля пустых чтений FIFO (0.0-100.0).
    pub fn empty_read_pct(&self) -> f64 {
        let reads = self.fifo_reads.load(Ordering::Relaxed);
        let empty = self.empty_reads.load(Ordering::Relaxed);

        if reads == 0 {
            0.0
        } else {
            empty as f64 / reads as f64 * 100.0
        }
    }

    pub fn summary(
        &self,
        elapsed: &Instant,
    ) -> CaptureSummary {
        CaptureSummary {
            duration_secs: elapsed.elapsed().as_secs_f64(),
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            fifo_reads: self.fifo_reads.load(Ordering::Relaxed),
            empty_reads: self.empty_reads.load(Ordering::Relaxed),
            records_decoded: self.records_decoded.load(Ordering::Relaxed),
            records_skipped: self.records_skipped.load(Ordering::Relaxed),
            empty_read_pct: self.empty_read_pct(),
        }
    }
}

impl std::fmt::Display for CaptureSummary {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(f, "  Duration      : {:.1}s", self.duration_secs)?;
        writeln!(f, "  Commands      : {}", self.commands_sent)?;
        writeln!(
            f,
            "  Bytes tx / rx : {} / {}",
            self.bytes_sent, self.bytes_received
        )?;
        writeln!(
            f,
            "  FIFO reads    : {} ({} empty, {:.1}%)",
            self.fifo_reads, self.empty_reads, self.empty_read_pct
        )?;
        writeln!(f, "  Records       : {}", self.records_decoded)?;
        writeln!(f, "  Skipped       : {}", self.records_skipped)?;
        write!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")
    }
}
