// Прибор пишет записи в FIFO непрерывно и не сообщает о конце развёртки,
// поэтому полнота определяется только по числу байт. Количество попыток
// ограничено: захват всегда завершается, частичный буфер считается нормальным исходом.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use log::{debug, info, warn};
use vna_core::{DEFAULT_FIFO_BLOCK, REG_FIFO};
use vna_types::RECORD_SIZE;

use crate::{CaptureResult, DeviceLink};

/// Минимальная пауза после очистки FIFO.
pub const MIN_FIFO_SETTLE: Duration = Duration::from_millis(500);

/// Политика опроса FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturePolicy {
    /// Пауза после очистки FIFO, пока прибор набирает записи
    pub fifo_settle: Duration,
    /// Пауза между неудачными попытками
    pub retry_backoff: Duration,
    /// Максимум чтений FIFO
    pub max_attempts: u32,
    /// Байт в одном READFIFO
    pub block_size: u16,
}

impl Default for CapturePolicy {
    fn default() -> Self {
        Self {
            fifo_settle: Duration::from_secs(2),
            retry_backoff: Duration::from_millis(500),
            max_attempts: 5,
            block_size: DEFAULT_FIFO_BLOCK,
        }
    }
}

/// Итог захвата.
#[derive(Debug, Clone, Default)]
pub struct CaptureOutcome {
    /// Накопленные сырые байты FIFO
    pub data: Vec<u8>,
    /// Выполнено чтений FIFO
    pub attempts: u32,
    /// Из них вернули 0 байт
    pub empty_reads: u32,
    /// Сколько байт нужно для полной развёртки
    pub target_bytes: usize,
    /// Захват прерван флагом остановки
    pub stopped: bool,
}

impl CaptureOutcome {
    pub fn reached_target(&self) -> bool {
        self.data.len() >= self.target_bytes
    }

    /// Полных 32-байтовых записей в буфере.
    pub fn complete_records(&self) -> usize {
        self.data.len() / RECORD_SIZE
    }
}

/// Движок захвата: очистка FIFO и ограниченный опрос.
pub struct CaptureEngine {
    policy: CapturePolicy,
    stop_flag: Option<Arc<AtomicBool>>,
}

impl CaptureEngine {
    /// `fifo_settle` короче [`MIN_FIFO_SETTLE`] поднимается до минимума,
    /// `max_attempts` не меньше 1.
    pub fn new(mut policy: CapturePolicy) -> Self {
        if policy.fifo_settle < MIN_FIFO_SETTLE {
            warn!(
                "FIFO settle {:?} raised to {MIN_FIFO_SETTLE:?}",
                policy.fifo_settle
            );
            policy.fifo_settle = MIN_FIFO_SETTLE;
        }
        policy.max_attempts = policy.max_attempts.max(1);

        Self {
            policy,
            stop_flag: None,
        }
    }

    /// Флаг проверяется между попытками (не посреди команды).
    pub fn with_stop_flag(
        mut self,
        flag: Arc<AtomicBool>,
    ) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    pub fn policy(&self) -> &CapturePolicy {
        &self.policy
    }

    fn stop_requested(&self) -> bool {
        self.stop_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed))
    }

    /// Собирает до `expected_points × 32` байт из FIFO.
    pub fn capture(
        &self,
        link: &mut DeviceLink,
        expected_points: u16,
    ) -> CaptureResult<CaptureOutcome> {
        let policy = &self.policy;
        let mut out = CaptureOutcome {
            data: Vec::with_capacity(expected_points as usize * RECORD_SIZE),
            target_bytes: expected_points as usize * RECORD_SIZE,
            ..CaptureOutcome::default()
        };

        info!("Clearing FIFO, waiting {:?} for samples", policy.fifo_settle);
        link.write_register(REG_FIFO, 0x00)?;
        link.sleep(policy.fifo_settle);

        while out.attempts < policy.max_attempts {
            if self.stop_requested() {
                warn!("Stop requested, ending capture after {} reads", out.attempts);
                out.stopped = true;
                break;
            }

            out.attempts += 1;
            let block = link.read_fifo(REG_FIFO, policy.block_size)?;
            link.metrics().fifo_reads.fetch_add(1, Ordering::Relaxed);

            if block.is_empty() {
                out.empty_reads += 1;
                link.metrics().empty_reads.fetch_add(1, Ordering::Relaxed);
                debug!("attempt {}: no new data", out.attempts);
            } else {
                out.data.extend_from_slice(&block);
                debug!(
                    "attempt {}: +{} bytes (total {})",
                    out.attempts,
                    block.len(),
                    out.data.len()
                );
            }

            if out.reached_target() {
                break;
            }

            if out.attempts < policy.max_attempts {
                link.sleep(policy.retry_backoff);
            }
        }

        if !out.reached_target() {
            warn!(
                "FIFO under-delivered: {} of {} bytes after {} reads",
                out.data.len(),
                out.target_bytes,
                out.attempts
            );
        }

        Ok(out)
    }
}
