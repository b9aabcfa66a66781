use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

/// Источник задержек для всех пауз протокола.
///
/// Все ожидания (settle после команды, после программирования развёртки,
/// backoff между чтениями FIFO) идут через этот трейт, чтобы тесты
/// выполнялись без реального сна.
pub trait Clock: Send {
    fn sleep(
        &mut self,
        d: Duration,
    );
}

/// Реальное время: `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(
        &mut self,
        d: Duration,
    ) {
        if !d.is_zero() {
            thread::sleep(d);
        }
    }
}

/// Виртуальные часы: не спят, только суммируют запрошенное время.
///
/// Клоны разделяют счётчик, так что тест может отдать один экземпляр в
/// [`crate::DeviceLink`] и читать накопленное время через другой.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    slept_ns: Arc<AtomicU64>,
    sleeps: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Суммарное «проспанное» время.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.slept_ns.load(Ordering::Relaxed))
    }

    /// Кол-во вызовов `sleep`.
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::Relaxed)
    }
}

impl Clock for ManualClock {
    fn sleep(
        &mut self,
        d: Duration,
    ) {
        self.slept_ns
            .fetch_add(d.as_nanos() as u64, Ordering::Relaxed);
        self.sleeps.fetch_add(1, Ordering::Relaxed);
    }
}
