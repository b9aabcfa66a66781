use std::{sync::atomic::Ordering, sync::Arc, time::Duration};

use log::{debug, info, warn};
use vna_core::{
    indicate_frame, read_fifo_frame, register_writes, write_frame, Command, INDICATE_REPLY,
};

use crate::{metrics::CaptureMetrics, CaptureError, CaptureResult, Clock, Transport};

/// Тайминги канала.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    /// Пауза между записью команды и чтением ответа
    pub command_settle: Duration,
    /// Пауза после открытия порта (прибор перезагружает USB-CDC)
    pub open_settle: Duration,
    /// Таймаут чтения последовательного порта
    pub read_timeout: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            command_settle: Duration::from_millis(100),
            open_settle: Duration::from_secs(2),
            read_timeout: Duration::from_secs(2),
        }
    }
}

/// Открытая сессия с прибором.
///
/// Владеет транспортом единолично. Закрывается явно через [`close`] или
/// автоматически в `Drop`, поэтому порт освобождается на любом пути выхода.
///
/// [`close`]: DeviceLink::close
pub struct DeviceLink {
    transport: Box<dyn Transport>,
    clock: Box<dyn Clock>,
    settings: LinkSettings,
    metrics: Arc<CaptureMetrics>,
    port: String,
    baud_rate: u32,
    open: bool,
}

impl DeviceLink {
    /// Оборачивает транспорт: ждёт `open_settle` и сбрасывает входной буфер.
    pub fn open(
        transport: Box<dyn Transport>,
        clock: Box<dyn Clock>,
        settings: LinkSettings,
        metrics: Arc<CaptureMetrics>,
    ) -> CaptureResult<Self> {
        let port = transport.port_name();
        let baud_rate = transport.baud_rate();

        let mut link = Self {
            transport,
            clock,
            settings,
            metrics,
            port,
            baud_rate,
            open: true,
        };

        link.clock.sleep(settings.open_settle);
        link.transport.clear_input()?;

        info!("Opened {} @ {} baud", link.port, link.baud_rate);
        Ok(link)
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn metrics(&self) -> &Arc<CaptureMetrics> {
        &self.metrics
    }

    /// Пишет байты, ждёт `command_settle` и возвращает всё, что пришло.
    pub fn send(
        &mut self,
        bytes: &[u8],
    ) -> CaptureResult<Vec<u8>> {
        if !self.open {
            return Err(CaptureError::LinkClosed);
        }

        self.transport.clear_input()?;
        self.transport.write_all(bytes)?;
        self.clock.sleep(self.settings.command_settle);
        let reply = self.transport.read_available()?;

        self.metrics.commands_sent.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .bytes_sent
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        self.metrics
            .bytes_received
            .fetch_add(reply.len() as u64, Ordering::Relaxed);

        debug!("tx {:02x?} -> rx {} bytes", bytes, reply.len());
        Ok(reply)
    }

    /// Пауза через часы канала.
    pub fn sleep(
        &mut self,
        d: Duration,
    ) {
        self.clock.sleep(d);
    }

    /// Закрывает канал. Повторные вызовы ничего не делают.
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        if let Err(e) = self.transport.close() {
            warn!("Failed to close {}: {e}", self.port);
        } else {
            info!("Closed {}", self.port);
        }
    }

    /// INDICATE: сырой ответ прибора.
    pub fn indicate(&mut self) -> CaptureResult<Vec<u8>> {
        self.send(&indicate_frame())
    }

    /// Проверяет, что на том конце S-A-A-2 (ответ `'2'`).
    pub fn identify(&mut self) -> CaptureResult<()> {
        let reply = self.indicate()?;

        if reply != INDICATE_REPLY {
            return Err(CaptureError::ProtocolMismatch { reply });
        }

        info!("S-A-A-2 protocol detected on {}", self.port);
        Ok(())
    }

    /// WRITE: один байт в регистр.
    pub fn write_register(
        &mut self,
        address: u8,
        value: u8,
    ) -> CaptureResult<()> {
        self.send(&write_frame(address, value)).map(|_| ())
    }

    /// Многобайтовое значение: побайтово, младший первым, адреса подряд.
    pub fn write_register_bytes(
        &mut self,
        base: u8,
        bytes: &[u8],
    ) -> CaptureResult<()> {
        for cmd in register_writes(base, bytes) {
            self.execute(cmd)?;
        }
        Ok(())
    }

    /// READFIFO: блок до `length` байт из FIFO по адресу `address`.
    pub fn read_fifo(
        &mut self,
        address: u8,
        length: u16,
    ) -> CaptureResult<Vec<u8>> {
        self.send(&read_fifo_frame(address, length))
    }

    /// Отправляет готовую команду.
    pub fn execute(
        &mut self,
        cmd: Command,
    ) -> CaptureResult<Vec<u8>> {
        self.send(&cmd.encode())
    }
}

impl Drop for DeviceLink {
    fn drop(&mut self) {
        self.close();
    }
}
