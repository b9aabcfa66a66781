use std::{
    io::{self, Read, Write},
    time::Duration,
};

use serialport::{ClearBuffer, SerialPort};

use crate::{CaptureError, CaptureResult};

/// Канал байтов до устройства.
///
/// Реализации: [`SerialTransport`] (настоящий порт) и
/// [`crate::SimulatedVna`] (протокол в памяти, для тестов и `--device sim`).
/// Повторов на этом уровне нет.
pub trait Transport: Send {
    /// Имя порта (для логов и отчёта).
    fn port_name(&self) -> String;

    fn baud_rate(&self) -> u32;

    /// Отправляет байты целиком.
    fn write_all(
        &mut self,
        bytes: &[u8],
    ) -> io::Result<()>;

    /// Возвращает всё, что уже лежит во входном буфере (может быть пусто).
    fn read_available(&mut self) -> io::Result<Vec<u8>>;

    /// Сбрасывает входной буфер.
    fn clear_input(&mut self) -> io::Result<()>;

    /// Освобождает дескриптор. Повторный вызов ничего не делает.
    fn close(&mut self) -> io::Result<()>;
}

/// Последовательный порт через `serialport`.
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    name: String,
    baud_rate: u32,
}

impl SerialTransport {
    /// Открывает порт 8N1 с указанным таймаутом чтения.
    pub fn open(
        name: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> CaptureResult<Self> {
        let port = serialport::new(name, baud_rate)
            .timeout(timeout)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .open()
            .map_err(|e| CaptureError::Connection {
                port: name.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            port: Some(port),
            name: name.to_string(),
            baud_rate,
        })
    }

    fn port_mut(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port closed"))
    }
}

impl Transport for SerialTransport {
    fn port_name(&self) -> String {
        self.name.clone()
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn write_all(
        &mut self,
        bytes: &[u8],
    ) -> io::Result<()> {
        let port = self.port_mut()?;
        port.write_all(bytes)?;
        port.flush()
    }

    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        let port = self.port_mut()?;
        let n = port.bytes_to_read().map_err(io::Error::from)? as usize;

        if n == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; n];
        let got = port.read(&mut buf)?;
        buf.truncate(got);
        Ok(buf)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.port_mut()?
            .clear(ClearBuffer::Input)
            .map_err(io::Error::from)
    }

    fn close(&mut self) -> io::Result<()> {
        // Drop закрывает дескриптор
        self.port.take();
        Ok(())
    }
}
