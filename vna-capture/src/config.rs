use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use vna_core::DEFAULT_FIFO_BLOCK;
use vna_types::{SweepConfig, RECORD_SIZE};

use crate::{
    CaptureError, CapturePolicy, CaptureResult, LinkSettings, MIN_FIFO_SETTLE, MIN_SWEEP_SETTLE,
};

/// Откуда берутся байты (выбор при старте).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Реальный прибор на последовательном порту.
    Serial,
    /// Встроенный имитатор (не требует железа).
    #[serde(alias = "sim")]
    Simulated,
}

/// Полная конфигурация сессии измерения.
///
/// Все поля имеют значения по умолчанию, поэтому JSON-файл может задавать
/// только то, что отличается.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Тип устройства
    pub device: DeviceKind,
    /// Имя последовательного порта
    pub port: String,
    /// Скорость порта (бод)
    pub baud_rate: u32,
    /// Начало развёртки (Гц)
    pub start_hz: u64,
    /// Конец развёртки (Гц)
    pub stop_hz: u64,
    /// Кол-во точек
    pub points: u16,
    /// Пауза между командой и чтением ответа (мс)
    pub command_settle_ms: u64,
    /// Пауза после открытия порта (мс)
    pub open_settle_ms: u64,
    /// Пауза после программирования развёртки (мс)
    pub sweep_settle_ms: u64,
    /// Пауза после очистки FIFO (мс)
    pub fifo_settle_ms: u64,
    /// Пауза между чтениями FIFO (мс)
    pub retry_backoff_ms: u64,
    /// Максимум чтений FIFO
    pub max_attempts: u32,
    /// Байт в одном READFIFO
    pub fifo_block_bytes: u16,
    /// Таймаут чтения порта (мс)
    pub read_timeout_ms: u64,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl CaptureConfig {
    /// Загружает конфигурацию из JSON. Отсутствующие поля берутся по умолчанию.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> CaptureResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;

        serde_json::from_str(&text)
            .map_err(|e| CaptureError::Config(format!("{}: {e}", path.display())))
    }

    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings {
            command_settle: Duration::from_millis(self.command_settle_ms),
            open_settle: Duration::from_millis(self.open_settle_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }

    pub fn capture_policy(&self) -> CapturePolicy {
        CapturePolicy {
            fifo_settle: Duration::from_millis(self.fifo_settle_ms),
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            max_attempts: self.max_attempts,
            block_size: self.fifo_block_bytes,
        }
    }

    pub fn sweep_settle(&self) -> Duration {
        Duration::from_millis(self.sweep_settle_ms)
    }

    /// Строит и проверяет параметры развёртки.
    pub fn sweep(&self) -> CaptureResult<SweepConfig> {
        Ok(SweepConfig::new(self.start_hz, self.stop_hz, self.points)?)
    }

    /// Проверяет конфигурацию целиком, включая развёртку.
    pub fn validate(&self) -> CaptureResult<()> {
        if self.max_attempts == 0 {
            return Err(CaptureError::Config(
                "max_attempts must be at least 1".into(),
            ));
        }

        if (self.fifo_block_bytes as usize) < RECORD_SIZE {
            return Err(CaptureError::Config(format!(
                "fifo_block_bytes {} is smaller than one {RECORD_SIZE}-byte record",
                self.fifo_block_bytes
            )));
        }

        if self.sweep_settle() < MIN_SWEEP_SETTLE {
            return Err(CaptureError::Config(format!(
                "sweep_settle_ms {} below minimum {}",
                self.sweep_settle_ms,
                MIN_SWEEP_SETTLE.as_millis()
            )));
        }

        if self.fifo_settle_ms < MIN_FIFO_SETTLE.as_millis() as u64 {
            return Err(CaptureError::Config(format!(
                "fifo_settle_ms {} below minimum {}",
                self.fifo_settle_ms,
                MIN_FIFO_SETTLE.as_millis()
            )));
        }

        if self.device == DeviceKind::Serial && self.port.trim().is_empty() {
            return Err(CaptureError::Config("serial port name is empty".into()));
        }

        self.sweep()?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для DeviceKind, CaptureConfig
////////////////////////////////////////////////////////////////////////////////

impl std::fmt::Display for DeviceKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            DeviceKind::Serial => write!(f, "serial"),
            DeviceKind::Simulated => write!(f, "sim"),
        }
    }
}

impl std::str::FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serial" | "tty" | "usb" => Ok(DeviceKind::Serial),
            "sim" | "simulated" => Ok(DeviceKind::Simulated),
            _ => Err(format!("Unknown device type: '{s}'. Use: serial, sim")),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: DeviceKind::Serial,
            port: default_port().to_string(),
            baud_rate: 9_600,
            start_hz: 1_000_000,
            stop_hz: 100_000_000,
            points: 101,
            command_settle_ms: 100,
            open_settle_ms: 2_000,
            sweep_settle_ms: 1_000,
            fifo_settle_ms: 2_000,
            retry_backoff_ms: 500,
            max_attempts: 5,
            fifo_block_bytes: DEFAULT_FIFO_BLOCK,
            read_timeout_ms: 2_000,
        }
    }
}

fn default_port() -> &'static str {
    if cfg!(windows) {
        "COM3"
    } else {
        "/dev/ttyACM0"
    }
}

/// Парсит строку частоты в герцы.
///
/// Поддерживает суффиксы: `GHz`, `MHz`, `kHz`, `Hz` и короткие `G`, `k`
/// (регистронезависимо). Короткого `M` нет: его легко спутать с милли.
///
/// # Примеры
/// ```
/// use vna_capture::config::parse_freq_hz;
/// assert_eq!(parse_freq_hz("100MHz").unwrap(), 100_000_000);
/// assert_eq!(parse_freq_hz("1.5G").unwrap(), 1_500_000_000);
/// assert_eq!(parse_freq_hz("1000000").unwrap(), 1_000_000);
/// ```
pub fn parse_freq_hz(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let lower = s.to_lowercase();

    let (num_str, mult) = if let Some(v) = lower.strip_suffix("ghz") {
        (v.trim(), 1_000_000_000_f64)
    } else if let Some(v) = lower.strip_suffix("mhz") {
        (v.trim(), 1_000_000_f64)
    } else if let Some(v) = lower.strip_suffix("khz") {
        (v.trim(), 1_000_f64)
    } else if let Some(v) = lower.strip_suffix("hz") {
        (v.trim(), 1_f64)
    } else if let Some(v) = lower.strip_suffix('g') {
        (v.trim(), 1_000_000_000_f64)
    } else if let Some(v) = lower.strip_suffix('k') {
        (v.trim(), 1_000_f64)
    } else {
        // Без суффикса: число в герцах
        return s
            .parse::<u64>()
            .map_err(|e| format!("Invalid frequency '{s}': {e}"));
    };

    let n: f64 = num_str
        .parse()
        .map_err(|e| format!("Invalid frequency value '{num_str}': {e}"))?;

    if !n.is_finite() || n < 0.0 {
        return Err(format!("Frequency must be non-negative: '{s}'"));
    }

    let hz = (n * mult).round();
    // u64::MAX as f64 == 2^64, сам он уже не помещается
    if hz >= u64::MAX as f64 {
        return Err(format!("Frequency out of range: '{s}'"));
    }

    Ok(hz as u64)
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
