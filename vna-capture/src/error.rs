use thiserror::Error;
use vna_types::VnaError;

pub type CaptureResult<T> = std::result::Result<T, CaptureError>;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// Не удалось открыть последовательный порт
    #[error("Cannot open device '{port}': {reason}")]
    Connection { port: String, reason: String },

    /// Ответ на INDICATE не совпал с '2', протокол не S-A-A-2
    #[error("Protocol mismatch: INDICATE replied {reply:02x?}, expected [32] ('2')")]
    ProtocolMismatch { reply: Vec<u8> },

    /// Получено меньше точек, чем запрошено (не фатально для сессии)
    #[error("Incomplete capture: {captured} of {requested} points")]
    IncompleteCapture { captured: usize, requested: usize },

    /// Обращение к уже закрытому соединению
    #[error("Device link is closed")]
    LinkClosed,

    /// Некорректная конфигурация
    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка уровня данных (параметры развёртки, формат записи)
    #[error("VNA data error: {0}")]
    Vna(#[from] VnaError),
}
