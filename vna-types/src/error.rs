use thiserror::Error;

/// Результат для операций над данными VNA
pub type VnaResult<T> = std::result::Result<T, VnaError>;

/// Ошибки уровня данных: параметры развёртки и формат FIFO записей.
#[derive(Debug, Error)]
pub enum VnaError {
    /// Недопустимые параметры развёртки (отклоняются до отправки байт)
    #[error("Invalid sweep: {0}")]
    InvalidSweep(String),

    /// Запись FIFO не удалось разобрать
    #[error("Record decode error at byte {offset}: {reason}")]
    RecordDecode { offset: usize, reason: String },
}

impl VnaError {
    pub fn invalid_sweep<S: Into<String>>(s: S) -> Self {
        Self::InvalidSweep(s.into())
    }

    pub fn record_decode<S: Into<String>>(
        offset: usize,
        reason: S,
    ) -> Self {
        Self::RecordDecode {
            offset,
            reason: reason.into(),
        }
    }
}
