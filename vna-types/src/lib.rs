pub mod error;
pub mod record;
pub mod sample;
pub mod sweep;

pub use error::*;
pub use record::*;
pub use sample::*;
pub use sweep::*;
