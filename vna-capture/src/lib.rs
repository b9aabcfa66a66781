pub mod capture;
pub mod clock;
pub mod config;
pub mod error;
pub mod link;
pub mod metrics;
pub mod session;
pub mod sim;
pub mod sweep;
pub mod transport;

pub use capture::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use link::*;
pub use metrics::*;
pub use session::*;
pub use sim::*;
pub use sweep::*;
pub use transport::*;
