pub mod bridge;
pub mod error;
pub mod simulated;

pub use bridge::*;
pub use error::*;
pub use simulated::*;
