pub mod proxy;
pub mod stats;

pub use proxy::*;
pub use stats::*;
