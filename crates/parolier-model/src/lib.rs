pub mod config;
pub mod enriched;
pub mod song;

pub use config::*;
pub use enriched::*;
pub use song::*;
