mod market;
mod signal;

pub use market::*;
pub use signal::*;
