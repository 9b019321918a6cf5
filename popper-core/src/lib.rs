pub mod popper;
pub mod snapshot;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
