pub mod errors;
pub mod logging;

pub use errors::{ControllerError, ControllerResult};
pub use logging::{init_tracing, try_init_tracing};
