pub mod invocation;
pub mod log_redact;
pub mod logging;
pub mod response_validator;

pub use invocation::{CommandSurface, ExpectedShape, InvocationArgs, SecureInvocationBridge, SurfaceError};
