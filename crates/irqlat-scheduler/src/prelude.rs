//! Prelude module for common scheduler types.

pub use crate::error::{RTResult, RTSetupError, RtTaskError};
pub use crate::rt_setup::RTSetup;
pub use crate::task::RtTask;
