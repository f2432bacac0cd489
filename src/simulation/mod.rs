//! Loopback network for running the core without a radio.
//!
//! Provides an in-process stack and simulated peers for development and
//! end-to-end tests.

mod loopback;
mod remote;

pub use loopback::{LoopbackStack, StackEvent, run_stack_task};
pub use remote::RemoteDevice;
