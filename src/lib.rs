//! Intcode library.
//!
//! Provides the Intcode virtual machine, a cooperative round-robin scheduler
//! for chaining programs, and a threaded network runtime with an idle watchdog.

pub mod network;
pub mod utils;
pub mod virtual_machine;
