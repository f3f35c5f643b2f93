//! Networked runtime: many Intcode programs exchanging packets in parallel.
//!
//! - [`message`]: packet type and reserved addresses
//! - [`mailbox`]: lock-guarded per-node queues, rescue slot and idle detection
//! - [`interface`]: per-node sink/source attaching a program to the mailbox
//! - [`runtime`]: node threads, idle watchdog and run configuration

pub mod interface;
pub mod mailbox;
pub mod message;
pub mod runtime;
