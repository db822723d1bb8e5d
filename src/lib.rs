// ABOUTME: Library root for djangostack - provisions Django servers over SSH.
// ABOUTME: The main binary is in main.rs.

pub mod build;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod hooks;
pub mod output;
pub mod remote;
pub mod ssh;
pub mod types;
