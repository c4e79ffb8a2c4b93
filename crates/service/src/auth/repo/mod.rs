//! Durable credential store backends.

pub mod file;

pub use file::JsonFileCredentialStore;
