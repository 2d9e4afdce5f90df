pub mod common;
pub mod config;
pub mod device;
pub mod enqueue;
pub mod list;
pub mod manage;
pub mod sync;
