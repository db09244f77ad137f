pub mod config;
pub mod report;
pub mod session;
pub mod storage;
pub mod sync;
