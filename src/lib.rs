pub mod common;
pub mod runner;
