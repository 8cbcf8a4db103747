#[path = "../common/mod.rs"]
mod common;

mod faults;
mod properties;
mod scenarios;
