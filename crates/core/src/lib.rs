#![deny(warnings)]

pub mod config;
pub mod coordinator;
pub mod history;
pub mod model;
pub mod store;
pub mod translate;
