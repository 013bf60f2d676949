pub mod config;
pub mod harness;
pub mod humanize;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod queue;
pub mod sink;
pub mod source;
pub mod storage;
pub mod worker;
