//! File format implementations

pub mod cnvrs;
