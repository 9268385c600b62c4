//! protomods: generate a nested module tree and a tonic build script from
//! the proto packages a project discovers.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
