pub mod config;
pub mod content;
pub mod errors;
pub mod models;
pub mod rng;
pub mod store;
pub mod synth;
pub mod temporal;
pub mod ui;
pub mod validate;
