pub mod engine;
pub mod paths;
pub mod payoffs;
pub mod regression;
