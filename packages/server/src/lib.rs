// CafeRoam - Ingestion Core
//
// This crate provides the durable job queue and the shop ingestion pipeline
// behind the cafe directory. Architecture follows domain-driven design:
// infrastructure in kernel/, stage handlers and models in domains/*.

pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
