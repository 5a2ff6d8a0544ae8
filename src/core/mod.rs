pub mod bias;
pub mod config;
pub mod db;
pub mod determinism;
pub mod error;
pub mod generation;
pub mod hash;
pub mod ledger;
pub mod orchestrator;
pub mod protocol;
pub mod risk;
pub mod scenario;
pub mod schemas;
pub mod store;
pub mod time;
