// Monkey lifecycle simulation: naming, breeding, combat, and the lab that
// runs them against a store.

pub mod breeding;
pub mod combat;
pub mod config;
pub mod error;
pub mod lab;
pub mod monkey;
pub mod naming;
pub mod repository;
