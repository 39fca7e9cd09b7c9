//! aptly-core: Assessment lifecycle engine.
//!
//! This crate defines the data model, collaborator traits, schedule and
//! session state machines, and the scoring pipeline that the rest of aptly
//! builds on.

pub mod analysis;
pub mod countdown;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod identity;
pub mod ledger;
pub mod model;
pub mod parser;
pub mod question_bank;
pub mod recommend;
pub mod report;
pub mod schedule;
pub mod session;
pub mod store;
pub mod traits;
