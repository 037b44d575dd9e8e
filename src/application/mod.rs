//! Application layer containing the core business logic orchestration.
//!
//! This module defines the `ContributionLedger`, the entry point for registering
//! dues and settling member payments against them.

pub mod ledger;
