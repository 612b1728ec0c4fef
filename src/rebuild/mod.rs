//! Webhook-driven site rebuild
//!
//! Signature verification, subprocess capture and the pull/build pipeline.

pub mod command;
pub mod signature;
pub mod trigger;

pub use signature::{SignatureVerifier, SIGNATURE_HEADER};
pub use trigger::{RebuildTrigger, Step, TriggerOutcome};
