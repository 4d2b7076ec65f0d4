//! Cross-subsystem integration scenarios.

mod audit_trail;
mod concurrency;
mod review_round;
