//! Outbound email jobs: the weekly newsletter and the operator digest.

pub mod admin_digest;
pub mod weekly_email;
