//! Branch protection audit for a GitHub organization.
//!
//! The normalization engine (`applicability`, `schema`, `matrix`) is pure; the
//! `github`, `audit`, `render` and `config` modules wire it to the API and to
//! files on disk.

pub mod applicability;
pub mod audit;
pub mod config;
pub mod github;
pub mod matrix;
pub mod model;
pub mod render;
pub mod schema;

#[cfg(test)]
mod proptest;

pub use applicability::applies;
pub use audit::{audit_repository, run_audit, AuditReport, AuditSettings, RepoAudit};
pub use github::{GitHubSource, PolicySource, RepoSummary};
pub use matrix::{build_classic_row, build_ruleset_rows, PolicyKind, PolicyRow, RowKey};
pub use model::{ClassicProtection, RepoName, Rule, RuleSet};
pub use schema::{Cell, CheckKey, Locale, CLASSIC_SCHEMA, RULESET_SCHEMA};
