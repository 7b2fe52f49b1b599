//! Normalizes classic protection and rulesets into rows of the audit schema.
//!
//! Pure: no I/O, no state across calls. Missing or malformed input degrades to
//! the column default (`n` for flags, `NA` for values), never to an error.

use crate::applicability::applies;
use crate::model::{ClassicProtection, RepoName, Rule, RuleSet, Toggle};
use crate::schema::{Cell, CheckKey, CLASSIC_SCHEMA, RULESET_SCHEMA};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PolicyKind {
    #[serde(rename = "classic")]
    Classic,
    #[serde(rename = "ruleset")]
    RuleSet,
    /// Placeholder for a repository without any ruleset.
    #[serde(rename = "no ruleset")]
    NoRuleSet,
}

impl PolicyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::Classic => "classic",
            PolicyKind::RuleSet => "ruleset",
            PolicyKind::NoRuleSet => "no ruleset",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one row: (repository, policy kind, ruleset name, branch).
#[derive(serde::Serialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey {
    pub repository: RepoName,
    pub kind: PolicyKind,
    pub ruleset: Option<String>,
    pub branch: String,
}

/// One normalized row. Holds exactly one cell per column of its schema, in
/// schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRow {
    key: RowKey,
    cells: Vec<(CheckKey, Cell)>,
}

impl PolicyRow {
    pub fn key(&self) -> &RowKey {
        &self.key
    }

    pub fn cells(&self) -> &[(CheckKey, Cell)] {
        &self.cells
    }

    pub fn get(&self, key: CheckKey) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|(column, _)| *column == key)
            .map(|(_, cell)| cell)
    }
}

struct CellsByLabel<'a>(&'a [(CheckKey, Cell)]);

impl Serialize for CellsByLabel<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, cell) in self.0 {
            map.serialize_entry(&key.to_string(), cell)?;
        }
        map.end()
    }
}

impl Serialize for PolicyRow {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_struct("PolicyRow", 2)?;
        row.serialize_field("key", &self.key)?;
        row.serialize_field("cells", &CellsByLabel(&self.cells))?;
        row.end()
    }
}

/// Accumulates cells for one row and checks them against the schema.
struct RowBuilder {
    schema: &'static [CheckKey],
    cells: BTreeMap<CheckKey, Cell>,
}

impl RowBuilder {
    fn new(schema: &'static [CheckKey]) -> Self {
        let cells = schema
            .iter()
            .map(|&key| {
                let cell = if key.is_value() {
                    Cell::NotApplicable
                } else {
                    Cell::No
                };
                (key, cell)
            })
            .collect();
        Self { schema, cells }
    }

    fn not_applicable(schema: &'static [CheckKey]) -> Self {
        let cells = schema
            .iter()
            .map(|&key| (key, Cell::NotApplicable))
            .collect();
        Self { schema, cells }
    }

    fn set(&mut self, key: CheckKey, cell: Cell) {
        assert!(
            self.schema.contains(&key),
            "column `{key}` is not part of this row's schema"
        );
        self.cells.insert(key, cell);
    }

    fn finish(mut self, key: RowKey) -> PolicyRow {
        let cells: Vec<_> = self
            .schema
            .iter()
            .filter_map(|column| self.cells.remove(column).map(|cell| (*column, cell)))
            .collect();
        assert!(
            cells.len() == self.schema.len() && self.cells.is_empty(),
            "row {key:?} does not match its schema"
        );
        PolicyRow { key, cells }
    }
}

/// Builds the classic protection row for `branch`.
///
/// A repository without protection still gets a row (all defaults).
pub fn build_classic_row(
    repo: &RepoName,
    branch: &str,
    protection: Option<&ClassicProtection>,
) -> PolicyRow {
    let mut row = RowBuilder::new(CLASSIC_SCHEMA);

    if let Some(protection) = protection {
        let reviews = protection.required_pull_request_reviews.as_ref();
        row.set(CheckKey::PrReviewRequired, Cell::flag(reviews.is_some()));
        row.set(
            CheckKey::RequiredReviewerCount,
            Cell::optional(reviews.and_then(|r| r.required_approving_review_count)),
        );

        let checks = protection.required_status_checks.as_ref();
        row.set(CheckKey::StatusChecksRequired, Cell::flag(checks.is_some()));
        row.set(
            CheckKey::RequiredStatusCheckNames,
            Cell::joined(checks.map(|c| c.names()).unwrap_or_default()),
        );

        row.set(
            CheckKey::LinearHistoryRequired,
            Cell::flag(Toggle::on(&protection.required_linear_history)),
        );
        row.set(
            CheckKey::SignedCommitsRequired,
            Cell::flag(Toggle::on(&protection.required_signatures)),
        );
        row.set(
            CheckKey::ForcePushAllowed,
            Cell::flag(Toggle::on(&protection.allow_force_pushes)),
        );
        row.set(
            CheckKey::DeletionAllowed,
            Cell::flag(Toggle::on(&protection.allow_deletions)),
        );
        row.set(
            CheckKey::AdminsIncluded,
            Cell::flag(Toggle::on(&protection.enforce_admins)),
        );
        row.set(
            CheckKey::RequiredDeploymentEnvironments,
            Cell::joined(
                protection
                    .required_deployments
                    .as_ref()
                    .map(|d| d.environments.as_slice())
                    .unwrap_or_default(),
            ),
        );
    }

    row.finish(RowKey {
        repository: repo.clone(),
        kind: PolicyKind::Classic,
        ruleset: None,
        branch: branch.to_string(),
    })
}

/// Builds one row per ruleset that applies to `branch`.
///
/// Rulesets that do not apply are dropped. A repository with no rulesets at
/// all yields a single all-`NA` placeholder row instead.
pub fn build_ruleset_rows(repo: &RepoName, branch: &str, rulesets: &[RuleSet]) -> Vec<PolicyRow> {
    if rulesets.is_empty() {
        let placeholder = RowBuilder::not_applicable(RULESET_SCHEMA).finish(RowKey {
            repository: repo.clone(),
            kind: PolicyKind::NoRuleSet,
            ruleset: None,
            branch: branch.to_string(),
        });
        return vec![placeholder];
    }

    rulesets
        .iter()
        .filter(|ruleset| applies(ruleset, branch))
        .map(|ruleset| build_ruleset_row(repo, branch, ruleset))
        .collect()
}

fn build_ruleset_row(repo: &RepoName, branch: &str, ruleset: &RuleSet) -> PolicyRow {
    let mut row = RowBuilder::new(RULESET_SCHEMA);

    // Rules fold in order; a later rule of the same type overwrites earlier values.
    for rule in &ruleset.rules {
        apply_rule(&mut row, rule);
    }

    row.set(
        CheckKey::BypassActors,
        Cell::joined(ruleset.bypass_actors.iter().filter_map(|actor| actor.label())),
    );

    row.finish(RowKey {
        repository: repo.clone(),
        kind: PolicyKind::RuleSet,
        ruleset: Some(ruleset.name.clone()),
        branch: branch.to_string(),
    })
}

fn apply_rule(row: &mut RowBuilder, rule: &Rule) {
    match rule {
        Rule::Creation => row.set(CheckKey::CreationRestricted, Cell::Yes),
        Rule::Update => row.set(CheckKey::UpdateRestricted, Cell::Yes),
        Rule::Deletion => row.set(CheckKey::DeletionRestricted, Cell::Yes),
        Rule::RequiredLinearHistory => row.set(CheckKey::LinearHistoryRequired, Cell::Yes),
        Rule::MergeQueue(params) => {
            row.set(CheckKey::MergeQueueRequired, Cell::Yes);
            row.set(
                CheckKey::MergeQueueMethod,
                Cell::optional(params.merge_method.as_deref()),
            );
            row.set(
                CheckKey::MergeQueueBuildConcurrency,
                Cell::optional(params.build_concurrency),
            );
            row.set(
                CheckKey::MergeQueueMinGroupSize,
                Cell::optional(params.min_group_size),
            );
            row.set(
                CheckKey::MergeQueueMaxGroupSize,
                Cell::optional(params.max_group_size),
            );
            row.set(
                CheckKey::MergeQueueMinGroupWaitMinutes,
                Cell::optional(params.wait_time_to_meet_min_group_size),
            );
            let all_pass = if params.configured {
                Cell::flag(params.all_entries_must_pass())
            } else {
                Cell::NotApplicable
            };
            row.set(CheckKey::MergeQueueAllEntriesMustPass, all_pass);
            row.set(
                CheckKey::MergeQueueStatusCheckTimeout,
                Cell::optional(params.status_check_timeout),
            );
        }
        Rule::RequiredDeployments => row.set(CheckKey::DeploymentsRequired, Cell::Yes),
        Rule::SignedCommits => row.set(CheckKey::SignedCommitsRequired, Cell::Yes),
        Rule::PullRequest(params) => {
            row.set(CheckKey::PullRequestRequired, Cell::Yes);
            row.set(
                CheckKey::RequiredReviewerCount,
                Cell::optional(params.required_approving_review_count),
            );
        }
        Rule::RequiredStatusChecks(params) => {
            row.set(CheckKey::StatusChecksRequired, Cell::Yes);
            row.set(
                CheckKey::RequiredStatusCheckNames,
                Cell::joined(params.required_status_checks.iter().map(|c| c.as_str())),
            );
        }
        Rule::BlockForcePushes => row.set(CheckKey::ForcePushBlocked, Cell::Yes),
        Rule::CodeScanningResults => row.set(CheckKey::CodeScanningResultsRequired, Cell::Yes),
        Rule::Unknown(_) => {}
    }
}
