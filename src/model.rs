//! Typed view of the policy payloads returned by the hosting API.
//!
//! Every field is optional upstream and the schema keeps growing, so parsing is
//! lenient: a sub-field that is missing, `null` or of an unexpected shape reads
//! as "not configured" instead of failing the whole record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

/// Deserializes `T`, degrading to `None` when the value does not fit.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

/// Deserializes a list element by element, dropping entries that do not fit.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = value else {
        return Ok(vec![]);
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct RepoName(String);

impl RepoName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RepoName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for RepoName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Legacy branch protection for one branch.
#[derive(serde::Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ClassicProtection {
    #[serde(default, deserialize_with = "lenient")]
    pub required_pull_request_reviews: Option<PullRequestReviews>,
    #[serde(default, deserialize_with = "lenient")]
    pub required_status_checks: Option<StatusChecks>,
    #[serde(default, deserialize_with = "lenient")]
    pub required_linear_history: Option<Toggle>,
    #[serde(default, deserialize_with = "lenient")]
    pub required_signatures: Option<Toggle>,
    #[serde(default, deserialize_with = "lenient")]
    pub allow_force_pushes: Option<Toggle>,
    #[serde(default, deserialize_with = "lenient")]
    pub allow_deletions: Option<Toggle>,
    #[serde(default, deserialize_with = "lenient")]
    pub enforce_admins: Option<Toggle>,
    #[serde(default, deserialize_with = "lenient")]
    pub required_deployments: Option<Deployments>,
}

#[derive(serde::Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PullRequestReviews {
    #[serde(default, deserialize_with = "lenient")]
    pub required_approving_review_count: Option<u64>,
}

#[derive(serde::Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StatusChecks {
    #[serde(default, deserialize_with = "lenient_list")]
    pub checks: Vec<CheckName>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub contexts: Vec<String>,
}

impl StatusChecks {
    /// Check names, preferring `checks` over the older `contexts` list.
    pub fn names(&self) -> Vec<&str> {
        if self.checks.is_empty() {
            self.contexts.iter().map(String::as_str).collect()
        } else {
            self.checks.iter().map(CheckName::as_str).collect()
        }
    }
}

/// A required status check, given either as a bare name or as `{"context": ...}`.
#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum CheckName {
    Name(String),
    Context { context: String },
}

impl CheckName {
    pub fn as_str(&self) -> &str {
        match self {
            CheckName::Name(name) => name,
            CheckName::Context { context } => context,
        }
    }
}

/// `{"enabled": bool}` sub-object.
#[derive(serde::Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Toggle {
    #[serde(default, deserialize_with = "lenient")]
    pub enabled: Option<bool>,
}

impl Toggle {
    pub fn on(toggle: &Option<Toggle>) -> bool {
        toggle
            .as_ref()
            .and_then(|toggle| toggle.enabled)
            .unwrap_or(false)
    }
}

#[derive(serde::Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Deployments {
    #[serde(default, deserialize_with = "lenient_list")]
    pub environments: Vec<String>,
}

#[derive(serde::Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    #[default]
    Active,
    Disabled,
    Evaluate,
}

impl From<&str> for Enforcement {
    fn from(value: &str) -> Self {
        match value {
            "disabled" => Enforcement::Disabled,
            "evaluate" => Enforcement::Evaluate,
            _ => Enforcement::Active,
        }
    }
}

pub const DEFAULT_RULESET_NAME: &str = "ruleset";

const ALL_BRANCHES_CONDITION: &str = "~ALL";
const DEFAULT_BRANCH_CONDITION: &str = "~DEFAULT_BRANCH";
const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// What kind of ref a ruleset targets. Only branch rulesets govern a branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuleTarget {
    #[default]
    Branch,
    Tag,
    Push,
    Other,
}

impl From<&str> for RuleTarget {
    fn from(value: &str) -> Self {
        match value {
            "branch" => RuleTarget::Branch,
            "tag" => RuleTarget::Tag,
            "push" => RuleTarget::Push,
            _ => RuleTarget::Other,
        }
    }
}

/// A named, composable collection of rules.
#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "RawRuleSet")]
pub struct RuleSet {
    pub id: Option<u64>,
    pub name: String,
    pub enforcement: Enforcement,
    pub target: RuleTarget,
    /// Empty means every branch.
    pub target_branches: Vec<String>,
    /// Branches vetoed even when a target matches.
    pub exclude_branches: Vec<String>,
    pub rules: Vec<Rule>,
    pub bypass_actors: Vec<BypassActor>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            id: None,
            name: DEFAULT_RULESET_NAME.to_string(),
            enforcement: Enforcement::Active,
            target: RuleTarget::Branch,
            target_branches: vec![],
            exclude_branches: vec![],
            rules: vec![],
            bypass_actors: vec![],
        }
    }
}

impl RuleSet {
    /// Replaces `~DEFAULT_BRANCH` conditions with the repository's default branch.
    pub fn resolve_default_branch(&mut self, default_branch: &str) {
        for name in self
            .target_branches
            .iter_mut()
            .chain(self.exclude_branches.iter_mut())
        {
            if name.as_str() == DEFAULT_BRANCH_CONDITION {
                *name = default_branch.to_string();
            }
        }
    }
}

#[derive(serde::Deserialize)]
struct RawRuleSet {
    #[serde(default, deserialize_with = "lenient")]
    id: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    enforcement: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    target: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    target_branches: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    conditions: Option<Conditions>,
    #[serde(default, deserialize_with = "lenient_list")]
    rules: Vec<Rule>,
    #[serde(default, deserialize_with = "lenient_list")]
    bypass_actors: Vec<BypassActor>,
}

#[derive(serde::Deserialize)]
struct Conditions {
    #[serde(default, deserialize_with = "lenient")]
    ref_name: Option<RefNameCondition>,
}

#[derive(serde::Deserialize, Default)]
struct RefNameCondition {
    #[serde(default, deserialize_with = "lenient_list")]
    include: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    exclude: Vec<String>,
}

impl From<RawRuleSet> for RuleSet {
    fn from(raw: RawRuleSet) -> Self {
        let name = raw
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_RULESET_NAME.to_string());
        let ref_name = raw
            .conditions
            .and_then(|conditions| conditions.ref_name)
            .unwrap_or_default();
        let target_branches = match raw.target_branches {
            Some(targets) => targets,
            None => ref_name.include.iter().map(|t| ref_target(t)).collect(),
        };

        RuleSet {
            id: raw.id,
            name,
            enforcement: raw
                .enforcement
                .as_deref()
                .map(Enforcement::from)
                .unwrap_or_default(),
            target: raw
                .target
                .as_deref()
                .map(RuleTarget::from)
                .unwrap_or_default(),
            target_branches,
            exclude_branches: ref_name.exclude.iter().map(|t| ref_target(t)).collect(),
            rules: raw.rules,
            bypass_actors: raw.bypass_actors,
        }
    }
}

fn ref_target(include: &str) -> String {
    if include == ALL_BRANCHES_CONDITION {
        return "all".to_string();
    }
    include
        .strip_prefix(BRANCH_REF_PREFIX)
        .unwrap_or(include)
        .to_string()
}

/// An identity allowed to bypass a ruleset.
#[derive(serde::Deserialize, Debug, Clone, Default, PartialEq)]
pub struct BypassActor {
    #[serde(default, deserialize_with = "lenient")]
    pub actor_id: Option<ActorId>,
    #[serde(default, deserialize_with = "lenient")]
    pub actor_type: Option<String>,
}

impl BypassActor {
    /// The id, or the actor type for actors that have none (organization admins).
    pub fn label(&self) -> Option<String> {
        match (&self.actor_id, &self.actor_type) {
            (Some(id), _) => Some(id.to_string()),
            (None, Some(actor_type)) if !actor_type.is_empty() => Some(actor_type.clone()),
            _ => None,
        }
        .filter(|label| !label.is_empty())
    }
}

#[derive(serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ActorId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorId::Number(id) => write!(f, "{id}"),
            ActorId::Text(id) => f.write_str(id),
        }
    }
}

/// One typed constraint within a ruleset.
///
/// Tags the audit has no column for land in [`Rule::Unknown`].
#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "RawRule")]
pub enum Rule {
    Creation,
    Update,
    Deletion,
    RequiredLinearHistory,
    MergeQueue(MergeQueueParams),
    RequiredDeployments,
    SignedCommits,
    PullRequest(PullRequestParams),
    RequiredStatusChecks(StatusCheckParams),
    BlockForcePushes,
    CodeScanningResults,
    Unknown(String),
}

#[derive(serde::Deserialize)]
struct RawRule {
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    kind: Option<String>,
    #[serde(default)]
    parameters: Option<Value>,
    #[serde(default)]
    configuration: Option<Value>,
}

impl From<RawRule> for Rule {
    fn from(raw: RawRule) -> Self {
        let config = raw.parameters.or(raw.configuration).unwrap_or(Value::Null);
        Rule::parse(raw.kind.as_deref().unwrap_or_default(), config)
    }
}

fn params<T: DeserializeOwned + Default>(config: &Value) -> T {
    serde_json::from_value(config.clone()).unwrap_or_default()
}

impl Rule {
    pub fn parse(kind: &str, config: Value) -> Rule {
        match kind {
            "creation" => Rule::Creation,
            "update" => Rule::Update,
            "deletion" => Rule::Deletion,
            "required_linear_history" => Rule::RequiredLinearHistory,
            "merge_queue" => {
                let configured = config.as_object().is_some_and(|map| !map.is_empty());
                Rule::MergeQueue(MergeQueueParams {
                    configured,
                    ..params::<MergeQueueParams>(&config)
                })
            }
            "required_deployments" => Rule::RequiredDeployments,
            "signed_commits" | "required_signatures" => Rule::SignedCommits,
            "pull_request" => Rule::PullRequest(params(&config)),
            "required_status_checks" => Rule::RequiredStatusChecks(params(&config)),
            "block_force_pushes" | "non_fast_forward" => Rule::BlockForcePushes,
            "code_scanning_results" | "code_scanning" => Rule::CodeScanningResults,
            other => Rule::Unknown(other.to_string()),
        }
    }
}

#[derive(serde::Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PullRequestParams {
    #[serde(default, deserialize_with = "lenient")]
    pub required_approving_review_count: Option<u64>,
}

#[derive(serde::Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StatusCheckParams {
    #[serde(default, deserialize_with = "lenient_list")]
    pub required_status_checks: Vec<CheckName>,
}

/// Merge queue settings. Both the historical parameter names and the current
/// API names are read; when a payload carries both, the historical one wins.
#[derive(serde::Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(from = "RawMergeQueue")]
pub struct MergeQueueParams {
    /// Whether the rule carried any configuration at all.
    pub configured: bool,
    pub merge_method: Option<String>,
    pub build_concurrency: Option<u64>,
    pub min_group_size: Option<u64>,
    pub max_group_size: Option<u64>,
    pub wait_time_to_meet_min_group_size: Option<u64>,
    pub require_all_group_entries_to_pass: Option<bool>,
    pub grouping_strategy: Option<String>,
    pub status_check_timeout: Option<u64>,
}

#[derive(serde::Deserialize)]
struct RawMergeQueue {
    #[serde(default, deserialize_with = "lenient")]
    merge_method: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    build_concurrency: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    max_entries_to_build: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    min_group_size: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    min_entries_to_merge: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    max_group_size: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    max_entries_to_merge: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    wait_time_to_meet_min_group_size: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    min_entries_to_merge_wait_minutes: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    require_all_group_entries_to_pass: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    grouping_strategy: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    status_check_timeout: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    check_response_timeout_minutes: Option<u64>,
}

impl From<RawMergeQueue> for MergeQueueParams {
    fn from(raw: RawMergeQueue) -> Self {
        MergeQueueParams {
            configured: false,
            merge_method: raw.merge_method,
            build_concurrency: raw.build_concurrency.or(raw.max_entries_to_build),
            min_group_size: raw.min_group_size.or(raw.min_entries_to_merge),
            max_group_size: raw.max_group_size.or(raw.max_entries_to_merge),
            wait_time_to_meet_min_group_size: raw
                .wait_time_to_meet_min_group_size
                .or(raw.min_entries_to_merge_wait_minutes),
            require_all_group_entries_to_pass: raw.require_all_group_entries_to_pass,
            grouping_strategy: raw.grouping_strategy,
            status_check_timeout: raw
                .status_check_timeout
                .or(raw.check_response_timeout_minutes),
        }
    }
}

impl MergeQueueParams {
    pub fn all_entries_must_pass(&self) -> bool {
        self.require_all_group_entries_to_pass.unwrap_or(false)
            || self.grouping_strategy.as_deref() == Some("ALLGREEN")
    }
}
