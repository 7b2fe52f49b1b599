//! Drives one audit run: pick repositories, fetch their policy, normalize it.

use crate::github::{PolicySource, RepoSummary};
use crate::matrix::{build_classic_row, build_ruleset_rows, PolicyRow};
use crate::model::RepoName;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tracing::{debug, info};

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditSettings {
    pub org: String,
    pub branch: String,
    /// Repository requests in flight at once.
    pub concurrency: usize,
    pub skip_archived: bool,
    /// Audit only these repositories instead of listing the organization.
    pub repositories: Vec<String>,
}

#[derive(serde::Serialize, Debug, Clone)]
pub struct AuditReport {
    pub generated_at: DateTime<Utc>,
    pub organization: String,
    pub branch: String,
    pub classic_rows: Vec<PolicyRow>,
    pub ruleset_rows: Vec<PolicyRow>,
}

/// Rows for a single repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoAudit {
    pub classic: PolicyRow,
    pub rulesets: Vec<PolicyRow>,
}

pub async fn audit_repository<S: PolicySource>(
    source: &S,
    org: &str,
    repo: &RepoSummary,
    branch: &str,
) -> RepoAudit {
    let name = &repo.name;
    let protection = source.classic_protection(org, name, branch).await;
    let mut rulesets = source.rulesets(org, name).await;
    if let Some(default_branch) = &repo.default_branch {
        for ruleset in &mut rulesets {
            ruleset.resolve_default_branch(default_branch);
        }
    }
    debug!(
        repo = %name,
        classic = protection.is_some(),
        rulesets = rulesets.len(),
        "Fetched policy"
    );

    RepoAudit {
        classic: build_classic_row(name, branch, protection.as_ref()),
        rulesets: build_ruleset_rows(name, branch, &rulesets),
    }
}

async fn select_repositories<S: PolicySource>(
    source: &S,
    settings: &AuditSettings,
) -> anyhow::Result<Vec<RepoSummary>> {
    if !settings.repositories.is_empty() {
        let mut selected = Vec::with_capacity(settings.repositories.len());
        for name in &settings.repositories {
            let name = RepoName::from(name.as_str());
            let summary = source
                .repository(&settings.org, &name)
                .await
                .unwrap_or(RepoSummary {
                    name,
                    archived: false,
                    default_branch: None,
                });
            selected.push(summary);
        }
        return Ok(selected);
    }

    let listed = source.list_repositories(&settings.org).await?;
    let total = listed.len();
    let selected: Vec<RepoSummary> = listed
        .into_iter()
        .filter(|repo| !(settings.skip_archived && repo.archived))
        .collect();
    if selected.len() < total {
        info!(skipped = total - selected.len(), "Skipping archived repositories");
    }
    Ok(selected)
}

/// Audits every selected repository, keeping repository order in the report.
pub async fn run_audit<S: PolicySource>(
    source: &S,
    settings: &AuditSettings,
) -> anyhow::Result<AuditReport> {
    let repositories = select_repositories(source, settings).await?;
    info!(
        org = %settings.org,
        branch = %settings.branch,
        repositories = repositories.len(),
        "Auditing branch protection"
    );

    let audits: Vec<RepoAudit> = futures_util::stream::iter(&repositories)
        .map(|repo| audit_repository(source, &settings.org, repo, &settings.branch))
        .buffered(settings.concurrency.max(1))
        .collect()
        .await;

    let mut classic_rows = Vec::with_capacity(audits.len());
    let mut ruleset_rows = vec![];
    for audit in audits {
        classic_rows.push(audit.classic);
        ruleset_rows.extend(audit.rulesets);
    }

    info!(
        classic = classic_rows.len(),
        rulesets = ruleset_rows.len(),
        "Audit finished"
    );

    Ok(AuditReport {
        generated_at: Utc::now(),
        organization: settings.org.clone(),
        branch: settings.branch.clone(),
        classic_rows,
        ruleset_rows,
    })
}
