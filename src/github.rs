use crate::model::{ClassicProtection, RepoName, RuleSet};
use octocrab::{Octocrab, Page};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSummary {
    pub name: RepoName,
    pub archived: bool,
    /// Resolves `~DEFAULT_BRANCH` ruleset conditions.
    pub default_branch: Option<String>,
}

impl From<octocrab::models::Repository> for RepoSummary {
    fn from(repo: octocrab::models::Repository) -> Self {
        RepoSummary {
            name: repo.name.into(),
            archived: repo.archived.unwrap_or(false),
            default_branch: repo.default_branch,
        }
    }
}

/// Where repository policy comes from.
///
/// Only listing can fail; policy lookups degrade to absent/empty so that one
/// unreadable repository never stops the audit.
#[allow(async_fn_in_trait)]
pub trait PolicySource {
    async fn list_repositories(&self, org: &str) -> anyhow::Result<Vec<RepoSummary>>;

    /// Looks up one repository, for audits that name their repositories.
    async fn repository(&self, org: &str, repo: &RepoName) -> Option<RepoSummary>;

    async fn classic_protection(
        &self,
        org: &str,
        repo: &RepoName,
        branch: &str,
    ) -> Option<ClassicProtection>;

    async fn rulesets(&self, org: &str, repo: &RepoName) -> Vec<RuleSet>;
}

pub struct GitHubSource {
    client: Octocrab,
}

impl GitHubSource {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    pub fn with_token(token: String) -> anyhow::Result<Self> {
        let client = octocrab::OctocrabBuilder::new()
            .personal_token(token)
            .build()?;
        Ok(Self::new(client))
    }

    async fn ruleset_detail(&self, org: &str, repo: &RepoName, id: u64) -> Option<RuleSet> {
        let route = format!("/repos/{org}/{repo}/rulesets/{id}");
        match self.client.get::<RuleSet, _, ()>(route, None).await {
            Ok(ruleset) => Some(ruleset),
            Err(error) => {
                warn!(%repo, id, %error, "Cannot load ruleset detail, keeping summary");
                None
            }
        }
    }
}

impl PolicySource for GitHubSource {
    async fn list_repositories(&self, org: &str) -> anyhow::Result<Vec<RepoSummary>> {
        let mut repositories = vec![];
        let mut page = 1u32;
        loop {
            let mut repos = self
                .client
                .orgs(org)
                .list_repos()
                .page(page)
                .per_page(100)
                .send()
                .await?;
            for repo in repos.take_items() {
                repositories.push(RepoSummary::from(repo));
            }

            if repos.next.is_none() {
                break;
            } else {
                page += 1;
            }
        }
        Ok(repositories)
    }

    async fn repository(&self, org: &str, repo: &RepoName) -> Option<RepoSummary> {
        match self.client.repos(org, repo.as_str()).get().await {
            Ok(repository) => Some(RepoSummary::from(repository)),
            Err(error) => {
                warn!(%repo, %error, "Cannot load repository");
                None
            }
        }
    }

    async fn classic_protection(
        &self,
        org: &str,
        repo: &RepoName,
        branch: &str,
    ) -> Option<ClassicProtection> {
        let route = format!("/repos/{org}/{repo}/branches/{branch}/protection");
        match self.client.get::<ClassicProtection, _, ()>(route, None).await {
            Ok(protection) => Some(protection),
            Err(error) => {
                // 404 is the normal answer for an unprotected branch.
                debug!(%repo, branch, %error, "No classic protection");
                None
            }
        }
    }

    async fn rulesets(&self, org: &str, repo: &RepoName) -> Vec<RuleSet> {
        let route = format!("/repos/{org}/{repo}/rulesets");
        let mut summaries = vec![];
        let mut page = 1u32;
        loop {
            let mut rulesets = match self
                .client
                .get::<Page<RuleSet>, _, _>(&route, Some(&[("per_page", 100), ("page", page)]))
                .await
            {
                Ok(rulesets) => rulesets,
                Err(error) if page == 1 => {
                    debug!(%repo, %error, "No rulesets");
                    return vec![];
                }
                Err(error) => {
                    warn!(%repo, page, %error, "Cannot load further rulesets");
                    break;
                }
            };
            summaries.extend(rulesets.take_items());

            if rulesets.next.is_none() {
                break;
            } else {
                page += 1;
            }
        }

        // The listing carries no rules; load each ruleset in full.
        let mut rulesets = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let detail = match summary.id {
                Some(id) => self.ruleset_detail(org, repo, id).await,
                None => None,
            };
            rulesets.push(detail.unwrap_or(summary));
        }
        rulesets
    }
}
