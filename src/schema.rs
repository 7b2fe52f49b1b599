//! The closed set of audit columns and the cell values they hold.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CheckKey {
    PrReviewRequired,
    RequiredReviewerCount,
    StatusChecksRequired,
    RequiredStatusCheckNames,
    LinearHistoryRequired,
    SignedCommitsRequired,
    ForcePushAllowed,
    DeletionAllowed,
    AdminsIncluded,
    RequiredDeploymentEnvironments,
    CreationRestricted,
    UpdateRestricted,
    DeletionRestricted,
    MergeQueueRequired,
    MergeQueueMethod,
    MergeQueueBuildConcurrency,
    MergeQueueMinGroupSize,
    MergeQueueMaxGroupSize,
    MergeQueueMinGroupWaitMinutes,
    MergeQueueAllEntriesMustPass,
    MergeQueueStatusCheckTimeout,
    DeploymentsRequired,
    PullRequestRequired,
    ForcePushBlocked,
    CodeScanningResultsRequired,
    BypassActors,
}

/// Columns of a classic protection row, in output order.
pub const CLASSIC_SCHEMA: &[CheckKey] = &[
    CheckKey::PrReviewRequired,
    CheckKey::RequiredReviewerCount,
    CheckKey::StatusChecksRequired,
    CheckKey::RequiredStatusCheckNames,
    CheckKey::LinearHistoryRequired,
    CheckKey::SignedCommitsRequired,
    CheckKey::ForcePushAllowed,
    CheckKey::DeletionAllowed,
    CheckKey::AdminsIncluded,
    CheckKey::RequiredDeploymentEnvironments,
];

/// Columns of a ruleset row, in output order.
pub const RULESET_SCHEMA: &[CheckKey] = &[
    CheckKey::CreationRestricted,
    CheckKey::UpdateRestricted,
    CheckKey::DeletionRestricted,
    CheckKey::LinearHistoryRequired,
    CheckKey::MergeQueueRequired,
    CheckKey::MergeQueueMethod,
    CheckKey::MergeQueueBuildConcurrency,
    CheckKey::MergeQueueMinGroupSize,
    CheckKey::MergeQueueMaxGroupSize,
    CheckKey::MergeQueueMinGroupWaitMinutes,
    CheckKey::MergeQueueAllEntriesMustPass,
    CheckKey::MergeQueueStatusCheckTimeout,
    CheckKey::DeploymentsRequired,
    CheckKey::SignedCommitsRequired,
    CheckKey::PullRequestRequired,
    CheckKey::RequiredReviewerCount,
    CheckKey::StatusChecksRequired,
    CheckKey::RequiredStatusCheckNames,
    CheckKey::ForcePushBlocked,
    CheckKey::CodeScanningResultsRequired,
    CheckKey::BypassActors,
];

#[derive(serde::Serialize, serde::Deserialize, clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ja,
}

impl CheckKey {
    /// Whether the column holds a value (count, names, parameter) rather than y/n.
    ///
    /// Value columns start out as [`Cell::NotApplicable`], flag columns as [`Cell::No`].
    pub fn is_value(self) -> bool {
        matches!(
            self,
            CheckKey::RequiredReviewerCount
                | CheckKey::RequiredStatusCheckNames
                | CheckKey::RequiredDeploymentEnvironments
                | CheckKey::MergeQueueMethod
                | CheckKey::MergeQueueBuildConcurrency
                | CheckKey::MergeQueueMinGroupSize
                | CheckKey::MergeQueueMaxGroupSize
                | CheckKey::MergeQueueMinGroupWaitMinutes
                | CheckKey::MergeQueueAllEntriesMustPass
                | CheckKey::MergeQueueStatusCheckTimeout
                | CheckKey::BypassActors
        )
    }

    pub fn label(self, locale: Locale) -> &'static str {
        match locale {
            Locale::En => self.english(),
            Locale::Ja => self.japanese(),
        }
    }

    fn english(self) -> &'static str {
        match self {
            CheckKey::PrReviewRequired => "PR review required",
            CheckKey::RequiredReviewerCount => "Required reviewer count",
            CheckKey::StatusChecksRequired => "Status checks required",
            CheckKey::RequiredStatusCheckNames => "Required status check names",
            CheckKey::LinearHistoryRequired => "Linear history required",
            CheckKey::SignedCommitsRequired => "Signed commits required",
            CheckKey::ForcePushAllowed => "Force push allowed",
            CheckKey::DeletionAllowed => "Deletion allowed",
            CheckKey::AdminsIncluded => "Admins included",
            CheckKey::RequiredDeploymentEnvironments => "Required deployment environments",
            CheckKey::CreationRestricted => "Creation restricted",
            CheckKey::UpdateRestricted => "Update restricted",
            CheckKey::DeletionRestricted => "Deletion restricted",
            CheckKey::MergeQueueRequired => "Merge queue required",
            CheckKey::MergeQueueMethod => "Merge queue: merge method",
            CheckKey::MergeQueueBuildConcurrency => "Merge queue: build concurrency",
            CheckKey::MergeQueueMinGroupSize => "Merge queue: min group size",
            CheckKey::MergeQueueMaxGroupSize => "Merge queue: max group size",
            CheckKey::MergeQueueMinGroupWaitMinutes => "Merge queue: wait minutes for min group",
            CheckKey::MergeQueueAllEntriesMustPass => "Merge queue: all entries must pass",
            CheckKey::MergeQueueStatusCheckTimeout => "Merge queue: status check timeout",
            CheckKey::DeploymentsRequired => "Deployments required",
            CheckKey::PullRequestRequired => "Pull request required",
            CheckKey::ForcePushBlocked => "Force push blocked",
            CheckKey::CodeScanningResultsRequired => "Code scanning results required",
            CheckKey::BypassActors => "Bypass actors",
        }
    }

    fn japanese(self) -> &'static str {
        match self {
            CheckKey::PrReviewRequired => "プルリクエストのマージ前にレビューが必須",
            CheckKey::RequiredReviewerCount => "必須レビュー数",
            CheckKey::StatusChecksRequired => "ステータスチェックの必須",
            CheckKey::RequiredStatusCheckNames => "必須ステータスチェック名",
            CheckKey::LinearHistoryRequired => "直線的な履歴の必須",
            CheckKey::SignedCommitsRequired => "サイン済みコミット必須",
            CheckKey::ForcePushAllowed => "強制プッシュの許可",
            CheckKey::DeletionAllowed => "削除の許可",
            CheckKey::AdminsIncluded => "管理者も含める",
            CheckKey::RequiredDeploymentEnvironments => "必須デプロイメント環境",
            CheckKey::CreationRestricted => "作成の制限",
            CheckKey::UpdateRestricted => "更新の制限",
            CheckKey::DeletionRestricted => "削除の制限",
            CheckKey::MergeQueueRequired => "マージキュー必須",
            CheckKey::MergeQueueMethod => "マージキュー: メソッド",
            CheckKey::MergeQueueBuildConcurrency => "マージキュー: 同時ビルド数",
            CheckKey::MergeQueueMinGroupSize => "マージキュー: 最小グループ数",
            CheckKey::MergeQueueMaxGroupSize => "マージキュー: 最大グループ数",
            CheckKey::MergeQueueMinGroupWaitMinutes => "マージキュー: 最小グループ待機分",
            CheckKey::MergeQueueAllEntriesMustPass => {
                "マージキュー: 全てのエントリが必須チェック合格"
            }
            CheckKey::MergeQueueStatusCheckTimeout => "マージキュー: ステータスチェックタイムアウト",
            CheckKey::DeploymentsRequired => "デプロイメント必須",
            CheckKey::PullRequestRequired => "プルリクエストのマージ前に必須",
            CheckKey::ForcePushBlocked => "強制プッシュのブロック",
            CheckKey::CodeScanningResultsRequired => "コードスキャン結果制限",
            CheckKey::BypassActors => "バイパスアクター",
        }
    }
}

impl fmt::Display for CheckKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.english())
    }
}

pub const NOT_APPLICABLE: &str = "NA";

/// One cell of a policy row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    Yes,
    No,
    NotApplicable,
    Value(String),
}

impl Cell {
    pub fn flag(on: bool) -> Cell {
        if on {
            Cell::Yes
        } else {
            Cell::No
        }
    }

    /// Comma-joined names, or not applicable when there are none.
    pub fn joined<I, S>(names: I) -> Cell
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(|name| name.as_ref().to_string())
            .collect();
        if names.is_empty() {
            return Cell::NotApplicable;
        }
        Cell::Value(names.join(","))
    }

    pub fn optional<T: ToString>(value: Option<T>) -> Cell {
        value.map_or(Cell::NotApplicable, |value| Cell::Value(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Cell::Yes => "y",
            Cell::No => "n",
            Cell::NotApplicable => NOT_APPLICABLE,
            Cell::Value(value) => value,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Cell {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn schemas_have_no_duplicate_columns() {
        for schema in [CLASSIC_SCHEMA, RULESET_SCHEMA] {
            let unique: HashSet<_> = schema.iter().collect();
            assert_eq!(unique.len(), schema.len());
        }
    }

    #[test]
    fn labels_are_unique_per_schema_and_locale() {
        for locale in [Locale::En, Locale::Ja] {
            for schema in [CLASSIC_SCHEMA, RULESET_SCHEMA] {
                let labels: HashSet<_> = schema.iter().map(|key| key.label(locale)).collect();
                assert_eq!(labels.len(), schema.len());
            }
        }
    }

    #[test]
    fn cells_render_three_valued_markers() {
        assert_eq!(Cell::flag(true).as_str(), "y");
        assert_eq!(Cell::flag(false).as_str(), "n");
        assert_eq!(Cell::NotApplicable.as_str(), "NA");
        assert_eq!(Cell::optional(Some(2)).as_str(), "2");
        assert_eq!(Cell::optional(None::<u64>), Cell::NotApplicable);
    }

    #[test]
    fn joined_cells_mark_empty_lists_not_applicable() {
        assert_eq!(Cell::joined(Vec::<String>::new()), Cell::NotApplicable);
        assert_eq!(
            Cell::joined(["ci/build", "lint"]),
            Cell::Value("ci/build,lint".to_string())
        );
    }
}
