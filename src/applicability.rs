use crate::model::{Enforcement, RuleSet, RuleTarget};

const ALL_TOKEN: &str = "all";
const WILDCARD_TOKEN: &str = "*";

/// Whether `ruleset` governs `branch`.
///
/// Disabled enforcement wins over any targeting, and tag or push rulesets
/// never govern a branch. An empty target list means every branch. Otherwise
/// the branch must be listed literally (case-sensitive), or the list must carry
/// `all` (any case) or `*`. Patterns are not expanded. A matching branch is
/// still vetoed by the ruleset's exclusions.
pub fn applies(ruleset: &RuleSet, branch: &str) -> bool {
    if ruleset.enforcement == Enforcement::Disabled {
        return false;
    }
    if ruleset.target != RuleTarget::Branch {
        return false;
    }
    let targeted = ruleset.target_branches.is_empty() || matches(&ruleset.target_branches, branch);
    targeted && !matches(&ruleset.exclude_branches, branch)
}

fn matches(names: &[String], branch: &str) -> bool {
    names.iter().any(|name| name == branch)
        || names.iter().any(|name| name.eq_ignore_ascii_case(ALL_TOKEN))
        || names.iter().any(|name| name == WILDCARD_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ruleset(enforcement: Enforcement, targets: &[&str]) -> RuleSet {
        RuleSet {
            enforcement,
            target_branches: targets.iter().map(|t| t.to_string()).collect(),
            ..RuleSet::default()
        }
    }

    #[test]
    fn disabled_overrides_targeting() {
        let cases: [&[&str]; 4] = [&[], &["*"], &["all"], &["main"]];
        for targets in cases {
            assert!(!applies(&ruleset(Enforcement::Disabled, targets), "main"));
        }
    }

    #[test]
    fn empty_targets_match_everything() {
        let rs = ruleset(Enforcement::Active, &[]);
        assert!(applies(&rs, "main"));
        assert!(applies(&rs, ""));
        assert!(applies(&rs, "feature/ünïcode branch"));
    }

    #[test]
    fn literal_match_is_case_sensitive() {
        let rs = ruleset(Enforcement::Active, &["main"]);
        assert!(applies(&rs, "main"));
        assert!(!applies(&rs, "Main"));
    }

    #[test]
    fn all_token_ignores_case() {
        for token in ["all", "ALL", "All"] {
            assert!(applies(&ruleset(Enforcement::Active, &[token]), "develop"));
        }
    }

    #[test]
    fn wildcard_matches_even_when_literal_does_not() {
        let rs = ruleset(Enforcement::Active, &["*", "release"]);
        assert!(applies(&rs, "main"));
    }

    #[test]
    fn patterns_are_not_expanded() {
        let rs = ruleset(Enforcement::Active, &["release/*"]);
        assert!(!applies(&rs, "main"));
        assert!(!applies(&rs, "release/1.0"));
        assert!(applies(&rs, "release/*"));
    }

    #[test]
    fn non_branch_targets_never_apply() {
        for target in [RuleTarget::Tag, RuleTarget::Push, RuleTarget::Other] {
            let rs = RuleSet {
                target,
                target_branches: vec!["all".to_string()],
                ..RuleSet::default()
            };
            assert!(!applies(&rs, "main"));
        }
    }

    #[test]
    fn exclusions_veto_a_match() {
        let rs = RuleSet {
            target_branches: vec!["all".to_string()],
            exclude_branches: vec!["main".to_string()],
            ..RuleSet::default()
        };
        assert!(!applies(&rs, "main"));
        assert!(applies(&rs, "develop"));

        let everything_excluded = RuleSet {
            exclude_branches: vec!["all".to_string()],
            ..RuleSet::default()
        };
        assert!(!applies(&everything_excluded, "develop"));
    }

    #[test]
    fn evaluate_mode_still_applies() {
        assert!(applies(&ruleset(Enforcement::Evaluate, &["main"]), "main"));
    }

    proptest! {
        #[test]
        fn disabled_never_applies(
            targets in prop::collection::vec(prop_oneof![Just("*".to_string()), Just("all".to_string()), "[a-z/]{0,12}"], 0..5),
            branch in ".{0,20}",
        ) {
            let rs = RuleSet {
                enforcement: Enforcement::Disabled,
                target_branches: targets,
                ..RuleSet::default()
            };
            prop_assert!(!applies(&rs, &branch));
        }

        #[test]
        fn untargeted_active_always_applies(branch in ".{0,40}") {
            prop_assert!(applies(&ruleset(Enforcement::Active, &[]), &branch));
        }
    }
}
