use serde::{Deserialize, Serialize};

/// Decides which dependency jars get a library object.
///
/// With `exclude_by_default` set, `prefixes` name the jars to generate;
/// otherwise they name the jars to leave out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPolicy {
    pub exclude_by_default: bool,
    pub prefixes: Vec<String>,
}

impl SelectionPolicy {
    pub fn new(exclude_by_default: bool, prefixes: Vec<String>) -> Self {
        Self {
            exclude_by_default,
            prefixes,
        }
    }

    /// First matching prefix wins; no match keeps the default decision.
    pub fn is_selected(&self, candidate: &str) -> bool {
        let matched = self
            .prefixes
            .iter()
            .any(|prefix| candidate.starts_with(prefix.as_str()));
        if matched {
            self.exclude_by_default
        } else {
            !self.exclude_by_default
        }
    }
}

/// Class-level filter forwarded to the tool in library mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassFilter {
    pub deny_list: bool,
    pub prefixes: Vec<String>,
}

impl Default for ClassFilter {
    fn default() -> Self {
        Self {
            deny_list: true,
            prefixes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(exclude_by_default: bool, prefixes: &[&str]) -> SelectionPolicy {
        SelectionPolicy::new(
            exclude_by_default,
            prefixes.iter().map(|p| p.to_string()).collect(),
        )
    }

    #[test]
    fn exclude_by_default_selects_only_matching_prefixes() {
        let p = policy(true, &["lib-a"]);
        assert!(p.is_selected("lib-a-core.jar"));
        assert!(!p.is_selected("lib-b.jar"));
    }

    #[test]
    fn include_by_default_drops_matching_prefixes() {
        let p = policy(false, &["lib-a"]);
        assert!(!p.is_selected("lib-a-core.jar"));
        assert!(p.is_selected("lib-b.jar"));
    }

    #[test]
    fn empty_prefix_list_keeps_baseline() {
        assert!(policy(false, &[]).is_selected("anything.jar"));
        assert!(!policy(true, &[]).is_selected("anything.jar"));
        assert!(SelectionPolicy::default().is_selected("guava.jar"));
    }

    #[test]
    fn first_match_stops_the_scan() {
        let p = policy(true, &["guava", "gu", "nomatch"]);
        assert!(p.is_selected("guava-31.1-jre.jar"));
        assert!(!p.is_selected("jsr305-3.0.2.jar"));
    }

    #[test]
    fn class_filter_defaults_to_deny_list() {
        let f = ClassFilter::default();
        assert!(f.deny_list);
        assert!(f.prefixes.is_empty());
    }
}
