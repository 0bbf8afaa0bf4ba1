//! Display sentinels and list-name matching.

/// Placeholder for a list or member id that does not resolve.
pub const UNKNOWN: &str = "Unknown";

/// Group name for cards with no members.
pub const UNASSIGNED: &str = "Unassigned";

/// Group name for cards with no labels.
pub const NO_LABEL: &str = "No label";

/// List names treated as "done" unless configured otherwise.
pub const DEFAULT_DONE_LISTS: [&str; 2] = ["Done", "Concluído"];

/// List names treated as "in progress" unless configured otherwise.
pub const DEFAULT_IN_PROGRESS_LISTS: [&str; 2] = ["Doing", "Fazendo"];

/// Matches list names against a set of aliases, ignoring case and
/// surrounding whitespace.
///
/// ```
/// use boardpulse::data::ListMatcher;
///
/// let done = ListMatcher::done();
/// assert!(done.matches("  DONE "));
/// assert!(done.matches("concluído"));
/// assert!(!done.matches("Doing"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMatcher {
    aliases: Vec<String>,
}

impl ListMatcher {
    /// Blank aliases are dropped.
    pub fn new<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for alias in aliases {
            let alias = normalize(alias.as_ref());
            if !alias.is_empty() && !normalized.contains(&alias) {
                normalized.push(alias);
            }
        }
        Self {
            aliases: normalized,
        }
    }

    pub fn done() -> Self {
        Self::new(DEFAULT_DONE_LISTS)
    }

    pub fn in_progress() -> Self {
        Self::new(DEFAULT_IN_PROGRESS_LISTS)
    }

    pub fn matches(&self, list_name: &str) -> bool {
        let name = normalize(list_name);
        self.aliases.iter().any(|a| *a == name)
    }

    /// Normalized (trimmed, lowercase) aliases.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
