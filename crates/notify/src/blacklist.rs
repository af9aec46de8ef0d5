/// Addresses that must never receive mail (hard bounces, explicit
/// opt-outs, known traps). Checked before any adapter attempt.
const DEFAULT_BLACKLIST: &[&str] = &[
    "bounce@simulator.amazonses.com",
    "blacklisted@example.com",
    "donotreply@example.com",
    "optout@example.com",
];

/// Static email blacklist with case-insensitive matching.
#[derive(Debug, Clone)]
pub struct EmailBlacklist {
    entries: Vec<String>,
}

impl EmailBlacklist {
    /// The built-in entry set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DEFAULT_BLACKLIST
                .iter()
                .map(|e| (*e).to_owned())
                .collect(),
        }
    }

    /// A blacklist with custom entries replacing the defaults.
    #[must_use]
    pub fn with_entries(entries: impl IntoIterator<Item = String>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether `address` is blacklisted.
    #[must_use]
    pub fn contains(&self, address: &str) -> bool {
        let needle = address.trim().to_ascii_lowercase();
        self.entries.iter().any(|entry| entry == &needle)
    }
}

impl Default for EmailBlacklist {
    fn default() -> Self {
        Self::new()
    }
}
