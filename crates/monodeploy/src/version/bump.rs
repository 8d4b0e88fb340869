//! Bump levels and semantic-version increments

use semver::{Prerelease, Version};
use serde::{Deserialize, Serialize};

/// Version bump level, totally ordered: none < patch < minor < major
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpLevel {
    None,
    Patch,
    Minor,
    Major,
}

impl BumpLevel {
    /// Apply the bump to a version, dropping any prerelease/build suffix
    pub fn apply(self, current: &Version) -> Version {
        let mut next = Version::new(current.major, current.minor, current.patch);
        match self {
            BumpLevel::Major => {
                next.major += 1;
                next.minor = 0;
                next.patch = 0;
            }
            BumpLevel::Minor => {
                next.minor += 1;
                next.patch = 0;
            }
            BumpLevel::Patch => {
                next.patch += 1;
            }
            BumpLevel::None => {}
        }
        next
    }

    /// Prerelease-aware increment under the given identifier
    ///
    /// The identifier chain is numeric and monotonic per package: while the
    /// current version already carries `{tag}.N`, only N advances; otherwise
    /// the bump applies to the release base and the chain restarts at `.0`.
    pub fn apply_prerelease(self, current: &Version, tag: &str) -> Version {
        let chain_prefix = format!("{tag}.");
        if let Some(n) = current
            .pre
            .as_str()
            .strip_prefix(&chain_prefix)
            .and_then(|suffix| suffix.parse::<u64>().ok())
        {
            let mut next = Version::new(current.major, current.minor, current.patch);
            next.pre = Prerelease::new(&format!("{tag}.{}", n + 1)).expect("numeric prerelease identifier");
            return next;
        }

        let mut next = self.apply(current);
        next.pre = Prerelease::new(&format!("{tag}.0")).expect("numeric prerelease identifier");
        next
    }

    /// Combine two bump levels, keeping the larger one
    pub fn combine(self, other: Self) -> Self {
        self.max(other)
    }
}
