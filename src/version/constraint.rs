//! Terraform `required_version` constraint expressions
//!
//! Supported operators, combined with commas (all must hold):
//! - `1.2.3`, `= 1.2.3` - exactly this version
//! - `!= 1.2.3` - anything but this version
//! - `>`, `>=`, `<`, `<=` - comparisons
//! - `~> 1.2` - pessimistic: >=1.2.0 <2.0.0
//! - `~> 1.2.3` - pessimistic: >=1.2.3 <1.3.0

use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::version::error::ResolveError;
use crate::version::semver::parse_partial_version;

/// A single comparison inside a constraint expression
#[derive(Debug, Clone, PartialEq, Eq)]
enum Comparator {
    Exact(Version),
    NotEqual(Version),
    Gt(Version),
    Gte(Version),
    Lt(Version),
    Lte(Version),
    /// `~>`: at least `lower`, strictly below `upper`
    Pessimistic { lower: Version, upper: Version },
}

impl Comparator {
    fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();

        if let Some(rest) = spec.strip_prefix("~>") {
            Self::parse_pessimistic(rest.trim())
        } else if let Some(rest) = spec.strip_prefix(">=") {
            operand(rest).map(Comparator::Gte)
        } else if let Some(rest) = spec.strip_prefix("<=") {
            operand(rest).map(Comparator::Lte)
        } else if let Some(rest) = spec.strip_prefix("!=") {
            operand(rest).map(Comparator::NotEqual)
        } else if let Some(rest) = spec.strip_prefix('>') {
            operand(rest).map(Comparator::Gt)
        } else if let Some(rest) = spec.strip_prefix('<') {
            operand(rest).map(Comparator::Lt)
        } else if let Some(rest) = spec.strip_prefix('=') {
            operand(rest).map(Comparator::Exact)
        } else {
            operand(spec).map(Comparator::Exact)
        }
    }

    /// The rightmost written segment may increase, everything left of it is fixed.
    fn parse_pessimistic(spec: &str) -> Option<Self> {
        let (lower, segments) = parse_partial_version(spec)?;
        let upper = match segments {
            1 | 2 => Version::new(lower.major + 1, 0, 0),
            _ => Version::new(lower.major, lower.minor + 1, 0),
        };
        Some(Comparator::Pessimistic { lower, upper })
    }

    fn matches(&self, version: &Version) -> bool {
        match self {
            Comparator::Exact(v) => version == v,
            Comparator::NotEqual(v) => version != v,
            Comparator::Gt(v) => version > v,
            Comparator::Gte(v) => version >= v,
            Comparator::Lt(v) => version < v,
            Comparator::Lte(v) => version <= v,
            Comparator::Pessimistic { lower, upper } => version >= lower && version < upper,
        }
    }

    fn operand(&self) -> &Version {
        match self {
            Comparator::Exact(v)
            | Comparator::NotEqual(v)
            | Comparator::Gt(v)
            | Comparator::Gte(v)
            | Comparator::Lt(v)
            | Comparator::Lte(v) => v,
            Comparator::Pessimistic { lower, .. } => lower,
        }
    }
}

fn operand(text: &str) -> Option<Version> {
    let text = text.trim();
    if text.is_empty() || text.contains(char::is_whitespace) {
        return None;
    }
    parse_partial_version(text).map(|(version, _)| version)
}

/// A compiled constraint expression such as `>= 1.2.0, < 2.0.0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    expression: String,
    comparators: Vec<Comparator>,
}

impl VersionConstraint {
    /// Compile a constraint expression.
    ///
    /// An empty expression or any unparseable comparator fails the whole
    /// expression; there is no "accept everything" fallback.
    pub fn parse(expression: &str) -> Result<Self, ResolveError> {
        let invalid = |reason: &str| ResolveError::InvalidConstraint {
            expression: expression.to_string(),
            reason: reason.to_string(),
        };

        if expression.trim().is_empty() {
            return Err(invalid("expression is empty"));
        }

        let comparators = expression
            .split(',')
            .map(|part| {
                Comparator::parse(part)
                    .ok_or_else(|| invalid(&format!("cannot parse '{}'", part.trim())))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            expression: expression.trim().to_string(),
            comparators,
        })
    }

    /// Check whether a version satisfies every comparator.
    ///
    /// Prereleases only match when a comparator names a prerelease of the
    /// same major.minor.patch, so `>= 1.5.0` never selects `1.6.0-rc1`.
    pub fn matches(&self, version: &Version) -> bool {
        if !version.pre.is_empty() && !self.admits_prerelease_of(version) {
            return false;
        }
        self.comparators.iter().all(|c| c.matches(version))
    }

    pub fn as_str(&self) -> &str {
        &self.expression
    }

    fn admits_prerelease_of(&self, version: &Version) -> bool {
        self.comparators.iter().any(|c| {
            let v = c.operand();
            !v.pre.is_empty()
                && v.major == version.major
                && v.minor == version.minor
                && v.patch == version.patch
        })
    }
}

impl FromStr for VersionConstraint {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[rstest]
    #[case(">= 1.0.0, < 2.0.0", "1.0.0", true)]
    #[case(">= 1.0.0, < 2.0.0", "1.9.9", true)]
    #[case(">= 1.0.0, < 2.0.0", "2.0.0", false)]
    #[case(">= 1.0.0, < 2.0.0", "0.9.0", false)]
    #[case(">=1.2", "1.2.0", true)]
    #[case("> 1.2.0", "1.2.0", false)]
    #[case("<= 1.2.0", "1.2.0", true)]
    #[case("1.5.0", "1.5.0", true)]
    #[case("1.5.0", "1.5.1", false)]
    #[case("= 1.5.0", "1.5.0", true)]
    #[case("!= 1.5.0", "1.5.0", false)]
    #[case("!= 1.5.0", "1.5.1", true)]
    #[case("~> 1.2", "1.9.0", true)]
    #[case("~> 1.2", "2.0.0", false)]
    #[case("~> 1.2", "1.1.9", false)]
    #[case("~> 1.2.3", "1.2.9", true)]
    #[case("~> 1.2.3", "1.3.0", false)]
    #[case("~> 1", "1.99.0", true)]
    #[case("~> 1", "2.0.0", false)]
    #[case(">= 1.5.0", "1.6.0-rc1", false)] // prereleases are not picked up by ranges
    #[case(">= 1.6.0-beta1", "1.6.0-rc1", true)]
    #[case("1.6.0-rc1", "1.6.0-rc1", true)]
    fn matches_returns_expected(
        #[case] expression: &str,
        #[case] version: &str,
        #[case] expected: bool,
    ) {
        let constraint = VersionConstraint::parse(expression).unwrap();
        assert_eq!(constraint.matches(&v(version)), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case(">= ")]
    #[case(">= 1.0.0,")]
    #[case("latest")]
    #[case(">= 1.0.0 < 2.0.0")]
    #[case("=> 1.0.0")]
    fn parse_rejects_malformed_expressions(#[case] expression: &str) {
        assert!(matches!(
            VersionConstraint::parse(expression),
            Err(ResolveError::InvalidConstraint { .. })
        ));
    }

    #[test]
    fn display_keeps_original_expression() {
        let constraint: VersionConstraint = " >= 1.0.0, < 2.0.0 ".parse().unwrap();
        assert_eq!(constraint.to_string(), ">= 1.0.0, < 2.0.0");
    }
}
