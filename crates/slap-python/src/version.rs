//! Version numbers and version range specifications.
//!
//! A [`VersionSpec`] accepts the PEP 440 comparison syntax (`>=1.0,<2.0`,
//! `!=1.5.7`, `~=1.4`, `==1.2.*`) as well as the Poetry shorthands `^1.2.3`
//! and `~1.2.3`, which are expanded into an equivalent comparison range when
//! parsed:
//!
//! ```
//! use slap_python::version::VersionSpec;
//!
//! let spec: VersionSpec = "^0.1.0".parse().unwrap();
//! assert_eq!(spec.to_range_string(), ">=0.1.0,<0.2.0");
//! assert!(spec.accepts("0.1.7").unwrap());
//! assert!(!spec.accepts("0.2.0").unwrap());
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^
        v?
        (?:(?P<epoch>\d+)!)?
        (?P<release>\d+(?:\.\d+)*)
        (?:[-_.]?(?P<pre_l>alpha|a|beta|b|preview|pre|rc|c)[-_.]?(?P<pre_n>\d+)?)?
        (?:-(?P<post_n1>\d+)|[-_.]?(?P<post_l>post|rev|r)[-_.]?(?P<post_n2>\d+)?)?
        (?:[-_.]?(?P<dev_l>dev)[-_.]?(?P<dev_n>\d+)?)?
        (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
        $",
    )
    .unwrap()
});

/// Leading release components of a shorthand (`^`/`~`) bound.
static SHORTHAND_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(\d+)!)?(\d+)(?:\.(\d+))?(?:\.(\d+))?").unwrap());

/// Pre-release phase, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreRelease {
    Alpha,
    Beta,
    Rc,
}

impl PreRelease {
    fn as_str(self) -> &'static str {
        match self {
            PreRelease::Alpha => "a",
            PreRelease::Beta => "b",
            PreRelease::Rc => "rc",
        }
    }
}

/// A parsed PEP 440 version number.
///
/// Ordering follows PEP 440: `1.0.dev0 < 1.0a1 < 1.0rc1 < 1.0 < 1.0.post1`,
/// and trailing zeros in the release segment are insignificant.
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreRelease, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Option<String>,
}

/// Sort position of the pre-release segment.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum PreKey {
    DevOnly,
    Pre(PreRelease, u64),
    Final,
}

impl Version {
    /// Parse a version string.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let caps = VERSION_PATTERN
            .captures(trimmed)
            .ok_or_else(|| Error::InvalidVersion {
                input: input.to_string(),
                reason: "not a PEP 440 version".to_string(),
            })?;

        let number = |text: &str| -> Result<u64> {
            text.parse().map_err(|_| Error::InvalidVersion {
                input: input.to_string(),
                reason: format!("number out of range: {text}"),
            })
        };
        let optional_number = |name: &str| -> Result<u64> {
            caps.name(name).map_or(Ok(0), |m| number(m.as_str()))
        };

        let epoch = optional_number("epoch")?;
        let release = caps["release"]
            .split('.')
            .map(number)
            .collect::<Result<Vec<_>>>()?;

        let pre = match caps.name("pre_l") {
            Some(label) => {
                let phase = match label.as_str().to_ascii_lowercase().as_str() {
                    "a" | "alpha" => PreRelease::Alpha,
                    "b" | "beta" => PreRelease::Beta,
                    _ => PreRelease::Rc,
                };
                Some((phase, optional_number("pre_n")?))
            }
            None => None,
        };

        let post = if let Some(n) = caps.name("post_n1") {
            Some(number(n.as_str())?)
        } else if caps.name("post_l").is_some() {
            Some(optional_number("post_n2")?)
        } else {
            None
        };

        let dev = match caps.name("dev_l") {
            Some(_) => Some(optional_number("dev_n")?),
            None => None,
        };

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local: caps.name("local").map(|m| m.as_str().to_ascii_lowercase()),
        })
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// `true` for pre-releases and development releases.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    /// The version without its local segment.
    fn public(&self) -> Self {
        Self {
            local: None,
            ..self.clone()
        }
    }

    /// Whether both versions share epoch and (zero padded) release segment.
    fn same_release(&self, other: &Version) -> bool {
        self.epoch == other.epoch && cmp_release(&self.release, &other.release) == Ordering::Equal
    }

    /// Whether the release segment starts with `prefix` (zero padded).
    fn release_starts_with(&self, prefix: &[u64]) -> bool {
        prefix
            .iter()
            .enumerate()
            .all(|(index, part)| self.release.get(index).copied().unwrap_or(0) == *part)
    }

    fn pre_key(&self) -> PreKey {
        match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => PreKey::DevOnly,
            (Some((phase, n)), _, _) => PreKey::Pre(phase, n),
            _ => PreKey::Final,
        }
    }
}

fn cmp_release(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|index| {
            let left = a.get(index).copied().unwrap_or(0);
            let right = b.get(index).copied().unwrap_or(0);
            left.cmp(&right)
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| cmp_release(&self.release, &other.release))
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| {
                // A development release sorts before the same version without one.
                let key = |dev: Option<u64>| (dev.is_none(), dev.unwrap_or(0));
                key(self.dev).cmp(&key(other.dev))
            })
            .then_with(|| self.local.cmp(&other.local))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(u64::to_string).collect();
        f.write_str(&release.join("."))?;
        if let Some((phase, n)) = self.pre {
            write!(f, "{}{n}", phase.as_str())?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{n}")?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{n}")?;
        }
        if let Some(local) = &self.local {
            write!(f, "+{local}")?;
        }
        Ok(())
    }
}

/// Comparison operator of a single version term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    /// `~=`
    Compatible,
    /// `===`
    Arbitrary,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Compatible => "~=",
            Operator::Arbitrary => "===",
        }
    }

    /// Split a leading operator off `term`. Longer operators are tried first.
    fn split(term: &str) -> Option<(Self, &str)> {
        const OPERATORS: [(&str, Operator); 9] = [
            ("===", Operator::Arbitrary),
            ("~=", Operator::Compatible),
            ("==", Operator::Equal),
            ("!=", Operator::NotEqual),
            ("<=", Operator::LessEqual),
            (">=", Operator::GreaterEqual),
            ("<", Operator::Less),
            (">", Operator::Greater),
            ("=", Operator::Equal),
        ];
        OPERATORS
            .iter()
            .find_map(|(prefix, op)| term.strip_prefix(prefix).map(|rest| (*op, rest)))
    }
}

/// One `<operator><version>` term of a [`VersionSpec`].
#[derive(Debug, Clone)]
pub struct Specifier {
    op: Operator,
    /// The version as written, used for display and `===`.
    text: String,
    version: Version,
    /// `==1.2.*` / `!=1.2.*`
    wildcard: bool,
}

impl Specifier {
    fn new(op: Operator, text: &str) -> Result<Self> {
        let text = text.trim();
        let (version_text, wildcard) = match text.strip_suffix(".*") {
            Some(prefix) if matches!(op, Operator::Equal | Operator::NotEqual) => (prefix, true),
            _ => (text, false),
        };
        let version = Version::parse(version_text)?;
        if op == Operator::Compatible && version.release.len() < 2 {
            return Err(Error::InvalidVersion {
                input: text.to_string(),
                reason: "~= requires at least two release components".to_string(),
            });
        }
        Ok(Self {
            op,
            text: version_text.to_string(),
            version,
            wildcard,
        })
    }

    pub fn operator(&self) -> Operator {
        self.op
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Test `candidate`; `raw` is the candidate as written, for `===`.
    pub fn matches(&self, candidate: &Version, raw: &str) -> bool {
        let spec = &self.version;
        match self.op {
            Operator::Equal | Operator::NotEqual => {
                let equal = if self.wildcard {
                    candidate.epoch == spec.epoch && candidate.release_starts_with(&spec.release)
                } else if spec.local.is_none() {
                    candidate.public() == *spec
                } else {
                    candidate == spec
                };
                equal == (self.op == Operator::Equal)
            }
            Operator::LessEqual => candidate.public() <= *spec,
            Operator::GreaterEqual => candidate.public() >= *spec,
            Operator::Less => {
                // `<V` excludes pre-releases of V unless V is one itself.
                candidate.public() < *spec
                    && !(candidate.is_prerelease()
                        && !spec.is_prerelease()
                        && candidate.same_release(spec))
            }
            Operator::Greater => {
                // `>V` excludes post-releases of V unless V is one itself.
                candidate.public() > *spec
                    && !(candidate.is_postrelease()
                        && !spec.is_postrelease()
                        && candidate.same_release(spec))
            }
            Operator::Compatible => {
                let prefix = &spec.release[..spec.release.len() - 1];
                candidate.public() >= *spec
                    && candidate.epoch == spec.epoch
                    && candidate.release_starts_with(prefix)
            }
            Operator::Arbitrary => raw.trim().eq_ignore_ascii_case(&self.text),
        }
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.text)?;
        if self.wildcard {
            f.write_str(".*")?;
        }
        Ok(())
    }
}

/// A version range.
///
/// Two specs are equal when their normalized range strings are equal, so
/// `^1.1.0` equals `>=1.1.0,<2.0.0`. The wildcard `*` (or an empty string)
/// accepts every version and normalizes to an empty range string.
#[derive(Debug, Clone)]
pub struct VersionSpec {
    original: String,
    specifiers: Vec<Specifier>,
}

impl VersionSpec {
    /// The spec that accepts any version.
    pub fn any() -> Self {
        Self {
            original: "*".to_string(),
            specifiers: Vec::new(),
        }
    }

    /// Parse a version range expression.
    pub fn parse(spec: &str) -> Result<Self> {
        let original = spec.trim();
        let invalid = |reason: String| Error::InvalidVersionSpec {
            spec: original.to_string(),
            reason,
        };

        if original.is_empty() || original == "*" {
            return Ok(Self::any());
        }

        let specifiers = if let Some(rest) = original.strip_prefix('^') {
            expand_shorthand(rest, Shorthand::Caret).map_err(|e| invalid(e.to_string()))?
        } else if let Some(rest) = original.strip_prefix('~').filter(|rest| !rest.starts_with('=')) {
            expand_shorthand(rest, Shorthand::Tilde).map_err(|e| invalid(e.to_string()))?
        } else {
            original
                .split(',')
                .map(|term| parse_term(term.trim()).map_err(|e| invalid(e.to_string())))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(Self {
            original: original.to_string(),
            specifiers,
        })
    }

    /// `false` only for the "any version" wildcard.
    pub fn is_any(&self) -> bool {
        self.specifiers.is_empty()
    }

    /// The expression as it was written.
    pub fn as_str(&self) -> &str {
        &self.original
    }

    pub fn specifiers(&self) -> &[Specifier] {
        &self.specifiers
    }

    /// The normalized, comma separated comparison range. Empty for `*`.
    pub fn to_range_string(&self) -> String {
        self.specifiers
            .iter()
            .map(Specifier::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Test whether `version` lies within the range; every term must match.
    pub fn accepts(&self, version: &str) -> Result<bool> {
        let parsed = Version::parse(version)?;
        Ok(self
            .specifiers
            .iter()
            .all(|specifier| specifier.matches(&parsed, version)))
    }

    pub fn accepts_version(&self, version: &Version) -> bool {
        let raw = version.to_string();
        self.specifiers
            .iter()
            .all(|specifier| specifier.matches(version, &raw))
    }
}

impl Default for VersionSpec {
    fn default() -> Self {
        Self::any()
    }
}

impl PartialEq for VersionSpec {
    fn eq(&self, other: &Self) -> bool {
        self.to_range_string() == other.to_range_string()
    }
}

impl Eq for VersionSpec {}

impl PartialEq<str> for VersionSpec {
    fn eq(&self, other: &str) -> bool {
        self.to_range_string() == other
    }
}

impl PartialEq<&str> for VersionSpec {
    fn eq(&self, other: &&str) -> bool {
        self.to_range_string() == *other
    }
}

impl FromStr for VersionSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

fn parse_term(term: &str) -> Result<Specifier> {
    if term.is_empty() {
        return Err(Error::InvalidVersion {
            input: term.to_string(),
            reason: "empty version term".to_string(),
        });
    }
    match Operator::split(term) {
        Some((op, rest)) => Specifier::new(op, rest),
        // A bare version means an exact match.
        None if term.starts_with(|c: char| c.is_ascii_digit()) => {
            Specifier::new(Operator::Equal, term)
        }
        None => Err(Error::InvalidVersion {
            input: term.to_string(),
            reason: "expected a comparison operator".to_string(),
        }),
    }
}

#[derive(Clone, Copy)]
enum Shorthand {
    Caret,
    Tilde,
}

/// Expand `^X.Y.Z` / `~X.Y.Z` into a `>=lower,<upper` pair.
///
/// An epoch (`E!`) is kept on both bounds.
///
/// The lower bound is kept as written. The upper bound is computed from the
/// numeric release components only, so any pre-release or build suffix is
/// dropped before the bound component is incremented.
fn expand_shorthand(rest: &str, kind: Shorthand) -> Result<Vec<Specifier>> {
    let rest = rest.trim();
    let lower = Specifier::new(Operator::GreaterEqual, rest)?;

    let caps = SHORTHAND_PATTERN
        .captures(rest)
        .ok_or_else(|| Error::InvalidVersion {
            input: rest.to_string(),
            reason: "expected a dotted numeric version".to_string(),
        })?;
    let epoch = caps.get(1).map(|m| format!("{}!", m.as_str())).unwrap_or_default();
    let parts: Vec<u64> = (2..=4)
        .filter_map(|index| caps.get(index))
        .map(|m| {
            m.as_str().parse::<u64>().map_err(|_| Error::InvalidVersion {
                input: rest.to_string(),
                reason: format!("number out of range: {}", m.as_str()),
            })
        })
        .collect::<Result<_>>()?;

    let bump = match kind {
        // Bump the left-most non-zero component; all zeros bumps the last one.
        Shorthand::Caret => parts
            .iter()
            .position(|part| *part != 0)
            .unwrap_or(parts.len() - 1),
        Shorthand::Tilde => usize::from(parts.len() > 1),
    };

    let upper: Vec<String> = parts
        .iter()
        .enumerate()
        .map(|(index, part)| match index.cmp(&bump) {
            Ordering::Less => Ok(part.to_string()),
            Ordering::Equal => part
                .checked_add(1)
                .map(|part| part.to_string())
                .ok_or_else(|| Error::InvalidVersion {
                    input: rest.to_string(),
                    reason: format!("number out of range: {part}"),
                }),
            Ordering::Greater => Ok("0".to_string()),
        })
        .collect::<Result<_>>()?;

    Ok(vec![lower, Specifier::new(Operator::Less, &format!("{epoch}{}", upper.join(".")))?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("^0.1.0", ">=0.1.0,<0.2.0")]
    #[case("^1.1.0", ">=1.1.0,<2.0.0")]
    #[case("^0.0.3", ">=0.0.3,<0.0.4")]
    #[case("^1.2", ">=1.2,<2.0")]
    #[case("^0", ">=0,<1")]
    #[case("~0.1.0", ">=0.1.0,<0.2.0")]
    #[case("~1.1.0", ">=1.1.0,<1.2.0")]
    #[case("~1", ">=1,<2")]
    #[case("^1.0.0rc1", ">=1.0.0rc1,<2.0.0")]
    #[case("^1!2.0", ">=1!2.0,<1!3.0")]
    #[case("~2!1.4.0", ">=2!1.4.0,<2!1.5.0")]
    #[case("~=1.4.5", "~=1.4.5")]
    #[case("1.0.0", "==1.0.0")]
    #[case("=1.0.0", "==1.0.0")]
    #[case(">=1.0.0, <2.0.0", ">=1.0.0,<2.0.0")]
    #[case("!=1.5.7,<2.0,>=1.5.6", "!=1.5.7,<2.0,>=1.5.6")]
    #[case("==1.2.*", "==1.2.*")]
    #[case("*", "")]
    #[case("", "")]
    fn test_normalized_range(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(VersionSpec::parse(input).unwrap().to_range_string(), expected);
    }

    #[test]
    fn test_shorthand_keeps_epoch() {
        let spec = VersionSpec::parse("^1!2.0").unwrap();
        assert!(spec.accepts("1!2.5").unwrap());
        assert!(!spec.accepts("1!3.0").unwrap());
        assert!(!spec.accepts("2.5").unwrap());
    }

    #[rstest]
    #[case(">=1.0.0,<1.1.x")]
    #[case(">=")]
    #[case("1.0,")]
    #[case("latest")]
    #[case("^x.1")]
    #[case("~=1")]
    #[case(">=1.0 || <0.5")]
    fn test_invalid_specs(#[case] input: &str) {
        let err = VersionSpec::parse(input).unwrap_err();
        assert!(
            matches!(err, Error::InvalidVersionSpec { ref spec, .. } if spec == input.trim()),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn test_invalid_spec_names_token() {
        let err = VersionSpec::parse(">=1.0.0,<1.1.x").unwrap_err();
        assert!(err.to_string().contains("1.1.x"), "{err}");
    }

    #[test]
    fn test_wildcard_is_falsy_and_equal() {
        assert!(VersionSpec::parse("*").unwrap().is_any());
        assert!(!VersionSpec::parse(">=1").unwrap().is_any());
        assert_eq!(VersionSpec::parse("*").unwrap(), VersionSpec::parse("").unwrap());
    }

    #[test]
    fn test_equality_by_normalized_string() {
        let caret = VersionSpec::parse("^1.1.0").unwrap();
        assert_eq!(caret, VersionSpec::parse(">=1.1.0,<2.0.0").unwrap());
        assert!(caret == ">=1.1.0,<2.0.0");
        assert_eq!(caret.to_string(), "^1.1.0");
    }

    #[rstest]
    #[case(">=3.8", "3.10", true)]
    #[case(">=3.8", "3.7.9", false)]
    #[case("<2.0.0", "2.0.0rc1", false)]
    #[case("<2.0.0rc2", "2.0.0rc1", true)]
    #[case(">1.0", "1.0.post1", false)]
    #[case(">1.0", "1.0.1", true)]
    #[case("==1.0", "1.0.0", true)]
    #[case("==1.0", "1.0+local", true)]
    #[case("!=1.5.7,<2.0,>=1.5.6", "1.5.7", false)]
    #[case("!=1.5.7,<2.0,>=1.5.6", "1.6", true)]
    #[case("==1.2.*", "1.2.9", true)]
    #[case("==1.2.*", "1.3.0", false)]
    #[case("!=1.2.*", "1.3.0", true)]
    #[case("~=1.4.5", "1.4.9", true)]
    #[case("~=1.4.5", "1.5.0", false)]
    #[case("~=2.2", "2.9", true)]
    #[case("~=2.2", "3.0", false)]
    #[case("===1.0", "1.0", true)]
    #[case("===1.0", "1.0.0", false)]
    #[case("*", "0.0.1.dev4", true)]
    fn test_accepts(#[case] spec: &str, #[case] version: &str, #[case] expected: bool) {
        assert_eq!(VersionSpec::parse(spec).unwrap().accepts(version).unwrap(), expected);
    }

    #[test]
    fn test_accepts_rejects_malformed_candidate() {
        let err = VersionSpec::parse(">=1.0").unwrap().accepts("one.two").unwrap_err();
        assert!(matches!(err, Error::InvalidVersion { ref input, .. } if input == "one.two"));
    }

    #[test]
    fn test_version_ordering() {
        let ordered = [
            "1.0.dev0", "1.0a1", "1.0a2.dev1", "1.0a2", "1.0b1", "1.0rc1", "1.0", "1.0.post1.dev0",
            "1.0.post1", "1.1", "1!0.1",
        ];
        let versions: Vec<Version> = ordered.iter().map(|v| Version::parse(v).unwrap()).collect();
        for pair in versions.windows(2) {
            assert!(pair[0] < pair[1], "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_version_trailing_zeros_equal() {
        assert_eq!(Version::parse("1.0").unwrap(), Version::parse("1.0.0").unwrap());
    }

    #[test]
    fn test_version_display_normalizes() {
        assert_eq!(Version::parse("1.0-RC.1").unwrap().to_string(), "1.0rc1");
        assert_eq!(Version::parse("2!1.0.post-3").unwrap().to_string(), "2!1.0.post3");
        assert_eq!(Version::parse("1.0-5").unwrap().to_string(), "1.0.post5");
    }
}
