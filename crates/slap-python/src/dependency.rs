//! Dependency declarations and their parsers.
//!
//! Dependencies arrive either as single strings (`requests[socks] >=2.0; os_name == "nt"`,
//! `kek @ git+https://example.com/kek.git#tag=v1`) or as structured TOML values in the
//! Poetry `dependencies` format. Both are normalized into a [`Dependency`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::version::VersionSpec;

static OPTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s--([\w-]+)=(\S*)").unwrap());

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?$").expect("Invalid package name regex")
});

static SCHEME_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]+:").unwrap());

static CANONICAL_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-_.]+").unwrap());

const PATH_PREFIXES: [&str; 3] = ["/", "./", "../"];
const URL_PREFIXES: [&str; 3] = ["git+", "http://", "https://"];

/// The reference a version control dependency is pinned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitRef {
    Rev(String),
    Branch(String),
    Tag(String),
}

impl GitRef {
    pub fn as_str(&self) -> &str {
        match self {
            GitRef::Rev(value) | GitRef::Branch(value) | GitRef::Tag(value) => value,
        }
    }

    fn key(&self) -> &'static str {
        match self {
            GitRef::Rev(_) => "rev",
            GitRef::Branch(_) => "branch",
            GitRef::Tag(_) => "tag",
        }
    }

    /// Build a reference from `rev`/`branch`/`tag` selectors, of which at most
    /// one may be set.
    fn from_selectors(
        input: &str,
        rev: Option<String>,
        branch: Option<String>,
        tag: Option<String>,
    ) -> Result<Option<Self>> {
        let mut selected = [rev.map(GitRef::Rev), branch.map(GitRef::Branch), tag.map(GitRef::Tag)]
            .into_iter()
            .flatten();
        let first = selected.next();
        if let Some(second) = selected.next() {
            return Err(Error::InvalidDependency {
                input: input.to_string(),
                reason: format!(
                    "conflicting version control references '{}' and '{}'",
                    first.map(|r| r.key()).unwrap_or_default(),
                    second.key()
                ),
            });
        }
        Ok(first)
    }
}

/// How a dependency is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyKind {
    /// Resolved from a package index.
    Registry {
        version: VersionSpec,
        /// Name of the index to install from.
        source: Option<String>,
    },
    /// Checked out from a Git repository.
    VersionControl {
        url: String,
        reference: Option<GitRef>,
    },
    /// A project on the local filesystem.
    Path { path: PathBuf, develop: bool, link: bool },
    /// A direct archive URL.
    Url { url: String },
    /// Several candidate declarations; at most one should apply to a given
    /// environment. Never empty and never nested.
    Alternatives(Vec<Dependency>),
}

/// A single dependency declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub extras: Vec<String>,
    /// Python versions the dependency applies to.
    pub python: Option<VersionSpec>,
    /// Environment markers, stored verbatim.
    pub markers: Option<String>,
    /// `algorithm:digest` pairs the installed archive must match.
    pub hashes: Vec<String>,
    pub kind: DependencyKind,
}

impl Dependency {
    fn new(name: impl Into<String>, kind: DependencyKind) -> Self {
        Self {
            name: name.into(),
            extras: Vec::new(),
            python: None,
            markers: None,
            hashes: Vec::new(),
            kind,
        }
    }

    /// A registry dependency accepting any version.
    pub fn registry(name: impl Into<String>) -> Self {
        Self::new(
            name,
            DependencyKind::Registry {
                version: VersionSpec::any(),
                source: None,
            },
        )
    }

    /// Parse a dependency string, see [`parse_dependency_string`].
    pub fn parse(value: &str) -> Result<Self> {
        parse_dependency_string(value)
    }

    /// Parse a structured configuration, see [`parse_dependency_config`].
    pub fn from_config(name: &str, value: &toml::Value) -> Result<Self> {
        parse_dependency_config(name, value)
    }

    /// The PEP 503 normalized name.
    pub fn canonical_name(&self) -> String {
        canonicalize_name(&self.name)
    }
}

impl FromStr for Dependency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_dependency_string(s)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }

        match &self.kind {
            DependencyKind::Registry { version, .. } => {
                if !version.is_any() {
                    write!(f, " {version}")?;
                }
            }
            DependencyKind::VersionControl { url, reference } => {
                write!(f, " @ git+{url}")?;
                if let Some(reference) = reference {
                    write!(f, "#{}={}", reference.key(), reference.as_str())?;
                }
            }
            DependencyKind::Path { path, develop, link } => {
                write!(f, " @ {}", path.display())?;
                let flags: Vec<&str> = [(*develop, "develop"), (*link, "link")]
                    .into_iter()
                    .filter_map(|(set, flag)| set.then_some(flag))
                    .collect();
                if !flags.is_empty() {
                    write!(f, "#{}", flags.join("&"))?;
                }
            }
            DependencyKind::Url { url } => write!(f, " @ {url}")?,
            DependencyKind::Alternatives(alternatives) => {
                let rendered: Vec<String> = alternatives.iter().map(ToString::to_string).collect();
                return write!(f, " {{ {} }}", rendered.join(" | "));
            }
        }

        if let Some(markers) = &self.markers {
            write!(f, "; {markers}")?;
        }
        for hash in &self.hashes {
            write!(f, " --hash={hash}")?;
        }
        Ok(())
    }
}

/// Normalize a distribution name per PEP 503: lowercase, with runs of `-`,
/// `_` and `.` collapsed to a single `-`.
pub fn canonicalize_name(name: &str) -> String {
    CANONICAL_SEPARATORS
        .replace_all(name.trim(), "-")
        .to_ascii_lowercase()
}

/// Split `name[extra, ...]` into the name and its extras.
///
/// ```
/// # use slap_python::split_package_name_with_extras;
/// let (name, extras) = split_package_name_with_extras(" bruv-kek    [ docs , internal] ").unwrap();
/// assert_eq!(name, "bruv-kek");
/// assert_eq!(extras, vec!["docs", "internal"]);
/// ```
pub fn split_package_name_with_extras(value: &str) -> Result<(String, Vec<String>)> {
    let invalid = || Error::InvalidExtras {
        input: value.to_string(),
    };
    let trimmed = value.trim();

    let (name, extras) = match trimmed.find('[') {
        Some(open) => {
            let inner = trimmed[open + 1..].strip_suffix(']').ok_or_else(invalid)?;
            if inner.contains(['[', ']']) || inner.trim().is_empty() {
                return Err(invalid());
            }
            let extras = inner
                .split(',')
                .map(|extra| extra.trim().to_string())
                .collect::<Vec<_>>();
            if extras.iter().any(String::is_empty) {
                return Err(invalid());
            }
            (trimmed[..open].trim(), extras)
        }
        None if trimmed.contains(']') => return Err(invalid()),
        None => (trimmed, Vec::new()),
    };

    if !NAME_PATTERN.is_match(name) {
        return Err(Error::InvalidDependency {
            input: value.to_string(),
            reason: if name.is_empty() {
                "missing package name".to_string()
            } else {
                format!("invalid package name '{name}'")
            },
        });
    }

    Ok((name.to_string(), extras))
}

/// Parse a single dependency string.
///
/// Accepted forms:
///
/// * `name[extras] range`, where `range` is a version spec, optionally in
///   parentheses; a bare version like `name 1.0` means exact equality.
/// * `name[extras] @ git+URL[#rev=..|branch=..|tag=..]`
/// * `name[extras] @ ./path[#develop&link]` (also `/` and `../`)
/// * `name[extras] @ scheme://URL[#algo=digest&...]`
///
/// Any form may be followed by `; markers` and by `--hash=algo:digest`
/// options.
pub fn parse_dependency_string(value: &str) -> Result<Dependency> {
    let input = value.trim();
    let invalid = |reason: &str| Error::InvalidDependency {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if URL_PREFIXES.iter().chain(&PATH_PREFIXES).any(|prefix| input.starts_with(prefix)) {
        return Err(invalid("a URL or path must be prefixed with a package name ('name @ target')"));
    }

    let mut hashes = Vec::new();
    let mut rejected = None;
    let stripped = OPTION_PATTERN.replace_all(input, |caps: &regex::Captures<'_>| {
        if rejected.is_some() {
            return "";
        }
        if &caps[1] != "hash" {
            rejected = Some(format!("unsupported option '--{}'", &caps[1]));
        } else if caps[2].is_empty() {
            rejected = Some("option '--hash' requires a value".to_string());
        } else {
            hashes.push(caps[2].to_string());
        }
        ""
    });
    if let Some(reason) = rejected {
        return Err(invalid(&reason));
    }

    let (head, markers) = match stripped.split_once(';') {
        Some((head, markers)) => (head.trim(), Some(markers.trim()).filter(|m| !m.is_empty())),
        None => (stripped.trim(), None),
    };

    let mut dependency = match head.split_once('@') {
        Some((name, target)) => parse_target(input, name, target.trim(), &mut hashes)?,
        None => parse_registry(input, head)?,
    };

    dependency.markers = markers.map(str::to_string);
    dependency.hashes = hashes;
    Ok(dependency)
}

fn parse_target(input: &str, name: &str, target: &str, hashes: &mut Vec<String>) -> Result<Dependency> {
    let (name, extras) = split_package_name_with_extras(name)?;
    let (location, fragment) = match target.split_once('#') {
        Some((location, fragment)) => (location, fragment),
        None => (target, ""),
    };
    let pairs: Vec<(&str, &str)> = fragment
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .collect();

    let kind = if let Some(url) = location.strip_prefix("git+") {
        let mut rev = None;
        let mut branch = None;
        let mut tag = None;
        for (key, value) in &pairs {
            let slot = match *key {
                "rev" => &mut rev,
                "branch" => &mut branch,
                "tag" => &mut tag,
                other => {
                    tracing::warn!(dependency = %input, key = other, "ignoring unknown git URL fragment");
                    continue;
                }
            };
            if slot.replace(value.to_string()).is_some() {
                return Err(Error::InvalidDependency {
                    input: input.to_string(),
                    reason: format!("'{key}' is given more than once"),
                });
            }
        }
        DependencyKind::VersionControl {
            url: url.to_string(),
            reference: GitRef::from_selectors(input, rev, branch, tag)?,
        }
    } else if PATH_PREFIXES.iter().any(|prefix| location.starts_with(prefix)) {
        DependencyKind::Path {
            path: PathBuf::from(location),
            develop: pairs.iter().any(|(key, _)| *key == "develop"),
            link: pairs.iter().any(|(key, _)| *key == "link"),
        }
    } else if SCHEME_PATTERN.is_match(location) {
        if let Some((algo, _)) = pairs.iter().find(|(_, digest)| digest.is_empty()) {
            return Err(Error::InvalidDependency {
                input: input.to_string(),
                reason: format!("hash '{algo}' in URL fragment has no digest"),
            });
        }
        hashes.extend(pairs.iter().map(|(algo, digest)| format!("{algo}:{digest}")));
        DependencyKind::Url {
            url: location.to_string(),
        }
    } else {
        return Err(Error::InvalidDependency {
            input: input.to_string(),
            reason: format!("'{target}' is neither a URL nor a path starting with '/', './' or '../'"),
        });
    };

    let mut dependency = Dependency::new(name, kind);
    dependency.extras = extras;
    Ok(dependency)
}

fn parse_registry(input: &str, head: &str) -> Result<Dependency> {
    let name_end = head
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        .unwrap_or(head.len());
    let mut rest = head[name_end..].trim_start();

    let mut name_with_extras = head[..name_end].to_string();
    if rest.starts_with('[') {
        let close = rest.find(']').ok_or_else(|| Error::InvalidExtras {
            input: head.to_string(),
        })?;
        name_with_extras.push_str(&rest[..=close]);
        rest = rest[close + 1..].trim_start();
    }
    let (name, extras) = split_package_name_with_extras(&name_with_extras)?;

    let mut range = rest.trim();
    if range.contains(['[', ']']) {
        return Err(Error::InvalidExtras {
            input: head.to_string(),
        });
    }
    if let Some(inner) = range.strip_prefix('(') {
        range = inner.strip_suffix(')').ok_or_else(|| Error::InvalidDependency {
            input: input.to_string(),
            reason: format!("unbalanced parentheses in '{range}'"),
        })?;
        range = range.trim();
    }

    let version = if range.starts_with(|c: char| c.is_ascii_digit()) {
        VersionSpec::parse(&format!("={range}"))?
    } else {
        VersionSpec::parse(range)?
    };

    let mut dependency = Dependency::new(name, DependencyKind::Registry { version, source: None });
    dependency.extras = extras;
    Ok(dependency)
}

/// Parse a dependency from its structured configuration.
///
/// A string is parsed like a dependency string with `name` prepended. A
/// table is dispatched on the `git`, `path`, `url` and `version` keys, in
/// that order, and may carry `python`, `markers` and `extras`. An array
/// yields [`DependencyKind::Alternatives`].
pub fn parse_dependency_config(name: &str, value: &toml::Value) -> Result<Dependency> {
    match value {
        toml::Value::Array(items) => {
            if items.is_empty() {
                return Err(config_error(name, "an empty list of alternatives"));
            }
            let alternatives = items
                .iter()
                .map(|item| match item {
                    toml::Value::Array(_) => Err(config_error(name, "nested lists of alternatives")),
                    item => parse_single_config(name, item),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Dependency::new(name, DependencyKind::Alternatives(alternatives)))
        }
        value => parse_single_config(name, value),
    }
}

fn config_error(name: &str, reason: &str) -> Error {
    Error::InvalidConfig {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_single_config(name: &str, value: &toml::Value) -> Result<Dependency> {
    match value {
        toml::Value::String(text) => {
            let text = text.trim();
            if URL_PREFIXES.iter().chain(&PATH_PREFIXES).any(|prefix| text.starts_with(prefix)) {
                parse_dependency_string(&format!("{name} @ {text}"))
            } else if text.starts_with(|c: char| c.is_ascii_digit()) {
                parse_dependency_string(&format!("{name} ={text}"))
            } else {
                parse_dependency_string(&format!("{name} {text}"))
            }
        }
        toml::Value::Table(table) => parse_table_config(name, table),
        other => Err(config_error(
            name,
            &format!("expected a string, table or list, found {}", other.type_str()),
        )),
    }
}

fn parse_table_config(name: &str, table: &toml::Table) -> Result<Dependency> {
    let string = |key: &str| -> Result<Option<String>> {
        match table.get(key) {
            None => Ok(None),
            Some(toml::Value::String(value)) => Ok(Some(value.clone())),
            Some(other) => Err(config_error(
                name,
                &format!("'{key}' must be a string, found {}", other.type_str()),
            )),
        }
    };
    let flag = |key: &str| -> Result<bool> {
        match table.get(key) {
            None => Ok(false),
            Some(toml::Value::Boolean(value)) => Ok(*value),
            Some(other) => Err(config_error(
                name,
                &format!("'{key}' must be a boolean, found {}", other.type_str()),
            )),
        }
    };

    let kind = if let Some(url) = string("git")? {
        let url = url.strip_prefix("git+").unwrap_or(&url).to_string();
        let reference = GitRef::from_selectors(name, string("rev")?, string("branch")?, string("tag")?)?;
        DependencyKind::VersionControl { url, reference }
    } else if let Some(path) = string("path")? {
        DependencyKind::Path {
            path: PathBuf::from(path),
            develop: flag("develop")?,
            link: flag("link")?,
        }
    } else if let Some(url) = string("url")? {
        DependencyKind::Url { url }
    } else if let Some(version) = string("version")? {
        DependencyKind::Registry {
            version: VersionSpec::parse(&version)?,
            source: string("source")?,
        }
    } else {
        return Err(config_error(name, "expected one of the keys 'git', 'path', 'url' or 'version'"));
    };

    let mut dependency = Dependency::new(name, kind);
    dependency.python = string("python")?
        .filter(|python| !python.trim().is_empty())
        .map(|python| VersionSpec::parse(&python))
        .transpose()?;
    dependency.markers = string("markers")?;
    dependency.extras = match table.get("extras") {
        None => Vec::new(),
        Some(toml::Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| config_error(name, "'extras' must be a list of strings"))
            })
            .collect::<Result<_>>()?,
        Some(_) => return Err(config_error(name, "'extras' must be a list of strings")),
    };
    Ok(dependency)
}

/// Parse a collection of dependencies.
///
/// Accepts an array of dependency strings or a table mapping names to
/// configurations (see [`parse_dependency_config`]).
pub fn parse_dependencies(value: &toml::Value) -> Result<Vec<Dependency>> {
    match value {
        toml::Value::Array(items) => items
            .iter()
            .map(|item| match item {
                toml::Value::String(text) => parse_dependency_string(text),
                other => Err(Error::InvalidDependency {
                    input: other.to_string(),
                    reason: "expected a dependency string".to_string(),
                }),
            })
            .collect(),
        toml::Value::Table(table) => table
            .iter()
            .map(|(name, config)| parse_dependency_config(name, config))
            .collect(),
        other => Err(Error::InvalidDependency {
            input: other.to_string(),
            reason: format!("expected an array or a table, found {}", other.type_str()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn registry(name: &str, version: &str) -> Dependency {
        Dependency::new(
            name,
            DependencyKind::Registry {
                version: VersionSpec::parse(version).unwrap(),
                source: None,
            },
        )
    }

    fn config(source: &str) -> toml::Value {
        let table: toml::Table = toml::from_str(&format!("dep = {source}")).unwrap();
        table["dep"].clone()
    }

    #[rstest]
    #[case("kek[docs, internal]", "kek", &["docs", "internal"])]
    #[case(" bruv-kek    [ docs , internal] ", "bruv-kek", &["docs", "internal"])]
    #[case("kek", "kek", &[])]
    #[case("Foo.Bar_baz", "Foo.Bar_baz", &[])]
    fn test_split_package_name_with_extras(#[case] input: &str, #[case] name: &str, #[case] extras: &[&str]) {
        let (parsed_name, parsed_extras) = split_package_name_with_extras(input).unwrap();
        assert_eq!(parsed_name, name);
        assert_eq!(parsed_extras, extras);
    }

    #[rstest]
    #[case("kek[docs")]
    #[case("kek docs]")]
    #[case("kek[]")]
    #[case("kek[docs,]")]
    #[case("kek[docs,,internal]")]
    #[case("kek[[docs]]")]
    #[case("[docs]")]
    fn test_split_rejects_malformed_extras(#[case] input: &str) {
        assert!(split_package_name_with_extras(input).is_err(), "{input}");
    }

    #[rstest]
    #[case("requests", "requests", "*")]
    #[case("requests >=2.0,<3", "requests", ">=2.0,<3")]
    #[case("requests>=2.0", "requests", ">=2.0")]
    #[case("requests (>=2.0,<3)", "requests", ">=2.0,<3")]
    #[case("requests ^2.1", "requests", "^2.1")]
    #[case("requests ~=2.1", "requests", "~=2.1")]
    #[case("requests 2.1.0", "requests", "==2.1.0")]
    fn test_parse_registry(#[case] input: &str, #[case] name: &str, #[case] version: &str) {
        let dependency = parse_dependency_string(input).unwrap();
        assert_eq!(dependency, registry(name, version));
    }

    #[test]
    fn test_parse_registry_with_extras_markers_and_hashes() {
        let dependency =
            parse_dependency_string("kek[docs] >=1.0; python_version < '3.11' --hash=sha256:abc --hash=md5:def")
                .unwrap();
        let mut expected = registry("kek", ">=1.0");
        expected.extras = vec!["docs".to_string()];
        expected.markers = Some("python_version < '3.11'".to_string());
        expected.hashes = vec!["sha256:abc".to_string(), "md5:def".to_string()];
        assert_eq!(dependency, expected);
    }

    #[test]
    fn test_parse_git_branch() {
        let dependency = parse_dependency_string("kek @ git+https://example.com/kek.git#branch=develop").unwrap();
        assert_eq!(
            dependency.kind,
            DependencyKind::VersionControl {
                url: "https://example.com/kek.git".to_string(),
                reference: Some(GitRef::Branch("develop".to_string())),
            }
        );
    }

    #[test]
    fn test_parse_git_conflicting_references() {
        let err = parse_dependency_string("kek @ git+https://example.com/kek.git#branch=develop&tag=v1").unwrap_err();
        assert!(err.to_string().contains("conflicting"), "{err}");
    }

    #[rstest]
    #[case("kek @ ./kek", "./kek", false, false)]
    #[case("kek @ ../kek#develop", "../kek", true, false)]
    #[case("kek @ /opt/kek#link&develop", "/opt/kek", true, true)]
    fn test_parse_path(#[case] input: &str, #[case] path: &str, #[case] develop: bool, #[case] link: bool) {
        let dependency = parse_dependency_string(input).unwrap();
        assert_eq!(
            dependency.kind,
            DependencyKind::Path {
                path: PathBuf::from(path),
                develop,
                link,
            }
        );
    }

    #[test]
    fn test_empty_hash_is_reported() {
        let err = parse_dependency_string("kek >=1.0 --hash=").unwrap_err();
        assert!(err.to_string().contains("'--hash' requires a value"), "{err}");
    }

    #[test]
    fn test_parse_url_fragment_hashes() {
        let dependency =
            parse_dependency_string("kek @ https://example.com/kek-1.0.tar.gz#sha256=abc --hash=md5:def").unwrap();
        assert_eq!(
            dependency.kind,
            DependencyKind::Url {
                url: "https://example.com/kek-1.0.tar.gz".to_string()
            }
        );
        assert_eq!(dependency.hashes, vec!["md5:def", "sha256:abc"]);
    }

    #[rstest]
    #[case("kek @ kek/kek")]
    #[case("https://example.com/kek.tar.gz")]
    #[case("git+https://example.com/kek.git")]
    #[case("./kek")]
    #[case("@ ./kek")]
    #[case(">=1.0")]
    #[case("")]
    #[case("kek >=1.0 --index-url=https://example.com")]
    #[case("kek (>=1.0")]
    #[case("kek >=1.0 [docs]")]
    #[case("kek >=1.0 --hash=")]
    #[case("kek >=1.0 --hash= --hash=sha256:abc")]
    #[case("kek @ https://example.com/kek.zip#sha256=")]
    fn test_parse_rejects(#[case] input: &str) {
        assert!(parse_dependency_string(input).is_err(), "{input}");
    }

    #[test]
    fn test_config_string_forms() {
        assert_eq!(parse_dependency_config("kek", &config("\"1.2.3\"")).unwrap(), registry("kek", "==1.2.3"));
        assert_eq!(parse_dependency_config("kek", &config("\"^1.2\"")).unwrap(), registry("kek", ">=1.2,<2.0"));
        assert_eq!(
            parse_dependency_config("kek", &config("\"git+https://example.com/kek.git\""))
                .unwrap()
                .kind,
            DependencyKind::VersionControl {
                url: "https://example.com/kek.git".to_string(),
                reference: None,
            }
        );
    }

    #[test]
    fn test_config_table_forms() {
        let dependency = parse_dependency_config(
            "kek",
            &config(r#"{ version = "^1.0", source = "internal", python = ">=3.8", markers = "os_name == 'nt'", extras = ["docs"] }"#),
        )
        .unwrap();
        let mut expected = Dependency::new(
            "kek",
            DependencyKind::Registry {
                version: VersionSpec::parse("^1.0").unwrap(),
                source: Some("internal".to_string()),
            },
        );
        expected.python = Some(VersionSpec::parse(">=3.8").unwrap());
        expected.markers = Some("os_name == 'nt'".to_string());
        expected.extras = vec!["docs".to_string()];
        assert_eq!(dependency, expected);

        let dependency =
            parse_dependency_config("kek", &config(r#"{ path = "../kek", develop = true, link = true }"#)).unwrap();
        assert_eq!(
            dependency.kind,
            DependencyKind::Path {
                path: PathBuf::from("../kek"),
                develop: true,
                link: true,
            }
        );

        let dependency = parse_dependency_config("kek", &config(r#"{ url = "https://example.com/kek.zip" }"#)).unwrap();
        assert_eq!(
            dependency.kind,
            DependencyKind::Url {
                url: "https://example.com/kek.zip".to_string()
            }
        );
    }

    #[test]
    fn test_config_git_takes_priority() {
        let dependency = parse_dependency_config(
            "kek",
            &config(r#"{ git = "https://example.com/kek.git", tag = "v1", version = "1.0" }"#),
        )
        .unwrap();
        assert_eq!(
            dependency.kind,
            DependencyKind::VersionControl {
                url: "https://example.com/kek.git".to_string(),
                reference: Some(GitRef::Tag("v1".to_string())),
            }
        );
    }

    #[rstest]
    #[case(r#"{ optional = true }"#)]
    #[case(r#"{ git = "https://example.com/kek.git", rev = "abc", branch = "main" }"#)]
    #[case(r#"{ version = "1.0", extras = "docs" }"#)]
    #[case(r#"{ path = "../kek", develop = "yes" }"#)]
    #[case("[]")]
    #[case("[[\"1.0\"]]")]
    #[case("42")]
    fn test_config_rejects(#[case] source: &str) {
        assert!(parse_dependency_config("kek", &config(source)).is_err(), "{source}");
    }

    #[test]
    fn test_config_alternatives() {
        let dependency = parse_dependency_config(
            "kek",
            &config(r#"[{ version = "1.0", python = "<3.8" }, { version = "2.0", python = ">=3.8" }]"#),
        )
        .unwrap();
        let DependencyKind::Alternatives(alternatives) = &dependency.kind else {
            panic!("expected alternatives, got {:?}", dependency.kind);
        };
        assert_eq!(alternatives.len(), 2);
        assert!(alternatives.iter().all(|alternative| alternative.name == "kek"));
    }

    #[test]
    fn test_parse_dependencies_table_and_array() {
        let value: toml::Value = toml::from_str(
            r#"
            list = ["a >=1", "b @ ./b"]
            [table]
            c = "^1.0"
            d = { path = "./d" }
            "#,
        )
        .unwrap();
        let names = |deps: Vec<Dependency>| deps.into_iter().map(|dep| dep.name).collect::<Vec<_>>();
        assert_eq!(names(parse_dependencies(&value["list"]).unwrap()), vec!["a", "b"]);
        assert_eq!(names(parse_dependencies(&value["table"]).unwrap()), vec!["c", "d"]);
        assert!(parse_dependencies(&toml::Value::Integer(1)).is_err());
    }

    #[rstest]
    #[case("Foo.Bar", "foo-bar")]
    #[case("foo__bar", "foo-bar")]
    #[case("foo-._bar", "foo-bar")]
    #[case("PyYAML", "pyyaml")]
    fn test_canonicalize_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(canonicalize_name(input), expected);
    }

    #[rstest]
    #[case("kek[docs] >=1.0; os_name == 'nt' --hash=sha256:abc")]
    #[case("kek @ git+https://example.com/kek.git#tag=v1")]
    #[case("kek @ ../kek#develop&link")]
    #[case("kek @ https://example.com/kek.zip")]
    fn test_display_reparses(#[case] input: &str) {
        let dependency = parse_dependency_string(input).unwrap();
        assert_eq!(parse_dependency_string(&dependency.to_string()).unwrap(), dependency);
    }
}
