//! Include/exclude rules deciding which entries are extracted and which
//! classes are staged for transformation.

use regex::{Regex, RegexBuilder};
use std::fmt::{Display, Formatter};

#[derive(Debug, thiserror::Error)]
#[error("Invalid pattern {pattern:?}: {source}")]
pub struct RuleError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Group {
    /// Matched against the raw entry path of plain files.
    Extract,
    /// Matched against the dotted logical name of classes.
    Transform,
}

/// One include list and one exclude list. Patterns are regular expressions that
/// must match the whole text, ignoring case.
#[derive(Debug, Clone, Default)]
pub struct RuleGroup {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl RuleGroup {
    pub fn new<I, E>(include: I, exclude: E) -> Result<Self, RuleError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Ok(Self {
            include: compile_all(include)?,
            exclude: compile_all(exclude)?,
        })
    }

    /// Builds a group from newline separated pattern lists. Blank lines are ignored.
    pub fn from_lines(include: &str, exclude: &str) -> Result<Self, RuleError> {
        Self::new(include.lines(), exclude.lines())
    }

    /// True if `text` matches at least one include pattern and no exclude
    /// pattern. A group without include patterns matches nothing.
    pub fn matches(&self, text: &str) -> bool {
        self.include.iter().any(|p| p.is_match(text))
            && !self.exclude.iter().any(|p| p.is_match(text))
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
    }
}

fn compile_all<T: AsRef<str>>(patterns: impl IntoIterator<Item = T>) -> Result<Vec<Regex>, RuleError> {
    patterns
        .into_iter()
        .filter(|p| !p.as_ref().trim().is_empty())
        .map(|p| compile(p.as_ref()))
        .collect()
}

fn compile(pattern: &str) -> Result<Regex, RuleError> {
    RegexBuilder::new(&format!("^(?:{pattern})$"))
        .case_insensitive(true)
        .build()
        .map_err(|source| RuleError {
            pattern: pattern.to_string(),
            source,
        })
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub extract: RuleGroup,
    pub transform: RuleGroup,
}

impl RuleSet {
    pub fn new(extract: RuleGroup, transform: RuleGroup) -> Self {
        Self { extract, transform }
    }

    pub fn group(&self, group: Group) -> &RuleGroup {
        match group {
            Group::Extract => &self.extract,
            Group::Transform => &self.transform,
        }
    }

    pub fn matches(&self, group: Group, text: &str) -> bool {
        self.group(group).matches(text)
    }
}

impl Display for RuleSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let patterns = |r: &[Regex]| r.len();
        write!(
            f,
            "RuleSet(extract=+{}/-{}, transform=+{}/-{})",
            patterns(&self.extract.include),
            patterns(&self.extract.exclude),
            patterns(&self.transform.include),
            patterns(&self.transform.exclude),
        )
    }
}
