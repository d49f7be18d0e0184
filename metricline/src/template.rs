//! Metric name templates.
//!
//! A metric template is a metric name in which each parenthesized group marks a variable segment,
//! e.g. `regionserver.Server.(\w+).regionCount` or `foo.(bar|baz).count`. Literal text outside the
//! groups must match verbatim; group bodies are pattern fragments and are copied through as
//! capture groups. The values captured from a concrete metric name are substituted into
//! destination property ids via positional placeholders (`$1`, `$2`, ...).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::TemplateError;

/// Collector wildcard substituted for each capture group when querying by metric name.
pub const QUERY_WILDCARD: &str = "%";

static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\d+)").expect("failed to compile placeholder regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Group(String),
}

fn parse_segments(template: &str) -> Result<Vec<Segment>, TemplateError> {
    let unbalanced = |offset: usize| TemplateError::UnbalancedParentheses { template: template.to_string(), offset };

    let mut segments = Vec::new();
    let mut mark = 0;
    let mut group_start = None;

    for (pos, c) in template.char_indices() {
        match (c, group_start) {
            ('(', None) => {
                if mark < pos {
                    segments.push(Segment::Literal(template[mark..pos].to_string()));
                }
                group_start = Some(pos);
            },
            (')', Some(start)) => {
                segments.push(Segment::Group(template[start + 1..pos].to_string()));
                group_start = None;
                mark = pos + 1;
            },
            ('(', Some(_)) | (')', None) => return Err(unbalanced(pos)),
            _ => {},
        }
    }

    if let Some(start) = group_start {
        return Err(unbalanced(start));
    }

    if mark < template.len() {
        segments.push(Segment::Literal(template[mark..].to_string()));
    }

    Ok(segments)
}

/// A metric template compiled into an anchored, exact-match regular expression.
#[derive(Clone)]
pub struct MetricPattern {
    template: String,
    segments: Vec<Segment>,
    regex: Regex,
    query_name: String,
}

impl fmt::Debug for MetricPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricPattern")
            .field("template", &self.template)
            .field("regex", &self.regex.as_str())
            .finish()
    }
}

impl PartialEq for MetricPattern {
    fn eq(&self, other: &Self) -> bool {
        self.template == other.template
    }
}

impl Eq for MetricPattern {}

impl fmt::Display for MetricPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template.as_str())
    }
}

impl MetricPattern {
    pub fn compile(template: impl Into<String>) -> Result<Self, TemplateError> {
        let template = template.into();
        let segments = parse_segments(template.as_str())?;

        let body: String = segments
            .iter()
            .map(|s| match s {
                Segment::Literal(text) => regex::escape(text),
                Segment::Group(fragment) => format!("({fragment})"),
            })
            .collect();

        let regex = Regex::new(format!("^(?:{body})$").as_str())
            .map_err(|source| TemplateError::InvalidPattern { template: template.clone(), source })?;

        let query_name = segments
            .iter()
            .map(|s| match s {
                Segment::Literal(text) => text.as_str(),
                Segment::Group(_) => QUERY_WILDCARD,
            })
            .collect();

        Ok(Self { template, segments, regex, query_name })
    }

    pub fn template(&self) -> &str {
        self.template.as_str()
    }

    /// The template with each capture group collapsed to the collector wildcard, so the
    /// collector filters candidate names server-side.
    pub fn query_name(&self) -> &str {
        self.query_name.as_str()
    }

    pub fn capture_count(&self) -> usize {
        self.regex.captures_len() - 1
    }

    pub fn is_literal(&self) -> bool {
        self.capture_count() == 0
    }

    pub fn is_match(&self, metric_name: &str) -> bool {
        self.regex.is_match(metric_name)
    }

    /// Captured segments, in left-to-right order, when `metric_name` fully matches the template.
    /// A group that does not participate in the match captures the empty string.
    pub fn captures(&self, metric_name: &str) -> Option<Vec<String>> {
        self.regex.captures(metric_name).map(|caps| {
            caps.iter()
                .skip(1)
                .map(|c| c.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect()
        })
    }

    /// Replaces the k-th capture group with `arguments[k]` (1-indexed), yielding a concrete
    /// metric name. Returns `None` unless every group has an argument and the result is matched
    /// by this template with exactly those captures.
    pub fn instantiate(&self, arguments: &BTreeMap<usize, String>) -> Option<String> {
        let mut group = 0;
        let mut name = String::with_capacity(self.template.len());
        for segment in self.segments.iter() {
            match segment {
                Segment::Literal(text) => name.push_str(text),
                Segment::Group(_) => {
                    group += 1;
                    name.push_str(arguments.get(&group)?);
                },
            }
        }

        let expected: Vec<String> = (1..=group).filter_map(|k| arguments.get(&k).cloned()).collect();
        match self.captures(name.as_str()) {
            Some(actual) if actual == expected => Some(name),
            _ => None,
        }
    }
}

/// Result of matching a concrete metric name against a [`PatternSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMatch<'p> {
    pub pattern: &'p MetricPattern,
    pub arguments: Vec<String>,
}

/// Compiled templates kept in template order, which is also the order they are tried in; the
/// first full match wins.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<MetricPattern>,
}

impl PatternSet {
    pub fn compile<I, S>(templates: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut result = Self::default();
        for template in templates {
            result.insert(MetricPattern::compile(template)?);
        }
        Ok(result)
    }

    /// Adds `pattern` unless its template is already present.
    pub fn insert(&mut self, pattern: MetricPattern) -> bool {
        match self
            .patterns
            .binary_search_by(|p| p.template().cmp(pattern.template()))
        {
            Ok(_) => false,
            Err(position) => {
                self.patterns.insert(position, pattern);
                true
            },
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn find_match(&self, metric_name: &str) -> Option<TemplateMatch<'_>> {
        self.patterns.iter().find_map(|pattern| {
            pattern
                .captures(metric_name)
                .map(|arguments| TemplateMatch { pattern, arguments })
        })
    }
}

pub fn contains_arguments(property_id: &str) -> bool {
    PLACEHOLDER_REGEX.is_match(property_id)
}

/// Positional placeholder indices (`$k`) referenced by a property id.
pub fn placeholders(property_id: &str) -> BTreeSet<usize> {
    PLACEHOLDER_REGEX
        .captures_iter(property_id)
        .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().parse().ok()))
        .collect()
}

/// Replaces each `$k` in `property_id` with the k-th argument (1-indexed). Placeholders without
/// a corresponding argument are left as is.
pub fn substitute_arguments(property_id: &str, arguments: &[String]) -> String {
    PLACEHOLDER_REGEX
        .replace_all(property_id, |caps: &regex::Captures<'_>| {
            let index: Option<usize> = caps[1].parse().ok();
            match index.and_then(|k| k.checked_sub(1)).and_then(|k| arguments.get(k)) {
                Some(argument) => argument.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Matches concrete property ids against a property id holding placeholders, e.g.
/// `metrics/bar/count` against `metrics/$1/count`, each placeholder standing for one path segment.
#[derive(Clone)]
pub struct PropertyPattern {
    property_id: String,
    regex: Regex,
    placeholders: Vec<usize>,
}

impl fmt::Debug for PropertyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyPattern")
            .field("property_id", &self.property_id)
            .field("placeholders", &self.placeholders)
            .finish()
    }
}

impl PropertyPattern {
    pub fn compile(property_id: impl Into<String>) -> Result<Self, TemplateError> {
        let property_id = property_id.into();
        let mut body = String::new();
        let mut placeholders = Vec::new();
        let mut mark = 0;
        for caps in PLACEHOLDER_REGEX.captures_iter(property_id.as_str()) {
            let (Some(whole), Some(index)) = (caps.get(0), caps.get(1)) else { continue };
            body.push_str(regex::escape(&property_id[mark..whole.start()]).as_str());
            body.push_str("([^/]+)");
            placeholders.push(index.as_str().parse().unwrap_or_default());
            mark = whole.end();
        }
        body.push_str(regex::escape(&property_id[mark..]).as_str());

        let regex = Regex::new(format!("^{body}$").as_str())
            .map_err(|source| TemplateError::InvalidPattern { template: property_id.clone(), source })?;

        Ok(Self { property_id, regex, placeholders })
    }

    pub fn property_id(&self) -> &str {
        self.property_id.as_str()
    }

    /// Placeholder index to value bindings when `concrete_id` instantiates this property id.
    /// A placeholder used twice must bind the same value both times.
    pub fn bind(&self, concrete_id: &str) -> Option<BTreeMap<usize, String>> {
        let caps = self.regex.captures(concrete_id)?;
        let mut bindings = BTreeMap::new();
        for (group, index) in self.placeholders.iter().enumerate() {
            let value = caps.get(group + 1)?.as_str().to_string();
            match bindings.get(index) {
                Some(bound) if bound != &value => return None,
                Some(_) => {},
                None => {
                    bindings.insert(*index, value);
                },
            }
        }
        Some(bindings)
    }
}
