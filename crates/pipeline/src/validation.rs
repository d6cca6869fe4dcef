//! Composable validation rules for generated artifacts.
//!
//! A rule inspects one [`PlatformArtifact`] and returns zero or more
//! [`Finding`]s. Rules never see each other's output; the engine merges every
//! finding by severity into a [`ValidationResult`]. Registration order only
//! affects message order within each severity list.
//!
//! Built-in rule families:
//!
//! | Rule | Checks |
//! |------|--------|
//! | [`LengthBound`] | min/max characters of title, body, or a metadata value (item count for arrays) |
//! | [`ForbiddenTerms`] | case-insensitive substring match against a term set |
//! | [`RequiredElement`] | structural markers: fenced code block, section header, prefix, substring |
//! | [`RequiredField`] | non-empty title, body, or metadata value |
//! | [`FnRule`] | arbitrary platform-specific check |

use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::{PlatformArtifact, PlatformId};

// ---------------------------------------------------------------------------
// Findings and results
// ---------------------------------------------------------------------------

/// How much a finding matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Blocks publishing; the artifact is invalid.
    Error,
    /// A defect that does not block publishing.
    Warning,
    /// Style advice.
    Suggestion,
}

/// A single outcome produced by one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn suggestion(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Suggestion,
            message: message.into(),
        }
    }

    fn with_severity(severity: Severity, message: String) -> Self {
        Self { severity, message }
    }
}

/// Classification of an artifact: blocking errors, warnings, suggestions.
///
/// Validity is derived: an artifact is valid exactly when `errors` is empty.
/// The serialized form carries it as `is_valid` for readers of persisted
/// artifacts; the field is recomputed, not trusted, when read back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ValidationResult {
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    /// Merges findings by severity, preserving their order.
    pub fn from_findings(findings: impl IntoIterator<Item = Finding>) -> Self {
        let mut result = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::Error => result.errors.push(finding.message),
                Severity::Warning => result.warnings.push(finding.message),
                Severity::Suggestion => result.suggestions.push(finding.message),
            }
        }
        result
    }

    /// `true` when no error-severity finding was produced.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationResult", 4)?;
        state.serialize_field("is_valid", &self.is_valid())?;
        state.serialize_field("errors", &self.errors)?;
        state.serialize_field("warnings", &self.warnings)?;
        state.serialize_field("suggestions", &self.suggestions)?;
        state.end()
    }
}

// ---------------------------------------------------------------------------
// Rule interface
// ---------------------------------------------------------------------------

/// A pure check over one artifact.
pub trait ValidationRule: Send + Sync + std::fmt::Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Inspects `artifact` and reports findings. Must not have side effects.
    fn check(&self, artifact: &PlatformArtifact) -> Vec<Finding>;
}

/// Which part of an artifact a rule looks at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Body,
    /// A metadata entry: strings are measured in characters, arrays in items.
    Metadata(String),
}

impl Field {
    pub fn metadata(key: impl Into<String>) -> Self {
        Self::Metadata(key.into())
    }

    fn label(&self) -> String {
        match self {
            Self::Title => "Title".to_string(),
            Self::Body => "Body".to_string(),
            Self::Metadata(key) => format!("Metadata '{key}'"),
        }
    }

    fn unit(&self, artifact: &PlatformArtifact) -> &'static str {
        match self {
            Self::Metadata(key) if artifact.metadata.get(key).is_some_and(|v| v.is_array()) => {
                "items"
            }
            _ => "characters",
        }
    }

    fn text<'a>(&self, artifact: &'a PlatformArtifact) -> Option<&'a str> {
        match self {
            Self::Title => Some(&artifact.title),
            Self::Body => Some(&artifact.body),
            Self::Metadata(key) => artifact.metadata.get(key).and_then(|v| v.as_str()),
        }
    }

    /// Length in characters (or items). Missing metadata measures as zero.
    fn measure(&self, artifact: &PlatformArtifact) -> usize {
        match self {
            Self::Title => artifact.title.chars().count(),
            Self::Body => artifact.body.chars().count(),
            Self::Metadata(key) => match artifact.metadata.get(key) {
                Some(serde_json::Value::String(s)) => s.chars().count(),
                Some(serde_json::Value::Array(items)) => items.len(),
                Some(serde_json::Value::Null) | None => 0,
                Some(other) => other.to_string().chars().count(),
            },
        }
    }

    fn is_blank(&self, artifact: &PlatformArtifact) -> bool {
        match self {
            Self::Metadata(key) => match artifact.metadata.get(key) {
                Some(serde_json::Value::String(s)) => s.trim().is_empty(),
                Some(serde_json::Value::Array(items)) => items.is_empty(),
                Some(serde_json::Value::Null) | None => true,
                Some(_) => false,
            },
            _ => self.text(artifact).is_none_or(|s| s.trim().is_empty()),
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in rules
// ---------------------------------------------------------------------------

/// Minimum and/or maximum length of a field.
///
/// The minimum applies to non-empty values only; presence is
/// [`RequiredField`]'s concern.
#[derive(Debug, Clone)]
pub struct LengthBound {
    pub field: Field,
    pub min: Option<usize>,
    pub max: Option<usize>,
    pub severity: Severity,
}

impl LengthBound {
    /// An error-severity upper bound.
    pub fn max(field: Field, max: usize) -> Self {
        Self {
            field,
            min: None,
            max: Some(max),
            severity: Severity::Error,
        }
    }

    /// An error-severity lower bound.
    pub fn min(field: Field, min: usize) -> Self {
        Self {
            field,
            min: Some(min),
            max: None,
            severity: Severity::Error,
        }
    }

    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl ValidationRule for LengthBound {
    fn name(&self) -> &str {
        "length_bound"
    }

    fn check(&self, artifact: &PlatformArtifact) -> Vec<Finding> {
        let actual = self.field.measure(artifact);
        let label = self.field.label();
        let unit = self.field.unit(artifact);
        let mut findings = Vec::new();

        if let Some(max) = self.max {
            if actual > max {
                findings.push(Finding::with_severity(
                    self.severity,
                    format!("{label} too long: {actual}/{max} {unit}"),
                ));
            }
        }
        if let Some(min) = self.min {
            if actual > 0 && actual < min {
                findings.push(Finding::with_severity(
                    self.severity,
                    format!("{label} too short: {actual}/{min} {unit}"),
                ));
            }
        }
        findings
    }
}

/// Rejects fields containing any of a set of terms (case-insensitive).
///
/// One finding is produced per matching term.
#[derive(Debug, Clone)]
pub struct ForbiddenTerms {
    pub field: Field,
    terms: Vec<String>,
    pub severity: Severity,
}

impl ForbiddenTerms {
    pub fn new<I, S>(field: Field, terms: I, severity: Severity) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field,
            terms: terms.into_iter().map(Into::into).collect(),
            severity,
        }
    }
}

impl ValidationRule for ForbiddenTerms {
    fn name(&self) -> &str {
        "forbidden_terms"
    }

    fn check(&self, artifact: &PlatformArtifact) -> Vec<Finding> {
        let Some(text) = self.field.text(artifact) else {
            return Vec::new();
        };
        let haystack = text.to_lowercase();
        let label = self.field.label();

        self.terms
            .iter()
            .filter(|term| !term.is_empty() && haystack.contains(&term.to_lowercase()))
            .map(|term| {
                Finding::with_severity(
                    self.severity,
                    format!("{label} contains forbidden term: '{term}'"),
                )
            })
            .collect()
    }
}

/// A structural marker a field must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralElement {
    /// At least one ```` ``` ```` fence.
    FencedCodeBlock,
    /// At least one line starting with `#`.
    SectionHeader,
    /// The field starts with the given text.
    Prefix(String),
    /// The field contains the given text (case-insensitive).
    Contains(String),
}

impl StructuralElement {
    fn is_present(&self, text: &str) -> bool {
        match self {
            Self::FencedCodeBlock => text.contains("```"),
            Self::SectionHeader => text.lines().any(|line| line.trim_start().starts_with('#')),
            Self::Prefix(prefix) => text.starts_with(prefix.as_str()),
            Self::Contains(needle) => text.to_lowercase().contains(&needle.to_lowercase()),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::FencedCodeBlock => "must contain at least one fenced code block".to_string(),
            Self::SectionHeader => "must contain a section header marker".to_string(),
            Self::Prefix(prefix) => format!("must start with '{prefix}'"),
            Self::Contains(needle) => format!("must contain '{needle}'"),
        }
    }
}

/// Requires a structural element to be present in a field.
#[derive(Debug, Clone)]
pub struct RequiredElement {
    pub field: Field,
    pub element: StructuralElement,
    pub severity: Severity,
    message: Option<String>,
}

impl RequiredElement {
    pub fn new(field: Field, element: StructuralElement, severity: Severity) -> Self {
        Self {
            field,
            element,
            severity,
            message: None,
        }
    }

    /// Replaces the generated message with platform-specific wording.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ValidationRule for RequiredElement {
    fn name(&self) -> &str {
        "required_element"
    }

    fn check(&self, artifact: &PlatformArtifact) -> Vec<Finding> {
        let text = self.field.text(artifact).unwrap_or_default();
        if self.element.is_present(text) {
            return Vec::new();
        }
        let message = self.message.clone().unwrap_or_else(|| {
            format!("{} {}", self.field.label(), self.element.describe())
        });
        vec![Finding::with_severity(self.severity, message)]
    }
}

/// Requires a field to be present and non-blank.
#[derive(Debug, Clone)]
pub struct RequiredField {
    pub field: Field,
    pub severity: Severity,
}

impl RequiredField {
    /// An error-severity presence check.
    pub fn new(field: Field) -> Self {
        Self {
            field,
            severity: Severity::Error,
        }
    }

    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl ValidationRule for RequiredField {
    fn name(&self) -> &str {
        "required_field"
    }

    fn check(&self, artifact: &PlatformArtifact) -> Vec<Finding> {
        if self.field.is_blank(artifact) {
            vec![Finding::with_severity(
                self.severity,
                format!("{} is required", self.field.label()),
            )]
        } else {
            Vec::new()
        }
    }
}

type CheckFn = dyn Fn(&PlatformArtifact) -> Vec<Finding> + Send + Sync;

/// Wraps a closure as a rule for platform-specific checks.
#[derive(Clone)]
pub struct FnRule {
    name: String,
    check: Arc<CheckFn>,
}

impl FnRule {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&PlatformArtifact) -> Vec<Finding> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }
}

impl std::fmt::Debug for FnRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnRule").field("name", &self.name).finish()
    }
}

impl ValidationRule for FnRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, artifact: &PlatformArtifact) -> Vec<Finding> {
        (self.check)(artifact)
    }
}

// ---------------------------------------------------------------------------
// Rule sets and engine
// ---------------------------------------------------------------------------

/// Ordered list of rules for one platform.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Arc<dyn ValidationRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule (builder style).
    #[must_use]
    pub fn with(mut self, rule: impl ValidationRule + 'static) -> Self {
        self.push(rule);
        self
    }

    /// Appends a rule.
    pub fn push(&mut self, rule: impl ValidationRule + 'static) {
        self.rules.push(Arc::new(rule));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Runs every rule and merges the findings.
    pub fn evaluate(&self, artifact: &PlatformArtifact) -> ValidationResult {
        ValidationResult::from_findings(self.rules.iter().flat_map(|rule| {
            let findings = rule.check(artifact);
            if !findings.is_empty() {
                tracing::trace!(
                    rule = rule.name(),
                    platform = %artifact.platform,
                    count = findings.len(),
                    "Rule produced findings"
                );
            }
            findings
        }))
    }
}

/// Registry of per-platform rule sets.
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    rule_sets: HashMap<PlatformId, RuleSet>,
}

impl ValidationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `rule` to `platform`'s rule set.
    pub fn register(&mut self, platform: &PlatformId, rule: impl ValidationRule + 'static) {
        self.rule_sets
            .entry(platform.clone())
            .or_default()
            .push(rule);
    }

    /// Replaces `platform`'s whole rule set.
    pub fn set_rules(&mut self, platform: PlatformId, rules: RuleSet) {
        self.rule_sets.insert(platform, rules);
    }

    pub fn rules_for(&self, platform: &PlatformId) -> Option<&RuleSet> {
        self.rule_sets.get(platform)
    }

    /// Validates `artifact` against its platform's rules.
    ///
    /// A platform without registered rules yields an empty (valid) result.
    pub fn run(&self, artifact: &PlatformArtifact) -> ValidationResult {
        self.rule_sets
            .get(&artifact.platform)
            .map(|rules| rules.evaluate(artifact))
            .unwrap_or_default()
    }
}
