//! Destructive-pattern detection.
//!
//! Guardrails are advisory: `check` only reports. Callers that want a hard
//! stop use `GuardrailReport::is_blocking` with a severity threshold.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::GuardrailConfig;
use crate::domain::KernelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct GuardrailPattern {
    pub name: String,
    pub category: String,
    pub severity: Severity,
    regex: Regex,
}

impl GuardrailPattern {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        severity: Severity,
        pattern: &str,
    ) -> Result<Self, KernelError> {
        let name = name.into();
        let regex = Regex::new(pattern)
            .map_err(|e| KernelError::Config(format!("guardrail '{name}': {e}")))?;
        Ok(Self {
            name,
            category: category.into(),
            severity,
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    fn check(&self, description: &str) -> Option<Violation> {
        self.regex.find(description).map(|m| Violation {
            pattern: self.name.clone(),
            category: self.category.clone(),
            severity: self.severity,
            matched: m.as_str().to_string(),
        })
    }
}

fn builtin(name: &str, category: &str, severity: Severity, pattern: &str) -> GuardrailPattern {
    GuardrailPattern {
        name: name.to_string(),
        category: category.to_string(),
        severity,
        regex: Regex::new(pattern).expect("valid builtin guardrail regex"),
    }
}

static BUILTIN_PATTERNS: LazyLock<Vec<GuardrailPattern>> = LazyLock::new(|| {
    vec![
        builtin("recursive_rm", "filesystem", Severity::Critical, r"(?i)\brm\s+(?:-\w*r\w*|--recursive)\b"),
        builtin("drop_object", "database", Severity::Critical, r"(?i)\bdrop\s+(?:table|database|schema)\b"),
        builtin("truncate_table", "database", Severity::High, r"(?i)\btruncate\s+table\b"),
        builtin("unscoped_delete", "database", Severity::High, r"(?i)\bdelete\s+from\s+[\w.]+\s*(?:;|$)"),
        builtin("force_push", "vcs", Severity::High, r"\bgit\s+push\b.*\s(?:--force(?:-with-lease)?|-f)\b"),
        builtin("hard_reset", "vcs", Severity::Medium, r"\bgit\s+reset\s+--hard\b"),
        builtin("world_writable", "filesystem", Severity::Medium, r"\bchmod\s+(?:-R\s+)?0?777\b"),
        builtin("disk_format", "system", Severity::Critical, r"\bmkfs(?:\.\w+)?\b|\bdd\s+if=.*\bof=/dev/"),
        builtin("bulk_delete", "bulk", Severity::Medium, r"(?i)\b(?:delete|remove)\s+(?:all|every)\b|\bfind\b.*\s-delete\b"),
    ]
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Name of the pattern that fired.
    pub pattern: String,
    pub category: String,
    pub severity: Severity,
    /// The matched slice of the description.
    pub matched: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailReport {
    pub violations: Vec<Violation>,
}

impl GuardrailReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.violations.iter().map(|v| v.severity).max()
    }

    /// True when any violation is at or above `threshold`.
    pub fn is_blocking(&self, threshold: Severity) -> bool {
        self.max_severity().is_some_and(|s| s >= threshold)
    }

    pub fn pattern_names(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.pattern.clone()).collect()
    }
}

/// Ordered set of patterns; every matching pattern yields one violation.
#[derive(Debug, Clone, Default)]
pub struct Guardrails {
    patterns: Vec<GuardrailPattern>,
}

impl Guardrails {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        Self {
            patterns: BUILTIN_PATTERNS.clone(),
        }
    }

    pub fn from_config(config: &GuardrailConfig) -> Result<Self, KernelError> {
        let mut guardrails = if config.builtin { Self::builtin() } else { Self::empty() };
        for p in &config.patterns {
            guardrails = guardrails.with_pattern(GuardrailPattern::new(
                p.name.clone(),
                p.category.clone(),
                p.severity,
                &p.regex,
            )?);
        }
        Ok(guardrails)
    }

    pub fn with_pattern(mut self, pattern: GuardrailPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn check(&self, description: &str) -> GuardrailReport {
        GuardrailReport {
            violations: self.patterns.iter().filter_map(|p| p.check(description)).collect(),
        }
    }
}
