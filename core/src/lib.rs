//! widgetlens core analysis engine.
//! Reconstructs the widget tree of a PySide6/PyQt6 source file from its
//! parse tree, resolves literal properties, and reports layout defects and
//! theming convention violations. Analysis is static and deterministic; the
//! file under inspection is never executed.

pub mod builder;
pub mod catalog;
pub mod ingest;
pub mod model;
pub mod practices;
pub mod properties;
pub mod report;
pub mod rules;

use std::fs;
use std::path::{Path, PathBuf};

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use catalog::{Capability, CatalogExtension, WidgetCatalog};
pub use ingest::ParseFailure;
pub use model::{Geometry, PropertyValue, WidgetId, WidgetModel, WidgetNode};
pub use report::{
    render_html, AnalysisReport, BestPracticeCheck, Category, Issue, ReportStats, Severity,
};

/// Numeric knobs for the issue rules and convention checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Widgets narrower or shorter than this are flagged as likely invisible.
    pub min_dimension: i64,
    /// Fraction of widgets that must carry an object name for the check to pass.
    pub object_name_majority: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_dimension: 10,
            object_name_majority: 0.5,
        }
    }
}

/// Top-level configuration for the analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub thresholds: Thresholds,
    /// Project-specific widget types added to the built-in catalog.
    pub widgets: Vec<CatalogExtension>,
    /// Call prefixes that mark a color as coming from the theme API.
    pub theme_accessors: Vec<String>,
    /// Words that make a variable name meaningless when followed by a digit.
    pub generic_names: Vec<String>,
    pub ignore_globs: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            widgets: Vec::new(),
            theme_accessors: vec!["get_theme(".into()],
            generic_names: vec![
                "widget".into(),
                "object".into(),
                "item".into(),
                "var".into(),
            ],
            ignore_globs: Vec::new(),
        }
    }
}

/// Failure analyzing one file. Parse failures are reportable (the CLI turns
/// them into a degenerate report); read failures are not.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: syntax error near line {line}", path.display())]
    Parse { path: PathBuf, line: usize },
}

/// Analyzer encapsulates the compiled catalog and matchers for reuse across
/// files.
pub struct Analyzer {
    config: Config,
    catalog: WidgetCatalog,
    accessor_matcher: AhoCorasick,
    meaningless_name: Regex,
}

impl Analyzer {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let mut catalog = WidgetCatalog::default();
        for extension in &config.widgets {
            catalog.register(extension.name.clone(), extension.capability, extension.themed);
        }

        let accessor_matcher = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .build(&config.theme_accessors);

        let meaningless_name = build_name_regex(&catalog, &config.generic_names)?;

        Ok(Self {
            config,
            catalog,
            accessor_matcher,
            meaningless_name,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &WidgetCatalog {
        &self.catalog
    }

    pub fn analyze_file(&self, path: &Path) -> Result<AnalysisReport, AnalyzeError> {
        let text = fs::read_to_string(path).map_err(|source| AnalyzeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let label = path.display().to_string();
        self.analyze_source(&label, &text)
            .map_err(|failure| AnalyzeError::Parse {
                path: path.to_path_buf(),
                line: failure.line,
            })
    }

    /// Run the whole pipeline over one already-loaded source. The model is
    /// frozen after the property pass; rules and practice checks only read it.
    pub fn analyze_source(
        &self,
        label: &str,
        text: &str,
    ) -> Result<AnalysisReport, ParseFailure> {
        let parsed = ingest::parse(text)?;
        let output = builder::build_model(&parsed, &self.catalog);
        let mut model = output.model;
        properties::resolve_properties(&parsed, &mut model, &output.symbols);

        let issues = rules::detect_issues(&rules::RuleContext {
            model: &model,
            min_dimension: self.config.thresholds.min_dimension,
            meaningless_name: &self.meaningless_name,
        });

        let checklist = practices::validate_practices(&practices::PracticeContext {
            source: &parsed,
            model: &model,
            catalog: &self.catalog,
            accessor_matcher: &self.accessor_matcher,
            object_name_majority: self.config.thresholds.object_name_majority,
        });

        Ok(report::assemble(label, model, issues, checklist))
    }
}

/// A name is meaningless when it is a known type word (with or without the Qt
/// `Q` prefix) or a configured generic word, followed by digits.
fn build_name_regex(catalog: &WidgetCatalog, generic_names: &[String]) -> anyhow::Result<Regex> {
    let mut words: Vec<String> = Vec::new();
    for name in catalog.type_names() {
        let lower = name.to_lowercase();
        if let Some(stripped) = lower.strip_prefix('q') {
            if !stripped.is_empty() {
                words.push(regex::escape(stripped));
            }
        }
        words.push(regex::escape(&lower));
    }
    for word in generic_names {
        words.push(regex::escape(&word.to_lowercase()));
    }
    words.sort();
    words.dedup();
    let pattern = format!(r"(?i)^(?:{})\d+$", words.join("|"));
    Regex::new(&pattern).map_err(|e| anyhow::anyhow!("invalid widget name pattern: {e}"))
}
