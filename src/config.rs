//! Configuration system for the analyzer
//!
//! Reads configuration from:
//! - `.pinelintrc.yaml` / `.pinelintrc.json` / `pine-lint.yaml` (project-level)
//! - the same names in the home directory (user-level)

use crate::diagnostic::Severity;
use crate::rule::Rule;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Newest language version the analyzer knows about
pub const LATEST_VERSION: u32 = 6;

/// Version scripts are expected to target unless configured otherwise
pub const DEFAULT_TARGET_VERSION: u32 = 5;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormat,

    /// Color mode
    pub color: ColorMode,

    /// Verbose output
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Color mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Rule configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Disabled rule ids or diagnostic codes
    pub disabled: Vec<String>,

    /// Severity overrides (rule id or diagnostic code -> severity)
    pub severity: HashMap<String, Severity>,

    /// Additional rules evaluated after the built-in ones
    pub custom: Vec<Rule>,
}

/// Formatting limits used by the style rules and the fixer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Lines longer than this are reported
    pub max_line_length: usize,

    /// Spaces per indentation level
    pub indent_width: usize,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            max_line_length: 120,
            indent_width: 4,
        }
    }
}

/// Weights of the performance score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Deducted per performance warning
    pub performance_penalty: u32,

    /// Maximum total performance deduction
    pub performance_cap: u32,

    /// Deducted per loop
    pub loop_penalty: u32,

    /// Deducted per nested conditional
    pub nested_conditional_penalty: u32,

    /// Maximum total control-flow deduction
    pub control_flow_cap: u32,

    /// Multiplier applied to built-in calls per code line
    pub builtin_bonus_factor: u32,

    /// Maximum bonus for built-in usage
    pub builtin_bonus_cap: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            performance_penalty: 10,
            performance_cap: 50,
            loop_penalty: 3,
            nested_conditional_penalty: 2,
            control_flow_cap: 30,
            builtin_bonus_factor: 10,
            builtin_bonus_cap: 10,
        }
    }
}

/// Names treated as known in addition to the built-in vocabulary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    pub extra_functions: Vec<String>,
    pub extra_variables: Vec<String>,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Presets or other configuration files to inherit from
    pub extends: Vec<String>,

    /// Language version scripts should declare, unset means the default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_version: Option<u32>,

    /// Rule configuration
    pub rules: RulesConfig,

    /// Style limits
    pub style: StyleConfig,

    /// Score weights
    pub scoring: ScoringConfig,

    /// Vocabulary extensions
    pub vocabulary: VocabularyConfig,

    /// Output settings
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extends: Vec::new(),
            target_version: None,
            rules: RulesConfig::default(),
            style: StyleConfig::default(),
            scoring: ScoringConfig::default(),
            vocabulary: VocabularyConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Create default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective target version
    pub fn target_version(&self) -> u32 {
        self.target_version.unwrap_or(DEFAULT_TARGET_VERSION)
    }

    /// Get a preset configuration by name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "recommended" => Some(Self::default()),
            "strict" => Some(Self::preset_strict()),
            "minimal" => Some(Self::preset_minimal()),
            _ => None,
        }
    }

    /// Strict preset - likely bugs become errors
    fn preset_strict() -> Self {
        let mut config = Self::default();
        for code in ["UNDEFINED_VARIABLE", "NA_COMPARISON", "LOOKAHEAD_BIAS"] {
            config.rules.severity.insert(code.to_string(), Severity::Error);
        }
        config
    }

    /// Minimal preset - no style or informational rules
    fn preset_minimal() -> Self {
        let mut config = Self::default();
        config.rules.disabled = ["tab-indentation", "trailing-whitespace", "line-too-long", "request-call"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        config
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_depth(path, 0)
    }

    /// Load with recursion depth limit
    fn load_with_depth(path: &Path, depth: usize) -> Result<Self, ConfigError> {
        const MAX_DEPTH: usize = 10;
        if depth >= MAX_DEPTH {
            return Err(ConfigError::Invalid(
                "Maximum config inheritance depth exceeded".to_string(),
            ));
        }

        let content = std::fs::read_to_string(path)?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let mut config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };

        if !config.extends.is_empty() {
            let base_dir = path.parent().unwrap_or(Path::new("."));
            let mut base_config = Self::default();

            for extend in &config.extends.clone() {
                let extended = match Self::preset(extend) {
                    Some(preset) => preset,
                    None => {
                        let extend_path = if Path::new(extend).is_absolute() {
                            PathBuf::from(extend)
                        } else {
                            base_dir.join(extend)
                        };
                        Self::load_with_depth(&extend_path, depth + 1)?
                    }
                };
                base_config.merge(extended);
            }

            base_config.merge(config);
            config = base_config;
        }

        config.validate()?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        if other.target_version.is_some() {
            self.target_version = other.target_version;
        }

        self.rules.disabled.extend(other.rules.disabled);
        self.rules.severity.extend(other.rules.severity);
        self.rules.custom.extend(other.rules.custom);

        let default_style = StyleConfig::default();
        if other.style.max_line_length != default_style.max_line_length {
            self.style.max_line_length = other.style.max_line_length;
        }
        if other.style.indent_width != default_style.indent_width {
            self.style.indent_width = other.style.indent_width;
        }

        if other.scoring != ScoringConfig::default() {
            self.scoring = other.scoring;
        }

        self.vocabulary
            .extra_functions
            .extend(other.vocabulary.extra_functions);
        self.vocabulary
            .extra_variables
            .extend(other.vocabulary.extra_variables);

        if other.output.format != OutputFormat::Text {
            self.output.format = other.output.format;
        }
        if other.output.color != ColorMode::Auto {
            self.output.color = other.output.color;
        }
        if other.output.verbose {
            self.output.verbose = true;
        }
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_names = [
            ".pinelintrc.yaml",
            ".pinelintrc.yml",
            ".pinelintrc.json",
            "pine-lint.yaml",
            "pine-lint.yml",
            "pine-lint.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            for name in &config_names {
                let path = home.join(name);
                if path.exists() {
                    return Self::load(&path);
                }
            }
        }

        log::debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Merge CLI arguments into configuration
    pub fn merge_cli(
        &mut self,
        format: Option<OutputFormat>,
        verbose: Option<bool>,
        disabled_rules: Option<Vec<String>>,
        no_color: bool,
    ) {
        if let Some(f) = format {
            self.output.format = f;
        }
        if let Some(v) = verbose {
            self.output.verbose = v;
        }
        if let Some(disabled) = disabled_rules {
            self.rules.disabled.extend(disabled);
        }
        if no_color {
            self.output.color = ColorMode::Never;
        }
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=LATEST_VERSION).contains(&self.target_version()) {
            return Err(ConfigError::Invalid(format!(
                "target_version must be between 1 and {}, got {}",
                LATEST_VERSION,
                self.target_version()
            )));
        }
        if self.style.indent_width == 0 {
            return Err(ConfigError::Invalid(
                "style.indent_width must be at least 1".to_string(),
            ));
        }
        if self.style.max_line_length < 20 {
            return Err(ConfigError::Invalid(format!(
                "style.max_line_length must be at least 20, got {}",
                self.style.max_line_length
            )));
        }
        Ok(())
    }

    /// Check if a rule is enabled, by id or by the code it reports
    pub fn is_rule_enabled(&self, rule_id: &str, code: &str) -> bool {
        !self
            .rules
            .disabled
            .iter()
            .any(|d| d == rule_id || d == code)
    }

    /// Check if diagnostics with `code` are reported
    pub fn is_code_enabled(&self, code: &str) -> bool {
        !self.rules.disabled.iter().any(|d| d == code)
    }

    /// Get severity override for a rule; the rule id wins over the code
    pub fn get_severity_override(&self, rule_id: &str, code: &str) -> Option<Severity> {
        self.rules
            .severity
            .get(rule_id)
            .or_else(|| self.rules.severity.get(code))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::new();
        assert_eq!(config.target_version(), 5);
        assert_eq!(config.style.max_line_length, 120);
        assert_eq!(config.style.indent_width, 4);
        assert_eq!(config.scoring.performance_cap, 50);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_load_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pinelintrc.yaml");
        std::fs::write(
            &path,
            r#"
target_version: 6
rules:
  disabled: [line-too-long, EXTERNAL_URL]
  severity:
    NA_COMPARISON: error
  custom:
    - id: no-barcolor
      code: NO_BARCOLOR
      pattern: '\bbarcolor\s*\('
      message: barcolor() is discouraged
style:
  indent_width: 2
scoring:
  loop_penalty: 5
vocabulary:
  extra_functions: [myhelper]
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.target_version(), 6);
        assert!(!config.is_rule_enabled("line-too-long", "LINE_TOO_LONG"));
        assert!(!config.is_rule_enabled("external-url", "EXTERNAL_URL"));
        assert!(!config.is_code_enabled("EXTERNAL_URL"));
        assert!(config.is_rule_enabled("tab-indentation", "TAB_INDENTATION"));
        assert_eq!(
            config.get_severity_override("na-comparison", "NA_COMPARISON"),
            Some(Severity::Error)
        );
        assert_eq!(config.rules.custom.len(), 1);
        assert_eq!(config.style.indent_width, 2);
        assert_eq!(config.style.max_line_length, 120);
        assert_eq!(config.scoring.loop_penalty, 5);
        assert_eq!(config.scoring.performance_penalty, 10);
        assert_eq!(config.vocabulary.extra_functions, vec!["myhelper"]);
    }

    #[test]
    fn test_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pine-lint.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"style": {{"max_line_length": 80}}}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.style.max_line_length, 80);
        assert_eq!(config.target_version(), 5);
    }

    #[test]
    fn test_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "target_version: 9\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("target_version"));

        let mut config = Config::new();
        config.style.indent_width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_extends_preset_and_file() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("base.yaml");
        std::fs::write(&base, "rules:\n  disabled: [request-call]\n").unwrap();
        let child = dir.path().join("child.yaml");
        std::fs::write(&child, "extends: [strict, base.yaml]\nstyle:\n  max_line_length: 100\n").unwrap();

        let config = Config::load(&child).unwrap();
        assert!(!config.is_rule_enabled("request-call", "REQUEST_CALL"));
        assert_eq!(
            config.get_severity_override("identifier-use", "UNDEFINED_VARIABLE"),
            Some(Severity::Error)
        );
        assert_eq!(config.style.max_line_length, 100);
    }

    #[test]
    fn test_extending_config_can_set_default_version() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("base.yaml"), "target_version: 6\n").unwrap();
        let child = dir.path().join("child.yaml");
        std::fs::write(&child, "extends: [base.yaml]\ntarget_version: 5\n").unwrap();
        assert_eq!(Config::load(&child).unwrap().target_version(), 5);

        let inherit = dir.path().join("inherit.yaml");
        std::fs::write(&inherit, "extends: [base.yaml]\n").unwrap();
        assert_eq!(Config::load(&inherit).unwrap().target_version(), 6);
    }

    #[test]
    fn test_minimal_preset_disables_style() {
        let config = Config::preset("minimal").unwrap();
        assert!(!config.is_rule_enabled("trailing-whitespace", "TRAILING_WHITESPACE"));
        assert!(Config::preset("unknown").is_none());
    }

    #[test]
    fn test_merge_cli() {
        let mut config = Config::new();
        config.merge_cli(
            Some(OutputFormat::Json),
            Some(true),
            Some(vec!["identifier-use".to_string()]),
            true,
        );
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.verbose);
        assert_eq!(config.output.color, ColorMode::Never);
        assert!(!config.is_rule_enabled("identifier-use", "UNDEFINED_VARIABLE"));
    }

    #[test]
    fn test_rule_id_override_wins() {
        let mut config = Config::new();
        config.rules.severity.insert("DEPRECATED_FUNCTION".to_string(), Severity::Error);
        config.rules.severity.insert("deprecated-study".to_string(), Severity::Info);
        assert_eq!(
            config.get_severity_override("deprecated-study", "DEPRECATED_FUNCTION"),
            Some(Severity::Info)
        );
        assert_eq!(
            config.get_severity_override("deprecated-sma", "DEPRECATED_FUNCTION"),
            Some(Severity::Error)
        );
    }
}
