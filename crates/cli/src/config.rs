//! TOML table config.

use serde::Deserialize;

use tabula_engine::{TableOptions, TableSpec};
use tabula_render::RenderTheme;

#[derive(Debug, Deserialize)]
pub struct TableConfig {
    #[serde(default)]
    pub title: Option<String>,
    pub table: TableSpec,
    #[serde(default)]
    pub options: TableOptions,
    #[serde(default)]
    pub theme: RenderTheme,
}

impl TableConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml = r#"
title = "Baseline characteristics"

[table]
group = ["treatment"]
variables = ["age", "sex"]

[options]
show_pvalue = true
show_missing = true
continuous_test = "welch"
footnotes = ["Ages in years."]

[theme]
decimals = 2
indent = "    "
"#;
        let config = TableConfig::from_toml(toml).unwrap();
        assert_eq!(config.title.as_deref(), Some("Baseline characteristics"));
        assert_eq!(config.table.group, vec!["treatment"]);
        assert_eq!(config.table.variables, vec!["age", "sex"]);
        assert!(config.options.show_pvalue);
        assert_eq!(config.options.continuous_test, "welch");
        assert_eq!(config.options.footnotes, vec!["Ages in years.".to_string()]);
        assert_eq!(config.theme.decimals, 2);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let toml = r#"
[table]
variables = ["age"]
"#;
        let config = TableConfig::from_toml(toml).unwrap();
        assert!(config.title.is_none());
        assert!(config.table.group.is_empty());
        assert!(!config.options.show_pvalue);
        assert_eq!(config.options.continuous_test, "ttest");
        assert_eq!(config.theme.decimals, 1);
    }

    #[test]
    fn missing_variables_is_a_parse_error() {
        assert!(TableConfig::from_toml("[table]\ngroup = [\"arm\"]\n").is_err());
    }
}
