//! Summary and custom-test registry.
//!
//! Built once at startup with the built-in summaries, then handed to the
//! blueprint at construction. Registration validates the contract up front;
//! after construction the registry is only read.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tabula_stats::describe::{mean, median, quartiles, sd};
use tabula_stats::StatError;

use crate::error::EngineError;

/// Numeric summary: non-missing values + decimal precision -> display string.
pub type SummaryFn = Rc<dyn Fn(&[f64], u8) -> String>;

/// Custom hypothesis test: per-group numeric samples -> p-value.
pub type CustomTestFn = Rc<dyn Fn(&[Vec<f64>]) -> Result<f64, StatError>>;

pub struct Registry {
    summaries: HashMap<String, SummaryFn>,
    tests: HashMap<String, CustomTestFn>,
}

impl Registry {
    /// Registry pre-loaded with the built-in numeric summaries.
    pub fn with_builtins() -> Self {
        let mut summaries: HashMap<String, SummaryFn> = HashMap::new();
        summaries.insert("mean_sd".into(), Rc::new(mean_sd));
        summaries.insert("median_iqr".into(), Rc::new(median_iqr));
        summaries.insert("mean_sd_n".into(), Rc::new(mean_sd_n));
        Self { summaries, tests: HashMap::new() }
    }

    pub fn register_summary(
        &mut self,
        name: impl Into<String>,
        f: SummaryFn,
    ) -> Result<(), EngineError> {
        let name = name.into();
        if name.is_empty() {
            return Err(EngineError::Configuration("summary name must be non-empty".into()));
        }
        if self.summaries.contains_key(&name) {
            return Err(EngineError::Configuration(format!(
                "summary '{name}' is already registered"
            )));
        }
        self.summaries.insert(name, f);
        Ok(())
    }

    pub fn register_test(
        &mut self,
        name: impl Into<String>,
        f: CustomTestFn,
    ) -> Result<(), EngineError> {
        let name = name.into();
        if name.is_empty() {
            return Err(EngineError::Configuration("test name must be non-empty".into()));
        }
        if crate::dispatch::is_builtin_test(&name) || self.tests.contains_key(&name) {
            return Err(EngineError::Configuration(format!(
                "test '{name}' is already registered"
            )));
        }
        self.tests.insert(name, f);
        Ok(())
    }

    pub fn summary(&self, name: &str) -> Option<SummaryFn> {
        self.summaries.get(name).cloned()
    }

    pub fn custom_test(&self, name: &str) -> Option<CustomTestFn> {
        self.tests.get(name).cloned()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.summaries.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        let mut tests: Vec<&str> = self.tests.keys().map(|s| s.as_str()).collect();
        tests.sort_unstable();
        f.debug_struct("Registry")
            .field("summaries", &names)
            .field("tests", &tests)
            .finish()
    }
}

/// Human-readable label for a summary name, used in column footnotes.
pub fn summary_label(name: &str) -> String {
    match name {
        "mean_sd" => "mean (SD)".into(),
        "median_iqr" => "median [Q1, Q3]".into(),
        "mean_sd_n" => "mean (SD); n".into(),
        other => other.into(),
    }
}

fn mean_sd(xs: &[f64], d: u8) -> String {
    if xs.is_empty() {
        return "NA".into();
    }
    let m = mean(xs);
    let s = sd(xs);
    if s.is_nan() {
        format!("{:.*} (NA)", d as usize, m)
    } else {
        format!("{:.*} ({:.*})", d as usize, m, d as usize, s)
    }
}

fn median_iqr(xs: &[f64], d: u8) -> String {
    if xs.is_empty() {
        return "NA".into();
    }
    let (q1, q3) = quartiles(xs);
    format!(
        "{:.*} [{:.*}, {:.*}]",
        d as usize,
        median(xs),
        d as usize,
        q1,
        d as usize,
        q3
    )
}

fn mean_sd_n(xs: &[f64], d: u8) -> String {
    if xs.is_empty() {
        return "NA".into();
    }
    format!("{}; {}", mean_sd(xs, d), xs.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_mean_sd() {
        let f = Registry::with_builtins().summary("mean_sd").unwrap();
        assert_eq!(f(&[40.0, 50.0, 60.0, 70.0], 1), "55.0 (12.9)");
        assert_eq!(f(&[], 1), "NA");
        assert_eq!(f(&[3.0], 1), "3.0 (NA)");
    }

    #[test]
    fn builtin_median_iqr() {
        let f = Registry::with_builtins().summary("median_iqr").unwrap();
        assert_eq!(f(&[1.0, 2.0, 3.0, 4.0, 5.0], 1), "3.0 [2.0, 4.0]");
    }

    #[test]
    fn custom_summary_registers_once() {
        let mut reg = Registry::with_builtins();
        reg.register_summary("range", Rc::new(|xs, _| format!("{} values", xs.len())))
            .unwrap();
        assert!(reg.summary("range").is_some());
        let err = reg
            .register_summary("range", Rc::new(|_, _| String::new()))
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn empty_name_rejected() {
        let mut reg = Registry::with_builtins();
        let err = reg.register_summary("", Rc::new(|_, _| String::new())).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn builtin_test_name_cannot_be_shadowed() {
        let mut reg = Registry::with_builtins();
        let err = reg
            .register_test("ttest", Rc::new(|_: &[Vec<f64>]| Ok(0.5)))
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
