//! Reporter interface (§6) and the built-in reporter registry.

mod dot;
mod github;
mod html;
mod json;
mod junit;
mod line;
mod list;
mod null;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{FullResult, SuiteArena, SuiteId, TestCase, TestError, TestResult};

/// Consumed by the dispatcher and the skip-non-always path. Events for a
/// given `TestCase` are emitted by a single producer and never interleaved.
pub trait Reporter: Send + Sync {
    fn on_begin(&self, _config: &Config, _arena: &SuiteArena, _root: SuiteId) {}
    fn on_test_begin(&self, _test: &TestCase) {}
    fn on_test_end(&self, _test: &TestCase, _result: &TestResult) {}
    fn on_error(&self, _error: &TestError) {}
    fn on_std_out(&self, _text: &str) {}
    fn on_end(&self, _full: &FullResult) {}
    fn on_exit(&self) {}
    fn prints_to_stdio(&self) -> bool {
        true
    }
}

/// Fans every event out to each configured reporter, in configuration order.
pub struct Multiplexer {
    reporters: Vec<Box<dyn Reporter>>,
}

impl Multiplexer {
    pub fn new(reporters: Vec<Box<dyn Reporter>>) -> Self {
        Self { reporters }
    }
}

impl Reporter for Multiplexer {
    fn on_begin(&self, config: &Config, arena: &SuiteArena, root: SuiteId) {
        for r in &self.reporters {
            r.on_begin(config, arena, root);
        }
    }

    fn on_test_begin(&self, test: &TestCase) {
        for r in &self.reporters {
            r.on_test_begin(test);
        }
    }

    fn on_test_end(&self, test: &TestCase, result: &TestResult) {
        for r in &self.reporters {
            r.on_test_end(test, result);
        }
    }

    fn on_error(&self, error: &TestError) {
        for r in &self.reporters {
            r.on_error(error);
        }
    }

    fn on_std_out(&self, text: &str) {
        for r in &self.reporters {
            r.on_std_out(text);
        }
    }

    fn on_end(&self, full: &FullResult) {
        for r in &self.reporters {
            r.on_end(full);
        }
    }

    fn on_exit(&self) {
        for r in &self.reporters {
            r.on_exit();
        }
    }

    fn prints_to_stdio(&self) -> bool {
        self.reporters.iter().any(|r| r.prints_to_stdio())
    }
}

/// Looks up each configured reporter name in the static built-in registry.
/// In list mode, `list`/`line`/`dot` are replaced by the minimal list-mode
/// reporter (§6), since there is no dynamic code loading in this crate (§9).
pub fn build_reporters(names: &[String], output_dir: &std::path::Path, list_mode: bool) -> Result<Vec<Box<dyn Reporter>>> {
    names
        .iter()
        .map(|name| build_one(name, output_dir, list_mode))
        .collect()
}

fn build_one(name: &str, output_dir: &std::path::Path, list_mode: bool) -> Result<Box<dyn Reporter>> {
    if list_mode && matches!(name, "list" | "line" | "dot") {
        return Ok(Box::new(list::ListModeReporter::default()));
    }
    match name {
        "list" => Ok(Box::new(list::ListReporter::default())),
        "line" => Ok(Box::new(line::LineReporter::default())),
        "dot" => Ok(Box::new(dot::DotReporter::default())),
        "json" => Ok(Box::new(json::JsonReporter::new(output_dir.join("results.json")))),
        "junit" => Ok(Box::new(junit::JunitReporter::new(output_dir.join("results.xml")))),
        "null" => Ok(Box::new(null::NullReporter)),
        "github" => Ok(Box::new(github::GithubReporter)),
        "html" => Ok(Box::new(html::HtmlReporter::new(output_dir.join("report.html")))),
        other => Err(Error::UnknownReporter(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_reporter_name_is_an_error() {
        let err = build_one("not-a-real-reporter", std::path::Path::new("out"), false).unwrap_err();
        assert!(matches!(err, Error::UnknownReporter(_)));
    }

    #[test]
    fn list_mode_substitutes_list_line_and_dot_without_error() {
        for name in ["list", "line", "dot"] {
            build_one(name, std::path::Path::new("out"), true).unwrap();
        }
    }
}
