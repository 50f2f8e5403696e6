//! Runs simple tests and collects a summary per file.

use std::fmt;
use std::path::Path;

use anyhow::Context as _;
use cel_walk::{ParseOptions, Value};
use tracing::{debug, info};

use crate::model::{ErrorSetMatcher, Expectation, SimpleTest};
use crate::value::{from_proto, to_proto, values_match};
use crate::{load_test_file, Binding, CelWalkService, ConformanceService, EvalResponse};

/// The result of running one test.
#[derive(Debug, Clone, PartialEq)]
pub enum TestOutcome {
    Passed,
    Failed(String),
}

impl TestOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, TestOutcome::Passed)
    }
}

/// A failing test and why it failed.
#[derive(Debug, Clone, PartialEq)]
pub struct TestFailure {
    pub section: String,
    pub test: String,
    pub expr: String,
    pub reason: String,
}

impl fmt::Display for TestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: `{}`: {}", self.section, self.test, self.expr, self.reason)
    }
}

/// Totals for one test file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileSummary {
    pub name: String,
    pub passed: usize,
    pub failures: Vec<TestFailure>,
}

impl FileSummary {
    pub fn total(&self) -> usize {
        self.passed + self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for FileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}/{} passed", self.name, self.passed, self.total())?;
        for failure in &self.failures {
            writeln!(f, "  FAIL {failure}")?;
        }
        Ok(())
    }
}

/// Runs `test` through the default service.
pub fn run_test(test: &SimpleTest) -> TestOutcome {
    run_test_with(&CelWalkService::new(), test)
}

pub fn run_test_with(service: &dyn ConformanceService, test: &SimpleTest) -> TestOutcome {
    match evaluate(service, test).and_then(|response| judge(test, response)) {
        Ok(()) => TestOutcome::Passed,
        Err(err) => TestOutcome::Failed(format!("{err:#}")),
    }
}

/// Loads and runs every test in the file at `path`.
pub fn run_file(path: impl AsRef<Path>) -> anyhow::Result<FileSummary> {
    let path = path.as_ref();
    let file = load_test_file(path).with_context(|| format!("load '{}'", path.display()))?;
    let service = CelWalkService::new();

    let mut summary = FileSummary {
        name: file.name.clone(),
        ..FileSummary::default()
    };
    for section in &file.section {
        for test in &section.test {
            match run_test_with(&service, test) {
                TestOutcome::Passed => summary.passed += 1,
                TestOutcome::Failed(reason) => {
                    debug!(section = %section.name, test = %test.name, %reason, "test failed");
                    summary.failures.push(TestFailure {
                        section: section.name.clone(),
                        test: test.name.clone(),
                        expr: test.expr.clone(),
                        reason,
                    });
                }
            }
        }
    }
    info!(
        file = %summary.name,
        passed = summary.passed,
        failed = summary.failures.len(),
        "conformance file finished"
    );
    Ok(summary)
}

fn evaluate(service: &dyn ConformanceService, test: &SimpleTest) -> anyhow::Result<EvalResponse> {
    let options = ParseOptions {
        disable_macros: test.disable_macros,
        enable_optional_syntax: test.enable_optional_syntax,
        ..ParseOptions::default()
    };
    let parsed = service.parse(&test.expr, &options);
    let Some(mut expr) = parsed.expr else {
        let messages: Vec<_> = parsed.issues.iter().map(|i| i.message.as_str()).collect();
        anyhow::bail!("parse failed: {}", messages.join("; "));
    };

    if !test.disable_check {
        let checked = service.check(&expr, &test.type_env, &test.container);
        expr = checked.checked.context("check produced no expression")?;
    }

    let bindings = test
        .bindings
        .iter()
        .map(|(name, bound)| {
            let value = from_proto(&bound.value).with_context(|| format!("binding '{name}'"))?;
            Ok(Binding {
                name: name.clone(),
                value,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(service.eval(&expr, &bindings, &test.container))
}

fn judge(test: &SimpleTest, response: EvalResponse) -> anyhow::Result<()> {
    match (test.expectation(), response.result) {
        (Expectation::Value(expected), Some(actual)) => {
            let expected = from_proto(expected).context("expected value")?;
            anyhow::ensure!(
                values_match(&actual, &expected),
                "expected {}, got {}",
                describe(&expected),
                describe(&actual)
            );
            Ok(())
        }
        (Expectation::Value(expected), None) => {
            let expected = from_proto(expected).context("expected value")?;
            anyhow::bail!(
                "expected {}, got errors: {}",
                describe(&expected),
                issue_messages(&response.issues).join("; ")
            )
        }
        (Expectation::EvalError(matcher), None) => {
            match_errors(matcher, &issue_messages(&response.issues))
        }
        (Expectation::AnyEvalErrors(any), None) => {
            let messages = issue_messages(&response.issues);
            anyhow::ensure!(
                any.errors.iter().any(|m| match_errors(m, &messages).is_ok()),
                "no expected error set matched: {}",
                messages.join("; ")
            );
            Ok(())
        }
        (_, Some(actual)) => anyhow::bail!("expected an error, got {}", describe(&actual)),
    }
}

fn issue_messages(issues: &[crate::Issue]) -> Vec<&str> {
    issues.iter().map(|i| i.message.as_str()).collect()
}

/// Every expected message must appear among the reported ones.
fn match_errors(matcher: &ErrorSetMatcher, messages: &[&str]) -> anyhow::Result<()> {
    for expected in &matcher.errors {
        anyhow::ensure!(
            messages.iter().any(|m| m.contains(expected.message.as_str())),
            "expected error '{}', got: {}",
            expected.message,
            messages.join("; ")
        );
    }
    Ok(())
}

fn describe(value: &Value) -> String {
    to_proto(value)
        .ok()
        .and_then(|proto| serde_json::to_string(&proto).ok())
        .unwrap_or_else(|| value.to_string())
}
