//! User-facing run output
//!
//! Scenario notices, listings and the final tally go to stdout through
//! [`Reporter`]; diagnostics go through `tracing` to stderr. Tests capture
//! the reporter's output with [`Reporter::capture`].

use crate::errors::StructureError;
use crate::layout::EXPECTED_STRUCTURE;
use crate::runner::TestRunSummary;
use crate::scenario::ScenarioCatalog;
use std::fmt::Display;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Line-oriented writer for run notices
pub struct Reporter {
    out: Box<dyn Write + Send>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Reporter {
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    /// Reporter writing into a shared in-memory buffer
    pub fn capture() -> (Self, CapturedOutput) {
        let buffer = CapturedOutput::default();
        (Self::new(Box::new(buffer.clone())), buffer)
    }

    /// Write one line; write failures are logged and otherwise ignored
    pub fn line(&mut self, text: impl Display) {
        if let Err(e) = writeln!(self.out, "{text}") {
            debug!("Failed to write report output: {}", e);
        }
    }

    pub fn blank(&mut self) {
        self.line("");
    }

    pub fn flush(&mut self) {
        let _ = self.out.flush();
    }

    /// Explain an invalid feature layout
    pub fn invalid_structure(&mut self, error: &StructureError) {
        self.line("❌ Invalid feature structure");
        match error {
            StructureError::InvalidLayout { base, found, .. } => {
                self.line(format!("Looking in: {}", base.display()));
                self.line("Expected structure:");
                for path in EXPECTED_STRUCTURE {
                    self.line(format!("  - {path}"));
                }
                self.blank();
                self.line("Actual structure found:");
                for entry in found {
                    self.line(format!("  - {entry}"));
                }
            }
            StructureError::MissingPath { path } => {
                self.line(format!("Missing: {}", path.display()));
            }
        }
    }

    /// Usage banner shown when no scenario is named
    pub fn usage(&mut self, feature_id: &str, first_scenario: Option<&str>) {
        self.line(format!("🧪 Testing feature: {feature_id}"));
        self.blank();
        self.line("Usage: devfeat test [scenario] [options]");
        self.blank();
        self.line("Examples:");
        self.line("  devfeat test                    # Test all scenarios");
        if let Some(first) = first_scenario {
            self.line(format!("  devfeat test {first}   # Test specific scenario"));
        }
        self.line("  devfeat test --list-scenarios   # List available scenarios");
        self.blank();
        self.line("Options:");
        self.line("  --list-scenarios   List all available scenarios");
        self.line("  --verbose          Show detailed output");
        self.line("  --no-cleanup       Keep containers after test");
        self.line("  --no-common-utils  Skip installing common utilities");
        self.blank();
    }

    /// Print every catalog entry with its image and feature block
    pub fn listing(&mut self, feature_id: &str, catalog: &ScenarioCatalog) {
        self.line(format!("📋 Available scenarios for '{feature_id}':"));
        for (index, (name, scenario)) in catalog.iter().enumerate() {
            let features =
                serde_json::to_string_pretty(&scenario.features).unwrap_or_else(|_| "{}".into());
            self.line(format!("  {}. {}", index + 1, name));
            self.line(format!("     Image: {}", scenario.image));
            self.line(format!(
                "     Features: {}",
                features.replace('\n', "\n     ")
            ));
            self.blank();
        }
    }

    pub fn unknown_scenario(&mut self, name: &str, catalog: &ScenarioCatalog) {
        self.line(format!("❌ Scenario '{name}' not found"));
        self.line("Available scenarios:");
        for available in catalog.names() {
            self.line(format!("  - {available}"));
        }
    }

    pub fn run_header(&mut self, feature_id: &str, selected: &[&str], common_utils: bool) {
        self.line(format!("🧪 Testing feature '{feature_id}'"));
        self.line(format!("📊 Scenarios to test: {}", selected.join(", ")));
        if common_utils {
            self.line("🔧 Common utilities will be installed automatically");
        }
        self.blank();
    }

    pub fn scenario_header(&mut self, name: &str, image: &str) {
        self.line(format!("🔍 Testing scenario: {name}"));
        self.line(format!("📦 Image: {image}"));
    }

    /// Print `output`, truncated to `limit` lines unless `verbose`
    pub fn test_output(&mut self, output: &str, limit: usize, verbose: bool) {
        if verbose {
            self.line("Test output:");
            self.line(output);
            return;
        }
        let (shown, truncated) = truncate_lines(output, limit);
        if truncated {
            self.line("Test output (truncated):");
            self.line(shown);
            self.line("...");
        } else {
            self.line("Test output:");
            self.line(shown);
        }
    }

    pub fn preserved(&mut self, path: &Path) {
        self.line(format!("📁 Test files preserved at: {}", path.display()));
    }

    /// Final tally plus debugging tips when something failed
    pub fn summary(&mut self, feature_id: &str, summary: &TestRunSummary) {
        self.line("📊 Test Summary:");
        self.line(format!("   Total scenarios: {}", summary.total()));
        self.line(format!("   ✅ Passed: {}", summary.passed()));
        self.line(format!("   ❌ Failed: {}", summary.failed()));

        if summary.failed() > 0 {
            self.blank();
            self.line("💡 Tips for debugging failures:");
            self.line("  - Use --verbose for detailed output");
            self.line("  - Use --no-cleanup to inspect generated files");
            self.line("  - Check the feature installation script and test script");
            self.line("  - Use --no-common-utils if common utilities cause conflicts");
        } else {
            self.blank();
            self.line(format!("🎉 All tests passed for feature '{feature_id}'!"));
        }
        self.flush();
    }
}

/// First `limit` lines of `text`, and whether anything was cut
pub fn truncate_lines(text: &str, limit: usize) -> (String, bool) {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() > limit {
        (lines[..limit].join("\n"), true)
    } else {
        (text.to_string(), false)
    }
}

/// Shared buffer behind [`Reporter::capture`]
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    pub fn contents(&self) -> String {
        self.buffer
            .lock()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .map_err(|_| io::Error::other("capture buffer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
