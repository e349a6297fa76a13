//! Report generation for conformance results.

use serde::{Deserialize, Serialize};

use crate::verify::VerificationSummary;

/// A conformance report over one or more fixture sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    /// Report title.
    pub title: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    /// Verification summary.
    pub summary: VerificationSummary,
}

impl ConformanceReport {
    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Total: {}\n", self.summary.total));
        out.push_str(&format!("- Passed: {}\n", self.summary.passed));
        out.push_str(&format!("- Failed: {}\n\n", self.summary.failed));

        out.push_str("| Case | Section | IOSTAT | Status |\n");
        out.push_str("|------|---------|--------|--------|\n");
        for r in &self.summary.results {
            let status = if r.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                r.case_name, r.section, r.actual_iostat, status
            ));
        }

        let failures: Vec<_> = self.summary.failures().collect();
        if !failures.is_empty() {
            out.push_str("\n## Failures\n");
            for r in failures {
                out.push_str(&format!("\n### {}\n\n", r.case_name));
                if r.expected_iostat != r.actual_iostat {
                    out.push_str(&format!(
                        "IOSTAT expected {} got {}\n\n",
                        r.expected_iostat, r.actual_iostat
                    ));
                }
                if let Some(diff) = &r.diff {
                    out.push_str(&format!("```\n{diff}```\n"));
                }
            }
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::VerificationResult;

    #[test]
    fn markdown_lists_failures_with_diff() {
        let report = ConformanceReport {
            title: "fortio".to_string(),
            timestamp: "2026-10-01T00:00:00Z".to_string(),
            summary: VerificationSummary::from_results(vec![VerificationResult {
                case_name: "i5".to_string(),
                section: "edit I".to_string(),
                passed: false,
                expected: "   42".to_string(),
                actual: "42".to_string(),
                expected_iostat: 0,
                actual_iostat: 13,
                diff: Some("--- expected\n+++ actual\n".to_string()),
            }]),
        };
        let md = report.to_markdown();
        assert!(md.contains("| i5 | edit I | 13 | FAIL |"));
        assert!(md.contains("IOSTAT expected 0 got 13"));
        let json: serde_json::Value = serde_json::from_str(&report.to_json()).expect("json");
        assert_eq!(json["summary"]["failed"], 1);
    }
}
