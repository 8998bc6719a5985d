//! Console and JSON rendering of validation results.

use serde::{Deserialize, Serialize};

use super::calibrate::TimeoutBound;
use super::outcome::AggregateCounts;
use super::validator::TrialReport;

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// Plain text, streamed while the run progresses.
    Console,
    /// One JSON document emitted at the end.
    Json,
}

/// Trials of one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSummary {
    /// Method label (`add`, `self.build`).
    pub method: String,
    /// Counts for this method alone.
    pub counts: AggregateCounts,
    /// Per-trial verdicts.
    pub trials: Vec<TrialReport>,
}

/// Everything one validation produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeckleSummary {
    /// Validated class.
    pub class_name: String,
    /// Single targeted method, if any.
    pub method: Option<String>,
    /// Bound every trial ran under.
    pub timeout: TimeoutBound,
    /// Whether the unmutated suite passed.
    pub baseline_passed: bool,
    /// Counts across all methods.
    pub counts: AggregateCounts,
    /// Per-method breakdown, in validation order.
    pub methods: Vec<MethodSummary>,
}

impl HeckleSummary {
    /// Nothing survived.
    pub fn success(&self) -> bool {
        self.counts.all_good()
    }
}

/// Lines printed once the timeout is known, before any trial runs.
pub fn render_header(timeout: TimeoutBound, baseline_passed: bool) -> String {
    let verdict = if baseline_passed {
        "Initial tests pass. Let's rumble."
    } else {
        "Initial tests failed but you forced things. Let's rumble."
    };
    format!("Timeout set to {timeout} seconds.\n\n{verdict}\n\n")
}

/// Final tally.
pub fn render_results(counts: &AggregateCounts) -> String {
    let verdict = if counts.all_good() {
        "All heckling was thwarted! YAY!!!"
    } else {
        "Improve the tests and try again."
    };
    format!(
        "Heckle Results:\n\nPassed    : {:>3}\nFailed    : {:>3}\nThick Skin: {:>3}\n\n{verdict}\n",
        counts.killed, counts.survived, counts.inconclusive
    )
}

/// JSON document for a finished run.
pub fn render_json(summary: &HeckleSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&serde_json::json!({
        "class": summary.class_name,
        "method": summary.method,
        "timeout_secs": summary.timeout.secs(),
        "baseline_passed": summary.baseline_passed,
        "success": summary.success(),
        "counts": summary.counts,
        "methods": summary.methods,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heckle::outcome::ValidationOutcome;

    #[test]
    fn header_reflects_baseline() {
        assert_eq!(
            render_header(TimeoutBound::fixed(5), true),
            "Timeout set to 5 seconds.\n\nInitial tests pass. Let's rumble.\n\n"
        );
        assert!(
            render_header(TimeoutBound::fixed(9), false)
                .contains("Initial tests failed but you forced things. Let's rumble.")
        );
    }

    #[test]
    fn results_block_matches_console_layout() {
        let counts = AggregateCounts {
            killed: 2,
            survived: 1,
            inconclusive: 0,
        };
        assert_eq!(
            render_results(&counts),
            "Heckle Results:\n\n\
             Passed    :   2\n\
             Failed    :   1\n\
             Thick Skin:   0\n\n\
             Improve the tests and try again.\n"
        );

        let clean = AggregateCounts {
            killed: 5,
            survived: 0,
            inconclusive: 3,
        };
        assert!(render_results(&clean).ends_with("All heckling was thwarted! YAY!!!\n"));
    }

    #[test]
    fn json_report_carries_breakdown() {
        let summary = HeckleSummary {
            class_name: "Calculator".to_string(),
            method: Some("add".to_string()),
            timeout: TimeoutBound::fixed(6),
            baseline_passed: true,
            counts: AggregateCounts {
                killed: 1,
                survived: 0,
                inconclusive: 0,
            },
            methods: vec![MethodSummary {
                method: "add".to_string(),
                counts: AggregateCounts {
                    killed: 1,
                    survived: 0,
                    inconclusive: 0,
                },
                trials: vec![TrialReport {
                    id: "Calculator#add:0".to_string(),
                    node: None,
                    description: "replace + with -".to_string(),
                    outcome: ValidationOutcome::Killed,
                    detail: None,
                }],
            }],
        };

        let json: serde_json::Value =
            serde_json::from_str(&render_json(&summary).expect("json should render"))
                .expect("json should parse");
        assert_eq!(json["class"], "Calculator");
        assert_eq!(json["timeout_secs"], 6);
        assert_eq!(json["success"], true);
        assert_eq!(json["counts"]["killed"], 1);
        assert_eq!(json["methods"][0]["trials"][0]["outcome"], "killed");
    }
}
