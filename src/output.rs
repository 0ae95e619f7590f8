//! Output files and the console report.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::metrics::MetricReport;
use crate::pipeline::PipelineOutcome;
use crate::policy::AcceptanceVerdict;

/// `out.md` -> `out_draft.md`, next to the final text.
pub fn draft_path(out: &Path) -> PathBuf {
    let stem = out
        .file_stem()
        .map_or_else(|| "out".to_string(), |s| s.to_string_lossy().into_owned());
    let name = match out.extension() {
        Some(ext) => format!("{stem}_draft.{}", ext.to_string_lossy()),
        None => format!("{stem}_draft"),
    };
    out.with_file_name(name)
}

/// Files written by [`write_outputs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub text: PathBuf,
    pub draft: Option<PathBuf>,
}

/// Write the final text, and the pre-edit draft when one is given.
pub fn write_outputs(out: &Path, text: &str, draft: Option<&str>) -> Result<WrittenFiles> {
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    fs::write(out, with_trailing_newline(text))
        .with_context(|| format!("Failed to write {}", out.display()))?;

    let draft = match draft {
        Some(draft) => {
            let path = draft_path(out);
            fs::write(&path, with_trailing_newline(draft))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Some(path)
        }
        None => None,
    };

    Ok(WrittenFiles {
        text: out.to_path_buf(),
        draft,
    })
}

fn with_trailing_newline(text: &str) -> String {
    let mut owned = text.trim_end().to_string();
    owned.push('\n');
    owned
}

/// Metrics as pretty JSON followed by the violation list.
pub fn render_evaluation(report: &MetricReport, verdict: &AcceptanceVerdict) -> String {
    let mut out = serde_json::to_string_pretty(report)
        .unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"));
    out.push('\n');
    if verdict.passed {
        out.push_str("All checks passed.\n");
    } else {
        out.push_str("Violations:\n");
        for violation in &verdict.violations {
            let _ = writeln!(out, "  - {}", violation.describe());
        }
    }
    out
}

/// Full report printed after `generate`.
pub fn render_report(outcome: &PipelineOutcome, files: &WrittenFiles) -> String {
    let run = outcome.run();
    let mut out = render_evaluation(&run.report, &run.verdict);
    let status = if outcome.is_accepted() {
        "accepted"
    } else {
        "exhausted (best effort, checks still failing)"
    };
    let _ = writeln!(
        out,
        "Outcome: {status} after {} rewrite(s), {} completion call(s)",
        run.attempts, run.completion_calls
    );
    let _ = writeln!(out, "Wrote {}", files.text.display());
    if let Some(draft) = &files.draft {
        let _ = writeln!(out, "Draft saved to {}", draft.display());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::StructureReport;
    use crate::pipeline::{CandidateText, CandidateVersion, ControllerState, PipelineRun};
    use crate::policy::{Criterion, Violation};
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn report() -> MetricReport {
        MetricReport {
            blocklist_hits: BTreeSet::new(),
            sentence_length_variance: 12.5,
            type_token_ratio: 0.61,
            first_person_ratio: 0.02,
            numeric_token_count: 4,
            word_count: 812,
            sentence_count: 40,
            second_person_count: 6,
            formal_address_count: 0,
            structure: StructureReport::default(),
        }
    }

    fn run(verdict: AcceptanceVerdict) -> PipelineRun {
        PipelineRun {
            draft: CandidateText::new(CandidateVersion::Draft, "Entwurf"),
            candidate: CandidateText::new(CandidateVersion::Rewrite(3), "Final"),
            report: report(),
            verdict,
            attempts: 3,
            completion_calls: 5,
            trace: vec![ControllerState::Exhausted],
        }
    }

    #[test]
    fn draft_path_keeps_extension() {
        assert_eq!(draft_path(Path::new("out.md")), PathBuf::from("out_draft.md"));
        assert_eq!(
            draft_path(Path::new("/tmp/articles/pasta.txt")),
            PathBuf::from("/tmp/articles/pasta_draft.txt")
        );
        assert_eq!(draft_path(Path::new("article")), PathBuf::from("article_draft"));
    }

    #[test]
    fn writes_text_and_optional_draft() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("sub").join("out.md");

        let files = write_outputs(&out, "Finaler Text", Some("Rohentwurf")).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "Finaler Text\n");
        let draft = files.draft.unwrap();
        assert_eq!(draft, tmp.path().join("sub").join("out_draft.md"));
        assert_eq!(fs::read_to_string(draft).unwrap(), "Rohentwurf\n");
    }

    #[test]
    fn no_draft_file_without_request() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out.md");
        let files = write_outputs(&out, "Text", None).unwrap();
        assert!(files.draft.is_none());
        assert!(!tmp.path().join("out_draft.md").exists());
    }

    #[test]
    fn evaluation_lists_violations() {
        let verdict = AcceptanceVerdict {
            passed: false,
            violations: vec![Violation {
                criterion: Criterion::TypeTokenRatio,
                observed: 0.38,
                threshold: 0.45,
            }],
        };
        let text = render_evaluation(&report(), &verdict);
        assert!(text.contains("\"word_count\": 812"));
        assert!(text.contains("  - type_token_ratio: 0.38 (target >= 0.45)"));
    }

    #[test]
    fn report_marks_exhaustion() {
        let verdict = AcceptanceVerdict {
            passed: false,
            violations: vec![Violation {
                criterion: Criterion::NumericTokens,
                observed: 1.0,
                threshold: 3.0,
            }],
        };
        let outcome = PipelineOutcome::Exhausted(run(verdict));
        let files = WrittenFiles {
            text: PathBuf::from("out.md"),
            draft: Some(PathBuf::from("out_draft.md")),
        };
        let text = render_report(&outcome, &files);
        assert!(text.contains("Outcome: exhausted"));
        assert!(text.contains("after 3 rewrite(s), 5 completion call(s)"));
        assert!(text.contains("Wrote out.md"));
        assert!(text.contains("Draft saved to out_draft.md"));
    }

    #[test]
    fn report_for_accepted_run() {
        let outcome = PipelineOutcome::Accepted(run(AcceptanceVerdict {
            passed: true,
            violations: vec![],
        }));
        let files = WrittenFiles {
            text: PathBuf::from("out.md"),
            draft: None,
        };
        let text = render_report(&outcome, &files);
        assert!(text.contains("All checks passed."));
        assert!(text.contains("Outcome: accepted"));
        assert!(!text.contains("Draft saved"));
    }
}
