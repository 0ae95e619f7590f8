use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use humanizer::completion::OllamaClient;
use humanizer::error::PipelineError;
use humanizer::output::{render_evaluation, render_report, write_outputs};
use humanizer::{
    Config, GenerationRequest, PipelineOutcome, RewriteController, RewriteSettings, metrics,
    policy,
};

use crate::cli::commands::{Cli, Commands};

/// Text written (accepted or exhausted), or `check` passed.
pub const EXIT_OK: u8 = 0;
/// `check` found violations, or a non-transport error.
pub const EXIT_FAILED: u8 = 1;
/// The model server could not produce text.
pub const EXIT_TRANSPORT: u8 = 2;

/// Exit status for a failure that reached `main`.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    let transport = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<PipelineError>())
        .any(PipelineError::is_transport);
    if transport { EXIT_TRANSPORT } else { EXIT_FAILED }
}

/// Load the config named on the command line, or the per-user one.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_init()?,
    };
    config.apply_env_overrides();
    config.validate().context("Invalid environment override")?;
    Ok(config)
}

fn apply_word_bounds(config: &mut Config, min_words: Option<usize>, max_words: Option<usize>) {
    if min_words.is_some() {
        config.thresholds.min_words = min_words;
    }
    if max_words.is_some() {
        config.thresholds.max_words = max_words;
    }
}

/// `--check-structure` only switches layout checks on; config can too.
fn apply_layout_checks(config: &mut Config, enabled: bool) {
    if enabled {
        let thresholds = &mut config.thresholds;
        thresholds.require_structure = true;
        thresholds.require_opening_first_person = true;
        thresholds.require_keyword_placement = true;
        thresholds.check_seo_lengths = true;
    }
}

struct GenerateArgs {
    topic: String,
    details: String,
    model: Option<String>,
    keyword: Option<String>,
    out: PathBuf,
    show_draft: bool,
}

async fn run_generate(config: &Config, args: GenerateArgs) -> Result<PipelineOutcome> {
    let style = Arc::new(
        config
            .load_style_guide()
            .context("Failed to load style guide")?,
    );
    let client = Arc::new(OllamaClient::new(
        Some(config.completion.base_url.as_str()),
        config.completion.timeout_secs,
    ));
    let settings = RewriteSettings::from_config(config);
    let controller =
        RewriteController::new(client, style, config.thresholds.clone(), settings)?;

    let model = args
        .model
        .unwrap_or_else(|| config.completion.model.clone());
    let mut request = GenerationRequest::new(args.topic, args.details, model);
    if let Some(keyword) = args.keyword {
        request = request.with_keyword(keyword);
    }
    info!(
        base_url = %config.completion.base_url,
        max_attempts = settings.max_attempts,
        "starting pipeline"
    );

    // Transport failures propagate before anything touches the filesystem.
    let outcome = controller.run(&request).await?;
    let run = outcome.run();
    let files = write_outputs(
        &args.out,
        run.candidate.text(),
        args.show_draft.then(|| run.draft.text()),
    )?;

    print!("{}", render_report(&outcome, &files));
    if !outcome.is_accepted() {
        warn!(
            attempts = run.attempts,
            "text still fails {} check(s); review it before publishing",
            run.verdict.violations.len()
        );
    }
    Ok(outcome)
}

/// Offline evaluation of an existing file. Returns whether it passes.
fn run_check(config: &Config, file: &Path, keyword: Option<&str>) -> Result<bool> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let style = config
        .load_style_guide()
        .context("Failed to load style guide")?;

    let report = metrics::evaluate_with_keyword(&text, &style.blocklist, keyword);
    let verdict = policy::evaluate(&report, &config.thresholds);
    print!("{}", render_evaluation(&report, &verdict));

    Ok(verdict.passed)
}

/// Run one command and return its exit status.
pub async fn dispatch(cli: Cli, mut config: Config) -> Result<u8> {
    match cli.command {
        Commands::Generate {
            topic,
            details,
            model,
            keyword,
            out,
            show_draft,
            max_attempts,
            min_words,
            max_words,
            check_structure,
        } => {
            if let Some(max_attempts) = max_attempts {
                config.rewrite.max_attempts = max_attempts;
            }
            apply_word_bounds(&mut config, min_words, max_words);
            apply_layout_checks(&mut config, check_structure);
            config.validate().context("Invalid command-line option")?;

            // Exhausted runs still wrote their text.
            run_generate(
                &config,
                GenerateArgs {
                    topic,
                    details,
                    model,
                    keyword,
                    out,
                    show_draft,
                },
            )
            .await?;
            Ok(EXIT_OK)
        }
        Commands::Check {
            file,
            keyword,
            min_words,
            max_words,
            check_structure,
        } => {
            apply_word_bounds(&mut config, min_words, max_words);
            apply_layout_checks(&mut config, check_structure);
            config.validate().context("Invalid command-line option")?;
            let passed = run_check(&config, &file, keyword.as_deref())?;
            Ok(if passed { EXIT_OK } else { EXIT_FAILED })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use humanizer::error::CompletionError;
    use humanizer::output::draft_path;
    use humanizer::pipeline::Stage;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Fails the default checks: no first person, no numbers, uniform sentences.
    const BLAND: &str = "Das Gericht ist köstlich und schnell. Die Pasta kocht im großen Topf.";

    async fn ollama_replying(response: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(response)
            .mount(&server)
            .await;
        server
    }

    fn config_for(server: &MockServer) -> Config {
        let mut config = Config::default();
        config.completion.base_url = server.uri();
        config.completion.model = "test-model".into();
        config.completion.timeout_secs = 10;
        config
    }

    fn generate_cli(out: &Path) -> Cli {
        let out = out.to_str().unwrap();
        Cli::try_parse_from([
            "humanizer",
            "generate",
            "--topic",
            "One-Pot-Pasta im Van",
            "--details",
            "12-14 Min",
            "--out",
            out,
            "--show-draft",
            "--max-attempts",
            "1",
        ])
        .unwrap()
    }

    #[test]
    fn transport_failure_exits_with_two() {
        let err = anyhow::Error::new(PipelineError::transport(
            Stage::Draft,
            CompletionError::Request {
                provider: "ollama".into(),
                message: "connection refused".into(),
            },
        ));
        assert_eq!(exit_code_for(&err), EXIT_TRANSPORT);
        assert_eq!(exit_code_for(&err.context("generate failed")), EXIT_TRANSPORT);
    }

    #[test]
    fn other_failures_exit_with_one() {
        assert_eq!(exit_code_for(&anyhow::anyhow!("disk full")), EXIT_FAILED);
    }

    #[test]
    fn word_bounds_only_override_when_given() {
        let mut config = Config::default();
        config.thresholds.max_words = Some(1200);
        apply_word_bounds(&mut config, Some(700), None);
        assert_eq!(config.thresholds.min_words, Some(700));
        assert_eq!(config.thresholds.max_words, Some(1200));
    }

    #[test]
    fn structure_flag_enables_every_layout_check() {
        let mut config = Config::default();
        apply_layout_checks(&mut config, false);
        assert!(!config.thresholds.require_structure);

        apply_layout_checks(&mut config, true);
        let t = &config.thresholds;
        assert!(t.require_structure);
        assert!(t.require_opening_first_person);
        assert!(t.require_keyword_placement);
        assert!(t.check_seo_lengths);
    }

    #[tokio::test]
    async fn server_error_exits_two_and_writes_nothing() {
        let server = ollama_replying(
            ResponseTemplate::new(500).set_body_string("model 'test-model' not found"),
        )
        .await;
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out.md");

        let err = dispatch(generate_cli(&out), config_for(&server))
            .await
            .unwrap_err();

        assert_eq!(exit_code_for(&err), EXIT_TRANSPORT);
        assert!(!out.exists());
        assert!(!draft_path(&out).exists());
        assert_eq!(server.received_requests().await.unwrap_or_default().len(), 1);
    }

    #[tokio::test]
    async fn unreachable_server_exits_two() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out.md");
        let mut config = Config::default();
        config.completion.base_url = "http://127.0.0.1:9".into();
        config.completion.timeout_secs = 5;

        let err = dispatch(generate_cli(&out), config).await.unwrap_err();
        assert_eq!(exit_code_for(&err), EXIT_TRANSPORT);
        assert!(!out.exists());
        assert!(!draft_path(&out).exists());
    }

    #[tokio::test]
    async fn exhausted_run_exits_zero_and_writes_text() {
        let server = ollama_replying(ResponseTemplate::new(200).set_body_json(json!({
            "model": "test-model",
            "message": {"role": "assistant", "content": BLAND},
            "done": true
        })))
        .await;
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out.md");

        let outcome = run_generate(
            &config_for(&server),
            GenerateArgs {
                topic: "One-Pot-Pasta im Van".into(),
                details: "12-14 Min".into(),
                model: None,
                keyword: None,
                out: out.clone(),
                show_draft: false,
            },
        )
        .await
        .unwrap();
        assert!(!outcome.is_accepted());
        assert_eq!(std::fs::read_to_string(&out).unwrap().trim_end(), BLAND);

        let code = dispatch(generate_cli(&out), config_for(&server))
            .await
            .unwrap();
        assert_eq!(code, EXIT_OK);
        assert!(draft_path(&out).exists());
    }

    #[test]
    fn check_reports_pass_and_fail() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("article.md");
        std::fs::write(&file, "Das Fazit ist köstlich.").unwrap();

        let config = Config::default();
        assert!(!run_check(&config, &file, None).unwrap());

        let mut lenient = Config::default();
        lenient.thresholds.min_ttr = 0.0;
        lenient.thresholds.min_var_sentence_len = 0.0;
        lenient.thresholds.min_first_person = 0.0;
        lenient.thresholds.min_numbers = 0;
        lenient.thresholds.max_blocklist_hits = 5;
        assert!(run_check(&lenient, &file, None).unwrap());

        apply_layout_checks(&mut lenient, true);
        assert!(!run_check(&lenient, &file, Some("Fazit")).unwrap());
    }

    #[test]
    fn check_missing_file_is_error() {
        let err = run_check(&Config::default(), Path::new("/nonexistent/a.md"), None).unwrap_err();
        assert_eq!(exit_code_for(&err), EXIT_FAILED);
    }
}
