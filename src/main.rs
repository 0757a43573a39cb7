use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pdf_figures::config::job::JobFile;
use pdf_figures::config::merged::MergedConfig;
use pdf_figures::config::{self};
use pdf_figures::pipeline::context::Context;
use pdf_figures::pipeline::job_runner::JobConfig;
use pdf_figures::pipeline::orchestrator::run_all_jobs;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let check_only = args.iter().any(|a| a == "--check");
    args.retain(|a| a != "--check");

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: pdf_figures [--check] <jobs.yaml>...");
        eprintln!("  Extract figures from PDF manuals according to job specifications.");
        eprintln!("  --check  validate settings and job files without processing any PDF");
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("pdf_figures {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let mut job_configs: Vec<JobConfig> = Vec::new();

    for job_file_arg in &args {
        let job_file_path = Path::new(job_file_arg);

        // Load settings from the same directory as the job file.
        let settings = match config::load_settings_for_job(job_file_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: Failed to load settings for {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let yaml_content = match std::fs::read_to_string(job_file_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: Failed to read job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let job_file: JobFile = match serde_yml::from_str(&yaml_content) {
            Ok(jf) => jf,
            Err(e) => {
                eprintln!("ERROR: Failed to parse job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        // Resolve job file directory for relative paths.
        let job_dir = job_file_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        for job in &job_file.jobs {
            let merged = MergedConfig::new(&settings, job);
            job_configs.push(JobConfig {
                input_path: resolve_path(&job_dir, &job.input),
                output_dir: resolve_path(&job_dir, &job.output),
                settings: merged.settings,
                manual: merged.manual,
                pages: merged.pages,
                preview: merged.preview,
            });
        }
    }

    if check_only {
        return check_jobs(&job_configs);
    }

    let results = run_all_jobs(&job_configs);

    let mut has_error = false;
    for (job, result) in job_configs.iter().zip(&results) {
        match result {
            Ok(job_result) if job_result.preview => {
                eprintln!(
                    "PREVIEW: {} -> {} ({} pages, {} sections, {} images planned, {} rejected)",
                    job_result.input_path.display(),
                    job_result.output_dir.display(),
                    job_result.pages_processed,
                    job_result.sections,
                    job_result.images_named,
                    job_result.images_rejected
                );
            }
            Ok(job_result) => {
                eprintln!(
                    "OK: {} -> {} ({} pages, {} sections, {} images, {} rejected)",
                    job_result.input_path.display(),
                    job_result.output_dir.display(),
                    job_result.pages_processed,
                    job_result.sections,
                    job_result.images_written,
                    job_result.images_rejected
                );
            }
            Err(e) => {
                eprintln!(
                    "ERROR: {} -> {}: {e}",
                    job.input_path.display(),
                    job.output_dir.display()
                );
                has_error = true;
            }
        }
    }

    if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Validate every job's merged settings and input path without running it.
fn check_jobs(job_configs: &[JobConfig]) -> ExitCode {
    let mut has_error = false;
    for job in job_configs {
        let result = Context::new(job.settings.clone()).and_then(|_| {
            if job.input_path.is_file() {
                Ok(())
            } else {
                Err(pdf_figures::error::FigureError::config(format!(
                    "input not found: {}",
                    job.input_path.display()
                )))
            }
        });
        match result {
            Ok(()) => eprintln!("OK: {}: configuration valid", job.input_path.display()),
            Err(e) => {
                eprintln!("ERROR: {}: {e}", job.input_path.display());
                has_error = true;
            }
        }
    }

    if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Resolve a potentially relative path against a base directory.
/// If the path is already absolute, return it as-is.
fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}
