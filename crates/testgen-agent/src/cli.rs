use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use testgen_core::FeedbackConfig;

/// Generate compilable unit tests with an LLM.
#[derive(Parser, Debug)]
#[command(name = "testgen-agent", version, about)]
pub struct Args {
    /// File holding the generation prompt; blank-line separated blocks after
    /// the first are dropped last-first when the prompt is too long
    #[arg(long)]
    pub prompt_file: PathBuf,

    /// TOML file with feedback settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Package of the generated tests
    #[arg(long)]
    pub package: Option<String>,

    /// Directory receiving generated sources
    #[arg(long)]
    pub result_path: Option<PathBuf>,

    /// Build output the tests compile against
    #[arg(long)]
    pub build_path: Option<PathBuf>,

    /// Counted attempts before the forced final attempt
    #[arg(long)]
    pub threshold: Option<u32>,

    /// Compiler command template with {file} and {build} placeholders
    #[arg(long)]
    pub compile_command: Option<String>,

    /// Write the report JSON here instead of stdout
    #[arg(long)]
    pub report_out: Option<PathBuf>,

    /// Skip the endpoint reachability check
    #[arg(long)]
    pub no_preflight: bool,
}

impl Args {
    /// Defaults, then the TOML file (or `TESTGEN_*` variables without one),
    /// then command-line flags.
    pub fn feedback_config(&self) -> Result<FeedbackConfig> {
        let mut config = match &self.config {
            Some(path) => FeedbackConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => FeedbackConfig::from_env(),
        };
        self.apply_overrides(&mut config);
        config.validate().context("Invalid feedback configuration")?;
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut FeedbackConfig) {
        if let Some(package) = &self.package {
            config.package_name = package.clone();
        }
        if let Some(path) = &self.result_path {
            config.result_path = path.clone();
        }
        if let Some(path) = &self.build_path {
            config.build_path = path.clone();
        }
        if let Some(threshold) = self.threshold {
            config.requests_count_threshold = threshold;
        }
        if let Some(command) = &self.compile_command {
            config.compile_command = command.clone();
        }
    }

    pub fn read_prompt(&self) -> Result<String> {
        std::fs::read_to_string(&self.prompt_file)
            .with_context(|| format!("Failed to read prompt {}", self.prompt_file.display()))
    }
}
