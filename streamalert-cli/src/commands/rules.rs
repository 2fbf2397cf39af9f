//! `streamalert rules` command handler

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use streamalert_core::config::StreamAlertConfig;
use streamalert_rule_processor::RuleLoader;
use streamalert_rule_processor::rule::{RuleMatcher, RuleStatus};

use crate::cli::{RulesAction, RulesArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `rules` command.
///
/// `config` is only required by `rules list`.
pub async fn execute(
    args: RulesArgs,
    config: Option<&StreamAlertConfig>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        RulesAction::List { status } => {
            let config = config.ok_or_else(|| {
                CliError::Config("rules list requires a configuration".to_owned())
            })?;
            let report = list(Path::new(&config.general.rule_dir), status.as_deref()).await?;
            writer.render(&report)
        }
        RulesAction::Validate { path } => {
            let report = validate(&path).await?;
            writer.render(&report)?;
            if report.invalid > 0 {
                return Err(CliError::Rule(format!("{} invalid rule file(s)", report.invalid)));
            }
            Ok(())
        }
    }
}

fn status_name(status: &RuleStatus) -> &'static str {
    match status {
        RuleStatus::Enabled => "enabled",
        RuleStatus::Disabled => "disabled",
        RuleStatus::Test => "test",
    }
}

async fn list(rule_dir: &Path, status_filter: Option<&str>) -> Result<RuleListReport, CliError> {
    info!(rule_dir = %rule_dir.display(), "loading detection rules");

    let rules = RuleLoader::load_directory(rule_dir).await?;

    let rules: Vec<RuleEntry> = rules
        .into_iter()
        .filter(|r| status_filter.is_none_or(|filter| status_name(&r.status) == filter))
        .map(|r| RuleEntry {
            status: status_name(&r.status).to_owned(),
            severity: r.severity.as_str().to_owned(),
            id: r.id,
            title: r.title,
            logs: r.logs,
            tags: r.tags,
        })
        .collect();

    Ok(RuleListReport {
        total: rules.len(),
        rules,
    })
}

/// Load every rule file on its own so one bad file does not hide the others.
async fn validate(path: &Path) -> Result<RuleValidationReport, CliError> {
    info!(path = %path.display(), "validating detection rules");

    let files = RuleLoader::yaml_files(path).await?;
    let mut seen_ids = HashSet::new();
    let mut errors = Vec::new();

    for file in &files {
        let file_name = file.display().to_string();

        let rule = match RuleLoader::load_file(file).await {
            Ok(rule) => rule,
            Err(e) => {
                warn!(file = %file_name, error = %e, "invalid rule file");
                errors.push(RuleError {
                    file: file_name,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let mut matcher = RuleMatcher::new();
        if let Err(e) = matcher.compile_rule(&rule) {
            errors.push(RuleError {
                file: file_name,
                error: e.to_string(),
            });
            continue;
        }

        if !seen_ids.insert(rule.id.clone()) {
            errors.push(RuleError {
                file: file_name,
                error: format!("duplicate rule id '{}'", rule.id),
            });
        }
    }

    Ok(RuleValidationReport {
        path: path.display().to_string(),
        total_files: files.len(),
        valid: files.len() - errors.len(),
        invalid: errors.len(),
        errors,
    })
}

#[derive(Serialize)]
pub struct RuleListReport {
    pub total: usize,
    pub rules: Vec<RuleEntry>,
}

#[derive(Serialize)]
pub struct RuleEntry {
    pub id: String,
    pub title: String,
    pub severity: String,
    pub status: String,
    pub logs: Vec<String>,
    pub tags: Vec<String>,
}

impl Render for RuleListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Detection Rules ({} total)",
            self.total.to_string().bold()
        )?;
        writeln!(w)?;
        writeln!(
            w,
            "{:<28} {:<30} {:<10} {:<10} Logs",
            "ID", "Title", "Severity", "Status"
        )?;
        writeln!(w, "{}", "-".repeat(96))?;

        for r in &self.rules {
            let status_colored = match r.status.as_str() {
                "enabled" => r.status.green(),
                "disabled" => r.status.yellow(),
                _ => r.status.normal(),
            };
            let logs = if r.logs.is_empty() {
                "*".to_owned()
            } else {
                r.logs.join(", ")
            };

            writeln!(
                w,
                "{:<28} {:<30} {:<10} {:<10} {}",
                r.id, r.title, r.severity, status_colored, logs
            )?;
        }

        Ok(())
    }
}

#[derive(Serialize)]
pub struct RuleValidationReport {
    pub path: String,
    pub total_files: usize,
    pub valid: usize,
    pub invalid: usize,
    pub errors: Vec<RuleError>,
}

#[derive(Serialize)]
pub struct RuleError {
    pub file: String,
    pub error: String,
}

impl Render for RuleValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Rule Validation: {}", self.path.bold())?;
        writeln!(
            w,
            "  Files: {} total, {} valid, {} invalid",
            self.total_files,
            self.valid.to_string().green(),
            if self.invalid > 0 {
                self.invalid.to_string().red()
            } else {
                self.invalid.to_string().normal()
            }
        )?;

        if !self.errors.is_empty() {
            writeln!(w)?;
            writeln!(w, "Errors:")?;
            for e in &self.errors {
                writeln!(w, "  {}: {}", e.file.red(), e.error)?;
            }
        }

        Ok(())
    }
}
