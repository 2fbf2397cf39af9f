//! `streamalert process` command handler

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use streamalert_core::config::StreamAlertConfig;
use streamalert_core::environment::InvocationContext;
use streamalert_rule_processor::{
    DeliveryOutcome, FsObjectStore, InvocationReport, JsonLinesSink, RuleEngine, RunOutcome,
    StreamAlert,
};

use crate::cli::ProcessArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `process` command.
pub async fn execute(
    args: ProcessArgs,
    config: Arc<StreamAlertConfig>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = run(&args, config).await?;
    writer.render(&report)
}

/// Build the processor from configuration and run one invocation over the event file.
async fn run(args: &ProcessArgs, config: Arc<StreamAlertConfig>) -> Result<ProcessReport, CliError> {
    let event = read_event(&args.event).await?;

    let mut rules = RuleEngine::new();
    let loaded = rules.load_rules_from_dir(&config.general.rule_dir).await?;
    info!(
        rule_dir = %config.general.rule_dir,
        rules = loaded,
        "detection rules ready"
    );

    let store = Arc::new(FsObjectStore::new(config.general.object_store_root.as_str()));
    let sink = Arc::new(JsonLinesSink::new(config.general.alert_output.as_str()));

    let processor = StreamAlert::builder()
        .config(Arc::clone(&config))
        .rules(Arc::new(rules))
        .object_store(store)
        .sink(sink)
        .return_alerts(args.return_alerts)
        .build()?;

    let context = InvocationContext::from_arn(args.context.clone());
    let invocation = processor.run_with_report(&event, &context).await?;

    let alert_output = match invocation.outcome {
        RunOutcome::Delivered(DeliveryOutcome::Delivered) => {
            Some(config.general.alert_output.clone())
        }
        _ => None,
    };

    Ok(ProcessReport {
        event: args.event.display().to_string(),
        alert_output,
        invocation,
    })
}

async fn read_event(path: &Path) -> Result<Value, CliError> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&text)?)
}

#[derive(Debug, Serialize)]
pub struct ProcessReport {
    pub event: String,
    /// Alert file written by this invocation, if any
    pub alert_output: Option<String>,
    #[serde(flatten)]
    pub invocation: InvocationReport,
}

fn delivery_label(outcome: DeliveryOutcome) -> &'static str {
    match outcome {
        DeliveryOutcome::LoggedLocally => "logged locally (development)",
        DeliveryOutcome::Delivered => "delivered",
        DeliveryOutcome::ValidNoAlerts => "no alerts",
        DeliveryOutcome::NoAction => "no action",
    }
}

impl Render for ProcessReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let stats = &self.invocation.stats;

        writeln!(w, "Invocation: {}", self.event.bold())?;
        match &self.invocation.outcome {
            RunOutcome::Returned(alerts) => {
                writeln!(w, "  Outcome: returned {} alert(s)", alerts.len())?;
            }
            RunOutcome::Delivered(outcome) => {
                writeln!(w, "  Outcome: {}", delivery_label(*outcome))?;
            }
        }
        if let Some(path) = &self.alert_output {
            writeln!(w, "  Alert output: {path}")?;
        }
        writeln!(
            w,
            "  Records: {} ({} skipped, {} unsupported)",
            stats.records, stats.skipped_records, stats.unsupported_records
        )?;
        writeln!(
            w,
            "  Data units: {} ({} invalid)",
            stats.data_units,
            if stats.invalid_data_units > 0 {
                stats.invalid_data_units.to_string().red()
            } else {
                stats.invalid_data_units.to_string().normal()
            }
        )?;
        writeln!(w, "  Alerts: {}", stats.alerts.to_string().bold())?;

        let alerts = match &self.invocation.outcome {
            RunOutcome::Returned(alerts) => alerts.as_slice(),
            RunOutcome::Delivered(_) => &[],
        };
        if !alerts.is_empty() {
            writeln!(w)?;
            writeln!(
                w,
                "{:<28} {:<10} {:<14} {:<24}",
                "Rule", "Severity", "Log Source", "Entity"
            )?;
            writeln!(w, "{}", "-".repeat(78))?;
            for alert in alerts {
                writeln!(
                    w,
                    "{:<28} {:<10} {:<14} {:<24}",
                    alert.rule_name,
                    alert.severity.as_str(),
                    alert.log_source,
                    alert.source_entity
                )?;
            }
        }

        Ok(())
    }
}
