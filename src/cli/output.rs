//! Output formatting for analyses, intents and generation reports
//!
//! JSON and YAML are machine-readable dumps of the same structures; the human
//! format is a compact summary for the terminal.
//!
//! # Example
//!
//! ```ignore
//! use infrakit::cli::output::{OutputFormat, OutputFormatter};
//!
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! println!("{}", formatter.format_analysis(&analysis)?);
//! ```

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analysis::Analysis;
use crate::config::InfrakitConfig;
use crate::intent::confirm::render_intent;
use crate::intent::Intent;
use crate::output::WriteOutcome;
use crate::pipeline::GenerationReport;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_analysis(&self, analysis: &Analysis) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(analysis, "analysis"),
            OutputFormat::Yaml => to_yaml(analysis, "analysis"),
            OutputFormat::Human => Ok(analysis_human(analysis)),
        }
    }

    pub fn format_intent(&self, intent: &Intent) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(intent, "intent"),
            OutputFormat::Yaml => to_yaml(intent, "intent"),
            OutputFormat::Human => Ok(render_intent(intent)),
        }
    }

    pub fn format_report(&self, report: &GenerationReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&report_view(report), "generation report"),
            OutputFormat::Yaml => to_yaml(&report_view(report), "generation report"),
            OutputFormat::Human => Ok(report_human(report)),
        }
    }

    pub fn format_config(&self, config: &InfrakitConfig) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&config.to_display_map(), "config"),
            OutputFormat::Yaml => to_yaml(&config.to_display_map(), "config"),
            OutputFormat::Human => Ok(config.to_string()),
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string_pretty(value).with_context(|| format!("Failed to serialize {} to JSON", what))
}

fn to_yaml<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_yaml::to_string(value).with_context(|| format!("Failed to serialize {} to YAML", what))
}

/// The report without the embedded analysis; `analyze` prints that on its own
#[derive(Serialize)]
struct ReportView<'a> {
    output_dir: &'a std::path::Path,
    intent: &'a Intent,
    written: &'a [crate::output::WriteReport],
    failures: &'a [crate::error::FamilyFailure],
}

fn report_view(report: &GenerationReport) -> ReportView<'_> {
    ReportView {
        output_dir: &report.output_dir,
        intent: &report.intent,
        written: &report.written,
        failures: &report.failures,
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

fn analysis_human(analysis: &Analysis) -> String {
    let mut output = String::new();
    output.push_str(&format!("\u{2713} Project Analysis: {}\n", analysis.project_name));
    output.push_str(RULE);
    output.push_str("\n\n");

    output.push_str(&format!("Project Type:  {}\n", analysis.project_type));
    if let Some(pm) = analysis.package_manager {
        output.push_str(&format!("Package Mgr:   {}\n", pm));
    }
    output.push_str(&format!("Tech Stack:    {}\n", list_or_none(&analysis.tech_stack)));
    let runtime_deps = analysis.dependencies.iter().filter(|d| !d.dev).count();
    output.push_str(&format!(
        "Dependencies:  {} ({} dev)\n\n",
        runtime_deps,
        analysis.dependencies.len() - runtime_deps
    ));

    output.push_str("Services:\n");
    let services: Vec<_> = analysis
        .databases
        .iter()
        .chain(&analysis.caches)
        .chain(&analysis.queues)
        .chain(&analysis.storage)
        .collect();
    if services.is_empty() {
        output.push_str("\u{2514}\u{2500} (none detected)\n");
    }
    for (i, service) in services.iter().enumerate() {
        let connector = if i == services.len() - 1 { "\u{2514}" } else { "\u{251C}" };
        output.push_str(&format!(
            "{}\u{2500} {}: {} ({})\n",
            connector,
            service_category(service.category()),
            service.service(),
            service.evidence()
        ));
    }
    output.push('\n');

    let ports: Vec<String> = analysis
        .endpoints
        .iter()
        .map(|e| match &e.process {
            Some(process) => format!("{} ({})", e.port, process),
            None => e.port.to_string(),
        })
        .collect();
    output.push_str(&format!("Ports:         {}\n", list_or_none(&ports)));

    let secrets = analysis.env.iter().filter(|e| e.secret).count();
    output.push_str(&format!(
        "Env Keys:      {} ({} secret)\n",
        analysis.env.len(),
        secrets
    ));

    let infra = &analysis.infra;
    let mut tooling = Vec::new();
    if infra.has_container_build {
        tooling.push("container build".to_string());
    }
    if infra.has_orchestration {
        tooling.push("orchestration".to_string());
    }
    if infra.has_provisioning_code {
        tooling.push("provisioning".to_string());
    }
    if infra.has_ci {
        tooling.push("ci".to_string());
    }
    output.push_str(&format!("Tooling:       {}\n", list_or_none(&tooling)));

    if let Some(summary) = &analysis.infrastructure {
        output.push_str(&format!(
            "\nCloud ({} / {}): {} resources, ~${:.2}/month\n",
            summary.account, summary.region, summary.total_resources, summary.estimated_monthly_cost
        ));
        for category in &summary.categories {
            output.push_str(&format!("  - {}: {}\n", category.category, category.count));
        }
    }

    if !analysis.recommendations.is_empty() {
        output.push_str("\n\u{26A0} Recommendations:\n");
        for rec in &analysis.recommendations {
            output.push_str(&format!("  - {}\n", rec.message));
        }
    }

    if !analysis.next_actions.is_empty() {
        output.push_str("\nNext Actions:\n");
        for action in &analysis.next_actions {
            output.push_str(&format!("  - {}\n", action));
        }
    }

    output
}

fn service_category(category: crate::analysis::ServiceCategory) -> &'static str {
    use crate::analysis::ServiceCategory;
    match category {
        ServiceCategory::Database => "database",
        ServiceCategory::Cache => "cache",
        ServiceCategory::Queue => "queue",
        ServiceCategory::Storage => "storage",
    }
}

fn report_human(report: &GenerationReport) -> String {
    let mut output = String::new();
    if report.is_complete() {
        output.push_str("\u{2713} Generation Complete\n");
    } else {
        output.push_str("\u{26A0} Generation Incomplete\n");
    }
    output.push_str(RULE);
    output.push_str("\n\n");

    output.push_str(&format!("Output:   {}\n", report.output_dir.display()));
    output.push_str(&format!(
        "Files:    {} created, {} updated, {} unchanged\n\n",
        report.files(WriteOutcome::Created),
        report.files(WriteOutcome::Updated),
        report.files(WriteOutcome::Unchanged)
    ));

    for written in &report.written {
        output.push_str(&format!("{}:\n", written.family));
        for (i, file) in written.files.iter().enumerate() {
            let connector = if i == written.files.len() - 1 { "\u{2514}" } else { "\u{251C}" };
            let marker = match file.outcome {
                WriteOutcome::Created => "+",
                WriteOutcome::Updated => "~",
                WriteOutcome::Unchanged => "=",
            };
            output.push_str(&format!(
                "{}\u{2500} {} {}\n",
                connector,
                marker,
                file.path.display()
            ));
        }
    }

    if !report.failures.is_empty() {
        output.push_str("\n\u{26A0} Failed families:\n");
        for failure in &report.failures {
            output.push_str(&format!("  - {}\n", failure));
        }
    }

    output
}
