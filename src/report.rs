use std::fmt::Write;

use clap::ValueEnum;

use crate::config::Settings;
use crate::models::ValidatedRecord;
use crate::pipeline::AnalysisReport;

const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

pub fn render(
    format: OutputFormat,
    source: &str,
    report: &AnalysisReport,
    settings: &Settings,
    limit: usize,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Markdown => Ok(build_report(source, report, settings, limit)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

pub fn slowest_requests(records: &[ValidatedRecord], count: usize) -> Vec<&ValidatedRecord> {
    let mut sorted: Vec<&ValidatedRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.total_turnaround.cmp(&a.total_turnaround));
    sorted.truncate(count);
    sorted
}

pub fn build_report(
    source: &str,
    report: &AnalysisReport,
    settings: &Settings,
    limit: usize,
) -> String {
    let team = &report.team;
    let mut output = String::new();

    let _ = writeln!(output, "# Request Turnaround Report");
    let _ = writeln!(
        output,
        "Generated from {} ({} of {} rows valid, {} skipped)",
        source,
        report.records.len(),
        report.total_rows,
        report.skipped_rows
    );
    let breakdown = &report.skip_breakdown;
    if breakdown.total() > 0 {
        let _ = writeln!(
            output,
            "Skipped rows: {} missing a field, {} with an unreadable date, {} with out-of-order times",
            breakdown.missing_field, breakdown.unparseable_date, breakdown.invalid_interval
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Team");
    let _ = writeln!(output, "- Requests: {}", team.total_requests);
    let _ = writeln!(
        output,
        "- Average waiting time: {:.1} min",
        team.average_waiting_time
    );
    let _ = writeln!(
        output,
        "- Average handling time: {:.1} min",
        team.average_handling_time
    );
    let _ = writeln!(
        output,
        "- Average turnaround: {:.1} min",
        team.average_turnaround
    );
    let _ = writeln!(
        output,
        "- Assignment SLA (waiting ≤ {} min): {:.1}%",
        settings.waiting_sla_minutes, team.assignment_sla
    );
    let _ = writeln!(
        output,
        "- Handling SLA (handling ≤ {} min): {:.1}%",
        settings.handling_sla_minutes, team.handling_sla
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Peak Hours");
    if team.peak_hours.is_empty() {
        let _ = writeln!(output, "No activity recorded.");
    } else {
        for peak in team.peak_hours.iter() {
            let _ = writeln!(
                output,
                "- {:02}:00 to {:02}:59: {} requests",
                peak.hour, peak.hour, peak.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Agents");
    let _ = writeln!(
        output,
        "| Agent | Requests | Avg handling (min) | Handling SLA |"
    );
    let _ = writeln!(output, "|---|---:|---:|---:|");
    for agent in report.agents.iter().take(limit) {
        let _ = writeln!(
            output,
            "| {} | {} | {:.1} | {:.1}% |",
            agent.user_name, agent.total_requests, agent.average_handling_time, agent.handling_sla
        );
    }
    if report.agents.len() > limit {
        let _ = writeln!(
            output,
            "\n{} more agents not shown.",
            report.agents.len() - limit
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Requests by Hour");
    let busiest = team.hourly_histogram.iter().copied().max().unwrap_or(0);
    let _ = writeln!(output, "```");
    for (hour, &count) in team.hourly_histogram.iter().enumerate() {
        let bar = if busiest == 0 {
            0
        } else {
            (count * BAR_WIDTH).div_ceil(busiest)
        };
        let _ = writeln!(
            output,
            "{:02} | {:<width$} {}",
            hour,
            "#".repeat(bar),
            count,
            width = BAR_WIDTH
        );
    }
    let _ = writeln!(output, "```");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Slowest Requests");
    for record in slowest_requests(&report.records, 5) {
        let _ = writeln!(
            output,
            "- {} ({}, {}) sent {}: {} min total ({} waiting, {} handling)",
            record.patient_code,
            record.user_name,
            record.doctor_name,
            record.sent_at.format("%Y-%m-%d %H:%M"),
            record.total_turnaround,
            record.waiting_time,
            record.handling_time
        );
    }

    output
}
