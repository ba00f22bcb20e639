use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::columns;
use crate::config::Settings;
use crate::error::PipelineError;
use crate::metrics::aggregate;
use crate::models::{AgentMetrics, SkipBreakdown, TeamMetrics, ValidatedRecord};
use crate::transform::transform_rows;
use crate::workbook::{self, FileFormat, SheetData};

/// Either a full report or one fatal error; never both.
pub type PipelineResult = Result<AnalysisReport, PipelineError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub records: Vec<ValidatedRecord>,
    pub agents: Vec<AgentMetrics>,
    pub team: TeamMetrics,
    pub total_rows: usize,
    pub skipped_rows: usize,
    pub skip_breakdown: SkipBreakdown,
}

/// Reads the file asynchronously, then runs the synchronous pipeline.
pub async fn run_file(path: &Path, settings: &Settings) -> PipelineResult {
    let bytes = tokio::fs::read(path).await.map_err(|err| {
        PipelineError::unexpected(format!("{}: {err}", path.display()))
    })?;
    let format = FileFormat::detect(Some(path), &bytes);
    debug!(path = %path.display(), ?format, size = bytes.len(), "file loaded");
    run_bytes(bytes, format, settings)
}

pub fn run_bytes(bytes: Vec<u8>, format: FileFormat, settings: &Settings) -> PipelineResult {
    let sheet = workbook::read_sheet(bytes, format, &settings.sheet_name)?;
    analyze_sheet(&sheet, settings)
}

pub fn analyze_sheet(sheet: &SheetData, settings: &Settings) -> PipelineResult {
    if sheet.rows.is_empty() {
        return Err(PipelineError::NoRows);
    }
    columns::validate_headers(&sheet.headers)?;

    let outcome = transform_rows(&sheet.rows, settings.date_order);
    let aggregates = aggregate(&outcome.records, settings).ok_or(PipelineError::NoValidRows {
        skipped: outcome.skipped,
    })?;

    info!(
        rows = sheet.rows.len(),
        valid = outcome.records.len(),
        skipped = outcome.skipped,
        agents = aggregates.agents.len(),
        "pipeline complete"
    );

    Ok(AnalysisReport {
        records: outcome.records,
        agents: aggregates.agents,
        team: aggregates.team,
        total_rows: sheet.rows.len(),
        skipped_rows: outcome.skipped,
        skip_breakdown: outcome.breakdown,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunToken(Uuid);

/// Holds the one result on display. A run that finishes after a newer
/// run has started is dropped instead of overwriting the newer state.
#[derive(Debug, Default)]
pub struct ResultSlot {
    latest: Option<RunToken>,
    current: Option<PipelineResult>,
}

impl ResultSlot {
    pub fn begin_run(&mut self) -> RunToken {
        let token = RunToken(Uuid::new_v4());
        self.latest = Some(token);
        self.current = None;
        token
    }

    /// Installs `result` if `token` is the latest run. Returns whether it did.
    pub fn complete(&mut self, token: RunToken, result: PipelineResult) -> bool {
        if self.latest != Some(token) {
            debug!(run = %token.0, "discarding result from superseded run");
            return false;
        }
        if let Err(err) = &result {
            warn!(run = %token.0, error = %err, "pipeline failed");
        }
        self.current = Some(result);
        true
    }

    pub fn current(&self) -> Option<&PipelineResult> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{
        APPROVED_DATE, DELIVERED_DATE, DOCTOR_NAME, PATIENT_CODE, REQUIRED_COLUMNS, SENT_DATE,
        USER_NAME,
    };
    use crate::config::DEFAULT_SHEET_NAME;
    use rust_xlsxwriter::{Format, Workbook};

    fn header_line() -> String {
        REQUIRED_COLUMNS
            .iter()
            .map(|(_, label)| *label)
            .collect::<Vec<_>>()
            .join(",")
    }

    fn csv_bytes(rows: &[&str]) -> Vec<u8> {
        let mut data = header_line();
        for row in rows {
            data.push('\n');
            data.push_str(row);
        }
        data.into_bytes()
    }

    fn run_csv(rows: &[&str]) -> PipelineResult {
        run_bytes(csv_bytes(rows), FileFormat::Csv, &Settings::default())
    }

    #[test]
    fn single_row_meets_both_slas() {
        let report = run_csv(&["P-1,Mona,Dr. Hala,2024-01-01T09:00,2024-01-01T09:05,2024-01-01T09:20"])
            .unwrap();
        assert_eq!(report.records.len(), 1);
        let record = &report.records[0];
        assert_eq!(
            (record.waiting_time, record.handling_time, record.total_turnaround),
            (5, 15, 20)
        );
        assert!((report.team.assignment_sla - 100.0).abs() < 1e-9);
        assert!((report.agents[0].handling_sla - 100.0).abs() < 1e-9);
        assert_eq!(report.team.peak_hours.len(), 1);
        assert_eq!(report.team.peak_hours[0].hour, 9);
    }

    #[test]
    fn skipped_rows_are_counted_not_fatal() {
        let report = run_csv(&[
            "P-1,Mona,Dr. Hala,2024-01-01T09:00,2024-01-01T09:05,2024-01-01T09:20",
            "P-2,Mona,,2024-01-01T09:00,2024-01-01T09:05,2024-01-01T09:20",
            "P-3,Omar,Dr. Hala,25/01/2024 10:00,25/01/2024 10:30,٢٥/٠١/٢٠٢٤ ١١:٠٠",
        ])
        .unwrap();
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(report.skipped_rows + report.records.len(), report.total_rows);
        assert_eq!(report.skip_breakdown.missing_field, 1);
        assert_eq!(report.records[1].handling_time, 30);
    }

    #[test]
    fn agent_average_and_sla_over_two_rows() {
        let report = run_csv(&[
            "P-1,Omar,Dr. Hala,2024-01-01T09:00,2024-01-01T09:05,2024-01-01T09:15",
            "P-2,Omar,Dr. Hala,2024-01-01T10:00,2024-01-01T10:05,2024-01-01T10:35",
        ])
        .unwrap();
        let omar = &report.agents[0];
        assert_eq!(omar.total_requests, 2);
        assert!((omar.average_handling_time - 20.0).abs() < 1e-9);
        assert!((omar.handling_sla - 50.0).abs() < 1e-9);
    }

    #[test]
    fn all_rows_invalid_is_fatal() {
        let err = run_csv(&[
            "P-1,Omar,,2024-01-01T09:00,2024-01-01T09:05,2024-01-01T09:15",
            "P-2,Omar,Dr. Hala,not a date,2024-01-01T10:05,2024-01-01T10:35",
        ])
        .unwrap_err();
        assert_eq!(err, PipelineError::NoValidRows { skipped: 2 });
    }

    #[test]
    fn header_only_file_has_no_rows() {
        assert_eq!(run_csv(&[]).unwrap_err(), PipelineError::NoRows);
    }

    #[test]
    fn missing_columns_abort_before_rows() {
        let data = format!("{PATIENT_CODE},{USER_NAME}\nP-1,Omar\n");
        let err = run_bytes(data.into_bytes(), FileFormat::Csv, &Settings::default()).unwrap_err();
        match err {
            PipelineError::MissingColumns { missing } => assert_eq!(
                missing,
                vec![DOCTOR_NAME, SENT_DATE, DELIVERED_DATE, APPROVED_DATE]
            ),
            other => panic!("expected missing columns, got {other:?}"),
        }
    }

    #[test]
    fn workbook_without_required_sheet_is_fatal() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary").unwrap();
        sheet.write_string(0, 0, PATIENT_CODE).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let err = run_bytes(bytes, FileFormat::Workbook, &Settings::default()).unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingSheet {
                sheet: DEFAULT_SHEET_NAME.to_string()
            }
        );
    }

    #[test]
    fn workbook_dates_and_serials_are_read() {
        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm");
        let sheet = workbook.add_worksheet();
        sheet.set_name(DEFAULT_SHEET_NAME).unwrap();
        for (col, (_, label)) in REQUIRED_COLUMNS.iter().enumerate() {
            sheet.write_string(0, col as u16, *label).unwrap();
        }
        sheet.write_string(1, 0, "P-9").unwrap();
        sheet.write_string(1, 1, "Laila").unwrap();
        sheet.write_string(1, 2, "Dr. Sami").unwrap();
        sheet
            .write_number_with_format(1, 3, 45_292.375, &date_format)
            .unwrap();
        sheet.write_number(1, 4, 45_292.375 + 7.0 / 1_440.0).unwrap();
        sheet.write_string(1, 5, "2024-01-01 09:25").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let report = run_bytes(bytes, FileFormat::Workbook, &Settings::default()).unwrap();
        let record = &report.records[0];
        assert_eq!(record.waiting_time, 7);
        assert_eq!(record.handling_time, 18);
        assert_eq!(record.total_turnaround, 25);
        assert_eq!(report.team.peak_hours[0].hour, 9);
    }

    #[tokio::test]
    async fn unreadable_path_is_unexpected() {
        let err = run_file(Path::new("/nonexistent/requests.xlsx"), &Settings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Unexpected { .. }));
    }

    #[test]
    fn stale_runs_do_not_replace_newer_results() {
        let mut slot = ResultSlot::default();
        let first = slot.begin_run();
        let second = slot.begin_run();

        assert!(!slot.complete(first, Err(PipelineError::NoRows)));
        assert!(slot.current().is_none());

        assert!(slot.complete(second, Err(PipelineError::NoValidRows { skipped: 4 })));
        assert_eq!(
            slot.current(),
            Some(&Err(PipelineError::NoValidRows { skipped: 4 }))
        );
    }

    #[test]
    fn new_run_clears_previous_result() {
        let mut slot = ResultSlot::default();
        let token = slot.begin_run();
        slot.complete(token, Err(PipelineError::NoRows));
        assert!(slot.current().is_some());
        slot.begin_run();
        assert!(slot.current().is_none());
    }
}
