use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

/// One cell as it arrives from the workbook or CSV reader.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Text coercion used for the name and code fields.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(value) => value.clone(),
            CellValue::Number(value) => value.to_string(),
            CellValue::Bool(value) => value.to_string(),
            CellValue::DateTime(value) => value.to_string(),
        }
    }
}

/// Header label to cell value, as read from one data row.
pub type RawRow = HashMap<String, CellValue>;

/// A data row with its 1-based line in the source sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub line: usize,
    pub cells: RawRow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedRecord {
    pub patient_code: String,
    pub user_name: String,
    pub doctor_name: String,
    pub sent_at: NaiveDateTime,
    pub delivered_at: NaiveDateTime,
    pub approved_at: NaiveDateTime,
    pub waiting_time: u32,
    pub handling_time: u32,
    pub total_turnaround: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentMetrics {
    pub user_name: String,
    pub total_requests: usize,
    pub average_handling_time: f64,
    pub handling_sla: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeakHour {
    pub hour: u8,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamMetrics {
    pub total_requests: usize,
    pub average_waiting_time: f64,
    pub average_handling_time: f64,
    pub average_turnaround: f64,
    pub assignment_sla: f64,
    pub handling_sla: f64,
    pub peak_hours: Vec<PeakHour>,
    pub hourly_histogram: [usize; 24],
}

/// Which of the six required fields a row failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    PatientCode,
    UserName,
    DoctorName,
    SentDate,
    DeliveredDate,
    ApprovedDate,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::PatientCode => "patient_code",
            Field::UserName => "user_name",
            Field::DoctorName => "doctor_name",
            Field::SentDate => "sent_date",
            Field::DeliveredDate => "delivered_date",
            Field::ApprovedDate => "approved_date",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Waiting,
    Handling,
    Turnaround,
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Interval::Waiting => "sent to delivered",
            Interval::Handling => "delivered to approved",
            Interval::Turnaround => "sent to approved",
        };
        f.write_str(label)
    }
}

/// Why a row was dropped. Rows are counted by reason kind, never itemized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    MissingField(Field),
    UnparseableDate(Field),
    InvalidInterval(Interval),
}

impl SkipReason {
    pub fn kind(&self) -> SkipKind {
        match self {
            SkipReason::MissingField(_) => SkipKind::MissingField,
            SkipReason::UnparseableDate(_) => SkipKind::UnparseableDate,
            SkipReason::InvalidInterval(_) => SkipKind::InvalidInterval,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingField(field) => write!(f, "missing {field}"),
            SkipReason::UnparseableDate(field) => write!(f, "unparseable {field}"),
            SkipReason::InvalidInterval(interval) => write!(f, "invalid interval {interval}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipKind {
    MissingField,
    UnparseableDate,
    InvalidInterval,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipBreakdown {
    pub missing_field: usize,
    pub unparseable_date: usize,
    pub invalid_interval: usize,
}

impl SkipBreakdown {
    pub fn record(&mut self, reason: SkipReason) {
        match reason.kind() {
            SkipKind::MissingField => self.missing_field += 1,
            SkipKind::UnparseableDate => self.unparseable_date += 1,
            SkipKind::InvalidInterval => self.invalid_interval += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.missing_field + self.unparseable_date + self.invalid_interval
    }
}
