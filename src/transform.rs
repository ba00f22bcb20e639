use chrono::NaiveDateTime;

use crate::columns;
use crate::config::DateOrder;
use crate::dates::{minutes_between, normalize_date};
use crate::models::{
    CellValue, Field, Interval, RawRow, SkipBreakdown, SkipReason, SourceRow, ValidatedRecord,
};

/// Validated records in input order, plus what was dropped.
#[derive(Debug, Clone, Default)]
pub struct TransformOutcome {
    pub records: Vec<ValidatedRecord>,
    pub skipped: usize,
    pub breakdown: SkipBreakdown,
}

pub fn transform_row(row: &RawRow, order: DateOrder) -> Result<ValidatedRecord, SkipReason> {
    let patient_code = text_field(row, Field::PatientCode)?;
    let user_name = text_field(row, Field::UserName)?;
    let doctor_name = text_field(row, Field::DoctorName)?;
    let sent_at = date_field(row, Field::SentDate, order)?;
    let delivered_at = date_field(row, Field::DeliveredDate, order)?;
    let approved_at = date_field(row, Field::ApprovedDate, order)?;

    let waiting_time = minutes_between(sent_at, delivered_at)
        .ok_or(SkipReason::InvalidInterval(Interval::Waiting))?;
    let handling_time = minutes_between(delivered_at, approved_at)
        .ok_or(SkipReason::InvalidInterval(Interval::Handling))?;
    let total_turnaround = minutes_between(sent_at, approved_at)
        .ok_or(SkipReason::InvalidInterval(Interval::Turnaround))?;

    Ok(ValidatedRecord {
        patient_code,
        user_name,
        doctor_name,
        sent_at,
        delivered_at,
        approved_at,
        waiting_time,
        handling_time,
        total_turnaround,
    })
}

pub fn transform_rows<'a, I>(rows: I, order: DateOrder) -> TransformOutcome
where
    I: IntoIterator<Item = &'a SourceRow>,
{
    let mut outcome = TransformOutcome::default();
    for row in rows {
        match transform_row(&row.cells, order) {
            Ok(record) => outcome.records.push(record),
            Err(reason) => {
                tracing::debug!(line = row.line, %reason, "skipping row");
                outcome.skipped += 1;
                outcome.breakdown.record(reason);
            }
        }
    }
    outcome
}

fn cell(row: &RawRow, field: Field) -> &CellValue {
    row.get(columns::label(field)).unwrap_or(&CellValue::Empty)
}

fn text_field(row: &RawRow, field: Field) -> Result<String, SkipReason> {
    let value = cell(row, field).to_text();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(SkipReason::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn date_field(row: &RawRow, field: Field, order: DateOrder) -> Result<NaiveDateTime, SkipReason> {
    let value = cell(row, field);
    let blank = match value {
        CellValue::Empty => true,
        CellValue::Text(text) => text.trim().is_empty(),
        _ => false,
    };
    if blank {
        return Err(SkipReason::MissingField(field));
    }
    normalize_date(value, order).ok_or(SkipReason::UnparseableDate(field))
}
