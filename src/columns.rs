use crate::error::PipelineError;
use crate::models::Field;

pub const PATIENT_CODE: &str = "كود المريض";
pub const USER_NAME: &str = "اسم المستخدم";
pub const DOCTOR_NAME: &str = "اسم الطبيب";
pub const SENT_DATE: &str = "تاريخ الإرسال";
pub const DELIVERED_DATE: &str = "تاريخ التسليم";
pub const APPROVED_DATE: &str = "تاريخ الموافقة";

pub const REQUIRED_COLUMNS: [(Field, &str); 6] = [
    (Field::PatientCode, PATIENT_CODE),
    (Field::UserName, USER_NAME),
    (Field::DoctorName, DOCTOR_NAME),
    (Field::SentDate, SENT_DATE),
    (Field::DeliveredDate, DELIVERED_DATE),
    (Field::ApprovedDate, APPROVED_DATE),
];

pub fn label(field: Field) -> &'static str {
    match field {
        Field::PatientCode => PATIENT_CODE,
        Field::UserName => USER_NAME,
        Field::DoctorName => DOCTOR_NAME,
        Field::SentDate => SENT_DATE,
        Field::DeliveredDate => DELIVERED_DATE,
        Field::ApprovedDate => APPROVED_DATE,
    }
}

/// Labels absent from `headers`, in canonical order.
pub fn missing_columns<S: AsRef<str>>(headers: &[S]) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|(_, label)| !headers.iter().any(|header| header.as_ref().trim() == *label))
        .map(|(_, label)| label.to_string())
        .collect()
}

pub fn validate_headers<S: AsRef<str>>(headers: &[S]) -> Result<(), PipelineError> {
    let missing = missing_columns(headers);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::MissingColumns { missing })
    }
}
