use clap::ValueEnum;

pub const DEFAULT_SHEET_NAME: &str = "الطلبات";
pub const DEFAULT_HANDLING_SLA_MINUTES: u32 = 20;
pub const DEFAULT_WAITING_SLA_MINUTES: u32 = 10;
pub const DEFAULT_PEAK_HOURS: usize = 3;

/// Field order assumed when a date falls through to the separator split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DateOrder {
    #[default]
    Dmy,
    Mdy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub sheet_name: String,
    pub handling_sla_minutes: u32,
    pub waiting_sla_minutes: u32,
    pub peak_hours: usize,
    pub date_order: DateOrder,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            handling_sla_minutes: DEFAULT_HANDLING_SLA_MINUTES,
            waiting_sla_minutes: DEFAULT_WAITING_SLA_MINUTES,
            peak_hours: DEFAULT_PEAK_HOURS,
            date_order: DateOrder::default(),
        }
    }
}
