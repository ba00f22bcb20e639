use std::collections::HashMap;

use chrono::Timelike;

use crate::config::Settings;
use crate::models::{AgentMetrics, PeakHour, TeamMetrics, ValidatedRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregates {
    pub agents: Vec<AgentMetrics>,
    pub team: TeamMetrics,
}

#[derive(Debug, Default)]
struct AgentAccumulator {
    user_name: String,
    total_requests: usize,
    handling_minutes: u64,
    within_handling_sla: usize,
}

/// Folds validated records into agent and team metrics.
/// Returns `None` for an empty record set.
pub fn aggregate(records: &[ValidatedRecord], settings: &Settings) -> Option<Aggregates> {
    if records.is_empty() {
        return None;
    }

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut accumulators: Vec<AgentAccumulator> = Vec::new();
    let mut histogram = [0usize; 24];
    let mut waiting_minutes = 0u64;
    let mut handling_minutes = 0u64;
    let mut turnaround_minutes = 0u64;
    let mut within_waiting_sla = 0usize;
    let mut within_handling_sla = 0usize;

    for record in records {
        let slot = *index.entry(record.user_name.as_str()).or_insert_with(|| {
            accumulators.push(AgentAccumulator {
                user_name: record.user_name.clone(),
                ..AgentAccumulator::default()
            });
            accumulators.len() - 1
        });
        let agent = &mut accumulators[slot];
        agent.total_requests += 1;
        agent.handling_minutes += u64::from(record.handling_time);

        let handled_in_time = record.handling_time <= settings.handling_sla_minutes;
        if handled_in_time {
            agent.within_handling_sla += 1;
            within_handling_sla += 1;
        }
        if record.waiting_time <= settings.waiting_sla_minutes {
            within_waiting_sla += 1;
        }

        waiting_minutes += u64::from(record.waiting_time);
        handling_minutes += u64::from(record.handling_time);
        turnaround_minutes += u64::from(record.total_turnaround);
        histogram[record.sent_at.hour() as usize] += 1;
    }

    let mut agents: Vec<AgentMetrics> = accumulators
        .into_iter()
        .map(|agent| AgentMetrics {
            average_handling_time: mean(agent.handling_minutes, agent.total_requests),
            handling_sla: percent(agent.within_handling_sla, agent.total_requests),
            user_name: agent.user_name,
            total_requests: agent.total_requests,
        })
        .collect();
    agents.sort_by(|a, b| b.total_requests.cmp(&a.total_requests));

    let total = records.len();
    let team = TeamMetrics {
        total_requests: total,
        average_waiting_time: mean(waiting_minutes, total),
        average_handling_time: mean(handling_minutes, total),
        average_turnaround: mean(turnaround_minutes, total),
        assignment_sla: percent(within_waiting_sla, total),
        handling_sla: percent(within_handling_sla, total),
        peak_hours: peak_hours(&histogram, settings.peak_hours),
        hourly_histogram: histogram,
    };

    Some(Aggregates { agents, team })
}

/// Busiest hours first, ties by earlier hour, zero buckets dropped.
pub fn peak_hours(histogram: &[usize; 24], limit: usize) -> Vec<PeakHour> {
    let mut buckets: Vec<PeakHour> = histogram
        .iter()
        .enumerate()
        .map(|(hour, &count)| PeakHour {
            hour: hour as u8,
            count,
        })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count));
    buckets
        .into_iter()
        .take(limit)
        .filter(|bucket| bucket.count > 0)
        .collect()
}

fn mean(sum: u64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

fn percent(hits: usize, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        100.0 * hits as f64 / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn record(user: &str, sent: NaiveDateTime, waiting: u32, handling: u32) -> ValidatedRecord {
        let delivered_at = sent + Duration::minutes(waiting as i64);
        ValidatedRecord {
            patient_code: "P-1".to_string(),
            user_name: user.to_string(),
            doctor_name: "Dr. Hala".to_string(),
            sent_at: sent,
            delivered_at,
            approved_at: delivered_at + Duration::minutes(handling as i64),
            waiting_time: waiting,
            handling_time: handling,
            total_turnaround: waiting + handling,
        }
    }

    #[test]
    fn empty_input_has_no_aggregates() {
        assert!(aggregate(&[], &Settings::default()).is_none());
    }

    #[test]
    fn averages_handling_and_sla_per_agent() {
        let records = vec![
            record("Omar", at(9, 0), 5, 10),
            record("Omar", at(10, 0), 5, 30),
        ];
        let aggregates = aggregate(&records, &Settings::default()).unwrap();
        assert_eq!(aggregates.agents.len(), 1);
        let omar = &aggregates.agents[0];
        assert_eq!(omar.total_requests, 2);
        assert!((omar.average_handling_time - 20.0).abs() < 1e-9);
        assert!((omar.handling_sla - 50.0).abs() < 1e-9);
    }

    #[test]
    fn sla_thresholds_are_inclusive() {
        let records = vec![
            record("Omar", at(9, 0), 10, 20),
            record("Sara", at(9, 0), 11, 21),
        ];
        let aggregates = aggregate(&records, &Settings::default()).unwrap();
        assert!((aggregates.team.assignment_sla - 50.0).abs() < 1e-9);
        assert!((aggregates.team.handling_sla - 50.0).abs() < 1e-9);
        assert!((aggregates.team.average_waiting_time - 10.5).abs() < 1e-9);
    }

    #[test]
    fn agents_sorted_by_volume_then_first_seen() {
        let records = vec![
            record("Sara", at(8, 0), 1, 1),
            record("Omar", at(8, 0), 1, 1),
            record("Laila", at(8, 0), 1, 1),
            record("Laila", at(9, 0), 1, 1),
        ];
        let aggregates = aggregate(&records, &Settings::default()).unwrap();
        let names: Vec<&str> = aggregates
            .agents
            .iter()
            .map(|agent| agent.user_name.as_str())
            .collect();
        assert_eq!(names, vec!["Laila", "Sara", "Omar"]);
        let total: usize = aggregates.agents.iter().map(|agent| agent.total_requests).sum();
        assert_eq!(total, records.len());
    }

    #[test]
    fn peak_hours_rank_busiest_buckets() {
        let records = vec![
            record("Omar", at(9, 0), 1, 1),
            record("Omar", at(9, 30), 1, 1),
            record("Omar", at(14, 10), 1, 1),
            record("Sara", at(14, 50), 1, 1),
            record("Sara", at(14, 55), 1, 1),
            record("Sara", at(7, 5), 1, 1),
            record("Sara", at(20, 5), 1, 1),
        ];
        let team = aggregate(&records, &Settings::default()).unwrap().team;
        assert_eq!(
            team.peak_hours,
            vec![
                PeakHour { hour: 14, count: 3 },
                PeakHour { hour: 9, count: 2 },
                PeakHour { hour: 7, count: 1 },
            ]
        );
        assert_eq!(team.hourly_histogram.iter().sum::<usize>(), records.len());
    }

    #[test]
    fn fewer_than_three_active_hours() {
        let records = vec![record("Omar", at(9, 0), 1, 1), record("Omar", at(9, 10), 1, 1)];
        let team = aggregate(&records, &Settings::default()).unwrap().team;
        assert_eq!(team.peak_hours, vec![PeakHour { hour: 9, count: 2 }]);
    }

    #[test]
    fn peak_hour_limit_is_configurable() {
        let mut histogram = [0usize; 24];
        histogram[1] = 4;
        histogram[2] = 3;
        histogram[3] = 2;
        histogram[4] = 1;
        assert_eq!(peak_hours(&histogram, 5).len(), 4);
        assert_eq!(peak_hours(&histogram, 1), vec![PeakHour { hour: 1, count: 4 }]);
        assert!(peak_hours(&[0; 24], 3).is_empty());
    }

    #[test]
    fn custom_thresholds_shift_compliance() {
        let settings = Settings {
            handling_sla_minutes: 30,
            waiting_sla_minutes: 0,
            ..Settings::default()
        };
        let records = vec![record("Omar", at(9, 0), 5, 10), record("Omar", at(10, 0), 0, 30)];
        let aggregates = aggregate(&records, &settings).unwrap();
        assert!((aggregates.agents[0].handling_sla - 100.0).abs() < 1e-9);
        assert!((aggregates.team.assignment_sla - 50.0).abs() < 1e-9);
    }
}
