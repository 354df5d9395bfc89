use std::collections::HashMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{BehaviorDefinition, MonthlyAverage, SemiAnnualAverage, Subject, WeeklyAverage};

#[derive(Debug, Serialize)]
pub struct ProgressReport {
    pub generated_at: DateTime<Utc>,
    pub behaviors: Vec<BehaviorProgress>,
}

#[derive(Debug, Serialize)]
pub struct BehaviorProgress {
    pub definition_id: i64,
    pub subject_label: String,
    pub behavior_name: String,
    pub weekly: Vec<WeeklyAverage>,
    pub monthly: Vec<MonthlyAverage>,
    pub semi_annual: Vec<SemiAnnualAverage>,
}

pub fn build_progress(
    subjects: &[Subject],
    definitions: &[BehaviorDefinition],
    weekly: &[WeeklyAverage],
    monthly: &[MonthlyAverage],
    semi_annual: &[SemiAnnualAverage],
    definition_filter: Option<i64>,
) -> ProgressReport {
    let labels: HashMap<i64, &str> = subjects
        .iter()
        .map(|subject| (subject.subject_id, subject.subject_label.as_str()))
        .collect();

    let behaviors = definitions
        .iter()
        .filter(|definition| {
            definition_filter.map_or(true, |id| definition.definition_id == id)
        })
        .map(|definition| BehaviorProgress {
            definition_id: definition.definition_id,
            subject_label: labels
                .get(&definition.subject_id)
                .copied()
                .unwrap_or("unknown subject")
                .to_string(),
            behavior_name: definition.behavior_name.clone(),
            weekly: weekly
                .iter()
                .filter(|row| row.definition_id == definition.definition_id)
                .cloned()
                .collect(),
            monthly: monthly
                .iter()
                .filter(|row| row.definition_id == definition.definition_id)
                .cloned()
                .collect(),
            semi_annual: semi_annual
                .iter()
                .filter(|row| row.definition_id == definition.definition_id)
                .cloned()
                .collect(),
        })
        .collect();

    ProgressReport {
        generated_at: Utc::now(),
        behaviors,
    }
}

pub fn to_markdown(report: &ProgressReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Behavior Progress Report");
    let _ = writeln!(
        output,
        "Generated {}",
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    if report.behaviors.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "No behavior definitions on file.");
        return output;
    }

    for behavior in &report.behaviors {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "## {} - {}",
            behavior.subject_label, behavior.behavior_name
        );

        let _ = writeln!(output);
        let _ = writeln!(output, "### Weekly");
        if behavior.weekly.is_empty() {
            let _ = writeln!(output, "No averages calculated yet.");
        } else {
            for row in &behavior.weekly {
                let _ = writeln!(
                    output,
                    "- {}-W{:02}: avg {:.2} over {} scores",
                    row.year, row.week_of_year, row.average_score, row.data_points_count
                );
            }
        }

        let _ = writeln!(output);
        let _ = writeln!(output, "### Monthly");
        if behavior.monthly.is_empty() {
            let _ = writeln!(output, "No averages calculated yet.");
        } else {
            for row in &behavior.monthly {
                let _ = writeln!(
                    output,
                    "- {}-{:02}: avg {:.2} over {} scores",
                    row.year, row.month, row.average_score, row.data_points_count
                );
            }
        }

        let _ = writeln!(output);
        let _ = writeln!(output, "### Semi-annual");
        if behavior.semi_annual.is_empty() {
            let _ = writeln!(output, "No averages calculated yet.");
        } else {
            for row in &behavior.semi_annual {
                let _ = writeln!(
                    output,
                    "- {} H{}: avg {:.2} over {} scores",
                    row.year, row.half, row.average_score, row.data_points_count
                );
            }
        }
    }

    output
}

pub fn to_json(report: &ProgressReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
