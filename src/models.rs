use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(rename = "SubjectID")]
    pub subject_id: i64,
    #[serde(rename = "SubjectLabel")]
    pub subject_label: String,
    #[serde(rename = "DateCreated")]
    pub date_created: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorDefinition {
    #[serde(rename = "DefinitionID")]
    pub definition_id: i64,
    #[serde(rename = "SubjectID")]
    pub subject_id: i64,
    #[serde(rename = "BehaviorName")]
    pub behavior_name: String,
    #[serde(rename = "Description")]
    pub description: String,
}

/// One logged observation. Rows are append-only; there is no update or
/// delete path once a score is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyScore {
    #[serde(rename = "LogID")]
    pub log_id: i64,
    #[serde(rename = "DefinitionID")]
    pub definition_id: i64,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Score")]
    pub score: i32,
    #[serde(rename = "Notes")]
    pub notes: String,
}

/// `year` is the ISO week-numbering year, which can differ from the calendar
/// year for dates near January 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAverage {
    #[serde(rename = "AverageID")]
    pub average_id: i64,
    #[serde(rename = "DefinitionID")]
    pub definition_id: i64,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "WeekOfYear")]
    pub week_of_year: u32,
    #[serde(rename = "AverageScore")]
    pub average_score: f64,
    #[serde(rename = "DataPointsCount")]
    pub data_points_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAverage {
    #[serde(rename = "AverageID")]
    pub average_id: i64,
    #[serde(rename = "DefinitionID")]
    pub definition_id: i64,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "AverageScore")]
    pub average_score: f64,
    #[serde(rename = "DataPointsCount")]
    pub data_points_count: usize,
}

/// `half` is 1 for January through June, 2 for July through December.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemiAnnualAverage {
    #[serde(rename = "AverageID")]
    pub average_id: i64,
    #[serde(rename = "DefinitionID")]
    pub definition_id: i64,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Half")]
    pub half: u32,
    #[serde(rename = "AverageScore")]
    pub average_score: f64,
    #[serde(rename = "DataPointsCount")]
    pub data_points_count: usize,
}
