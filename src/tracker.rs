use anyhow::Context;
use chrono::{NaiveDate, Utc};
use thiserror::Error;

use crate::models::{BehaviorDefinition, DailyScore, MonthlyAverage, SemiAnnualAverage, Subject, WeeklyAverage};
use crate::store::{self, StoreError, TableStore};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("subject label cannot be empty")]
    EmptyLabel,
    #[error("subject `{0}` already exists")]
    DuplicateSubject(String),
    #[error("behavior name cannot be empty")]
    EmptyBehaviorName,
    #[error("no subject with id {0}")]
    UnknownSubject(i64),
    #[error("no behavior definition with id {0}")]
    UnknownDefinition(i64),
    #[error("score {0} is outside the 1-10 range")]
    ScoreOutOfRange(i32),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Tracker {
    store: TableStore,
}

impl Tracker {
    pub fn new(store: TableStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }

    pub fn subjects(&self) -> Result<Vec<Subject>, TrackerError> {
        Ok(self.store.load(&store::SUBJECTS)?)
    }

    pub fn definitions(&self) -> Result<Vec<BehaviorDefinition>, TrackerError> {
        Ok(self.store.load(&store::DEFINITIONS)?)
    }

    pub fn daily_scores(&self) -> Result<Vec<DailyScore>, TrackerError> {
        Ok(self.store.load(&store::DAILY_SCORES)?)
    }

    pub fn weekly_averages(&self) -> Result<Vec<WeeklyAverage>, TrackerError> {
        Ok(self.store.load(&store::WEEKLY_AVERAGES)?)
    }

    pub fn monthly_averages(&self) -> Result<Vec<MonthlyAverage>, TrackerError> {
        Ok(self.store.load(&store::MONTHLY_AVERAGES)?)
    }

    pub fn semi_annual_averages(&self) -> Result<Vec<SemiAnnualAverage>, TrackerError> {
        Ok(self.store.load(&store::SEMI_ANNUAL_AVERAGES)?)
    }

    pub fn add_subject(&self, label: &str) -> Result<Subject, TrackerError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(TrackerError::EmptyLabel);
        }

        let mut subjects = self.subjects()?;
        if subjects
            .iter()
            .any(|subject| subject.subject_label.eq_ignore_ascii_case(label))
        {
            return Err(TrackerError::DuplicateSubject(label.to_string()));
        }

        let subject = Subject {
            subject_id: next_id(&subjects, |subject| subject.subject_id),
            subject_label: label.to_string(),
            date_created: Utc::now().naive_utc(),
        };
        subjects.push(subject.clone());
        self.store.save(&store::SUBJECTS, &subjects)?;

        Ok(subject)
    }

    pub fn add_behavior_definition(
        &self,
        subject_id: i64,
        name: &str,
        description: &str,
    ) -> Result<BehaviorDefinition, TrackerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::EmptyBehaviorName);
        }
        if !self
            .subjects()?
            .iter()
            .any(|subject| subject.subject_id == subject_id)
        {
            return Err(TrackerError::UnknownSubject(subject_id));
        }

        let mut definitions = self.definitions()?;
        let definition = BehaviorDefinition {
            definition_id: next_id(&definitions, |definition| definition.definition_id),
            subject_id,
            behavior_name: name.to_string(),
            description: description.trim().to_string(),
        };
        definitions.push(definition.clone());
        self.store.save(&store::DEFINITIONS, &definitions)?;

        Ok(definition)
    }

    pub fn log_score(
        &self,
        definition_id: i64,
        date: NaiveDate,
        score: i32,
        notes: &str,
    ) -> Result<DailyScore, TrackerError> {
        if !(1..=10).contains(&score) {
            return Err(TrackerError::ScoreOutOfRange(score));
        }
        if !self
            .definitions()?
            .iter()
            .any(|definition| definition.definition_id == definition_id)
        {
            return Err(TrackerError::UnknownDefinition(definition_id));
        }

        let mut scores = self.daily_scores()?;
        let entry = DailyScore {
            log_id: next_id(&scores, |entry| entry.log_id),
            definition_id,
            date,
            score,
            notes: notes.trim().to_string(),
        };
        scores.push(entry.clone());
        self.store.save(&store::DAILY_SCORES, &scores)?;

        Ok(entry)
    }
}

fn next_id<T>(records: &[T], id: impl Fn(&T) -> i64) -> i64 {
    records.iter().map(id).max().unwrap_or(0) + 1
}

#[derive(Debug, Default)]
pub struct SeedSummary {
    pub subjects: usize,
    pub definitions: usize,
    pub scores: usize,
}

/// Inserts a small demo data set. Safe to run more than once; rows that are
/// already present are kept and skipped. The score dates straddle the
/// 2024/2025 ISO week boundary on purpose, so the weekly table has something
/// interesting to show right away.
pub fn seed(tracker: &Tracker) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for label in ["Avery", "Jules"] {
        match tracker.add_subject(label) {
            Ok(_) => summary.subjects += 1,
            Err(TrackerError::DuplicateSubject(_)) => {}
            Err(err) => return Err(err.into()),
        }
    }

    let subjects = tracker.subjects()?;
    let subject_id = |label: &str| -> anyhow::Result<i64> {
        subjects
            .iter()
            .find(|subject| subject.subject_label == label)
            .map(|subject| subject.subject_id)
            .with_context(|| format!("seed subject `{label}` missing"))
    };

    let behaviors = [
        ("Avery", "Morning routine", "Ready for school without reminders"),
        ("Avery", "Homework focus", "Started homework before dinner"),
        ("Jules", "Screen time", "Stayed within the agreed daily limit"),
    ];
    for (subject, name, description) in behaviors {
        let subject_id = subject_id(subject)?;
        let exists = tracker
            .definitions()?
            .iter()
            .any(|definition| definition.subject_id == subject_id && definition.behavior_name == name);
        if !exists {
            tracker.add_behavior_definition(subject_id, name, description)?;
            summary.definitions += 1;
        }
    }

    let definitions = tracker.definitions()?;
    let definition_id = |subject: &str, name: &str| -> anyhow::Result<i64> {
        let subject_id = subject_id(subject)?;
        definitions
            .iter()
            .find(|definition| definition.subject_id == subject_id && definition.behavior_name == name)
            .map(|definition| definition.definition_id)
            .with_context(|| format!("seed behavior `{name}` missing"))
    };

    let entries = [
        ("Avery", "Morning routine", (2024, 12, 30), 6, "Slow start after the holidays"),
        ("Avery", "Morning routine", (2024, 12, 31), 7, ""),
        ("Avery", "Morning routine", (2025, 1, 2), 8, "Packed the school bag unprompted"),
        ("Avery", "Homework focus", (2025, 1, 2), 5, "Needed two reminders"),
        ("Avery", "Homework focus", (2025, 1, 3), 7, ""),
        ("Jules", "Screen time", (2024, 12, 31), 9, "Switched off at the agreed time"),
        ("Jules", "Screen time", (2025, 1, 2), 4, "Extra hour of gaming"),
    ];
    for (subject, name, (year, month, day), score, notes) in entries {
        let definition_id = definition_id(subject, name)?;
        let date = NaiveDate::from_ymd_opt(year, month, day).context("invalid seed date")?;
        let already_logged = tracker
            .daily_scores()?
            .iter()
            .any(|entry| entry.definition_id == definition_id && entry.date == date);
        if !already_logged {
            tracker.log_score(definition_id, date, score, notes)?;
            summary.scores += 1;
        }
    }

    Ok(summary)
}
