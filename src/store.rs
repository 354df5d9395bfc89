use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Schema for one CSV-backed table: logical name, file name and column order.
///
/// Column order must match the field order of the record struct stored in the
/// table, since rows are written headerless against this header.
pub struct Table {
    pub name: &'static str,
    pub file: &'static str,
    pub columns: &'static [&'static str],
}

pub static SUBJECTS: Table = Table {
    name: "subjects",
    file: "subjects.csv",
    columns: &["SubjectID", "SubjectLabel", "DateCreated"],
};

pub static DEFINITIONS: Table = Table {
    name: "definitions",
    file: "behavior_definitions.csv",
    columns: &["DefinitionID", "SubjectID", "BehaviorName", "Description"],
};

pub static DAILY_SCORES: Table = Table {
    name: "daily_scores",
    file: "daily_scores_log.csv",
    columns: &["LogID", "DefinitionID", "Date", "Score", "Notes"],
};

pub static WEEKLY_AVERAGES: Table = Table {
    name: "weekly_averages",
    file: "weekly_averages.csv",
    columns: &[
        "AverageID",
        "DefinitionID",
        "Year",
        "WeekOfYear",
        "AverageScore",
        "DataPointsCount",
    ],
};

pub static MONTHLY_AVERAGES: Table = Table {
    name: "monthly_averages",
    file: "monthly_averages.csv",
    columns: &[
        "AverageID",
        "DefinitionID",
        "Year",
        "Month",
        "AverageScore",
        "DataPointsCount",
    ],
};

pub static SEMI_ANNUAL_AVERAGES: Table = Table {
    name: "semi_annual_averages",
    file: "semi_annual_averages.csv",
    columns: &[
        "AverageID",
        "DefinitionID",
        "Year",
        "Half",
        "AverageScore",
        "DataPointsCount",
    ],
};

pub static ALL_TABLES: [&Table; 6] = [
    &SUBJECTS,
    &DEFINITIONS,
    &DAILY_SCORES,
    &WEEKLY_AVERAGES,
    &MONTHLY_AVERAGES,
    &SEMI_ANNUAL_AVERAGES,
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create data directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create table file {path}")]
    CreateTable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read table `{table}` from {path}")]
    Read {
        table: &'static str,
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write table `{table}` to {path}")]
    Write {
        table: &'static str,
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub struct TableStore {
    data_dir: PathBuf,
}

impl TableStore {
    /// Opens the store against a data directory, creating the directory and
    /// any missing table files (header row only) on the way. Existing files
    /// are left alone, so opening is idempotent.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).map_err(|source| StoreError::CreateDir {
            path: data_dir.clone(),
            source,
        })?;

        let store = Self { data_dir };
        for table in ALL_TABLES {
            let path = store.table_path(table);
            if !path.exists() {
                fs::write(&path, format!("{}\n", table.columns.join(",")))
                    .map_err(|source| StoreError::CreateTable { path: path.clone(), source })?;
            }
        }

        Ok(store)
    }

    pub fn table_path(&self, table: &Table) -> PathBuf {
        self.data_dir.join(table.file)
    }

    pub fn load<T: DeserializeOwned>(&self, table: &Table) -> Result<Vec<T>, StoreError> {
        let path = self.table_path(table);
        let read_err = |source| StoreError::Read {
            table: table.name,
            path: path.clone(),
            source,
        };

        let mut reader = csv::Reader::from_path(&path).map_err(read_err)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row.map_err(read_err)?);
        }

        Ok(records)
    }

    /// Replaces the table contents wholesale. The header row is always
    /// written, so saving an empty set leaves a loadable table behind.
    pub fn save<T: Serialize>(&self, table: &Table, records: &[T]) -> Result<(), StoreError> {
        let path = self.table_path(table);
        let write_err = |source| StoreError::Write {
            table: table.name,
            path: path.clone(),
            source,
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(write_err)?;
        writer.write_record(table.columns).map_err(write_err)?;
        for record in records {
            writer.serialize(record).map_err(write_err)?;
        }
        writer
            .flush()
            .map_err(|source| write_err(csv::Error::from(source)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DailyScore;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn sample_score(log_id: i64, day: u32, score: i32) -> DailyScore {
        DailyScore {
            log_id,
            definition_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            score,
            notes: "steady".to_string(),
        }
    }

    #[test]
    fn open_creates_every_table_file() {
        let dir = tempdir().unwrap();
        let store = TableStore::open(dir.path().join("data")).unwrap();

        for table in ALL_TABLES {
            assert!(store.table_path(table).exists(), "missing {}", table.name);
        }

        let scores: Vec<DailyScore> = store.load(&DAILY_SCORES).unwrap();
        assert!(scores.is_empty());
    }

    #[test]
    fn open_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = TableStore::open(dir.path()).unwrap();
        store
            .save(&DAILY_SCORES, &[sample_score(1, 4, 6)])
            .unwrap();

        let reopened = TableStore::open(dir.path()).unwrap();
        let scores: Vec<DailyScore> = reopened.load(&DAILY_SCORES).unwrap();
        assert_eq!(scores.len(), 1);
    }

    #[test]
    fn rows_survive_a_round_trip() {
        let dir = tempdir().unwrap();
        let store = TableStore::open(dir.path()).unwrap();

        let written = vec![sample_score(1, 4, 6), sample_score(2, 5, 9)];
        store.save(&DAILY_SCORES, &written).unwrap();

        let read: Vec<DailyScore> = store.load(&DAILY_SCORES).unwrap();
        assert_eq!(read, written);
    }

    #[test]
    fn save_replaces_previous_rows() {
        let dir = tempdir().unwrap();
        let store = TableStore::open(dir.path()).unwrap();

        store
            .save(&DAILY_SCORES, &[sample_score(1, 4, 6), sample_score(2, 5, 9)])
            .unwrap();
        store.save(&DAILY_SCORES, &[sample_score(3, 6, 2)]).unwrap();

        let read: Vec<DailyScore> = store.load(&DAILY_SCORES).unwrap();
        assert_eq!(read, vec![sample_score(3, 6, 2)]);
    }
}
