use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};
use bincode::{deserialize, serialize};
use chrono::{serde::ts_seconds_option, NaiveDateTime};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::study::{
    cleanup::{CleanupAdapter, OperationResult},
    DateTime, NamedPeriod,
};

const STUDIES: &str = "studies";
const USER: &str = "user";
const SYSTEM: &str = "system";

/// One logged study session.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StudyRecord {
    pub subject: String,
    /// `None` when the source value could not be read as a date.
    pub date: Option<NaiveDateTime>,
    /// Minutes.
    pub duration: u32,
    pub topic: String,
    pub notes: String,
    pub source: String,
}

impl StudyRecord {
    pub fn new(subject: String, date: NaiveDateTime, duration: u32) -> Self {
        Self {
            subject,
            date: Some(date),
            duration,
            topic: String::new(),
            notes: String::new(),
            source: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UserData {
    /// Daily study goal in minutes.
    pub daily_goal: Option<u32>,
    pub default_period: NamedPeriod,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SystemData {
    #[serde(with = "ts_seconds_option")]
    pub last_import: Option<DateTime>,
    pub imports: u32,
}

/// Bincode files under a single data directory.
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn open() -> Result<Self> {
        Ok(Self::at(dir()?))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn read_studies(&self) -> Result<Vec<StudyRecord>> {
        self.read(STUDIES)
    }

    /// Sorts by date before writing; undated records go last.
    pub fn write_studies(&self, studies: &mut [StudyRecord]) -> Result<()> {
        studies.sort_by_key(|record| (record.date.is_none(), record.date));
        self.write(STUDIES, &*studies)
    }

    pub fn read_user(&self) -> Result<UserData> {
        self.read(USER)
    }

    pub fn write_user(&self, user: &UserData) -> Result<()> {
        self.write(USER, user)
    }

    pub fn read_system(&self) -> Result<SystemData> {
        self.read(SYSTEM)
    }

    pub fn write_system(&self, system: &SystemData) -> Result<()> {
        self.write(SYSTEM, system)
    }

    fn read<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        Ok(if let Ok(encoded) = fs::read(self.dir.join(name)) {
            deserialize(&encoded)?
        } else {
            T::default()
        })
    }

    fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        fs::write(self.dir.join(name), serialize(value)?)?;
        debug!(file = name, dir = %self.dir.display(), "wrote data file");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        remove_if_exists(&self.dir.join(name))?;
        Ok(())
    }
}

impl CleanupAdapter for Store {
    fn clear_studies(&mut self) -> OperationResult {
        // An unreadable file is still removed, it just has no count.
        let removed = match self.read_studies() {
            Ok(studies) => studies.len(),
            Err(e) => {
                warn!(error = %e, "studies file is unreadable, removing it anyway");
                0
            }
        };
        match self.remove(STUDIES) {
            Ok(()) => OperationResult::ok(removed),
            Err(e) => OperationResult::failure(e.to_string()),
        }
    }

    fn clear_user_data(&mut self) -> Result<()> {
        self.remove(USER)
    }

    fn clear_system_data(&mut self) -> Result<()> {
        self.remove(SYSTEM)
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("STUDY_TRACK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    Ok(dirs::data_local_dir()
        .ok_or_else(|| anyhow!("error: Failed to find user data directory"))?
        .join("study-track"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::{
        at,
        cleanup::{CleanupRequest, CleanupService, DataKind, Scope},
    };

    fn record(subject: &str, date: Option<&str>) -> StudyRecord {
        StudyRecord {
            subject: subject.to_string(),
            date: date.map(at),
            duration: 30,
            topic: String::new(),
            notes: String::new(),
            source: String::new(),
        }
    }

    #[test]
    fn missing_files_read_as_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::at(tmp.path().join("nested"));
        assert!(store.read_studies().unwrap().is_empty());
        assert_eq!(store.read_user().unwrap(), UserData::default());
        assert_eq!(store.read_system().unwrap().imports, 0);
    }

    #[test]
    fn studies_are_written_in_date_order() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::at(tmp.path());
        let mut studies = vec![
            record("Bio", None),
            record("Math", Some("2024-06-01")),
            record("Chem", Some("2024-01-05")),
        ];
        store.write_studies(&mut studies).unwrap();

        let subjects: Vec<_> = store
            .read_studies()
            .unwrap()
            .into_iter()
            .map(|r| r.subject)
            .collect();
        assert_eq!(subjects, ["Chem", "Math", "Bio"]);
    }

    #[test]
    fn clearing_studies_reports_removed_count() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = Store::at(tmp.path());
        let mut studies = vec![record("Math", Some("2024-01-05")), record("Bio", None)];
        store.write_studies(&mut studies).unwrap();

        let result = store.clear_studies();
        assert!(!result.failed());
        assert_eq!(result.removed(), 2);
        assert!(store.read_studies().unwrap().is_empty());
    }

    #[test]
    fn clearing_missing_files_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = Store::at(tmp.path());
        assert!(store.clear_user_data().is_ok());
        assert!(store.clear_system_data().is_ok());
        assert_eq!(store.clear_studies().removed(), 0);
    }

    #[test]
    fn corrupt_data_files_are_still_cleared() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(STUDIES), [0xff; 3]).unwrap();
        fs::write(tmp.path().join(USER), [0; 5]).unwrap();
        assert!(Store::at(tmp.path()).read_studies().is_err());

        let request = CleanupRequest::new([Scope::Local], [DataKind::Studies, DataKind::UserData]);
        let outcome = CleanupService::new()
            .with_local(Store::at(tmp.path()))
            .run(&request);

        assert!(outcome.success, "{}", outcome.message);
        assert!(!tmp.path().join(STUDIES).exists());
        assert!(!tmp.path().join(USER).exists());
        assert!(Store::at(tmp.path()).read_studies().unwrap().is_empty());
    }

    #[test]
    fn user_data_survives_clearing_studies() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = Store::at(tmp.path());
        let user = UserData {
            daily_goal: Some(90),
            default_period: NamedPeriod::Month,
        };
        store.write_user(&user).unwrap();
        let _ = store.clear_studies();
        assert_eq!(store.read_user().unwrap(), user);
    }
}
