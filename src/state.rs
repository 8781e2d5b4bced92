use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};

use crate::config::DashboardConfig;
use crate::data::cache::TableCache;
use crate::data::filter::{filter_rows, validate, Predicate};
use crate::data::model::StudentTable;
use crate::data::query::{compare_to_population, MetricComparison};
use crate::error::{DataError, DataResult};
use crate::views::{self, DeepDivePage, DeepDiveSelection};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// One viewer's session, independent of rendering.
///
/// Holds the shared table plus the viewer's own choices. The choices are
/// re-checked against every new table so a refresh never leaves a filter or
/// selection pointing at a column or student that is gone.
pub struct DashboardState {
    cache: Arc<TableCache>,

    /// Source the session reads from.
    pub data_path: PathBuf,

    /// Loaded table (None until the first successful load).
    pub table: Option<Arc<StudentTable>>,

    /// Active filters, as a conjunction.
    pub filters: Vec<Predicate>,

    /// Student picked for the comparison view.
    pub selected_student: Option<i64>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl DashboardState {
    pub fn new(cache: Arc<TableCache>, data_path: impl Into<PathBuf>) -> Self {
        Self {
            cache,
            data_path: data_path.into(),
            table: None,
            filters: Vec::new(),
            selected_student: None,
            status_message: None,
        }
    }

    /// Reload through the cache. A failure is recorded in the status message
    /// and the previous table stays in place.
    pub fn refresh(&mut self) -> DataResult<()> {
        match self.cache.get_or_load(&self.data_path) {
            Ok(table) => {
                let unchanged = self
                    .table
                    .as_ref()
                    .is_some_and(|current| Arc::ptr_eq(current, &table));
                if !unchanged {
                    self.set_table(table);
                }
                self.status_message = None;
                Ok(())
            }
            Err(e) => {
                warn!("Could not load {}: {e}", self.data_path.display());
                self.status_message = Some(format!("Error: {e}"));
                Err(e)
            }
        }
    }

    /// Drop the cached copy and reload.
    pub fn invalidate(&mut self) -> DataResult<()> {
        self.cache.invalidate(&self.data_path);
        self.refresh()
    }

    /// Ingest a newly loaded table and re-validate the viewer's choices.
    pub fn set_table(&mut self, table: Arc<StudentTable>) {
        let before = self.filters.len();
        self.filters
            .retain(|p| validate(&table, std::slice::from_ref(p)).is_ok());
        if self.filters.len() != before {
            info!(
                "Dropped {} filter(s) that no longer match the data",
                before - self.filters.len()
            );
        }
        if let Some(id) = self.selected_student {
            if table.position_of(id).is_none() {
                info!("Selected student {id} is gone after refresh");
                self.selected_student = None;
            }
        }
        self.table = Some(table);
    }

    /// The loaded table, or `DataUnavailable` before the first load.
    pub fn table(&self) -> DataResult<&Arc<StudentTable>> {
        self.table.as_ref().ok_or_else(|| {
            DataError::DataUnavailable(format!("{} is not loaded", self.data_path.display()))
        })
    }

    /// Add a filter after checking it against the current table.
    pub fn add_filter(&mut self, predicate: Predicate) -> DataResult<()> {
        validate(self.table()?, std::slice::from_ref(&predicate))?;
        self.filters.push(predicate);
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    pub fn select_student(&mut self, id: i64) -> DataResult<()> {
        if self.table()?.position_of(id).is_none() {
            return Err(DataError::RowNotFound(id));
        }
        self.selected_student = Some(id);
        Ok(())
    }

    /// The table with the active filters applied.
    pub fn filtered(&self) -> DataResult<StudentTable> {
        filter_rows(self.table()?, &self.filters)
    }

    /// Selected student against the mean of the whole table, ignoring
    /// filters. Empty when no student is selected.
    pub fn comparison(&self, metrics: &[&str]) -> DataResult<Vec<MetricComparison>> {
        match self.selected_student {
            Some(id) => compare_to_population(self.table()?, id, metrics),
            None => Ok(Vec::new()),
        }
    }

    /// Deep-dive page for the current filters and selection.
    pub fn deep_dive(&self, cfg: &DashboardConfig) -> DataResult<DeepDivePage> {
        let selection = DeepDiveSelection {
            filters: self.filters.clone(),
            student_id: self.selected_student,
        };
        Ok(views::deep_dive(self.table()?, cfg, &selection))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::data::filter::Selection;

    fn write_csv(path: &Path, body: &str) {
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();
    }

    fn session(dir: &Path, body: &str) -> DashboardState {
        let path = dir.join("students.csv");
        write_csv(&path, body);
        let mut state = DashboardState::new(Arc::new(TableCache::new()), path);
        state.refresh().unwrap();
        state
    }

    #[test]
    fn refresh_without_file_keeps_session_alive() {
        let mut state = DashboardState::new(Arc::new(TableCache::new()), "/no/such.csv");
        assert!(state.refresh().is_err());
        assert!(state.status_message.as_deref().unwrap().starts_with("Error:"));
        assert!(state.table.is_none());
    }

    #[test]
    fn filters_are_validated_on_add() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = session(dir.path(), "Gender,Exam_Score\nMale,60\nFemale,70\n");

        let bad = Predicate::Range {
            column: "Gender".into(),
            min: 0.0,
            max: 1.0,
        };
        assert_eq!(
            state.add_filter(bad).unwrap_err(),
            DataError::NotNumeric("Gender".into())
        );

        state
            .add_filter(Predicate::Match {
                column: "Gender".into(),
                selection: Selection::Value("Female".into()),
            })
            .unwrap();
        assert_eq!(state.filtered().unwrap().ids(), &[1]);
    }

    #[test]
    fn refresh_drops_stale_choices() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = session(dir.path(), "Gender,Exam_Score\nMale,60\nFemale,70\n");
        state
            .add_filter(Predicate::Match {
                column: "Gender".into(),
                selection: Selection::All,
            })
            .unwrap();
        state.select_student(1).unwrap();

        // New file version: Gender gone, one student left.
        let path = state.data_path.clone();
        std::fs::write(&path, "Exam_Score\n80\n").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(120))
            .unwrap();
        state.refresh().unwrap();

        assert!(state.filters.is_empty());
        assert_eq!(state.selected_student, None);
        assert_eq!(state.table().unwrap().len(), 1);
    }

    #[test]
    fn comparison_ignores_active_filters() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = session(dir.path(), "Exam_Score\n60\n70\n80\n");
        state
            .add_filter(Predicate::Range {
                column: "Exam_Score".into(),
                min: 75.0,
                max: 100.0,
            })
            .unwrap();
        state.select_student(2).unwrap();

        let cmp = state.comparison(&["Exam_Score"]).unwrap();
        assert_eq!(cmp[0].individual, Some(80.0));
        assert_eq!(cmp[0].population_mean, Some(70.0));
        assert_eq!(state.filtered().unwrap().len(), 1);

        state.clear_filters();
        assert_eq!(state.filtered().unwrap().len(), 3);
    }

    #[test]
    fn invalidate_reloads_the_same_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = session(dir.path(), "Exam_Score\n60\n70\n");
        let before = state.table().unwrap().clone();
        state.invalidate().unwrap();
        let after = state.table().unwrap();
        assert!(!Arc::ptr_eq(&before, after));
        assert_eq!(*before, **after);
    }

    #[test]
    fn unknown_student_cannot_be_selected() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = session(dir.path(), "Exam_Score\n60\n");
        assert_eq!(state.select_student(5).unwrap_err(), DataError::RowNotFound(5));
    }
}
