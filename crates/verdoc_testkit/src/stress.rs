//! Stress tests for concurrent writers.
//!
//! Writers follow the documented protocol: on a version conflict they
//! reload the latest version and try again.

use crate::fixtures::TestRegistry;
use crate::models::Note;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use verdoc_core::{CoreError, CoreResult, Model, VersionedCollection};

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Saves that went through.
    pub saves: usize,
    /// Conflicts that forced a reload.
    pub retries: usize,
    /// Wall-clock duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Saves: {}", self.saves);
        println!("Retries: {}", self.retries);
        println!("Duration: {:?}", self.duration);
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Concurrent writer threads.
    pub threads: usize,
    /// Saves each thread performs.
    pub saves_per_thread: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            saves_per_thread: 25,
        }
    }
}

/// Reloads the latest version, applies `edit`, and saves, retrying on
/// version conflicts. Returns the number of retries.
pub fn save_with_retry<T, F>(
    collection: &VersionedCollection<T>,
    model_id: &str,
    mut edit: F,
) -> CoreResult<usize>
where
    T: Model,
    F: FnMut(&mut T),
{
    let mut retries = 0;
    loop {
        let mut model = collection
            .find_latest_by_model_id(model_id)?
            .ok_or_else(|| {
                CoreError::invalid_document(format!("no latest version of {model_id}"))
            })?;
        edit(&mut model);
        match collection.save(&mut model) {
            Ok(_) => return Ok(retries),
            Err(err) if err.is_retryable() => retries += 1,
            Err(err) => return Err(err),
        }
    }
}

/// Many threads saving new versions of one note.
///
/// Returns the logical id of the note and the run result.
pub fn stress_shared_note(
    registry: &TestRegistry,
    config: &StressConfig,
) -> (String, StressTestResult) {
    let notes = registry.notes();
    let mut note = Note::new("shared", "");
    notes.save(&mut note).expect("initial save");
    let model_id = note.model_id().expect("model id").to_string();

    let saves = AtomicUsize::new(0);
    let retries = AtomicUsize::new(0);
    let start = Instant::now();

    thread::scope(|scope| {
        for worker in 0..config.threads {
            let notes = notes.clone();
            let model_id = model_id.as_str();
            let saves = &saves;
            let retries = &retries;
            scope.spawn(move || {
                for n in 0..config.saves_per_thread {
                    let conflicts = save_with_retry(&notes, model_id, |note: &mut Note| {
                        note.body = format!("worker {worker} save {n}");
                    })
                    .expect("save failed");
                    retries.fetch_add(conflicts, Ordering::Relaxed);
                    saves.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
    });

    let result = StressTestResult {
        saves: saves.into_inner(),
        retries: retries.into_inner(),
        duration: start.elapsed(),
    };
    (model_id, result)
}

/// Threads each saving their own notes; no conflicts expected.
pub fn stress_independent_notes(
    registry: &TestRegistry,
    config: &StressConfig,
) -> StressTestResult {
    let notes = registry.notes();
    let saves = AtomicUsize::new(0);
    let start = Instant::now();

    thread::scope(|scope| {
        for worker in 0..config.threads {
            let notes = notes.clone();
            let saves = &saves;
            scope.spawn(move || {
                let mut note = Note::new(&format!("worker {worker}"), "");
                for _ in 0..config.saves_per_thread {
                    notes.save(&mut note).expect("save failed");
                    saves.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
    });

    StressTestResult {
        saves: saves.into_inner(),
        retries: 0,
        duration: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::{latest_flag_count, stored_versions};
    use verdoc_core::{fields, Pagination};

    #[test]
    fn test_shared_note_converges() {
        let registry = TestRegistry::new();
        let config = StressConfig {
            threads: 4,
            saves_per_thread: 20,
        };
        let (model_id, result) = stress_shared_note(&registry, &config);
        result.print_summary("shared note");
        assert_eq!(result.saves, 80);

        let notes = registry.notes();
        let latest = notes.find_latest_by_model_id(&model_id).unwrap().unwrap();
        assert_eq!(latest.version(), 81);
        assert_eq!(latest_flag_count(&notes, &model_id), 1);

        let versions: Vec<i64> = stored_versions(&notes, &model_id)
            .iter()
            .map(|row| row.get_i64(fields::VERSION).unwrap())
            .collect();
        assert_eq!(versions, (1..=81).collect::<Vec<i64>>());
    }

    #[test]
    fn test_two_writers_same_base() {
        let registry = TestRegistry::new();
        let notes = registry.notes();
        let mut base = Note::new("base", "");
        notes.save(&mut base).unwrap();
        let model_id = base.model_id().unwrap().to_string();

        let mut first = base.clone();
        let mut second = base.clone();
        first.body = "first".into();
        second.body = "second".into();

        notes.save(&mut first).unwrap();
        let err = notes.save(&mut second).unwrap_err();
        assert!(err.is_retryable());

        let retries = save_with_retry(&notes, &model_id, |note: &mut Note| {
            note.body = "second".into();
        })
        .unwrap();
        assert_eq!(retries, 0);

        let latest = notes.find_latest_by_model_id(&model_id).unwrap().unwrap();
        assert_eq!(latest.version(), 3);
        assert_eq!(latest.body, "second");
        assert_eq!(latest_flag_count(&notes, &model_id), 1);
    }

    #[test]
    fn test_independent_notes() {
        let registry = TestRegistry::new();
        let config = StressConfig::default();
        let result = stress_independent_notes(&registry, &config);
        assert_eq!(result.saves, 100);

        let page = registry
            .notes()
            .list_latest(&Pagination::new(1, 50))
            .unwrap();
        assert_eq!(page.total, 4);
        assert!(page.items.iter().all(|n| n.version() == 25));
    }
}
