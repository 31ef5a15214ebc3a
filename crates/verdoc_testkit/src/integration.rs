//! Cross-crate scenario checks.
//!
//! Each scenario runs against a [`TestRegistry`] and asserts on both the
//! loaded models and the raw rows in the store.

use crate::fixtures::TestRegistry;
use crate::models::{Note, Profile};
use verdoc_core::{fields, CoreError, Model, Pagination, VersionedCollection};
use verdoc_storage::{Document, Filter, Sort};

/// Raw rows of one logical id, oldest first.
pub fn stored_versions<T: Model>(
    collection: &VersionedCollection<T>,
    model_id: &str,
) -> Vec<Document> {
    collection
        .list_raw(
            Filter::new().eq(fields::MODEL_ID, model_id),
            None,
            Some(Sort::ascending(fields::VERSION)),
        )
        .fetch()
        .expect("Failed to read versions")
}

/// Number of rows of one logical id flagged as latest.
pub fn latest_flag_count<T: Model>(collection: &VersionedCollection<T>, model_id: &str) -> u64 {
    collection
        .store()
        .count(
            T::COLLECTION_NAME,
            &Filter::new()
                .eq(fields::MODEL_ID, model_id)
                .eq(fields::IS_LATEST, true),
        )
        .expect("Failed to count latest rows")
}

/// Save, save again, delete: three rows, only the last one latest.
pub fn save_save_delete(registry: &TestRegistry) {
    let notes = registry.notes();
    let mut note = Note::new("first", "");
    notes.save(&mut note).expect("first save");
    let model_id = note.model_id().expect("model id assigned").to_string();

    note.title = "second".into();
    notes.save(&mut note).expect("second save");
    assert_eq!(note.version(), 2);
    assert_eq!(note.model_id(), Some(model_id.as_str()));

    notes.delete(&mut note).expect("delete");
    assert!(note.is_deleted());

    let rows = stored_versions(&notes, &model_id);
    assert_eq!(rows.len(), 3);
    let flags: Vec<Option<bool>> = rows.iter().map(|r| r.get_bool(fields::IS_LATEST)).collect();
    assert_eq!(flags, vec![Some(false), Some(false), Some(true)]);
    let deleted: Vec<bool> = rows
        .iter()
        .map(|r| r.get_i64(fields::TIME_DELETED) != Some(0))
        .collect();
    assert_eq!(deleted, vec![false, false, true]);

    // Ids differ per version.
    assert_ne!(rows[0].id(), rows[1].id());
    assert_ne!(rows[1].id(), rows[2].id());
}

/// A deleted model rejects further writes and leaves no trace in listings.
pub fn deleted_models_are_frozen(registry: &TestRegistry) {
    let notes = registry.notes();
    let mut note = Note::new("doomed", "");
    notes.save(&mut note).expect("save");
    notes.delete(&mut note).expect("delete");
    let model_id = note.model_id().expect("model id").to_string();

    let mut reloaded = notes
        .find_latest_by_model_id(&model_id)
        .expect("lookup")
        .expect("latest exists");
    reloaded.title = "resurrected".into();
    assert!(matches!(
        notes.save(&mut reloaded),
        Err(CoreError::CannotUpdateDeleted { .. })
    ));
    assert_eq!(stored_versions(&notes, &model_id).len(), 2);

    let page = notes.list_latest(&Pagination::default()).expect("list");
    assert!(page.items.iter().all(|n| n.model_id() != Some(model_id.as_str())));

    let history = notes
        .list_versions(&model_id, &Pagination::default())
        .expect("history");
    assert_eq!(history.total, 2);
}

/// Listing only yields latest, non-deleted versions, whatever the caller
/// filter says.
pub fn list_latest_shows_current_state(registry: &TestRegistry) {
    let profiles = registry.profiles();
    for name in ["carol", "alice", "bob"] {
        let mut profile = Profile::new(name);
        profiles.save(&mut profile).expect("save");
        profile.labels.insert("rev".into(), "2".into());
        profiles.save(&mut profile).expect("resave");
    }
    let mut gone = Profile::new("dave");
    profiles.save(&mut gone).expect("save");
    profiles.delete(&mut gone).expect("delete");

    let page = profiles.list_latest(&Pagination::default()).expect("list");
    let names: Vec<&str> = page.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["alice", "bob", "carol"]);
    assert!(page.items.iter().all(|p| p.version() == 2));

    let widened = Pagination::default().filter(
        Filter::new()
            .eq(fields::IS_LATEST, false)
            .eq(fields::TIME_DELETED, 1),
    );
    assert_eq!(profiles.list_latest(&widened).expect("list").total, 3);
}

/// API documents hide storage bookkeeping and report the logical id.
pub fn api_documents_expose_logical_ids(registry: &TestRegistry) {
    let profiles = registry.profiles();
    let mut profile = Profile::new("eve").label("role.primary", "admin");
    profiles.save(&mut profile).expect("save");

    let api = profile.to_api_document();
    assert_eq!(api.model, "Profile");
    assert_eq!(Some(api.id.as_str()), profile.model_id());
    assert_eq!(api.version, 1);
    assert_eq!(api.data["labels"]["role.primary"], "admin");

    let json = serde_json::to_value(&api).expect("serialize");
    assert!(json.get("is_latest").is_none());
    assert!(json.get("_id").is_none());

    let page = profiles.list_latest(&Pagination::default()).expect("list");
    let api_page = page.to_api();
    assert_eq!(api_page.total, 1);
    assert_eq!(api_page.items[0], api);
}

/// Every version stays addressable by record id and version number.
pub fn old_versions_stay_addressable(registry: &TestRegistry) {
    let notes = registry.notes();
    let mut note = Note::new("v1", "");
    let first = notes.save(&mut note).expect("save");
    note.title = "v2".into();
    notes.save(&mut note).expect("save");
    let model_id = note.model_id().expect("model id").to_string();

    let by_id = notes
        .find_by_id(&first.to_hex())
        .expect("lookup")
        .expect("found");
    assert_eq!(by_id.title, "v1");
    let by_version = notes
        .find_version(&model_id, 1)
        .expect("lookup")
        .expect("found");
    assert_eq!(by_version.meta.id, Some(first));
    assert!(notes.find_by_id("zzz").expect("lookup").is_none());
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdoc_core::{Config, LatestDemotion};

    #[test]
    fn test_save_save_delete() {
        save_save_delete(&TestRegistry::new());
    }

    #[test]
    fn test_save_save_delete_unconditional() {
        save_save_delete(&TestRegistry::with_config(
            Config::new().demotion(LatestDemotion::Unconditional),
        ));
    }

    #[test]
    fn test_deleted_models_are_frozen() {
        deleted_models_are_frozen(&TestRegistry::new());
    }

    #[test]
    fn test_list_latest_shows_current_state() {
        list_latest_shows_current_state(&TestRegistry::new());
    }

    #[test]
    fn test_api_documents_expose_logical_ids() {
        api_documents_expose_logical_ids(&TestRegistry::new());
    }

    #[test]
    fn test_old_versions_stay_addressable() {
        old_versions_stay_addressable(&TestRegistry::new());
    }

    #[test]
    fn test_latest_flag_helper() {
        let registry = TestRegistry::new();
        let notes = registry.notes();
        let mut note = Note::new("x", "");
        notes.save(&mut note).unwrap();
        notes.save(&mut note).unwrap();
        assert_eq!(latest_flag_count(&notes, note.model_id().unwrap()), 1);
    }
}
