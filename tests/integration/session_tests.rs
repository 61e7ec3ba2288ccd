//! Session persistence on a real directory.

use std::sync::Arc;

use chrono::{TimeDelta, TimeZone, Utc};
use movemint::clock::ManualClock;
use movemint::session::{SESSION_KEY, SessionService, SubSessionKind, WorkflowStep};
use movemint::storage::{FileStore, KeyValueStore};
use movemint::test_utils::fixtures::{self, TempWorkspace};

fn service(workspace: &TempWorkspace, clock: &Arc<ManualClock>) -> (SessionService, Arc<FileStore>) {
    let store = Arc::new(FileStore::open(workspace.root.join("sessions")).unwrap());
    let service = SessionService::new(store.clone(), clock.clone(), TimeDelta::hours(24));
    (service, store)
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()))
}

#[test]
fn session_survives_a_new_service_instance() {
    let workspace = TempWorkspace::new();
    let clock = clock();
    let (first, _) = service(&workspace, &clock);
    first.save_upload(fixtures::completed_upload("vid-1")).unwrap();
    first.save_analysis(fixtures::completed_analysis("vid-1")).unwrap();

    let (second, _) = service(&workspace, &clock);
    let session = second.load_session().unwrap();
    assert_eq!(session.current_step, WorkflowStep::Results);
    assert_eq!(session.resume_step(), WorkflowStep::Results);
    assert_eq!(second.analysis().unwrap().video_id, "vid-1");
}

#[test]
fn session_file_is_written_under_key_name() {
    let workspace = TempWorkspace::new();
    let clock = clock();
    let (service, _) = service(&workspace, &clock);
    service.start_session().unwrap();

    let path = workspace
        .root
        .join("sessions")
        .join(format!("{SESSION_KEY}.json"));
    assert!(path.exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn corrupted_file_reads_as_no_session_and_is_removed() {
    let workspace = TempWorkspace::new();
    let clock = clock();
    let (service, store) = service(&workspace, &clock);
    store.set(SESSION_KEY, "{ not json").unwrap();

    assert!(service.load_session().is_none());
    assert!(store.get(SESSION_KEY).unwrap().is_none());
}

#[test]
fn invalid_nested_record_is_dropped_alone() {
    let workspace = TempWorkspace::new();
    let clock = clock();
    let (service, store) = service(&workspace, &clock);
    service.save_upload(fixtures::completed_upload("vid-1")).unwrap();

    let raw = store.get(SESSION_KEY).unwrap().unwrap();
    let mut json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    json["license"] = serde_json::json!({ "videoId": "vid-1", "licenseConfig": 42 });
    store.set(SESSION_KEY, &json.to_string()).unwrap();

    let session = service.load_session().unwrap();
    assert!(session.upload.is_some());
    assert!(session.license.is_none());

    // the pruned session was written back
    let rewritten: serde_json::Value =
        serde_json::from_str(&store.get(SESSION_KEY).unwrap().unwrap()).unwrap();
    assert!(rewritten.get("license").is_none_or(serde_json::Value::is_null));
}

#[test]
fn idle_session_expires() {
    let workspace = TempWorkspace::new();
    let clock = clock();
    let (service, store) = service(&workspace, &clock);
    service.start_session().unwrap();

    clock.advance(TimeDelta::hours(23));
    assert!(service.has_active_session());
    assert_eq!(service.time_until_expiry(), Some(TimeDelta::hours(1)));

    clock.advance(TimeDelta::hours(1) + TimeDelta::seconds(1));
    assert!(service.load_session().is_none());
    assert!(store.get(SESSION_KEY).unwrap().is_none());
}

#[test]
fn saving_keeps_session_alive() {
    let workspace = TempWorkspace::new();
    let clock = clock();
    let (service, _) = service(&workspace, &clock);
    service.start_session().unwrap();

    clock.advance(TimeDelta::hours(20));
    service.save_upload(fixtures::completed_upload("vid-2")).unwrap();
    clock.advance(TimeDelta::hours(20));

    let session = service.load_session().unwrap();
    assert_eq!(service.session_age(), Some(TimeDelta::hours(40)));
    assert_eq!(session.upload.unwrap().video_id.as_deref(), Some("vid-2"));
}

#[test]
fn clearing_one_part_keeps_the_rest() {
    let workspace = TempWorkspace::new();
    let clock = clock();
    let (service, _) = service(&workspace, &clock);
    service.save_upload(fixtures::completed_upload("vid-3")).unwrap();
    service.save_analysis(fixtures::completed_analysis("vid-3")).unwrap();

    service.clear_sub_session(SubSessionKind::Analysis).unwrap();
    let session = service.load_session().unwrap();
    assert!(session.analysis.is_none());
    assert!(session.upload.is_some());
    assert_eq!(session.resume_step(), WorkflowStep::Analysis);
}
