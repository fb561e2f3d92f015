use chrono::{Duration, Utc, Weekday};
use taskdeck_core::calendar::group_by_day;
use taskdeck_core::filter::{DueDateSort, FilterCriteria, StatusFilter, apply_filters, categories};
use taskdeck_core::service::{FileService, TaskService};
use taskdeck_core::stats;
use taskdeck_core::store::TaskStore;
use taskdeck_core::task::{NewTask, Priority, TaskPatch};
use tempfile::tempdir;

#[test]
fn file_service_roundtrip_and_filtering() {
    let temp = tempdir().expect("tempdir");
    let service = FileService::open(temp.path()).expect("open file service");
    service.sign_in("Ana").expect("sign in");

    let now = Utc::now();
    let mut store = TaskStore::new(service);
    store.load().expect("initial load");

    let overdue = store
        .create(NewTask {
            title: "Renew passport".to_string(),
            priority: Some(Priority::High),
            due_date: Some(now - Duration::days(1)),
            category: Some("Errands".to_string()),
            ..NewTask::default()
        })
        .expect("create overdue task");
    let upcoming = store
        .create(NewTask {
            title: "Write quarterly report".to_string(),
            due_date: Some(now + Duration::days(1)),
            category: Some("Work".to_string()),
            ..NewTask::default()
        })
        .expect("create upcoming task");
    store
        .create(NewTask::titled("Someday: learn the cello"))
        .expect("create undated task");

    store
        .toggle_complete(upcoming.id)
        .expect("toggle")
        .expect("task is known");

    // A fresh store over the same directory sees the persisted rows.
    let reopened = FileService::open(temp.path()).expect("reopen");
    let mut fresh = TaskStore::new(reopened);
    let tasks = fresh.load().expect("reload").to_vec();
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0].title, "Someday: learn the cello");
    assert_eq!(tasks[0].owner, "ana");

    let overdue_only = FilterCriteria {
        status: StatusFilter::Overdue,
        ..FilterCriteria::default()
    };
    let filtered = apply_filters(&tasks, &overdue_only, now);
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, overdue.id);

    let soonest = FilterCriteria {
        due_date_sort: DueDateSort::Soonest,
        ..FilterCriteria::default()
    };
    let ordered: Vec<_> = apply_filters(&tasks, &soonest, now)
        .into_iter()
        .map(|task| task.title.as_str())
        .collect();
    assert_eq!(
        ordered,
        vec![
            "Renew passport",
            "Write quarterly report",
            "Someday: learn the cello"
        ]
    );

    assert_eq!(categories(&tasks), vec!["Errands", "Work"]);
    assert_eq!(group_by_day(&tasks, &chrono_tz::UTC).len(), 2);

    let dashboard = stats::compute(&tasks, now, &chrono_tz::UTC, Weekday::Sun);
    assert_eq!(dashboard.total, 3);
    assert_eq!(dashboard.completed, 1);
    assert_eq!(dashboard.overdue, 1);
    assert_eq!(dashboard.high_priority_open, 1);
    assert_eq!(dashboard.streak, 1);
}

#[test]
fn rows_are_private_to_their_owner() {
    let temp = tempdir().expect("tempdir");
    let service = FileService::open(temp.path()).expect("open file service");

    service.sign_in("ana").expect("sign in ana");
    let mut store = TaskStore::new(&service);
    let task = store.create(NewTask::titled("Ana's task")).expect("create");

    service.sign_in("bo").expect("sign in bo");
    let mut other = TaskStore::new(&service);
    assert!(other.load().expect("load as bo").is_empty());

    let err = other
        .update(task.id, TaskPatch::completed(true))
        .expect_err("bo cannot update ana's task");
    assert_eq!(err.code(), "write_error");
    assert!(other.delete(task.id).is_err());

    service.sign_in("ana").expect("sign back in");
    let principal = service
        .current_principal()
        .expect("session")
        .expect("signed in");
    let rows = service.fetch_tasks(&principal).expect("fetch");
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].completed);
}

#[test]
fn signed_out_store_cannot_load_or_create() {
    let temp = tempdir().expect("tempdir");
    let service = FileService::open(temp.path()).expect("open file service");
    service.sign_in("ana").expect("sign in");
    let previous = service.sign_out().expect("sign out");
    assert_eq!(previous.map(|principal| principal.id).as_deref(), Some("ana"));

    let mut store = TaskStore::new(service);
    assert_eq!(store.load().expect_err("load").code(), "fetch_error");
    assert_eq!(
        store
            .create(NewTask::titled("orphan"))
            .expect_err("create")
            .code(),
        "not_authenticated"
    );
}
