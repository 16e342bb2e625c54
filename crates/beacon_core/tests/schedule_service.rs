use beacon_core::db::open_db_in_memory;
use beacon_core::{
    Activity, DisplayId, NewTask, Project, ProjectDetails, ProjectKind, ProjectService,
    ScheduleRepository, ScheduleService, ScheduleServiceError, SqliteProjectRepository,
    SqliteScheduleRepository, Task, TaskStatus, TaskValidationError,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use uuid::Uuid;

type Service<'conn> = ScheduleService<SqliteScheduleRepository<'conn>>;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

fn create_project(conn: &Connection, title: &str) -> Project {
    let repo = SqliteProjectRepository::try_new(conn).unwrap();
    ProjectService::new(repo)
        .create_project(ProjectKind::Physical, title, ProjectDetails::default())
        .unwrap()
}

fn schedule_service(conn: &Connection) -> Service<'_> {
    ScheduleService::new(SqliteScheduleRepository::try_new(conn).unwrap())
}

fn add_task(
    service: &Service<'_>,
    activity: &Activity,
    name: &str,
    start: Option<u32>,
    duration_days: u32,
) -> Task {
    let mut new_task = NewTask::new(activity.project_uuid, activity.uuid, name);
    new_task.start_date = start.map(day);
    new_task.duration_days = duration_days;
    service.add_task(new_task).unwrap()
}

fn stored_task(conn: &Connection, id: Uuid) -> Task {
    SqliteScheduleRepository::try_new(conn)
        .unwrap()
        .get_task(id, false)
        .unwrap()
        .unwrap()
}

#[test]
fn activity_and_task_numbers_are_sequential_and_never_reused() {
    let conn = open_db_in_memory().unwrap();
    let project = create_project(&conn, "Community hall");
    let service = schedule_service(&conn);

    let first = service.add_activity(project.uuid, None, "Site prep").unwrap();
    let second = service.add_activity(project.uuid, None, " Framing ").unwrap();
    assert_eq!((first.number, second.number), (1, 2));
    assert_eq!(second.name, "Framing");

    let a = add_task(&service, &second, "Walls", None, 1);
    let b = add_task(&service, &second, "Roof", None, 1);
    assert_eq!(service.display_id(a.uuid).unwrap(), DisplayId::new(2, 1));
    assert_eq!(service.display_id(b.uuid).unwrap(), DisplayId::new(2, 2));

    service.delete_task(b.uuid).unwrap();
    let c = add_task(&service, &second, "Roof again", None, 1);
    assert_eq!(c.number, 3);

    service.delete_activity(second.uuid).unwrap();
    let third = service.add_activity(project.uuid, None, "Finishing").unwrap();
    assert_eq!(third.number, 3);
}

#[test]
fn numbering_is_scoped_per_project_and_activity() {
    let conn = open_db_in_memory().unwrap();
    let left = create_project(&conn, "Left");
    let right = create_project(&conn, "Right");
    let service = schedule_service(&conn);

    let left_activity = service.add_activity(left.uuid, None, "One").unwrap();
    let right_activity = service.add_activity(right.uuid, None, "One").unwrap();
    assert_eq!(left_activity.number, 1);
    assert_eq!(right_activity.number, 1);

    let sub = service
        .add_activity(left.uuid, Some(left_activity.uuid), "Nested")
        .unwrap();
    assert_eq!(sub.number, 2);
    assert_eq!(sub.parent_uuid, Some(left_activity.uuid));

    assert_eq!(add_task(&service, &left_activity, "x", None, 1).number, 1);
    assert_eq!(add_task(&service, &sub, "y", None, 1).number, 1);
}

#[test]
fn add_task_computes_finish_from_start_and_duration() {
    let conn = open_db_in_memory().unwrap();
    let project = create_project(&conn, "Bridge");
    let service = schedule_service(&conn);
    let activity = service.add_activity(project.uuid, None, "Deck").unwrap();

    let task = add_task(&service, &activity, "Pour", Some(1), 3);

    let stored = stored_task(&conn, task.uuid);
    assert_eq!(stored.start_date, Some(day(1)));
    assert_eq!(stored.finish_date, Some(day(3)));
    assert_eq!(stored.duration_days, 3);
    assert_eq!(stored.status, TaskStatus::NotStarted);
}

#[test]
fn set_predecessors_links_and_pushes_successor_dates() {
    let conn = open_db_in_memory().unwrap();
    let project = create_project(&conn, "Bridge");
    let service = schedule_service(&conn);
    let activity = service.add_activity(project.uuid, None, "Deck").unwrap();
    let a = add_task(&service, &activity, "Formwork", Some(1), 3);
    let b = add_task(&service, &activity, "Pour", Some(1), 2);

    let outcome = service.set_predecessors(b.uuid, &["1.1"]).unwrap();

    assert_eq!(outcome.linked, vec![a.uuid]);
    assert!(outcome.unresolved.is_empty());
    assert_eq!(outcome.propagation.changed, vec![b.uuid]);

    let stored_b = stored_task(&conn, b.uuid);
    assert_eq!(stored_b.start_date, Some(day(4)));
    assert_eq!(stored_b.finish_date, Some(day(5)));
    assert_eq!(stored_b.predecessors, vec![a.uuid]);
    assert_eq!(stored_task(&conn, a.uuid).successors, vec![b.uuid]);
    assert_eq!(stored_task(&conn, a.uuid).start_date, Some(day(1)));
}

#[test]
fn set_successors_is_the_mirror_of_set_predecessors() {
    let conn = open_db_in_memory().unwrap();
    let project = create_project(&conn, "Bridge");
    let service = schedule_service(&conn);
    let activity = service.add_activity(project.uuid, None, "Deck").unwrap();
    let a = add_task(&service, &activity, "Formwork", Some(1), 3);
    let b = add_task(&service, &activity, "Pour", Some(1), 2);
    let c = add_task(&service, &activity, "Cure", Some(1), 1);

    let outcome = service.set_successors(a.uuid, &["1.2", "1.3"]).unwrap();

    assert_eq!(outcome.linked, vec![b.uuid, c.uuid]);
    assert_eq!(stored_task(&conn, b.uuid).predecessors, vec![a.uuid]);
    assert_eq!(stored_task(&conn, c.uuid).predecessors, vec![a.uuid]);
    assert_eq!(stored_task(&conn, c.uuid).start_date, Some(day(4)));

    service.set_successors(a.uuid, &["1.3"]).unwrap();
    assert!(stored_task(&conn, b.uuid).predecessors.is_empty());
}

#[test]
fn unresolved_typed_ids_are_reported_and_dropped() {
    let conn = open_db_in_memory().unwrap();
    let project = create_project(&conn, "Bridge");
    let other = create_project(&conn, "Elsewhere");
    let service = schedule_service(&conn);
    let activity = service.add_activity(project.uuid, None, "Deck").unwrap();
    let other_activity = service.add_activity(other.uuid, None, "Elsewhere").unwrap();
    let a = add_task(&service, &activity, "Formwork", Some(1), 1);
    let b = add_task(&service, &activity, "Pour", Some(1), 1);
    add_task(&service, &other_activity, "Foreign", Some(1), 1);
    add_task(&service, &other_activity, "Foreign too", Some(1), 1);
    add_task(&service, &other_activity, "Foreign three", Some(1), 1);

    let outcome = service
        .set_predecessors(b.uuid, &["1.1", "2.9", " ", "1.3", "garbage"])
        .unwrap();

    assert_eq!(outcome.linked, vec![a.uuid]);
    assert_eq!(
        outcome.unresolved,
        vec!["2.9".to_string(), "1.3".to_string(), "garbage".to_string()]
    );
    assert_eq!(stored_task(&conn, b.uuid).predecessors, vec![a.uuid]);
}

#[test]
fn cycles_are_reported_and_their_tasks_left_alone() {
    let conn = open_db_in_memory().unwrap();
    let project = create_project(&conn, "Loop");
    let service = schedule_service(&conn);
    let activity = service.add_activity(project.uuid, None, "Only").unwrap();
    let a = add_task(&service, &activity, "A", Some(1), 2);
    let b = add_task(&service, &activity, "B", Some(3), 2);
    let c = add_task(&service, &activity, "C", Some(1), 1);

    service.set_predecessors(b.uuid, &["1.1"]).unwrap();
    let outcome = service.set_predecessors(a.uuid, &["1.2"]).unwrap();

    assert_eq!(outcome.propagation.excluded, vec![a.uuid, b.uuid]);
    assert_eq!(
        outcome.propagation.excluded_display_ids,
        vec![DisplayId::new(1, 1), DisplayId::new(1, 2)]
    );
    assert!(!outcome.propagation.has_changes());
    assert_eq!(stored_task(&conn, a.uuid).start_date, Some(day(1)));
    assert_eq!(stored_task(&conn, b.uuid).start_date, Some(day(3)));
    assert_eq!(stored_task(&conn, c.uuid).start_date, Some(day(1)));
}

#[test]
fn reschedule_pushes_dependents_and_keeps_the_moved_task() {
    let conn = open_db_in_memory().unwrap();
    let project = create_project(&conn, "Bridge");
    let service = schedule_service(&conn);
    let activity = service.add_activity(project.uuid, None, "Deck").unwrap();
    let a = add_task(&service, &activity, "Formwork", Some(1), 3);
    let b = add_task(&service, &activity, "Pour", None, 2);
    service.set_predecessors(b.uuid, &["1.1"]).unwrap();
    assert_eq!(stored_task(&conn, b.uuid).start_date, Some(day(4)));

    let summary = service.reschedule_task(a.uuid, day(10), 3).unwrap();

    assert_eq!(summary.changed, vec![b.uuid]);
    assert_eq!(stored_task(&conn, a.uuid).finish_date, Some(day(12)));
    assert_eq!(stored_task(&conn, b.uuid).start_date, Some(day(13)));
    assert_eq!(stored_task(&conn, b.uuid).finish_date, Some(day(14)));
}

#[test]
fn rescheduling_before_predecessors_is_pushed_forward_again() {
    let conn = open_db_in_memory().unwrap();
    let project = create_project(&conn, "Bridge");
    let service = schedule_service(&conn);
    let activity = service.add_activity(project.uuid, None, "Deck").unwrap();
    add_task(&service, &activity, "Formwork", Some(5), 2);
    let b = add_task(&service, &activity, "Pour", Some(7), 1);
    service.set_predecessors(b.uuid, &["1.1"]).unwrap();

    let summary = service.reschedule_task(b.uuid, day(1), 2).unwrap();

    assert_eq!(summary.changed, vec![b.uuid]);
    let stored = stored_task(&conn, b.uuid);
    assert_eq!(stored.start_date, Some(day(7)));
    assert_eq!(stored.finish_date, Some(day(8)));
    assert_eq!(stored.duration_days, 2);
}

#[test]
fn deleting_a_task_drops_its_edges() {
    let conn = open_db_in_memory().unwrap();
    let project = create_project(&conn, "Bridge");
    let service = schedule_service(&conn);
    let activity = service.add_activity(project.uuid, None, "Deck").unwrap();
    let a = add_task(&service, &activity, "Formwork", Some(1), 1);
    let b = add_task(&service, &activity, "Pour", Some(1), 1);
    service.set_predecessors(b.uuid, &["1.1"]).unwrap();

    service.delete_task(a.uuid).unwrap();

    assert!(stored_task(&conn, b.uuid).predecessors.is_empty());
    assert_eq!(service.resolve(project.uuid, "1.1").unwrap(), None);
    assert!(matches!(
        service.delete_task(a.uuid),
        Err(ScheduleServiceError::TaskNotFound(id)) if id == a.uuid
    ));
}

#[test]
fn deleting_an_activity_removes_its_subtree() {
    let conn = open_db_in_memory().unwrap();
    let project = create_project(&conn, "Hall");
    let service = schedule_service(&conn);
    let keep = service.add_activity(project.uuid, None, "Keep").unwrap();
    let parent = service.add_activity(project.uuid, None, "Parent").unwrap();
    let child = service
        .add_activity(project.uuid, Some(parent.uuid), "Child")
        .unwrap();
    let kept = add_task(&service, &keep, "Stay", Some(1), 1);
    add_task(&service, &parent, "Go", Some(1), 1);
    add_task(&service, &child, "Go too", Some(1), 1);
    service.set_successors(kept.uuid, &["2.1", "3.1"]).unwrap();

    service.delete_activity(parent.uuid).unwrap();

    let board = service.task_board(project.uuid).unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].task.uuid, kept.uuid);
    assert!(board[0].successor_ids.is_empty());
    assert!(matches!(
        service.activity_rollup(child.uuid),
        Err(ScheduleServiceError::ActivityNotFound(_))
    ));
}

#[test]
fn task_board_is_sorted_by_display_id_with_edges() {
    let conn = open_db_in_memory().unwrap();
    let project = create_project(&conn, "Board");
    let service = schedule_service(&conn);
    let first = service.add_activity(project.uuid, None, "First").unwrap();
    let second = service.add_activity(project.uuid, None, "Second").unwrap();
    add_task(&service, &second, "Late", Some(1), 1);
    add_task(&service, &first, "Early", Some(1), 2);
    for n in 2..=10 {
        add_task(&service, &first, &format!("Filler {n}"), None, 1);
    }
    let late = service.resolve(project.uuid, "2.1").unwrap().unwrap();
    service.set_predecessors(late, &["1.1", "1.10"]).unwrap();

    let board = service.task_board(project.uuid).unwrap();

    let ids: Vec<String> = board.iter().map(|entry| entry.display_id.to_string()).collect();
    assert_eq!(ids.first().map(String::as_str), Some("1.1"));
    assert_eq!(ids.get(9).map(String::as_str), Some("1.10"));
    assert_eq!(ids.last().map(String::as_str), Some("2.1"));

    let late_entry = board.last().unwrap();
    assert_eq!(
        late_entry.predecessor_ids,
        vec![DisplayId::new(1, 1), DisplayId::new(1, 10)]
    );
    assert_eq!(late_entry.task.start_date, Some(day(3)));
    assert_eq!(board[0].successor_ids, vec![DisplayId::new(2, 1)]);
}

#[test]
fn rollup_sums_costs_across_nested_activities() {
    let conn = open_db_in_memory().unwrap();
    let project = create_project(&conn, "Budget");
    let service = schedule_service(&conn);
    let parent = service.add_activity(project.uuid, None, "Parent").unwrap();
    let child = service
        .add_activity(project.uuid, Some(parent.uuid), "Child")
        .unwrap();
    let a = add_task(&service, &parent, "A", Some(2), 2);
    let b = add_task(&service, &child, "B", Some(5), 4);
    service
        .update_task_costs(a.uuid, Some(1_500), Some(500))
        .unwrap();
    service.update_task_costs(b.uuid, Some(2_000), None).unwrap();

    let rollup = service.activity_rollup(parent.uuid).unwrap();

    assert_eq!(rollup.task_count, 2);
    assert_eq!(rollup.start, Some(day(2)));
    assert_eq!(rollup.finish, Some(day(8)));
    assert_eq!(rollup.budget_cents, Some(3_500));
    assert_eq!(rollup.spent_cents, Some(500));
}

#[test]
fn detail_updates_persist_without_touching_dates() {
    let conn = open_db_in_memory().unwrap();
    let project = create_project(&conn, "Details");
    let service = schedule_service(&conn);
    let activity = service.add_activity(project.uuid, None, "Only").unwrap();
    let task = add_task(&service, &activity, "Draft", Some(4), 2);

    service
        .update_task_status(task.uuid, TaskStatus::InProgress)
        .unwrap();
    service.rename_task(task.uuid, "  Final draft ").unwrap();

    let stored = stored_task(&conn, task.uuid);
    assert_eq!(stored.status, TaskStatus::InProgress);
    assert_eq!(stored.name, "Final draft");
    assert_eq!(stored.start_date, Some(day(4)));
    assert_eq!(stored.finish_date, Some(day(5)));
}

#[test]
fn invalid_requests_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let project = create_project(&conn, "Rules");
    let other = create_project(&conn, "Other");
    let service = schedule_service(&conn);
    let activity = service.add_activity(project.uuid, None, "Only").unwrap();
    let foreign = service.add_activity(other.uuid, None, "Foreign").unwrap();
    let task = add_task(&service, &activity, "Task", Some(1), 1);

    assert!(matches!(
        service.add_activity(project.uuid, None, "   "),
        Err(ScheduleServiceError::InvalidName)
    ));
    let missing = Uuid::new_v4();
    assert!(matches!(
        service.add_activity(missing, None, "Ghost"),
        Err(ScheduleServiceError::ProjectNotFound(id)) if id == missing
    ));
    assert!(matches!(
        service.add_activity(project.uuid, Some(missing), "Orphan"),
        Err(ScheduleServiceError::ParentNotFound(id)) if id == missing
    ));
    assert!(matches!(
        service.add_activity(project.uuid, Some(foreign.uuid), "Crossed"),
        Err(ScheduleServiceError::ActivityOutsideProject { .. })
    ));
    assert!(matches!(
        service.add_task(NewTask::new(project.uuid, foreign.uuid, "Crossed")),
        Err(ScheduleServiceError::ActivityOutsideProject { .. })
    ));
    assert!(matches!(
        service.add_task(NewTask::new(project.uuid, activity.uuid, "")),
        Err(ScheduleServiceError::InvalidName)
    ));
    assert!(matches!(
        service.reschedule_task(task.uuid, day(1), 0),
        Err(ScheduleServiceError::Validation(TaskValidationError::ZeroDuration))
    ));
    assert!(matches!(
        service.update_task_costs(task.uuid, Some(-5), None),
        Err(ScheduleServiceError::Validation(TaskValidationError::NegativeCost { .. }))
    ));
    assert!(matches!(
        service.set_predecessors(missing, &["1.1"]),
        Err(ScheduleServiceError::TaskNotFound(id)) if id == missing
    ));
    assert!(matches!(
        service.propagate(missing),
        Err(ScheduleServiceError::ProjectNotFound(_))
    ));
}

#[test]
fn propagate_is_idempotent_and_scoped_to_one_project() {
    let conn = open_db_in_memory().unwrap();
    let project = create_project(&conn, "Scoped");
    let other = create_project(&conn, "Untouched");
    let service = schedule_service(&conn);
    let activity = service.add_activity(project.uuid, None, "Only").unwrap();
    let other_activity = service.add_activity(other.uuid, None, "Only").unwrap();
    add_task(&service, &activity, "A", Some(1), 5);
    let b = add_task(&service, &activity, "B", Some(1), 1);
    let other_task = add_task(&service, &other_activity, "C", Some(1), 1);
    service.set_predecessors(b.uuid, &["1.1"]).unwrap();

    let again = service.propagate(project.uuid).unwrap();

    assert!(!again.has_changes());
    assert!(again.excluded.is_empty());
    assert_eq!(stored_task(&conn, b.uuid).start_date, Some(day(6)));
    assert_eq!(stored_task(&conn, other_task.uuid).start_date, Some(day(1)));
}

#[test]
fn deleted_project_rejects_schedule_writes_before_touching_storage() {
    let conn = open_db_in_memory().unwrap();
    let project = create_project(&conn, "Shelved");
    let service = schedule_service(&conn);
    let activity = service.add_activity(project.uuid, None, "Only").unwrap();
    let a = add_task(&service, &activity, "A", Some(1), 2);
    let b = add_task(&service, &activity, "B", Some(1), 1);

    ProjectService::new(SqliteProjectRepository::try_new(&conn).unwrap())
        .delete_project(project.uuid)
        .unwrap();

    let rejected = |result: Result<(), ScheduleServiceError>| {
        assert!(
            matches!(result, Err(ScheduleServiceError::ProjectNotFound(id)) if id == project.uuid)
        );
    };
    rejected(service.set_predecessors(b.uuid, &["1.1"]).map(|_| ()));
    rejected(service.set_successors(a.uuid, &["1.2"]).map(|_| ()));
    rejected(service.reschedule_task(a.uuid, day(10), 4).map(|_| ()));
    rejected(service.update_task_status(a.uuid, TaskStatus::Complete).map(|_| ()));
    rejected(service.update_task_costs(a.uuid, Some(100), None).map(|_| ()));
    rejected(service.rename_task(a.uuid, "Renamed").map(|_| ()));
    rejected(service.delete_task(a.uuid));
    rejected(service.delete_activity(activity.uuid));
    rejected(
        service
            .add_task(NewTask::new(project.uuid, activity.uuid, "Late"))
            .map(|_| ()),
    );

    let stored_a = stored_task(&conn, a.uuid);
    assert_eq!(stored_a.start_date, Some(day(1)));
    assert_eq!(stored_a.finish_date, Some(day(2)));
    assert_eq!(stored_a.name, "A");
    assert_eq!(stored_a.status, TaskStatus::NotStarted);
    assert_eq!(stored_a.budget_cents, None);
    assert!(stored_a.successors.is_empty());
    assert!(stored_task(&conn, b.uuid).predecessors.is_empty());

    let repo = SqliteScheduleRepository::try_new(&conn).unwrap();
    assert_eq!(repo.list_tasks(project.uuid).unwrap().len(), 2);
    assert!(repo.get_activity(activity.uuid, false).unwrap().is_some());
}
