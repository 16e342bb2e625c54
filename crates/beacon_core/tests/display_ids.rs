use beacon_core::{
    activity_rollup, display_id_of, resolve_display_id, resolve_display_ids, Activity,
    ActivityRollup, DisplayId, Task,
};
use chrono::NaiveDate;
use uuid::Uuid;

struct Plan {
    activities: Vec<Activity>,
    tasks: Vec<Task>,
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
}

/// Activity 1 holds task 1.1; activity 2 holds 2.1 and 2.2; activity 3 is
/// a child of 2 and holds 3.1.
fn plan() -> Plan {
    let project = Uuid::new_v4();
    let first = Activity::new(project, None, 1, "Site prep");
    let second = Activity::new(project, None, 2, "Framing");
    let nested = Activity::new(project, Some(second.uuid), 3, "Roof");

    let mut tasks = Vec::new();
    for (activity, number, start, duration, budget) in [
        (&first, 1, 1, 2, Some(10_000)),
        (&second, 1, 3, 3, Some(25_000)),
        (&second, 2, 6, 1, None),
        (&nested, 1, 7, 4, Some(5_000)),
    ] {
        let mut task = Task::new(project, activity.uuid, number, format!("task {number}"));
        task.duration_days = duration;
        task.schedule(day(start)).unwrap();
        task.budget_cents = budget;
        tasks.push(task);
    }

    Plan {
        activities: vec![first, second, nested],
        tasks,
    }
}

#[test]
fn typed_id_resolves_to_matching_task() {
    let plan = plan();
    let resolved = resolve_display_id("2.1", &plan.activities, &plan.tasks);
    assert_eq!(resolved, Some(plan.tasks[1].uuid));
}

#[test]
fn unknown_or_malformed_ids_do_not_resolve() {
    let plan = plan();
    for typed in ["2.9", "9.1", "2", "two.one", ""] {
        assert_eq!(
            resolve_display_id(typed, &plan.activities, &plan.tasks),
            None,
            "input `{typed}`"
        );
    }
}

#[test]
fn batch_resolution_splits_hits_and_misses() {
    let plan = plan();
    let resolution = resolve_display_ids(
        &[" 1.1", "2.2", "", "1.1", "4.4", "x"],
        &plan.activities,
        &plan.tasks,
    );

    assert_eq!(resolution.resolved, vec![plan.tasks[0].uuid, plan.tasks[2].uuid]);
    assert_eq!(resolution.unresolved, vec!["4.4".to_string(), "x".to_string()]);
}

#[test]
fn display_id_of_task_uses_activity_number() {
    let plan = plan();
    assert_eq!(
        display_id_of(&plan.tasks[3], &plan.activities),
        Some(DisplayId::new(3, 1))
    );
    assert_eq!(display_id_of(&plan.tasks[3], &[]), None);
}

#[test]
fn rollup_covers_nested_activities() {
    let plan = plan();
    let rollup = activity_rollup(plan.activities[1].uuid, &plan.activities, &plan.tasks);

    assert_eq!(
        rollup,
        ActivityRollup {
            start: Some(day(3)),
            finish: Some(day(10)),
            task_count: 3,
            budget_cents: Some(30_000),
            spent_cents: None,
        }
    );
}

#[test]
fn rollup_skips_deleted_tasks_and_activities() {
    let mut plan = plan();
    plan.activities[2].is_deleted = true;
    plan.tasks[2].is_deleted = true;

    let rollup = activity_rollup(plan.activities[1].uuid, &plan.activities, &plan.tasks);

    assert_eq!(rollup.task_count, 1);
    assert_eq!(rollup.finish, Some(day(5)));
}

#[test]
fn rollup_of_empty_activity_is_default() {
    let plan = plan();
    let rollup = activity_rollup(Uuid::new_v4(), &plan.activities, &plan.tasks);
    assert_eq!(rollup, ActivityRollup::default());
}
