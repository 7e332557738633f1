mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{build_graph, position, recording_engine};
use gatedag::engine::{
    Engine, EngineOptions, ExecutionNotifier, ProgressPrinter, RunStats, Scheduler,
};
use gatedag::errors::{ConfigError, GatedagError};
use gatedag::pool::{TokioPool, WorkerPool};
use gatedag::task::{PRE_PHASE_TASK, from_fn};
use gatedag::types::TaskState;
use gatedag_test_utils::builders::{TaskBuilder, TaskSetBuilder};
use gatedag_test_utils::probes::{ExecutionLog, Notification, RecordingNotifier};
use gatedag_test_utils::{init_tracing, with_timeout};

#[tokio::test]
async fn test_independent_roots_are_both_submitted() {
    init_tracing();

    let log = ExecutionLog::new();
    let tasks = TaskSetBuilder::new()
        .with_task(TaskBuilder::new("A").work(log.work("A")).build())
        .with_task(TaskBuilder::new("B").work(log.work("B")).build())
        .build();
    let (engine, factory) = recording_engine(tasks, 2, false);

    with_timeout(engine.execute(&["A", "B"])).await.unwrap();

    assert_eq!(factory.submitted(), vec!["A", "B"]);
    assert_eq!(factory.pools_created(), vec![2, 2]);
    assert_eq!(log.finished(), vec!["A", "B"]);
}

#[tokio::test]
async fn test_dependent_submitted_only_after_dependencies_complete() {
    init_tracing();

    let log = ExecutionLog::new();
    let tasks = TaskSetBuilder::new()
        .with_task(TaskBuilder::new("A").work(log.work("A")).build())
        .with_task(
            TaskBuilder::new("B")
                .work(log.work_with_delay("B", Duration::from_millis(20)))
                .build(),
        )
        .with_task(
            TaskBuilder::new("C")
                .after("A")
                .after("B")
                .work(log.work("C"))
                .build(),
        )
        .build();
    let (engine, factory) = recording_engine(tasks, 4, false);

    with_timeout(engine.execute(&["C"])).await.unwrap();

    let submitted = factory.submitted();
    assert_eq!(submitted.len(), 3);
    assert_eq!(position(&submitted, "C"), 2);
    assert!(log.finished_before_started("A", "C"));
    assert!(log.finished_before_started("B", "C"));
}

#[tokio::test]
async fn test_diamond_runs_shared_dependency_once() {
    init_tracing();

    let log = ExecutionLog::new();
    let tasks = TaskSetBuilder::new()
        .with_task(TaskBuilder::new("A").work(log.work("A")).build())
        .with_task(TaskBuilder::new("B").after("A").work(log.work("B")).build())
        .with_task(TaskBuilder::new("C").after("A").work(log.work("C")).build())
        .with_task(TaskBuilder::new("D").after("B").after("C").work(log.work("D")).build())
        .build();
    let (engine, factory) = recording_engine(tasks, 3, false);

    with_timeout(engine.execute(&["D"])).await.unwrap();

    let mut submitted = factory.submitted();
    submitted.sort();
    assert_eq!(submitted, vec!["A", "B", "C", "D"]);
    assert_eq!(log.started().iter().filter(|n| *n == "A").count(), 1);
    assert_eq!(log.finished().last().map(String::as_str), Some("D"));
}

#[tokio::test]
async fn test_pool_size_bounds_concurrency() {
    init_tracing();

    let log = ExecutionLog::new();
    let mut builder = TaskSetBuilder::new();
    let mut leaves = Vec::new();
    for i in 0..6 {
        let name = format!("leaf{i}");
        builder = builder.with_task(
            TaskBuilder::new(&name)
                .work(log.work_with_delay(&name, Duration::from_millis(15)))
                .build(),
        );
        leaves.push(name);
    }
    let leaf_refs: Vec<&str> = leaves.iter().map(String::as_str).collect();
    let tasks = builder.with_group("all", &leaf_refs).build();
    let (engine, _) = recording_engine(tasks, 2, false);

    with_timeout(engine.execute(&["all"])).await.unwrap();

    assert_eq!(log.finished().len(), 6);
    assert!(log.max_concurrency() <= 2, "ran {} at once", log.max_concurrency());
}

#[tokio::test]
async fn test_failed_task_blocks_its_dependents() {
    init_tracing();

    let log = ExecutionLog::new();
    let tasks = TaskSetBuilder::new()
        .with_task(TaskBuilder::new("A").work(log.failing_work("A", "boom")).build())
        .with_task(TaskBuilder::new("B").after("A").work(log.work("B")).build())
        .build();
    let (engine, factory) = recording_engine(tasks, 2, false);

    let err = with_timeout(engine.execute(&["B"])).await.unwrap_err();

    match &err {
        GatedagError::TaskFailed { task, error } => {
            assert_eq!(task, "A");
            assert_eq!(error.to_string(), "boom");
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }
    assert_eq!(factory.submitted(), vec!["A"]);
    assert!(!log.ran("B"));
}

#[tokio::test]
async fn test_independent_branch_still_runs_after_failure() {
    init_tracing();

    let log = ExecutionLog::new();
    let tasks = TaskSetBuilder::new()
        .with_task(TaskBuilder::new("bad").work(log.failing_work("bad", "nope")).build())
        .with_task(
            TaskBuilder::new("slow")
                .work(log.work_with_delay("slow", Duration::from_millis(20)))
                .build(),
        )
        .with_task(TaskBuilder::new("after_slow").after("slow").work(log.work("after_slow")).build())
        .with_group("all", &["bad", "after_slow"])
        .build();
    let (engine, _) = recording_engine(tasks, 2, false);

    let err = with_timeout(engine.execute(&["all"])).await.unwrap_err();

    assert_eq!(err.failed_task(), Some("bad"));
    assert!(log.finished().contains(&"after_slow".to_string()));
}

#[tokio::test]
async fn test_first_failure_stops_remaining_roots() {
    init_tracing();

    let log = ExecutionLog::new();
    let tasks = TaskSetBuilder::new()
        .with_task(TaskBuilder::new("A").work(log.failing_work("A", "A broke")).build())
        .with_task(TaskBuilder::new("C").work(log.work("C")).build())
        .build();
    let (engine, factory) = recording_engine(tasks, 2, false);

    let err = with_timeout(engine.execute(&["A", "C"])).await.unwrap_err();

    assert_eq!(err.failed_task(), Some("A"));
    assert_eq!(factory.submitted(), vec!["A"]);
    assert!(!log.ran("C"));
}

#[tokio::test]
async fn test_keep_going_runs_remaining_roots_and_reports_first_error() {
    init_tracing();

    let log = ExecutionLog::new();
    let tasks = TaskSetBuilder::new()
        .with_task(TaskBuilder::new("A").work(log.failing_work("A", "A broke")).build())
        .with_task(TaskBuilder::new("B").work(log.failing_work("B", "B broke")).build())
        .with_task(TaskBuilder::new("C").work(log.work("C")).build())
        .build();
    let (engine, factory) = recording_engine(tasks, 2, true);

    let err = with_timeout(engine.execute(&["A", "C", "B"])).await.unwrap_err();

    assert_eq!(err.failed_task(), Some("A"));
    assert!(err.to_string().contains("A broke"));
    assert_eq!(factory.submitted(), vec!["A", "C", "B"]);
    assert_eq!(log.finished(), vec!["C"]);
}

#[tokio::test]
async fn test_panicking_work_is_reported_as_failure() {
    init_tracing();

    let log = ExecutionLog::new();
    let tasks = TaskSetBuilder::new()
        .with_task(TaskBuilder::new("A").work(log.panicking_work("A")).build())
        .with_task(TaskBuilder::new("B").after("A").work(log.work("B")).build())
        .build();
    let notifier = RecordingNotifier::new();
    let (engine, _) = recording_engine(tasks, 1, false);
    let engine = engine.with_observer(Arc::new(notifier.clone()));

    let err = with_timeout(engine.execute(&["B"])).await.unwrap_err();

    assert_eq!(err.failed_task(), Some("A"));
    assert!(!log.ran("B"));
    let seen = notifier.for_task("A");
    assert_eq!(seen.first(), Some(&Notification::Starting("A".to_string())));
    assert_eq!(seen.last(), Some(&Notification::Complete("A".to_string())));
    assert!(matches!(seen[1], Notification::Failed(..)));
}

#[tokio::test]
async fn test_blocking_closures_run_as_work() {
    init_tracing();

    let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let work = {
        let counter = Arc::clone(&counter);
        from_fn(move || {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        })
    };
    let tasks = TaskSetBuilder::new()
        .with_task(TaskBuilder::new("count").work(work).build())
        .with_group("all", &["count"])
        .build();
    let engine = Engine::new(tasks, EngineOptions::default());

    with_timeout(engine.execute(&["all", "count"])).await.unwrap();

    // Each root gets a fresh graph, so `count` runs once per root.
    assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_observers_see_every_task_start_and_complete() {
    init_tracing();

    let log = ExecutionLog::new();
    let tasks = TaskSetBuilder::new()
        .with_task(TaskBuilder::new("A").work(log.work("A")).build())
        .with_task(TaskBuilder::new("B").after("A").work(log.work("B")).build())
        .with_group("all", &["B"])
        .build();
    let notifier = RecordingNotifier::new();
    let (engine, _) = recording_engine(tasks, 2, false);
    let engine = engine.with_observer(Arc::new(notifier.clone()));

    with_timeout(engine.execute(&["all"])).await.unwrap();

    for task in ["A", "B", "all"] {
        assert_eq!(
            notifier.for_task(task),
            vec![
                Notification::Starting(task.to_string()),
                Notification::Complete(task.to_string()),
            ]
        );
    }
}

#[tokio::test]
async fn test_scheduler_counts_and_final_states() {
    init_tracing();

    let log = ExecutionLog::new();
    let tasks = TaskSetBuilder::new()
        .with_task(TaskBuilder::new("A").work(log.work("A")).build())
        .with_task(TaskBuilder::new("B").after("A").work(log.work("B")).build())
        .with_group("C", &["A", "B"])
        .build();
    let graph = build_graph(tasks, "C");
    let root = graph.root().unwrap();
    let pool: Arc<dyn WorkerPool> = Arc::new(TokioPool::new(2));

    let scheduler = Scheduler::new(graph, root, Arc::clone(&pool), Vec::new());
    assert_eq!(scheduler.root(), "C");
    scheduler.start();
    with_timeout(pool.await_termination()).await;

    let stats = scheduler.finish().unwrap();
    assert_eq!(
        stats,
        RunStats {
            queued: 3,
            started: 3,
            finished: 3,
            failed: 0,
        }
    );
    for task in ["A", "B", "C"] {
        assert_eq!(scheduler.state_of(task), Some(TaskState::Complete));
    }
    assert!(pool.is_shutdown());
}

#[tokio::test]
async fn test_reserved_root_is_rejected() {
    let tasks = TaskSetBuilder::new()
        .with_group("A", &[])
        .with_pre_phase(&["A"])
        .build();
    let (engine, factory) = recording_engine(tasks, 1, false);

    let err = with_timeout(engine.execute(&[PRE_PHASE_TASK])).await.unwrap_err();

    assert_eq!(
        err.as_config(),
        Some(&ConfigError::CannotExecuteReservedTask(PRE_PHASE_TASK.to_string()))
    );
    assert!(factory.submitted().is_empty());
}

#[tokio::test]
async fn test_reserved_root_follows_keep_going_policy() {
    let log = ExecutionLog::new();
    let tasks = TaskSetBuilder::new()
        .with_task(TaskBuilder::new("A").work(log.work("A")).build())
        .with_pre_phase(&["A"])
        .build();
    let (engine, _) = recording_engine(tasks, 1, true);

    let err = with_timeout(engine.execute(&[PRE_PHASE_TASK, "A"])).await.unwrap_err();

    assert!(matches!(
        err.as_config(),
        Some(ConfigError::CannotExecuteReservedTask(_))
    ));
    assert_eq!(log.finished(), vec!["A"]);
}

#[tokio::test]
async fn test_reserved_namespace_misuse_is_rejected() {
    let log = ExecutionLog::new();

    let unknown = TaskSetBuilder::new()
        .with_group("A", &[])
        .with_group("gatedag:post-phase", &["A"])
        .build();
    let with_work = TaskSetBuilder::new()
        .with_group("A", &[])
        .with_task(
            TaskBuilder::new(PRE_PHASE_TASK)
                .after("A")
                .work(log.work(PRE_PHASE_TASK))
                .build(),
        )
        .build();
    let depends_on_reserved = TaskSetBuilder::new()
        .with_group("A", &[])
        .with_group("B", &[PRE_PHASE_TASK])
        .with_pre_phase(&["A"])
        .build();

    let cases = [
        (
            unknown,
            ConfigError::UnknownReservedTask("gatedag:post-phase".to_string()),
        ),
        (
            with_work,
            ConfigError::ReservedTaskHasWork(PRE_PHASE_TASK.to_string()),
        ),
        (
            depends_on_reserved,
            ConfigError::DependsOnReservedTask {
                task: "B".to_string(),
                dependency: PRE_PHASE_TASK.to_string(),
            },
        ),
    ];

    for (tasks, expected) in cases {
        let (engine, factory) = recording_engine(tasks, 1, true);
        let err = with_timeout(engine.execute(&["A"])).await.unwrap_err();
        assert_eq!(err.as_config(), Some(&expected));
        assert!(factory.pools_created().is_empty());
    }
    assert!(!log.ran(PRE_PHASE_TASK));
}

#[tokio::test]
async fn test_unknown_root_and_cycles_are_rejected_before_running() {
    let tasks = TaskSetBuilder::new()
        .with_group("A", &["B"])
        .with_group("B", &["A"])
        .with_group("C", &[])
        .build();
    let (engine, factory) = recording_engine(tasks, 1, false);

    let err = with_timeout(engine.execute(&["C"])).await.unwrap_err();
    assert!(matches!(err.as_config(), Some(ConfigError::DependencyCycle(_))));

    let err = with_timeout(engine.execute(&["missing"])).await.unwrap_err();
    assert_eq!(
        err.as_config(),
        Some(&ConfigError::UnknownTask("missing".to_string()))
    );

    assert!(factory.pools_created().is_empty());
}

#[tokio::test]
async fn test_zero_threads_is_a_config_error() {
    let tasks = TaskSetBuilder::new().with_group("A", &[]).build();
    let (engine, _) = recording_engine(tasks, 0, false);

    let err = with_timeout(engine.execute(&["A"])).await.unwrap_err();
    assert!(matches!(err.as_config(), Some(ConfigError::Invalid(_))));
}

#[test]
fn test_plan_builds_graph_without_running() {
    let log = ExecutionLog::new();
    let tasks = TaskSetBuilder::new()
        .with_task(TaskBuilder::new("A").work(log.work("A")).build())
        .with_task(TaskBuilder::new("B").after("A").work(log.work("B")).build())
        .build();
    let (engine, factory) = recording_engine(tasks, 1, false);

    let graph = engine.plan("B").unwrap();

    assert_eq!(graph.len(), 2);
    assert!(graph.nodes().all(|(_, node)| node.state() == TaskState::Waiting));
    assert!(factory.pools_created().is_empty());
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn test_progress_lines_follow_dependency_order() {
    init_tracing();

    for _ in 0..20 {
        let log = ExecutionLog::new();
        let tasks = TaskSetBuilder::new()
            .with_task(TaskBuilder::new("A").work(log.work_with_delay("A", Duration::ZERO)).build())
            .with_task(TaskBuilder::new("B").after("A").work(log.work_with_delay("B", Duration::ZERO)).build())
            .with_group("C", &["B"])
            .build();
        let printer = Arc::new(ProgressPrinter::new(Vec::<u8>::new()));
        let observer: Arc<dyn ExecutionNotifier> = printer.clone();
        let (engine, _) = recording_engine(tasks, 4, false);
        let engine = engine.with_observer(observer);

        with_timeout(engine.execute(&["C"])).await.unwrap();

        let out = String::from_utf8(printer.output()).unwrap();
        assert_eq!(out, "+ A\n- A\n+ B\n- B\n+ C\n- C\n");
    }
}

#[tokio::test]
async fn test_observers_see_completion_before_dependents_start() {
    init_tracing();

    for _ in 0..20 {
        let log = ExecutionLog::new();
        let tasks = TaskSetBuilder::new()
            .with_task(TaskBuilder::new("A").work(log.work_with_delay("A", Duration::ZERO)).build())
            .with_task(TaskBuilder::new("B").after("A").work(log.work_with_delay("B", Duration::ZERO)).build())
            .with_task(TaskBuilder::new("C").after("A").work(log.work_with_delay("C", Duration::ZERO)).build())
            .with_group("D", &["B", "C"])
            .build();
        let notifier = RecordingNotifier::new();
        let (engine, _) = recording_engine(tasks, 4, false);
        let engine = engine.with_observer(Arc::new(notifier.clone()));

        with_timeout(engine.execute(&["D"])).await.unwrap();

        let seen = notifier.notifications();
        let at = |n: Notification| {
            seen.iter()
                .position(|s| *s == n)
                .unwrap_or_else(|| panic!("{n:?} missing from {seen:?}"))
        };
        let complete = |t: &str| at(Notification::Complete(t.to_string()));
        let starting = |t: &str| at(Notification::Starting(t.to_string()));

        assert!(complete("A") < starting("B"));
        assert!(complete("A") < starting("C"));
        assert!(complete("B") < starting("D"));
        assert!(complete("C") < starting("D"));
    }
}
