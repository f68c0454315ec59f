use chrono::{DateTime, Duration, Utc};
use services::{AppServices, Clock, ProgressError, SessionQuery};
use storage::repository::Storage;
use tactile_core::model::{Shape, StudentProfile};
use tactile_core::stats::StudentStatus;
use tactile_core::time::fixed_now;

async fn seeded() -> AppServices {
    let services = AppServices::in_memory(Clock::fixed(fixed_now()));
    let students = services.students();
    students
        .register("STU1", StudentProfile::new("Ana", "Lee"))
        .await
        .unwrap();
    students
        .register("STU2", StudentProfile::new("Ben", "Ode"))
        .await
        .unwrap();
    services
}

fn at(storage: &Storage, now: DateTime<Utc>) -> AppServices {
    AppServices::from_storage(storage, Clock::fixed(now))
}

#[tokio::test]
async fn two_of_three_correct_reports_needs_attention() {
    let services = seeded().await;
    services
        .learning()
        .record("STU1", "circle", "Run a finger around the edge.")
        .await
        .unwrap();
    let assessments = services.assessments();
    for outcome in ["Correct", "Correct", "Incorrect"] {
        assessments
            .record_question("STU1", "Which shape is this?", "circle", outcome)
            .await
            .unwrap();
    }

    let progress = services.progress();
    let status = progress.student_status("STU1").await.unwrap();
    assert_eq!(status.average_score, 67);
    assert_eq!(status.status, StudentStatus::NeedsAttention);
    assert_eq!(status.total_sessions, 1);

    let summary = progress.student_summary("STU1", None).await.unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].questions_asked, 3);
    assert_eq!(summary[0].correct_answers, 2);
    assert_eq!(summary[0].accuracy, 67);

    let breakdown = progress.shape_progress("STU1").await.unwrap();
    let shapes = breakdown.as_slice();
    assert_eq!(shapes.len(), 4);
    assert_eq!(shapes[0].shape, Shape::Circle);
    assert_eq!(shapes[0].sessions, 1);
    assert_eq!(shapes[0].progress, 67);
    assert!(shapes[1..].iter().all(|p| p.sessions == 0 && p.progress == 0));
}

#[tokio::test]
async fn unknown_student_aggregates_to_zero_but_detail_is_not_found() {
    let services = seeded().await;
    let progress = services.progress();

    let status = progress.student_status("GHOST").await.unwrap();
    assert_eq!(status.average_score, 0);
    assert_eq!(status.total_sessions, 0);
    assert!(progress.student_summary("GHOST", None).await.unwrap().is_empty());

    assert!(matches!(
        progress.student_detail("GHOST").await,
        Err(ProgressError::StudentNotFound(_))
    ));
}

#[tokio::test]
async fn detail_of_new_student_has_zero_metrics() {
    let services = seeded().await;
    let detail = services.progress().student_detail("STU2").await.unwrap();
    assert_eq!(detail.student.first_name, "Ben");
    assert_eq!(detail.metrics.total_sessions, 0);
    assert_eq!(detail.metrics.average_score, 0);
    assert_eq!(detail.shape_progress.as_slice().len(), 4);
    assert!(detail.recent_sessions.is_empty());

    let json = serde_json::to_value(&detail).unwrap();
    assert_eq!(json["student_id"], "STU2");
    assert_eq!(json["total_sessions"], 0);
    assert_eq!(json["average_score"], 0);
    assert_eq!(json["status"], "needs_attention");
}

#[tokio::test]
async fn session_listing_filters_and_limits() {
    let services = seeded().await;
    let learning = services.learning();
    learning.record("STU1", "circle", "First.").await.unwrap();
    learning.record("STU1", "square", "Second.").await.unwrap();
    learning.record("STU1", "circle", "Third.").await.unwrap();
    learning.record("STU2", "circle", "Other.").await.unwrap();

    let rows = services
        .progress()
        .list_sessions(SessionQuery {
            student_id: Some("STU1".into()),
            shape: Some("circle".into()),
            limit: Some(1),
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].explanation, "Third.");

    let all = services
        .progress()
        .list_sessions(SessionQuery::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 4);

    assert!(matches!(
        services
            .progress()
            .list_sessions(SessionQuery {
                shape: Some("hexagon".into()),
                ..SessionQuery::default()
            })
            .await,
        Err(ProgressError::Shape(_))
    ));
}

#[tokio::test]
async fn list_students_sorts_by_score() {
    let services = seeded().await;
    let assessments = services.assessments();
    assessments
        .record_question("STU2", "Q", "square", "Correct")
        .await
        .unwrap();
    assessments
        .record_question("STU1", "Q", "square", "Incorrect")
        .await
        .unwrap();

    let progress = services.progress();
    let by_score = progress.list_students("score").await.unwrap();
    assert_eq!(by_score[0].student_id.as_str(), "STU2");
    assert_eq!(by_score[0].metrics.status, StudentStatus::Excellent);

    let by_name = progress.list_students("name").await.unwrap();
    assert_eq!(by_name[0].first_name, "Ana");

    assert!(matches!(
        progress.list_students("shuffle").await,
        Err(ProgressError::InvalidSort(_))
    ));
}

#[tokio::test]
async fn overview_report_counts_window_activity() {
    let services = seeded().await;
    services
        .learning()
        .record("STU1", "triangle", "Three corners.")
        .await
        .unwrap();
    let assessments = services.assessments();
    for outcome in ["Correct", "Correct", "Correct", "Incorrect"] {
        assessments
            .record_question("STU1", "Q", "triangle", outcome)
            .await
            .unwrap();
    }

    let report = services.progress().overview_report("week").await.unwrap();
    assert_eq!(report.total_students, 2);
    assert_eq!(report.active_students, 1);
    assert_eq!(report.total_sessions, 1);
    assert_eq!(report.average_score, 75);
    assert_eq!(report.since, fixed_now() - Duration::days(7));

    let triangle = report
        .shape_analytics
        .iter()
        .find(|a| a.shape == Shape::Triangle)
        .unwrap();
    assert_eq!(triangle.total_interactions, 1);
    assert_eq!(triangle.avg_score, 75);
    assert_eq!(report.student_performance.len(), 1);
    assert_eq!(report.student_performance[0].student_name, "Ana Lee");

    assert!(matches!(
        services.progress().overview_report("decade").await,
        Err(ProgressError::InvalidPeriod(_))
    ));
}

#[tokio::test]
async fn week_report_tallies_the_whole_first_day() {
    let storage = Storage::in_memory();
    let since = fixed_now() - Duration::days(7);
    at(&storage, since - Duration::days(1))
        .students()
        .register("STU1", StudentProfile::new("Ana", "Lee"))
        .await
        .unwrap();
    at(&storage, since - Duration::hours(1))
        .assessments()
        .record_question("STU1", "Which shape is this?", "circle", "Correct")
        .await
        .unwrap();
    at(&storage, since + Duration::hours(1))
        .learning()
        .record("STU1", "circle", "Round all the way.")
        .await
        .unwrap();

    let now = at(&storage, fixed_now());
    let summary = now.progress().student_summary("STU1", None).await.unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].accuracy, 100);

    let report = now.progress().overview_report("week").await.unwrap();
    assert_eq!(report.since, since);
    assert_eq!(report.total_sessions, 1);
    let circle = report
        .shape_analytics
        .iter()
        .find(|a| a.shape == Shape::Circle)
        .unwrap();
    assert_eq!(circle.avg_score, summary[0].accuracy);
    assert_eq!(report.student_performance.len(), 1);
    assert_eq!(report.student_performance[0].avg_score, 100);
}

#[tokio::test]
async fn cohort_listing_joins_answers_from_earlier_that_day() {
    let storage = Storage::in_memory();
    let morning = fixed_now() - Duration::days(2);
    let services = at(&storage, morning);
    for (id, first) in [("STU1", "Ana"), ("STU2", "Ben")] {
        services
            .students()
            .register(id, StudentProfile::new(first, "Lee"))
            .await
            .unwrap();
    }
    for outcome in ["Correct", "Incorrect"] {
        services
            .assessments()
            .record_question("STU1", "Q", "square", outcome)
            .await
            .unwrap();
    }
    at(&storage, morning + Duration::hours(2))
        .learning()
        .record("STU1", "square", "Four equal sides.")
        .await
        .unwrap();
    at(&storage, fixed_now())
        .learning()
        .record("STU2", "circle", "No corners.")
        .await
        .unwrap();

    let rows = at(&storage, fixed_now())
        .progress()
        .list_sessions(SessionQuery::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].student_id.as_str(), "STU2");
    assert_eq!(rows[0].questions_asked, 0);
    assert_eq!(rows[1].questions_asked, 2);
    assert_eq!(rows[1].accuracy, 50);

    let empty = at(&storage, fixed_now())
        .progress()
        .list_sessions(SessionQuery {
            shape: Some("triangle".into()),
            ..SessionQuery::default()
        })
        .await
        .unwrap();
    assert!(empty.is_empty());
}
