use roster_sync::domain::model::{NewClass, NewStudent};
use roster_sync::utils::validation::Validate;
use roster_sync::{
    parse_roster_csv, ClassStore, ErrorKind, MemoryGateway, RosterError, Status, StudentStore,
};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn history_class() -> NewClass {
    NewClass {
        name: "History 101".to_string(),
        grade_level: "12".to_string(),
        subject: "History".to_string(),
        academic_year: Some("2024-2025".to_string()),
    }
}

#[tokio::test]
async fn test_class_to_roster_flow() {
    let gateway = Arc::new(MemoryGateway::new());
    let classes = ClassStore::new(Arc::clone(&gateway), "teacher-1", TIMEOUT);

    let input = history_class();
    tokio_test::assert_ok!(input.validate());
    let class = classes.create(&input).await.unwrap();

    let students = StudentStore::new(Arc::clone(&gateway), class.id.clone(), TIMEOUT);
    students.fetch().await.unwrap();
    assert_eq!(students.state().status, Status::Ready);
    assert!(students.state().is_empty());

    let csv = "Name,Email,Student ID\n\
               Maria Garcia,maria@school.edu,1001\n\
               ,nobody@school.edu,1002\n\
               James Chen,,1003\n";
    let summary = students.import_csv(csv).await.unwrap();
    assert_eq!(summary.inserted.len(), 2);
    assert_eq!(summary.skipped_lines, vec![3]);

    let added = students
        .add_student(&NewStudent::from_form(&class.id, "Test Student", "test@student.com", ""))
        .await
        .unwrap();
    assert_eq!(students.state().entities.last().unwrap().id, added.id);

    // a fresh view of the same class sees everything, sorted by name
    let reopened = StudentStore::new(Arc::clone(&gateway), class.id.clone(), TIMEOUT);
    let listed = reopened.fetch().await.unwrap();
    let names: Vec<&str> = listed.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["James Chen", "Maria Garcia", "Test Student"]);
}

#[tokio::test]
async fn test_duplicate_student_email_is_reported_as_conflict() {
    let gateway = Arc::new(MemoryGateway::new());
    let classes = ClassStore::new(Arc::clone(&gateway), "teacher-1", TIMEOUT);
    let class = classes.create(&history_class()).await.unwrap();
    let students = StudentStore::new(Arc::clone(&gateway), class.id.clone(), TIMEOUT);

    students
        .add_student(&NewStudent::from_form(&class.id, "Test Student", "test@student.com", ""))
        .await
        .unwrap();
    let len_before = students.state().len();

    let err = students
        .add_student(&NewStudent::from_form(&class.id, "Another Student", "test@student.com", ""))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    assert!(err.user_friendly_message().contains("already exists"));
    assert_eq!(students.state().len(), len_before);

    // the store recovers on the next successful operation
    students
        .add_student(&NewStudent::from_form(&class.id, "Another Student", "another@student.com", ""))
        .await
        .unwrap();
    let state = students.state();
    assert_eq!(state.status, Status::Ready);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_header_only_csv_means_nothing_to_import() {
    let parsed = parse_roster_csv("class-1", "Name,Email,StudentID");
    assert!(parsed.is_empty());
    let err = tokio_test::assert_err!(parsed.into_candidates());
    assert_eq!(err, RosterError::NoValidRows);

    let gateway = Arc::new(MemoryGateway::new());
    let students = StudentStore::new(Arc::clone(&gateway), "class-1", TIMEOUT);
    let err = students.import_csv("Name,Email,StudentID").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoValidRows);
    assert_eq!(gateway.row_count(roster_sync::domain::ports::Table::Students).await, 0);
}

#[tokio::test]
async fn test_deleting_class_drops_it_from_dashboard_list() {
    let gateway = Arc::new(MemoryGateway::new());
    let classes = ClassStore::new(Arc::clone(&gateway), "teacher-1", TIMEOUT);
    let first = classes.create(&history_class()).await.unwrap();
    let mut second_input = history_class();
    second_input.name = "History 102".to_string();
    let second = classes.create(&second_input).await.unwrap();

    let listed: Vec<String> = classes.state().entities.iter().map(|c| c.id.clone()).collect();
    assert_eq!(listed, vec![second.id.clone(), first.id.clone()]);

    classes.delete(&second.id).await.unwrap();
    classes.fetch().await.unwrap();
    let listed: Vec<String> = classes.state().entities.iter().map(|c| c.id.clone()).collect();
    assert_eq!(listed, vec![first.id]);
}
