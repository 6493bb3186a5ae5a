mod common;

use std::sync::Arc;

use attendance_backend::error::Error;
use attendance_backend::models::user::{Category, UserStatus};
use attendance_backend::models::work_session::{CheckInOutcome, CheckOutOutcome, Coordinates};
use chrono::NaiveDate;
use common::{approved_user, registration, state, utc, ADMIN_ID};
use tokio::sync::Barrier;

fn march(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

#[tokio::test]
async fn full_shift_is_510_minutes() {
    let state = state();
    approved_user(&state, 42, "Ivan", Category::Kitchen).await;
    let sessions = &state.session_service;

    // 09:00 and 17:30 local at UTC+3.
    let started = sessions.check_in(42, utc(6, 0), None).await.unwrap();
    let CheckInOutcome::Started(open) = started else {
        panic!("expected a new session");
    };
    assert_eq!(open.date, march(10));

    let again = sessions.check_in(42, utc(7, 0), None).await.unwrap();
    assert_eq!(again, CheckInOutcome::AlreadyOpen(open.clone()));

    let office = Coordinates::new(55.7539, 37.6208).unwrap();
    match sessions.check_out(42, utc(14, 30), Some(office)).await.unwrap() {
        CheckOutOutcome::Closed {
            session,
            duration_minutes,
        } => {
            assert_eq!(duration_minutes, 510);
            assert_eq!(session.id, open.id);
            assert_eq!(session.duration_minutes, Some(510));
            assert_eq!(session.check_out_location(), Some(office));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    assert_eq!(
        sessions.check_out(42, utc(15, 0), None).await.unwrap(),
        CheckOutOutcome::NoOpenSession
    );
}

#[tokio::test]
async fn check_out_without_check_in_has_nothing_to_close() {
    let state = state();
    approved_user(&state, 7, "Olga", Category::Hall).await;

    let outcome = state
        .session_service
        .check_out(7, utc(14, 0), None)
        .await
        .unwrap();
    assert_eq!(outcome, CheckOutOutcome::NoOpenSession);
    assert!(state
        .session_service
        .history(7, march(1))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn checkout_before_checkin_leaves_session_open() {
    let state = state();
    state
        .user_service
        .register(registration(9, "Pavel", Category::Bar), utc(0, 0))
        .await
        .unwrap();
    let sessions = &state.session_service;

    // Manual entries: in at 09:00 local, out at 08:00 local.
    let started = sessions.manual_check_in(9, utc(6, 0)).await.unwrap();
    assert!(matches!(started, CheckInOutcome::Started(_)));

    let outcome = sessions.manual_check_out(9, utc(5, 0)).await.unwrap();
    assert_eq!(
        outcome,
        CheckOutOutcome::CheckoutBeforeCheckin {
            check_in: utc(6, 0)
        }
    );

    let today = sessions.today_session(9, march(10)).await.unwrap().unwrap();
    assert!(today.is_open());
    assert_eq!(today.duration_minutes, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_check_ins_open_exactly_one_session() {
    let state = state();
    approved_user(&state, 42, "Ivan", Category::Kitchen).await;

    let barrier = Arc::new(Barrier::new(16));
    let mut handles = Vec::new();
    for i in 0..16 {
        let sessions = state.session_service.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            sessions.check_in(42, utc(6, i), None).await
        }));
    }

    let mut started = 0;
    let mut already_open = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            CheckInOutcome::Started(_) => started += 1,
            CheckInOutcome::AlreadyOpen(_) => already_open += 1,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
    assert_eq!(started, 1);
    assert_eq!(already_open, 15);

    let history = state.session_service.history(42, march(10)).await.unwrap();
    assert_eq!(history.iter().filter(|s| s.is_open()).count(), 1);
}

#[tokio::test]
async fn split_shift_opens_a_second_session_after_closing() {
    let state = state();
    approved_user(&state, 42, "Ivan", Category::Kitchen).await;
    let sessions = &state.session_service;

    sessions.check_in(42, utc(6, 0), None).await.unwrap();
    sessions.check_out(42, utc(9, 0), None).await.unwrap();
    let second = sessions.check_in(42, utc(11, 0), None).await.unwrap();
    assert!(matches!(second, CheckInOutcome::Started(_)));

    let today = sessions.today_session(42, march(10)).await.unwrap().unwrap();
    assert!(today.is_open());
    assert_eq!(today.check_in_time, utc(11, 0));

    let history = sessions.history(42, march(10)).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].check_in_time, utc(11, 0));
}

#[tokio::test]
async fn reads_are_idempotent() {
    let state = state();
    approved_user(&state, 42, "Ivan", Category::Kitchen).await;
    state
        .session_service
        .check_in(42, utc(6, 0), None)
        .await
        .unwrap();

    let first = state.user_service.status_of(42).await.unwrap();
    let second = state.user_service.status_of(42).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, UserStatus::Approved);

    let a = state.session_service.today_session(42, march(10)).await.unwrap();
    let b = state.session_service.today_session(42, march(10)).await.unwrap();
    assert_eq!(a, b);

    assert_eq!(state.user_service.status_of(1000).await.unwrap(), UserStatus::New);
}

#[tokio::test]
async fn session_operations_are_gated_by_status() {
    let state = state();

    let err = state
        .session_service
        .check_in(5, utc(6, 0), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UserNotFound(5)));

    state
        .user_service
        .register(registration(5, "Nina", Category::Hall), utc(0, 0))
        .await
        .unwrap();
    let err = state
        .session_service
        .check_in(5, utc(6, 0), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::NotApproved {
            status: UserStatus::Pending,
            ..
        }
    ));
}

#[tokio::test]
async fn geofence_checks_in_at_the_office_only() {
    let state = state();
    approved_user(&state, 42, "Ivan", Category::Kitchen).await;
    let sessions = &state.session_service;

    // About 500 m north of the office.
    let far = Coordinates::new(55.7539 + 0.0045, 37.6208).unwrap();
    let outcome = sessions.check_in_at_location(42, utc(6, 0), far).await.unwrap();
    assert!(matches!(
        outcome,
        CheckInOutcome::OutsideGeofence { distance_meters, .. } if distance_meters > 100.0
    ));
    assert!(sessions.today_session(42, march(10)).await.unwrap().is_none());

    let office = Coordinates::new(55.7539, 37.6208).unwrap();
    let outcome = sessions
        .check_in_at_location(42, utc(6, 1), office)
        .await
        .unwrap();
    let CheckInOutcome::Started(session) = outcome else {
        panic!("expected a new session");
    };
    assert_eq!(session.check_in_location(), Some(office));
}

#[tokio::test]
async fn user_lifecycle_follows_the_state_machine() {
    let state = state();
    let users = &state.user_service;
    users
        .register(registration(3, "Lena", Category::DishWash), utc(0, 0))
        .await
        .unwrap();

    let err = users.archive(3, ADMIN_ID, utc(1, 0)).await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidTransition {
            from: UserStatus::Pending,
            to: UserStatus::Archived,
            ..
        }
    ));

    users.reject(3, ADMIN_ID, utc(1, 0)).await.unwrap();
    let approved = users.approve(3, ADMIN_ID, utc(2, 0)).await.unwrap();
    assert_eq!(approved.approved_by, Some(ADMIN_ID));
    assert_eq!(approved.approved_at, Some(utc(2, 0)));

    let archived = users.archive(3, ADMIN_ID, utc(3, 0)).await.unwrap();
    assert!(archived.is_archived);
    assert_eq!(archived.archived_by, Some(ADMIN_ID));

    let err = users
        .register(registration(3, "Lena", Category::DishWash), utc(4, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));
    assert_eq!(users.status_of(3).await.unwrap(), UserStatus::Archived);

    assert!(users.pending().await.unwrap().is_empty());
    assert!(users.list_by_category(Category::DishWash).await.unwrap().is_empty());
    assert_eq!(users.list_by_status(UserStatus::Archived).await.unwrap().len(), 1);
}
