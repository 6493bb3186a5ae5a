mod common;

use std::sync::Arc;

use attendance_backend::{
    database::{
        pool::{create_pool, run_migrations},
        postgres::PgRepository,
    },
    models::{
        report::DateRange,
        user::{Category, UserStatus},
        work_session::{CheckInOutcome, CheckOutOutcome},
    },
    AppState,
};
use chrono::Utc;
use common::{registration, ADMIN_ID};
use tokio::sync::Barrier;

/// Needs a disposable database in `DATABASE_URL`.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn postgres_store_keeps_one_open_session_per_day() {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
    let config = common::config();
    let pool = create_pool(&config, &url).await.expect("pool");
    run_migrations(&pool).await.expect("migrations");

    let repo = Arc::new(PgRepository::new(pool.clone()));
    let state = AppState::new(config, repo.clone(), repo).unwrap();
    let user_id = Utc::now().timestamp_micros();
    let at = common::utc(6, 0);

    state
        .user_service
        .register(registration(user_id, "Pg", Category::Kitchen), at)
        .await
        .unwrap();
    let approved = state.user_service.approve(user_id, ADMIN_ID, at).await.unwrap();
    assert_eq!(approved.status, UserStatus::Approved);

    let barrier = Arc::new(Barrier::new(8));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let sessions = state.session_service.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            sessions.check_in(user_id, at, None).await
        }));
    }
    let mut started = 0;
    for handle in handles {
        if let CheckInOutcome::Started(_) = handle.await.unwrap().unwrap() {
            started += 1;
        }
    }
    assert_eq!(started, 1);

    let outcome = state
        .session_service
        .check_out(user_id, at + chrono::Duration::minutes(90), None)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        CheckOutOutcome::Closed {
            duration_minutes: 90,
            ..
        }
    ));

    let today = state.session_service.today(at);
    let totals = state
        .report_service
        .user_totals(user_id, DateRange::single(today))
        .await
        .unwrap();
    assert_eq!(totals.total_minutes, 90);

    sqlx::query("DELETE FROM work_sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("DELETE FROM users WHERE user_id = $1")
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap();
}
