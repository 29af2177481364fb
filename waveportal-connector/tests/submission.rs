mod common;

use common::{record, wait_for_len, MockLedger};
use std::{sync::Arc, time::Duration};
use waveportal_connector::{
    config::ConnectorConfig,
    coordinator::SubmissionStatus,
    notice::NoticeKind,
    LedgerError, SubmitError, TransactionHandle, WavePortal,
};

async fn connected_portal(mock: Arc<MockLedger>, config: &ConnectorConfig) -> WavePortal {
    let portal = WavePortal::new(mock, config);
    portal.connect().await.expect("mock wallet connects");
    portal
}

fn seeded() -> Arc<MockLedger> {
    Arc::new(MockLedger::new().with_records(vec![
        record("0xABC", "hi", 1),
        record("0xDEF", "yo", 2),
    ]))
}

#[tokio::test]
async fn submit_requires_a_connected_session() {
    let mock = seeded();
    let portal = WavePortal::new(mock.clone(), &ConnectorConfig::default());
    let mut notices = portal.notices();

    let result = portal.submit_message("hello").await;

    assert_eq!(result, Err(SubmitError::NotConnected));
    assert_eq!(portal.submission_status(), SubmissionStatus::Idle);
    assert!(mock.submissions.lock().unwrap().is_empty());
    assert_eq!(notices.try_recv().unwrap().kind, NoticeKind::Submission);
}

#[tokio::test]
async fn confirmed_wave_shows_up_through_the_event_stream() {
    let mock = seeded();
    let portal = connected_portal(mock.clone(), &ConnectorConfig::default()).await;
    let mut view_rx = portal.watch_ledger();
    portal.set_draft("hello");

    let confirmation = portal.submit_draft().await.unwrap();

    assert_eq!(confirmation.handle, TransactionHandle("0xTX".to_string()));
    assert_eq!(portal.submission_status(), SubmissionStatus::Idle);
    assert!(portal.draft().is_empty());
    assert!(!portal.is_loading());
    // The coordinator never appends by itself.
    assert_eq!(portal.ledger_view().len(), 2);

    mock.emit(record("0xABC", "hello", 3)).await;

    let view = wait_for_len(&mut view_rx, 3).await;
    assert_eq!(view.total, 3);
    assert_eq!(view.last(), Some(&record("0xABC", "hello", 3)));
}

#[tokio::test]
async fn dispatch_uses_the_configured_gas_limit() {
    let mock = seeded();
    let mut config = ConnectorConfig::default();
    config.submission.gas_limit = 123_456;
    let portal = connected_portal(mock.clone(), &config).await;

    portal.submit_message("hello").await.unwrap();

    assert_eq!(
        *mock.submissions.lock().unwrap(),
        vec![("hello".to_string(), 123_456)]
    );
}

#[tokio::test]
async fn second_submission_is_rejected_while_one_is_in_flight() {
    let mock = seeded();
    let release = mock.gate_confirmation();
    let portal = connected_portal(mock.clone(), &ConnectorConfig::default()).await;
    let mut status_rx = portal.watch_submission();

    let first = tokio::spawn({
        let portal = portal.clone();
        async move { portal.submit_message("first").await }
    });

    let pending = tokio::time::timeout(
        Duration::from_secs(2),
        status_rx.wait_for(|s| matches!(s, SubmissionStatus::Confirming(_))),
    )
    .await
    .expect("first submission reaches confirming")
    .unwrap()
    .clone();

    let second = portal.submit_message("second").await;

    assert_eq!(second, Err(SubmitError::InFlight));
    assert_eq!(portal.submission_status(), pending);
    assert!(portal.is_loading());
    assert_eq!(mock.submissions.lock().unwrap().len(), 1);

    release.send(()).unwrap();
    first.await.unwrap().unwrap();
    assert_eq!(portal.submission_status(), SubmissionStatus::Idle);

    portal.submit_message("third").await.unwrap();
    assert_eq!(mock.submissions.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn reverted_transaction_resets_to_idle_and_clears_the_draft() {
    let mock = seeded();
    let reverted = LedgerError::TransactionReverted {
        signature: "0xTX".to_string(),
        reason: "custom program error: 0x1".to_string(),
    };
    *mock.confirm_result.lock().unwrap() = Err(reverted.clone());
    let portal = connected_portal(mock.clone(), &ConnectorConfig::default()).await;
    let mut notices = portal.notices();
    portal.set_draft("hello");

    let result = portal.submit_draft().await;

    assert_eq!(result, Err(SubmitError::Ledger(reverted)));
    assert_eq!(portal.submission_status(), SubmissionStatus::Idle);
    assert!(portal.draft().is_empty());
    assert_eq!(portal.ledger_view().len(), 2);
    assert_eq!(notices.try_recv().unwrap().kind, NoticeKind::Submission);
    assert_eq!(mock.submissions.lock().unwrap().len(), 1, "no automatic retry");
}

#[tokio::test]
async fn rejected_submission_returns_to_idle() {
    let mock = seeded();
    *mock.submit_result.lock().unwrap() =
        Err(LedgerError::SubmissionRejected("user declined".to_string()));
    let portal = connected_portal(mock.clone(), &ConnectorConfig::default()).await;
    portal.set_draft("hello");

    let result = portal.submit_draft().await;

    assert!(matches!(
        result,
        Err(SubmitError::Ledger(LedgerError::SubmissionRejected(_)))
    ));
    assert_eq!(portal.submission_status(), SubmissionStatus::Idle);
    assert!(portal.draft().is_empty());
}

#[tokio::test]
async fn timeout_is_reported_like_any_other_failure() {
    let mock = seeded();
    *mock.confirm_result.lock().unwrap() =
        Err(LedgerError::TransactionTimeout("0xTX".to_string()));
    let portal = connected_portal(mock, &ConnectorConfig::default()).await;

    let result = portal.submit_message("hello").await;

    assert_eq!(
        result,
        Err(SubmitError::Ledger(LedgerError::TransactionTimeout(
            "0xTX".to_string()
        )))
    );
    assert!(!portal.is_loading());
}

#[tokio::test]
async fn resync_on_confirm_rereads_the_ledger() {
    let mock = seeded();
    let mut config = ConnectorConfig::default();
    config.submission.resync_on_confirm = true;
    let portal = connected_portal(mock.clone(), &config).await;
    assert_eq!(mock.reads(), 1);

    let mut view_rx = portal.watch_ledger();
    let confirmed = record("0xABC", "hello", 3);
    mock.set_records(Ok(vec![
        record("0xABC", "hi", 1),
        record("0xDEF", "yo", 2),
        confirmed.clone(),
    ]));
    mock.set_slot(7);
    portal.submit_message("hello").await.unwrap();

    assert_eq!(mock.reads(), 2);
    assert_eq!(portal.ledger_view().len(), 3);
    assert_eq!(portal.ledger_view().total, 3);

    // The event for the confirmed wave arrives after the re-read already holds it.
    mock.emit_at(7, confirmed.clone()).await;
    let next = record("0xDEF", "next", 4);
    mock.emit_at(8, next.clone()).await;

    let view = wait_for_len(&mut view_rx, 4).await;
    assert_eq!(view.total, 4);
    assert_eq!(view.records[2], confirmed);
    assert_eq!(view.records[3], next);
}

#[tokio::test]
async fn abandoned_submission_returns_to_idle_and_clears_the_draft() {
    let mock = seeded();
    let _release = mock.gate_confirmation();
    let portal = connected_portal(mock.clone(), &ConnectorConfig::default()).await;
    let mut status_rx = portal.watch_submission();
    portal.set_draft("hello");

    let pending = tokio::spawn({
        let portal = portal.clone();
        async move { portal.submit_draft().await }
    });
    tokio::time::timeout(
        Duration::from_secs(2),
        status_rx.wait_for(|s| matches!(s, SubmissionStatus::Confirming(_))),
    )
    .await
    .expect("submission reaches confirming")
    .unwrap();

    pending.abort();
    assert!(pending.await.unwrap_err().is_cancelled());

    assert_eq!(portal.submission_status(), SubmissionStatus::Idle);
    assert!(portal.draft().is_empty());
    assert!(!portal.is_loading());
    portal.submit_message("again").await.unwrap();
}
