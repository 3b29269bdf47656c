use std::sync::Arc;

use chrono::{Duration, Utc};

use super::common::*;
use crate::pipeline::domain::{ApplicationStatus, CandidateId};
use crate::pipeline::store::ApplicationFilter;
use crate::pipeline::tracker::{
    ApplicationTracker, StatisticsWindow, TrackerError, TransitionPolicy,
};

fn tracker(policy: TransitionPolicy) -> (ApplicationTracker, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    (ApplicationTracker::new(store.clone(), policy), store)
}

fn record(tracker: &ApplicationTracker, job: &str) -> crate::pipeline::domain::Application {
    tracker
        .record_applied(
            &mail_posting(job),
            &CandidateId("cand-1".to_string()),
            applied_attempt(job),
        )
        .expect("record inserts")
}

#[test]
fn new_records_start_as_applied() {
    let (tracker, _) = tracker(TransitionPolicy::default());
    let application = record(&tracker, "job-1");
    assert_eq!(application.status, ApplicationStatus::Applied);
    assert_eq!(application.job_title, "Senior Backend Engineer");
    assert_eq!(application.company, "Nordic Cloud");
    assert_eq!(application.applied_at, application.last_updated);
}

#[test]
fn default_policy_allows_stage_skips() {
    let (tracker, _) = tracker(TransitionPolicy::TerminalOnly);
    let application = record(&tracker, "job-1");
    let updated = tracker
        .update_status(
            &application.application_id,
            ApplicationStatus::Accepted,
            Some("Offer call".to_string()),
        )
        .expect("skip allowed under terminal-only policy");
    assert_eq!(updated.status, ApplicationStatus::Accepted);
    assert_eq!(updated.notes, "Offer call");
    assert!(updated.last_updated >= updated.applied_at);
}

#[test]
fn strict_policy_rejects_non_adjacent_moves() {
    let (tracker, _) = tracker(TransitionPolicy::Strict);
    let application = record(&tracker, "job-1");
    let err = tracker
        .update_status(&application.application_id, ApplicationStatus::Accepted, None)
        .expect_err("applied cannot jump to accepted under strict policy");
    assert!(matches!(
        err,
        TrackerError::InvalidTransition {
            from: "applied",
            to: "accepted"
        }
    ));

    tracker
        .update_status(&application.application_id, ApplicationStatus::Interview, None)
        .expect("adjacent move allowed");
}

#[test]
fn terminal_states_lock_the_record() {
    let (tracker, _) = tracker(TransitionPolicy::default());
    let application = record(&tracker, "job-1");
    tracker
        .update_status(&application.application_id, ApplicationStatus::Rejected, None)
        .expect("rejection is always reachable");

    let err = tracker
        .update_status(&application.application_id, ApplicationStatus::Interview, None)
        .expect_err("terminal records cannot move");
    assert!(matches!(err, TrackerError::InvalidTransition { from: "rejected", .. }));
}

#[test]
fn notes_persist_only_when_provided() {
    let (tracker, _) = tracker(TransitionPolicy::default());
    let application = record(&tracker, "job-1");
    tracker
        .update_status(
            &application.application_id,
            ApplicationStatus::Interview,
            Some("Phone screen on Friday".to_string()),
        )
        .expect("update succeeds");
    let updated = tracker
        .update_status(
            &application.application_id,
            ApplicationStatus::SecondInterview,
            None,
        )
        .expect("update succeeds");
    assert_eq!(updated.notes, "Phone screen on Friday");
}

#[test]
fn remove_is_a_hard_delete() {
    let (tracker, store) = tracker(TransitionPolicy::default());
    let application = record(&tracker, "job-1");
    tracker
        .remove(&application.application_id)
        .expect("delete succeeds");
    assert_eq!(store.len(), 0);

    let err = tracker
        .remove(&application.application_id)
        .expect_err("second delete fails");
    assert!(matches!(err, TrackerError::NotFound));
    assert!(matches!(
        tracker.get(&application.application_id),
        Err(TrackerError::NotFound)
    ));
}

#[test]
fn list_filters_by_status_and_company() {
    let (tracker, _) = tracker(TransitionPolicy::default());
    let first = record(&tracker, "job-1");
    let _second = record(&tracker, "job-2");
    tracker
        .update_status(&first.application_id, ApplicationStatus::Interview, None)
        .expect("update succeeds");

    let interviews = tracker
        .list(&ApplicationFilter {
            status: Some(ApplicationStatus::Interview),
            ..ApplicationFilter::default()
        })
        .expect("list succeeds");
    assert_eq!(interviews.len(), 1);
    assert_eq!(interviews[0].application_id, first.application_id);

    let by_company = tracker
        .list(&ApplicationFilter {
            company: Some("nordic cloud".to_string()),
            ..ApplicationFilter::default()
        })
        .expect("list succeeds");
    assert_eq!(by_company.len(), 2, "company match is case-insensitive");
}

#[test]
fn statistics_reflect_status_breakdown() {
    let (tracker, _) = tracker(TransitionPolicy::default());
    let first = record(&tracker, "job-1");
    let second = record(&tracker, "job-2");
    let _third = record(&tracker, "job-3");
    tracker
        .update_status(&first.application_id, ApplicationStatus::Interview, None)
        .expect("update succeeds");
    tracker
        .update_status(&second.application_id, ApplicationStatus::Rejected, None)
        .expect("update succeeds");

    let statistics = tracker
        .statistics(StatisticsWindow::last_days(30))
        .expect("statistics computes");

    assert_eq!(statistics.total, 3);
    assert_eq!(statistics.by_status.get("applied"), Some(&1));
    assert_eq!(statistics.by_status.get("interview"), Some(&1));
    assert_eq!(statistics.by_status.get("rejected"), Some(&1));
    assert!((statistics.response_rate - 2.0 / 3.0).abs() < 1e-9);
    assert!((statistics.interview_rate - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(statistics.success_rate, 0.0);
}

#[test]
fn empty_window_has_zero_rates() {
    let (tracker, _) = tracker(TransitionPolicy::default());
    record(&tracker, "job-1");

    let past = StatisticsWindow {
        from: Utc::now() - Duration::days(60),
        until: Utc::now() - Duration::days(30),
    };
    let statistics = tracker.statistics(past).expect("statistics computes");
    assert_eq!(statistics.total, 0);
    assert_eq!(statistics.response_rate, 0.0);
    assert_eq!(statistics.interview_rate, 0.0);
    assert_eq!(statistics.success_rate, 0.0);
}

#[test]
fn store_failures_propagate() {
    let tracker = ApplicationTracker::new(Arc::new(UnavailableStore), TransitionPolicy::default());
    let err = tracker
        .list(&ApplicationFilter::default())
        .expect_err("store down");
    assert!(matches!(err, TrackerError::Store(_)));
    assert!(!tracker.store_available());
}
