use std::sync::Arc;
use std::time::Duration;

use super::common::*;
use crate::pipeline::channels::{FormChannel, MailChannel, ManualChannel};
use crate::pipeline::dispatcher::{AutoApplyDispatcher, DispatchError, DispatcherConfig};
use crate::pipeline::domain::{
    ApplicationStatus, ChannelKind, ChannelOutcome, DispatchOutcome,
};
use crate::pipeline::tracker::{ApplicationTracker, TransitionPolicy};

fn dispatcher_with(
    mail: Arc<dyn crate::pipeline::channels::MailTransport>,
    forms: Arc<dyn crate::pipeline::channels::FormGateway>,
    store: Arc<MemoryStore>,
) -> (Arc<AutoApplyDispatcher>, Arc<ApplicationTracker>) {
    let tracker = Arc::new(ApplicationTracker::new(
        store,
        TransitionPolicy::default(),
    ));
    let dispatcher = Arc::new(AutoApplyDispatcher::new(
        vec![
            Arc::new(ManualChannel),
            Arc::new(FormChannel::new(forms)),
            Arc::new(MailChannel::new(mail)),
        ],
        tracker.clone(),
        DispatcherConfig::default(),
    ));
    (dispatcher, tracker)
}

#[tokio::test]
async fn mail_submission_creates_applied_record() {
    let mail = Arc::new(MemoryMail::default());
    let store = Arc::new(MemoryStore::default());
    let (dispatcher, _) = dispatcher_with(mail.clone(), Arc::new(MemoryForms::default()), store.clone());

    let result = dispatcher
        .dispatch(&mail_posting("job-1"), &profile())
        .await
        .expect("dispatch succeeds");

    assert_eq!(result.attempt.outcome, DispatchOutcome::Applied(ChannelKind::Mail));
    let application = result.application.expect("record created");
    assert_eq!(application.status, ApplicationStatus::Applied);
    assert!(application.application_id.0.starts_with("app-"));
    assert_eq!(store.len(), 1);

    let sent = mail.sent.lock().expect("mail mutex poisoned");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jobs@nordiccloud.example");
    assert_eq!(sent[0].attachment.0, "resumes/robin.pdf");
}

#[tokio::test]
async fn failed_mail_falls_through_to_form() {
    let forms = Arc::new(MemoryForms::default());
    let store = Arc::new(MemoryStore::default());
    let (dispatcher, _) = dispatcher_with(Arc::new(FailingMail), forms.clone(), store.clone());

    // Posting is reachable by form only, mail cannot handle it.
    let result = dispatcher
        .dispatch(&form_posting("job-2"), &profile())
        .await
        .expect("dispatch succeeds");

    assert_eq!(result.attempt.outcome, DispatchOutcome::Applied(ChannelKind::Form));
    assert_eq!(forms.submitted.lock().expect("form mutex poisoned").len(), 1);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn channels_try_in_priority_order_and_keep_the_trail() {
    let store = Arc::new(MemoryStore::default());
    // Mail target posting but the transport rejects: the manual fallback is
    // the only remaining handler.
    let (dispatcher, _) = dispatcher_with(Arc::new(FailingMail), Arc::new(MemoryForms::default()), store.clone());

    let result = dispatcher
        .dispatch(&mail_posting("job-3"), &profile())
        .await
        .expect("dispatch succeeds");

    assert_eq!(result.attempt.outcome, DispatchOutcome::ManualFollowUp);
    assert!(result.application.is_none());
    assert_eq!(store.len(), 0);

    let trail = &result.attempt.channels;
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].channel, ChannelKind::Mail);
    assert!(matches!(trail[0].outcome, ChannelOutcome::Failed { .. }));
    assert_eq!(trail[1].channel, ChannelKind::Manual);
    assert_eq!(trail[1].outcome, ChannelOutcome::ManualActionRequired);
}

#[tokio::test]
async fn all_automated_failures_without_manual_yield_failed_outcome() {
    let store = Arc::new(MemoryStore::default());
    let tracker = Arc::new(ApplicationTracker::new(
        store.clone(),
        TransitionPolicy::default(),
    ));
    // No manual channel registered: nothing is left after transport failure.
    let dispatcher = AutoApplyDispatcher::new(
        vec![Arc::new(MailChannel::new(Arc::new(FailingMail)))],
        tracker,
        DispatcherConfig::default(),
    );

    let result = dispatcher
        .dispatch(&mail_posting("job-4"), &profile())
        .await
        .expect("dispatch completes");

    assert_eq!(result.attempt.outcome, DispatchOutcome::Failed);
    assert!(result.application.is_none());
    assert_eq!(store.len(), 0);
    assert!(result.attempt.diagnostic_trail().contains("mailbox unavailable"));
}

#[tokio::test]
async fn missing_candidate_email_is_a_validation_error() {
    let store = Arc::new(MemoryStore::default());
    let (dispatcher, _) = dispatcher_with(
        Arc::new(MemoryMail::default()),
        Arc::new(MemoryForms::default()),
        store.clone(),
    );

    let mut candidate = profile();
    candidate.email = None;
    let err = dispatcher
        .dispatch(&mail_posting("job-5"), &candidate)
        .await
        .expect_err("validation surfaces");

    assert!(matches!(err, DispatchError::Validation(_)));
    // The message names the offending channel.
    assert!(err.to_string().contains("mail channel"));
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn duplicate_dispatch_fails_fast() {
    let store = Arc::new(MemoryStore::default());
    let (dispatcher, _) = dispatcher_with(
        Arc::new(MemoryMail::default()),
        Arc::new(MemoryForms::default()),
        store.clone(),
    );

    let posting = mail_posting("job-6");
    dispatcher
        .dispatch(&posting, &profile())
        .await
        .expect("first dispatch succeeds");
    let err = dispatcher
        .dispatch(&posting, &profile())
        .await
        .expect_err("second dispatch rejected");

    assert!(matches!(err, DispatchError::DuplicateInProgress { .. }));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn concurrent_dispatches_create_exactly_one_record() {
    let store = Arc::new(MemoryStore::default());
    let (dispatcher, _) = dispatcher_with(
        Arc::new(MemoryMail::default()),
        Arc::new(MemoryForms::default()),
        store.clone(),
    );

    let posting = mail_posting("job-7");
    let candidate = profile();
    let (first, second) = tokio::join!(
        dispatcher.dispatch(&posting, &candidate),
        dispatcher.dispatch(&posting, &candidate),
    );

    let successes = [&first, &second]
        .iter()
        .filter(|result| result.is_ok())
        .count();
    let duplicates = [&first, &second]
        .iter()
        .filter(|result| {
            matches!(result, Err(DispatchError::DuplicateInProgress { .. }))
        })
        .count();

    assert_eq!(successes, 1, "exactly one dispatch wins");
    assert_eq!(duplicates, 1, "the loser sees the duplicate error");
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn terminal_application_frees_the_pair_for_redispatch() {
    let store = Arc::new(MemoryStore::default());
    let (dispatcher, tracker) = dispatcher_with(
        Arc::new(MemoryMail::default()),
        Arc::new(MemoryForms::default()),
        store.clone(),
    );

    let posting = mail_posting("job-8");
    let first = dispatcher
        .dispatch(&posting, &profile())
        .await
        .expect("first dispatch succeeds");
    let application = first.application.expect("record created");
    tracker
        .update_status(&application.application_id, ApplicationStatus::Rejected, None)
        .expect("terminal transition allowed");

    dispatcher
        .dispatch(&posting, &profile())
        .await
        .expect("pair is eligible again");
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn slow_channel_times_out_and_falls_through() {
    struct SlowMail;
    impl crate::pipeline::channels::MailTransport for SlowMail {
        fn deliver(
            &self,
            _message: crate::pipeline::channels::OutboundMessage,
        ) -> Result<(), crate::pipeline::channels::TransportError> {
            std::thread::sleep(Duration::from_millis(250));
            Ok(())
        }
    }

    let store = Arc::new(MemoryStore::default());
    let tracker = Arc::new(ApplicationTracker::new(
        store.clone(),
        TransitionPolicy::default(),
    ));
    let dispatcher = AutoApplyDispatcher::new(
        vec![
            Arc::new(MailChannel::new(Arc::new(SlowMail))),
            Arc::new(ManualChannel),
        ],
        tracker,
        DispatcherConfig {
            channel_timeout: Duration::from_millis(20),
        },
    );

    let result = dispatcher
        .dispatch(&mail_posting("job-9"), &profile())
        .await
        .expect("dispatch completes");

    assert_eq!(result.attempt.outcome, DispatchOutcome::ManualFollowUp);
    assert!(result.attempt.diagnostic_trail().contains("timed out"));
    assert_eq!(store.len(), 0);
}
