use crate::infra::{
    sample_postings, sample_profile, InMemoryApplicationStore, InMemoryDirectory,
    RecordingFormGateway, RecordingMailTransport, StubJobSource,
};
use clap::Args;
use jobflow::error::AppError;
use jobflow::pipeline::{
    ApplicationChannel, ApplicationStatus, ApplicationTracker, AutoApplyDispatcher, CandidateId,
    DispatcherConfig, FormChannel, JobQuery, JobResult, MailChannel, ManualChannel, MatchScorer,
    StatisticsWindow, Supervisor, SupervisorConfig, SupervisorError, TransitionPolicy,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Search query matched against posting titles and descriptions
    #[arg(long, default_value = "engineer")]
    pub(crate) search_query: String,
    /// Restrict the search to one location
    #[arg(long)]
    pub(crate) location: Option<String>,
    /// Minimum composite score a posting needs to be dispatched
    #[arg(long, default_value_t = 40.0)]
    pub(crate) min_score: f32,
    /// Application cap for the demo cycle
    #[arg(long, default_value_t = 10)]
    pub(crate) max_applications: usize,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        search_query,
        location,
        min_score,
        max_applications,
    } = args;

    println!("Job application pipeline demo");

    let candidate_id = CandidateId("demo-candidate".to_string());
    let source = Arc::new(StubJobSource::with_postings(sample_postings()));
    let directory = Arc::new(InMemoryDirectory::with_profile(sample_profile(
        candidate_id.clone(),
    )));
    let store = Arc::new(InMemoryApplicationStore::default());
    let tracker = Arc::new(ApplicationTracker::new(store, TransitionPolicy::default()));

    let mail = Arc::new(RecordingMailTransport::default());
    let forms = Arc::new(RecordingFormGateway::default());
    let channels: Vec<Arc<dyn ApplicationChannel>> = vec![
        Arc::new(MailChannel::new(mail.clone())),
        Arc::new(FormChannel::new(forms.clone())),
        Arc::new(ManualChannel),
    ];
    let dispatcher = Arc::new(AutoApplyDispatcher::new(
        channels,
        tracker.clone(),
        DispatcherConfig::default(),
    ));

    let supervisor = Arc::new(Supervisor::new(
        source,
        directory,
        MatchScorer::default(),
        dispatcher,
        tracker.clone(),
        SupervisorConfig {
            candidate_id,
            min_score,
            max_applications_per_cycle: max_applications,
            ..SupervisorConfig::default()
        },
    ));

    let query = JobQuery {
        search_query,
        location,
        job_type: None,
        max_jobs: 50,
    };
    println!(
        "\nRunning one cycle (query '{}', threshold {:.0})",
        query.search_query, min_score
    );
    let summary = match supervisor.run_cycle(query).await {
        Ok(summary) => summary,
        Err(err @ SupervisorError::CycleBusy { .. }) => {
            println!("  Cycle rejected: {err}");
            return Ok(());
        }
    };

    if let Some(reason) = &summary.aborted {
        println!("  Cycle aborted: {reason}");
        return Ok(());
    }

    println!(
        "  Fetched {} postings, {} above threshold",
        summary.fetched, summary.selected
    );
    for outcome in &summary.outcomes {
        let disposition = match &outcome.result {
            JobResult::Applied { channel } => format!("applied via {}", channel.label()),
            JobResult::ManualFollowUp { trail } => format!("manual follow-up ({trail})"),
            JobResult::Failed { trail } => format!("failed ({trail})"),
            JobResult::Duplicate => "duplicate, skipped".to_string(),
            JobResult::Error { detail } => format!("error: {detail}"),
            JobResult::Skipped { reason } => format!("skipped: {reason}"),
        };
        println!(
            "  - {} at {} (score {:.1}): {}",
            outcome.title, outcome.company, outcome.score, disposition
        );
    }

    let sent = mail.sent();
    if !sent.is_empty() {
        println!("\nOutbound mail");
        for message in &sent {
            println!("  - to {} | {}", message.to, message.subject);
        }
    }
    let submitted = forms.submitted();
    if !submitted.is_empty() {
        println!("\nForm submissions");
        for submission in &submitted {
            println!("  - {} as {}", submission.endpoint, submission.candidate_name);
        }
    }

    println!("\nTracking demo");
    let applications = tracker.list(&Default::default())?;
    if let Some(application) = applications.first() {
        let updated = tracker.update_status(
            &application.application_id,
            ApplicationStatus::Interview,
            Some("Recruiter replied, phone screen booked.".to_string()),
        )?;
        println!(
            "  {} moved {} -> {}",
            updated.application_id.0,
            application.status.label(),
            updated.status.label()
        );
    } else {
        println!("  No applications recorded this cycle");
    }

    let statistics = tracker.statistics(StatisticsWindow::last_days(30))?;
    println!(
        "\n30-day statistics: {} total | response rate {:.0}% | interview rate {:.0}% | success rate {:.0}%",
        statistics.total,
        statistics.response_rate * 100.0,
        statistics.interview_rate * 100.0,
        statistics.success_rate * 100.0
    );
    for (status, count) in &statistics.by_status {
        println!("  - {status}: {count}");
    }

    Ok(())
}
