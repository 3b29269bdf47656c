use crate::cli::ServeArgs;
use crate::infra::{
    sample_postings, sample_profile, AppState, InMemoryApplicationStore, InMemoryDirectory,
    RecordingFormGateway, RecordingMailTransport, StubJobSource,
};
use crate::routes::with_pipeline_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use jobflow::config::AppConfig;
use jobflow::error::AppError;
use jobflow::pipeline::{
    ApplicationChannel, ApplicationTracker, AutoApplyDispatcher, CandidateId, DispatcherConfig,
    FormChannel, JobQuery, MailChannel, ManualChannel, MatchScorer, PipelineHandle, Supervisor,
    SupervisorConfig, TransitionPolicy,
};
use jobflow::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let candidate_id = CandidateId(config.pipeline.candidate_id.clone());
    let source = Arc::new(StubJobSource::with_postings(sample_postings()));
    let directory = Arc::new(InMemoryDirectory::with_profile(sample_profile(
        candidate_id.clone(),
    )));
    let store = Arc::new(InMemoryApplicationStore::default());
    let tracker = Arc::new(ApplicationTracker::new(
        store,
        TransitionPolicy::default(),
    ));

    let channels: Vec<Arc<dyn ApplicationChannel>> = vec![
        Arc::new(MailChannel::new(Arc::new(RecordingMailTransport::default()))),
        Arc::new(FormChannel::new(Arc::new(RecordingFormGateway::default()))),
        Arc::new(ManualChannel),
    ];
    let dispatcher = Arc::new(AutoApplyDispatcher::new(
        channels,
        tracker.clone(),
        DispatcherConfig {
            channel_timeout: config.pipeline.channel_timeout,
        },
    ));

    let supervisor = Arc::new(Supervisor::new(
        source,
        directory,
        MatchScorer::default(),
        dispatcher,
        tracker.clone(),
        SupervisorConfig {
            candidate_id,
            min_score: config.pipeline.min_score,
            max_jobs: config.pipeline.max_jobs,
            max_concurrent_dispatches: config.pipeline.max_concurrent_dispatches,
            max_applications_per_cycle: config.pipeline.max_applications_per_cycle,
            cooldown: config.pipeline.cooldown,
        },
    ));

    if let Some(interval_secs) = args.auto_interval_secs {
        let query = JobQuery {
            search_query: args.search_query.clone().unwrap_or_default(),
            location: None,
            job_type: None,
            max_jobs: config.pipeline.max_jobs,
        };
        tokio::spawn(
            Arc::clone(&supervisor).run_auto(query, Duration::from_secs(interval_secs.max(1))),
        );
    }

    let handle = PipelineHandle {
        supervisor,
        tracker,
    };

    let app = with_pipeline_routes(handle)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "application pipeline service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
