//! Bounded-concurrency dispatch of login attempts.
//!
//! The orchestrator walks `Idle -> Dispatching -> Draining -> Stopped`.
//! While dispatching it keeps at most `concurrency` attempts in flight and
//! consumes their results in completion order. The first `RateLimited` or
//! `Blocked` outcome (or an external interrupt) flips the shared
//! [`RunState`]; no further attempts are started, in-flight ones get until
//! the drain deadline to report, and anything still running after that is
//! aborted.

use crate::engine::attempt::{attempt, AttemptReport, Endpoints, LoginOutcome};
use crate::engine::credentials::Credential;
use crate::engine::state::{RunState, StopCause};
use crate::exit_codes;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

pub static ACTIVE_ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

struct InFlightGuard;

impl InFlightGuard {
    fn new() -> Self {
        ACTIVE_ATTEMPTS.fetch_add(1, Ordering::SeqCst);
        Self
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        ACTIVE_ATTEMPTS.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Dispatching,
    Draining,
    Stopped,
}

/// Knobs for a single run.
///
/// Built directly, these are not validated: a `concurrency` of zero starts
/// no attempts and the run finishes immediately. `Config::validate` rejects
/// that value for the binary.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub concurrency: usize,
    pub drain_timeout: Duration,
    pub user_agent: String,
    pub debug: bool,
}

#[derive(Debug, Default, Clone)]
pub struct RunReport {
    pub dispatched: usize,
    pub completed: usize,
    /// Workers that saw the stop flag before starting and made no request.
    pub not_started: usize,
    /// Attempts still running at the drain deadline.
    pub abandoned: usize,
    /// Worker tasks that panicked.
    pub failed_workers: usize,
    pub outcomes: BTreeMap<&'static str, usize>,
    pub stop_cause: Option<StopCause>,
}

impl RunReport {
    fn record(&mut self, outcome: &LoginOutcome) {
        self.completed += 1;
        *self.outcomes.entry(outcome.kind()).or_insert(0) += 1;
    }

    /// Number of completed attempts whose outcome has this `kind` label.
    pub fn count(&self, kind: &str) -> usize {
        self.outcomes.get(kind).copied().unwrap_or(0)
    }

    pub fn exit_code(&self) -> i32 {
        match self.stop_cause {
            None => exit_codes::OK,
            Some(StopCause::RateLimited) | Some(StopCause::Blocked) => exit_codes::STOPPED,
            Some(StopCause::Interrupted) => exit_codes::INTERRUPTED,
        }
    }
}

pub struct Orchestrator {
    client: reqwest::Client,
    endpoints: Arc<Endpoints>,
    settings: RunSettings,
    user_agent: Arc<str>,
    state: Arc<RunState>,
    phase: Phase,
}

impl Orchestrator {
    pub fn new(
        client: reqwest::Client,
        endpoints: Endpoints,
        settings: RunSettings,
        state: Arc<RunState>,
    ) -> Self {
        let user_agent = Arc::from(settings.user_agent.as_str());
        Self {
            client,
            endpoints: Arc::new(endpoints),
            settings,
            user_agent,
            state,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> Arc<RunState> {
        Arc::clone(&self.state)
    }

    fn transition(&mut self, next: Phase) {
        debug!(from = ?self.phase, to = ?next, "Orchestrator phase change");
        self.phase = next;
    }

    pub async fn run(&mut self, credentials: Vec<Credential>) -> RunReport {
        let mut report = RunReport::default();
        let mut pending = credentials.into_iter();
        let mut workers: JoinSet<Option<AttemptReport>> = JoinSet::new();
        let concurrency = self.settings.concurrency;

        info!(
            login_url = %self.endpoints.login_url,
            login_page_url = %self.endpoints.login_page_url,
            concurrency,
            "Run started"
        );
        self.transition(Phase::Dispatching);

        loop {
            if self.state.is_stopped() {
                break;
            }

            while workers.len() < concurrency {
                let Some(credential) = pending.next() else {
                    break;
                };
                self.spawn_worker(&mut workers, credential);
                report.dispatched += 1;
            }

            if workers.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                _ = self.state.stopped() => break,
                joined = workers.join_next() => {
                    if let Some(joined) = joined {
                        handle_joined(joined, &mut report);
                    }
                }
            }
        }

        if self.state.is_stopped() {
            self.transition(Phase::Draining);
            self.drain(&mut workers, &mut report).await;
            crate::metrics::RUN_STOPPED.inc();
        }

        self.transition(Phase::Stopped);
        report.stop_cause = self.state.cause();

        info!(
            dispatched = report.dispatched,
            completed = report.completed,
            success = report.count("success"),
            denied = report.count("denied"),
            unknown = report.count("unknown_response"),
            nonce_missing = report.count("nonce_missing"),
            transport_errors = report.count("transport_error"),
            abandoned = report.abandoned,
            stop_cause = ?report.stop_cause,
            "Run finished"
        );

        report
    }

    fn spawn_worker(&self, workers: &mut JoinSet<Option<AttemptReport>>, credential: Credential) {
        let client = self.client.clone();
        let endpoints = Arc::clone(&self.endpoints);
        let user_agent = Arc::clone(&self.user_agent);
        let state = Arc::clone(&self.state);
        let debug_enabled = self.settings.debug;

        workers.spawn(async move {
            if state.is_stopped() {
                return None;
            }
            let _guard = InFlightGuard::new();

            let report = attempt(&client, &credential, &endpoints, &user_agent, debug_enabled).await;
            match report.outcome {
                LoginOutcome::RateLimited => {
                    state.request_stop(StopCause::RateLimited);
                }
                LoginOutcome::Blocked => {
                    state.request_stop(StopCause::Blocked);
                }
                _ => {}
            }
            Some(report)
        });
    }

    /// Collects in-flight results until the drain deadline, then aborts the rest.
    async fn drain(
        &self,
        workers: &mut JoinSet<Option<AttemptReport>>,
        report: &mut RunReport,
    ) {
        let deadline = Instant::now() + self.settings.drain_timeout;
        info!(
            in_flight = workers.len(),
            drain_timeout_ms = self.settings.drain_timeout.as_millis() as u64,
            "Stop requested; draining in-flight attempts"
        );

        while !workers.is_empty() {
            match tokio::time::timeout_at(deadline, workers.join_next()).await {
                Ok(Some(joined)) => handle_joined(joined, report),
                Ok(None) => break,
                Err(_) => {
                    let remaining = workers.len();
                    warn!(remaining, "Drain deadline reached; abandoning in-flight attempts");
                    workers.abort_all();
                    report.abandoned = remaining;
                    break;
                }
            }
        }
    }
}

fn handle_joined(joined: Result<Option<AttemptReport>, JoinError>, report: &mut RunReport) {
    match joined {
        Ok(Some(attempt)) => {
            log_attempt(&attempt);
            crate::metrics::ATTEMPTS_TOTAL
                .with_label_values(&[attempt.outcome.kind()])
                .inc();
            report.record(&attempt.outcome);
        }
        Ok(None) => report.not_started += 1,
        Err(e) => {
            error!(error = %e, "Login worker failed");
            report.failed_workers += 1;
        }
    }
}

fn log_attempt(attempt: &AttemptReport) {
    let outcome = &attempt.outcome;
    match outcome {
        LoginOutcome::RateLimited | LoginOutcome::Blocked => {
            warn!(
                username = %attempt.username,
                status = attempt.status,
                outcome = %outcome,
                "Stopping execution"
            );
        }
        LoginOutcome::NonceMissing | LoginOutcome::TransportError(_) => {
            warn!(
                username = %attempt.username,
                status = attempt.status,
                outcome = %outcome,
                "Login attempt failed"
            );
        }
        _ => {
            info!(
                username = %attempt.username,
                status = attempt.status,
                outcome = %outcome,
                "Login attempt completed"
            );
        }
    }
}
