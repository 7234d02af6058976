//! Wizard Session
//!
//! One run of the order wizard, from mount to completion or close. The
//! session owns the form, the step sequencer, the directory and the agency
//! status; nothing is shared between sessions.
//!
//! Network work (directory load, agency resolution) runs on spawned tasks
//! that report back as `SessionEvent`s. The session applies events one at a
//! time, so every mutation happens on the owner's side:
//!
//! ```text
//!   mount ──spawn──▶ directory load ──DirectoryLoaded──▶ apply ──▶ prefill phase 2
//!   select company ──spawn──▶ agency chain ──AgencyResolved──▶ apply (dropped if stale)
//! ```
//!
//! Spawning requires a Tokio runtime.

use std::sync::Arc;

use order_types::{CompanyEntry, CompanyId, FormPatch, FormState, RandomTestRecord};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::agency::{AgencyResolution, AgencyResolver, AgencyStatus};
use crate::config::WizardConfig;
use crate::directory::{CompanyDirectory, DirectorySource, HttpDirectorySource};
use crate::error::{Result, WizardError};
use crate::form::FormStore;
use crate::order_info::{
    order_information_blockers, Blocker, CompanySelection, OrderInformationStep, StepPhase,
};
use crate::participant::participant_blockers;
use crate::prefill::{CompanyMatch, PrefillBootstrapper};
use crate::sequencer::{StepSequencer, WizardStep};
use crate::submit::{Attachment, HttpOrderSubmitter, OrderRequest, OrderSubmitter};

/// How the session starts
#[derive(Debug, Clone)]
pub enum SessionMode {
    /// Blank form
    Create,
    /// Rehydrate from a random-pool record
    Reschedule(RandomTestRecord),
}

/// Caller notifications. Each session reports at most one of them.
pub trait SessionListener: Send {
    fn on_complete(&mut self, result_id: &str);

    fn on_close(&mut self) {}
}

/// Listener that ignores everything
pub struct NoopListener;

impl SessionListener for NoopListener {
    fn on_complete(&mut self, _result_id: &str) {}
}

/// Collaborators a session talks to
#[derive(Clone)]
pub struct WizardServices {
    pub directory: Arc<dyn DirectorySource>,
    pub resolver: AgencyResolver,
    pub submitter: Arc<dyn OrderSubmitter>,
    pub auth_token: Option<String>,
    pub dot_agencies: Vec<String>,
}

impl WizardServices {
    /// HTTP-backed services sharing one client
    pub fn from_config(config: &WizardConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            directory: Arc::new(HttpDirectorySource::from_config(http.clone(), config)?),
            resolver: AgencyResolver::from_config(http.clone(), config)?,
            submitter: Arc::new(HttpOrderSubmitter::from_config(http, config)?),
            auth_token: config.auth_token.clone(),
            dot_agencies: config.dot_agencies.clone(),
        })
    }
}

/// Results delivered by background tasks
#[derive(Debug)]
pub(crate) enum SessionEvent {
    DirectoryLoaded(Result<Vec<CompanyEntry>>),
    AgencyResolved {
        request_id: u64,
        company_id: CompanyId,
        resolution: AgencyResolution,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SessionState {
    Active,
    Completed { result_id: String },
    Closed,
}

/// Serializable view of the session for rendering
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub state: SessionState,
    pub step: WizardStep,
    pub current_position: usize,
    pub max_position: usize,
    pub phase: StepPhase,
    pub form: FormState,
    pub agency: AgencyStatus,
    pub blockers: Vec<Blocker>,
    pub companies_loaded: usize,
}

pub struct WizardSession {
    id: Uuid,
    form: FormStore,
    sequencer: StepSequencer,
    directory: CompanyDirectory,
    agency: AgencyStatus,
    prefill: Option<PrefillBootstrapper>,
    rescheduled_from: Option<String>,
    services: WizardServices,
    listener: Box<dyn SessionListener>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    in_flight: usize,
    agency_requests: u64,
    mounted: bool,
    state: SessionState,
}

impl WizardSession {
    pub fn new(
        mode: SessionMode,
        services: WizardServices,
        listener: Box<dyn SessionListener>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (prefill, rescheduled_from) = match mode {
            SessionMode::Create => (None, None),
            SessionMode::Reschedule(record) => {
                let source_id = record.id.clone();
                (Some(PrefillBootstrapper::new(record)), source_id)
            }
        };

        Self {
            id: Uuid::new_v4(),
            form: FormStore::new(),
            sequencer: StepSequencer::new(),
            directory: CompanyDirectory::new(),
            agency: AgencyStatus::default(),
            prefill,
            rescheduled_from,
            services,
            listener,
            events_tx,
            events_rx,
            in_flight: 0,
            agency_requests: 0,
            mounted: false,
            state: SessionState::Active,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn is_reschedule(&self) -> bool {
        self.prefill.is_some() || self.rescheduled_from.is_some()
    }

    /// Start the directory load and, when rescheduling, apply prefill phase 1.
    ///
    /// Mounting twice is a no-op.
    pub fn mount(&mut self) {
        if self.mounted || !self.is_active() {
            return;
        }
        self.mounted = true;
        tracing::info!(session_id = %self.id, reschedule = self.is_reschedule(), "Wizard session mounted");

        if let Some(prefill) = self.prefill.as_mut() {
            prefill.apply_fields(&mut self.form);
        }
        self.spawn_directory_load();
    }

    /// Fetch the directory again (re-entering the step after a failed load).
    pub fn reload_directory(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.spawn_directory_load();
        Ok(())
    }

    fn spawn_directory_load(&mut self) {
        self.directory.mark_loading();
        self.in_flight += 1;

        let source = Arc::clone(&self.services.directory);
        let token = self.services.auth_token.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            // A panicking source must still report exactly one event
            let load = tokio::spawn(async move { source.load(token.as_deref()).await });
            let outcome = match load.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(error = ?e, "Directory load task panicked");
                    Err(WizardError::Task(e))
                }
            };
            let _ = tx.send(SessionEvent::DirectoryLoaded(outcome));
        });
    }

    fn spawn_agency_resolution(&mut self, company_id: CompanyId, display_name: String) {
        self.agency_requests += 1;
        let request_id = self.agency_requests;
        self.agency = AgencyStatus::start(company_id.clone(), request_id);
        self.in_flight += 1;

        let resolver = self.services.resolver.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let lookup = tokio::spawn(async move { resolver.resolve(&display_name).await });
            let resolution = match lookup.await {
                Ok(resolution) => resolution,
                Err(e) => {
                    tracing::error!(error = ?e, company_id = %company_id, "Agency resolution task panicked");
                    AgencyResolution::failed()
                }
            };
            let _ = tx.send(SessionEvent::AgencyResolved {
                request_id,
                company_id,
                resolution,
            });
        });
    }

    /// Number of background tasks whose results have not been applied yet
    pub fn pending_tasks(&self) -> usize {
        self.in_flight
    }

    /// Wait for the next background result and apply it.
    ///
    /// Returns false when nothing is in flight.
    pub async fn process_next(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.events_rx.recv().await {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    /// Apply background results until nothing is in flight.
    pub async fn settle(&mut self) {
        while self.process_next().await {}
    }

    fn apply(&mut self, event: SessionEvent) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if !self.is_active() {
            tracing::debug!(session_id = %self.id, "Ignoring event for finished session");
            return;
        }

        match event {
            SessionEvent::DirectoryLoaded(outcome) => {
                self.directory.apply(outcome);
                self.run_prefill_company();
            }
            SessionEvent::AgencyResolved {
                request_id,
                company_id,
                resolution,
            } => self.apply_agency_resolution(request_id, company_id, resolution),
        }
    }

    fn run_prefill_company(&mut self) {
        let Some(prefill) = self.prefill.as_mut() else {
            return;
        };
        if let CompanyMatch::Matched {
            company_id,
            display_name,
        } = prefill.apply_company(&mut self.form, &self.directory)
        {
            self.spawn_agency_resolution(company_id, display_name);
        }
    }

    fn apply_agency_resolution(
        &mut self,
        request_id: u64,
        company_id: CompanyId,
        resolution: AgencyResolution,
    ) {
        let selected = self.form.read(|f| f.company_id.clone());
        if selected.as_ref() != Some(&company_id) {
            tracing::debug!(
                session_id = %self.id,
                company_id = %company_id,
                "Dropping managing agency result for a company no longer selected"
            );
            return;
        }
        // Re-selecting the same company supersedes the earlier request
        if self.agency.request_id != request_id {
            tracing::debug!(
                session_id = %self.id,
                company_id = %company_id,
                request_id,
                latest = self.agency.request_id,
                "Dropping superseded managing agency result"
            );
            return;
        }

        self.form.merge(FormPatch {
            managing_agency_email: Some(resolution.email.clone()),
            ..Default::default()
        });
        self.agency.finish(resolution);
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(WizardError::SessionClosed)
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn form(&self) -> FormState {
        self.form.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<FormState> {
        self.form.subscribe()
    }

    pub fn directory(&self) -> &CompanyDirectory {
        &self.directory
    }

    pub fn agency(&self) -> &AgencyStatus {
        &self.agency
    }

    pub fn sequencer(&self) -> &StepSequencer {
        &self.sequencer
    }

    pub fn current_step(&self) -> WizardStep {
        self.sequencer.current_step()
    }

    /// Blockers of the visible step
    pub fn blockers(&self) -> Vec<Blocker> {
        self.blockers_for(self.current_step())
    }

    fn blockers_for(&self, step: WizardStep) -> Vec<Blocker> {
        self.form.read(|form| match step {
            WizardStep::OrderInformation => order_information_blockers(form),
            WizardStep::ParticipantInformation => participant_blockers(form),
            WizardStep::Review => Vec::new(),
        })
    }

    pub fn can_continue(&self) -> bool {
        self.is_active() && !self.current_step().is_last() && self.blockers().is_empty()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id,
            state: self.state.clone(),
            step: self.current_step(),
            current_position: self.sequencer.current_position(),
            max_position: self.sequencer.max_position(),
            phase: self.form.read(StepPhase::of),
            form: self.form.get(),
            agency: self.agency.clone(),
            blockers: self.blockers(),
            companies_loaded: self.directory.entries().len(),
        }
    }

    // ------------------------------------------------------------------
    // Edits
    // ------------------------------------------------------------------

    /// Order information step bound to this session, for option lists and phase.
    /// Selections go through the session so agency resolution and prefill stay in step.
    pub fn order_information(&mut self) -> OrderInformationStep<'_> {
        OrderInformationStep::new(
            &mut self.form,
            &self.directory,
            &self.services.dot_agencies,
        )
    }

    /// Raw shallow merge for participant and communication fields
    pub fn merge(&mut self, patch: FormPatch) -> Result<()> {
        self.ensure_active()?;
        self.form.merge(patch);
        Ok(())
    }

    /// User picked (or cleared) a company in the autocomplete.
    pub fn select_company(&mut self, company: Option<&CompanyId>) -> Result<()> {
        self.ensure_active()?;
        let selection = self.order_information().select_company(company)?;

        if let Some(prefill) = self.prefill.as_mut() {
            prefill.release_company();
        }

        match selection {
            CompanySelection::Selected {
                company_id,
                display_name,
            } => self.spawn_agency_resolution(company_id, display_name),
            CompanySelection::Cleared => self.agency = AgencyStatus::default(),
        }
        Ok(())
    }

    pub fn select_package(&mut self, package: Option<&str>) -> Result<()> {
        self.ensure_active()?;
        self.order_information().select_package(package)
    }

    pub fn select_order_reason(&mut self, reason: Option<&str>) -> Result<()> {
        self.ensure_active()?;
        self.order_information().select_order_reason(reason)
    }

    pub fn select_dot_agency(&mut self, agency: Option<&str>) -> Result<()> {
        self.ensure_active()?;
        self.order_information().select_dot_agency(agency)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// "Continue": advance when the visible step has no blockers.
    pub fn continue_step(&mut self) -> Result<WizardStep> {
        self.ensure_active()?;
        let step = self.current_step();
        if step.is_last() {
            return Err(WizardError::InvalidStep {
                requested: step.position() + 1,
                max: self.sequencer.max_position(),
            });
        }

        let blockers = self.blockers_for(step);
        if !blockers.is_empty() {
            return Err(WizardError::Blocked { step, blockers });
        }

        self.sequencer.advance();
        let next = self.current_step();
        tracing::debug!(session_id = %self.id, from = %step, to = %next, "Wizard advanced");
        Ok(next)
    }

    pub fn back(&mut self) -> Result<WizardStep> {
        self.ensure_active()?;
        self.sequencer.retreat();
        Ok(self.current_step())
    }

    pub fn go_to(&mut self, position: usize) -> Result<WizardStep> {
        self.ensure_active()?;
        self.sequencer.go_to(position)
    }

    // ------------------------------------------------------------------
    // Completion
    // ------------------------------------------------------------------

    /// Submit from the review step. On success the caller is notified with the
    /// result id and the session tears itself down. A failed submission leaves
    /// the session active so the user can retry.
    pub async fn submit(&mut self, attachment: Option<Attachment>) -> Result<String> {
        self.ensure_active()?;
        let step = self.current_step();
        if !step.is_last() {
            return Err(WizardError::InvalidStep {
                requested: WizardStep::Review.position(),
                max: self.sequencer.max_position(),
            });
        }

        for gated in [
            WizardStep::OrderInformation,
            WizardStep::ParticipantInformation,
        ] {
            let blockers = self.blockers_for(gated);
            if !blockers.is_empty() {
                return Err(WizardError::Blocked {
                    step: gated,
                    blockers,
                });
            }
        }

        let request = self.form.read(|form| {
            OrderRequest::from_form(form, attachment.as_ref(), self.rescheduled_from.as_deref())
        });

        match self.services.submitter.submit(&request).await {
            Ok(result_id) => {
                tracing::info!(session_id = %self.id, result_id = %result_id, "Order submitted");
                self.listener.on_complete(&result_id);
                self.teardown(SessionState::Completed {
                    result_id: result_id.clone(),
                });
                Ok(result_id)
            }
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "Order submission failed");
                Err(e)
            }
        }
    }

    /// Dismiss the wizard without submitting.
    pub fn close(&mut self) {
        if !self.is_active() {
            return;
        }
        tracing::info!(session_id = %self.id, "Wizard session closed");
        self.listener.on_close();
        self.teardown(SessionState::Closed);
    }

    fn teardown(&mut self, state: SessionState) {
        self.form.reset();
        self.sequencer = StepSequencer::new();
        self.directory = CompanyDirectory::new();
        self.agency = AgencyStatus::default();
        self.prefill = None;
        self.state = state;
    }
}
