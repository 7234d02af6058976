//! End-to-end wizard scenarios against in-memory collaborators.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;

use order_wizard::directory::DirectoryStatus;
use order_wizard::{
    AgencyLookup, AgencyResolver, BlockerKind, CatalogItem, CompanyEntry, CompanyId,
    DirectorySource, LookupOutcome, NoopListener, OrderRequest, OrderSubmitter, RandomTestRecord,
    SessionMode, StaticDirectory, WizardError, WizardServices, WizardSession, WizardStep,
};

// ============================================================================
// Test collaborators
// ============================================================================

/// Lookup that answers with a fixed outcome
struct FixedLookup(LookupOutcome);

#[async_trait]
impl AgencyLookup for FixedLookup {
    fn lookup_id(&self) -> &str {
        "fixed"
    }

    async fn lookup(&self, _company_name: &str) -> LookupOutcome {
        self.0.clone()
    }
}

/// Lookup whose answers per company are released by the test, in call order
#[derive(Default)]
struct GatedLookup {
    gates: Mutex<HashMap<String, VecDeque<oneshot::Receiver<LookupOutcome>>>>,
}

impl GatedLookup {
    fn gate(&self, company_name: &str) -> oneshot::Sender<LookupOutcome> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .entry(company_name.to_string())
            .or_default()
            .push_back(rx);
        tx
    }
}

#[async_trait]
impl AgencyLookup for GatedLookup {
    fn lookup_id(&self) -> &str {
        "gated"
    }

    async fn lookup(&self, company_name: &str) -> LookupOutcome {
        let rx = self
            .gates
            .lock()
            .unwrap()
            .get_mut(company_name)
            .and_then(VecDeque::pop_front);
        match rx {
            Some(rx) => rx.await.unwrap_or(LookupOutcome::NotFound),
            None => LookupOutcome::NotFound,
        }
    }
}

/// Directory whose single load is released by the test
struct GatedDirectory {
    rx: tokio::sync::Mutex<Option<oneshot::Receiver<Vec<CompanyEntry>>>>,
}

#[async_trait]
impl DirectorySource for GatedDirectory {
    async fn load(&self, _auth_token: Option<&str>) -> order_wizard::Result<Vec<CompanyEntry>> {
        let rx = self.rx.lock().await.take();
        match rx {
            Some(rx) => Ok(rx.await.unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }
}

struct AcceptingSubmitter;

#[async_trait]
impl OrderSubmitter for AcceptingSubmitter {
    async fn submit(&self, _order: &OrderRequest) -> order_wizard::Result<String> {
        Ok("result-1".to_string())
    }
}

fn acme() -> CompanyEntry {
    CompanyEntry::new(
        "acme-1",
        "Acme Corp",
        vec![CatalogItem::new("p1", "DOT PANEL")],
        vec![CatalogItem::new("r1", "RANDOM")],
    )
}

fn globex() -> CompanyEntry {
    CompanyEntry::new(
        "globex-2",
        "Globex",
        vec![CatalogItem::new("p2", "NON-DOT 5 PANEL")],
        vec![CatalogItem::new("r2", "PRE-EMPLOYMENT")],
    )
}

fn services(directory: Arc<dyn DirectorySource>, chain: Vec<Arc<dyn AgencyLookup>>) -> WizardServices {
    WizardServices {
        directory,
        resolver: AgencyResolver::new(chain),
        submitter: Arc::new(AcceptingSubmitter),
        auth_token: Some("token".to_string()),
        dot_agencies: order_wizard::WizardConfig::default().dot_agencies,
    }
}

fn static_services(chain: Vec<Arc<dyn AgencyLookup>>) -> WizardServices {
    services(Arc::new(StaticDirectory::new(vec![acme(), globex()])), chain)
}

fn found(email: &str) -> Arc<dyn AgencyLookup> {
    Arc::new(FixedLookup(LookupOutcome::Found(email.to_string())))
}

fn reschedule_record() -> RandomTestRecord {
    RandomTestRecord {
        id: Some("rt-42".into()),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        ssn_eid: "123-45-6789".into(),
        dob: "1990-04-12T00:00:00.000Z".into(),
        addr1: "1 Main St".into(),
        state_short: "NV".into(),
        company_name: "acme corp".into(),
        package_name: "DOT PANEL".into(),
        order_reason: "RANDOM".into(),
        dot_agency: "FMCSA".into(),
        ..Default::default()
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn dot_package_blocks_continue_until_agency_and_reason_chosen() {
    let mut session = WizardSession::new(
        SessionMode::Create,
        static_services(vec![found("ops@agency.test")]),
        Box::new(NoopListener),
    );
    session.mount();
    session.settle().await;

    session.select_company(Some(&CompanyId::new("acme-1"))).unwrap();
    session.select_package(Some("DOT PANEL")).unwrap();
    assert!(session.view().phase.dot_agency_visible());
    assert!(!session.can_continue());

    session.select_dot_agency(Some("FMCSA")).unwrap();
    let kinds: Vec<_> = session.blockers().into_iter().map(|b| b.kind).collect();
    assert_eq!(kinds, vec![BlockerKind::OrderReasonMissing]);
    assert!(matches!(
        session.continue_step(),
        Err(WizardError::Blocked {
            step: WizardStep::OrderInformation,
            ..
        })
    ));

    session.select_order_reason(Some("RANDOM")).unwrap();
    assert!(session.can_continue());
    assert_eq!(
        session.continue_step().unwrap(),
        WizardStep::ParticipantInformation
    );
}

#[tokio::test]
async fn prefill_seeds_company_once_directory_arrives() {
    let (release_directory, rx) = oneshot::channel();
    let directory = Arc::new(GatedDirectory {
        rx: tokio::sync::Mutex::new(Some(rx)),
    });
    let mut session = WizardSession::new(
        SessionMode::Reschedule(reschedule_record()),
        services(directory, vec![found("ops@agency.test")]),
        Box::new(NoopListener),
    );
    session.mount();

    // phase 1 is already visible, the company is not
    let form = session.form();
    assert_eq!(form.ssn_or_eid, "123-45-6789");
    assert_eq!(form.dob, "1990-04-12");
    assert_eq!(form.company_id, None);
    assert_eq!(session.directory().status(), DirectoryStatus::Loading);

    release_directory.send(vec![globex(), acme()]).unwrap();
    assert!(session.process_next().await);

    let form = session.form();
    assert_eq!(form.company_id, Some(CompanyId::new("acme-1")));
    assert_eq!(form.package_name.as_deref(), Some("DOT PANEL"));
    assert_eq!(form.order_reason_name.as_deref(), Some("RANDOM"));
    assert_eq!(form.dot_agency.as_deref(), Some("FMCSA"));

    // the match also resolves the managing agency
    assert_eq!(session.pending_tasks(), 1);
    session.settle().await;
    assert_eq!(session.form().managing_agency_email, "ops@agency.test");
    assert!(session.can_continue());
}

#[tokio::test]
async fn prefill_with_unknown_company_leaves_it_for_the_user() {
    let record = RandomTestRecord {
        company_name: "Initech".into(),
        ..reschedule_record()
    };
    let mut session = WizardSession::new(
        SessionMode::Reschedule(record),
        static_services(vec![found("ops@agency.test")]),
        Box::new(NoopListener),
    );
    session.mount();
    session.settle().await;

    let form = session.form();
    assert_eq!(form.company_id, None);
    assert_eq!(form.package_name, None);
    assert_eq!(form.last_name, "Lovelace");
}

#[tokio::test]
async fn prefill_is_idempotent_across_sessions() {
    let mut first = WizardSession::new(
        SessionMode::Reschedule(reschedule_record()),
        static_services(vec![found("ops@agency.test")]),
        Box::new(NoopListener),
    );
    let mut second = WizardSession::new(
        SessionMode::Reschedule(reschedule_record()),
        static_services(vec![found("ops@agency.test")]),
        Box::new(NoopListener),
    );
    first.mount();
    first.mount();
    second.mount();
    first.settle().await;
    second.settle().await;

    assert_eq!(first.form(), second.form());
}

#[tokio::test]
async fn stale_agency_result_never_overwrites_newer_company() {
    let gated = Arc::new(GatedLookup::default());
    let release_acme = gated.gate("Acme Corp");
    let release_globex = gated.gate("Globex");

    let mut session = WizardSession::new(
        SessionMode::Create,
        static_services(vec![gated.clone() as Arc<dyn AgencyLookup>]),
        Box::new(NoopListener),
    );
    session.mount();
    session.settle().await;

    session.select_company(Some(&CompanyId::new("acme-1"))).unwrap();
    session.select_company(Some(&CompanyId::new("globex-2"))).unwrap();
    assert_eq!(session.pending_tasks(), 2);

    // Acme answers first but Globex is selected now
    release_acme
        .send(LookupOutcome::Found("acme@agency.test".into()))
        .unwrap();
    assert!(session.process_next().await);
    assert_eq!(session.form().managing_agency_email, "");
    assert!(session.agency().loading);

    release_globex
        .send(LookupOutcome::Found("globex@agency.test".into()))
        .unwrap();
    session.settle().await;

    assert_eq!(session.form().managing_agency_email, "globex@agency.test");
    assert_eq!(
        session.agency().company_id,
        Some(CompanyId::new("globex-2"))
    );
    assert!(!session.agency().loading);
}

#[tokio::test]
async fn stale_agency_result_arriving_last_is_dropped() {
    let gated = Arc::new(GatedLookup::default());
    let release_acme = gated.gate("Acme Corp");
    let release_globex = gated.gate("Globex");

    let mut session = WizardSession::new(
        SessionMode::Create,
        static_services(vec![gated.clone() as Arc<dyn AgencyLookup>]),
        Box::new(NoopListener),
    );
    session.mount();
    session.settle().await;

    session.select_company(Some(&CompanyId::new("acme-1"))).unwrap();
    session.select_company(Some(&CompanyId::new("globex-2"))).unwrap();

    release_globex.send(LookupOutcome::NotFound).unwrap();
    assert!(session.process_next().await);
    release_acme
        .send(LookupOutcome::Found("acme@agency.test".into()))
        .unwrap();
    session.settle().await;

    assert_eq!(session.form().managing_agency_email, "");
    assert_eq!(session.agency().error, None);
}

#[tokio::test]
async fn primary_network_failure_then_fallback_404_is_silent() {
    let chain: Vec<Arc<dyn AgencyLookup>> = vec![
        Arc::new(FixedLookup(LookupOutcome::Failed("connection reset".into()))),
        Arc::new(FixedLookup(LookupOutcome::NotFound)),
    ];
    let mut session =
        WizardSession::new(SessionMode::Create, static_services(chain), Box::new(NoopListener));
    session.mount();
    session.settle().await;

    session.select_company(Some(&CompanyId::new("acme-1"))).unwrap();
    session.settle().await;

    assert_eq!(session.form().managing_agency_email, "");
    assert_eq!(session.agency().error, None);
    assert!(!session.agency().loading);
}

#[tokio::test]
async fn primary_failure_then_fallback_500_shows_warning() {
    let chain: Vec<Arc<dyn AgencyLookup>> = vec![
        Arc::new(FixedLookup(LookupOutcome::Failed("connection reset".into()))),
        Arc::new(FixedLookup(LookupOutcome::Failed("500 Internal Server Error".into()))),
    ];
    let mut session =
        WizardSession::new(SessionMode::Create, static_services(chain), Box::new(NoopListener));
    session.mount();
    session.settle().await;

    session.select_company(Some(&CompanyId::new("acme-1"))).unwrap();
    session.settle().await;

    assert_eq!(session.form().managing_agency_email, "");
    assert_eq!(
        session.agency().error.as_deref(),
        Some(order_wizard::agency::AGENCY_LOOKUP_WARNING)
    );
    // the warning never blocks the step
    session.select_package(Some("DOT PANEL")).unwrap();
    session.select_order_reason(Some("RANDOM")).unwrap();
    session.select_dot_agency(Some("FMCSA")).unwrap();
    assert!(session.can_continue());
}

#[tokio::test]
async fn directory_failure_degrades_to_empty_list() {
    let mut session = WizardSession::new(
        SessionMode::Reschedule(reschedule_record()),
        services(
            Arc::new(StaticDirectory::failing()),
            vec![found("ops@agency.test")],
        ),
        Box::new(NoopListener),
    );
    session.mount();
    session.settle().await;

    assert!(session.directory().is_empty());
    assert_eq!(session.directory().status(), DirectoryStatus::Unavailable);
    assert!(session.select_company(Some(&CompanyId::new("acme-1"))).is_err());

    // prefilled participant data is still there, the company is up to the user
    assert_eq!(session.form().first_name, "Ada");
    assert!(!session.can_continue());

    session.reload_directory().unwrap();
    session.settle().await;
    assert_eq!(session.directory().status(), DirectoryStatus::Unavailable);
}

#[tokio::test]
async fn reselecting_a_company_waits_for_the_latest_resolution() {
    let gated = Arc::new(GatedLookup::default());
    let release_first_acme = gated.gate("Acme Corp");
    let release_globex = gated.gate("Globex");
    let release_second_acme = gated.gate("Acme Corp");

    let mut session = WizardSession::new(
        SessionMode::Create,
        static_services(vec![gated.clone() as Arc<dyn AgencyLookup>]),
        Box::new(NoopListener),
    );
    session.mount();
    session.settle().await;

    session.select_company(Some(&CompanyId::new("acme-1"))).unwrap();
    session.select_company(Some(&CompanyId::new("globex-2"))).unwrap();
    session.select_company(Some(&CompanyId::new("acme-1"))).unwrap();
    assert_eq!(session.pending_tasks(), 3);

    // same company, but an earlier request: still waiting on the latest one
    release_first_acme
        .send(LookupOutcome::Found("old@agency.test".into()))
        .unwrap();
    assert!(session.process_next().await);
    assert!(session.agency().loading);
    assert_eq!(session.form().managing_agency_email, "");

    release_globex
        .send(LookupOutcome::Found("globex@agency.test".into()))
        .unwrap();
    assert!(session.process_next().await);
    assert!(session.agency().loading);

    release_second_acme
        .send(LookupOutcome::Found("acme@agency.test".into()))
        .unwrap();
    session.settle().await;

    assert!(!session.agency().loading);
    assert_eq!(session.agency().company_id, Some(CompanyId::new("acme-1")));
    assert_eq!(session.form().managing_agency_email, "acme@agency.test");
}
