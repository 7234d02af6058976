//! Order Wizard - headless order workflow engine
//!
//! Drives the "Create New Order" wizard and its "Reschedule Order" twin for
//! the drug-testing backend. Rendering is left to the caller; this crate owns
//! the state and the rules.
//!
//! ## Architecture
//!
//! ```text
//! WizardSession
//!   ├── FormStore          single form record, watched by every step
//!   ├── StepSequencer      current / furthest step
//!   ├── CompanyDirectory   loaded once per session
//!   ├── AgencyResolver     primary → fallback lookup chain
//!   └── PrefillBootstrapper (reschedule only)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use order_wizard::{NoopListener, SessionMode, WizardConfig, WizardServices, WizardSession};
//!
//! # async fn run() -> order_wizard::Result<()> {
//! let config = WizardConfig::load(None)?;
//! let services = WizardServices::from_config(&config)?;
//! let mut session = WizardSession::new(SessionMode::Create, services, Box::new(NoopListener));
//! session.mount();
//! session.settle().await;
//! println!("{} companies", session.directory().entries().len());
//! # Ok(())
//! # }
//! ```

pub mod agency;
pub mod config;
pub mod directory;
pub mod error;
pub mod form;
pub mod order_info;
pub mod participant;
pub mod prefill;
pub mod sequencer;
pub mod session;
pub mod submit;

pub use agency::{AgencyLookup, AgencyResolution, AgencyResolver, AgencyStatus, LookupOutcome};
pub use config::WizardConfig;
pub use directory::{CompanyDirectory, DirectorySource, DirectoryStatus, StaticDirectory};
pub use error::{Result, WizardError};
pub use form::FormStore;
pub use order_info::{Blocker, BlockerKind, OrderInformationStep, StepPhase};
pub use prefill::{CompanyMatch, PrefillBootstrapper};
pub use sequencer::{StepSequencer, WizardStep};
pub use session::{
    NoopListener, SessionListener, SessionMode, SessionState, SessionView,
    WizardServices, WizardSession,
};
pub use submit::{Attachment, OrderRequest, OrderSubmitter};

pub use order_types::{
    CatalogItem, CompanyEntry, CompanyId, FormPatch, FormState, RandomTestRecord,
};
