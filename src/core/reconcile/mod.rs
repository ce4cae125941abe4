pub mod classify;
pub mod engine;
pub mod status;

pub use classify::{check_eligibility, classify, Action, Eligibility, Plan};
pub use engine::{
    ConcurrencyLimit, ProjectOutcome, ReconcileOptions, ReconcileSummary, Reconciler,
};
pub use status::{survey, ProjectState, ProjectStatus};
