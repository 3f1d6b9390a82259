//! # CDS Core
//!
//! Rule engines for the clinical decision-support tools.
//!
//! This crate contains the pure decision logic:
//! - UKMEC contraceptive eligibility: a static condition → category table and the
//!   per-method maximum combination rule
//! - Lower GI referral triage: a finite-state decision tree from symptoms to a diagnostic
//!   pathway
//!
//! **No UI concerns**: rendering, HTTP and terminal interaction belong in `api-rest`,
//! `api-shared` and `cds-cli`.

pub mod config;
pub mod constants;
pub mod eligibility;
pub mod error;
pub mod triage;

pub use config::CoreConfig;
pub use constants::DEFAULT_PORT;
pub use eligibility::{
    Category, ConditionRow, EligibilityTable, Method, MethodCategories, RiskProfile,
    ESCALATION_NOTICE,
};
pub use error::{CdsError, CdsResult};
pub use triage::{
    Answer, AnswerKind, Node, NodeResult, Note, Pathway, Question, Recommendation, Symptom,
    TriageSession,
};
