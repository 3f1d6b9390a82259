//! # API Shared
//!
//! Shared wire definitions for the CDS form shells.
//!
//! Contains:
//! - Request/response bodies with OpenAPI schemas
//! - Translation from `cds-core` domain types into those bodies
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the root launcher.

pub mod health;

pub use health::HealthService;

use cds_core::triage::{AnswerKind, Pathway};
use cds_core::{
    Answer, Category, EligibilityTable, Method, MethodCategories, Node, Question,
    Recommendation, RiskProfile, Symptom, TriageSession, ESCALATION_NOTICE,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

// ============================================================================
// Health
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

// ============================================================================
// Eligibility
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MethodInfo {
    #[schema(value_type = String, example = "CHC")]
    pub code: Method,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryDefinition {
    pub category: u8,
    pub definition: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListMethodsRes {
    pub methods: Vec<MethodInfo>,
    pub categories: Vec<CategoryDefinition>,
}

impl ListMethodsRes {
    pub fn catalogue() -> Self {
        Self {
            methods: Method::ALL
                .into_iter()
                .map(|m| MethodInfo {
                    code: m,
                    label: m.label().into(),
                })
                .collect(),
            categories: [
                Category::UNRESTRICTED,
                Category::BENEFITS_OUTWEIGH_RISKS,
                Category::RISKS_OUTWEIGH_BENEFITS,
                Category::UNACCEPTABLE_RISK,
            ]
            .into_iter()
            .map(|c| CategoryDefinition {
                category: c.value(),
                definition: c.definition().into(),
            })
            .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConditionInfo {
    pub key: String,
    pub description: String,
    /// Category per method code; methods without a restriction are omitted.
    pub categories: BTreeMap<String, u8>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListConditionsRes {
    pub conditions: Vec<ConditionInfo>,
}

impl From<&EligibilityTable> for ListConditionsRes {
    fn from(table: &EligibilityTable) -> Self {
        Self {
            conditions: table
                .iter()
                .map(|(key, row)| ConditionInfo {
                    key: key.into(),
                    description: row.description.clone(),
                    categories: row
                        .categories
                        .iter()
                        .map(|(m, c)| (m.code().to_string(), c.value()))
                        .collect(),
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CombineReq {
    /// Selected condition keys. Unknown keys are ignored.
    pub conditions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssessReq {
    /// Risk-profile form answers.
    #[schema(value_type = Object)]
    pub profile: RiskProfile,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MethodResult {
    #[schema(value_type = String, example = "CHC")]
    pub method: Method,
    pub label: String,
    pub category: u8,
    pub definition: String,
    /// Selected conditions contributing category 2 or 3 to this method.
    pub overlapping_conditions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EligibilityRes {
    pub condition_keys: Vec<String>,
    pub results: Vec<MethodResult>,
    pub notice: String,
}

impl EligibilityRes {
    /// Build the response for `selected`, already combined into `categories`.
    pub fn build<S: AsRef<str>>(
        table: &EligibilityTable,
        selected: &[S],
        categories: &MethodCategories,
    ) -> Self {
        Self {
            condition_keys: selected.iter().map(|k| k.as_ref().to_string()).collect(),
            results: categories
                .iter()
                .map(|(method, category)| MethodResult {
                    method,
                    label: method.label().into(),
                    category: category.value(),
                    definition: category.definition().into(),
                    overlapping_conditions: table
                        .overlapping_conditions(selected, method)
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                })
                .collect(),
            notice: ESCALATION_NOTICE.into(),
        }
    }
}

// ============================================================================
// Triage
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SymptomInfo {
    #[schema(value_type = String, example = "rectal_mass")]
    pub code: Symptom,
    pub number: usize,
    pub label: String,
}

impl From<Symptom> for SymptomInfo {
    fn from(symptom: Symptom) -> Self {
        Self {
            code: symptom,
            number: symptom.number(),
            label: symptom.label().into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListSymptomsRes {
    pub symptoms: Vec<SymptomInfo>,
}

impl ListSymptomsRes {
    pub fn all() -> Self {
        Self {
            symptoms: Symptom::ALL.into_iter().map(SymptomInfo::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TriageReq {
    /// Every answer given so far, in order. An empty list starts a new traversal.
    #[schema(value_type = Vec<Object>)]
    #[serde(default)]
    pub answers: Vec<Answer>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuestionBody {
    #[schema(value_type = String, example = "fit_value")]
    pub node: Node,
    #[schema(value_type = String, example = "fitness_check")]
    pub pathway: Pathway,
    pub prompt: String,
    /// One of `symptoms`, `yes_no`, `integer`, `decimal`.
    pub answer_kind: String,
    pub options: Vec<SymptomInfo>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl From<Question> for QuestionBody {
    fn from(question: Question) -> Self {
        let (answer_kind, options, min, max) = match question.kind {
            AnswerKind::MultiChoice { options } => (
                "symptoms",
                options.into_iter().map(SymptomInfo::from).collect(),
                None,
                None,
            ),
            AnswerKind::YesNo => ("yes_no", Vec::new(), None, None),
            AnswerKind::Integer { min, max } => (
                "integer",
                Vec::new(),
                Some(f64::from(min)),
                Some(f64::from(max)),
            ),
            AnswerKind::Decimal { min, max } => ("decimal", Vec::new(), Some(min), Some(max)),
        };
        Self {
            node: question.node,
            pathway: question.node.pathway(),
            prompt: question.prompt.into(),
            answer_kind: answer_kind.into(),
            options,
            min,
            max,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecommendationBody {
    #[schema(value_type = String, example = "colon_capsule")]
    pub code: Recommendation,
    #[schema(value_type = String, example = "age_symptom_triad")]
    pub pathway: Pathway,
    pub text: String,
}

impl From<Recommendation> for RecommendationBody {
    fn from(recommendation: Recommendation) -> Self {
        Self {
            code: recommendation,
            pathway: recommendation.pathway(),
            text: recommendation.text(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TriageRes {
    /// `question` while the traversal is open, `recommendation` once it has ended.
    pub status: String,
    pub question: Option<QuestionBody>,
    pub recommendation: Option<RecommendationBody>,
    pub notes: Vec<String>,
    #[schema(value_type = Vec<String>)]
    pub path: Vec<Node>,
}

impl From<&TriageSession> for TriageRes {
    fn from(session: &TriageSession) -> Self {
        let recommendation = session.recommendation().map(RecommendationBody::from);
        Self {
            status: if recommendation.is_some() {
                "recommendation".into()
            } else {
                "question".into()
            },
            question: session.current_question().map(QuestionBody::from),
            recommendation,
            notes: session.notes().into_iter().map(|n| n.text().into()).collect(),
            path: session.path().to_vec(),
        }
    }
}
