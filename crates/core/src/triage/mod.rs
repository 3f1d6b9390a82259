//! Lower GI referral triage.
//!
//! The decision tree is an explicit finite-state machine: [`Node`] enumerates the questions,
//! [`transition`] is the pure step function, and [`TriageSession`] drives one traversal.
//! The tree is acyclic and every reachable combination of answers ends in exactly one
//! [`Recommendation`]; combinations without a pathway rule end in
//! [`Recommendation::CheckLocalGuidelines`].

mod session;
mod tree;

pub use session::TriageSession;
pub use tree::{age_bleeding_recommendation, transition};

use crate::constants::{
    COLON_CAPSULE_WEEKLY_CAPACITY, FIT_MAX, FIT_MIN, TRIAGE_AGE_MAX, TRIAGE_AGE_MIN,
};
use crate::{CdsError, CdsResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Symptoms
// ============================================================================

/// Presenting symptom categories on the referral form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symptom {
    ChangeInBowelHabit,
    RectalBleeding,
    AbdominalPain,
    WeightLoss,
    AbdominalMass,
    IronDeficiencyAnaemia,
    Anaemia,
    Thrombocytosis,
    RectalMass,
    AnalMass,
    AnalUlceration,
}

impl Symptom {
    pub const ALL: [Symptom; 11] = [
        Symptom::ChangeInBowelHabit,
        Symptom::RectalBleeding,
        Symptom::AbdominalPain,
        Symptom::WeightLoss,
        Symptom::AbdominalMass,
        Symptom::IronDeficiencyAnaemia,
        Symptom::Anaemia,
        Symptom::Thrombocytosis,
        Symptom::RectalMass,
        Symptom::AnalMass,
        Symptom::AnalUlceration,
    ];

    /// Symptoms that bypass FIT and go straight to the rectal/anal mass pathway.
    pub const MASS_OR_ULCERATION: [Symptom; 3] =
        [Symptom::RectalMass, Symptom::AnalMass, Symptom::AnalUlceration];

    /// Position on the referral form, starting at 1.
    pub fn number(self) -> usize {
        Symptom::ALL
            .iter()
            .position(|s| *s == self)
            .map_or(0, |i| i + 1)
    }

    /// Wire code, matching the serde representation.
    pub fn code(self) -> &'static str {
        match self {
            Symptom::ChangeInBowelHabit => "change_in_bowel_habit",
            Symptom::RectalBleeding => "rectal_bleeding",
            Symptom::AbdominalPain => "abdominal_pain",
            Symptom::WeightLoss => "weight_loss",
            Symptom::AbdominalMass => "abdominal_mass",
            Symptom::IronDeficiencyAnaemia => "iron_deficiency_anaemia",
            Symptom::Anaemia => "anaemia",
            Symptom::Thrombocytosis => "thrombocytosis",
            Symptom::RectalMass => "rectal_mass",
            Symptom::AnalMass => "anal_mass",
            Symptom::AnalUlceration => "anal_ulceration",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Symptom::ChangeInBowelHabit => "1. Change in bowel habit",
            Symptom::RectalBleeding => "2. Rectal bleeding",
            Symptom::AbdominalPain => "3. Abdominal pain",
            Symptom::WeightLoss => "4. Unexplained weight loss",
            Symptom::AbdominalMass => "5. Abdominal mass",
            Symptom::IronDeficiencyAnaemia => "6. Iron deficiency anaemia (IDA)",
            Symptom::Anaemia => "7. Anaemia without iron deficiency",
            Symptom::Thrombocytosis => "8. Thrombocytosis",
            Symptom::RectalMass => "9. Rectal mass",
            Symptom::AnalMass => "10. Anal mass",
            Symptom::AnalUlceration => "11. Anal ulceration",
        }
    }
}

impl fmt::Display for Symptom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Symptom {
    type Err = CdsError;

    /// Accepts the form number (`"9"`), the full label (`"9. Rectal mass"`) or the snake_case
    /// code (`"rectal_mass"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if let Ok(n) = wanted.parse::<usize>() {
            if let Some(symptom) = n.checked_sub(1).and_then(|i| Symptom::ALL.get(i)) {
                return Ok(*symptom);
            }
        }
        Symptom::ALL
            .into_iter()
            .find(|sym| {
                sym.label().eq_ignore_ascii_case(wanted)
                    || sym.code() == wanted
            })
            .ok_or_else(|| CdsError::UnknownSymptom(s.to_string()))
    }
}

// ============================================================================
// Nodes, questions and answers
// ============================================================================

/// Decision nodes of the triage tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// Start: symptom multi-select.
    Symptoms,
    /// Rectal/anal mass pathway: suitability for flexible sigmoidoscopy.
    FosSuitability,
    /// Fitness check: FIT and ferritin done?
    FitAndFerritinDone,
    FitValue,
    /// FIT below 10 (or not done): return to referrer?
    ReturnToReferrer,
    /// FIT at or above 10: high-risk features?
    HighRisk,
    /// Telephone triage: suitability for endoscopy.
    EndoscopySuitability,
    /// FIT at or above 100: suitability for colonoscopy.
    ColonoscopySuitability,
    Age,
    RectalBleeding,
}

/// Named pathway a node or recommendation belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pathway {
    Start,
    RectalAnalMass,
    FitnessCheck,
    FitBelow10,
    FitHigh,
    TelephoneTriage,
    HighFit,
    AgeSymptomTriad,
}

impl Node {
    pub fn pathway(self) -> Pathway {
        match self {
            Node::Symptoms => Pathway::Start,
            Node::FosSuitability => Pathway::RectalAnalMass,
            Node::FitAndFerritinDone | Node::FitValue => Pathway::FitnessCheck,
            Node::ReturnToReferrer => Pathway::FitBelow10,
            Node::HighRisk => Pathway::FitHigh,
            Node::EndoscopySuitability => Pathway::TelephoneTriage,
            Node::ColonoscopySuitability => Pathway::HighFit,
            Node::Age | Node::RectalBleeding => Pathway::AgeSymptomTriad,
        }
    }

    /// The question presented at this node, with its answer constraints.
    pub fn question(self) -> Question {
        let (prompt, kind) = match self {
            Node::Symptoms => (
                "Which symptoms does the patient have? Select all that apply.",
                AnswerKind::MultiChoice {
                    options: Symptom::ALL.to_vec(),
                },
            ),
            Node::FosSuitability => (
                "Is the patient suitable for flexible sigmoidoscopy (FOS)?",
                AnswerKind::YesNo,
            ),
            Node::FitAndFerritinDone => (
                "Have a FIT test and ferritin been done?",
                AnswerKind::YesNo,
            ),
            Node::FitValue => (
                "What is the FIT result (µg Hb/g faeces)?",
                AnswerKind::Decimal {
                    min: FIT_MIN,
                    max: FIT_MAX,
                },
            ),
            Node::ReturnToReferrer => (
                "Should the referral be returned to the referrer?",
                AnswerKind::YesNo,
            ),
            Node::HighRisk => (
                "Does the patient have performance status 3 or 4, significant comorbidity or \
                 dementia, or are they aged 80 or over?",
                AnswerKind::YesNo,
            ),
            Node::EndoscopySuitability => (
                "Following telephone triage, is the patient suitable for endoscopy?",
                AnswerKind::YesNo,
            ),
            Node::ColonoscopySuitability => (
                "Is the patient suitable for colonoscopy?",
                AnswerKind::YesNo,
            ),
            Node::Age => (
                "What is the patient's age in years?",
                AnswerKind::Integer {
                    min: TRIAGE_AGE_MIN,
                    max: TRIAGE_AGE_MAX,
                },
            ),
            Node::RectalBleeding => ("Does the patient have rectal bleeding?", AnswerKind::YesNo),
        };

        Question {
            node: self,
            prompt,
            kind,
        }
    }
}

/// Constraints on the answer to a question.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerKind {
    MultiChoice { options: Vec<Symptom> },
    YesNo,
    Integer { min: u32, max: u32 },
    Decimal { min: f64, max: f64 },
}

impl AnswerKind {
    fn name(&self) -> &'static str {
        match self {
            AnswerKind::MultiChoice { .. } => "symptoms",
            AnswerKind::YesNo => "yes_no",
            AnswerKind::Integer { .. } => "integer",
            AnswerKind::Decimal { .. } => "decimal",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Question {
    pub node: Node,
    pub prompt: &'static str,
    pub kind: AnswerKind,
}

impl Question {
    /// Check an answer against this question's kind and bounds.
    ///
    /// A decimal question also accepts a whole-number answer.
    ///
    /// # Errors
    ///
    /// Returns [`CdsError::AnswerMismatch`] for the wrong kind of answer and
    /// [`CdsError::InvalidInput`] for a value outside the bounds.
    pub fn validate(&self, answer: &Answer) -> CdsResult<()> {
        match (&self.kind, answer) {
            (AnswerKind::MultiChoice { .. }, Answer::Symptoms(_)) => Ok(()),
            (AnswerKind::YesNo, Answer::YesNo(_)) => Ok(()),
            (AnswerKind::Integer { min, max }, Answer::Integer(value)) => {
                if (*min..=*max).contains(value) {
                    Ok(())
                } else {
                    Err(CdsError::InvalidInput(format!(
                        "{value} is outside {min}..={max}"
                    )))
                }
            }
            (AnswerKind::Decimal { min, max }, answer @ (Answer::Decimal(_) | Answer::Integer(_))) => {
                let value = answer.as_decimal().unwrap_or(f64::NAN);
                if value.is_finite() && (*min..=*max).contains(&value) {
                    Ok(())
                } else {
                    Err(CdsError::InvalidInput(format!(
                        "{value} is outside {min}..={max}"
                    )))
                }
            }
            (kind, answer) => Err(CdsError::AnswerMismatch {
                expected: kind.name(),
                received: answer.kind_name(),
            }),
        }
    }
}

/// A response to a [`Question`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Symptoms(BTreeSet<Symptom>),
    YesNo(bool),
    Integer(u32),
    Decimal(f64),
}

impl Answer {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Answer::Symptoms(_) => "symptoms",
            Answer::YesNo(_) => "yes_no",
            Answer::Integer(_) => "integer",
            Answer::Decimal(_) => "decimal",
        }
    }

    pub(crate) fn as_decimal(&self) -> Option<f64> {
        match self {
            Answer::Decimal(v) => Some(*v),
            Answer::Integer(v) => Some(f64::from(*v)),
            _ => None,
        }
    }
}

// ============================================================================
// Traversal state and outputs
// ============================================================================

/// What has been learned so far in a traversal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Findings {
    pub symptoms: BTreeSet<Symptom>,
    pub fit_value: Option<f64>,
    pub age: Option<u32>,
}

impl Findings {
    pub fn has_mass_or_ulceration(&self) -> bool {
        Symptom::MASS_OR_ULCERATION
            .iter()
            .any(|s| self.symptoms.contains(s))
    }

    /// Informational notes raised by the symptom selection. None are raised on the mass
    /// pathway.
    pub fn notes(&self) -> Vec<Note> {
        if self.has_mass_or_ulceration() {
            return Vec::new();
        }
        let mut notes = Vec::new();
        if self.symptoms.contains(&Symptom::AbdominalMass) {
            notes.push(Note::AbdominalMass);
        }
        if self.symptoms.contains(&Symptom::IronDeficiencyAnaemia) {
            notes.push(Note::IronDeficiencyAnaemia);
        }
        notes
    }
}

/// Position in the tree together with the findings gathered to reach it.
#[derive(Clone, Debug, PartialEq)]
pub struct TriageState {
    pub node: Node,
    pub findings: Findings,
}

impl TriageState {
    pub fn start() -> Self {
        Self {
            node: Node::Symptoms,
            findings: Findings::default(),
        }
    }
}

impl Default for TriageState {
    fn default() -> Self {
        Self::start()
    }
}

/// Result of the pure [`transition`] function.
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    Next(TriageState),
    Terminal(Recommendation),
}

/// Result of answering a question in a [`TriageSession`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum NodeResult {
    NextQuestion(Question),
    Terminal(Recommendation),
}

/// Non-branching advisory raised by the symptom selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Note {
    AbdominalMass,
    IronDeficiencyAnaemia,
}

impl Note {
    pub fn text(self) -> &'static str {
        match self {
            Note::AbdominalMass => {
                "Abdominal mass: consider urgent CT abdomen and pelvis alongside this pathway."
            }
            Note::IronDeficiencyAnaemia => {
                "Iron deficiency anaemia: consider upper GI investigation (OGD) alongside \
                 lower GI assessment."
            }
        }
    }
}

/// Terminal recommendation of a traversal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    UrgentFlexibleSigmoidoscopy,
    TelephoneTriageOrColorectalClinic,
    LetterToPrimaryCare,
    LocalFitNegativePathway,
    FollowFitAlgorithm,
    CtcOrUrgentColorectalClinic,
    HighFitColonoscopy,
    CtcOrAlternativeImaging,
    ColonCapsule,
    Colonoscopy,
    CtcOrColonoscopy,
    ColonoscopyPreferred,
    CheckLocalGuidelines,
}

impl Recommendation {
    pub fn pathway(self) -> Pathway {
        match self {
            Recommendation::UrgentFlexibleSigmoidoscopy
            | Recommendation::TelephoneTriageOrColorectalClinic => Pathway::RectalAnalMass,
            Recommendation::LetterToPrimaryCare | Recommendation::LocalFitNegativePathway => {
                Pathway::FitBelow10
            }
            Recommendation::FollowFitAlgorithm | Recommendation::CtcOrUrgentColorectalClinic => {
                Pathway::TelephoneTriage
            }
            Recommendation::HighFitColonoscopy | Recommendation::CtcOrAlternativeImaging => {
                Pathway::HighFit
            }
            Recommendation::ColonCapsule
            | Recommendation::Colonoscopy
            | Recommendation::CtcOrColonoscopy
            | Recommendation::ColonoscopyPreferred
            | Recommendation::CheckLocalGuidelines => Pathway::AgeSymptomTriad,
        }
    }

    pub fn text(self) -> String {
        match self {
            Recommendation::UrgentFlexibleSigmoidoscopy => {
                "Book urgent flexible sigmoidoscopy (FOS).".into()
            }
            Recommendation::TelephoneTriageOrColorectalClinic => {
                "Not suitable for FOS: arrange telephone triage or a colorectal outpatient \
                 appointment (CR OPA)."
                    .into()
            }
            Recommendation::LetterToPrimaryCare => {
                "Return to referrer: send a letter to primary care with FIT/ferritin advice and \
                 safety-netting."
                    .into()
            }
            Recommendation::LocalFitNegativePathway => {
                "Do not return: manage through the local FIT-negative pathway.".into()
            }
            Recommendation::FollowFitAlgorithm => {
                "Suitable for endoscopy: follow the Q4/Q5 FIT algorithm to choose the test.".into()
            }
            Recommendation::CtcOrUrgentColorectalClinic => {
                "Not suitable for endoscopy: arrange CTC/CTAP or an urgent colorectal outpatient \
                 appointment (CR OPA)."
                    .into()
            }
            Recommendation::HighFitColonoscopy => "Book colonoscopy.".into(),
            Recommendation::CtcOrAlternativeImaging => {
                "Not suitable for colonoscopy: arrange CTC or alternative imaging.".into()
            }
            Recommendation::ColonCapsule => format!(
                "Colon capsule endoscopy (capacity {COLON_CAPSULE_WEEKLY_CAPACITY} per week); \
                 otherwise colonoscopy."
            ),
            Recommendation::Colonoscopy => "Colonoscopy.".into(),
            Recommendation::CtcOrColonoscopy => {
                "CTC or colonoscopy, according to clinical judgement.".into()
            }
            Recommendation::ColonoscopyPreferred => {
                "Colonoscopy preferred; CTC if colonoscopy is not appropriate.".into()
            }
            Recommendation::CheckLocalGuidelines => {
                "No pathway rule covers this combination of age and symptoms: check local \
                 guidelines."
                    .into()
            }
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}
