use super::{Answer, Node, Recommendation, Symptom, Transition, TriageState};
use crate::constants::{FIT_HIGH_THRESHOLD, FIT_POSITIVE_THRESHOLD};
use crate::{CdsError, CdsResult};
use std::collections::BTreeSet;

/// Advance the tree by one answer.
///
/// Pure: the input state is untouched and the result is either the next state or a terminal
/// recommendation. Only the answer's kind is checked here; bounds belong to
/// [`super::Question::validate`].
///
/// # Errors
///
/// Returns [`CdsError::AnswerMismatch`] when the answer is not the kind the node asks for.
pub fn transition(state: &TriageState, answer: &Answer) -> CdsResult<Transition> {
    let findings = &state.findings;
    let next = |node: Node| -> Transition {
        Transition::Next(TriageState {
            node,
            findings: findings.clone(),
        })
    };

    let outcome = match state.node {
        Node::Symptoms => {
            let symptoms = expect_symptoms(answer)?;
            let mut next_state = TriageState {
                node: Node::FitAndFerritinDone,
                findings: findings.clone(),
            };
            next_state.findings.symptoms = symptoms;
            if next_state.findings.has_mass_or_ulceration() {
                next_state.node = Node::FosSuitability;
            }
            Transition::Next(next_state)
        }

        Node::FosSuitability => Transition::Terminal(if expect_yes_no(answer)? {
            Recommendation::UrgentFlexibleSigmoidoscopy
        } else {
            Recommendation::TelephoneTriageOrColorectalClinic
        }),

        Node::FitAndFerritinDone => {
            if expect_yes_no(answer)? {
                next(Node::FitValue)
            } else if findings.has_mass_or_ulceration() {
                next(Node::FosSuitability)
            } else {
                next(Node::ReturnToReferrer)
            }
        }

        Node::FitValue => {
            let value = answer.as_decimal().ok_or(CdsError::AnswerMismatch {
                expected: "decimal",
                received: answer.kind_name(),
            })?;
            let mut next_state = TriageState {
                node: if value >= FIT_POSITIVE_THRESHOLD {
                    Node::HighRisk
                } else {
                    Node::ReturnToReferrer
                },
                findings: findings.clone(),
            };
            next_state.findings.fit_value = Some(value);
            Transition::Next(next_state)
        }

        Node::ReturnToReferrer => Transition::Terminal(if expect_yes_no(answer)? {
            Recommendation::LetterToPrimaryCare
        } else {
            Recommendation::LocalFitNegativePathway
        }),

        Node::HighRisk => {
            if expect_yes_no(answer)? {
                next(Node::EndoscopySuitability)
            } else if findings
                .fit_value
                .is_some_and(|fit| fit >= FIT_HIGH_THRESHOLD)
            {
                next(Node::ColonoscopySuitability)
            } else {
                next(Node::Age)
            }
        }

        Node::EndoscopySuitability => Transition::Terminal(if expect_yes_no(answer)? {
            Recommendation::FollowFitAlgorithm
        } else {
            Recommendation::CtcOrUrgentColorectalClinic
        }),

        Node::ColonoscopySuitability => {
            Transition::Terminal(if expect_yes_no(answer)? {
                Recommendation::HighFitColonoscopy
            } else {
                Recommendation::CtcOrAlternativeImaging
            })
        }

        Node::Age => {
            let Answer::Integer(age) = answer else {
                return Err(CdsError::AnswerMismatch {
                    expected: "integer",
                    received: answer.kind_name(),
                });
            };
            let mut next_state = TriageState {
                node: Node::RectalBleeding,
                findings: findings.clone(),
            };
            next_state.findings.age = Some(*age);
            Transition::Next(next_state)
        }

        Node::RectalBleeding => {
            let bleeding = expect_yes_no(answer)?;
            Transition::Terminal(match findings.age {
                Some(age) => age_bleeding_recommendation(age, bleeding),
                None => Recommendation::CheckLocalGuidelines,
            })
        }
    };

    match &outcome {
        Transition::Next(s) => tracing::debug!("triage {:?} -> {:?}", state.node, s.node),
        Transition::Terminal(r) => tracing::debug!("triage {:?} -> terminal {:?}", state.node, r),
    }

    Ok(outcome)
}

/// Recommendation for a FIT of 10-99 without high-risk features.
///
/// Age <40 without bleeding and 40-59 with bleeding, plus both 60+ rows, have a rule. The
/// remaining combinations (<40 with bleeding, 40-59 without) have none and return
/// [`Recommendation::CheckLocalGuidelines`].
pub fn age_bleeding_recommendation(age: u32, rectal_bleeding: bool) -> Recommendation {
    match (age, rectal_bleeding) {
        (0..=39, false) => Recommendation::ColonCapsule,
        (40..=59, true) => Recommendation::Colonoscopy,
        (60.., true) => Recommendation::CtcOrColonoscopy,
        (60.., false) => Recommendation::ColonoscopyPreferred,
        _ => Recommendation::CheckLocalGuidelines,
    }
}

fn expect_symptoms(answer: &Answer) -> CdsResult<BTreeSet<Symptom>> {
    match answer {
        Answer::Symptoms(symptoms) => Ok(symptoms.clone()),
        other => Err(CdsError::AnswerMismatch {
            expected: "symptoms",
            received: other.kind_name(),
        }),
    }
}

fn expect_yes_no(answer: &Answer) -> CdsResult<bool> {
    match answer {
        Answer::YesNo(value) => Ok(*value),
        other => Err(CdsError::AnswerMismatch {
            expected: "yes_no",
            received: other.kind_name(),
        }),
    }
}
