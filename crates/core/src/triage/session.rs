use super::{
    transition, Answer, Findings, Node, NodeResult, Note, Question, Recommendation, Transition,
    TriageState,
};
use crate::{CdsError, CdsResult};

/// One clinician's walk through the triage tree.
///
/// Sessions share nothing: each holds its own state and is dropped once the recommendation
/// has been shown.
#[derive(Clone, Debug)]
pub struct TriageSession {
    state: TriageState,
    path: Vec<Node>,
    outcome: Option<Recommendation>,
}

impl TriageSession {
    pub fn new() -> Self {
        Self {
            state: TriageState::start(),
            path: vec![Node::Symptoms],
            outcome: None,
        }
    }

    /// Rebuild a session by applying `answers` in order from the start.
    ///
    /// Lets a stateless shell resubmit every answer given so far instead of holding a
    /// session between requests.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, or [`CdsError::SessionComplete`] if answers remain
    /// after a recommendation was reached.
    pub fn replay<I>(answers: I) -> CdsResult<Self>
    where
        I: IntoIterator<Item = Answer>,
    {
        let mut session = Self::new();
        for answer in answers {
            session.answer(answer)?;
        }
        Ok(session)
    }

    /// The question awaiting an answer, or `None` once a recommendation has been made.
    pub fn current_question(&self) -> Option<Question> {
        if self.outcome.is_some() {
            None
        } else {
            Some(self.state.node.question())
        }
    }

    /// Validate `response` against the current question and advance.
    ///
    /// # Errors
    ///
    /// Returns [`CdsError::SessionComplete`] after a recommendation, otherwise any error from
    /// [`Question::validate`]. A rejected answer leaves the session unchanged.
    pub fn answer(&mut self, response: Answer) -> CdsResult<NodeResult> {
        if self.outcome.is_some() {
            return Err(CdsError::SessionComplete);
        }

        self.state.node.question().validate(&response)?;

        match transition(&self.state, &response)? {
            Transition::Next(state) => {
                let question = state.node.question();
                self.path.push(state.node);
                self.state = state;
                Ok(NodeResult::NextQuestion(question))
            }
            Transition::Terminal(recommendation) => {
                tracing::info!(
                    "triage recommendation {:?} via {:?}",
                    recommendation,
                    recommendation.pathway()
                );
                self.outcome = Some(recommendation);
                Ok(NodeResult::Terminal(recommendation))
            }
        }
    }

    pub fn recommendation(&self) -> Option<Recommendation> {
        self.outcome
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    /// Nodes visited so far, starting with the symptom question.
    pub fn path(&self) -> &[Node] {
        &self.path
    }

    pub fn findings(&self) -> &Findings {
        &self.state.findings
    }

    pub fn notes(&self) -> Vec<Note> {
        self.state.findings.notes()
    }
}

impl Default for TriageSession {
    fn default() -> Self {
        Self::new()
    }
}
