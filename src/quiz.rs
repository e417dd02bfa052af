use std::collections::HashMap;

use serde::Serialize;

use crate::models::Question;

/// Quiz session errors.
#[derive(Debug, PartialEq, Eq)]
pub enum QuizError {
    /// A quiz content record must carry at least one question; an
    /// empty sequence is an authoring bug, not a runtime condition.
    NoQuestions,
    /// `advance` was called while the current question has no
    /// recorded answer. The session state is unchanged.
    CurrentQuestionUnanswered,
}

impl std::fmt::Display for QuizError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuizError::NoQuestions => write!(f, "quiz has no questions"),
            QuizError::CurrentQuestionUnanswered => {
                write!(f, "the current question must be answered before advancing")
            }
        }
    }
}

impl std::error::Error for QuizError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuizState {
    Answering(usize),
    Results,
}

/// Outcome of a successful `advance` call.
#[derive(Debug, PartialEq, Eq)]
pub enum Advance {
    /// Moved on to the question at this index.
    Next(usize),
    /// Entered the results state. `emit_completion` is true exactly
    /// once per session lifetime: the first time results are reached
    /// on a session that was not already completed beforehand.
    Finished { emit_completion: bool },
}

/// Score computed fresh from the answer map on entering results.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
    pub percent: u32,
}

/// In-memory scoring state machine for one quiz-taking session.
///
/// Single-threaded and synchronous; nothing is persisted between
/// sessions. The machine moves `Answering(0) .. Answering(n-1)` →
/// `Results`, and `retry` is the only transition out of results,
/// back to a clean `Answering(0)`.
#[derive(Debug)]
pub struct QuizSession {
    questions: Vec<Question>,
    answers: HashMap<usize, String>,
    state: QuizState,
    completion_emitted: bool,
}

impl QuizSession {
    /// Start a session over `questions`. `already_completed` marks
    /// the content as completed before this session began, which
    /// suppresses the completion signal entirely.
    pub fn new(questions: Vec<Question>, already_completed: bool) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        Ok(QuizSession {
            questions,
            answers: HashMap::new(),
            state: QuizState::Answering(0),
            completion_emitted: already_completed,
        })
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Index of the question currently being answered, or None in
    /// the results state.
    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            QuizState::Answering(idx) => Some(idx),
            QuizState::Results => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == QuizState::Results
    }

    pub fn answer_for(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).map(String::as_str)
    }

    /// Record `label` for the current question, overwriting any prior
    /// choice. No-op once the session is showing results.
    pub fn select_option(&mut self, label: impl Into<String>) {
        if let QuizState::Answering(idx) = self.state {
            self.answers.insert(idx, label.into());
        }
    }

    /// Move to the next question, or to results on the last one.
    ///
    /// Rejected while the current question is unanswered; every
    /// question must be answered, no skipping. On the transition into
    /// results the caller learns whether to forward a completion
    /// signal to the progress tracker — at most once per session,
    /// retries included.
    pub fn advance(&mut self) -> Result<Advance, QuizError> {
        let idx = match self.state {
            QuizState::Answering(idx) => idx,
            QuizState::Results => return Ok(Advance::Finished { emit_completion: false }),
        };

        if !self.answers.contains_key(&idx) {
            return Err(QuizError::CurrentQuestionUnanswered);
        }

        if idx + 1 == self.questions.len() {
            self.state = QuizState::Results;
            let emit_completion = !self.completion_emitted;
            self.completion_emitted = true;
            Ok(Advance::Finished { emit_completion })
        } else {
            self.state = QuizState::Answering(idx + 1);
            Ok(Advance::Next(idx + 1))
        }
    }

    /// From results back to a fresh `Answering(0)` with the answer
    /// map cleared. The completion latch is deliberately not reset.
    pub fn retry(&mut self) {
        self.answers.clear();
        self.state = QuizState::Answering(0);
    }

    /// Recompute the score from the answer map. Percent is rounded to
    /// the nearest integer.
    pub fn score(&self) -> QuizScore {
        let total = self.questions.len();
        let correct = self
            .questions
            .iter()
            .enumerate()
            .filter(|(i, q)| {
                self.answers
                    .get(i)
                    .is_some_and(|answer| q.is_correct(answer))
            })
            .count();
        let percent = ((correct as f64 / total as f64) * 100.0).round() as u32;
        QuizScore {
            correct,
            total,
            percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionOption;

    fn question(id: &str, correct: &str) -> Question {
        Question {
            id: id.to_string(),
            text: format!("Question {id}"),
            options: vec![
                QuestionOption {
                    label: "A".to_string(),
                    text: "First".to_string(),
                },
                QuestionOption {
                    label: "B".to_string(),
                    text: "Second".to_string(),
                },
                QuestionOption {
                    label: "C".to_string(),
                    text: "Third".to_string(),
                },
            ],
            correct_answer: correct.to_string(),
        }
    }

    #[test]
    fn empty_question_list_is_a_configuration_error() {
        assert_eq!(
            QuizSession::new(vec![], false).unwrap_err(),
            QuizError::NoQuestions
        );
    }

    #[test]
    fn half_correct_scores_fifty_percent() {
        let mut session =
            QuizSession::new(vec![question("q1", "A"), question("q2", "B")], false).unwrap();

        session.select_option("A");
        assert_eq!(session.advance().unwrap(), Advance::Next(1));
        session.select_option("C");
        assert_eq!(
            session.advance().unwrap(),
            Advance::Finished { emit_completion: true }
        );

        let score = session.score();
        assert_eq!(score.correct, 1);
        assert_eq!(score.total, 2);
        assert_eq!(score.percent, 50);
    }

    #[test]
    fn advance_without_answer_is_rejected_and_state_unchanged() {
        let mut session =
            QuizSession::new(vec![question("q1", "A"), question("q2", "B")], false).unwrap();

        assert_eq!(
            session.advance().unwrap_err(),
            QuizError::CurrentQuestionUnanswered
        );
        assert_eq!(session.current_index(), Some(0));

        session.select_option("B");
        session.advance().unwrap();
        assert_eq!(
            session.advance().unwrap_err(),
            QuizError::CurrentQuestionUnanswered
        );
        assert_eq!(session.current_index(), Some(1));
    }

    #[test]
    fn selecting_again_overwrites_the_previous_choice() {
        let mut session = QuizSession::new(vec![question("q1", "B")], false).unwrap();
        session.select_option("A");
        session.select_option("B");
        assert_eq!(session.answer_for(0), Some("B"));
        session.advance().unwrap();
        assert_eq!(session.score().correct, 1);
    }

    #[test]
    fn select_option_is_a_no_op_in_results() {
        let mut session = QuizSession::new(vec![question("q1", "A")], false).unwrap();
        session.select_option("A");
        session.advance().unwrap();
        session.select_option("B");
        assert_eq!(session.answer_for(0), Some("A"));
    }

    #[test]
    fn retry_resets_answers_but_not_the_completion_latch() {
        let mut session =
            QuizSession::new(vec![question("q1", "A"), question("q2", "B")], false).unwrap();

        session.select_option("A");
        session.advance().unwrap();
        session.select_option("B");
        assert_eq!(
            session.advance().unwrap(),
            Advance::Finished { emit_completion: true }
        );

        session.retry();
        assert_eq!(session.current_index(), Some(0));
        assert_eq!(session.answer_for(0), None);
        assert_eq!(session.answer_for(1), None);

        session.select_option("A");
        session.advance().unwrap();
        session.select_option("B");
        // Second pass must not emit again.
        assert_eq!(
            session.advance().unwrap(),
            Advance::Finished { emit_completion: false }
        );
        assert_eq!(session.score().percent, 100);
    }

    #[test]
    fn already_completed_session_never_emits() {
        let mut session = QuizSession::new(vec![question("q1", "A")], true).unwrap();
        session.select_option("A");
        assert_eq!(
            session.advance().unwrap(),
            Advance::Finished { emit_completion: false }
        );
    }

    #[test]
    fn percent_is_rounded() {
        let mut session = QuizSession::new(
            vec![question("q1", "A"), question("q2", "A"), question("q3", "A")],
            false,
        )
        .unwrap();
        session.select_option("A");
        session.advance().unwrap();
        session.select_option("B");
        session.advance().unwrap();
        session.select_option("B");
        session.advance().unwrap();
        // 1 of 3 => 33.33..% rounds to 33.
        assert_eq!(session.score().percent, 33);
    }
}
