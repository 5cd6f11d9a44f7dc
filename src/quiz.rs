// src/quiz.rs
//! Multiple-choice and free-text quiz grading.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::{GraderError, Result};
use crate::storage::KeyValueStore;
use crate::widget::Widget;

pub const ONE_CORRECT_OF_MANY: &str = "You've found a correct answer, but not all of them.";
pub const SOME_CORRECT_OF_MORE: &str = "You've found some correct answers, but there are more!";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct QuizOption {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub correct: bool,
    /// Shown when this option is picked.
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Question {
    SingleChoice {
        options: Vec<QuizOption>,
    },
    MultipleChoice {
        options: Vec<QuizOption>,
    },
    Text {
        /// Pattern the whole trimmed answer must match. Without one the
        /// question is free-form and never marked right or wrong.
        #[serde(default)]
        regex_check: Option<String>,
        #[serde(default)]
        correct_feedback: Option<String>,
        #[serde(default)]
        incorrect_feedback: Option<String>,
    },
}

impl Question {
    fn kind(&self) -> &'static str {
        match self {
            Question::SingleChoice { .. } => "single_choice",
            Question::MultipleChoice { .. } => "multiple_choice",
            Question::Text { .. } => "text",
        }
    }

    fn options(&self) -> &[QuizOption] {
        match self {
            Question::SingleChoice { options } | Question::MultipleChoice { options } => options,
            Question::Text { .. } => &[],
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct QuizDefinition {
    /// Quizzes without a name can be graded but their state is not saved.
    #[serde(default)]
    pub name: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub shuffle: bool,
    /// General explanation shown after answering.
    #[serde(default)]
    pub explanation: Option<String>,
    pub question: Question,
}

/// What the learner picked or typed.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizAnswer {
    #[serde(default)]
    pub selected: Vec<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct QuizFeedback {
    /// `None` for free-form answers.
    pub correct: Option<bool>,
    pub feedback: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizState {
    pub answer: QuizAnswer,
    pub submitted: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub id: String,
    pub label: String,
}

/// A question as presented to the learner; correctness is not exposed.
#[derive(Serialize, Debug, Clone)]
pub struct QuizView {
    pub name: Option<String>,
    pub prompt: String,
    pub kind: &'static str,
    pub options: Vec<OptionView>,
    pub state: QuizState,
}

fn full_match(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("^(?:{})$", pattern))?)
}

impl QuizDefinition {
    pub fn storage_key(&self) -> Option<String> {
        self.name.as_ref().map(|name| format!("quiz_{}", name))
    }

    pub(crate) fn check(&self) -> Result<()> {
        let label = self.name.as_deref().unwrap_or("<unnamed>");
        match &self.question {
            Question::SingleChoice { options } | Question::MultipleChoice { options } => {
                if !options.iter().any(|o| o.correct) {
                    return Err(GraderError::Config(format!(
                        "Quiz '{}' has no correct option",
                        label
                    )));
                }
                let mut seen = HashSet::new();
                if let Some(dup) = options.iter().find(|o| !seen.insert(o.id.as_str())) {
                    return Err(GraderError::Config(format!(
                        "Quiz '{}' repeats option id '{}'",
                        label, dup.id
                    )));
                }
            }
            Question::Text { regex_check, .. } => {
                if let Some(pattern) = regex_check {
                    full_match(pattern)?;
                }
            }
        }
        Ok(())
    }

    /// Options in presentation order, shuffled when the quiz asks for it.
    pub fn presented_options(&self) -> Vec<OptionView> {
        let mut options: Vec<OptionView> = self
            .question
            .options()
            .iter()
            .map(|o| OptionView {
                id: o.id.clone(),
                label: o.label.clone(),
            })
            .collect();
        if self.shuffle {
            options.shuffle(&mut rand::rng());
        }
        options
    }

    fn selected_options<'a>(
        &self,
        options: &'a [QuizOption],
        answer: &QuizAnswer,
    ) -> Result<Vec<&'a QuizOption>> {
        if answer.selected.is_empty() {
            return Err(GraderError::InvalidSubmission("no option selected".to_string()));
        }
        answer
            .selected
            .iter()
            .map(|id| {
                options.iter().find(|o| &o.id == id).ok_or_else(|| {
                    GraderError::InvalidSubmission(format!("unknown option '{}'", id))
                })
            })
            .collect()
    }

    pub fn grade(&self, answer: &QuizAnswer) -> Result<QuizFeedback> {
        match &self.question {
            Question::SingleChoice { options } => {
                let selected = self.selected_options(options, answer)?;
                if selected.len() > 1 {
                    return Err(GraderError::InvalidSubmission(
                        "only one option may be selected".to_string(),
                    ));
                }
                let choice = selected[0];
                Ok(QuizFeedback {
                    correct: Some(choice.correct),
                    feedback: choice.feedback.iter().cloned().collect(),
                    partial: None,
                    explanation: self.explanation.clone(),
                })
            }
            Question::MultipleChoice { options } => {
                let selected = self.selected_options(options, answer)?;
                let selected_ids: HashSet<&str> = selected.iter().map(|o| o.id.as_str()).collect();
                let correct_ids: HashSet<&str> = options
                    .iter()
                    .filter(|o| o.correct)
                    .map(|o| o.id.as_str())
                    .collect();

                let found = selected_ids.intersection(&correct_ids).count();
                let partial = if found > 0 && found < correct_ids.len() {
                    let message = if found == 1 {
                        ONE_CORRECT_OF_MANY
                    } else {
                        SOME_CORRECT_OF_MORE
                    };
                    Some(message.to_string())
                } else {
                    None
                };

                Ok(QuizFeedback {
                    correct: Some(selected_ids == correct_ids),
                    feedback: options
                        .iter()
                        .filter(|o| selected_ids.contains(o.id.as_str()))
                        .filter_map(|o| o.feedback.clone())
                        .collect(),
                    partial,
                    explanation: self.explanation.clone(),
                })
            }
            Question::Text {
                regex_check,
                correct_feedback,
                incorrect_feedback,
            } => {
                let text = answer
                    .text
                    .as_deref()
                    .ok_or_else(|| GraderError::InvalidSubmission("text answer missing".to_string()))?;

                let Some(pattern) = regex_check else {
                    return Ok(QuizFeedback {
                        correct: None,
                        feedback: Vec::new(),
                        partial: None,
                        explanation: self.explanation.clone(),
                    });
                };

                let is_correct = full_match(pattern)?.is_match(text.trim());
                let feedback = if is_correct { correct_feedback } else { incorrect_feedback };
                Ok(QuizFeedback {
                    correct: Some(is_correct),
                    feedback: feedback.iter().cloned().collect(),
                    partial: None,
                    explanation: if is_correct { None } else { self.explanation.clone() },
                })
            }
        }
    }
}

/// A quiz bound to a store for the lifetime of one interaction.
pub struct QuizWidget {
    definition: QuizDefinition,
    store: Arc<dyn KeyValueStore>,
}

impl QuizWidget {
    pub fn new(definition: QuizDefinition, store: Arc<dyn KeyValueStore>) -> Self {
        Self { definition, store }
    }

    pub async fn save_state(&self, state: &QuizState) -> Result<()> {
        let Some(key) = self.definition.storage_key() else {
            log::warn!("Quiz is missing a name; state will not be saved");
            return Ok(());
        };
        self.store.set(&key, &serde_json::to_string(state)?).await
    }

    /// Previously saved state, if any. Unreadable state is logged and ignored.
    pub async fn restore_state(&self) -> Result<Option<QuizState>> {
        let Some(key) = self.definition.storage_key() else {
            return Ok(None);
        };
        let Some(saved) = self.store.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&saved) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                log::error!("Error restoring quiz state for {}: {}", key, e);
                Ok(None)
            }
        }
    }

    fn view(&self, state: QuizState) -> QuizView {
        QuizView {
            name: self.definition.name.clone(),
            prompt: self.definition.prompt.clone(),
            kind: self.definition.question.kind(),
            options: self.definition.presented_options(),
            state,
        }
    }
}

#[async_trait]
impl Widget for QuizWidget {
    type View = QuizView;
    type Submission = QuizAnswer;
    type Outcome = QuizFeedback;

    async fn render(&self) -> Result<QuizView> {
        let state = self.restore_state().await?.unwrap_or_default();
        Ok(self.view(state))
    }

    async fn handle_submit(&self, answer: QuizAnswer) -> Result<QuizFeedback> {
        let feedback = self.definition.grade(&answer)?;
        self.save_state(&QuizState {
            answer,
            submitted: true,
        })
        .await?;
        Ok(feedback)
    }

    async fn handle_reset(&self) -> Result<QuizView> {
        let state = QuizState::default();
        self.save_state(&state).await?;
        Ok(self.view(state))
    }
}
