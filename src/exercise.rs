// src/exercise.rs
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::config::ExerciseConfig;
use crate::errors::Result;
use crate::grader::ParsedReport;
use crate::runner::{ReportSink, Runner};
use crate::storage::KeyValueStore;
use crate::widget::Widget;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ExerciseView {
    pub name: Option<String>,
    pub code: String,
}

/// A code exercise for one interaction: the learner's stored code, the
/// starter code to fall back to, and the runner used to grade it.
pub struct CodeExercise {
    name: Option<String>,
    starter_code: String,
    store: Arc<dyn KeyValueStore>,
    runner: Runner,
    sink: Arc<dyn ReportSink>,
}

/// Starter code embedded in HTML arrives with `>` escaped, which would
/// break the doctest prompts.
pub fn unescape_starter_code(markup: &str) -> String {
    markup.trim().replace("&gt;", ">")
}

impl CodeExercise {
    pub fn new(
        name: Option<String>,
        starter_code: impl Into<String>,
        store: Arc<dyn KeyValueStore>,
        runner: Runner,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            name,
            starter_code: starter_code.into(),
            store,
            runner,
            sink,
        }
    }

    pub fn from_config(
        config: &ExerciseConfig,
        store: Arc<dyn KeyValueStore>,
        runner: Runner,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self::new(
            Some(config.name.clone()),
            unescape_starter_code(&config.starter_code),
            store,
            runner,
            sink,
        )
    }

    pub fn storage_key(&self) -> Option<String> {
        self.name.as_ref().map(|name| format!("{}-repr", name))
    }

    pub fn starter_code(&self) -> &str {
        &self.starter_code
    }

    /// Stored code if there is any, otherwise the starter code.
    pub async fn current_code(&self) -> Result<String> {
        let Some(key) = self.storage_key() else {
            log::info!("No exercise name provided, code will not be stored");
            return Ok(self.starter_code.clone());
        };
        match self.store.get(&key).await? {
            Some(code) if !code.is_empty() => {
                log::debug!("Loading stored code from {}", key);
                Ok(code)
            }
            _ => {
                log::debug!("No stored code found for {}, using starter code", key);
                Ok(self.starter_code.clone())
            }
        }
    }

    pub async fn save_code(&self, code: &str) -> Result<()> {
        if let Some(key) = self.storage_key() {
            self.store.set(&key, code).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Widget for CodeExercise {
    type View = ExerciseView;
    type Submission = String;
    type Outcome = ParsedReport;

    async fn render(&self) -> Result<ExerciseView> {
        Ok(ExerciseView {
            name: self.name.clone(),
            code: self.current_code().await?,
        })
    }

    async fn handle_submit(&self, code: String) -> Result<ParsedReport> {
        self.save_code(&code).await?;
        Ok(self.runner.run(&code, self.sink.as_ref()).await)
    }

    async fn handle_reset(&self) -> Result<ExerciseView> {
        log::info!("Resetting {} to starter code", self.name.as_deref().unwrap_or("exercise"));
        self.save_code(&self.starter_code).await?;
        Ok(ExerciseView {
            name: self.name.clone(),
            code: self.starter_code.clone(),
        })
    }
}
