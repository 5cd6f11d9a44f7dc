// src/widget.rs
use async_trait::async_trait;

use crate::errors::Result;

/// What a host needs from an embeddable widget: something to show, and
/// handlers for the submit and reset buttons.
#[async_trait]
pub trait Widget: Send + Sync {
    type View: Send;
    type Submission: Send;
    type Outcome: Send;

    async fn render(&self) -> Result<Self::View>;

    async fn handle_submit(&self, submission: Self::Submission) -> Result<Self::Outcome>;

    async fn handle_reset(&self) -> Result<Self::View>;
}
