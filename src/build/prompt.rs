// ABOUTME: Operator confirmation used by the provisioning guard.
// ABOUTME: A terminal prompt via dialoguer, or an always-yes stand-in for --yes.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("confirmation prompt failed: {0}")]
pub struct PromptError(pub String);

/// Asks the operator a yes/no question.
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, message: &str) -> Result<bool, PromptError>;
}

/// Interactive prompt on the controlling terminal. Defaults to "no".
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirm;

#[async_trait]
impl Confirm for TerminalConfirm {
    async fn confirm(&self, message: &str) -> Result<bool, PromptError> {
        let prompt = message.to_string();
        off_runtime(move || {
            dialoguer::Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()
                .map_err(|e| PromptError(e.to_string()))
        })
        .await
    }
}

/// Run a blocking terminal read on tokio's blocking pool.
async fn off_runtime<F>(read: F) -> Result<bool, PromptError>
where
    F: FnOnce() -> Result<bool, PromptError> + Send + 'static,
{
    tokio::task::spawn_blocking(read)
        .await
        .map_err(|e| PromptError(e.to_string()))?
}

/// Answers yes without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

#[async_trait]
impl Confirm for AssumeYes {
    async fn confirm(&self, message: &str) -> Result<bool, PromptError> {
        tracing::info!("{} [assumed yes]", message);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[tokio::test]
    async fn blocking_read_leaves_the_runtime_free() {
        let (tx, rx) = mpsc::channel();

        // Both futures share one runtime thread; the answer only arrives if
        // the read is not holding it.
        let (answer, ()) = tokio::join!(
            off_runtime(move || rx.recv().map_err(|e| PromptError(e.to_string()))),
            async move { tx.send(true).unwrap() },
        );

        assert!(answer.unwrap());
    }

    #[tokio::test]
    async fn assume_yes_never_asks() {
        assert!(AssumeYes.confirm("Build it again?").await.unwrap());
    }
}
