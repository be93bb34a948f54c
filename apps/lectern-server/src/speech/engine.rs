//! Voice engine trait and cancellable utterances

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::types::{EngineError, SpeechOutcome, SpeechSettings, Voice};

/// Voice engine trait - all speech backends implement this
#[async_trait]
pub trait VoiceEngine: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;

    /// Start (or restart) the engine and enumerate its voices
    async fn init(&self) -> Result<Vec<Voice>, EngineError>;

    /// Voices found by the last successful `init`
    fn voices(&self) -> Vec<Voice>;

    /// Begin speaking `text`; the returned utterance runs in the background
    async fn speak(&self, text: &str, settings: &SpeechSettings) -> Result<Utterance, EngineError>;
}

/// Stops an in-flight utterance; safe to call from any task, any number of times
#[derive(Debug, Clone, Default)]
pub struct UtteranceCanceller {
    notify: Arc<Notify>,
    cancelled: Arc<AtomicBool>,
}

impl UtteranceCanceller {
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            // notify_one keeps a permit if the utterance is not waiting yet
            self.notify.notify_one();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A speech job running on its own task
pub struct Utterance {
    canceller: UtteranceCanceller,
    task: JoinHandle<Result<SpeechOutcome, EngineError>>,
}

impl Utterance {
    /// Run `work` until it finishes or the utterance is cancelled.
    ///
    /// On cancel the work future is dropped, so backends should tie their
    /// resources (child processes) to it.
    pub fn spawn<F>(work: F) -> Self
    where
        F: Future<Output = Result<(), EngineError>> + Send + 'static,
    {
        let canceller = UtteranceCanceller::default();
        let signal = canceller.clone();

        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = signal.notify.notified() => Ok(SpeechOutcome::Cancelled),
                result = work => result.map(|_| SpeechOutcome::Completed),
            }
        });

        Self { canceller, task }
    }

    pub fn canceller(&self) -> UtteranceCanceller {
        self.canceller.clone()
    }

    /// Wait for the utterance to complete or be cancelled
    pub async fn finish(self) -> Result<SpeechOutcome, EngineError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(EngineError::Synthesis(format!("speech task failed: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completes() {
        let utterance = Utterance::spawn(async { Ok(()) });
        assert_eq!(utterance.finish().await.unwrap(), SpeechOutcome::Completed);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_blocking_work() {
        let utterance = Utterance::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        });
        let canceller = utterance.canceller();

        let waiter = tokio::spawn(utterance.finish());
        canceller.cancel();
        canceller.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("cancel should be prompt")
            .unwrap()
            .unwrap();
        assert_eq!(outcome, SpeechOutcome::Cancelled);
        assert!(canceller.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_before_start_is_remembered() {
        let utterance = Utterance::spawn(std::future::pending());
        utterance.canceller().cancel();
        assert_eq!(utterance.finish().await.unwrap(), SpeechOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let utterance =
            Utterance::spawn(async { Err(EngineError::Synthesis("device lost".into())) });
        assert!(matches!(
            utterance.finish().await,
            Err(EngineError::Synthesis(_))
        ));
    }
}
