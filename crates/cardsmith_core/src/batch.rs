//! crates/cardsmith_core/src/batch.rs
//!
//! The generation orchestrator: walks an ordered contact list, renders one
//! prompt per contact and calls the image collaborator strictly
//! sequentially, accumulating cards, per-contact failures and a linear
//! progress percentage. Also owns the batch-flow state machine and the
//! volatile guest trial counter.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{BatchFailure, BatchOutcome, Contact, GeneratedCard, PromptTemplate};
use crate::ports::ImageGenerationService;
use crate::templates::render_prompt;

//=========================================================================================
// Errors
//=========================================================================================

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The guest trial cannot cover the batch; rejected before any
    /// generation call is issued.
    #[error("Trial allows {remaining} more card(s) but the batch has {requested}")]
    TrialExhausted { remaining: u32, requested: u32 },
    #[error("Cannot {action} while the batch flow is {phase:?}")]
    InvalidTransition {
        action: &'static str,
        phase: BatchPhase,
    },
    #[error("The batch has no contacts")]
    EmptyBatch,
}

//=========================================================================================
// Guest trial counter
//=========================================================================================

/// The volatile free-generation allowance for unauthenticated users.
/// Lives only in memory; a page reload starts it over.
#[derive(Debug, Clone, Copy)]
pub struct TrialCounter {
    used: u32,
    limit: u32,
}

/// Free generations before registration is required.
pub const TRIAL_LIMIT: u32 = 3;

impl TrialCounter {
    pub fn new(limit: u32) -> Self {
        Self { used: 0, limit }
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }

    /// Consumes one trial credit. Called only after a successful
    /// generation; a failed attempt does not cost a credit (see DESIGN.md
    /// for why this asymmetry is kept rather than resolved).
    pub fn consume(&mut self) {
        self.used += 1;
    }
}

impl Default for TrialCounter {
    fn default() -> Self {
        Self::new(TRIAL_LIMIT)
    }
}

//=========================================================================================
// Batch flow state machine
//=========================================================================================

/// The phases of the batch flow. No phase allows a second concurrent
/// batch; starting a new one always discards prior in-memory results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Idle,
    Mapping,
    Generating,
    Done,
}

/// Owns the current phase and the results of the last finished batch.
#[derive(Debug, Default)]
pub struct BatchSession {
    phase: BatchPhase,
    outcome: Option<BatchOutcome>,
}

impl Default for BatchPhase {
    fn default() -> Self {
        BatchPhase::Idle
    }
}

impl BatchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    pub fn outcome(&self) -> Option<&BatchOutcome> {
        self.outcome.as_ref()
    }

    /// idle -> mapping: a file was loaded and columns are being mapped.
    /// Discards any previous batch's results.
    pub fn begin_mapping(&mut self) -> Result<(), BatchError> {
        match self.phase {
            BatchPhase::Idle => {
                self.outcome = None;
                self.phase = BatchPhase::Mapping;
                Ok(())
            }
            phase => Err(BatchError::InvalidTransition {
                action: "begin mapping",
                phase,
            }),
        }
    }

    /// mapping -> idle: the user cancelled out of the mapping step.
    pub fn cancel_mapping(&mut self) -> Result<(), BatchError> {
        match self.phase {
            BatchPhase::Mapping => {
                self.phase = BatchPhase::Idle;
                Ok(())
            }
            phase => Err(BatchError::InvalidTransition {
                action: "cancel mapping",
                phase,
            }),
        }
    }

    /// mapping -> generating.
    pub fn begin_generating(&mut self) -> Result<(), BatchError> {
        match self.phase {
            BatchPhase::Mapping => {
                self.phase = BatchPhase::Generating;
                Ok(())
            }
            phase => Err(BatchError::InvalidTransition {
                action: "start generating",
                phase,
            }),
        }
    }

    /// generating -> done, recording the outcome. Terminal regardless of
    /// how many individual contacts failed.
    pub fn finish(&mut self, outcome: BatchOutcome) -> Result<(), BatchError> {
        match self.phase {
            BatchPhase::Generating => {
                self.outcome = Some(outcome);
                self.phase = BatchPhase::Done;
                Ok(())
            }
            phase => Err(BatchError::InvalidTransition {
                action: "finish",
                phase,
            }),
        }
    }

    /// done -> idle, dropping the results.
    pub fn reset(&mut self) -> Result<(), BatchError> {
        match self.phase {
            BatchPhase::Done => {
                self.outcome = None;
                self.phase = BatchPhase::Idle;
                Ok(())
            }
            phase => Err(BatchError::InvalidTransition {
                action: "reset",
                phase,
            }),
        }
    }
}

//=========================================================================================
// The batch run
//=========================================================================================

/// Integer progress percent after `completed` of `total` items.
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((completed * 100) / total) as u8
}

/// Runs one batch: strictly sequential, one generation call per contact.
///
/// A per-contact failure is recorded and the loop moves on; no retry is
/// attempted. When `trial` is set, the whole batch is rejected up front
/// if it would exceed the remaining allowance, and a credit is consumed
/// for each successful card only.
pub async fn run_batch(
    contacts: Vec<Contact>,
    template: &PromptTemplate,
    images: &dyn ImageGenerationService,
    mut trial: Option<&mut TrialCounter>,
    mut on_progress: impl FnMut(u8),
) -> Result<BatchOutcome, BatchError> {
    if contacts.is_empty() {
        return Err(BatchError::EmptyBatch);
    }
    if let Some(trial) = trial.as_deref() {
        let requested = contacts.len() as u32;
        if requested > trial.remaining() {
            return Err(BatchError::TrialExhausted {
                remaining: trial.remaining(),
                requested,
            });
        }
    }

    let batch_id = Uuid::new_v4();
    let started_at = Utc::now();
    let total = contacts.len();
    info!(%batch_id, total, template = template.id, "starting batch generation");

    let mut cards = Vec::new();
    let mut failures = Vec::new();
    for (index, contact) in contacts.into_iter().enumerate() {
        let prompt = render_prompt(template, &contact);
        match images.generate_card_image(&prompt).await {
            Ok(image_url) => {
                if let Some(trial) = trial.as_deref_mut() {
                    trial.consume();
                }
                cards.push(GeneratedCard {
                    contact,
                    image_url,
                    generated_at: Utc::now(),
                });
            }
            Err(e) => {
                warn!(%batch_id, contact = %contact.name, error = %e, "card generation failed");
                failures.push(BatchFailure {
                    message: format!("Could not create a card for {}: {e}", contact.name),
                    contact,
                });
            }
        }
        on_progress(progress_percent(index + 1, total));
    }

    info!(%batch_id, generated = cards.len(), failed = failures.len(), "batch finished");
    Ok(BatchOutcome {
        batch_id,
        started_at,
        cards,
        failures,
    })
}

/// Replaces the card sharing the edited card's email identity, keeping
/// the result-set size unchanged. Last one wins on a collision; a card
/// for an unknown email is ignored.
pub fn replace_card(cards: &mut [GeneratedCard], edited: GeneratedCard) {
    if let Some(existing) = cards
        .iter_mut()
        .find(|c| c.contact.email == edited.contact.email)
    {
        *existing = edited;
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BrandKit;
    use crate::ports::{PortError, PortResult};
    use crate::templates::find_template;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A scripted generator: fails for contacts whose first name appears
    /// in `fail_for`, counts every call it receives.
    struct ScriptedGenerator {
        calls: AtomicUsize,
        fail_for: Vec<&'static str>,
    }

    impl ScriptedGenerator {
        fn new(fail_for: Vec<&'static str>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_for,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl crate::ports::ImageGenerationService for ScriptedGenerator {
        async fn generate_card_image(&self, prompt: &str) -> PortResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_for.iter().any(|name| prompt.contains(name)) {
                return Err(PortError::Unexpected("model refused".to_string()));
            }
            Ok(format!("data:image/png;base64,{}", self.calls()))
        }

        async fn edit_card_image(&self, _: &str, _: &str) -> PortResult<String> {
            unreachable!("not exercised by batch tests")
        }

        async fn brand_card_image(&self, image: &str, _: &BrandKit) -> PortResult<String> {
            Ok(image.to_string())
        }

        async fn generate_prompt_concept(&self, _: &str) -> PortResult<String> {
            unreachable!("not exercised by batch tests")
        }

        async fn generate_image_with_imagen(&self, _: &str) -> PortResult<String> {
            unreachable!("not exercised by batch tests")
        }
    }

    fn contacts(names: &[&str]) -> Vec<Contact> {
        names
            .iter()
            .map(|n| Contact {
                name: n.to_string(),
                email: format!("{}@x.com", n.to_lowercase()),
                custom_prompt_detail: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn progress_is_linear_and_ends_at_one_hundred() {
        let generator = ScriptedGenerator::new(vec![]);
        let template = find_template("birthday-classic").unwrap();
        let mut reported = Vec::new();

        let outcome = run_batch(
            contacts(&["Ann", "Bob", "Cem", "Dee"]),
            template,
            &generator,
            None,
            |p| reported.push(p),
        )
        .await
        .unwrap();

        assert_eq!(reported, vec![25, 50, 75, 100]);
        assert_eq!(outcome.cards.len(), 4);
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_rest() {
        let generator = ScriptedGenerator::new(vec!["Bob"]);
        let template = find_template("birthday-classic").unwrap();

        let outcome = run_batch(
            contacts(&["Ann", "Bob", "Cem"]),
            template,
            &generator,
            None,
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(generator.calls(), 3);
        assert_eq!(outcome.cards.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].message.contains("Bob"));
        let names: Vec<_> = outcome.cards.iter().map(|c| c.contact.name.as_str()).collect();
        assert_eq!(names, vec!["Ann", "Cem"]);
    }

    #[tokio::test]
    async fn oversized_guest_batch_is_rejected_before_any_call() {
        let generator = ScriptedGenerator::new(vec![]);
        let template = find_template("birthday-classic").unwrap();
        let mut trial = TrialCounter::new(2);

        let result = run_batch(
            contacts(&["Ann", "Bob", "Cem"]),
            template,
            &generator,
            Some(&mut trial),
            |_| {},
        )
        .await;

        assert!(matches!(
            result,
            Err(BatchError::TrialExhausted {
                remaining: 2,
                requested: 3
            })
        ));
        assert_eq!(generator.calls(), 0);
        assert_eq!(trial.remaining(), 2);
    }

    #[tokio::test]
    async fn trial_credits_are_consumed_on_success_only() {
        let generator = ScriptedGenerator::new(vec!["Bob"]);
        let template = find_template("birthday-classic").unwrap();
        let mut trial = TrialCounter::new(3);

        run_batch(
            contacts(&["Ann", "Bob", "Cem"]),
            template,
            &generator,
            Some(&mut trial),
            |_| {},
        )
        .await
        .unwrap();

        // Bob failed, so only two credits were spent.
        assert_eq!(trial.remaining(), 1);
    }

    #[tokio::test]
    async fn empty_batch_is_an_error() {
        let generator = ScriptedGenerator::new(vec![]);
        let template = find_template("birthday-classic").unwrap();
        let result = run_batch(vec![], template, &generator, None, |_| {}).await;
        assert!(matches!(result, Err(BatchError::EmptyBatch)));
    }

    #[test]
    fn replacing_an_edited_card_keeps_the_count() {
        let mut cards: Vec<GeneratedCard> = contacts(&["Ann", "Bob"])
            .into_iter()
            .map(|contact| GeneratedCard {
                contact,
                image_url: "data:image/png;base64,old".to_string(),
                generated_at: Utc::now(),
            })
            .collect();

        let edited = GeneratedCard {
            contact: cards[1].contact.clone(),
            image_url: "data:image/png;base64,new".to_string(),
            generated_at: Utc::now(),
        };
        replace_card(&mut cards, edited);

        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].image_url, "data:image/png;base64,new");
        assert_eq!(cards[0].image_url, "data:image/png;base64,old");
    }

    #[test]
    fn phase_machine_walks_the_happy_path_and_rejects_the_rest() {
        let mut session = BatchSession::new();
        assert_eq!(session.phase(), BatchPhase::Idle);

        // done and generating are unreachable from idle
        assert!(session.reset().is_err());
        assert!(session.begin_generating().is_err());

        session.begin_mapping().unwrap();
        session.cancel_mapping().unwrap();
        assert_eq!(session.phase(), BatchPhase::Idle);

        session.begin_mapping().unwrap();
        session.begin_generating().unwrap();
        assert!(session.begin_mapping().is_err());

        let outcome = BatchOutcome {
            batch_id: Uuid::new_v4(),
            started_at: Utc::now(),
            cards: vec![],
            failures: vec![],
        };
        session.finish(outcome).unwrap();
        assert_eq!(session.phase(), BatchPhase::Done);
        assert!(session.outcome().is_some());

        session.reset().unwrap();
        assert_eq!(session.phase(), BatchPhase::Idle);
        assert!(session.outcome().is_none());
    }
}
