use std::fmt::Debug;

use crate::error::{AppError, AppResult, FieldErrors};

/// One page of a multi-step form.
pub trait WizardStep: Copy + Eq + Debug + 'static {
    /// Steps in the order they are visited.
    const ORDER: &'static [Self];

    fn title(self) -> &'static str;
}

/// Anything that can check the fields belonging to a step.
pub trait StepValidator<S: WizardStep> {
    fn validate_step(&self, step: S) -> FieldErrors;
}

/// Finite-state machine over the steps of a form. `advance` validates the
/// step being left, `back` never does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wizard<S: WizardStep> {
    index: usize,
    furthest: usize,
    _step: std::marker::PhantomData<S>,
}

impl<S: WizardStep> Default for Wizard<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: WizardStep> Wizard<S> {
    pub fn new() -> Self {
        Self {
            index: 0,
            furthest: 0,
            _step: std::marker::PhantomData,
        }
    }

    pub fn current(&self) -> S {
        S::ORDER[self.index]
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= S::ORDER.len()
    }

    /// `(1-based position, total)` for progress display.
    pub fn progress(&self) -> (usize, usize) {
        (self.index + 1, S::ORDER.len())
    }

    pub fn advance<V: StepValidator<S>>(&mut self, form: &V) -> AppResult<S> {
        if self.is_last() {
            return Err(AppError::BadRequest(
                "Already on the last step, submit the form instead.".to_string(),
            ));
        }
        let errors = form.validate_step(self.current());
        if !errors.is_empty() {
            tracing::debug!(step = ?self.current(), errors = %errors, "Wizard step rejected");
            return Err(AppError::Validation(errors));
        }
        self.index += 1;
        self.furthest = self.furthest.max(self.index);
        Ok(self.current())
    }

    /// Previous step. No-op on the first step.
    pub fn back(&mut self) -> S {
        self.index = self.index.saturating_sub(1);
        self.current()
    }

    /// Jump to a step already reached; later steps stay locked.
    pub fn jump_to(&mut self, step: S) -> AppResult<S> {
        let Some(target) = S::ORDER.iter().position(|candidate| *candidate == step) else {
            return Err(AppError::BadRequest(format!("Unknown step {step:?}.")));
        };
        if target > self.furthest {
            return Err(AppError::BadRequest(format!(
                "Step '{}' is not reachable yet.",
                step.title()
            )));
        }
        self.index = target;
        Ok(step)
    }

    /// Validate every step, used right before submitting from the last one.
    pub fn validate_all<V: StepValidator<S>>(form: &V) -> FieldErrors {
        let mut all = FieldErrors::new();
        for step in S::ORDER {
            for (field, message) in form.validate_step(*step).iter() {
                all.add(field, message);
            }
        }
        all
    }
}
