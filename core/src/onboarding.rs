//! The sign-up flow: account, optional email verification, first business
//! location, plan choice.
//!
//! When sign-up answers "confirmation required" the flow parks on
//! `VerifyEmail`; no location can be created until the user has verified
//! and signed in.

use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::Transport;
use crate::session::{Session, SignUpOutcome};
use crate::store::KeyValueStore;
use crate::types::{Location, NewLocation, UpdateOnboarding};

#[derive(Debug, Clone, PartialEq)]
pub enum OnboardingStep {
    Account,
    VerifyEmail { email: String },
    Business,
    Plan { location: Location },
    Complete,
}

impl OnboardingStep {
    pub fn name(&self) -> &'static str {
        match self {
            OnboardingStep::Account => "account",
            OnboardingStep::VerifyEmail { .. } => "verify-email",
            OnboardingStep::Business => "business",
            OnboardingStep::Plan { .. } => "plan",
            OnboardingStep::Complete => "complete",
        }
    }
}

#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("cannot {action} during the {step} step")]
    WrongStep {
        action: &'static str,
        step: &'static str,
    },
}

pub struct OnboardingFlow<'a, T, S> {
    session: &'a Session<T, S>,
    step: OnboardingStep,
}

impl<'a, T: Transport, S: KeyValueStore> OnboardingFlow<'a, T, S> {
    /// Starts at `Account`, or at `Business` when already signed in.
    pub fn new(session: &'a Session<T, S>) -> Self {
        let step = if session.user().is_some() {
            OnboardingStep::Business
        } else {
            OnboardingStep::Account
        };
        Self { session, step }
    }

    /// Picks up where a signed-in user left off, using the progress the
    /// backend recorded.
    pub fn resume(session: &'a Session<T, S>) -> Result<Self, OnboardingError> {
        if session.user().is_none() {
            return Ok(Self::new(session));
        }
        let client = session.client();
        let progress = client.get_onboarding()?;
        let step = match progress.location_id {
            _ if progress.completed => OnboardingStep::Complete,
            Some(id) => OnboardingStep::Plan {
                location: client.get_location(id)?,
            },
            None => OnboardingStep::Business,
        };
        Ok(Self { session, step })
    }

    pub fn step(&self) -> &OnboardingStep {
        &self.step
    }

    fn expect(&self, action: &'static str, expected: &'static str) -> Result<(), OnboardingError> {
        if self.step.name() == expected {
            Ok(())
        } else {
            Err(OnboardingError::WrongStep {
                action,
                step: self.step.name(),
            })
        }
    }

    pub fn submit_account(
        &mut self,
        email: &str,
        password: &str,
        name: &str,
        business_name: Option<&str>,
    ) -> Result<&OnboardingStep, OnboardingError> {
        self.expect("create an account", "account")?;
        self.step = match self.session.sign_up(email, password, name, business_name)? {
            SignUpOutcome::ConfirmationRequired { email } => OnboardingStep::VerifyEmail { email },
            SignUpOutcome::SignedIn(_) => OnboardingStep::Business,
        };
        Ok(&self.step)
    }

    /// Signs in once the emailed link has been followed.
    pub fn sign_in_after_verification(
        &mut self,
        password: &str,
    ) -> Result<&OnboardingStep, OnboardingError> {
        let email = match &self.step {
            OnboardingStep::VerifyEmail { email } => email.clone(),
            other => {
                return Err(OnboardingError::WrongStep {
                    action: "sign in after verification",
                    step: other.name(),
                })
            }
        };
        self.session.sign_in(&email, password)?;
        self.step = OnboardingStep::Business;
        Ok(&self.step)
    }

    /// Creates the first location and records the progress.
    pub fn submit_business(&mut self, input: &NewLocation) -> Result<&OnboardingStep, OnboardingError> {
        self.expect("create a business", "business")?;
        let client = self.session.client();
        let location = client.create_location(input)?;
        client.update_onboarding(&UpdateOnboarding {
            step: Some("plan".to_string()),
            location_id: Some(location.id),
            ..UpdateOnboarding::default()
        })?;
        self.step = OnboardingStep::Plan { location };
        Ok(&self.step)
    }

    pub fn choose_plan(&mut self, plan_id: Uuid) -> Result<&OnboardingStep, OnboardingError> {
        self.expect("choose a plan", "plan")?;
        self.session.client().update_onboarding(&UpdateOnboarding {
            step: Some("complete".to_string()),
            plan_id: Some(plan_id),
            completed: Some(true),
            ..UpdateOnboarding::default()
        })?;
        self.step = OnboardingStep::Complete;
        Ok(&self.step)
    }
}
