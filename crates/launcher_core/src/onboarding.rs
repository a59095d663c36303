use anyhow::Result;
use tracing::info;

use crate::preferences::{Flag, LauncherPreferences};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    Welcome,
    WeatherLocation,
    SetDefaultLauncher,
    Done,
}

impl OnboardingStep {
    pub fn next(self) -> Self {
        match self {
            Self::Welcome => Self::WeatherLocation,
            Self::WeatherLocation => Self::SetDefaultLauncher,
            Self::SetDefaultLauncher | Self::Done => Self::Done,
        }
    }
}

/// Linear first-run flow. Progress survives restarts through the two
/// onboarding flags.
pub struct OnboardingFlow {
    prefs: LauncherPreferences,
    step: OnboardingStep,
}

impl OnboardingFlow {
    /// Picks up where the last run stopped.
    pub async fn resume(prefs: LauncherPreferences) -> Result<Self> {
        let step = if prefs.flag(Flag::HasCompletedOnboarding).await? {
            OnboardingStep::Done
        } else if prefs.flag(Flag::OnboardingReachedSetDefault).await? {
            OnboardingStep::SetDefaultLauncher
        } else {
            OnboardingStep::Welcome
        };
        Ok(Self { prefs, step })
    }

    pub fn step(&self) -> OnboardingStep {
        self.step
    }

    pub fn is_complete(&self) -> bool {
        self.step == OnboardingStep::Done
    }

    pub async fn advance(&mut self) -> Result<OnboardingStep> {
        let next = self.step.next();
        match next {
            OnboardingStep::SetDefaultLauncher => {
                self.prefs
                    .set_flag(Flag::OnboardingReachedSetDefault, true)
                    .await?;
            }
            OnboardingStep::Done if self.step != OnboardingStep::Done => {
                self.prefs.set_flag(Flag::HasCompletedOnboarding, true).await?;
                info!("onboarding completed");
            }
            _ => {}
        }
        self.step = next;
        Ok(next)
    }

    /// Answer on the weather step. Opting out stops location-based weather.
    pub async fn set_weather_location_opted_out(&self, opted_out: bool) -> Result<()> {
        self.prefs
            .set_flag(Flag::WeatherLocationOptedOut, opted_out)
            .await
    }

    pub async fn finish(&mut self) -> Result<()> {
        self.prefs.set_flag(Flag::HasCompletedOnboarding, true).await?;
        self.step = OnboardingStep::Done;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/onboarding_tests.rs"]
mod tests;
