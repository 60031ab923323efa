//! Simulated progress sequence for an upload session.
//!
//! The visible progress is decorative and runs on a fixed plan: percent climbs
//! from 0 to 100 in even steps, and the stage message shown next to it is a
//! pure function of the percent. Timing lives behind [`StepPacer`] so the
//! sequence itself stays deterministic and testable.

use std::time::Duration;

use async_trait::async_trait;

/// Percent increment between consecutive progress ticks.
pub const PROGRESS_STEP: u8 = 2;

/// Delay between consecutive progress ticks in the production pacer.
pub const STEP_DELAY: Duration = Duration::from_millis(30);

/// Stage messages in display order. `stage_index` maps a percent into this
/// table.
pub const STAGE_MESSAGES: [&str; 5] = [
    "Scanning file structure...",
    "Analyzing data...",
    "Processing content...",
    "Finalizing...",
    "Ready!",
];

/// Index into [`STAGE_MESSAGES`] for a given percent.
pub fn stage_index(percent: u8) -> usize {
    match percent {
        0..=24 => 0,
        25..=49 => 1,
        50..=74 => 2,
        75..=94 => 3,
        _ => 4,
    }
}

/// Stage message for a given percent.
pub fn stage_message(percent: u8) -> &'static str {
    STAGE_MESSAGES[stage_index(percent)]
}

/// One visible progress step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressTick {
    pub percent: u8,
    pub message: &'static str,
}

/// Iterator over the full progress sequence of one session: 0, 2, .., 100,
/// each paired with its stage message.
#[derive(Debug, Clone)]
pub struct ProgressPlan {
    next: Option<u8>,
}

impl ProgressPlan {
    pub fn new() -> Self {
        Self { next: Some(0) }
    }
}

impl Default for ProgressPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for ProgressPlan {
    type Item = ProgressTick;

    fn next(&mut self) -> Option<ProgressTick> {
        let percent = self.next?;
        self.next = if percent >= 100 {
            None
        } else {
            Some(percent.saturating_add(PROGRESS_STEP).min(100))
        };
        Some(ProgressTick {
            percent,
            message: stage_message(percent),
        })
    }
}

/// Pacing seam between progress ticks.
#[async_trait]
pub trait StepPacer: Send + Sync {
    async fn pause(&self);
}

/// Production pacer: sleeps [`STEP_DELAY`] between ticks.
pub struct TokioPacer;

#[async_trait]
impl StepPacer for TokioPacer {
    async fn pause(&self) {
        tokio::time::sleep(STEP_DELAY).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_walks_even_percents_from_zero_to_one_hundred() {
        let percents: Vec<u8> = ProgressPlan::new().map(|tick| tick.percent).collect();
        let expected: Vec<u8> = (0..=100).step_by(PROGRESS_STEP as usize).collect();
        assert_eq!(percents, expected);
        assert_eq!(percents.first(), Some(&0));
        assert_eq!(percents.last(), Some(&100));
    }

    #[test]
    fn plan_is_strictly_increasing() {
        let percents: Vec<u8> = ProgressPlan::new().map(|tick| tick.percent).collect();
        for pair in percents.windows(2) {
            assert!(pair[0] < pair[1], "expected {} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn stage_messages_follow_percent_thresholds() {
        assert_eq!(stage_message(0), "Scanning file structure...");
        assert_eq!(stage_message(24), "Scanning file structure...");
        assert_eq!(stage_message(25), "Analyzing data...");
        assert_eq!(stage_message(49), "Analyzing data...");
        assert_eq!(stage_message(50), "Processing content...");
        assert_eq!(stage_message(74), "Processing content...");
        assert_eq!(stage_message(75), "Finalizing...");
        assert_eq!(stage_message(94), "Finalizing...");
        assert_eq!(stage_message(95), "Ready!");
        assert_eq!(stage_message(100), "Ready!");
    }

    #[test]
    fn ticks_carry_the_message_for_their_percent() {
        for tick in ProgressPlan::new() {
            assert_eq!(tick.message, stage_message(tick.percent));
        }
    }
}
