//! Spaced-repetition interval growth and recall-probability estimation.
//!
//! Deliberately simpler than a full FSRS-style scheduler: one growth
//! formula driven by importance/usage/feedback, clamped to configured
//! bounds. Never deletes data — only [`crate::forgetting::ForgettingEngine`]
//! does that.

#[derive(Debug, Clone, Copy)]
pub struct ReviewWeights {
    pub a1_importance: f64,
    pub a2_usage: f64,
    pub a3_helpful: f64,
    pub a4_bad: f64,
}

impl Default for ReviewWeights {
    fn default() -> Self {
        Self {
            a1_importance: 0.6,
            a2_usage: 0.4,
            a3_helpful: 0.5,
            a4_bad: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IntervalBounds {
    pub min_days: f64,
    pub max_days: f64,
}

impl Default for IntervalBounds {
    fn default() -> Self {
        Self {
            min_days: 1.0,
            max_days: 365.0,
        }
    }
}

/// Recall probability at or below this is considered due for review.
pub const NEEDS_REVIEW_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Default)]
pub struct ReviewInput {
    pub current_interval_days: f64,
    pub importance: f64,
    pub usage: f64,
    pub helpful: f64,
    pub bad: f64,
    pub days_since_last_review: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ReviewOutcome {
    pub next_interval_days: f64,
    pub recall_probability: f64,
    pub needs_review: bool,
}

pub struct ReviewScheduler {
    pub weights: ReviewWeights,
    pub bounds: IntervalBounds,
}

impl Default for ReviewScheduler {
    fn default() -> Self {
        Self {
            weights: ReviewWeights::default(),
            bounds: IntervalBounds::default(),
        }
    }
}

impl ReviewScheduler {
    pub fn new(weights: ReviewWeights, bounds: IntervalBounds) -> Self {
        Self { weights, bounds }
    }

    pub fn schedule(&self, input: &ReviewInput) -> ReviewOutcome {
        let w = &self.weights;
        let growth = 1.0 + w.a1_importance * input.importance + w.a2_usage * input.usage
            - w.a4_bad * input.bad
            + w.a3_helpful * input.helpful;

        let raw_interval = input.current_interval_days * growth;
        let next_interval_days = raw_interval
            .ceil()
            .clamp(self.bounds.min_days, self.bounds.max_days);

        let recall_probability = (-input.days_since_last_review / next_interval_days).exp();
        let needs_review = recall_probability <= NEEDS_REVIEW_THRESHOLD;

        ReviewOutcome {
            next_interval_days,
            recall_probability,
            needs_review,
        }
    }
}
