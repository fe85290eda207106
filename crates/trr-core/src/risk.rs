//! # Risk Scoring
//!
//! One pure scoring function over an explicit weight table.
//!
//! | Factor | Value | Points |
//! |--------|-------|--------|
//! | complexity | simple / moderate / complex / very-complex | 1 / 2 / 3 / 4 |
//! | deadline | due in < 7 days / < 30 days | 3 / 2 |
//! | priority | critical / high | 2 / 1 |
//!
//! Days until due are whole days rounded down from the millisecond distance
//! between now and the start (00:00 UTC) of the due day. For whole-day
//! thresholds, `floor(d) < N` holds exactly when `d < N`, so a TRR due in
//! 6.5 days is a tight deadline.
//!
//! | Score | Level |
//! |-------|-------|
//! | >= 7 | critical |
//! | >= 5 | high |
//! | >= 3 | medium |
//! | else | low |

use crate::primitives::MILLIS_PER_DAY;
use crate::types::{Complexity, Priority, RiskLevel, Timestamp, Trr};
use serde::{Deserialize, Serialize};

/// Deadline closer than this many days is "tight".
pub const TIGHT_DEADLINE_DAYS: i64 = 7;

/// Deadline closer than this many days is "limited".
pub const LIMITED_TIMEFRAME_DAYS: i64 = 30;

/// Factors the scorer looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskInputs {
    pub complexity: Option<Complexity>,
    /// Whole days until the due date, rounded down; negative when overdue.
    pub days_until_due: Option<i64>,
    pub priority: Option<Priority>,
}

impl RiskInputs {
    /// Inputs for `trr` as of `now`.
    #[must_use]
    pub fn for_trr(trr: &Trr, now: Timestamp) -> Self {
        Self {
            complexity: Some(trr.complexity),
            days_until_due: trr.due_date.map(|due| days_until(due, now)),
            priority: Some(trr.priority),
        }
    }
}

/// Floor of the day distance from `now` to the start of `due_day`.
fn days_until(due_day: u32, now: Timestamp) -> i64 {
    let day = MILLIS_PER_DAY as i128;
    let due_millis = i128::from(due_day) * day;
    let now_millis = i128::from(now.as_millis());
    (due_millis - now_millis).div_euclid(day) as i64
}

/// Score, level, and the reasons that contributed, in table order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub level: RiskLevel,
    pub reasons: Vec<String>,
}

impl RiskAssessment {
    /// Reasons joined for display.
    #[must_use]
    pub fn rationale(&self) -> String {
        self.reasons.join(", ")
    }
}

/// Score `inputs` against the weight table.
#[must_use]
pub fn score_risk(inputs: &RiskInputs) -> RiskAssessment {
    let mut score: u8 = 0;
    let mut reasons = Vec::new();
    let mut add = |points: u8, reason: &str| {
        score = score.saturating_add(points);
        reasons.push(reason.to_string());
    };

    match inputs.complexity {
        Some(Complexity::VeryComplex) => add(4, "Very complex implementation"),
        Some(Complexity::Complex) => add(3, "Complex requirements"),
        Some(Complexity::Moderate) => add(2, "Moderate complexity"),
        Some(Complexity::Simple) => add(1, "Simple implementation"),
        None => {}
    }

    match inputs.days_until_due {
        Some(days) if days < TIGHT_DEADLINE_DAYS => add(3, "Tight deadline"),
        Some(days) if days < LIMITED_TIMEFRAME_DAYS => add(2, "Limited timeframe"),
        _ => {}
    }

    match inputs.priority {
        Some(Priority::Critical) => add(2, "Critical priority"),
        Some(Priority::High) => add(1, "High priority"),
        _ => {}
    }

    RiskAssessment {
        score,
        level: level_for(score),
        reasons,
    }
}

/// Level for a raw score.
#[must_use]
pub const fn level_for(score: u8) -> RiskLevel {
    match score {
        7.. => RiskLevel::Critical,
        5..=6 => RiskLevel::High,
        3..=4 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}
