use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::measurement::round_to;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Average change in percent below which a wound counts as improving.
pub const IMPROVING_PERCENT: f64 = -5.0;

/// Average change in percent above which a wound counts as worsening.
pub const WORSENING_PERCENT: f64 = 5.0;

/// Number of most recent assessments the trend is computed from.
pub const TREND_WINDOW: usize = 3;

/// The wound area measured at one point in time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaObservation {
    /// When the photograph was taken.
    pub captured_at: DateTime<Utc>,
    /// Measured area in cm².
    pub area_cm2: f64,
}

impl AreaObservation {
    /// Creates an observation.
    pub fn new(captured_at: DateTime<Utc>, area_cm2: f64) -> Self {
        Self {
            captured_at,
            area_cm2,
        }
    }
}

/// Progress of a wound at one assessment relative to the previous one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealingProgressPoint {
    /// When the photograph was taken.
    pub captured_at: DateTime<Utc>,
    /// Measured area in cm².
    pub area_cm2: f64,
    /// Area difference to the previous assessment in cm².
    pub area_change_cm2: f64,
    /// Area difference relative to the previous area, in percent.
    pub area_change_percent: f64,
    /// Area reduction per day since the previous assessment in cm².
    pub healing_rate: f64,
    /// Date the wound closes if the current rate holds.
    pub projected_healing_date: Option<DateTime<Utc>>,
}

/// Direction in which a wound is heading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealingTrend {
    /// The area shrinks by more than 5% per assessment.
    Improving,
    /// The area changes by at most 5% per assessment.
    Stable,
    /// The area grows by more than 5% per assessment.
    Worsening,
}

impl std::fmt::Display for HealingTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HealingTrend::Improving => "improving",
            HealingTrend::Stable => "stable",
            HealingTrend::Worsening => "worsening",
        };
        write!(f, "{name}")
    }
}

/// Aggregate healing figures of a wound.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WoundAnalytics {
    /// Area at the first assessment in cm².
    pub initial_area_cm2: f64,
    /// Area at the latest assessment in cm².
    pub current_area_cm2: f64,
    /// Area closed since the first assessment in cm².
    pub total_reduction_cm2: f64,
    /// Area closed since the first assessment in percent.
    pub total_reduction_percent: f64,
    /// Mean of the positive healing rates in cm² per day.
    pub average_healing_rate: f64,
    /// Average healing rate per week in cm².
    pub healing_velocity: f64,
    /// Whole days between onset and now.
    pub days_since_onset: i64,
    /// Direction of the latest assessments.
    pub trend: HealingTrend,
    /// Number of assessments.
    pub assessment_count: usize,
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / MILLIS_PER_DAY
}

fn projected_date(at: DateTime<Utc>, area: f64, rate: f64) -> Option<DateTime<Utc>> {
    if !(rate > 0.0 && area > 0.0) {
        return None;
    }
    let days = (area / rate).ceil();
    if !days.is_finite() || days > i64::MAX as f64 {
        return None;
    }
    let delta = TimeDelta::try_days(days as i64)?;
    at.checked_add_signed(delta)
}

/// Computes the progress of a wound across its assessments.
///
/// Observations are sorted by capture time first. The first entry has no change and no
/// healing rate. A non positive gap between two captures gives a zero rate.
///
/// # Arguments
///
/// * `observations` - The measured areas of one wound, in any order.
pub fn healing_progress(observations: &[AreaObservation]) -> Vec<HealingProgressPoint> {
    let mut sorted = observations.to_vec();
    sorted.sort_by_key(|o| o.captured_at);

    let mut previous: Option<AreaObservation> = None;
    sorted
        .into_iter()
        .map(|current| {
            let (change, percent, rate) = match previous {
                Some(prev) => {
                    let change = current.area_cm2 - prev.area_cm2;
                    let percent = if prev.area_cm2 != 0.0 {
                        change / prev.area_cm2 * 100.0
                    } else {
                        0.0
                    };
                    let days = days_between(prev.captured_at, current.captured_at);
                    let rate = if days > 0.0 { -change / days } else { 0.0 };
                    (change, percent, rate)
                }
                None => (0.0, 0.0, 0.0),
            };
            previous = Some(current);
            let projected = projected_date(current.captured_at, current.area_cm2, rate);

            HealingProgressPoint {
                captured_at: current.captured_at,
                area_cm2: round_to(current.area_cm2, 2),
                area_change_cm2: round_to(change, 2),
                area_change_percent: round_to(percent, 1),
                healing_rate: round_to(rate, 3),
                projected_healing_date: projected,
            }
        })
        .collect()
}

/// Classifies the average change of the latest assessments.
pub fn classify_trend(progress: &[HealingProgressPoint]) -> HealingTrend {
    let recent = &progress[progress.len().saturating_sub(TREND_WINDOW)..];
    if recent.is_empty() {
        return HealingTrend::Stable;
    }
    let average =
        recent.iter().map(|p| p.area_change_percent).sum::<f64>() / recent.len() as f64;
    if average < IMPROVING_PERCENT {
        HealingTrend::Improving
    } else if average > WORSENING_PERCENT {
        HealingTrend::Worsening
    } else {
        HealingTrend::Stable
    }
}

/// Aggregates the progress of a wound.
///
/// # Arguments
///
/// * `progress` - The output of [`healing_progress`].
/// * `onset` - When the wound appeared.
/// * `now` - The reference time for the days since onset.
///
/// # Returns
///
/// `None` if there are no assessments.
pub fn wound_analytics(
    progress: &[HealingProgressPoint],
    onset: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<WoundAnalytics> {
    let (first, last) = (progress.first()?, progress.last()?);

    let initial = first.area_cm2;
    let current = last.area_cm2;
    let reduction = initial - current;
    let reduction_percent = if initial > 0.0 {
        reduction / initial * 100.0
    } else {
        0.0
    };

    let positive: Vec<f64> = progress
        .iter()
        .map(|p| p.healing_rate)
        .filter(|&r| r > 0.0)
        .collect();
    let average_rate = if positive.is_empty() {
        0.0
    } else {
        positive.iter().sum::<f64>() / positive.len() as f64
    };

    Some(WoundAnalytics {
        initial_area_cm2: round_to(initial, 2),
        current_area_cm2: round_to(current, 2),
        total_reduction_cm2: round_to(reduction, 2),
        total_reduction_percent: round_to(reduction_percent, 1),
        average_healing_rate: round_to(average_rate, 3),
        healing_velocity: round_to(average_rate * 7.0, 3),
        days_since_onset: (now - onset).num_days(),
        trend: classify_trend(progress),
        assessment_count: progress.len(),
    })
}
