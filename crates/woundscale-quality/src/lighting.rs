use serde::{Deserialize, Serialize};
use woundscale_image::{GrayscaleField, ImageError};
use woundscale_imgproc::histogram::intensity_histogram;

const DARK_AVERAGE: f64 = 50.0;
const BRIGHT_AVERAGE: f64 = 200.0;
const MIN_DYNAMIC_RANGE: usize = 100;
const SHADOW_BINS: std::ops::Range<usize> = 0..50;
const MAX_SHADOW_FRACTION: f64 = 0.3;
const HIGHLIGHT_BINS: std::ops::Range<usize> = 245..256;
const MAX_HIGHLIGHT_FRACTION: f64 = 0.1;

/// A lighting problem detected from the brightness histogram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightingIssue {
    /// Average brightness below 50.
    TooDark,
    /// Average brightness above 200.
    TooBright,
    /// Brightness range narrower than 100 levels.
    LowContrast,
    /// More than 30% of the pixels below 50.
    Shadows,
    /// More than 10% of the pixels at 245 or above.
    Overexposed,
}

impl LightingIssue {
    /// Short description of the issue.
    pub fn message(&self) -> &'static str {
        match self {
            LightingIssue::TooDark => "too dark",
            LightingIssue::TooBright => "too bright",
            LightingIssue::LowContrast => "low contrast",
            LightingIssue::Shadows => "shadows",
            LightingIssue::Overexposed => "overexposed",
        }
    }

    /// What the operator can do about the issue.
    pub fn advice(&self) -> &'static str {
        match self {
            LightingIssue::TooDark => "Increase ambient lighting or move to a brighter area",
            LightingIssue::TooBright => "Reduce the light on the wound or avoid direct sunlight",
            LightingIssue::LowContrast => "Use a plain background that contrasts with the wound",
            LightingIssue::Shadows => "Reposition the light so no shadow falls on the wound",
            LightingIssue::Overexposed => "Turn off the flash to avoid glare on the wound",
        }
    }
}

impl std::fmt::Display for LightingIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of the lighting check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightingCheck {
    /// Lighting score in `[0, 1]`.
    pub score: f64,
    /// Whether the score is high enough and at most one issue was found.
    pub passed: bool,
    /// Average brightness in `[0, 255]`.
    pub average: f64,
    /// Difference between the brightest and darkest occupied bins.
    pub dynamic_range: usize,
    /// Detected issues.
    pub issues: Vec<LightingIssue>,
}

/// Scores the exposure of a frame from its 256-bin brightness histogram.
///
/// # Arguments
///
/// * `gray` - The luma of the frame.
/// * `min_score` - The minimum score for the check to pass.
pub fn check_lighting(gray: &GrayscaleField, min_score: f64) -> Result<LightingCheck, ImageError> {
    let hist = intensity_histogram(gray)?;
    Ok(lighting_from_histogram(&hist, min_score))
}

/// Scores the exposure described by a 256-bin brightness histogram.
pub fn lighting_from_histogram(hist: &[usize; 256], min_score: f64) -> LightingCheck {
    let total: usize = hist.iter().sum();
    if total == 0 {
        return LightingCheck {
            score: 0.0,
            passed: false,
            average: 0.0,
            dynamic_range: 0,
            issues: Vec::new(),
        };
    }

    let total_f = total as f64;
    let average = hist
        .iter()
        .enumerate()
        .map(|(bin, &count)| bin as f64 * count as f64)
        .sum::<f64>()
        / total_f;
    let lowest = hist.iter().position(|&c| c > 0).unwrap_or(0);
    let highest = hist.iter().rposition(|&c| c > 0).unwrap_or(0);
    let dynamic_range = highest - lowest;

    let fraction = |bins: std::ops::Range<usize>| hist[bins].iter().sum::<usize>() as f64 / total_f;

    let mut issues = Vec::new();
    if average < DARK_AVERAGE {
        issues.push(LightingIssue::TooDark);
    }
    if average > BRIGHT_AVERAGE {
        issues.push(LightingIssue::TooBright);
    }
    if dynamic_range < MIN_DYNAMIC_RANGE {
        issues.push(LightingIssue::LowContrast);
    }
    if fraction(SHADOW_BINS) > MAX_SHADOW_FRACTION {
        issues.push(LightingIssue::Shadows);
    }
    if fraction(HIGHLIGHT_BINS) > MAX_HIGHLIGHT_FRACTION {
        issues.push(LightingIssue::Overexposed);
    }

    let exposure_penalty = (average - 128.0).abs() / 256.0 * 0.3;
    let contrast_penalty = ((150.0 - dynamic_range as f64) / 150.0).max(0.0) * 0.3;
    let issue_penalty = issues.len() as f64 * 0.15;
    let score = (1.0 - exposure_penalty - contrast_penalty - issue_penalty).clamp(0.0, 1.0);

    LightingCheck {
        score,
        passed: score >= min_score && issues.len() <= 1,
        average,
        dynamic_range,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn histogram(entries: &[(usize, usize)]) -> [usize; 256] {
        let mut hist = [0usize; 256];
        for &(bin, count) in entries {
            hist[bin] += count;
        }
        hist
    }

    #[test]
    fn test_well_exposed() {
        let check = lighting_from_histogram(&histogram(&[(60, 50), (200, 50)]), 0.6);
        assert!(check.issues.is_empty());
        assert_relative_eq!(check.average, 130.0);
        assert_eq!(check.dynamic_range, 140);
        assert_relative_eq!(check.score, 1.0 - 2.0 / 256.0 * 0.3 - 10.0 / 150.0 * 0.3);
        assert!(check.passed);
    }

    #[test]
    fn test_dark_frame() {
        let check = lighting_from_histogram(&histogram(&[(0, 50), (60, 50)]), 0.6);
        assert_eq!(
            check.issues,
            vec![
                LightingIssue::TooDark,
                LightingIssue::LowContrast,
                LightingIssue::Shadows
            ]
        );
        assert!(!check.passed);
    }

    #[test]
    fn test_overexposed_frame() {
        let check = lighting_from_histogram(&histogram(&[(100, 80), (250, 20)]), 0.6);
        assert_eq!(check.issues, vec![LightingIssue::Overexposed]);
        assert_relative_eq!(check.average, 130.0);
        // a single issue still passes when the score is high enough
        assert!(check.passed);
    }

    #[test]
    fn test_gray_field() -> Result<(), ImageError> {
        let gray = GrayscaleField::from_size_val([4, 4].into(), 255.0)?;
        let check = check_lighting(&gray, 0.6)?;
        assert!(check.issues.contains(&LightingIssue::TooBright));
        assert!(check.issues.contains(&LightingIssue::Overexposed));
        assert!(check.issues.contains(&LightingIssue::LowContrast));
        assert!(!check.passed);
        assert_eq!(LightingIssue::TooBright.to_string(), "too bright");
        Ok(())
    }
}
