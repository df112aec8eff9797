use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, Result};

/// A candidate interval of the source video, carrying the score of its peak
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moment {
    /// Start time in seconds
    pub start_time: f64,

    /// End time in seconds
    pub end_time: f64,

    /// Excitement score of the originating peak
    pub score: f64,

    /// Window index of the originating peak, internal to selection
    #[serde(skip)]
    pub peak_window: usize,
}

impl Moment {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn midpoint(&self) -> f64 {
        (self.start_time + self.end_time) / 2.0
    }
}

/// Finds score peaks and turns them into moments
#[derive(Debug, Clone)]
pub struct PeakSelector {
    /// Percentile of all scores a peak must exceed
    pub threshold_percentile: f64,

    /// Minimum peak separation in seconds
    pub min_spacing: f64,
}

impl Default for PeakSelector {
    fn default() -> Self {
        Self {
            threshold_percentile: 70.0,
            min_spacing: 2.0,
        }
    }
}

/// Inputs describing the video the scores were computed from
#[derive(Debug, Clone, Copy)]
pub struct Timeline {
    /// Score windows per second
    pub rate: f64,

    /// Total duration in seconds
    pub duration: f64,
}

impl PeakSelector {
    pub fn new(threshold_percentile: f64, min_spacing: f64) -> Self {
        Self {
            threshold_percentile,
            min_spacing,
        }
    }

    /// Minimum index distance between two peaks at the given window rate
    pub fn spacing_windows(&self, rate: f64) -> usize {
        ((rate * self.min_spacing).floor() as usize).max(1)
    }

    /// Pick up to `count` moments of `moment_duration` seconds, sorted by start
    pub fn select(
        &self,
        scores: &[f64],
        count: usize,
        moment_duration: f64,
        timeline: Timeline,
    ) -> Result<Vec<Moment>> {
        if !(timeline.rate > 0.0) || !(timeline.duration >= 0.0) {
            return Err(AnalysisError::InvalidParameters {
                details: format!(
                    "invalid timeline: {} windows/s over {}s",
                    timeline.rate, timeline.duration
                ),
            }
            .into());
        }

        if scores.is_empty() || count == 0 {
            return Ok(Vec::new());
        }

        let threshold = percentile(scores, self.threshold_percentile);
        let distance = self.spacing_windows(timeline.rate);
        let peaks = find_peaks(scores, threshold, distance);
        debug!(
            "{} peaks above {:.3} (spacing {} windows)",
            peaks.len(),
            threshold,
            distance
        );

        let mut ranked = peaks;
        ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
        ranked.truncate(count);

        let half = moment_duration / 2.0;
        let mut moments: Vec<Moment> = ranked
            .into_iter()
            .filter_map(|window| {
                let center = window as f64 / timeline.rate;
                let start_time = (center - half).max(0.0);
                let end_time = (center + half).min(timeline.duration);
                if start_time < end_time {
                    Some(Moment {
                        start_time,
                        end_time,
                        score: scores[window],
                        peak_window: window,
                    })
                } else {
                    debug!("Dropping peak at window {} outside the video", window);
                    None
                }
            })
            .collect();

        moments.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Ok(moments)
    }
}

/// Percentile with linear interpolation between closest ranks
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Local maxima strictly above `threshold`, at least `distance` indices apart
///
/// A flat top counts once, at its middle sample. The first and last samples
/// are never peaks. When two peaks are too close the higher one wins, and
/// on equal height the earlier one.
pub fn find_peaks(values: &[f64], threshold: f64, distance: usize) -> Vec<usize> {
    let candidates: Vec<usize> = local_maxima(values)
        .into_iter()
        .filter(|&i| values[i] > threshold)
        .collect();

    if distance <= 1 || candidates.len() < 2 {
        return candidates;
    }

    let mut priority: Vec<usize> = (0..candidates.len()).collect();
    priority.sort_by(|&a, &b| {
        values[candidates[b]]
            .total_cmp(&values[candidates[a]])
            .then(a.cmp(&b))
    });

    let mut keep = vec![true; candidates.len()];
    for &p in &priority {
        if !keep[p] {
            continue;
        }
        let peak = candidates[p];

        let mut k = p;
        while k > 0 && peak - candidates[k - 1] < distance {
            k -= 1;
            keep[k] = false;
        }
        let mut k = p + 1;
        while k < candidates.len() && candidates[k] - peak < distance {
            keep[k] = false;
            k += 1;
        }
    }

    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(index, kept)| kept.then_some(index))
        .collect()
}

fn local_maxima(values: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if values.len() < 3 {
        return maxima;
    }

    let last = values.len() - 1;
    let mut i = 1;
    while i < last {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead < last && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    maxima
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMELINE: Timeline = Timeline { rate: 10.0, duration: 10.0 };

    #[test]
    fn test_percentile_matches_linear_interpolation() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 50.0), 3.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
        assert!((percentile(&values, 70.0) - 3.8).abs() < 1e-12);
    }

    #[test]
    fn test_local_maxima_and_plateaus() {
        let values = [0.0, 1.0, 0.0, 2.0, 2.0, 2.0, 0.0, 3.0, 3.0];
        // trailing plateau touches the edge and is not a peak
        assert_eq!(local_maxima(&values), vec![1, 4]);
    }

    #[test]
    fn test_edges_are_not_peaks() {
        assert!(find_peaks(&[5.0, 1.0, 5.0], 0.0, 1).is_empty());
    }

    #[test]
    fn test_threshold_is_strict() {
        let values = [0.0, 1.0, 0.0, 2.0, 0.0];
        assert_eq!(find_peaks(&values, 1.0, 1), vec![3]);
    }

    #[test]
    fn test_spacing_keeps_higher_peak() {
        let values = [0.0, 3.0, 0.0, 5.0, 0.0, 1.0, 0.0, 0.0, 0.0, 4.0, 0.0];
        assert_eq!(find_peaks(&values, 0.0, 3), vec![3, 9]);
    }

    #[test]
    fn test_spacing_tie_prefers_earlier() {
        let values = [0.0, 2.0, 0.0, 2.0, 0.0];
        assert_eq!(find_peaks(&values, 0.0, 5), vec![1]);
    }

    #[test]
    fn test_select_top_k_sorted_by_time() {
        let mut scores = vec![0.0; 100];
        scores[20] = 3.0;
        scores[50] = 9.0;
        scores[80] = 6.0;

        let moments = PeakSelector::default().select(&scores, 2, 3.0, TIMELINE).unwrap();
        assert_eq!(moments.len(), 2);
        assert_eq!(moments[0].peak_window, 50);
        assert_eq!(moments[1].peak_window, 80);
        assert_eq!(moments[0].score, 9.0);
        assert!((moments[0].start_time - 3.5).abs() < 1e-12);
        assert!((moments[0].end_time - 6.5).abs() < 1e-12);
    }

    #[test]
    fn test_moments_clamped_to_video() {
        let mut scores = vec![0.0; 100];
        scores[5] = 4.0;
        scores[98] = 5.0;

        let moments = PeakSelector::default().select(&scores, 10, 3.0, TIMELINE).unwrap();
        assert_eq!(moments.len(), 2);
        assert_eq!(moments[0].start_time, 0.0);
        assert!((moments[0].end_time - 2.0).abs() < 1e-12);
        assert_eq!(moments[1].end_time, 10.0);
        for m in &moments {
            assert!(0.0 <= m.start_time && m.start_time < m.end_time && m.end_time <= 10.0);
        }
    }

    #[test]
    fn test_flat_scores_yield_no_moments() {
        let scores = vec![0.0; 300];
        let moments = PeakSelector::default().select(&scores, 10, 3.0, TIMELINE).unwrap();
        assert!(moments.is_empty());
    }

    #[test]
    fn test_selected_peaks_respect_spacing() {
        let scores: Vec<f64> = (0..400)
            .map(|i| ((i as f64) * 0.37).sin() + (i % 7) as f64 * 0.1)
            .collect();
        let selector = PeakSelector::default();
        let timeline = Timeline { rate: 10.0, duration: 40.0 };
        let moments = selector.select(&scores, 50, 1.0, timeline).unwrap();
        let distance = selector.spacing_windows(10.0);

        let mut windows: Vec<usize> = moments.iter().map(|m| m.peak_window).collect();
        windows.sort_unstable();
        assert!(windows.windows(2).all(|w| w[1] - w[0] >= distance));
        assert!(moments.windows(2).all(|m| m[0].start_time <= m[1].start_time));
    }

    #[test]
    fn test_moment_json_has_only_times_and_score() {
        let moment = Moment {
            start_time: 3.5,
            end_time: 6.5,
            score: 2.25,
            peak_window: 50,
        };

        let json = serde_json::to_value(&moment).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["end_time", "score", "start_time"]);
        assert_eq!(json["start_time"], 3.5);

        let parsed: Moment = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.peak_window, 0);
        assert_eq!(parsed.end_time, 6.5);
    }
}
