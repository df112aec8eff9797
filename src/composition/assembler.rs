use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analysis::Moment;
use crate::error::{CompositionError, Result};
use crate::video::{RenderRequest, TrailerRenderer, VideoInfo};

/// Moments admitted into a trailer, in playback order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trailer {
    pub moments: Vec<Moment>,

    /// Sum of admitted moment durations in seconds
    pub total_duration: f64,
}

impl Trailer {
    pub fn is_empty(&self) -> bool {
        self.moments.is_empty()
    }
}

/// Greedily fills a duration budget with moments
///
/// Moments are taken in order until the running total has reached the
/// budget. The moment that crosses the budget is kept whole, so a trailer
/// can run over by at most one moment and is never padded.
#[derive(Debug, Clone)]
pub struct TrailerAssembler {
    max_duration: f64,
}

impl TrailerAssembler {
    pub fn new(max_duration: f64) -> Self {
        Self { max_duration }
    }

    /// Pick the moments that fit the budget
    pub fn admit(&self, moments: &[Moment]) -> Trailer {
        let mut admitted = Vec::new();
        let mut total_duration = 0.0;

        for moment in moments {
            if total_duration >= self.max_duration {
                break;
            }
            total_duration += moment.duration();
            admitted.push(moment.clone());
        }

        admitted.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        debug!(
            "Admitted {}/{} moments, {:.2}s of {:.2}s budget",
            admitted.len(),
            moments.len(),
            total_duration,
            self.max_duration
        );

        Trailer {
            moments: admitted,
            total_duration,
        }
    }

    /// Admit moments and render them into `output`
    ///
    /// An empty admission is reported as [`CompositionError::NothingToAssemble`]
    /// before the renderer runs, so no output file is created.
    pub fn assemble(
        &self,
        moments: &[Moment],
        source: &VideoInfo,
        output: &Path,
        renderer: &dyn TrailerRenderer,
    ) -> Result<Trailer> {
        let trailer = self.admit(moments);
        if trailer.is_empty() {
            return Err(CompositionError::NothingToAssemble {
                detected: moments.len(),
                budget: self.max_duration,
            }
            .into());
        }

        renderer.render(&RenderRequest {
            source: &source.path,
            segments: &trailer.moments,
            with_audio: source.has_audio,
            output,
        })?;

        info!(
            "Trailer with {} moments ({:.1}s) written to {} by {}",
            trailer.moments.len(),
            trailer.total_duration,
            output.display(),
            renderer.name()
        );
        Ok(trailer)
    }
}
