use std::collections::HashMap;
use std::sync::Mutex;

use woundscale_image::RasterImage;
use woundscale_measure::SegmentationResult;

use crate::errors::PipelineError;
use crate::record::WoundAssessment;

/// The wound segmentation model.
///
/// Implementations report their own failures as [`PipelineError::Segmentation`].
/// Any `Fn(&RasterImage) -> Result<SegmentationResult, PipelineError>` closure is a
/// segmenter.
pub trait Segmenter: Send + Sync {
    /// Segments the wound of a frame.
    fn segment(&self, image: &RasterImage) -> Result<SegmentationResult, PipelineError>;
}

impl<F> Segmenter for F
where
    F: Fn(&RasterImage) -> Result<SegmentationResult, PipelineError> + Send + Sync,
{
    fn segment(&self, image: &RasterImage) -> Result<SegmentationResult, PipelineError> {
        self(image)
    }
}

/// Storage of finished assessments.
pub trait AssessmentStore: Send + Sync {
    /// Stores a finished assessment.
    fn save(&self, assessment: WoundAssessment) -> Result<(), PipelineError>;

    /// All assessments of a wound, in the order they were saved.
    fn assessments(&self, wound_id: &str) -> Result<Vec<WoundAssessment>, PipelineError>;
}

/// An [`AssessmentStore`] keeping everything in memory, keyed by wound id.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<String, Vec<WoundAssessment>>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored assessments over all wounds.
    ///
    /// # Errors
    ///
    /// If a writer panicked while holding the store.
    pub fn len(&self) -> Result<usize, PipelineError> {
        let records = self
            .records
            .lock()
            .map_err(|e| PipelineError::Store(e.to_string()))?;
        Ok(records.values().map(Vec::len).sum())
    }

    /// Whether nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// If a writer panicked while holding the store.
    pub fn is_empty(&self) -> Result<bool, PipelineError> {
        Ok(self.len()? == 0)
    }
}

impl AssessmentStore for InMemoryStore {
    fn save(&self, assessment: WoundAssessment) -> Result<(), PipelineError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| PipelineError::Store(e.to_string()))?;
        records
            .entry(assessment.wound_id.clone())
            .or_default()
            .push(assessment);
        Ok(())
    }

    fn assessments(&self, wound_id: &str) -> Result<Vec<WoundAssessment>, PipelineError> {
        let records = self
            .records
            .lock()
            .map_err(|e| PipelineError::Store(e.to_string()))?;
        Ok(records.get(wound_id).cloned().unwrap_or_default())
    }
}

impl<T: AssessmentStore + ?Sized> AssessmentStore for std::sync::Arc<T> {
    fn save(&self, assessment: WoundAssessment) -> Result<(), PipelineError> {
        (**self).save(assessment)
    }

    fn assessments(&self, wound_id: &str) -> Result<Vec<WoundAssessment>, PipelineError> {
        (**self).assessments(wound_id)
    }
}
