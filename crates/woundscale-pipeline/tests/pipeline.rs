use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use approx::assert_relative_eq;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use woundscale_calib::{
    CalibrationDetector, CalibrationError, CalibrationResult, EdgeFrame, Marker, MarkerDetector,
    MarkerKind,
};
use woundscale_image::{GrayscaleField, ImageError, Point, RasterImage};
use woundscale_measure::{HealingTrend, MeasurementConfig, SegmentationResult};
use woundscale_pipeline::{
    healing_report, AssessmentPipeline, AssessmentRequest, CalibrationPreview, InMemoryStore,
    ManualReference, PipelineConfig, PipelineError, PreviewConfig,
};
use woundscale_quality::QualityAssessor;

/// A ruler with five evenly spaced ticks 10 px apart.
struct FixedRuler;

impl MarkerDetector for FixedRuler {
    fn kind(&self) -> MarkerKind {
        MarkerKind::Ruler
    }

    fn detect(&self, _frame: &EdgeFrame) -> Result<CalibrationResult, CalibrationError> {
        let points = (0..5).map(|i| Point::new(4.0 + 10.0 * i as f64, 4.0)).collect();
        let marker = Marker::Ruler {
            angle: 0.0,
            tick_spacing_px: 10.0,
            tick_count: 5,
        };
        Ok(CalibrationResult::new(10.0, 0.95, marker, points))
    }
}

fn fixed_detector() -> CalibrationDetector {
    CalibrationDetector::with_detectors(vec![Box::new(FixedRuler)], 0.8)
}

// a 64x64 checkerboard with a near black square wound in the middle
fn frame(dark: u8, light: u8, wound_side: usize) -> Result<RasterImage, ImageError> {
    let size = 64;
    let mut image = RasterImage::from_size_val([size, size].into(), 255)?;
    let wound = (size - wound_side) / 2..(size + wound_side) / 2;
    for y in 0..size {
        for x in 0..size {
            let v = if wound.contains(&x) && wound.contains(&y) {
                10
            } else if (x + y) % 2 == 0 {
                dark
            } else {
                light
            };
            for ch in 0..3 {
                image.set_pixel(x, y, ch, v)?;
            }
        }
    }
    Ok(image)
}

fn dark_region(image: &RasterImage) -> Result<SegmentationResult, PipelineError> {
    let data = image
        .as_slice()
        .chunks_exact(4)
        .map(|px| if px[0] < 30 { 1.0 } else { 0.0 })
        .collect();
    let mask = GrayscaleField::new(image.size(), data)?;
    Ok(SegmentationResult::from_mask(mask, 0.9, 0.5))
}

fn monday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0)
        .single()
        .unwrap_or_default()
}

type SegmentFn = fn(&RasterImage) -> Result<SegmentationResult, PipelineError>;

fn fixed_pipeline() -> AssessmentPipeline<SegmentFn, InMemoryStore> {
    AssessmentPipeline::with_components(
        fixed_detector(),
        QualityAssessor::default(),
        MeasurementConfig::default(),
        dark_region as SegmentFn,
        InMemoryStore::new(),
    )
}

#[test]
fn assess_good_frame() -> Result<(), PipelineError> {
    let pipeline = fixed_pipeline();
    let request = AssessmentRequest::new("w1", monday(), frame(60, 200, 20)?).with_depth(0.5);

    let assessment = pipeline.assess(&request)?;
    assert!(assessment.quality.passed);
    assert!(!assessment.quality_overridden);
    assert_eq!(assessment.calibration.marker_kind(), Some(MarkerKind::Ruler));
    assert_relative_eq!(assessment.measurement.area_cm2, 4.0);
    assert_relative_eq!(assessment.measurement.length_cm, 1.9);
    assert_relative_eq!(assessment.measurement.width_cm, 1.9);
    assert_relative_eq!(assessment.measurement.perimeter_cm, 7.6);
    assert_eq!(assessment.measurement.depth_cm, Some(0.5));
    assert_eq!(assessment.measurement.volume_cm3, Some(0.65));
    assert!(assessment.warnings.is_empty());
    assert_eq!(assessment.contour.len(), 76);
    assert_eq!(pipeline.store().len()?, 1);
    Ok(())
}

#[test]
fn rejected_frame_is_not_segmented() -> Result<(), PipelineError> {
    let calls = Arc::new(AtomicUsize::new(0));
    let segmenter = {
        let calls = calls.clone();
        move |image: &RasterImage| {
            calls.fetch_add(1, Ordering::SeqCst);
            dark_region(image)
        }
    };
    let pipeline = AssessmentPipeline::with_components(
        fixed_detector(),
        QualityAssessor::default(),
        MeasurementConfig::default(),
        segmenter,
        InMemoryStore::new(),
    );

    let request = AssessmentRequest::new("w1", monday(), frame(0, 60, 20)?);
    match pipeline.assess(&request) {
        Err(PipelineError::QualityRejected(report)) => {
            assert!(!report.lighting.passed);
            assert!(!pipeline.assessor().recommendations(&report).is_empty());
        }
        other => panic!("expected a quality rejection, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(pipeline.store().is_empty()?);

    let assessment = pipeline.assess(&request.with_quality_override())?;
    assert!(assessment.quality_overridden);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.store().len()?, 1);
    Ok(())
}

#[test]
fn missing_marker_stops_the_pipeline() -> Result<(), PipelineError> {
    let calls = Arc::new(AtomicUsize::new(0));
    let segmenter = {
        let calls = calls.clone();
        move |image: &RasterImage| {
            calls.fetch_add(1, Ordering::SeqCst);
            dark_region(image)
        }
    };
    let store = InMemoryStore::new();
    let pipeline = AssessmentPipeline::new(PipelineConfig::default(), segmenter, store);

    let blank = RasterImage::from_size_val([64, 64].into(), 128)?;
    let request = AssessmentRequest::new("w1", monday(), blank).with_quality_override();
    assert!(matches!(
        pipeline.assess(&request),
        Err(PipelineError::CalibrationUnavailable)
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn manual_reference_replaces_detection() -> Result<(), PipelineError> {
    let pipeline = fixed_pipeline();
    let reference = ManualReference {
        from: Point::new(0.0, 0.0),
        to: Point::new(50.0, 0.0),
        distance_cm: 5.0,
    };
    let request =
        AssessmentRequest::new("w1", monday(), frame(60, 200, 20)?).with_manual_reference(reference);

    // no ruler ticks to judge the perspective from
    assert!(matches!(
        pipeline.assess(&request),
        Err(PipelineError::QualityRejected(_))
    ));

    let assessment = pipeline.assess(&request.with_quality_override())?;
    assert_eq!(assessment.calibration.marker_kind(), Some(MarkerKind::Manual));
    assert_relative_eq!(assessment.calibration.pixels_per_cm, 10.0);
    assert_relative_eq!(assessment.measurement.area_cm2, 4.0);
    Ok(())
}

#[test]
fn segmentation_failures_propagate() -> Result<(), PipelineError> {
    let wrong_size = |_: &RasterImage| -> Result<SegmentationResult, PipelineError> {
        let mask = GrayscaleField::from_size_val([32, 32].into(), 1.0)?;
        Ok(SegmentationResult::from_mask(mask, 0.9, 0.5))
    };
    let pipeline = AssessmentPipeline::with_components(
        fixed_detector(),
        QualityAssessor::default(),
        MeasurementConfig::default(),
        wrong_size,
        InMemoryStore::new(),
    );
    let request = AssessmentRequest::new("w1", monday(), frame(60, 200, 20)?);
    assert!(matches!(
        pipeline.assess(&request),
        Err(PipelineError::SegmentationSizeMismatch { .. })
    ));

    let failing = |_: &RasterImage| -> Result<SegmentationResult, PipelineError> {
        Err(PipelineError::Segmentation("model unavailable".to_string()))
    };
    let pipeline = AssessmentPipeline::with_components(
        fixed_detector(),
        QualityAssessor::default(),
        MeasurementConfig::default(),
        failing,
        InMemoryStore::new(),
    );
    match pipeline.assess(&request) {
        Err(e @ PipelineError::Segmentation(_)) => {
            assert_eq!(e.to_string(), "Segmentation failed: model unavailable");
        }
        other => panic!("expected a segmentation error, got {other:?}"),
    }
    assert!(pipeline.store().is_empty()?);
    Ok(())
}

#[test]
fn batch_keeps_request_order() -> Result<(), PipelineError> {
    let pipeline = fixed_pipeline();
    let requests = vec![
        AssessmentRequest::new("a", monday(), frame(60, 200, 20)?),
        AssessmentRequest::new("b", monday(), frame(0, 60, 20)?),
        AssessmentRequest::new("c", monday(), frame(60, 200, 16)?),
    ];

    let results = pipeline.assess_batch(&requests);
    assert_eq!(results.len(), 3);
    assert!(matches!(&results[0], Ok(a) if a.wound_id == "a"));
    assert!(matches!(&results[1], Err(PipelineError::QualityRejected(_))));
    assert!(matches!(&results[2], Ok(a) if a.measurement.area_cm2 == 2.56));
    assert_eq!(pipeline.store().len()?, 2);
    Ok(())
}

#[test]
fn healing_report_from_stored_assessments() -> Result<(), PipelineError> {
    let pipeline = fixed_pipeline();
    for (week, side) in [24, 20, 16].into_iter().enumerate() {
        let captured_at = monday() + TimeDelta::weeks(week as i64);
        pipeline.assess(&AssessmentRequest::new("w1", captured_at, frame(60, 200, side)?))?;
    }
    pipeline.assess(&AssessmentRequest::new("w2", monday(), frame(60, 200, 10)?))?;

    let onset = monday() - TimeDelta::days(5);
    let now = monday() + TimeDelta::days(16);
    let report = healing_report(pipeline.store(), "w1", onset, now)?;

    assert_eq!(report.progress.len(), 3);
    assert_relative_eq!(report.progress[0].area_cm2, 5.76);
    assert_relative_eq!(report.progress[2].area_cm2, 2.56);
    let Some(analytics) = report.analytics else {
        panic!("expected analytics for a stored wound");
    };
    assert_eq!(analytics.trend, HealingTrend::Improving);
    assert_eq!(analytics.days_since_onset, 21);
    assert_relative_eq!(analytics.total_reduction_cm2, 3.2);

    let empty = healing_report(pipeline.store(), "unknown", onset, now)?;
    assert!(empty.progress.is_empty());
    assert!(empty.analytics.is_none());
    Ok(())
}

#[test]
fn preview_reports_full_resolution_scale() -> Result<(), Box<dyn std::error::Error>> {
    let image = frame(60, 200, 20)?;
    let (tx, rx) = mpsc::channel();
    let config = PreviewConfig {
        interval_ms: 10,
        downsample_factor: 2,
    };

    let mut preview = CalibrationPreview::start(
        move || Some(image.clone()),
        fixed_detector(),
        config,
        move |result| {
            let _ = tx.send(result);
        },
    )?;
    assert!(preview.is_running());

    let result = rx.recv_timeout(Duration::from_secs(5))?;
    assert!(result.detected);
    assert_relative_eq!(result.pixels_per_cm, 20.0);
    assert_eq!(result.reference_points[1], Point::new(28.0, 8.0));

    preview.stop();
    assert!(!preview.is_running());
    Ok(())
}

#[test]
fn preview_stops_without_frames() -> Result<(), PipelineError> {
    let cancel;
    {
        let preview = CalibrationPreview::start(
            || -> Option<RasterImage> { None },
            fixed_detector(),
            PreviewConfig::default(),
            |_| panic!("no frame was grabbed"),
        )?;
        cancel = preview.cancel_token();
        assert!(preview.is_running());
    }
    // dropping the preview cancels and joins the loop
    assert!(cancel.load(Ordering::SeqCst));
    Ok(())
}
