use approx::assert_relative_eq;
use nalgebra::{Matrix4, Vector3};
use rig_fusion::aruco::{
    Dictionary, LocatorParams, MarkerLocator, MarkerObservation, SquareMarkerLocator,
};
use rig_fusion::core::frames::{
    camera_to_marker_transform, compose, invert, rig_axis_flip,
};
use rig_fusion::core::{
    BgrImage, BrownConrady, CameraIntrinsics, GrayImage, MarkerPose, Quaternion, RigTransformStrategy,
    RotationVector, TrackerPose, Transform4,
};
use rig_fusion::{
    CalibrationEngine, CalibrationOutcome, CalibrationSettings, CalibrationTick, Estimate,
    FrameSource, InvalidReason, PoseEstimator, RetryPolicy, SourceError,
};
use std::cell::Cell;
use std::collections::VecDeque;
use std::time::Duration;

const BITS: usize = 5;

fn dictionary() -> Dictionary {
    Dictionary::new(
        "DICT_TEST_5X5",
        BITS,
        2,
        vec![0x1A5_C3E1, 0x0F3_0A96, 0x155_AA33, 0x0C6_3B5A],
    )
    .expect("dictionary")
}

fn intrinsics() -> CameraIntrinsics {
    CameraIntrinsics {
        width: 200,
        height: 200,
        fx: 500.0,
        fy: 500.0,
        ppx: 99.5,
        ppy: 99.5,
        distortion: BrownConrady::default(),
    }
}

/// 70 px marker centred on the principal point; with a 0.14 edge it sits
/// one unit in front of the camera, facing it.
fn marker_frame(code: u64) -> BgrImage {
    let mut img = GrayImage::filled(200, 200, 255);
    let cells = BITS + 2;
    for cy in 0..cells {
        for cx in 0..cells {
            let border = cx == 0 || cy == 0 || cx + 1 == cells || cy + 1 == cells;
            if !(border || (code >> ((cy - 1) * BITS + (cx - 1))) & 1 == 1) {
                continue;
            }
            for y in 0..10 {
                for x in 0..10 {
                    img.data[(65 + cy * 10 + y) * 200 + 65 + cx * 10 + x] = 0;
                }
            }
        }
    }
    BgrImage::from_gray(&img)
}

fn blank_frame() -> BgrImage {
    BgrImage::from_gray(&GrayImage::filled(200, 200, 255))
}

fn level_at(x: f64, y: f64, z: f64) -> TrackerPose {
    TrackerPose::new(Vector3::new(x, y, z), Quaternion::IDENTITY)
}

fn rolled(deg: f64) -> TrackerPose {
    let half = deg.to_radians() / 2.0;
    TrackerPose::new(Vector3::zeros(), Quaternion::new(half.sin(), 0.0, 0.0, half.cos()))
}

#[derive(Default)]
struct ScriptedSource {
    poses: VecDeque<Result<TrackerPose, SourceError>>,
    images: VecDeque<Result<BgrImage, SourceError>>,
}

impl ScriptedSource {
    fn push(&mut self, pose: TrackerPose, image: BgrImage) {
        self.poses.push_back(Ok(pose));
        self.images.push_back(Ok(image));
    }

    fn remaining(&self) -> (usize, usize) {
        (self.poses.len(), self.images.len())
    }
}

fn exhausted(stream: &'static str) -> SourceError {
    SourceError::Read {
        stream,
        reason: "script exhausted".into(),
    }
}

impl FrameSource for ScriptedSource {
    fn next_tracker_pose(&mut self) -> Result<TrackerPose, SourceError> {
        self.poses.pop_front().unwrap_or_else(|| Err(exhausted("pose")))
    }

    fn next_color_image(&mut self) -> Result<BgrImage, SourceError> {
        self.images.pop_front().unwrap_or_else(|| Err(exhausted("color")))
    }

    fn intrinsics(&self) -> CameraIntrinsics {
        intrinsics()
    }
}

/// Locator returning a fixed answer and counting calls.
struct FixedLocator {
    pose: Option<MarkerPose>,
    calls: Cell<usize>,
}

impl FixedLocator {
    fn new(pose: Option<MarkerPose>) -> Self {
        Self {
            pose,
            calls: Cell::new(0),
        }
    }
}

impl MarkerLocator for FixedLocator {
    fn locate(&self, _image: &BgrImage) -> Vec<MarkerObservation> {
        self.calls.set(self.calls.get() + 1);
        self.pose
            .map(|pose| MarkerObservation {
                id: 0,
                corners: [nalgebra::Point2::origin(); 4],
                pose,
                hamming: 0,
                score: 1.0,
            })
            .into_iter()
            .collect()
    }
}

fn facing_pose() -> MarkerPose {
    MarkerPose::new(RotationVector::new(std::f64::consts::PI, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0))
}

fn square_locator() -> SquareMarkerLocator {
    let params = LocatorParams {
        marker_length: 0.14,
        ..LocatorParams::default()
    };
    SquareMarkerLocator::new(dictionary(), intrinsics(), params).expect("locator")
}

#[test]
fn end_to_end_with_rendered_marker() {
    let code = dictionary().codes[2];
    let mut source = ScriptedSource::default();
    source.push(level_at(0.0, 0.0, 0.0), marker_frame(code));
    source.push(level_at(0.0, 0.0, 0.0), blank_frame());
    source.push(level_at(0.1, 0.2, 0.3), blank_frame());

    let locator = square_locator();
    let mut engine = CalibrationEngine::default();
    let tick = engine.step(&mut source, &locator).expect("step");
    assert_eq!(tick, CalibrationTick::Calibrated { marker_id: 2 });

    let fixed = engine.fixed_transforms().expect("calibrated");
    let expected_t2w = compose(&fixed.camera_to_marker, &rig_axis_flip());
    assert!(fixed.tracker_to_world.approx_eq(&expected_t2w, 1e-12));
    assert_eq!(fixed.tracker_to_camera, rig_axis_flip());

    // Marker one unit straight ahead, facing the camera: the camera sits at
    // (0, 0, 1) in the marker frame and the axis flip cancels the marker's.
    let expected = Transform4::new(Matrix4::new(
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 1.0, //
        0.0, 0.0, 0.0, 1.0,
    ));
    assert!(fixed.tracker_to_world.approx_eq(&expected, 1e-9));

    let estimator = PoseEstimator::new(&engine, &locator);
    let origin = estimator.poll(&mut source).location().expect("location");
    assert_relative_eq!(origin, fixed.camera_to_marker.translation(), epsilon = 1e-12);
    assert_relative_eq!(origin, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-9);

    let moved = estimator.poll(&mut source).location().expect("location");
    assert_relative_eq!(moved, Vector3::new(0.1, 0.2, 1.3), epsilon = 1e-9);

    assert_eq!(
        estimator.poll(&mut source),
        Estimate::Invalid(InvalidReason::SensorRead)
    );
}

#[test]
fn tilted_rig_is_rejected_without_running_the_locator() {
    let mut source = ScriptedSource::default();
    source.push(rolled(1.5), blank_frame());
    source.push(rolled(0.5), blank_frame());

    let locator = FixedLocator::new(None);
    let mut engine = CalibrationEngine::default();

    match engine.step(&mut source, &locator).expect("step") {
        CalibrationTick::AttitudeRejected { roll, yaw, threshold } => {
            assert_relative_eq!(roll, 1.5, epsilon = 1e-9);
            assert_relative_eq!(yaw, 0.0, epsilon = 1e-12);
            assert_eq!(threshold, 1.0);
        }
        other => panic!("unexpected tick {other:?}"),
    }
    assert_eq!(locator.calls.get(), 0);

    let tick = engine.step(&mut source, &locator).expect("step");
    assert_eq!(tick, CalibrationTick::MarkerNotFound);
    assert_eq!(locator.calls.get(), 1);
    assert!(!engine.is_calibrated());
}

#[test]
fn calibration_is_a_no_op_once_calibrated() {
    let mut source = ScriptedSource::default();
    for _ in 0..3 {
        source.push(level_at(0.0, 0.0, 0.0), blank_frame());
    }
    let locator = FixedLocator::new(Some(facing_pose()));
    let mut engine = CalibrationEngine::default();

    assert!(engine.step(&mut source, &locator).expect("step").is_calibrated());
    let fixed = *engine.fixed_transforms().expect("calibrated");
    assert_eq!(source.remaining(), (2, 2));

    for _ in 0..3 {
        assert_eq!(
            engine.step(&mut source, &locator).expect("step"),
            CalibrationTick::AlreadyCalibrated
        );
    }
    assert_eq!(source.remaining(), (2, 2));
    assert_eq!(locator.calls.get(), 1);
    assert_eq!(engine.fixed_transforms(), Some(&fixed));

    engine.reset();
    assert!(engine.fixed_transforms().is_none());
    assert!(engine.step(&mut source, &locator).expect("step").is_calibrated());
}

#[test]
fn read_failure_during_calibration_is_retryable() {
    let mut source = ScriptedSource::default();
    source.poses.push_back(Ok(level_at(0.0, 0.0, 0.0)));
    source.images.push_back(Err(exhausted("color")));
    source.push(level_at(0.0, 0.0, 0.0), blank_frame());

    let locator = FixedLocator::new(Some(facing_pose()));
    let mut engine = CalibrationEngine::default();
    let tick = engine.step(&mut source, &locator).expect("step");
    assert!(matches!(tick, CalibrationTick::ReadFailed { .. }));
    assert!(!tick.is_end_of_stream());
    assert!(!engine.is_calibrated());
    assert!(engine.step(&mut source, &locator).expect("step").is_calibrated());
}

#[test]
fn polling_before_calibration_returns_the_sentinel() {
    let mut source = ScriptedSource::default();
    source.push(level_at(1.0, 2.0, 3.0), blank_frame());
    let locator = FixedLocator::new(None);
    let engine = CalibrationEngine::default();

    let estimate = PoseEstimator::new(&engine, &locator).poll(&mut source);
    assert_eq!(estimate, Estimate::Invalid(InvalidReason::NotCalibrated));
    assert!(estimate.location().is_none());
    assert_eq!(source.remaining(), (1, 1));
}

#[test]
fn steady_state_read_failure_does_not_end_polling() {
    let mut source = ScriptedSource::default();
    source.push(level_at(0.0, 0.0, 0.0), blank_frame());
    source.poses.push_back(Err(exhausted("pose")));
    source.images.push_back(Ok(blank_frame()));
    source.push(level_at(0.0, 0.0, 0.0), blank_frame());

    let locator = FixedLocator::new(Some(facing_pose()));
    let mut engine = CalibrationEngine::default();
    assert!(engine.step(&mut source, &locator).expect("step").is_calibrated());

    let estimator = PoseEstimator::new(&engine, &locator);
    assert_eq!(
        estimator.poll(&mut source),
        Estimate::Invalid(InvalidReason::SensorRead)
    );
    // The failed tick consumed the pose only; drop the orphaned image.
    let _ = source.images.pop_front();
    let next = estimator.poll(&mut source);
    assert!(next.is_valid());
}

#[test]
fn non_finite_tracker_position_is_invalid() {
    let mut source = ScriptedSource::default();
    source.push(level_at(0.0, 0.0, 0.0), blank_frame());
    source.push(level_at(f64::NAN, 0.0, 0.0), blank_frame());

    let locator = FixedLocator::new(Some(facing_pose()));
    let mut engine = CalibrationEngine::default();
    assert!(engine.step(&mut source, &locator).expect("step").is_calibrated());
    assert_eq!(
        PoseEstimator::new(&engine, &locator).poll(&mut source),
        Estimate::Invalid(InvalidReason::NonFinite)
    );
}

#[test]
fn detect_mode_reports_camera_in_marker_frame() {
    let code = dictionary().codes[0];
    let mut source = ScriptedSource::default();
    for _ in 0..3 {
        source.push(level_at(0.0, 0.0, 0.0), marker_frame(code));
    }
    let locator = square_locator();
    let mut engine = CalibrationEngine::default();
    assert!(engine.step(&mut source, &locator).expect("step").is_calibrated());

    let mut estimator = PoseEstimator::new(&engine, &locator);
    match estimator.poll(&mut source) {
        Estimate::Location { marker_relative, .. } => assert!(marker_relative.is_none()),
        other => panic!("unexpected {other:?}"),
    }

    estimator.start_detect();
    assert!(estimator.detect_mode());
    match estimator.poll(&mut source) {
        Estimate::Location {
            world,
            marker_relative,
        } => {
            let rel = marker_relative.expect("marker in view");
            assert_relative_eq!(rel, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-9);
            assert_relative_eq!(world, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-9);
        }
        other => panic!("unexpected {other:?}"),
    }
    estimator.stop_detect();
    assert!(!estimator.detect_mode());
}

#[test]
fn experimental_strategy_undoes_the_tracker_pose() {
    let tracker = TrackerPose::new(
        Vector3::new(0.3, -0.1, 0.2),
        Quaternion::new(0.0, 0.0, 0.0, 1.0),
    );
    let mut source = ScriptedSource::default();
    source.push(tracker, blank_frame());

    let locator = FixedLocator::new(Some(facing_pose()));
    let mut engine = CalibrationEngine::new(CalibrationSettings {
        rig_transform: RigTransformStrategy::TrackerPose,
        ..CalibrationSettings::default()
    });
    assert!(engine.step(&mut source, &locator).expect("step").is_calibrated());

    let fixed = engine.fixed_transforms().expect("calibrated");
    let expected_t2c = compose(
        &invert(&tracker.to_transform()).expect("rigid"),
        &rig_axis_flip(),
    );
    assert!(fixed.tracker_to_camera.approx_eq(&expected_t2c, 1e-12));
    let c2m = camera_to_marker_transform(&facing_pose()).expect("rigid");
    assert!(fixed
        .tracker_to_world
        .approx_eq(&compose(&c2m, &expected_t2c), 1e-12));
}

#[test]
fn retry_loop_honours_budget_and_stop_predicate() {
    let policy = RetryPolicy {
        interval: Duration::ZERO,
        max_attempts: Some(3),
    };
    let locator = FixedLocator::new(None);

    let mut source = ScriptedSource::default();
    for _ in 0..5 {
        source.push(level_at(0.0, 0.0, 0.0), blank_frame());
    }
    let mut engine = CalibrationEngine::default();
    let outcome = engine
        .run_calibration(&mut source, &locator, &policy, |_| false)
        .expect("loop");
    assert_eq!(outcome, CalibrationOutcome::Exhausted { attempts: 3 });
    assert_eq!(source.remaining(), (2, 2));

    let mut seen = Vec::new();
    let outcome = engine
        .run_calibration(&mut source, &locator, &RetryPolicy { max_attempts: None, ..policy }, |tick| {
            seen.push(tick.to_string());
            true
        })
        .expect("loop");
    assert_eq!(outcome, CalibrationOutcome::Stopped { attempts: 1 });
    assert_eq!(seen, vec!["calibration fails: marker not detected".to_string()]);

    let found = FixedLocator::new(Some(facing_pose()));
    let outcome = engine
        .run_calibration(&mut source, &found, &policy, |_| false)
        .expect("loop");
    assert_eq!(outcome, CalibrationOutcome::Calibrated { attempts: 1 });
}

#[test]
fn finished_recording_ends_the_retry_loop() {
    let mut source = ScriptedSource::default();
    source.push(rolled(2.0), blank_frame());
    source.poses.push_back(Err(SourceError::EndOfRecording(1)));

    let locator = FixedLocator::new(Some(facing_pose()));
    let policy = RetryPolicy {
        interval: Duration::ZERO,
        max_attempts: None,
    };
    let mut engine = CalibrationEngine::default();
    let mut ticks = Vec::new();
    let outcome = engine
        .run_calibration(&mut source, &locator, &policy, |tick| {
            ticks.push(tick.clone());
            tick.is_end_of_stream()
        })
        .expect("loop");

    assert_eq!(outcome, CalibrationOutcome::Stopped { attempts: 2 });
    assert!(matches!(ticks[0], CalibrationTick::AttitudeRejected { .. }));
    assert!(ticks[1].is_end_of_stream());
    assert!(ticks[1].to_string().contains("end of recording after 1 frames"));
    assert!(!engine.is_calibrated());
}
