//! Playback-side scenarios: frame clock, detections, trajectories and drag editing.

use swing_core::progress::{self, noop_sender, ProgressEvent};
use swing_core::source::synthetic::SyntheticFrameCallbacks;
use swing_core::timeline::TrackGeometry;
use swing_core::{
    detect_fps, CancelToken, DragPhase, EngineConfig, FpsSource, FrameClockConfig, HitTarget,
    IngestOutcome, MotionSession, PressOutcome, ReleaseOutcome, TimelineConfig, TimelineModel,
};
use swing_models::{
    Detection, DetectionKind, Edge, EventId, FrameDetection, JointId, Keypoint, PosePerson,
    PoseResult, TimelineEvent, TrackedPoint,
};

fn pose_frame(frame: u64, score: f64) -> FrameDetection {
    let keypoints = (0..JointId::COUNT)
        .map(|joint| Keypoint::new(100.0 + frame as f64, 50.0 + f64::from(joint), score))
        .collect();
    FrameDetection::new(
        frame,
        Detection::Pose(PoseResult {
            people: vec![PosePerson::new(keypoints, score)],
        }),
    )
}

#[tokio::test]
async fn test_sixty_hertz_callbacks_detect_sixty() {
    let mut callbacks = SyntheticFrameCallbacks::fixed_rate(60.0, 60);
    let (sender, mut receiver) = progress::channel("clip.mp4");

    let detection = detect_fps(
        &mut callbacks,
        &FrameClockConfig::default(),
        &CancelToken::new(),
        &sender,
    )
    .await;

    assert_eq!(detection.fps, 60);
    assert_eq!(detection.source, FpsSource::Detected);
    assert_eq!(
        receiver.try_recv(),
        Some(ProgressEvent::FpsDetected {
            fps: 60,
            detected: true
        })
    );

    let mut session = MotionSession::new(&EngineConfig::default());
    session.apply_fps(&detection);
    assert_eq!(session.clock().fps(), 60);
    assert_eq!(session.tick(1.0).frame, 60);
}

#[tokio::test]
async fn test_unsupported_platform_falls_back() {
    let mut callbacks = SyntheticFrameCallbacks::unsupported();
    let detection = detect_fps(
        &mut callbacks,
        &FrameClockConfig::default(),
        &CancelToken::new(),
        &noop_sender(),
    )
    .await;
    assert_eq!(detection.fps, 30);
    assert!(!detection.is_detected());
}

#[test]
fn test_joint_trajectory_records_each_frame_once() {
    let mut session = MotionSession::new(&EngineConfig::default());
    let knee = TrackedPoint::Joint(JointId(13));
    session.select_points([knee]);

    for frame in 10..=40 {
        session.detections_mut().ingest(pose_frame(frame, 0.8));
        session.tick(frame as f64 / 30.0);
    }
    let points = session.trajectory(knee);
    assert_eq!(points.len(), 31);
    assert_eq!(points.first().map(|p| p.frame), Some(10));
    assert_eq!(points.last().map(|p| p.frame), Some(40));
    assert!(points.windows(2).all(|pair| pair[0].frame < pair[1].frame));
}

#[test]
fn test_same_frame_twice_is_one_sample() {
    let mut session = MotionSession::new(&EngineConfig::default());
    let wrist = TrackedPoint::Joint(JointId::LEFT_WRIST);
    session.select_points([wrist]);

    assert_eq!(
        session.detections_mut().ingest(pose_frame(100, 0.9)),
        IngestOutcome::Accepted
    );
    session.tick(100.0 / 30.0);
    assert_eq!(
        session.detections_mut().ingest(pose_frame(100, 0.9)),
        IngestOutcome::Duplicate
    );
    session.tick(100.0 / 30.0);

    assert_eq!(session.trajectory(wrist).len(), 1);
    let aggregate = session
        .detections()
        .aggregates()
        .iter()
        .find(|(identity, _)| identity.kind() == DetectionKind::Pose)
        .map(|(_, running)| running.count);
    assert_eq!(aggregate, Some(1));
}

#[test]
fn test_low_confidence_frames_are_gated() {
    let mut session = MotionSession::new(&EngineConfig::default());
    let ankle = TrackedPoint::Joint(JointId::RIGHT_ANKLE);
    session.select_points([ankle]);

    session.detections_mut().ingest(pose_frame(1, 0.3));
    session.tick(0.0);
    session.detections_mut().ingest(pose_frame(2, 0.31));
    session.tick(0.1);

    assert_eq!(session.trajectory(ankle).len(), 1);
    // Only one sample passed the gate, so nothing has been measured yet
    let peak = session.velocity(ankle).map_or(0.0, |v| v.peak);
    assert_eq!(peak, 0.0);
}

fn timeline() -> TimelineModel {
    let mut model = TimelineModel::load(
        vec![
            TimelineEvent::range("e1", "Swing", 1.0, 2.0),
            TimelineEvent::range("e2", "Follow-through", 4.0, 6.0),
            TimelineEvent::point("impact", "Contact", 3.0),
        ],
        TimelineConfig::default(),
    )
    .unwrap();
    model.set_geometry(TrackGeometry::new(0.0, 100.0, Some(10.0)));
    model
}

#[test]
fn test_drag_end_then_clamp_start() {
    let mut model = timeline();
    let e1 = EventId::new("e1");

    let target = model.hit_test(200.0).unwrap();
    assert_eq!(
        target,
        HitTarget::Handle {
            event_id: e1.clone(),
            edge: Edge::End
        }
    );
    assert_eq!(model.press(target, 200.0), PressOutcome::Started);
    model.pointer_move(220.0);
    model.pointer_move(240.0);
    assert_eq!(model.phase(), DragPhase::Preview);
    assert!(matches!(model.release(240.0), ReleaseOutcome::Committed(_)));

    let effective = model.effective(&e1).unwrap();
    assert!((effective.end - 2.4).abs() < 1e-9);
    assert_eq!(model.event(&e1).map(|e| e.end), Some(2.0));

    let start = HitTarget::Handle {
        event_id: e1.clone(),
        edge: Edge::Start,
    };
    model.press(start, 100.0);
    model.pointer_move(250.0);
    model.release(250.0);
    let effective = model.effective(&e1).unwrap();
    assert!((effective.start - 2.35).abs() < 1e-9);
    assert!(effective.end - effective.start >= 0.05);

    // Other events are untouched
    let e2 = model.effective(&EventId::new("e2")).unwrap();
    assert_eq!((e2.start, e2.end), (4.0, 6.0));
    assert!(!e2.is_adjusted);

    // Persisted adjustments survive a reload
    let saved = model.adjustments();
    let mut reloaded = timeline();
    assert_eq!(reloaded.restore(&saved), 2);
    assert_eq!(reloaded.effective(&e1), model.effective(&e1));
}

#[test]
fn test_click_on_event_seeks_to_start() {
    let mut model = timeline();
    let target = model.hit_test(500.0).unwrap();
    assert_eq!(target.event_id(), &EventId::new("e2"));

    model.press(target, 500.0);
    match model.release(500.0) {
        ReleaseOutcome::Seek { event_id, time } => {
            assert_eq!(event_id, EventId::new("e2"));
            assert_eq!(time, 4.0);
        }
        other => panic!("expected seek, got {other:?}"),
    }
    assert!(model.adjustments().is_empty());
}
