//! Capture session controller integration tests.
//!
//! Drives a full camera instance against the in-process fakes: open,
//! still capture, recording lifecycle, frame streaming, control changes,
//! and teardown paths.
//!
//! Run with: cargo test --test controller_test

use tempfile::tempdir;

use camcore::errors::DeviceErrorKind;
use camcore::hal::HalEvent;
use camcore::request::{AeMode, FlashValue};
use camcore::testing::{
    FakeHal, FakeHalHandle, FakeRecorderHandle, HalCall, NullRenderTarget, RecorderCall,
    RenderTargetProbe,
};
use camcore::types::CameraEvent;
use camcore::{
    Camera, CameraEvents, CameraOpenParams, CharacteristicsProvider, DeviceDescriptor, FlashMode,
    ResolutionPreset, Size, WhiteBalanceMode,
};

fn provider() -> CharacteristicsProvider {
    CharacteristicsProvider::new()
        .with_device(DeviceDescriptor::new("0", Size::new(4032, 3024)).sensor_orientation(90))
}

struct Rig {
    camera: Camera,
    events: CameraEvents,
    hal: FakeHalHandle,
    recorder: FakeRecorderHandle,
    render: RenderTargetProbe,
}

fn rig_with_params(params: CameraOpenParams) -> Rig {
    let (hal, hal_handle) = FakeHal::new();
    let (backend, recorder_handle) = camcore::testing::FakeRecorderBackend::new();
    let (target, render_probe) = NullRenderTarget::probed(42);
    let (camera, events) = Camera::new(
        params,
        &provider(),
        hal,
        Box::new(target),
        backend,
    )
    .expect("camera setup");
    Rig {
        camera,
        events,
        hal: hal_handle,
        recorder: recorder_handle,
        render: render_probe,
    }
}

fn rig() -> Rig {
    rig_with_params(CameraOpenParams::new("0", ResolutionPreset::High))
}

/// Round-trips the controller task so every previously queued hardware
/// callback has been processed.
async fn settle(camera: &Camera) {
    camera.update_orientation(-1).await;
}

// ═══════════════════════════════════════════════════════════════════════════
// OPEN / SETUP
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_open_replies_with_texture_and_preview_size() {
    let rig = rig();
    let reply = rig.camera.open().await.unwrap();
    assert_eq!(reply.texture_id, 42);
    assert_eq!(reply.preview_width, 1280);
    assert_eq!(reply.preview_height, 720);
    assert_eq!(rig.render.buffer_size(), Some(Size::new(1280, 720)));
}

#[tokio::test]
async fn test_unknown_device_fails_at_construction() {
    let (hal, _) = FakeHal::new();
    let (backend, _) = camcore::testing::FakeRecorderBackend::new();
    let err = Camera::new(
        CameraOpenParams::new("nope", ResolutionPreset::High),
        &provider(),
        hal,
        Box::new(NullRenderTarget::new(1)),
        backend,
    )
    .err()
    .unwrap();
    assert_eq!(err.code(), "deviceNotFound");
}

#[tokio::test]
async fn test_double_open_is_illegal() {
    let rig = rig();
    rig.camera.open().await.unwrap();
    let err = rig.camera.open().await.unwrap_err();
    assert_eq!(err.code(), "illegalState");
}

#[tokio::test]
async fn test_open_rejection_returns_to_closed_and_allows_retry() {
    let rig = rig();
    rig.hal.set_fail_open(true);
    let err = rig.camera.open().await.unwrap_err();
    assert_eq!(err.code(), "cameraAccess");

    rig.hal.set_fail_open(false);
    rig.camera.open().await.unwrap();
}

#[tokio::test]
async fn test_close_while_open_pending_fails_the_open() {
    let rig = rig();
    rig.hal.set_auto_open(false);
    let camera = rig.camera.clone();
    let pending = tokio::spawn(async move { camera.open().await });
    // Wait until the open reached the hardware before closing.
    while !rig
        .hal
        .calls()
        .iter()
        .any(|c| matches!(c, HalCall::OpenDevice(_)))
    {
        tokio::task::yield_now().await;
    }
    rig.camera.close().await;
    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err.code(), "cameraAccess");
}

#[tokio::test]
async fn test_session_configure_failure_reports_on_event_channel() {
    let mut rig = rig();
    rig.hal.set_fail_configure(true);
    rig.camera.open().await.unwrap();
    settle(&rig.camera).await;
    match rig.events.try_recv() {
        Some(CameraEvent::Error { description }) => {
            assert_eq!(description, "Failed to configure camera session.");
        }
        other => panic!("expected error event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_session_rejection_at_open_reports_configure_code() {
    let rig = rig();
    rig.hal.set_fail_create_session(true);
    let err = rig.camera.open().await.unwrap_err();
    assert_eq!(err.code(), "configureFailed");

    // The device was torn back down; a recovered stack can reopen.
    rig.hal.set_fail_create_session(false);
    rig.camera.open().await.unwrap();
}

#[tokio::test]
async fn test_session_rejection_for_stream_reports_configure_code() {
    let rig = rig();
    rig.camera.open().await.unwrap();
    rig.hal.set_fail_create_session(true);
    let err = rig
        .camera
        .start_preview_with_image_stream()
        .await
        .unwrap_err();
    assert_eq!(err.code(), "configureFailed");
}

#[tokio::test]
async fn test_stale_session_confirmation_is_ignored() {
    let rig = rig();
    rig.hal.set_auto_configure(false);
    rig.camera.open().await.unwrap();
    let generation = rig.hal.last_generation().unwrap();

    rig.hal.send_event(HalEvent::SessionConfigured {
        generation: generation + 5,
    });
    settle(&rig.camera).await;
    assert!(!rig.hal.calls().contains(&HalCall::SetRepeating));

    rig.hal.send_event(HalEvent::SessionConfigured { generation });
    settle(&rig.camera).await;
    assert!(rig.hal.calls().contains(&HalCall::SetRepeating));
}

// ═══════════════════════════════════════════════════════════════════════════
// STILL CAPTURE
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_take_picture_writes_payload_to_disk() {
    let rig = rig();
    rig.hal.set_still_payload(vec![0xDE, 0xAD, 0xBE, 0xEF]);
    rig.camera.open().await.unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("photo.jpg");
    rig.camera.take_picture(&path).await.unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
}

#[tokio::test]
async fn test_take_picture_to_existing_path_touches_no_hardware() {
    let rig = rig();
    rig.camera.open().await.unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("photo.jpg");
    std::fs::write(&path, b"previous").unwrap();

    let err = rig.camera.take_picture(&path).await.unwrap_err();
    assert_eq!(err.code(), "fileExists");
    assert!(!rig.hal.calls().contains(&HalCall::SubmitCapture));
    // The original file is untouched.
    assert_eq!(std::fs::read(&path).unwrap(), b"previous");
}

#[tokio::test]
async fn test_take_picture_outside_preview_mode_resolves_with_error() {
    let rig = rig();
    rig.camera.open().await.unwrap();
    let _stream = rig.camera.start_preview_with_image_stream().await.unwrap();

    // The still consumer is not bound into a streaming session; the command
    // must resolve with an error rather than waiting for a buffer forever.
    let dir = tempdir().unwrap();
    let err = rig
        .camera
        .take_picture(dir.path().join("p.jpg"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "illegalState");
    assert!(!rig.hal.calls().contains(&HalCall::SubmitCapture));

    rig.camera
        .start_video_recording(dir.path().join("v.mp4"))
        .await
        .unwrap();
    let err = rig
        .camera
        .take_picture(dir.path().join("p2.jpg"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "illegalState");
    assert!(!rig.hal.calls().contains(&HalCall::SubmitCapture));

    // Back in plain preview the capture path works again.
    rig.camera.stop_video_recording().await.unwrap();
    rig.camera
        .take_picture(dir.path().join("p3.jpg"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_take_picture_before_open_is_illegal() {
    let rig = rig();
    let dir = tempdir().unwrap();
    let err = rig
        .camera
        .take_picture(dir.path().join("p.jpg"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "illegalState");
}

#[tokio::test]
async fn test_capture_failure_resolves_with_reason() {
    let rig = rig();
    rig.hal.set_deliver_still_on_capture(false);
    rig.camera.open().await.unwrap();

    let dir = tempdir().unwrap();
    let camera = rig.camera.clone();
    let path = dir.path().join("p.jpg");
    let pending = tokio::spawn(async move { camera.take_picture(path).await });
    // Wait until the capture was submitted before failing it.
    while !rig.hal.calls().contains(&HalCall::SubmitCapture) {
        tokio::task::yield_now().await;
    }
    rig.hal.send_event(HalEvent::CaptureFailed(
        camcore::CaptureFailureReason::Framework,
    ));

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err.code(), "captureFailure");
    assert!(err.to_string().contains("framework"));
}

#[tokio::test]
async fn test_still_request_carries_orientation_hint() {
    let rig = rig();
    rig.camera.open().await.unwrap();
    // 85 degrees rounds to 90; back-facing sensor at 90 gives 180.
    rig.camera.update_orientation(85).await;

    let dir = tempdir().unwrap();
    rig.camera
        .take_picture(dir.path().join("p.jpg"))
        .await
        .unwrap();

    let captures = rig.hal.submitted_captures();
    assert_eq!(captures.len(), 1);
    assert_eq!(captures[0].orientation_hint, Some(180));
    assert!(captures[0].precapture_trigger);
}

// ═══════════════════════════════════════════════════════════════════════════
// CONTROLS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_redundant_flash_change_issues_no_request() {
    let rig = rig();
    rig.camera.open().await.unwrap();
    let baseline = rig.hal.repeating_history().len();

    // Off is already the active mode.
    rig.camera.set_flash_mode(FlashMode::Off).await;
    assert_eq!(rig.hal.repeating_history().len(), baseline);

    rig.camera.set_flash_mode(FlashMode::Torch).await;
    let history = rig.hal.repeating_history();
    assert_eq!(history.len(), baseline + 1);
    assert_eq!(history.last().unwrap().flash, FlashValue::Torch);

    rig.camera.set_flash_mode(FlashMode::Torch).await;
    assert_eq!(rig.hal.repeating_history().len(), baseline + 1);
}

#[tokio::test]
async fn test_red_eye_keeps_distinct_repeating_branch() {
    let rig = rig();
    rig.camera.open().await.unwrap();

    rig.camera.set_flash_mode(FlashMode::RedEye).await;
    let history = rig.hal.repeating_history();
    assert_eq!(history.last().unwrap().ae_mode, AeMode::OnAutoFlashRedEye);

    // The still path aliases red-eye to plain auto-flash.
    let dir = tempdir().unwrap();
    rig.camera
        .take_picture(dir.path().join("p.jpg"))
        .await
        .unwrap();
    let captures = rig.hal.submitted_captures();
    assert_eq!(captures[0].ae_mode, AeMode::OnAutoFlash);
}

#[tokio::test]
async fn test_rejected_control_change_rolls_back() {
    let rig = rig();
    rig.camera.open().await.unwrap();
    let baseline = rig.hal.repeating_history().len();

    rig.hal.set_fail_set_repeating(true);
    rig.camera.set_flash_mode(FlashMode::On).await;
    assert_eq!(rig.hal.repeating_history().len(), baseline);

    // The persisted state rolled back to Off, so the same change is not a
    // redundant no-op once the hardware recovers.
    rig.hal.set_fail_set_repeating(false);
    rig.camera.set_flash_mode(FlashMode::On).await;
    let history = rig.hal.repeating_history();
    assert_eq!(history.len(), baseline + 1);
    assert_eq!(history.last().unwrap().ae_mode, AeMode::OnAlwaysFlash);
}

#[tokio::test]
async fn test_white_balance_change_rederives_request() {
    let rig = rig();
    rig.camera.open().await.unwrap();
    rig.camera.set_white_balance(WhiteBalanceMode::Sunny).await;
    let history = rig.hal.repeating_history();
    assert_eq!(
        history.last().unwrap().awb_mode,
        camcore::request::AwbMode::Daylight
    );
}

#[tokio::test]
async fn test_autofocus_downgrades_on_unsupported_device() {
    let provider = CharacteristicsProvider::new().with_device(
        DeviceDescriptor::new("0", Size::new(4032, 3024))
            .af_modes(vec![camcore::request::AfMode::Off]),
    );
    let (hal, hal_handle) = FakeHal::new();
    let (backend, _) = camcore::testing::FakeRecorderBackend::new();
    let (camera, _events) = Camera::new(
        CameraOpenParams::new("0", ResolutionPreset::High),
        &provider,
        hal,
        Box::new(NullRenderTarget::new(1)),
        backend,
    )
    .unwrap();

    camera.open().await.unwrap();
    let history = hal_handle.repeating_history();
    assert_eq!(
        history.last().unwrap().af_mode,
        camcore::request::AfMode::Off
    );

    // Enabling autofocus on this device is absorbed without a request.
    let baseline = history.len();
    camera.set_auto_focus(true).await;
    assert_eq!(hal_handle.repeating_history().len(), baseline);
}

// ═══════════════════════════════════════════════════════════════════════════
// VIDEO RECORDING
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_recorder_starts_only_after_session_confirms() {
    let rig = rig();
    rig.camera.open().await.unwrap();

    rig.hal.set_auto_configure(false);
    let dir = tempdir().unwrap();
    rig.camera
        .start_video_recording(dir.path().join("v.mp4"))
        .await
        .unwrap();

    let calls = rig.recorder.calls();
    assert!(calls.contains(&RecorderCall::Prepare));
    assert!(!calls.contains(&RecorderCall::Start));

    let generation = rig.hal.last_generation().unwrap();
    rig.hal
        .send_event(HalEvent::SessionConfigured { generation });
    settle(&rig.camera).await;
    assert!(rig.recorder.calls().contains(&RecorderCall::Start));
}

#[tokio::test]
async fn test_recording_session_binds_recorder_surface() {
    let rig = rig();
    rig.camera.open().await.unwrap();

    let dir = tempdir().unwrap();
    rig.camera
        .start_video_recording(dir.path().join("v.mp4"))
        .await
        .unwrap();

    let sessions: Vec<_> = rig
        .hal
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            HalCall::CreateSession { targets, .. } => Some(targets),
            _ => None,
        })
        .collect();
    assert_eq!(sessions.len(), 2);
    assert!(sessions[1].contains(&camcore::hal::SurfaceId::Recorder));
    assert!(!sessions[1].contains(&camcore::hal::SurfaceId::StillConsumer));
}

#[tokio::test]
async fn test_start_recording_to_existing_path_fails() {
    let rig = rig();
    rig.camera.open().await.unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("v.mp4");
    std::fs::write(&path, b"x").unwrap();
    let err = rig.camera.start_video_recording(&path).await.unwrap_err();
    assert_eq!(err.code(), "fileExists");
    assert!(!rig.recorder.calls().contains(&RecorderCall::Prepare));
}

#[tokio::test]
async fn test_second_start_while_recording_fails() {
    let rig = rig();
    rig.camera.open().await.unwrap();

    let dir = tempdir().unwrap();
    rig.camera
        .start_video_recording(dir.path().join("a.mp4"))
        .await
        .unwrap();
    let err = rig
        .camera
        .start_video_recording(dir.path().join("b.mp4"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "videoRecordingFailed");
}

#[tokio::test]
async fn test_stop_recording_returns_to_still_capable_preview() {
    let rig = rig();
    rig.camera.open().await.unwrap();

    let dir = tempdir().unwrap();
    rig.camera
        .start_video_recording(dir.path().join("v.mp4"))
        .await
        .unwrap();
    rig.camera.stop_video_recording().await.unwrap();

    assert!(rig.recorder.calls().contains(&RecorderCall::Stop));
    let sessions: Vec<_> = rig
        .hal
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            HalCall::CreateSession { targets, .. } => Some(targets),
            _ => None,
        })
        .collect();
    assert_eq!(sessions.len(), 3);
    assert!(sessions[2].contains(&camcore::hal::SurfaceId::StillConsumer));

    // Still capture works again immediately.
    rig.camera
        .take_picture(dir.path().join("p.jpg"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_stop_without_recording_is_noop_success() {
    let rig = rig();
    rig.camera.stop_video_recording().await.unwrap();
    assert!(!rig.recorder.calls().contains(&RecorderCall::Stop));
}

#[tokio::test]
async fn test_pause_resume_delegate_to_recorder() {
    let rig = rig();
    rig.camera.open().await.unwrap();

    let dir = tempdir().unwrap();
    rig.camera
        .start_video_recording(dir.path().join("v.mp4"))
        .await
        .unwrap();
    rig.camera.pause_video_recording().await.unwrap();
    rig.camera.resume_video_recording().await.unwrap();

    let calls = rig.recorder.calls();
    assert!(calls.contains(&RecorderCall::Pause));
    assert!(calls.contains(&RecorderCall::Resume));
}

#[tokio::test]
async fn test_pause_unsupported_leaves_recording_running() {
    let rig = rig();
    rig.recorder.set_supports_pause(false);
    rig.camera.open().await.unwrap();

    let dir = tempdir().unwrap();
    rig.camera
        .start_video_recording(dir.path().join("v.mp4"))
        .await
        .unwrap();

    let err = rig.camera.pause_video_recording().await.unwrap_err();
    assert_eq!(err.code(), "videoRecordingFailed");
    assert!(err.to_string().contains("requires newer platform"));
    assert!(!rig.recorder.calls().contains(&RecorderCall::Pause));

    // The recording is still live and can be stopped normally.
    rig.camera.stop_video_recording().await.unwrap();
    assert!(rig.recorder.calls().contains(&RecorderCall::Stop));
}

#[tokio::test]
async fn test_pause_without_recording_is_noop_success() {
    let rig = rig();
    rig.camera.pause_video_recording().await.unwrap();
    rig.camera.resume_video_recording().await.unwrap();
}

#[tokio::test]
async fn test_recorder_orientation_hint_follows_device_orientation() {
    let rig = rig();
    rig.camera.open().await.unwrap();
    rig.camera.update_orientation(270).await;

    let dir = tempdir().unwrap();
    rig.camera
        .start_video_recording(dir.path().join("v.mp4"))
        .await
        .unwrap();
    // Back-facing: (270 + 90 + 360) % 360.
    assert!(rig
        .recorder
        .calls()
        .contains(&RecorderCall::SetOrientationHint(0)));
}

#[tokio::test]
async fn test_audio_disabled_skips_audio_configuration() {
    let rig = rig_with_params(
        CameraOpenParams::new("0", ResolutionPreset::High).with_audio(false),
    );
    rig.camera.open().await.unwrap();

    let dir = tempdir().unwrap();
    rig.camera
        .start_video_recording(dir.path().join("v.mp4"))
        .await
        .unwrap();
    let calls = rig.recorder.calls();
    assert!(!calls.contains(&RecorderCall::SetAudioSource));
    assert!(calls.contains(&RecorderCall::SetVideoSource));
}

#[tokio::test]
async fn test_configure_failure_unwinds_armed_recording() {
    let mut rig = rig();
    rig.camera.open().await.unwrap();

    rig.hal.set_fail_configure(true);
    let dir = tempdir().unwrap();
    rig.camera
        .start_video_recording(dir.path().join("v.mp4"))
        .await
        .unwrap();
    settle(&rig.camera).await;

    assert!(!rig.recorder.calls().contains(&RecorderCall::Start));
    match rig.events.try_recv() {
        Some(CameraEvent::Error { description }) => {
            assert_eq!(description, "Failed to configure camera session.");
        }
        other => panic!("expected error event, got {:?}", other),
    }
    // The recording slot is free again.
    rig.hal.set_fail_configure(false);
    rig.camera
        .start_video_recording(dir.path().join("v2.mp4"))
        .await
        .unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════
// IMAGE STREAM
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_image_stream_delivers_detached_frames() {
    let rig = rig();
    rig.camera.open().await.unwrap();
    let mut stream = rig.camera.start_preview_with_image_stream().await.unwrap();

    rig.hal.push_stream_frame(camcore::hal::RawImage {
        width: 8,
        height: 4,
        format: camcore::types::PixelFormat::Yuv420,
        planes: vec![camcore::hal::RawPlane {
            row_stride: 8,
            pixel_stride: 1,
            bytes: bytes::Bytes::from_static(&[7; 32]),
        }],
    });

    let frame = stream.next().await.unwrap();
    assert_eq!(frame.width, 8);
    assert_eq!(frame.planes[0].bytes_per_row, 8);
    assert_eq!(frame.planes[0].bytes, vec![7; 32]);
}

#[tokio::test]
async fn test_stream_session_excludes_still_consumer() {
    let rig = rig();
    rig.camera.open().await.unwrap();
    let _stream = rig.camera.start_preview_with_image_stream().await.unwrap();

    let sessions: Vec<_> = rig
        .hal
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            HalCall::CreateSession { targets, .. } => Some(targets),
            _ => None,
        })
        .collect();
    assert!(sessions[1].contains(&camcore::hal::SurfaceId::StreamConsumer));
    assert!(!sessions[1].contains(&camcore::hal::SurfaceId::StillConsumer));
}

#[tokio::test]
async fn test_dropped_stream_does_not_wedge_the_controller() {
    let rig = rig();
    rig.camera.open().await.unwrap();
    let stream = rig.camera.start_preview_with_image_stream().await.unwrap();
    drop(stream);

    rig.hal
        .push_stream_frame(camcore::hal::RawImage::jpeg(Size::new(1, 1), vec![1]));
    settle(&rig.camera).await;

    // A fresh stream can be attached afterwards.
    let _stream = rig.camera.start_preview_with_image_stream().await.unwrap();
}

#[tokio::test]
async fn test_stream_while_recording_is_illegal() {
    let rig = rig();
    rig.camera.open().await.unwrap();
    let dir = tempdir().unwrap();
    rig.camera
        .start_video_recording(dir.path().join("v.mp4"))
        .await
        .unwrap();
    let err = rig
        .camera
        .start_preview_with_image_stream()
        .await
        .unwrap_err();
    assert_eq!(err.code(), "illegalState");
}

// ═══════════════════════════════════════════════════════════════════════════
// SESSION EXCLUSIVITY
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_every_session_create_is_preceded_by_a_close() {
    let rig = rig();
    rig.camera.open().await.unwrap();
    let _ = rig.camera.start_preview_with_image_stream().await.unwrap();
    let dir = tempdir().unwrap();
    rig.camera
        .start_video_recording(dir.path().join("v.mp4"))
        .await
        .unwrap();
    rig.camera.stop_video_recording().await.unwrap();

    let mut closes = 0;
    let mut creates = 0;
    for call in rig.hal.calls() {
        match call {
            HalCall::CloseSession => closes += 1,
            HalCall::CreateSession { .. } => {
                creates += 1;
                assert!(closes >= creates, "session created without prior close");
            }
            _ => {}
        }
    }
    assert_eq!(creates, 4);
}

// ═══════════════════════════════════════════════════════════════════════════
// EVENTS / TEARDOWN
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_device_error_tears_down_with_distinct_message() {
    let mut rig = rig();
    rig.camera.open().await.unwrap();

    rig.hal
        .send_event(HalEvent::DeviceError(DeviceErrorKind::Disabled));
    settle(&rig.camera).await;

    match rig.events.try_recv() {
        Some(CameraEvent::Error { description }) => {
            assert_eq!(
                description,
                "The camera device could not be opened due to a device policy."
            );
        }
        other => panic!("expected error event, got {:?}", other),
    }
    assert!(rig.hal.calls().contains(&HalCall::CloseDevice));

    // Device is closed; captures are rejected until reopened.
    let dir = tempdir().unwrap();
    let err = rig
        .camera
        .take_picture(dir.path().join("p.jpg"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "illegalState");
}

#[tokio::test]
async fn test_device_close_callback_emits_camera_closing() {
    let mut rig = rig();
    rig.camera.open().await.unwrap();
    rig.hal.send_event(HalEvent::DeviceClosed);
    settle(&rig.camera).await;
    assert_eq!(rig.events.try_recv(), Some(CameraEvent::CameraClosing));
}

#[tokio::test]
async fn test_close_is_idempotent_and_reopenable() {
    let rig = rig();
    rig.camera.open().await.unwrap();
    rig.camera.close().await;
    rig.camera.close().await;
    rig.camera.open().await.unwrap();
}

#[tokio::test]
async fn test_close_stops_an_active_recording() {
    let rig = rig();
    rig.camera.open().await.unwrap();
    let dir = tempdir().unwrap();
    rig.camera
        .start_video_recording(dir.path().join("v.mp4"))
        .await
        .unwrap();
    rig.camera.close().await;
    assert!(rig.recorder.calls().contains(&RecorderCall::Reset));
    // Stopping afterwards is still a clean no-op.
    rig.camera.stop_video_recording().await.unwrap();
}

#[tokio::test]
async fn test_dispose_is_terminal() {
    let rig = rig();
    rig.camera.open().await.unwrap();
    rig.camera.dispose().await;

    assert!(rig.render.released());
    let dir = tempdir().unwrap();
    let err = rig
        .camera
        .take_picture(dir.path().join("p.jpg"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "disposed");
    let err = rig.camera.open().await.unwrap_err();
    assert_eq!(err.code(), "disposed");
}

#[tokio::test]
async fn test_dropping_every_handle_disposes() {
    let rig = rig();
    rig.camera.open().await.unwrap();
    drop(rig.camera);
    // The controller task notices the closed channel and releases the
    // render target on its way out.
    for _ in 0..50 {
        if rig.render.released() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("render target was never released");
}
