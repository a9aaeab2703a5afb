use crate::{CaptureDevice, CpalCaptureDevice, DeviceFault};

use std::{thread::sleep, time::Duration};

/// WHAT: Finishing a capture that never started yields no audio
/// WHY: The session manager maps an empty payload to CaptureFailed
#[test]
fn given_unstarted_device_when_finishing_then_empty_capture() {
    // Given: A fresh device
    let mut device = CpalCaptureDevice::new();

    // When: Finishing
    let captured = device.finish().unwrap();

    // Then: Nothing captured
    assert!(captured.payload.is_empty());
    assert_eq!(captured.duration, Duration::ZERO);
}

/// WHAT: Resume without a running stream is a capture fault
/// WHY: There is nothing to resume
#[test]
fn given_unstarted_device_when_resuming_then_capture_fault() {
    // Given: A fresh device
    let mut device = CpalCaptureDevice::new();

    // When: Resuming
    let result = device.resume();

    // Then: Capture fault
    assert!(matches!(result, Err(DeviceFault::Capture { .. })));
}

/// WHAT: A short capture from the default microphone produces a payload
/// WHY: End-to-end check of stream setup, downmix and encoding
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn given_default_microphone_when_capturing_briefly_then_payload_produced() {
    // Given: A started device
    let mut device = CpalCaptureDevice::new();
    device.start().unwrap();

    // When: Capturing for half a second
    sleep(Duration::from_millis(500));
    let captured = device.finish().unwrap();

    // Then: A WAV payload with a plausible duration
    assert!(!captured.payload.is_empty());
    assert!(captured.duration > Duration::from_millis(100));
}
