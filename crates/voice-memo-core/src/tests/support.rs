//! Scripted devices and stores for driving the session managers.

use crate::{
    CaptureDevice, CapturedAudio, DeviceFault, FinishSignal, MemoryRecordingRepository,
    PlaybackDevice, Recording, RecordingRepository, SortOrder, StoreError, StoreResult,
    audio::codec,
};

use std::{
    panic::Location,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use error_location::ErrorLocation;
use uuid::Uuid;

/// Payload prefix the fake playback device refuses to decode.
pub(crate) const UNDECODABLE_PREFIX: &[u8] = b"BAD";

/// A short, real WAV payload.
pub(crate) fn wav_payload(seconds: f32) -> Vec<u8> {
    let frames = (codec::STORAGE_SAMPLE_RATE as f32 * seconds) as usize;
    let samples: Vec<f32> = (0..frames).map(|i| (i as f32 * 0.05).sin() * 0.3).collect();
    codec::encode_wav(&samples, codec::STORAGE_SAMPLE_RATE).unwrap()
}

pub(crate) fn recording(name: &str, payload: Vec<u8>) -> Recording {
    Recording::new(Some(name.to_string()), payload)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlaybackCall {
    ActivateSession,
    Load(Vec<u8>),
    Play,
    Pause,
    Resume,
    Stop,
}

#[derive(Default)]
struct PlaybackScript {
    calls: Vec<PlaybackCall>,
    signals: Vec<Option<FinishSignal>>,
    fail_session: bool,
    fail_resume: bool,
}

/// Test-side handle on a [`FakePlaybackDevice`].
#[derive(Clone, Default)]
pub(crate) struct PlaybackProbe {
    script: Arc<Mutex<PlaybackScript>>,
}

impl PlaybackProbe {
    pub(crate) fn device(&self) -> Box<dyn PlaybackDevice> {
        Box::new(FakePlaybackDevice {
            probe: self.clone(),
        })
    }

    pub(crate) fn calls(&self) -> Vec<PlaybackCall> {
        self.script.lock().unwrap().calls.clone()
    }

    pub(crate) fn fail_session(&self, fail: bool) {
        self.script.lock().unwrap().fail_session = fail;
    }

    pub(crate) fn fail_resume(&self, fail: bool) {
        self.script.lock().unwrap().fail_resume = fail;
    }

    /// Fires the finish signal of the `n`th load (0-based) as completed.
    pub(crate) fn complete_load(&self, n: usize) {
        let signal = self.script.lock().unwrap().signals[n].take();
        signal.expect("finish signal already fired").completed();
    }

    /// Fires the most recent load's finish signal as completed.
    pub(crate) fn complete(&self) {
        let n = self.script.lock().unwrap().signals.len() - 1;
        self.complete_load(n);
    }

    /// Fires the most recent load's finish signal as interrupted.
    pub(crate) fn interrupt(&self, reason: &str) {
        let signal = self
            .script
            .lock()
            .unwrap()
            .signals
            .last_mut()
            .and_then(Option::take);
        signal.expect("no finish signal").interrupted(reason);
    }
}

/// Playback device that records calls and hands finish signals to the test.
///
/// Finish signals are kept after `stop` so tests can replay late reports
/// from a replaced stream.
pub(crate) struct FakePlaybackDevice {
    probe: PlaybackProbe,
}

impl FakePlaybackDevice {
    fn record(&self, call: PlaybackCall) {
        self.probe.script.lock().unwrap().calls.push(call);
    }
}

impl PlaybackDevice for FakePlaybackDevice {
    fn activate_session(&mut self) -> Result<(), DeviceFault> {
        self.record(PlaybackCall::ActivateSession);
        if self.probe.script.lock().unwrap().fail_session {
            return Err(DeviceFault::Setup {
                reason: "audio route busy".to_string(),
            });
        }
        Ok(())
    }

    fn load(&mut self, payload: &[u8], on_finish: FinishSignal) -> Result<(), DeviceFault> {
        self.record(PlaybackCall::Load(payload.to_vec()));
        if payload.starts_with(UNDECODABLE_PREFIX) {
            return Err(DeviceFault::Decode {
                reason: "unrecognized format".to_string(),
            });
        }
        self.probe.script.lock().unwrap().signals.push(Some(on_finish));
        Ok(())
    }

    fn play(&mut self) -> Result<(), DeviceFault> {
        self.record(PlaybackCall::Play);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), DeviceFault> {
        self.record(PlaybackCall::Pause);
        Ok(())
    }

    fn resume(&mut self) -> Result<(), DeviceFault> {
        self.record(PlaybackCall::Resume);
        if self.probe.script.lock().unwrap().fail_resume {
            return Err(DeviceFault::Setup {
                reason: "route changed".to_string(),
            });
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.record(PlaybackCall::Stop);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CaptureCall {
    Start,
    Pause,
    Resume,
    Finish,
}

#[derive(Default)]
struct CaptureScript {
    calls: Vec<CaptureCall>,
    payload: Vec<u8>,
    unavailable: bool,
    fail_pause: bool,
    fail_finalize: bool,
}

/// Test-side handle on a [`FakeCaptureDevice`].
#[derive(Clone, Default)]
pub(crate) struct CaptureProbe {
    script: Arc<Mutex<CaptureScript>>,
}

impl CaptureProbe {
    pub(crate) fn with_payload(payload: Vec<u8>) -> Self {
        let probe = Self::default();
        probe.script.lock().unwrap().payload = payload;
        probe
    }

    pub(crate) fn device(&self) -> Box<dyn CaptureDevice> {
        Box::new(FakeCaptureDevice {
            probe: self.clone(),
        })
    }

    pub(crate) fn calls(&self) -> Vec<CaptureCall> {
        self.script.lock().unwrap().calls.clone()
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.script.lock().unwrap().unavailable = unavailable;
    }

    pub(crate) fn fail_pause(&self, fail: bool) {
        self.script.lock().unwrap().fail_pause = fail;
    }

    pub(crate) fn fail_finalize(&self, fail: bool) {
        self.script.lock().unwrap().fail_finalize = fail;
    }
}

/// Capture device that returns a scripted payload on finish.
pub(crate) struct FakeCaptureDevice {
    probe: CaptureProbe,
}

impl CaptureDevice for FakeCaptureDevice {
    fn start(&mut self) -> Result<(), DeviceFault> {
        let mut script = self.probe.script.lock().unwrap();
        script.calls.push(CaptureCall::Start);
        if script.unavailable {
            return Err(DeviceFault::Unavailable {
                reason: "microphone permission denied".to_string(),
            });
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), DeviceFault> {
        let mut script = self.probe.script.lock().unwrap();
        script.calls.push(CaptureCall::Pause);
        if script.fail_pause {
            return Err(DeviceFault::Capture {
                reason: "input stream died".to_string(),
            });
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<(), DeviceFault> {
        self.probe.script.lock().unwrap().calls.push(CaptureCall::Resume);
        Ok(())
    }

    fn finish(&mut self) -> Result<CapturedAudio, DeviceFault> {
        let mut script = self.probe.script.lock().unwrap();
        script.calls.push(CaptureCall::Finish);
        if script.fail_finalize {
            return Err(DeviceFault::Capture {
                reason: "encoder failed".to_string(),
            });
        }
        Ok(CapturedAudio {
            payload: script.payload.clone(),
            duration: Duration::from_millis(250),
        })
    }
}

/// In-memory repository whose availability the test controls.
#[derive(Default)]
pub(crate) struct FlakyRepository {
    inner: MemoryRecordingRepository,
    unavailable: AtomicBool,
    create_calls: AtomicUsize,
}

impl FlakyRepository {
    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub(crate) fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    #[track_caller]
    fn check(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "store offline".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }
}

impl RecordingRepository for FlakyRepository {
    fn list(&self, order: SortOrder) -> StoreResult<Vec<Recording>> {
        self.check()?;
        self.inner.list(order)
    }

    fn get(&self, id: Uuid) -> StoreResult<Option<Recording>> {
        self.check()?;
        self.inner.get(id)
    }

    fn create(&self, recording: &Recording) -> StoreResult<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.create(recording)
    }

    fn delete(&self, id: Uuid) -> StoreResult<bool> {
        self.check()?;
        self.inner.delete(id)
    }

    fn save(&self) -> StoreResult<()> {
        self.check()
    }
}
