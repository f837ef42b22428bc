//! Media track pump
//!
//! A pump owns one producer pipeline and forwards its encoded samples to an
//! outbound WebRTC track until the producer ends or the stop signal fires.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use webrtc::media::Sample;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use crate::error::{AppError, Result};

/// Poll interval for the sample pull; bounds stop-signal latency
const PULL_TIMEOUT_MS: u64 = 100;

/// Pump driving one producer pipeline into one outbound track.
///
/// The blocking pull loop runs on a dedicated task; the pump itself is a
/// cheap handle carrying the one-shot stop signal.
pub struct TrackPump {
    name: &'static str,
    stop: Arc<watch::Sender<bool>>,
}

impl TrackPump {
    /// Build the pipeline `<producer> ! appsink name=<name>` and start
    /// pumping its samples into `track`.
    pub fn spawn(
        name: &'static str,
        producer: String,
        track: Arc<TrackLocalStaticSample>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let stop = Arc::new(stop_tx);
        let handle = tokio::runtime::Handle::current();

        tokio::task::spawn_blocking(move || {
            if let Err(e) = run_pipeline(name, &producer, track, stop_rx, handle) {
                error!("Media pump failed (name: {}): {}", name, e);
            }
        });

        Self { name, stop }
    }

    /// Signal the pump to stop; idempotent
    pub fn stop(&self) {
        debug!("Stopping media pump (name: {})", self.name);
        let _ = self.stop.send(true);
    }

    /// Clone of the stop signal, for peer-connection callbacks
    pub fn stop_handle(&self) -> Arc<watch::Sender<bool>> {
        self.stop.clone()
    }
}

fn run_pipeline(
    name: &str,
    producer: &str,
    track: Arc<TrackLocalStaticSample>,
    stop_rx: watch::Receiver<bool>,
    handle: tokio::runtime::Handle,
) -> Result<()> {
    let description = format!("{producer} ! appsink name={name}");
    let pipeline = gst::parse::launch(&description)
        .map_err(|e| AppError::Media(format!("Failed to build pipeline {name}: {e}")))?
        .downcast::<gst::Pipeline>()
        .map_err(|_| AppError::Media(format!("Pipeline {name} is not a bin")))?;

    let appsink = pipeline
        .by_name(name)
        .ok_or_else(|| AppError::Media(format!("appsink {name} missing from pipeline")))?
        .downcast::<AppSink>()
        .map_err(|_| AppError::Media(format!("Element {name} is not an appsink")))?;

    pipeline
        .set_state(gst::State::Playing)
        .map_err(|e| AppError::Media(format!("Failed to start pipeline {name}: {e}")))?;

    let result = pump_samples(name, &appsink, &track, stop_rx, &handle);

    // The producer is torn down on every exit path
    if let Err(e) = pipeline.set_state(gst::State::Null) {
        warn!("Failed to tear down pipeline {}: {}", name, e);
    }
    info!("stream closed (name: {})", name);

    result
}

fn pump_samples(
    name: &str,
    appsink: &AppSink,
    track: &TrackLocalStaticSample,
    stop_rx: watch::Receiver<bool>,
    handle: &tokio::runtime::Handle,
) -> Result<()> {
    let mut count = 0u64;

    loop {
        if *stop_rx.borrow() {
            return Ok(());
        }

        let Some(sample) = appsink.try_pull_sample(gst::ClockTime::from_mseconds(PULL_TIMEOUT_MS))
        else {
            if appsink.is_eos() {
                debug!("Producer reached end of stream (name: {})", name);
                return Ok(());
            }
            // No sample yet; the loop re-checks the stop signal. A producer
            // stuck in an error state parks the pump here until stopped.
            continue;
        };

        let Some(buffer) = sample.buffer() else {
            continue;
        };
        let map = match buffer.map_readable() {
            Ok(map) => map,
            Err(e) => {
                warn!("Unreadable sample buffer (name: {}): {}", name, e);
                continue;
            }
        };
        let duration = buffer
            .duration()
            .map(|d| Duration::from_nanos(d.nseconds()))
            .unwrap_or_default();

        if count == 0 {
            info!("write first sample to stream (name: {})", name);
        }

        let out = Sample {
            data: Bytes::copy_from_slice(map.as_slice()),
            duration,
            ..Default::default()
        };
        if let Err(e) = handle.block_on(track.write_sample(&out)) {
            warn!("Failed to write sample (name: {}): {}", name, e);
        }

        count += 1;
    }
}
