//! Producer pipeline descriptions
//!
//! The pipelines are textual GStreamer launch lines; the pump appends an
//! appsink and drives them. Only the capture devices and the video
//! parameters vary per session.

use crate::session::messages::VideoRequest;

/// H.264 encoders require frame dimensions aligned to 16-pixel macroblocks
const BLOCK_SIZE: u32 = 16;

/// Opus audio producer: stereo 48 kHz capture from an ALSA device
pub fn audio_pipeline(audio_device: &str) -> String {
    format!(
        "alsasrc device={audio_device} \
         ! audio/x-raw,format=S16LE,rate=48000,channels=2 \
         ! audioconvert \
         ! opusenc"
    )
}

/// H.264 video producer: MJPEG capture, color correction, macroblock
/// alignment crop, hardware encode at the requested bitrate.
///
/// Capture dimensions need not be multiples of the encoder block size;
/// the videobox element crops the excess off the right and bottom edges
/// (negative offsets shrink the frame). The wire protocol carries the
/// target bitrate in kilobits per second; the encoder takes bits.
pub fn video_pipeline(video_device: &str, request: &VideoRequest) -> String {
    let width_pad = (BLOCK_SIZE - (request.width % BLOCK_SIZE)) % BLOCK_SIZE;
    let height_pad = (BLOCK_SIZE - (request.height % BLOCK_SIZE)) % BLOCK_SIZE;

    format!(
        "v4l2src device={video_device} \
         ! image/jpeg,width={},height={},framerate={}/1 \
         ! jpegdec \
         ! videobalance brightness=0.053887 contrast=0.858824 saturation=0.875 \
         ! videobox right={} bottom={} \
         ! videoconvert \
         ! omxh264enc target-bitrate={} control-rate=1",
        request.width,
        request.height,
        request.framerate,
        -(width_pad as i32),
        -(height_pad as i32),
        request.target_bitrate * 1000,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(width: u32, height: u32) -> VideoRequest {
        VideoRequest {
            enable: true,
            width,
            height,
            framerate: 30,
            target_bitrate: 2500,
        }
    }

    #[test]
    fn video_pipeline_pads_unaligned_dimensions() {
        let desc = video_pipeline("/dev/video0", &request(1366, 768));
        // 1366 % 16 = 6 -> crop 10 off the right; 768 is aligned
        assert!(desc.contains("videobox right=-10 bottom=0"));
        assert!(desc.contains("width=1366,height=768,framerate=30/1"));
    }

    #[test]
    fn video_pipeline_aligned_dimensions_need_no_crop() {
        let desc = video_pipeline("/dev/video0", &request(1920, 1080));
        // 1080 % 16 = 8 -> crop 8 off the bottom
        assert!(desc.contains("videobox right=0 bottom=-8"));

        let desc = video_pipeline("/dev/video0", &request(1280, 720));
        assert!(desc.contains("videobox right=0 bottom=0"));
    }

    #[test]
    fn video_pipeline_converts_kilobits_to_bits() {
        let desc = video_pipeline("/dev/video0", &request(1280, 720));
        assert!(desc.contains("target-bitrate=2500000"));
    }

    #[test]
    fn audio_pipeline_uses_configured_device() {
        let desc = audio_pipeline("hw:1");
        assert!(desc.starts_with("alsasrc device=hw:1"));
        assert!(desc.contains("rate=48000,channels=2"));
        assert!(desc.ends_with("opusenc"));
    }
}
