//! ffmpeg argument construction for live UDP → HLS (fMP4) conversion.

use serde::{Deserialize, Serialize};
use streamvisor_common::ChannelDescriptor;

/// Encoding and HLS muxer options for every channel.
///
/// Video is copied untouched; audio is re-encoded with a resampling filter
/// so gaps in the source do not desynchronize playback.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HlsSettings {
    /// Video codec (default: copy).
    pub video_codec: String,
    /// Audio codec (default: aac).
    pub audio_codec: String,
    /// Audio bitrate (default: 128k).
    pub audio_bitrate: String,
    /// Audio sample rate in Hz (default: 44100).
    pub audio_sample_rate: u32,
    /// Audio channel count (default: 2).
    pub audio_channels: u32,
    /// Audio filter graph; empty disables it.
    pub audio_filter: String,
    /// Target segment duration in seconds (default: 4).
    pub segment_duration: u32,
    /// Number of segments kept in the manifest (default: 10).
    pub list_size: u32,
    /// Value of `-hls_flags`.
    pub flags: String,
    /// Segment container, `fmp4` or `mpegts` (default: fmp4).
    pub segment_type: String,
}

impl Default for HlsSettings {
    fn default() -> Self {
        Self {
            video_codec: "copy".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            audio_sample_rate: 44100,
            audio_channels: 2,
            audio_filter: "aresample=async=1:min_hard_comp=0.100000:first_pts=0".to_string(),
            segment_duration: 4,
            list_size: 10,
            flags: "independent_segments+discont_start+split_by_time+delete_segments+append_list+program_date_time".to_string(),
            segment_type: "fmp4".to_string(),
        }
    }
}

impl HlsSettings {
    /// File extension of the segments this container produces.
    pub fn segment_extension(&self) -> &'static str {
        match self.segment_type.as_str() {
            "mpegts" => "ts",
            _ => "m4s",
        }
    }

    /// Build the full ffmpeg argument list for one channel.
    pub fn ffmpeg_args(&self, channel: &ChannelDescriptor) -> Vec<String> {
        let mut args: Vec<String> = vec!["-y".into(), "-i".into(), channel.source_address.clone()];

        args.extend(["-c:v".into(), self.video_codec.clone()]);
        args.extend(["-c:a".into(), self.audio_codec.clone()]);
        args.extend(["-b:a".into(), self.audio_bitrate.clone()]);
        args.extend(["-ar".into(), self.audio_sample_rate.to_string()]);
        args.extend(["-ac".into(), self.audio_channels.to_string()]);
        if !self.audio_filter.is_empty() {
            args.extend(["-af".into(), self.audio_filter.clone()]);
        }

        args.extend(["-f".into(), "hls".into()]);
        args.extend(["-hls_time".into(), self.segment_duration.to_string()]);
        args.extend(["-hls_list_size".into(), self.list_size.to_string()]);
        args.extend(["-hls_flags".into(), self.flags.clone()]);
        args.extend(["-hls_segment_type".into(), self.segment_type.clone()]);
        if self.segment_type == "fmp4" {
            args.extend(["-hls_fmp4_init_filename".into(), channel.init_segment_name()]);
        }
        args.extend([
            "-hls_segment_filename".into(),
            channel
                .segment_pattern(self.segment_extension())
                .to_string_lossy()
                .to_string(),
        ]);
        args.push(channel.manifest_path.to_string_lossy().to_string());

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn default_args_match_live_profile() {
        let channel = ChannelDescriptor::new(2, "udp://localhost:2222?timeout=60000000", "streams", "logs");
        let args = HlsSettings::default().ffmpeg_args(&channel);

        assert_eq!(value_after(&args, "-i"), Some("udp://localhost:2222?timeout=60000000"));
        assert_eq!(value_after(&args, "-c:v"), Some("copy"));
        assert_eq!(value_after(&args, "-c:a"), Some("aac"));
        assert_eq!(value_after(&args, "-ar"), Some("44100"));
        assert_eq!(value_after(&args, "-f"), Some("hls"));
        assert_eq!(value_after(&args, "-hls_time"), Some("4"));
        assert_eq!(value_after(&args, "-hls_list_size"), Some("10"));
        assert_eq!(value_after(&args, "-hls_segment_type"), Some("fmp4"));
        assert_eq!(value_after(&args, "-hls_fmp4_init_filename"), Some("stream_2_init.mp4"));
        assert!(value_after(&args, "-hls_segment_filename")
            .unwrap()
            .ends_with("stream_2_%03d.m4s"));
        assert!(args.last().unwrap().ends_with("stream2.m3u8"));
    }

    #[test]
    fn mpegts_skips_init_segment() {
        let channel = ChannelDescriptor::new(0, "udp://localhost:2220", "streams", "logs");
        let settings = HlsSettings {
            segment_type: "mpegts".into(),
            audio_filter: String::new(),
            ..HlsSettings::default()
        };
        let args = settings.ffmpeg_args(&channel);
        assert!(!args.iter().any(|a| a == "-hls_fmp4_init_filename"));
        assert!(!args.iter().any(|a| a == "-af"));
    }

    #[test]
    fn segment_extension_follows_container() {
        let channel = ChannelDescriptor::new(0, "udp://localhost:2220", "streams", "logs");
        let settings = HlsSettings {
            segment_type: "mpegts".into(),
            ..HlsSettings::default()
        };
        assert_eq!(settings.segment_extension(), "ts");
        assert_eq!(HlsSettings::default().segment_extension(), "m4s");

        let args = settings.ffmpeg_args(&channel);
        assert_eq!(value_after(&args, "-hls_segment_type"), Some("mpegts"));
        assert!(value_after(&args, "-hls_segment_filename")
            .unwrap()
            .ends_with("stream_0_%03d.ts"));
    }
}
