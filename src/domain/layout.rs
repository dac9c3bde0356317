//! Output layout shared with the remote service.
//!
//! Muxings write to `<base>/<media>/<qualifier>/<format>/` and manifests
//! reference the same directories relative to `<base>`. The player expects
//! exactly this layout, so every path in the workflow is built here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const FMP4_SEGMENT_NAMING: &str = "seg_%number%.m4s";
pub const FMP4_INIT_SEGMENT_NAME: &str = "init.mp4";
pub const TS_SEGMENT_NAMING: &str = "seg_%number%.ts";

pub const DASH_MANIFEST_NAME: &str = "manifest.mpd";
pub const HLS_MANIFEST_NAME: &str = "manifest.m3u8";
pub const HLS_AUDIO_PLAYLIST: &str = "audiomedia.m3u8";

/// Group id tying HLS variant streams to the audio rendition.
pub const AUDIO_GROUP_ID: &str = "audio_group";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Video,
    Audio,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Video => "video",
            MediaType::Audio => "audio",
        }
    }
}

/// Container family a muxing produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTag {
    /// Fragmented MP4, consumed by the DASH manifest.
    Fmp4,
    /// MPEG-TS, consumed by the HLS manifest.
    Ts,
}

impl FormatTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatTag::Fmp4 => "fmp4",
            FormatTag::Ts => "ts",
        }
    }

    pub fn segment_naming(&self) -> &'static str {
        match self {
            FormatTag::Fmp4 => FMP4_SEGMENT_NAMING,
            FormatTag::Ts => TS_SEGMENT_NAMING,
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One H.264 quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoTier {
    pub bitrate: u64,
    pub width: u32,
}

impl VideoTier {
    pub fn new(bitrate: u64, width: u32) -> Self {
        Self { bitrate, width }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioTier {
    pub bitrate: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rendition {
    Video(VideoTier),
    Audio(AudioTier),
}

impl Rendition {
    pub fn media_type(&self) -> MediaType {
        match self {
            Rendition::Video(_) => MediaType::Video,
            Rendition::Audio(_) => MediaType::Audio,
        }
    }

    /// `<width>_<bitrate>` for video, `<bitrate>` for audio.
    pub fn qualifier(&self) -> String {
        match self {
            Rendition::Video(tier) => format!("{}_{}", tier.width, tier.bitrate),
            Rendition::Audio(tier) => tier.bitrate.to_string(),
        }
    }

    pub fn bitrate(&self) -> u64 {
        match self {
            Rendition::Video(tier) => tier.bitrate,
            Rendition::Audio(tier) => tier.bitrate,
        }
    }
}

impl fmt::Display for Rendition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.media_type().as_str(), self.qualifier())
    }
}

/// Source file name without directories or extension, e.g. `movies/movie.mp4` -> `movie`.
pub fn base_name(input_file: &str) -> String {
    Path::new(input_file)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(String::from)
        .unwrap_or_else(|| input_file.to_string())
}

/// Path builder rooted at the source's base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    base: String,
}

impl OutputLayout {
    pub fn for_input(input_file: &str) -> Self {
        Self {
            base: base_name(input_file),
        }
    }

    /// Directory both manifests are written to.
    pub fn base_name(&self) -> &str {
        &self.base
    }

    /// Muxing output directory, with trailing slash.
    pub fn muxing_path(&self, rendition: &Rendition, format: FormatTag) -> String {
        format!("{}/{}/", self.base, Self::segment_path(rendition, format))
    }

    /// Segment directory relative to the manifest, without trailing slash.
    pub fn segment_path(rendition: &Rendition, format: FormatTag) -> String {
        format!(
            "{}/{}/{}",
            rendition.media_type().as_str(),
            rendition.qualifier(),
            format.as_str()
        )
    }
}

/// HLS variant playlist name for the video tier at `index` (zero-based).
pub fn hls_variant_playlist(index: usize) -> String {
    format!("video{}.m3u8", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn renditions() -> Vec<Rendition> {
        vec![
            Rendition::Video(VideoTier::new(1_500_000, 1024)),
            Rendition::Video(VideoTier::new(1_000_000, 768)),
            Rendition::Video(VideoTier::new(750_000, 640)),
            Rendition::Audio(AudioTier { bitrate: 128_000 }),
        ]
    }

    #[test]
    fn test_base_name_strips_directories_and_extension() {
        assert_eq!(base_name("movie.mp4"), "movie");
        assert_eq!(base_name("uploads/2024/movie.mov"), "movie");
        assert_eq!(base_name("movie"), "movie");
        assert_eq!(base_name("archive/movie.final.mkv"), "movie.final");
    }

    #[test]
    fn test_muxing_paths_follow_convention() {
        let layout = OutputLayout::for_input("movie.mp4");
        let fmp4: Vec<String> = renditions()
            .iter()
            .map(|r| layout.muxing_path(r, FormatTag::Fmp4))
            .collect();
        assert_eq!(
            fmp4,
            vec![
                "movie/video/1024_1500000/fmp4/",
                "movie/video/768_1000000/fmp4/",
                "movie/video/640_750000/fmp4/",
                "movie/audio/128000/fmp4/",
            ]
        );

        let ts: Vec<String> = renditions()
            .iter()
            .map(|r| layout.muxing_path(r, FormatTag::Ts))
            .collect();
        assert_eq!(
            ts,
            vec![
                "movie/video/1024_1500000/ts/",
                "movie/video/768_1000000/ts/",
                "movie/video/640_750000/ts/",
                "movie/audio/128000/ts/",
            ]
        );
    }

    #[test]
    fn test_paths_are_pairwise_distinct_across_families() {
        let layout = OutputLayout::for_input("clips/trailer.mp4");
        let mut tiers: Vec<Rendition> = (1..=6)
            .map(|i| Rendition::Video(VideoTier::new(250_000 * i, 320 * i as u32)))
            .collect();
        tiers.push(Rendition::Audio(AudioTier { bitrate: 96_000 }));

        let layout = &layout;
        let paths: Vec<String> = [FormatTag::Fmp4, FormatTag::Ts]
            .iter()
            .flat_map(|format| tiers.iter().map(move |r| layout.muxing_path(r, *format)))
            .collect();
        let unique: HashSet<&String> = paths.iter().collect();
        assert_eq!(unique.len(), paths.len());
    }

    #[test]
    fn test_segment_path_is_relative_to_manifest() {
        let audio = Rendition::Audio(AudioTier { bitrate: 128_000 });
        assert_eq!(
            OutputLayout::segment_path(&audio, FormatTag::Ts),
            "audio/128000/ts"
        );
        assert_eq!(hls_variant_playlist(0), "video1.m3u8");
    }
}
