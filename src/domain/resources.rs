//! Request bodies for the encoding API.
//!
//! Field names serialize in camelCase to match the service's JSON schema.

use super::ids::{CodecConfigId, EncodingId, InputId, MuxingId, OutputId, StreamId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureInput {
    pub name: String,
    pub account_name: String,
    pub account_key: String,
    pub container: String,
}

/// Azure blob output. The container must allow anonymous blob reads for the
/// demo player to fetch the manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureOutput {
    pub name: String,
    pub account_name: String,
    pub account_key: String,
    pub container: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresetConfiguration {
    VodStandard,
    VodHighQuality,
    VodSpeed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct H264VideoConfiguration {
    pub name: String,
    pub bitrate: u64,
    pub width: u32,
    pub preset_configuration: PresetConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AacAudioConfiguration {
    pub name: String,
    pub bitrate: u64,
}

/// Cloud region identifier as the service spells it, e.g. `AZURE_EUROPE_WEST`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CloudRegion(String);

impl CloudRegion {
    pub fn new(region: impl Into<String>) -> Self {
        Self(region.into())
    }

    pub fn azure_europe_west() -> Self {
        Self::new("AZURE_EUROPE_WEST")
    }

    /// Region used for Cloud Connect encodings running on customer infrastructure.
    pub fn external() -> Self {
        Self::new("EXTERNAL")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CloudRegion {
    fn default() -> Self {
        Self::azure_europe_west()
    }
}

impl fmt::Display for CloudRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureSettings {
    pub infrastructure_id: String,
    pub cloud_region: CloudRegion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encoding {
    pub name: String,
    pub cloud_region: CloudRegion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrastructure: Option<InfrastructureSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamSelectionMode {
    /// Let the service pick the first matching track.
    Auto,
    PositionAbsolute,
    VideoRelative,
    AudioRelative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInput {
    pub input_id: InputId,
    pub input_path: String,
    pub selection_mode: StreamSelectionMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub codec_config_id: CodecConfigId,
    pub input_streams: Vec<StreamInput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AclPermission {
    PublicRead,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    pub permission: AclPermission,
}

impl AclEntry {
    pub const PUBLIC_READ: AclEntry = AclEntry {
        permission: AclPermission::PublicRead,
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingOutput {
    pub output_id: OutputId,
    pub output_path: String,
    pub acl: Vec<AclEntry>,
}

impl EncodingOutput {
    /// Output readable by anyone, which the demo player needs.
    pub fn public(output_id: OutputId, output_path: impl Into<String>) -> Self {
        Self {
            output_id,
            output_path: output_path.into(),
            acl: vec![AclEntry::PUBLIC_READ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MuxingStream {
    pub stream_id: StreamId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fmp4Muxing {
    pub segment_length: f64,
    pub segment_naming: String,
    pub init_segment_name: String,
    pub streams: Vec<MuxingStream>,
    pub outputs: Vec<EncodingOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TsMuxing {
    pub segment_length: f64,
    pub segment_naming: String,
    pub streams: Vec<MuxingStream>,
    pub outputs: Vec<EncodingOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashManifest {
    pub name: String,
    pub manifest_name: String,
    pub outputs: Vec<EncodingOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioAdaptationSet {
    pub lang: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DashRepresentationType {
    Template,
    List,
    Timeline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashFmp4Representation {
    #[serde(rename = "type")]
    pub kind: DashRepresentationType,
    pub encoding_id: EncodingId,
    pub muxing_id: MuxingId,
    pub segment_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HlsManifest {
    pub name: String,
    pub manifest_name: String,
    pub outputs: Vec<EncodingOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMediaInfo {
    pub name: String,
    pub group_id: String,
    pub segment_path: String,
    pub uri: String,
    pub encoding_id: EncodingId,
    pub stream_id: StreamId,
    pub muxing_id: MuxingId,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    /// Audio group id; must match an [`AudioMediaInfo::group_id`] in the same manifest.
    pub audio: String,
    pub closed_captions: String,
    pub segment_path: String,
    pub uri: String,
    pub encoding_id: EncodingId,
    pub stream_id: StreamId,
    pub muxing_id: MuxingId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrewarmedEncoderDiskSize {
    #[serde(rename = "GB_128")]
    Gb128,
    #[serde(rename = "GB_256")]
    Gb256,
    #[serde(rename = "GB_500")]
    Gb500,
    #[serde(rename = "GB_1000")]
    Gb1000,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrewarmedEncoderPool {
    pub name: String,
    pub description: String,
    pub encoder_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrastructure_id: Option<String>,
    pub cloud_region: CloudRegion,
    pub disk_size: PrewarmedEncoderDiskSize,
    pub target_pool_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fmp4_muxing_wire_format() {
        let muxing = Fmp4Muxing {
            segment_length: 4.0,
            segment_naming: "seg_%number%.m4s".to_string(),
            init_segment_name: "init.mp4".to_string(),
            streams: vec![MuxingStream {
                stream_id: StreamId::new("s-1"),
            }],
            outputs: vec![EncodingOutput::public(
                OutputId::new("o-1"),
                "movie/video/1024_1500000/fmp4/",
            )],
        };

        assert_eq!(
            serde_json::to_value(&muxing).unwrap(),
            json!({
                "segmentLength": 4.0,
                "segmentNaming": "seg_%number%.m4s",
                "initSegmentName": "init.mp4",
                "streams": [{ "streamId": "s-1" }],
                "outputs": [{
                    "outputId": "o-1",
                    "outputPath": "movie/video/1024_1500000/fmp4/",
                    "acl": [{ "permission": "PUBLIC_READ" }]
                }]
            })
        );
    }

    #[test]
    fn test_managed_encoding_omits_infrastructure() {
        let encoding = Encoding {
            name: "Encoding for movie.mp4".to_string(),
            cloud_region: CloudRegion::default(),
            infrastructure: None,
        };
        let value = serde_json::to_value(&encoding).unwrap();
        assert_eq!(value["cloudRegion"], "AZURE_EUROPE_WEST");
        assert!(value.get("infrastructure").is_none());
    }

    #[test]
    fn test_stream_and_representation_enums() {
        let stream = Stream {
            codec_config_id: CodecConfigId::new("c-1"),
            input_streams: vec![StreamInput {
                input_id: InputId::new("i-1"),
                input_path: "movie.mp4".to_string(),
                selection_mode: StreamSelectionMode::Auto,
            }],
        };
        let value = serde_json::to_value(&stream).unwrap();
        assert_eq!(value["inputStreams"][0]["selectionMode"], "AUTO");

        let representation = DashFmp4Representation {
            kind: DashRepresentationType::Template,
            encoding_id: EncodingId::new("e-1"),
            muxing_id: MuxingId::new("m-1"),
            segment_path: "audio/128000/fmp4".to_string(),
        };
        let value = serde_json::to_value(&representation).unwrap();
        assert_eq!(value["type"], "TEMPLATE");
        assert_eq!(value["segmentPath"], "audio/128000/fmp4");
    }

    #[test]
    fn test_pool_disk_size_spelling() {
        assert_eq!(
            serde_json::to_value(PrewarmedEncoderDiskSize::Gb500).unwrap(),
            "GB_500"
        );
    }
}
