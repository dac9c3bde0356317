use super::error::ApiError;
use crate::domain::ids::{
    AdaptationSetId, CodecConfigId, EncodingId, InputId, ManifestId, MuxingId, OutputId, PeriodId,
    PrewarmedPoolId, StreamId, StreamInfoId,
};
use crate::domain::resources::{
    AacAudioConfiguration, AudioAdaptationSet, AudioMediaInfo, AzureInput, AzureOutput,
    DashFmp4Representation, DashManifest, Encoding, Fmp4Muxing, H264VideoConfiguration,
    HlsManifest, PrewarmedEncoderPool, Stream, StreamInfo, TsMuxing,
};
use async_trait::async_trait;

/// Resource-creation endpoints of the remote encoding service.
///
/// Every call creates exactly one remote resource and returns its id, except
/// the `start_*` calls, which hand a job or manifest to the service for
/// asynchronous processing and return as soon as it is accepted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EncodingApi: Send + Sync {
    async fn register_input(&self, input: AzureInput) -> Result<InputId, ApiError>;

    async fn register_output(&self, output: AzureOutput) -> Result<OutputId, ApiError>;

    async fn create_video_configuration(
        &self,
        config: H264VideoConfiguration,
    ) -> Result<CodecConfigId, ApiError>;

    async fn create_audio_configuration(
        &self,
        config: AacAudioConfiguration,
    ) -> Result<CodecConfigId, ApiError>;

    async fn create_prewarmed_pool(
        &self,
        pool: PrewarmedEncoderPool,
    ) -> Result<PrewarmedPoolId, ApiError>;

    async fn start_prewarmed_pool(&self, pool: &PrewarmedPoolId) -> Result<(), ApiError>;

    async fn create_encoding(&self, encoding: Encoding) -> Result<EncodingId, ApiError>;

    async fn create_stream(
        &self,
        encoding: &EncodingId,
        stream: Stream,
    ) -> Result<StreamId, ApiError>;

    async fn create_fmp4_muxing(
        &self,
        encoding: &EncodingId,
        muxing: Fmp4Muxing,
    ) -> Result<MuxingId, ApiError>;

    async fn create_ts_muxing(
        &self,
        encoding: &EncodingId,
        muxing: TsMuxing,
    ) -> Result<MuxingId, ApiError>;

    async fn start_encoding(&self, encoding: &EncodingId) -> Result<(), ApiError>;

    async fn create_dash_manifest(&self, manifest: DashManifest) -> Result<ManifestId, ApiError>;

    async fn create_period(&self, manifest: &ManifestId) -> Result<PeriodId, ApiError>;

    async fn create_video_adaptation_set(
        &self,
        manifest: &ManifestId,
        period: &PeriodId,
    ) -> Result<AdaptationSetId, ApiError>;

    async fn create_audio_adaptation_set(
        &self,
        manifest: &ManifestId,
        period: &PeriodId,
        adaptation_set: AudioAdaptationSet,
    ) -> Result<AdaptationSetId, ApiError>;

    async fn add_fmp4_representation(
        &self,
        manifest: &ManifestId,
        period: &PeriodId,
        adaptation_set: &AdaptationSetId,
        representation: DashFmp4Representation,
    ) -> Result<(), ApiError>;

    async fn start_dash_manifest(&self, manifest: &ManifestId) -> Result<(), ApiError>;

    async fn create_hls_manifest(&self, manifest: HlsManifest) -> Result<ManifestId, ApiError>;

    async fn add_audio_media(
        &self,
        manifest: &ManifestId,
        media: AudioMediaInfo,
    ) -> Result<(), ApiError>;

    async fn add_stream_info(
        &self,
        manifest: &ManifestId,
        stream_info: StreamInfo,
    ) -> Result<StreamInfoId, ApiError>;

    async fn start_hls_manifest(&self, manifest: &ManifestId) -> Result<(), ApiError>;
}
