//! Bitmovin REST adapter.
//!
//! Implements [`EncodingApi`] against `https://api.bitmovin.com/v1`,
//! authenticating every request with the `X-Api-Key` header.

mod envelope;

use crate::domain::ids::{
    AdaptationSetId, CodecConfigId, EncodingId, InputId, ManifestId, MuxingId, OutputId, PeriodId,
    PrewarmedPoolId, RemoteId, StreamId, StreamInfoId,
};
use crate::domain::resources::{
    AacAudioConfiguration, AudioAdaptationSet, AudioMediaInfo, AzureInput, AzureOutput,
    DashFmp4Representation, DashManifest, Encoding, Fmp4Muxing, H264VideoConfiguration,
    HlsManifest, PrewarmedEncoderPool, Stream, StreamInfo, TsMuxing,
};
use crate::ports::{ApiError, EncodingApi};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.bitmovin.com/v1";

const API_KEY_HEADER: &str = "X-Api-Key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct BitmovinClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BitmovinClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("bitmovin-vod/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B>(&self, path: &str, body: &B) -> Result<Option<Value>, ApiError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "POST");

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::resource(format!("request to {path} failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::resource(format!("reading response from {path} failed: {e}")))?;

        let result = envelope::parse_response(status, &text);
        debug!(%url, status = status.as_u16(), ok = result.is_ok(), "response");
        result
    }

    async fn create<B, I>(&self, path: &str, body: &B) -> Result<I, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        I: RemoteId,
    {
        let result = self.post(path, body).await?;
        envelope::result_id(result).map(I::from)
    }

    async fn submit(&self, path: &str) -> Result<(), ApiError> {
        self.post(path, &serde_json::json!({})).await.map(|_| ())
    }
}

#[async_trait]
impl EncodingApi for BitmovinClient {
    async fn register_input(&self, input: AzureInput) -> Result<InputId, ApiError> {
        self.create("/encoding/inputs/azure", &input).await
    }

    async fn register_output(&self, output: AzureOutput) -> Result<OutputId, ApiError> {
        self.create("/encoding/outputs/azure", &output).await
    }

    async fn create_video_configuration(
        &self,
        config: H264VideoConfiguration,
    ) -> Result<CodecConfigId, ApiError> {
        self.create("/encoding/configurations/video/h264", &config)
            .await
    }

    async fn create_audio_configuration(
        &self,
        config: AacAudioConfiguration,
    ) -> Result<CodecConfigId, ApiError> {
        self.create("/encoding/configurations/audio/aac", &config)
            .await
    }

    async fn create_prewarmed_pool(
        &self,
        pool: PrewarmedEncoderPool,
    ) -> Result<PrewarmedPoolId, ApiError> {
        self.create("/encoding/infrastructure/prewarmed-encoder-pools", &pool)
            .await
    }

    async fn start_prewarmed_pool(&self, pool: &PrewarmedPoolId) -> Result<(), ApiError> {
        self.submit(&format!(
            "/encoding/infrastructure/prewarmed-encoder-pools/{pool}/start"
        ))
        .await
    }

    async fn create_encoding(&self, encoding: Encoding) -> Result<EncodingId, ApiError> {
        self.create("/encoding/encodings", &encoding).await
    }

    async fn create_stream(
        &self,
        encoding: &EncodingId,
        stream: Stream,
    ) -> Result<StreamId, ApiError> {
        self.create(&format!("/encoding/encodings/{encoding}/streams"), &stream)
            .await
    }

    async fn create_fmp4_muxing(
        &self,
        encoding: &EncodingId,
        muxing: Fmp4Muxing,
    ) -> Result<MuxingId, ApiError> {
        self.create(
            &format!("/encoding/encodings/{encoding}/muxings/fmp4"),
            &muxing,
        )
        .await
    }

    async fn create_ts_muxing(
        &self,
        encoding: &EncodingId,
        muxing: TsMuxing,
    ) -> Result<MuxingId, ApiError> {
        self.create(&format!("/encoding/encodings/{encoding}/muxings/ts"), &muxing)
            .await
    }

    async fn start_encoding(&self, encoding: &EncodingId) -> Result<(), ApiError> {
        self.submit(&format!("/encoding/encodings/{encoding}/start"))
            .await
    }

    async fn create_dash_manifest(&self, manifest: DashManifest) -> Result<ManifestId, ApiError> {
        self.create("/encoding/manifests/dash", &manifest).await
    }

    async fn create_period(&self, manifest: &ManifestId) -> Result<PeriodId, ApiError> {
        self.create(
            &format!("/encoding/manifests/dash/{manifest}/periods"),
            &serde_json::json!({}),
        )
        .await
    }

    async fn create_video_adaptation_set(
        &self,
        manifest: &ManifestId,
        period: &PeriodId,
    ) -> Result<AdaptationSetId, ApiError> {
        self.create(
            &format!("/encoding/manifests/dash/{manifest}/periods/{period}/adaptationsets/video"),
            &serde_json::json!({}),
        )
        .await
    }

    async fn create_audio_adaptation_set(
        &self,
        manifest: &ManifestId,
        period: &PeriodId,
        adaptation_set: AudioAdaptationSet,
    ) -> Result<AdaptationSetId, ApiError> {
        self.create(
            &format!("/encoding/manifests/dash/{manifest}/periods/{period}/adaptationsets/audio"),
            &adaptation_set,
        )
        .await
    }

    async fn add_fmp4_representation(
        &self,
        manifest: &ManifestId,
        period: &PeriodId,
        adaptation_set: &AdaptationSetId,
        representation: DashFmp4Representation,
    ) -> Result<(), ApiError> {
        self.post(
            &format!(
                "/encoding/manifests/dash/{manifest}/periods/{period}/adaptationsets/{adaptation_set}/representations/fmp4"
            ),
            &representation,
        )
        .await
        .map(|_| ())
    }

    async fn start_dash_manifest(&self, manifest: &ManifestId) -> Result<(), ApiError> {
        self.submit(&format!("/encoding/manifests/dash/{manifest}/start"))
            .await
    }

    async fn create_hls_manifest(&self, manifest: HlsManifest) -> Result<ManifestId, ApiError> {
        self.create("/encoding/manifests/hls", &manifest).await
    }

    async fn add_audio_media(
        &self,
        manifest: &ManifestId,
        media: AudioMediaInfo,
    ) -> Result<(), ApiError> {
        self.post(
            &format!("/encoding/manifests/hls/{manifest}/media/audio"),
            &media,
        )
        .await
        .map(|_| ())
    }

    async fn add_stream_info(
        &self,
        manifest: &ManifestId,
        stream_info: StreamInfo,
    ) -> Result<StreamInfoId, ApiError> {
        self.create(
            &format!("/encoding/manifests/hls/{manifest}/streams"),
            &stream_info,
        )
        .await
    }

    async fn start_hls_manifest(&self, manifest: &ManifestId) -> Result<(), ApiError> {
        self.submit(&format!("/encoding/manifests/hls/{manifest}/start"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resources::{EncodingOutput, MuxingStream};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn created(id: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "requestId": "req-1",
            "status": "SUCCESS",
            "data": { "result": { "id": id } }
        }))
    }

    #[tokio::test]
    async fn test_register_input_sends_api_key_and_camel_case_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/encoding/inputs/azure"))
            .and(header("X-Api-Key", "secret"))
            .and(body_partial_json(json!({
                "accountName": "mediastore",
                "container": "inputs"
            })))
            .respond_with(created("input-1"))
            .expect(1)
            .mount(&server)
            .await;

        let client = BitmovinClient::new("secret", server.uri()).unwrap();
        let id = client
            .register_input(AzureInput {
                name: "Inputs container in mediastore".to_string(),
                account_name: "mediastore".to_string(),
                account_key: "key".to_string(),
                container: "inputs".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(id, InputId::new("input-1"));
    }

    #[tokio::test]
    async fn test_muxing_is_posted_under_its_encoding() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/encoding/encodings/enc-1/muxings/ts"))
            .and(body_partial_json(json!({
                "segmentNaming": "seg_%number%.ts",
                "streams": [{ "streamId": "stream-1" }]
            })))
            .respond_with(created("mux-1"))
            .mount(&server)
            .await;

        let client = BitmovinClient::new("secret", format!("{}/", server.uri())).unwrap();
        let id = client
            .create_ts_muxing(
                &EncodingId::new("enc-1"),
                TsMuxing {
                    segment_length: 4.0,
                    segment_naming: "seg_%number%.ts".to_string(),
                    streams: vec![MuxingStream {
                        stream_id: StreamId::new("stream-1"),
                    }],
                    outputs: vec![EncodingOutput::public(
                        OutputId::new("out-1"),
                        "movie/video/1024_1500000/ts/",
                    )],
                },
            )
            .await
            .unwrap();

        assert_eq!(id, MuxingId::new("mux-1"));
    }

    #[tokio::test]
    async fn test_rejected_reference_maps_to_validation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/encoding/encodings/enc-1/start"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "requestId": "req-2",
                "status": "ERROR",
                "data": { "code": 1000, "message": "Encoding has no streams" }
            })))
            .mount(&server)
            .await;

        let client = BitmovinClient::new("secret", server.uri()).unwrap();
        let err = client
            .start_encoding(&EncodingId::new("enc-1"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::Validation {
                code: Some(1000),
                message: "Encoding has no streams".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_is_resource_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let uri = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = BitmovinClient::new("secret", uri).unwrap();
        let err = client
            .create_dash_manifest(DashManifest {
                name: "movie.mp4 manifest for DASH".to_string(),
                manifest_name: "manifest.mpd".to_string(),
                outputs: vec![],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Resource { status: None, .. }));
    }
}
