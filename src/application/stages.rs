//! The five workflow stages.
//!
//! Each stage takes the configuration plus the ids produced by earlier
//! stages and returns the ids it created. A stage never starts before the
//! previous one has returned, because the service checks at submission
//! time that every referenced id exists.

use super::error::{CreatedResource, Stage, WorkflowError};
use crate::config::{Infrastructure, PrewarmedPoolConfig, WorkflowConfig};
use crate::domain::ids::{
    CodecConfigId, EncodingId, InputId, ManifestId, MuxingId, OutputId, PrewarmedPoolId, RemoteId,
    StreamId,
};
use crate::domain::layout::{
    hls_variant_playlist, AudioTier, FormatTag, OutputLayout, Rendition, VideoTier,
    AUDIO_GROUP_ID, DASH_MANIFEST_NAME, FMP4_INIT_SEGMENT_NAME, HLS_AUDIO_PLAYLIST,
    HLS_MANIFEST_NAME,
};
use crate::domain::resources::{
    AacAudioConfiguration, AudioAdaptationSet, AudioMediaInfo, AzureInput, AzureOutput,
    CloudRegion, DashFmp4Representation, DashManifest, DashRepresentationType, Encoding,
    EncodingOutput, Fmp4Muxing, H264VideoConfiguration, HlsManifest, InfrastructureSettings,
    MuxingStream, PrewarmedEncoderPool, PresetConfiguration, Stream, StreamInfo, StreamInput,
    StreamSelectionMode, TsMuxing,
};
use crate::ports::{ApiError, EncodingApi};
use std::future::Future;
use tracing::{debug, info};

/// Tracks the current stage and every resource created so far, so a
/// failure can report what was left behind.
#[derive(Debug)]
pub struct Ledger {
    stage: Stage,
    created: Vec<CreatedResource>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            stage: Stage::ResourceRegistration,
            created: Vec::new(),
        }
    }
}

impl Ledger {
    pub fn enter(&mut self, stage: Stage) {
        info!(%stage, "entering stage");
        self.stage = stage;
    }

    pub fn created(&self) -> &[CreatedResource] {
        &self.created
    }

    pub fn into_created(self) -> Vec<CreatedResource> {
        self.created
    }

    /// Await a resource-creating call and record its id.
    pub async fn create<I, F>(&mut self, call: &'static str, request: F) -> Result<I, WorkflowError>
    where
        I: RemoteId,
        F: Future<Output = Result<I, ApiError>>,
    {
        match request.await {
            Ok(id) => {
                info!(stage = %self.stage, call, id = %id, "created {}", I::KIND);
                self.created.push(CreatedResource {
                    kind: I::KIND,
                    id: id.as_str().to_string(),
                });
                Ok(id)
            }
            Err(source) => Err(self.fail(call, source)),
        }
    }

    /// Await a call that returns no id (start triggers, manifest entries).
    pub async fn submit<F>(&mut self, call: &'static str, request: F) -> Result<(), WorkflowError>
    where
        F: Future<Output = Result<(), ApiError>>,
    {
        request.await.map_err(|source| self.fail(call, source))?;
        debug!(stage = %self.stage, call, "accepted");
        Ok(())
    }

    fn fail(&self, call: &'static str, source: ApiError) -> WorkflowError {
        WorkflowError {
            stage: self.stage,
            call,
            created: self.created.clone(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredResources {
    pub input_id: InputId,
    pub output_id: OutputId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecSet {
    /// In the caller's tier order.
    pub video: Vec<(VideoTier, CodecConfigId)>,
    pub audio: (AudioTier, CodecConfigId),
}

/// Stream and muxings created for one rendition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionNode {
    pub rendition: Rendition,
    pub stream_id: StreamId,
    pub fmp4_muxing_id: MuxingId,
    pub ts_muxing_id: MuxingId,
}

impl RenditionNode {
    pub fn segment_path(&self, format: FormatTag) -> String {
        OutputLayout::segment_path(&self.rendition, format)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingGraph {
    pub encoding_id: EncodingId,
    pub prewarmed_pool_id: Option<PrewarmedPoolId>,
    pub video: Vec<RenditionNode>,
    pub audio: RenditionNode,
}

/// Stage 1: register the input and output storage.
pub async fn register_resources<A: EncodingApi>(
    api: &A,
    config: &WorkflowConfig,
    ledger: &mut Ledger,
) -> Result<RegisteredResources, WorkflowError> {
    ledger.enter(Stage::ResourceRegistration);

    info!(
        file = %config.input_file,
        account = %config.input.account_name,
        "creating Azure input"
    );
    let input_id = ledger
        .create(
            "register_input",
            api.register_input(AzureInput {
                name: format!("Inputs container in {}", config.input.account_name),
                account_name: config.input.account_name.clone(),
                account_key: config.input.account_key.clone(),
                container: config.input.container.clone(),
            }),
        )
        .await?;

    info!(
        account = %config.output.account_name,
        container = %config.output.container,
        "creating Azure output"
    );
    let output_id = ledger
        .create(
            "register_output",
            api.register_output(AzureOutput {
                name: format!("Outputs container in {}", config.output.account_name),
                account_name: config.output.account_name.clone(),
                account_key: config.output.account_key.clone(),
                container: config.output.container.clone(),
            }),
        )
        .await?;

    Ok(RegisteredResources {
        input_id,
        output_id,
    })
}

/// Stage 2: one H.264 configuration per video tier, one AAC configuration.
pub async fn configure_codecs<A: EncodingApi>(
    api: &A,
    config: &WorkflowConfig,
    ledger: &mut Ledger,
) -> Result<CodecSet, WorkflowError> {
    ledger.enter(Stage::CodecConfiguration);

    let mut video = Vec::with_capacity(config.video_tiers.len());
    for tier in &config.video_tiers {
        info!(bitrate = tier.bitrate, width = tier.width, "creating H264 configuration");
        let id = ledger
            .create(
                "create_video_configuration",
                api.create_video_configuration(H264VideoConfiguration {
                    name: format!("H264 Codec Config for {}", tier.width),
                    bitrate: tier.bitrate,
                    width: tier.width,
                    preset_configuration: PresetConfiguration::VodStandard,
                }),
            )
            .await?;
        video.push((*tier, id));
    }

    info!(bitrate = config.audio.bitrate, "creating AAC configuration");
    let audio_id = ledger
        .create(
            "create_audio_configuration",
            api.create_audio_configuration(AacAudioConfiguration {
                name: "Audio Codec Config".to_string(),
                bitrate: config.audio.bitrate,
            }),
        )
        .await?;

    Ok(CodecSet {
        video,
        audio: (config.audio, audio_id),
    })
}

fn encoding_request(config: &WorkflowConfig) -> Encoding {
    match &config.infrastructure {
        Infrastructure::Managed => Encoding {
            name: format!("Encoding for {} in {}", config.input_file, config.cloud_region),
            cloud_region: config.cloud_region.clone(),
            infrastructure: None,
        },
        Infrastructure::CloudConnect { infrastructure_id } => Encoding {
            name: format!("Encoding for {} using Cloud Connect", config.input_file),
            cloud_region: CloudRegion::external(),
            infrastructure: Some(InfrastructureSettings {
                infrastructure_id: infrastructure_id.clone(),
                cloud_region: config.cloud_region.clone(),
            }),
        },
    }
}

fn prewarmed_pool_request(config: &WorkflowConfig, pool: &PrewarmedPoolConfig) -> PrewarmedEncoderPool {
    let infrastructure_id = match &config.infrastructure {
        Infrastructure::CloudConnect { infrastructure_id } => Some(infrastructure_id.clone()),
        Infrastructure::Managed => None,
    };
    PrewarmedEncoderPool {
        name: "Fast-track encodings".to_string(),
        description: "Use for encodings that have to be done immediately".to_string(),
        encoder_version: pool.encoder_version.clone(),
        infrastructure_id,
        cloud_region: config.cloud_region.clone(),
        disk_size: pool.disk_size,
        target_pool_size: pool.target_pool_size,
    }
}

struct GraphBuilder<'a, A> {
    api: &'a A,
    config: &'a WorkflowConfig,
    layout: &'a OutputLayout,
    resources: &'a RegisteredResources,
    encoding_id: &'a EncodingId,
}

impl<A: EncodingApi> GraphBuilder<'_, A> {
    async fn stream(
        &self,
        ledger: &mut Ledger,
        codec_config_id: &CodecConfigId,
    ) -> Result<StreamId, WorkflowError> {
        let stream = Stream {
            codec_config_id: codec_config_id.clone(),
            input_streams: vec![StreamInput {
                input_id: self.resources.input_id.clone(),
                input_path: self.config.input_file.clone(),
                selection_mode: StreamSelectionMode::Auto,
            }],
        };
        ledger
            .create("create_stream", self.api.create_stream(self.encoding_id, stream))
            .await
    }

    fn output(&self, rendition: &Rendition, format: FormatTag) -> EncodingOutput {
        let path = self.layout.muxing_path(rendition, format);
        info!(%rendition, %format, %path, "creating muxing");
        EncodingOutput::public(self.resources.output_id.clone(), path)
    }

    async fn fmp4_muxing(
        &self,
        ledger: &mut Ledger,
        rendition: &Rendition,
        stream_id: &StreamId,
    ) -> Result<MuxingId, WorkflowError> {
        let muxing = Fmp4Muxing {
            segment_length: self.config.segment_length,
            segment_naming: FormatTag::Fmp4.segment_naming().to_string(),
            init_segment_name: FMP4_INIT_SEGMENT_NAME.to_string(),
            streams: vec![MuxingStream {
                stream_id: stream_id.clone(),
            }],
            outputs: vec![self.output(rendition, FormatTag::Fmp4)],
        };
        ledger
            .create(
                "create_fmp4_muxing",
                self.api.create_fmp4_muxing(self.encoding_id, muxing),
            )
            .await
    }

    async fn ts_muxing(
        &self,
        ledger: &mut Ledger,
        rendition: &Rendition,
        stream_id: &StreamId,
    ) -> Result<MuxingId, WorkflowError> {
        let muxing = TsMuxing {
            segment_length: self.config.segment_length,
            segment_naming: FormatTag::Ts.segment_naming().to_string(),
            streams: vec![MuxingStream {
                stream_id: stream_id.clone(),
            }],
            outputs: vec![self.output(rendition, FormatTag::Ts)],
        };
        ledger
            .create(
                "create_ts_muxing",
                self.api.create_ts_muxing(self.encoding_id, muxing),
            )
            .await
    }
}

/// Stage 3: encoding, then every stream, then fMP4 muxings, then TS muxings.
/// Video tiers come first in caller order, audio last.
pub async fn build_encoding_graph<A: EncodingApi>(
    api: &A,
    config: &WorkflowConfig,
    layout: &OutputLayout,
    resources: &RegisteredResources,
    codecs: &CodecSet,
    ledger: &mut Ledger,
) -> Result<EncodingGraph, WorkflowError> {
    ledger.enter(Stage::EncodingGraph);

    let prewarmed_pool_id = match &config.prewarmed_pool {
        Some(pool) => {
            info!(
                encoder_version = %pool.encoder_version,
                size = pool.target_pool_size,
                "creating pre-warmed encoder pool"
            );
            let id = ledger
                .create(
                    "create_prewarmed_pool",
                    api.create_prewarmed_pool(prewarmed_pool_request(config, pool)),
                )
                .await?;
            ledger
                .submit("start_prewarmed_pool", api.start_prewarmed_pool(&id))
                .await?;
            Some(id)
        }
        None => None,
    };

    info!(region = %config.cloud_region, "creating encoding");
    let encoding_id = ledger
        .create("create_encoding", api.create_encoding(encoding_request(config)))
        .await?;

    let builder = GraphBuilder {
        api,
        config,
        layout,
        resources,
        encoding_id: &encoding_id,
    };
    let video: Vec<Rendition> = codecs
        .video
        .iter()
        .map(|(tier, _)| Rendition::Video(*tier))
        .collect();
    let audio = Rendition::Audio(codecs.audio.0);

    let mut video_streams = Vec::with_capacity(video.len());
    for (_, codec_config_id) in &codecs.video {
        video_streams.push(builder.stream(ledger, codec_config_id).await?);
    }
    let audio_stream = builder.stream(ledger, &codecs.audio.1).await?;

    let mut video_fmp4 = Vec::with_capacity(video.len());
    for (rendition, stream_id) in video.iter().zip(&video_streams) {
        video_fmp4.push(builder.fmp4_muxing(ledger, rendition, stream_id).await?);
    }
    let audio_fmp4 = builder.fmp4_muxing(ledger, &audio, &audio_stream).await?;

    let mut video_ts = Vec::with_capacity(video.len());
    for (rendition, stream_id) in video.iter().zip(&video_streams) {
        video_ts.push(builder.ts_muxing(ledger, rendition, stream_id).await?);
    }
    let audio_ts = builder.ts_muxing(ledger, &audio, &audio_stream).await?;

    let video = video
        .into_iter()
        .zip(video_streams)
        .zip(video_fmp4)
        .zip(video_ts)
        .map(|(((rendition, stream_id), fmp4_muxing_id), ts_muxing_id)| RenditionNode {
            rendition,
            stream_id,
            fmp4_muxing_id,
            ts_muxing_id,
        })
        .collect();

    Ok(EncodingGraph {
        encoding_id,
        prewarmed_pool_id,
        video,
        audio: RenditionNode {
            rendition: audio,
            stream_id: audio_stream,
            fmp4_muxing_id: audio_fmp4,
            ts_muxing_id: audio_ts,
        },
    })
}

/// Stage 4: hand the encoding to the service. Returns once it is accepted.
pub async fn start_encoding<A: EncodingApi>(
    api: &A,
    graph: &EncodingGraph,
    ledger: &mut Ledger,
) -> Result<(), WorkflowError> {
    ledger.enter(Stage::JobExecution);
    info!(encoding = %graph.encoding_id, "starting encoding");
    ledger
        .submit("start_encoding", api.start_encoding(&graph.encoding_id))
        .await
}

fn dash_representation(graph: &EncodingGraph, node: &RenditionNode) -> DashFmp4Representation {
    DashFmp4Representation {
        kind: DashRepresentationType::Template,
        encoding_id: graph.encoding_id.clone(),
        muxing_id: node.fmp4_muxing_id.clone(),
        segment_path: node.segment_path(FormatTag::Fmp4),
    }
}

/// Stage 5a: DASH manifest over the fMP4 muxings, started last.
pub async fn build_dash_manifest<A: EncodingApi>(
    api: &A,
    config: &WorkflowConfig,
    layout: &OutputLayout,
    resources: &RegisteredResources,
    graph: &EncodingGraph,
    ledger: &mut Ledger,
) -> Result<ManifestId, WorkflowError> {
    ledger.enter(Stage::ManifestConstruction);

    info!(path = %layout.base_name(), "creating DASH manifest");
    let manifest = ledger
        .create(
            "create_dash_manifest",
            api.create_dash_manifest(DashManifest {
                name: format!("{} manifest for DASH", config.input_file),
                manifest_name: DASH_MANIFEST_NAME.to_string(),
                outputs: vec![EncodingOutput::public(
                    resources.output_id.clone(),
                    layout.base_name(),
                )],
            }),
        )
        .await?;

    let period = ledger
        .create("create_period", api.create_period(&manifest))
        .await?;
    let video_set = ledger
        .create(
            "create_video_adaptation_set",
            api.create_video_adaptation_set(&manifest, &period),
        )
        .await?;
    let audio_set = ledger
        .create(
            "create_audio_adaptation_set",
            api.create_audio_adaptation_set(
                &manifest,
                &period,
                AudioAdaptationSet {
                    lang: config.audio_language.clone(),
                },
            ),
        )
        .await?;

    ledger
        .submit(
            "add_fmp4_representation",
            api.add_fmp4_representation(
                &manifest,
                &period,
                &audio_set,
                dash_representation(graph, &graph.audio),
            ),
        )
        .await?;
    for node in &graph.video {
        ledger
            .submit(
                "add_fmp4_representation",
                api.add_fmp4_representation(
                    &manifest,
                    &period,
                    &video_set,
                    dash_representation(graph, node),
                ),
            )
            .await?;
    }

    info!(%manifest, "starting DASH manifest generation");
    ledger
        .submit("start_dash_manifest", api.start_dash_manifest(&manifest))
        .await?;
    Ok(manifest)
}

/// Stage 5b: HLS manifest over the TS muxings, started last.
pub async fn build_hls_manifest<A: EncodingApi>(
    api: &A,
    config: &WorkflowConfig,
    layout: &OutputLayout,
    resources: &RegisteredResources,
    graph: &EncodingGraph,
    ledger: &mut Ledger,
) -> Result<ManifestId, WorkflowError> {
    ledger.enter(Stage::ManifestConstruction);

    info!(path = %layout.base_name(), "creating HLS manifest");
    let manifest = ledger
        .create(
            "create_hls_manifest",
            api.create_hls_manifest(HlsManifest {
                name: format!("{} manifest for HLS", config.input_file),
                manifest_name: HLS_MANIFEST_NAME.to_string(),
                outputs: vec![EncodingOutput::public(
                    resources.output_id.clone(),
                    layout.base_name(),
                )],
            }),
        )
        .await?;

    let audio = &graph.audio;
    ledger
        .submit(
            "add_audio_media",
            api.add_audio_media(
                &manifest,
                AudioMediaInfo {
                    name: "my-audio-media".to_string(),
                    group_id: AUDIO_GROUP_ID.to_string(),
                    segment_path: audio.segment_path(FormatTag::Ts),
                    uri: HLS_AUDIO_PLAYLIST.to_string(),
                    encoding_id: graph.encoding_id.clone(),
                    stream_id: audio.stream_id.clone(),
                    muxing_id: audio.ts_muxing_id.clone(),
                    language: config.audio_language.clone(),
                },
            ),
        )
        .await?;

    for (index, node) in graph.video.iter().enumerate() {
        ledger
            .create(
                "add_stream_info",
                api.add_stream_info(
                    &manifest,
                    StreamInfo {
                        audio: AUDIO_GROUP_ID.to_string(),
                        closed_captions: "NONE".to_string(),
                        segment_path: node.segment_path(FormatTag::Ts),
                        uri: hls_variant_playlist(index),
                        encoding_id: graph.encoding_id.clone(),
                        stream_id: node.stream_id.clone(),
                        muxing_id: node.ts_muxing_id.clone(),
                    },
                ),
            )
            .await?;
    }

    info!(%manifest, "starting HLS manifest generation");
    ledger
        .submit("start_hls_manifest", api.start_hls_manifest(&manifest))
        .await?;
    Ok(manifest)
}
