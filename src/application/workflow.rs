use super::error::{CreatedResource, WorkflowError};
use super::stages::{
    build_dash_manifest, build_encoding_graph, build_hls_manifest, configure_codecs,
    register_resources, start_encoding, CodecSet, EncodingGraph, Ledger, RegisteredResources,
};
use crate::config::WorkflowConfig;
use crate::domain::demo::DemoUrls;
use crate::domain::ids::ManifestId;
use crate::domain::layout::OutputLayout;
use crate::ports::EncodingApi;
use tracing::info;

/// Everything a successful run created, plus the player links.
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub resources: RegisteredResources,
    pub codecs: CodecSet,
    pub graph: EncodingGraph,
    pub dash_manifest: ManifestId,
    pub hls_manifest: ManifestId,
    pub demo: DemoUrls,
    /// Creation order.
    pub created: Vec<CreatedResource>,
}

/// Drives one source file through registration, codec setup, graph
/// construction, encoding start and manifest generation.
///
/// Every run creates a fresh set of remote resources; nothing is looked up
/// or reused from earlier runs.
pub struct EncodingWorkflow<A> {
    api: A,
    config: WorkflowConfig,
}

impl<A> EncodingWorkflow<A>
where
    A: EncodingApi,
{
    pub fn new(api: A, config: WorkflowConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run all stages, stopping at the first failing call.
    pub async fn run(&self) -> Result<WorkflowReport, WorkflowError> {
        let api = &self.api;
        let config = &self.config;
        let layout = OutputLayout::for_input(&config.input_file);
        let mut ledger = Ledger::default();

        info!(file = %config.input_file, base = %layout.base_name(), "starting workflow");

        let resources = register_resources(api, config, &mut ledger).await?;
        let codecs = configure_codecs(api, config, &mut ledger).await?;
        let graph =
            build_encoding_graph(api, config, &layout, &resources, &codecs, &mut ledger).await?;
        start_encoding(api, &graph, &mut ledger).await?;
        let dash_manifest =
            build_dash_manifest(api, config, &layout, &resources, &graph, &mut ledger).await?;
        let hls_manifest =
            build_hls_manifest(api, config, &layout, &resources, &graph, &mut ledger).await?;

        let demo = DemoUrls::new(
            &config.output.account_name,
            &config.output.container,
            layout.base_name(),
        );
        info!(
            encoding = %graph.encoding_id,
            resources = ledger.created().len(),
            "workflow submitted"
        );

        Ok(WorkflowReport {
            resources,
            codecs,
            graph,
            dash_manifest,
            hls_manifest,
            demo,
            created: ledger.into_created(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{Call, CallKind, InMemoryApi};
    use crate::application::error::Stage;
    use crate::config::{ApiConfig, AzureStorage, Infrastructure, PrewarmedPoolConfig};
    use crate::domain::ids::{InputId, OutputId, ResourceKind};
    use crate::domain::layout::{AudioTier, VideoTier};
    use crate::domain::resources::{CloudRegion, PrewarmedEncoderDiskSize};
    use crate::ports::{ApiError, MockEncodingApi};
    use mockall::Sequence;
    use std::collections::HashSet;

    fn config() -> WorkflowConfig {
        WorkflowConfig {
            api: ApiConfig {
                api_key: None,
                base_url: "http://localhost".to_string(),
            },
            input: AzureStorage {
                account_name: "mediastore".to_string(),
                account_key: "c2VjcmV0".to_string(),
                container: "inputs".to_string(),
            },
            input_file: "movie.mp4".to_string(),
            output: AzureStorage {
                account_name: "mediastore".to_string(),
                account_key: "c2VjcmV0".to_string(),
                container: "outputs".to_string(),
            },
            cloud_region: CloudRegion::default(),
            infrastructure: Infrastructure::Managed,
            prewarmed_pool: None,
            video_tiers: vec![
                VideoTier::new(1_500_000, 1024),
                VideoTier::new(1_000_000, 768),
                VideoTier::new(750_000, 640),
            ],
            audio: AudioTier { bitrate: 128_000 },
            audio_language: "en".to_string(),
            segment_length: 4.0,
        }
    }

    fn position(calls: &[Call], kind: CallKind) -> Vec<usize> {
        calls
            .iter()
            .enumerate()
            .filter(|(_, call)| call.kind() == kind)
            .map(|(i, _)| i)
            .collect()
    }

    fn muxing_paths(calls: &[Call], kind: CallKind) -> Vec<String> {
        calls
            .iter()
            .filter_map(|call| match call {
                Call::CreateFmp4Muxing { path, .. } if kind == CallKind::CreateFmp4Muxing => {
                    Some(path.clone())
                }
                Call::CreateTsMuxing { path, .. } if kind == CallKind::CreateTsMuxing => {
                    Some(path.clone())
                }
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_reference_run_creates_expected_graph() {
        let workflow = EncodingWorkflow::new(InMemoryApi::new(), config());
        let report = workflow.run().await.unwrap();
        let calls = workflow.api().calls().await;

        assert_eq!(position(&calls, CallKind::CreateVideoConfiguration).len(), 3);
        assert_eq!(position(&calls, CallKind::CreateAudioConfiguration).len(), 1);
        assert_eq!(position(&calls, CallKind::CreateStream).len(), 4);
        assert_eq!(position(&calls, CallKind::StartEncoding).len(), 1);
        assert_eq!(report.graph.video.len(), 3);

        assert_eq!(
            muxing_paths(&calls, CallKind::CreateFmp4Muxing),
            vec![
                "movie/video/1024_1500000/fmp4/",
                "movie/video/768_1000000/fmp4/",
                "movie/video/640_750000/fmp4/",
                "movie/audio/128000/fmp4/",
            ]
        );
        assert_eq!(
            muxing_paths(&calls, CallKind::CreateTsMuxing),
            vec![
                "movie/video/1024_1500000/ts/",
                "movie/video/768_1000000/ts/",
                "movie/video/640_750000/ts/",
                "movie/audio/128000/ts/",
            ]
        );

        let add_stream_info: Vec<(String, String)> = calls
            .iter()
            .filter_map(|call| match call {
                Call::AddStreamInfo {
                    uri, audio_group, ..
                } => Some((uri.clone(), audio_group.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            add_stream_info,
            vec![
                ("video1.m3u8".to_string(), "audio_group".to_string()),
                ("video2.m3u8".to_string(), "audio_group".to_string()),
                ("video3.m3u8".to_string(), "audio_group".to_string()),
            ]
        );
        assert!(calls.iter().any(|call| matches!(
            call,
            Call::AddAudioMedia { group_id, .. } if group_id == "audio_group"
        )));

        assert_eq!(
            report.demo.dash,
            "https://bitmovin.com/demos/stream-test?format=dash&manifest=https%3A%2F%2Fmediastore.blob.core.windows.net%2Foutputs%2Fmovie%2Fmanifest.mpd"
        );
        assert_eq!(
            report.demo.hls,
            "https://bitmovin.com/demos/stream-test?format=hls&manifest=https%3A%2F%2Fmediastore.blob.core.windows.net%2Foutputs%2Fmovie%2Fmanifest.m3u8"
        );
    }

    #[tokio::test]
    async fn test_calls_respect_dependency_order() {
        let workflow = EncodingWorkflow::new(InMemoryApi::new(), config());
        workflow.run().await.unwrap();
        let calls = workflow.api().calls().await;

        let last = |kind| *position(&calls, kind).last().unwrap();
        let first = |kind| position(&calls, kind)[0];

        assert!(last(CallKind::RegisterOutput) < first(CallKind::CreateVideoConfiguration));
        assert!(last(CallKind::CreateAudioConfiguration) < first(CallKind::CreateEncoding));
        assert!(last(CallKind::CreateStream) < first(CallKind::CreateFmp4Muxing));
        assert!(last(CallKind::CreateFmp4Muxing) < first(CallKind::CreateTsMuxing));
        assert!(last(CallKind::CreateTsMuxing) < first(CallKind::StartEncoding));
        assert!(last(CallKind::StartEncoding) < first(CallKind::CreateDashManifest));
        assert!(last(CallKind::AddFmp4Representation) < first(CallKind::StartDashManifest));
        assert!(last(CallKind::StartDashManifest) < first(CallKind::CreateHlsManifest));
        assert!(last(CallKind::AddStreamInfo) < first(CallKind::StartHlsManifest));
        assert_eq!(calls.last().map(Call::kind), Some(CallKind::StartHlsManifest));
    }

    #[tokio::test]
    async fn test_streams_and_muxings_reference_run_resources() {
        let workflow = EncodingWorkflow::new(InMemoryApi::new(), config());
        let report = workflow.run().await.unwrap();
        let calls = workflow.api().calls().await;
        let encoding_id = &report.graph.encoding_id;

        for call in &calls {
            match call {
                Call::CreateStream {
                    encoding,
                    input,
                    input_path,
                    ..
                } => {
                    assert_eq!(input, &report.resources.input_id);
                    assert_eq!(input_path, "movie.mp4");
                    assert_eq!(encoding, encoding_id);
                }
                Call::CreateFmp4Muxing {
                    encoding,
                    streams,
                    output,
                    ..
                }
                | Call::CreateTsMuxing {
                    encoding,
                    streams,
                    output,
                    ..
                } => {
                    assert_eq!(encoding, encoding_id);
                    assert_eq!(output, &report.resources.output_id);
                    assert_eq!(streams.len(), 1);
                }
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn test_dash_representations_lead_with_audio() {
        let workflow = EncodingWorkflow::new(InMemoryApi::new(), config());
        let report = workflow.run().await.unwrap();
        let calls = workflow.api().calls().await;

        let representations: Vec<&str> = calls
            .iter()
            .filter_map(|call| match call {
                Call::AddFmp4Representation { segment_path, .. } => Some(segment_path.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            representations,
            vec![
                "audio/128000/fmp4",
                "video/1024_1500000/fmp4",
                "video/768_1000000/fmp4",
                "video/640_750000/fmp4",
            ]
        );

        let dash_path = calls.iter().find_map(|call| match call {
            Call::CreateDashManifest { path, id, .. } => Some((path.clone(), id.clone())),
            _ => None,
        });
        assert_eq!(dash_path, Some(("movie".to_string(), report.dash_manifest)));
    }

    #[tokio::test]
    async fn test_failure_on_third_fmp4_muxing_stops_run() {
        let api = InMemoryApi::new();
        api.fail_on(
            CallKind::CreateFmp4Muxing,
            3,
            ApiError::validation("segment length out of range"),
        )
        .await;
        let workflow = EncodingWorkflow::new(api, config());

        let err = workflow.run().await.unwrap_err();
        let calls = workflow.api().calls().await;

        assert_eq!(err.stage, Stage::EncodingGraph);
        assert_eq!(err.call, "create_fmp4_muxing");
        assert!(!err.is_retryable());
        assert!(position(&calls, CallKind::StartEncoding).is_empty());
        assert!(position(&calls, CallKind::CreateTsMuxing).is_empty());
        assert_eq!(position(&calls, CallKind::CreateFmp4Muxing).len(), 2);

        // input, output, 4 codec configs, encoding, 4 streams, 2 muxings
        assert_eq!(err.created.len(), 13);
        assert_eq!(err.created[0].kind, ResourceKind::Input);
        assert_eq!(err.created[12].kind, ResourceKind::Muxing);
        assert_eq!(
            err.to_string(),
            "encoding graph stage failed at create_fmp4_muxing: validation error: segment length out of range"
        );
    }

    #[tokio::test]
    async fn test_manifest_failure_reports_stage() {
        let api = InMemoryApi::new();
        api.fail_on(CallKind::StartHlsManifest, 1, ApiError::resource("service unavailable"))
            .await;
        let workflow = EncodingWorkflow::new(api, config());

        let err = workflow.run().await.unwrap_err();

        assert_eq!(err.stage, Stage::ManifestConstruction);
        assert_eq!(err.call, "start_hls_manifest");
        assert!(err.is_retryable());
        let calls = workflow.api().calls().await;
        assert_eq!(position(&calls, CallKind::StartDashManifest).len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_runs_create_fresh_resources() {
        let workflow = EncodingWorkflow::new(InMemoryApi::new(), config());
        let first = workflow.run().await.unwrap();
        let second = workflow.run().await.unwrap();

        let first_ids: HashSet<&str> = first.created.iter().map(|r| r.id.as_str()).collect();
        let second_ids: HashSet<&str> = second.created.iter().map(|r| r.id.as_str()).collect();
        assert!(first_ids.is_disjoint(&second_ids));
        assert_eq!(first.created.len(), second.created.len());
        assert_eq!(
            position(&workflow.api().calls().await, CallKind::CreateEncoding).len(),
            2
        );
    }

    #[tokio::test]
    async fn test_cloud_connect_with_prewarmed_pool() {
        let mut config = config();
        config.infrastructure = Infrastructure::CloudConnect {
            infrastructure_id: "infra-42".to_string(),
        };
        config.prewarmed_pool = Some(PrewarmedPoolConfig {
            encoder_version: "2.77.2".to_string(),
            disk_size: PrewarmedEncoderDiskSize::Gb500,
            target_pool_size: 1,
        });
        let workflow = EncodingWorkflow::new(InMemoryApi::new(), config);

        let report = workflow.run().await.unwrap();
        let calls = workflow.api().calls().await;

        assert!(report.graph.prewarmed_pool_id.is_some());
        assert!(
            position(&calls, CallKind::StartPrewarmedPool)[0]
                < position(&calls, CallKind::CreateEncoding)[0]
        );
        let region = calls.iter().find_map(|call| match call {
            Call::CreateEncoding { cloud_region, .. } => Some(cloud_region.clone()),
            _ => None,
        });
        assert_eq!(region.as_deref(), Some("EXTERNAL"));
    }

    #[tokio::test]
    async fn test_first_stage_failure_skips_everything_else() {
        let mut api = MockEncodingApi::new();
        api.expect_register_input()
            .times(1)
            .returning(|_| Err(ApiError::resource("401 unauthorized")));
        api.expect_register_output().times(0);
        api.expect_create_video_configuration().times(0);
        api.expect_create_encoding().times(0);

        let workflow = EncodingWorkflow::new(api, config());
        let err = workflow.run().await.unwrap_err();

        assert_eq!(err.stage, Stage::ResourceRegistration);
        assert_eq!(err.call, "register_input");
        assert!(err.created.is_empty());
    }

    #[tokio::test]
    async fn test_registration_requests_use_storage_settings() {
        let mut seq = Sequence::new();
        let mut api = MockEncodingApi::new();
        api.expect_register_input()
            .withf(|input| {
                input.name == "Inputs container in mediastore" && input.container == "inputs"
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(InputId::new("in-1")));
        api.expect_register_output()
            .withf(|output| output.container == "outputs")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(OutputId::new("out-1")));
        api.expect_create_video_configuration()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(ApiError::validation("bitrate too high")));

        let workflow = EncodingWorkflow::new(api, config());
        let err = workflow.run().await.unwrap_err();

        assert_eq!(err.stage, Stage::CodecConfiguration);
        assert_eq!(
            err.created,
            vec![
                CreatedResource {
                    kind: ResourceKind::Input,
                    id: "in-1".to_string(),
                },
                CreatedResource {
                    kind: ResourceKind::Output,
                    id: "out-1".to_string(),
                },
            ]
        );
    }
}
