//! In-memory stand-in for the encoding service.
//!
//! Hands out UUID ids, records every accepted call in order, and rejects
//! dangling references the way the remote service would. Used by the CLI's
//! `--dry-run` mode and by the workflow tests. Failures can be injected on the
//! n-th attempt of any call kind.

use crate::domain::ids::{
    AdaptationSetId, CodecConfigId, EncodingId, InputId, ManifestId, MuxingId, OutputId, PeriodId,
    PrewarmedPoolId, RemoteId, StreamId, StreamInfoId,
};
use crate::domain::resources::{
    AacAudioConfiguration, AudioAdaptationSet, AudioMediaInfo, AzureInput, AzureOutput,
    DashFmp4Representation, DashManifest, Encoding, EncodingOutput, Fmp4Muxing,
    H264VideoConfiguration, HlsManifest, MuxingStream, PrewarmedEncoderPool, Stream, StreamInfo,
    TsMuxing,
};
use crate::ports::{ApiError, EncodingApi};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Discriminant of [`Call`], used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    RegisterInput,
    RegisterOutput,
    CreateVideoConfiguration,
    CreateAudioConfiguration,
    CreatePrewarmedPool,
    StartPrewarmedPool,
    CreateEncoding,
    CreateStream,
    CreateFmp4Muxing,
    CreateTsMuxing,
    StartEncoding,
    CreateDashManifest,
    CreatePeriod,
    CreateVideoAdaptationSet,
    CreateAudioAdaptationSet,
    AddFmp4Representation,
    StartDashManifest,
    CreateHlsManifest,
    AddAudioMedia,
    AddStreamInfo,
    StartHlsManifest,
}

/// One accepted call, with the references it carried and the id it produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    RegisterInput {
        id: InputId,
    },
    RegisterOutput {
        id: OutputId,
    },
    CreateVideoConfiguration {
        id: CodecConfigId,
        bitrate: u64,
        width: u32,
    },
    CreateAudioConfiguration {
        id: CodecConfigId,
        bitrate: u64,
    },
    CreatePrewarmedPool {
        id: PrewarmedPoolId,
    },
    StartPrewarmedPool {
        pool: PrewarmedPoolId,
    },
    CreateEncoding {
        id: EncodingId,
        cloud_region: String,
    },
    CreateStream {
        encoding: EncodingId,
        id: StreamId,
        input: InputId,
        input_path: String,
        config: CodecConfigId,
    },
    CreateFmp4Muxing {
        encoding: EncodingId,
        id: MuxingId,
        streams: Vec<StreamId>,
        output: OutputId,
        path: String,
    },
    CreateTsMuxing {
        encoding: EncodingId,
        id: MuxingId,
        streams: Vec<StreamId>,
        output: OutputId,
        path: String,
    },
    StartEncoding {
        encoding: EncodingId,
    },
    CreateDashManifest {
        id: ManifestId,
        output: OutputId,
        path: String,
    },
    CreatePeriod {
        manifest: ManifestId,
        id: PeriodId,
    },
    CreateVideoAdaptationSet {
        manifest: ManifestId,
        id: AdaptationSetId,
    },
    CreateAudioAdaptationSet {
        manifest: ManifestId,
        id: AdaptationSetId,
        lang: String,
    },
    AddFmp4Representation {
        manifest: ManifestId,
        adaptation_set: AdaptationSetId,
        encoding: EncodingId,
        muxing: MuxingId,
        segment_path: String,
    },
    StartDashManifest {
        manifest: ManifestId,
    },
    CreateHlsManifest {
        id: ManifestId,
        output: OutputId,
        path: String,
    },
    AddAudioMedia {
        manifest: ManifestId,
        group_id: String,
        encoding: EncodingId,
        stream: StreamId,
        muxing: MuxingId,
    },
    AddStreamInfo {
        manifest: ManifestId,
        id: StreamInfoId,
        audio_group: String,
        encoding: EncodingId,
        stream: StreamId,
        muxing: MuxingId,
        uri: String,
    },
    StartHlsManifest {
        manifest: ManifestId,
    },
}

impl Call {
    pub fn kind(&self) -> CallKind {
        match self {
            Call::RegisterInput { .. } => CallKind::RegisterInput,
            Call::RegisterOutput { .. } => CallKind::RegisterOutput,
            Call::CreateVideoConfiguration { .. } => CallKind::CreateVideoConfiguration,
            Call::CreateAudioConfiguration { .. } => CallKind::CreateAudioConfiguration,
            Call::CreatePrewarmedPool { .. } => CallKind::CreatePrewarmedPool,
            Call::StartPrewarmedPool { .. } => CallKind::StartPrewarmedPool,
            Call::CreateEncoding { .. } => CallKind::CreateEncoding,
            Call::CreateStream { .. } => CallKind::CreateStream,
            Call::CreateFmp4Muxing { .. } => CallKind::CreateFmp4Muxing,
            Call::CreateTsMuxing { .. } => CallKind::CreateTsMuxing,
            Call::StartEncoding { .. } => CallKind::StartEncoding,
            Call::CreateDashManifest { .. } => CallKind::CreateDashManifest,
            Call::CreatePeriod { .. } => CallKind::CreatePeriod,
            Call::CreateVideoAdaptationSet { .. } => CallKind::CreateVideoAdaptationSet,
            Call::CreateAudioAdaptationSet { .. } => CallKind::CreateAudioAdaptationSet,
            Call::AddFmp4Representation { .. } => CallKind::AddFmp4Representation,
            Call::StartDashManifest { .. } => CallKind::StartDashManifest,
            Call::CreateHlsManifest { .. } => CallKind::CreateHlsManifest,
            Call::AddAudioMedia { .. } => CallKind::AddAudioMedia,
            Call::AddStreamInfo { .. } => CallKind::AddStreamInfo,
            Call::StartHlsManifest { .. } => CallKind::StartHlsManifest,
        }
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Call::RegisterInput { id } => write!(f, "register input -> {id}"),
            Call::RegisterOutput { id } => write!(f, "register output -> {id}"),
            Call::CreateVideoConfiguration { id, bitrate, width } => {
                write!(f, "create H264 config {width}px @ {bitrate} -> {id}")
            }
            Call::CreateAudioConfiguration { id, bitrate } => {
                write!(f, "create AAC config @ {bitrate} -> {id}")
            }
            Call::CreatePrewarmedPool { id } => write!(f, "create pre-warmed pool -> {id}"),
            Call::StartPrewarmedPool { pool } => write!(f, "start pre-warmed pool {pool}"),
            Call::CreateEncoding { id, cloud_region } => {
                write!(f, "create encoding in {cloud_region} -> {id}")
            }
            Call::CreateStream { id, config, .. } => {
                write!(f, "create stream for config {config} -> {id}")
            }
            Call::CreateFmp4Muxing { id, path, .. } => {
                write!(f, "create fMP4 muxing at {path} -> {id}")
            }
            Call::CreateTsMuxing { id, path, .. } => write!(f, "create TS muxing at {path} -> {id}"),
            Call::StartEncoding { encoding } => write!(f, "start encoding {encoding}"),
            Call::CreateDashManifest { id, path, .. } => {
                write!(f, "create DASH manifest at {path} -> {id}")
            }
            Call::CreatePeriod { id, .. } => write!(f, "create period -> {id}"),
            Call::CreateVideoAdaptationSet { id, .. } => {
                write!(f, "create video adaptation set -> {id}")
            }
            Call::CreateAudioAdaptationSet { id, lang, .. } => {
                write!(f, "create audio adaptation set ({lang}) -> {id}")
            }
            Call::AddFmp4Representation {
                muxing,
                segment_path,
                ..
            } => write!(f, "add fMP4 representation {segment_path} (muxing {muxing})"),
            Call::StartDashManifest { manifest } => write!(f, "start DASH manifest {manifest}"),
            Call::CreateHlsManifest { id, path, .. } => {
                write!(f, "create HLS manifest at {path} -> {id}")
            }
            Call::AddAudioMedia {
                group_id, muxing, ..
            } => write!(f, "add audio media in {group_id} (muxing {muxing})"),
            Call::AddStreamInfo { id, uri, .. } => write!(f, "add stream info {uri} -> {id}"),
            Call::StartHlsManifest { manifest } => write!(f, "start HLS manifest {manifest}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Dash,
    Hls,
}

#[derive(Debug)]
struct ManifestState {
    family: Family,
    started: bool,
    encoding: Option<EncodingId>,
    audio_groups: HashSet<String>,
}

#[derive(Debug)]
struct MuxingState {
    encoding: EncodingId,
    streams: Vec<StreamId>,
}

#[derive(Debug, Default)]
struct State {
    inputs: HashSet<InputId>,
    outputs: HashSet<OutputId>,
    configs: HashSet<CodecConfigId>,
    pools: HashSet<PrewarmedPoolId>,
    encodings: HashMap<EncodingId, bool>,
    streams: HashMap<StreamId, EncodingId>,
    muxings: HashMap<MuxingId, MuxingState>,
    muxing_paths: HashSet<(OutputId, String)>,
    manifests: HashMap<ManifestId, ManifestState>,
    periods: HashMap<PeriodId, ManifestId>,
    adaptation_sets: HashMap<AdaptationSetId, (ManifestId, PeriodId)>,
    attempts: HashMap<CallKind, usize>,
    failures: HashMap<(CallKind, usize), ApiError>,
    log: Vec<Call>,
}

#[derive(Debug, Default)]
pub struct InMemoryApi {
    state: Mutex<State>,
}

impl InMemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `nth` attempt (1-based) of `kind` fail with `error`.
    pub async fn fail_on(&self, kind: CallKind, nth: usize, error: ApiError) {
        self.state.lock().await.failures.insert((kind, nth), error);
    }

    /// Accepted calls in the order they were made.
    pub async fn calls(&self) -> Vec<Call> {
        self.state.lock().await.log.clone()
    }
}

fn generate<I: RemoteId>() -> I {
    I::from(Uuid::new_v4().to_string())
}

fn missing(kind: &str, id: &impl fmt::Display) -> ApiError {
    ApiError::validation(format!("{kind} {id} does not exist"))
}

impl State {
    /// Count the attempt and return an injected failure, if any.
    fn attempt(&mut self, kind: CallKind) -> Result<(), ApiError> {
        let count = self.attempts.entry(kind).or_insert(0);
        *count += 1;
        match self.failures.remove(&(kind, *count)) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn check_output(&self, output: &EncodingOutput) -> Result<(), ApiError> {
        if !self.outputs.contains(&output.output_id) {
            return Err(missing("output", &output.output_id));
        }
        Ok(())
    }

    fn check_open_encoding(&self, encoding: &EncodingId) -> Result<(), ApiError> {
        match self.encodings.get(encoding) {
            None => Err(missing("encoding", encoding)),
            Some(true) => Err(ApiError::validation(format!(
                "encoding {encoding} has already been started"
            ))),
            Some(false) => Ok(()),
        }
    }

    fn register_muxing(
        &mut self,
        encoding: &EncodingId,
        streams: &[MuxingStream],
        outputs: &[EncodingOutput],
    ) -> Result<(MuxingId, Vec<StreamId>, OutputId, String), ApiError> {
        self.check_open_encoding(encoding)?;
        if streams.is_empty() {
            return Err(ApiError::validation("muxing must reference a stream"));
        }
        for muxing_stream in streams {
            match self.streams.get(&muxing_stream.stream_id) {
                None => return Err(missing("stream", &muxing_stream.stream_id)),
                Some(owner) if owner != encoding => {
                    return Err(ApiError::validation(format!(
                        "stream {} belongs to encoding {owner}, not {encoding}",
                        muxing_stream.stream_id
                    )))
                }
                Some(_) => {}
            }
        }
        let output = outputs
            .first()
            .ok_or_else(|| ApiError::validation("muxing must have an output"))?;
        self.check_output(output)?;

        let key = (output.output_id.clone(), output.output_path.clone());
        if self.muxing_paths.contains(&key) {
            return Err(ApiError::validation(format!(
                "output path {} is already used by another muxing",
                output.output_path
            )));
        }
        self.muxing_paths.insert(key);

        let id: MuxingId = generate();
        let stream_ids: Vec<StreamId> = streams.iter().map(|s| s.stream_id.clone()).collect();
        self.muxings.insert(
            id.clone(),
            MuxingState {
                encoding: encoding.clone(),
                streams: stream_ids.clone(),
            },
        );
        Ok((id, stream_ids, output.output_id.clone(), output.output_path.clone()))
    }

    fn register_manifest(
        &mut self,
        family: Family,
        outputs: &[EncodingOutput],
    ) -> Result<(ManifestId, OutputId, String), ApiError> {
        let output = outputs
            .first()
            .ok_or_else(|| ApiError::validation("manifest must have an output"))?;
        self.check_output(output)?;

        let id: ManifestId = generate();
        self.manifests.insert(
            id.clone(),
            ManifestState {
                family,
                started: false,
                encoding: None,
                audio_groups: HashSet::new(),
            },
        );
        Ok((id, output.output_id.clone(), output.output_path.clone()))
    }

    fn open_manifest(
        &mut self,
        manifest: &ManifestId,
        family: Family,
    ) -> Result<&mut ManifestState, ApiError> {
        let state = self
            .manifests
            .get_mut(manifest)
            .ok_or_else(|| missing("manifest", manifest))?;
        if state.family != family {
            return Err(ApiError::validation(format!(
                "manifest {manifest} is not a {family:?} manifest"
            )));
        }
        if state.started {
            return Err(ApiError::validation(format!(
                "manifest {manifest} has already been started"
            )));
        }
        Ok(state)
    }

    /// A manifest child must point at an existing muxing of the manifest's encoding.
    fn bind_muxing(
        &mut self,
        manifest: &ManifestId,
        family: Family,
        encoding: &EncodingId,
        muxing: &MuxingId,
        stream: Option<&StreamId>,
    ) -> Result<(), ApiError> {
        let muxing_state = self
            .muxings
            .get(muxing)
            .ok_or_else(|| missing("muxing", muxing))?;
        if &muxing_state.encoding != encoding {
            return Err(ApiError::validation(format!(
                "muxing {muxing} does not belong to encoding {encoding}"
            )));
        }
        if let Some(stream) = stream {
            if !muxing_state.streams.contains(stream) {
                return Err(ApiError::validation(format!(
                    "stream {stream} is not part of muxing {muxing}"
                )));
            }
        }

        let state = self.open_manifest(manifest, family)?;
        match &state.encoding {
            Some(bound) if bound != encoding => Err(ApiError::validation(format!(
                "manifest {manifest} already references encoding {bound}"
            ))),
            Some(_) => Ok(()),
            None => {
                state.encoding = Some(encoding.clone());
                Ok(())
            }
        }
    }

    fn start_manifest(&mut self, manifest: &ManifestId, family: Family) -> Result<(), ApiError> {
        let state = self.open_manifest(manifest, family)?;
        if state.encoding.is_none() {
            return Err(ApiError::validation(format!(
                "manifest {manifest} has no representations"
            )));
        }
        state.started = true;
        Ok(())
    }
}

#[async_trait]
impl EncodingApi for InMemoryApi {
    async fn register_input(&self, _input: AzureInput) -> Result<InputId, ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::RegisterInput)?;
        let id: InputId = generate();
        state.inputs.insert(id.clone());
        state.log.push(Call::RegisterInput { id: id.clone() });
        Ok(id)
    }

    async fn register_output(&self, _output: AzureOutput) -> Result<OutputId, ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::RegisterOutput)?;
        let id: OutputId = generate();
        state.outputs.insert(id.clone());
        state.log.push(Call::RegisterOutput { id: id.clone() });
        Ok(id)
    }

    async fn create_video_configuration(
        &self,
        config: H264VideoConfiguration,
    ) -> Result<CodecConfigId, ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::CreateVideoConfiguration)?;
        let id: CodecConfigId = generate();
        state.configs.insert(id.clone());
        state.log.push(Call::CreateVideoConfiguration {
            id: id.clone(),
            bitrate: config.bitrate,
            width: config.width,
        });
        Ok(id)
    }

    async fn create_audio_configuration(
        &self,
        config: AacAudioConfiguration,
    ) -> Result<CodecConfigId, ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::CreateAudioConfiguration)?;
        let id: CodecConfigId = generate();
        state.configs.insert(id.clone());
        state.log.push(Call::CreateAudioConfiguration {
            id: id.clone(),
            bitrate: config.bitrate,
        });
        Ok(id)
    }

    async fn create_prewarmed_pool(
        &self,
        _pool: PrewarmedEncoderPool,
    ) -> Result<PrewarmedPoolId, ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::CreatePrewarmedPool)?;
        let id: PrewarmedPoolId = generate();
        state.pools.insert(id.clone());
        state.log.push(Call::CreatePrewarmedPool { id: id.clone() });
        Ok(id)
    }

    async fn start_prewarmed_pool(&self, pool: &PrewarmedPoolId) -> Result<(), ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::StartPrewarmedPool)?;
        if !state.pools.contains(pool) {
            return Err(missing("pre-warmed pool", pool));
        }
        state.log.push(Call::StartPrewarmedPool { pool: pool.clone() });
        Ok(())
    }

    async fn create_encoding(&self, encoding: Encoding) -> Result<EncodingId, ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::CreateEncoding)?;
        let id: EncodingId = generate();
        state.encodings.insert(id.clone(), false);
        state.log.push(Call::CreateEncoding {
            id: id.clone(),
            cloud_region: encoding.cloud_region.to_string(),
        });
        Ok(id)
    }

    async fn create_stream(
        &self,
        encoding: &EncodingId,
        stream: Stream,
    ) -> Result<StreamId, ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::CreateStream)?;
        state.check_open_encoding(encoding)?;
        if !state.configs.contains(&stream.codec_config_id) {
            return Err(missing("codec configuration", &stream.codec_config_id));
        }
        let input = stream
            .input_streams
            .first()
            .ok_or_else(|| ApiError::validation("stream must have an input stream"))?;
        if !state.inputs.contains(&input.input_id) {
            return Err(missing("input", &input.input_id));
        }

        let id: StreamId = generate();
        state.streams.insert(id.clone(), encoding.clone());
        state.log.push(Call::CreateStream {
            encoding: encoding.clone(),
            id: id.clone(),
            input: input.input_id.clone(),
            input_path: input.input_path.clone(),
            config: stream.codec_config_id.clone(),
        });
        Ok(id)
    }

    async fn create_fmp4_muxing(
        &self,
        encoding: &EncodingId,
        muxing: Fmp4Muxing,
    ) -> Result<MuxingId, ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::CreateFmp4Muxing)?;
        let (id, streams, output, path) =
            state.register_muxing(encoding, &muxing.streams, &muxing.outputs)?;
        state.log.push(Call::CreateFmp4Muxing {
            encoding: encoding.clone(),
            id: id.clone(),
            streams,
            output,
            path,
        });
        Ok(id)
    }

    async fn create_ts_muxing(
        &self,
        encoding: &EncodingId,
        muxing: TsMuxing,
    ) -> Result<MuxingId, ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::CreateTsMuxing)?;
        let (id, streams, output, path) =
            state.register_muxing(encoding, &muxing.streams, &muxing.outputs)?;
        state.log.push(Call::CreateTsMuxing {
            encoding: encoding.clone(),
            id: id.clone(),
            streams,
            output,
            path,
        });
        Ok(id)
    }

    async fn start_encoding(&self, encoding: &EncodingId) -> Result<(), ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::StartEncoding)?;
        state.check_open_encoding(encoding)?;
        if !state.streams.values().any(|owner| owner == encoding) {
            return Err(ApiError::validation(format!(
                "encoding {encoding} has no streams"
            )));
        }
        state.encodings.insert(encoding.clone(), true);
        state.log.push(Call::StartEncoding {
            encoding: encoding.clone(),
        });
        Ok(())
    }

    async fn create_dash_manifest(&self, manifest: DashManifest) -> Result<ManifestId, ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::CreateDashManifest)?;
        let (id, output, path) = state.register_manifest(Family::Dash, &manifest.outputs)?;
        state.log.push(Call::CreateDashManifest {
            id: id.clone(),
            output,
            path,
        });
        Ok(id)
    }

    async fn create_period(&self, manifest: &ManifestId) -> Result<PeriodId, ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::CreatePeriod)?;
        state.open_manifest(manifest, Family::Dash)?;
        let id: PeriodId = generate();
        state.periods.insert(id.clone(), manifest.clone());
        state.log.push(Call::CreatePeriod {
            manifest: manifest.clone(),
            id: id.clone(),
        });
        Ok(id)
    }

    async fn create_video_adaptation_set(
        &self,
        manifest: &ManifestId,
        period: &PeriodId,
    ) -> Result<AdaptationSetId, ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::CreateVideoAdaptationSet)?;
        let id = add_adaptation_set(&mut state, manifest, period)?;
        state.log.push(Call::CreateVideoAdaptationSet {
            manifest: manifest.clone(),
            id: id.clone(),
        });
        Ok(id)
    }

    async fn create_audio_adaptation_set(
        &self,
        manifest: &ManifestId,
        period: &PeriodId,
        adaptation_set: AudioAdaptationSet,
    ) -> Result<AdaptationSetId, ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::CreateAudioAdaptationSet)?;
        let id = add_adaptation_set(&mut state, manifest, period)?;
        state.log.push(Call::CreateAudioAdaptationSet {
            manifest: manifest.clone(),
            id: id.clone(),
            lang: adaptation_set.lang,
        });
        Ok(id)
    }

    async fn add_fmp4_representation(
        &self,
        manifest: &ManifestId,
        period: &PeriodId,
        adaptation_set: &AdaptationSetId,
        representation: DashFmp4Representation,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::AddFmp4Representation)?;
        match state.adaptation_sets.get(adaptation_set) {
            Some((owner, owner_period)) if owner == manifest && owner_period == period => {}
            _ => return Err(missing("adaptation set", adaptation_set)),
        }
        state.bind_muxing(
            manifest,
            Family::Dash,
            &representation.encoding_id,
            &representation.muxing_id,
            None,
        )?;
        state.log.push(Call::AddFmp4Representation {
            manifest: manifest.clone(),
            adaptation_set: adaptation_set.clone(),
            encoding: representation.encoding_id,
            muxing: representation.muxing_id,
            segment_path: representation.segment_path,
        });
        Ok(())
    }

    async fn start_dash_manifest(&self, manifest: &ManifestId) -> Result<(), ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::StartDashManifest)?;
        state.start_manifest(manifest, Family::Dash)?;
        state.log.push(Call::StartDashManifest {
            manifest: manifest.clone(),
        });
        Ok(())
    }

    async fn create_hls_manifest(&self, manifest: HlsManifest) -> Result<ManifestId, ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::CreateHlsManifest)?;
        let (id, output, path) = state.register_manifest(Family::Hls, &manifest.outputs)?;
        state.log.push(Call::CreateHlsManifest {
            id: id.clone(),
            output,
            path,
        });
        Ok(id)
    }

    async fn add_audio_media(
        &self,
        manifest: &ManifestId,
        media: AudioMediaInfo,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::AddAudioMedia)?;
        state.bind_muxing(
            manifest,
            Family::Hls,
            &media.encoding_id,
            &media.muxing_id,
            Some(&media.stream_id),
        )?;
        state
            .open_manifest(manifest, Family::Hls)?
            .audio_groups
            .insert(media.group_id.clone());
        state.log.push(Call::AddAudioMedia {
            manifest: manifest.clone(),
            group_id: media.group_id,
            encoding: media.encoding_id,
            stream: media.stream_id,
            muxing: media.muxing_id,
        });
        Ok(())
    }

    async fn add_stream_info(
        &self,
        manifest: &ManifestId,
        stream_info: StreamInfo,
    ) -> Result<StreamInfoId, ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::AddStreamInfo)?;
        state.bind_muxing(
            manifest,
            Family::Hls,
            &stream_info.encoding_id,
            &stream_info.muxing_id,
            Some(&stream_info.stream_id),
        )?;
        let known_group = state
            .open_manifest(manifest, Family::Hls)?
            .audio_groups
            .contains(&stream_info.audio);
        if !known_group {
            return Err(ApiError::validation(format!(
                "audio group {} is not defined in manifest {manifest}",
                stream_info.audio
            )));
        }

        let id: StreamInfoId = generate();
        state.log.push(Call::AddStreamInfo {
            manifest: manifest.clone(),
            id: id.clone(),
            audio_group: stream_info.audio,
            encoding: stream_info.encoding_id,
            stream: stream_info.stream_id,
            muxing: stream_info.muxing_id,
            uri: stream_info.uri,
        });
        Ok(id)
    }

    async fn start_hls_manifest(&self, manifest: &ManifestId) -> Result<(), ApiError> {
        let mut state = self.state.lock().await;
        state.attempt(CallKind::StartHlsManifest)?;
        state.start_manifest(manifest, Family::Hls)?;
        state.log.push(Call::StartHlsManifest {
            manifest: manifest.clone(),
        });
        Ok(())
    }
}

fn add_adaptation_set(
    state: &mut State,
    manifest: &ManifestId,
    period: &PeriodId,
) -> Result<AdaptationSetId, ApiError> {
    state.open_manifest(manifest, Family::Dash)?;
    if state.periods.get(period) != Some(manifest) {
        return Err(missing("period", period));
    }
    let id: AdaptationSetId = generate();
    state
        .adaptation_sets
        .insert(id.clone(), (manifest.clone(), period.clone()));
    Ok(id)
}
