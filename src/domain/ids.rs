//! Typed identifiers for remote resources.
//!
//! The encoding service hands back an opaque string id for every resource it
//! creates. Each kind gets its own newtype so a stream id can never be passed
//! where a muxing id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of remote resource, used when reporting what a run left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Input,
    Output,
    CodecConfiguration,
    PrewarmedPool,
    Encoding,
    Stream,
    Muxing,
    Manifest,
    Period,
    AdaptationSet,
    StreamInfo,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Input => "input",
            ResourceKind::Output => "output",
            ResourceKind::CodecConfiguration => "codec configuration",
            ResourceKind::PrewarmedPool => "pre-warmed encoder pool",
            ResourceKind::Encoding => "encoding",
            ResourceKind::Stream => "stream",
            ResourceKind::Muxing => "muxing",
            ResourceKind::Manifest => "manifest",
            ResourceKind::Period => "period",
            ResourceKind::AdaptationSet => "adaptation set",
            ResourceKind::StreamInfo => "stream info",
        };
        f.write_str(name)
    }
}

/// An id returned by the remote service.
pub trait RemoteId: fmt::Display + From<String> {
    const KIND: ResourceKind;

    fn as_str(&self) -> &str;
}

macro_rules! remote_id {
    ($(#[$meta:meta])* $name:ident => $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl RemoteId for $name {
            const KIND: ResourceKind = ResourceKind::$kind;

            fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}

remote_id!(InputId => Input);
remote_id!(OutputId => Output);
remote_id!(
    /// Id of a video or audio codec configuration.
    CodecConfigId => CodecConfiguration
);
remote_id!(PrewarmedPoolId => PrewarmedPool);
remote_id!(EncodingId => Encoding);
remote_id!(StreamId => Stream);
remote_id!(
    /// Id of an fMP4 or TS muxing. Both families share one id space.
    MuxingId => Muxing
);
remote_id!(
    /// Id of a DASH or HLS manifest.
    ManifestId => Manifest
);
remote_id!(PeriodId => Period);
remote_id!(AdaptationSetId => AdaptationSet);
remote_id!(StreamInfoId => StreamInfo);
