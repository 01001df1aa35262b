//! Jobdeck client: HTTP command API, event feed and the runtime that executes effects.
mod api;
mod feed;
mod handle;
mod persist;
mod types;

pub use api::{ClientSettings, CommandApi, ReqwestCommandApi};
pub use feed::{
    decode_event, decode_payload, decode_socket_packet, EnginePacket, EventFeed, EventSink,
    SocketPacket,
};
pub use handle::{ApiRequest, ClientCommand, ClientHandle};
pub use persist::{default_artifact_name, ensure_output_dir, AtomicFileWriter, PersistError};
pub use types::{
    ApiError, Artifact, ClientEvent, FailureKind, FeedEvent, ItemSummary, ItemUpdate,
    JobDetailReply, JobId, JobSummary, JobUpdate, StatsReply, TimerId, UploadOptions,
    UploadReply,
};
