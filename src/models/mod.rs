mod coordinate;
mod image;
mod operation;
mod snapshot;

pub use coordinate::{
    round_altitude, round_degrees, Coordinate, RangeError, LATITUDE_LIMIT, LONGITUDE_LIMIT,
};
pub use image::{
    format_file_size, ImageId, ImageRecord, LocationSource, LocationState, RawFile,
};
pub use operation::{OutputMode, WriteOutcome, WriteSummary};
pub use snapshot::{
    BatchExport, BatchSnapshot, BatchStatus, ExportMetadata, ExportedImage, PayloadImage,
    SinkPayload, SnapshotEntry, EXPORT_VERSION,
};
