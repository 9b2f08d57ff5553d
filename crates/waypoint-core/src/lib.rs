pub mod capability;
pub mod content;
pub mod errors;
pub mod ids;
pub mod messages;
pub mod place;

pub use capability::{
    CompletionProvider, Geocoder, ImageSearch, TelemetryFactory, TelemetrySource, LATITUDE_FIELD,
    LONGITUDE_FIELD,
};
pub use content::{ContentItem, EnrichedFact};
pub use errors::{ServiceError, TelemetryError};
pub use ids::{CycleId, SessionId};
pub use messages::{InboundMessage, OutboundMessage};
pub use place::{Address, Place, Position};
