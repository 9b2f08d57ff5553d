pub mod bridge;
pub mod completion;
pub mod geocoder;
pub mod images;

pub mod mock;

pub use bridge::{connect_with_retry, ReconnectPolicy, SimBridgeFactory, SimBridgeTelemetry};
pub use completion::ChatCompletionProvider;
pub use geocoder::LocationIqGeocoder;
pub use images::CommonsImageSearch;
