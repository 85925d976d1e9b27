// Adapters layer: HTTP implementations of the domain ports.

pub mod gemini;
pub mod location;
pub mod places;

pub use gemini::GeminiClient;
pub use location::{resolver_from_config, GeocodedLocationResolver, IpLocationResolver};
pub use places::PlacesHospitalFinder;
