pub mod client;
pub mod error;
pub mod normalize;
pub(crate) mod retry;
pub mod types;

pub use client::PlacesClient;
pub use error::PlacesError;
pub use normalize::{display_name, normalize_place};
pub use types::{Place, SearchRequest, SearchResponse, SortOrder};
