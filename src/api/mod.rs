mod download;
mod fetcher;
mod registry;

pub use self::download::{Blob, Download};
pub use self::fetcher::{Fetcher, HttpFetcher};
pub use self::registry::{Registry, LAYOUT_VERSION, MAX_JSON_SIZE};
