//! gramflow-extract — carousel extraction and dedup engine.
//!
//! Given a post id, decides single-vs-carousel, drives a browser session
//! through every carousel position with fallback interaction strategies,
//! collects candidate image URLs along the way, and collapses them into the
//! ordered set of unique full-resolution images belonging to that post.

pub mod dategroup;
pub mod detector;
pub mod extractor;
pub mod fetcher;
pub mod hashing;
pub mod navigation;
pub mod scanner;
pub mod scoring;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use dategroup::BucketPolicy;
pub use extractor::{CarouselExtractor, ExtractionFailure, ExtractorConfig};
pub use fetcher::{HttpImageFetcher, ImageFetcher};
pub use session::{BrowserSession, PageState, WebDriverBrowser};
