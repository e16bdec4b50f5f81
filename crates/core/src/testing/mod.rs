//! Test doubles shared by unit and integration tests.

mod mock_extractor;

pub use mock_extractor::{MockExtractor, MockOutcome};
