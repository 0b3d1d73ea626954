//! Integration tests: the full fetch → normalize → screen → act path
//! wired with in-memory collaborators.

mod mock_collaborators;
mod scenarios;
