//! GitHub API access.

pub mod client;

pub use client::{GitHubClient, GitHubConfig, RepoTarget};
