//! Application services for image classification.

mod client;

pub use client::ClassificationClient;
