//! Domain model for image classification.
//!
//! Credentials, tokens and recognised labels are plain values; transport
//! details stay in the adapters.

mod credentials;
mod error;
mod label;
mod token;

pub use credentials::ClassifierCredentials;
pub use error::{ClassificationError, ClassificationResult};
pub use label::RecognizedLabel;
pub(crate) use label::rank_labels;
pub use token::{AccessToken, IssuedToken};
