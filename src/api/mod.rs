//! REST path: OAuth 1.0a signed access to the SmugMug v2 API.

pub mod client;
pub mod oauth;
pub mod types;

pub use client::SmugMugClient;
pub use oauth::OAuth1Signer;
pub use types::{Album, AlbumImage, Comment, Image, User};
