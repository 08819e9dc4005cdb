//! SmugMug v2 payloads. Every endpoint wraps its body in `{"Response": ...}`.

use serde::Deserialize;

use crate::models::{CommentRecord, CommentSource};

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "Response")]
    pub response: T,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nick_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserResponse {
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Album {
    pub album_key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image_count: u64,
    #[serde(default)]
    pub web_uri: Option<String>,
}

impl Album {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or("Untitled")
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlbumsResponse {
    #[serde(default)]
    pub album: Vec<Album>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlbumImage {
    pub image_key: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlbumImagesResponse {
    #[serde(default)]
    pub album_image: Vec<AlbumImage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Comment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub date: Option<String>,
}

impl Comment {
    pub fn author(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or("Anonymous")
    }
}

impl From<Comment> for CommentRecord {
    fn from(comment: Comment) -> Self {
        CommentRecord {
            author: comment.author().to_string(),
            timestamp: comment.date.filter(|d| !d.is_empty()),
            text: comment.text,
            source: CommentSource::Api,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommentsResponse {
    #[serde(default)]
    pub comment: Vec<Comment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Image {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageResponse {
    #[serde(default)]
    pub image: Option<Image>,
}
