use reqwest::Url;
use std::collections::HashSet;
use serde::de::DeserializeOwned;

use super::oauth::OAuth1Signer;
use super::types::{
    Album, AlbumImage, AlbumImagesResponse, AlbumsResponse, Comment, CommentsResponse, Envelope,
    Image, ImageResponse, User, UserResponse,
};
use crate::config::{ApiConfig, Credentials};
use crate::gallery::ReviewerMatcher;
use crate::http_client::{ApiError, ApiHttpClient};
use crate::models::{CommentRecord, ScanResult};
use crate::report::ResultSink;

/// Serial appended to image keys; the API addresses images as `<key>-<serial>`
const DEFAULT_SERIAL: u32 = 0;

/// SmugMug v2 REST client.
///
/// Listing calls log failures and return empty data, so one bad call ends a
/// walk early instead of aborting the run.
pub struct SmugMugClient {
    http: ApiHttpClient,
    base_url: String,
    nickname: String,
    page_size: usize,
}

impl SmugMugClient {
    pub fn new(config: &ApiConfig, credentials: Credentials) -> Result<Self, ApiError> {
        let http = ApiHttpClient::with_config(config.http_client_config())?
            .with_signer(OAuth1Signer::new(credentials));
        Ok(Self::with_http(http, config))
    }

    /// Use a prepared HTTP client, e.g. one without signing
    pub fn with_http(http: ApiHttpClient, config: &ApiConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            nickname: config.nickname.clone(),
            page_size: config.page_size.max(1),
        }
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, ApiError> {
        let raw = format!("{}{}", self.base_url, path);
        let mut url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if !params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T, ApiError> {
        let url = self.url(path, params)?;
        log::debug!("GET {}", url);
        let envelope: Envelope<T> = self.http.get_json(&url).await?;
        Ok(envelope.response)
    }

    /// The user the OAuth token belongs to
    pub async fn authenticated_user(&self) -> Result<User, ApiError> {
        let response: UserResponse = self.fetch("!authuser", &[]).await?;
        response
            .user
            .ok_or_else(|| ApiError::MissingResponse("!authuser".to_string()))
    }

    pub async fn get_user(&self) -> Option<User> {
        let path = format!("/user/{}", self.nickname);
        match self.fetch::<UserResponse>(&path, &[]).await {
            Ok(response) => response.user,
            Err(e) => {
                log::error!("Error making request to {}: {}", path, e);
                None
            }
        }
    }

    pub async fn get_user_albums(&self) -> Vec<Album> {
        log::info!("Fetching albums for {}...", self.nickname);

        if self.get_user().await.is_none() {
            log::error!("Failed to get user information");
            return Vec::new();
        }

        let path = format!("/user/{}!albums", self.nickname);
        match self.fetch::<AlbumsResponse>(&path, &[]).await {
            Ok(response) => response.album,
            Err(e) => {
                log::error!("Failed to fetch albums: {}", e);
                Vec::new()
            }
        }
    }

    /// Page through an album `page_size` images at a time. A page shorter
    /// than requested, or one repeating images already seen, is the last.
    pub async fn get_album_images(&self, album_key: &str) -> Vec<AlbumImage> {
        self.page_album_images(album_key, None).await
    }

    /// Also stops when a full page brings no new image, or once `limit`
    /// images (the album's reported count) are in.
    async fn page_album_images(&self, album_key: &str, limit: Option<usize>) -> Vec<AlbumImage> {
        let path = format!("/album/{}!images", album_key);
        let mut images = Vec::new();
        let mut seen = HashSet::new();
        let mut start = 1;

        loop {
            let params = [("start", start.to_string()), ("count", self.page_size.to_string())];
            let batch = match self.fetch::<AlbumImagesResponse>(&path, &params).await {
                Ok(response) => response.album_image,
                Err(e) => {
                    log::error!("Error fetching images {}..: {}", start, e);
                    break;
                }
            };

            let fetched = batch.len();
            let before = images.len();
            images.extend(batch.into_iter().filter(|image| seen.insert(image.image_key.clone())));

            if fetched < self.page_size {
                break;
            }
            if images.len() == before {
                log::warn!("Page at {} repeated earlier images, stopping", start);
                break;
            }
            if limit.is_some_and(|limit| images.len() >= limit) {
                break;
            }
            start += self.page_size;
        }

        log::info!("Found {} images in album", images.len());
        images
    }

    pub async fn get_image_comments(&self, image_key: &str) -> Vec<Comment> {
        let path = format!("/image/{}-{}!comments", image_key, DEFAULT_SERIAL);
        match self.fetch::<CommentsResponse>(&path, &[]).await {
            Ok(response) => response.comment,
            Err(e) => {
                log::warn!("Error fetching comments for {}: {}", image_key, e);
                Vec::new()
            }
        }
    }

    pub async fn get_image_details(&self, image_key: &str) -> Option<Image> {
        let path = format!("/image/{}-{}", image_key, DEFAULT_SERIAL);
        match self.fetch::<ImageResponse>(&path, &[]).await {
            Ok(response) => response.image,
            Err(e) => {
                log::warn!("Error fetching details for {}: {}", image_key, e);
                None
            }
        }
    }

    /// Find every commented image in `album`, recording each one to `sink`
    /// as it is found.
    ///
    /// With a `reviewer`, only comments whose author matches count.
    pub async fn process_album_for_comments(
        &self,
        album: &Album,
        reviewer: Option<&ReviewerMatcher>,
        sink: &mut dyn ResultSink,
    ) -> Vec<ScanResult> {
        log::info!("Processing album: {}", album.display_name());

        let limit = usize::try_from(album.image_count).ok().filter(|n| *n > 0);
        let images = self.page_album_images(&album.album_key, limit).await;
        if images.is_empty() {
            log::warn!("No images found in this album");
            return Vec::new();
        }

        let mut results = Vec::new();
        for (index, image) in images.iter().enumerate() {
            let position = index + 1;
            log::debug!("Checking image {}/{}", position, images.len());

            let comments: Vec<CommentRecord> = self
                .get_image_comments(&image.image_key)
                .await
                .into_iter()
                .filter(|c| reviewer.map_or(true, |m| m.matches(c.author())))
                .map(CommentRecord::from)
                .collect();
            if comments.is_empty() {
                continue;
            }

            let filename = self.filename_for(image).await;
            let Some(result) = ScanResult::new(filename, comments, position) else {
                continue;
            };
            if let Err(e) = sink.record(&result) {
                log::error!("Failed to save {}: {}", result.filename, e);
            }
            results.push(result);
        }

        log::info!("Found {} images with comments", results.len());
        results
    }

    async fn filename_for(&self, image: &AlbumImage) -> String {
        let detail = self
            .get_image_details(&image.image_key)
            .await
            .and_then(|d| d.file_name)
            .filter(|n| !n.is_empty());

        detail
            .or_else(|| image.file_name.clone().filter(|n| !n.is_empty()))
            .unwrap_or_else(|| format!("Image_{}", image.image_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> SmugMugClient {
        let config = ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        };
        SmugMugClient::with_http(ApiHttpClient::new().unwrap(), &config)
    }

    #[test]
    fn test_url_building() {
        let c = client("https://api.smugmug.com/api/v2/");
        let url = c
            .url("/album/abc!images", &[("start", "1".to_string()), ("count", "100".to_string())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.smugmug.com/api/v2/album/abc!images?start=1&count=100"
        );

        let bare = c.url("!authuser", &[]).unwrap();
        assert_eq!(bare.as_str(), "https://api.smugmug.com/api/v2!authuser");
    }
}
