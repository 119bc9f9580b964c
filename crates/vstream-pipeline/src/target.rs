//! Object-key layout for one run.

use chrono::NaiveDate;
use vstream_media::MANIFEST_NAME;
use vstream_models::file_stem;

/// Where a run publishes to.
///
/// Raw upload: `{raw_bucket}/{date}/{file_name}`.
/// HLS output: `{hls_bucket}/{prefix}/{date}/{video_name}/{file}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub date: String,
    /// File name without extension
    pub video_name: String,
    /// Sanitized upload name
    pub file_name: String,
    pub raw_bucket: String,
    pub hls_bucket: String,
    hls_prefix: String,
}

impl PublishTarget {
    pub fn new(
        date: NaiveDate,
        file_name: &str,
        raw_bucket: impl Into<String>,
        hls_bucket: impl Into<String>,
        hls_prefix: &str,
    ) -> Self {
        let date = date.format("%Y-%m-%d").to_string();
        let video_name = file_stem(file_name).to_string();
        let hls_prefix = format!("{}/{}/{}", hls_prefix.trim_matches('/'), date, video_name);
        Self {
            date,
            video_name,
            file_name: file_name.to_string(),
            raw_bucket: raw_bucket.into(),
            hls_bucket: hls_bucket.into(),
            hls_prefix,
        }
    }

    /// Key of the original upload in the raw bucket.
    pub fn raw_key(&self) -> String {
        format!("{}/{}", self.date, self.file_name)
    }

    /// Common prefix of every HLS object of this run.
    pub fn hls_prefix(&self) -> &str {
        &self.hls_prefix
    }

    /// Key for a file relative to the output directory.
    pub fn hls_key(&self, relative: &str) -> String {
        format!("{}/{}", self.hls_prefix, relative.trim_start_matches('/'))
    }

    pub fn manifest_key(&self) -> String {
        self.hls_key(MANIFEST_NAME)
    }

    /// Caller-facing playback URL served by the API's play route.
    pub fn playback_url(&self, base_url: &str) -> String {
        format!(
            "{}/api/play/{}/{}/{}",
            base_url.trim_end_matches('/'),
            self.date,
            urlencoding::encode(&self.video_name),
            MANIFEST_NAME
        )
    }
}
