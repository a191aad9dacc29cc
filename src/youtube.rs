/*!
 * Caption retrieval from the video site.
 *
 * The watch page embeds a JSON blob describing the available caption tracks;
 * the chosen track's timedtext URL returns the captions as XML. Both requests
 * go through a caller-supplied HTTP client so the fetcher can bind a proxy,
 * user agent and timeout to a single attempt.
 */

use async_trait::async_trait;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::FetchError;
use crate::language_utils::language_codes_match;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Display duration assumed when the feed omits `dur`
const DEFAULT_EVENT_DURATION: f64 = 2.0;

// @const: Video id extraction from watch/share/embed URLs
static VIDEO_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:youtu\.be/|youtube\.com/(?:embed/|v/|watch\?v=|watch\?.+&v=))([^"&?/\s]{11})"#)
        .unwrap()
});

// @const: One <text> element of the timedtext XML
static TEXT_ELEMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<text start="([\d.]+)"(?: dur="([\d.]+)")?[^>]*>(.*?)</text>"#).unwrap()
});

static NUMERIC_ENTITY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#(\d+);").unwrap());

/// One timed caption unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionEvent {
    /// Start position in seconds
    pub offset: f64,

    /// Display duration in seconds
    pub duration: f64,

    /// Trimmed display text
    pub text: String,
}

/// Ordered caption sequence for one video
pub type Transcript = Vec<CaptionEvent>;

/// Pull the 11-character video id out of a URL, if present
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_REGEX
        .captures(url)
        .map(|caps| caps[1].to_string())
}

/// Caption backend seam.
///
/// The fetcher hands in a fully configured client per call, which keeps the
/// transport binding scoped to one attempt; tests substitute scripted sources.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Retrieve the transcript for a video, routing every request this lookup
    /// makes through the supplied client.
    async fn fetch_transcript(
        &self,
        client: &Client,
        video_id: &str,
        language_code: Option<&str>,
    ) -> Result<Transcript, FetchError>;
}

/// Caption source scraping the public watch page
#[derive(Debug, Default)]
pub struct YouTubeCaptionSource;

#[async_trait]
impl CaptionSource for YouTubeCaptionSource {
    async fn fetch_transcript(
        &self,
        client: &Client,
        video_id: &str,
        language_code: Option<&str>,
    ) -> Result<Transcript, FetchError> {
        let watch_url = format!("{}{}", WATCH_URL, video_id);
        let response = client.get(&watch_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transport(format!(
                "Watch page responded with status {}",
                status
            )));
        }

        let html = response.text().await?;
        let track = select_track(&html, video_id, language_code)?;
        debug!(
            "Fetching timedtext track '{}' for video {}",
            track.language_code, video_id
        );

        let timedtext = client.get(&track.base_url).send().await?;
        let timedtext_status = timedtext.status();
        if !timedtext_status.is_success() {
            return Err(FetchError::Transport(format!(
                "Timedtext endpoint responded with status {}",
                timedtext_status
            )));
        }

        let xml = timedtext.text().await?;
        Ok(parse_timedtext(&xml))
    }
}

#[derive(Debug, Deserialize)]
struct CaptionsBlob {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct TracklistRenderer {
    #[serde(rename = "captionTracks", default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,

    #[serde(rename = "languageCode")]
    language_code: String,
}

/// Slice the captions metadata object out of the watch page markup
fn captions_json(html: &str) -> Option<&str> {
    let (_, after) = html.split_once(r#""captions":"#)?;
    let (blob, _) = after.split_once(r#","videoDetails""#)?;
    Some(blob)
}

fn select_track(
    html: &str,
    video_id: &str,
    language_code: Option<&str>,
) -> Result<CaptionTrack, FetchError> {
    if html.contains(r#"class="g-recaptcha""#) {
        // the site is throttling us; worth retrying through another proxy
        return Err(FetchError::Transport(
            "Blocked by a captcha challenge".to_string(),
        ));
    }

    let Some(blob) = captions_json(html) else {
        if !html.contains(r#""playabilityStatus":"#) {
            return Err(FetchError::NoCaptionsFound(format!(
                "Video unavailable: {}",
                video_id
            )));
        }
        return Err(FetchError::CaptionsDisabled);
    };

    let parsed: CaptionsBlob = match serde_json::from_str(blob.trim()) {
        Ok(parsed) => parsed,
        // a captions key without a readable tracklist means captions are off
        Err(_) => return Err(FetchError::CaptionsDisabled),
    };

    let mut tracks = parsed
        .renderer
        .map(|renderer| renderer.caption_tracks)
        .unwrap_or_default();

    match language_code {
        Some(code) => {
            let wanted = code.to_ascii_lowercase();
            let position = tracks
                .iter()
                .position(|track| track.language_code.to_ascii_lowercase() == wanted)
                .or_else(|| {
                    // "pt" should still pick up a track labelled "pt-BR"
                    tracks
                        .iter()
                        .position(|track| language_codes_match(&track.language_code, code))
                });
            match position {
                Some(position) => Ok(tracks.swap_remove(position)),
                None => Err(FetchError::NoCaptionsFound(format!(
                    "No transcript found for language '{}'",
                    code
                ))),
            }
        }
        None if tracks.is_empty() => Err(FetchError::NoCaptionsFound(
            "No transcript found for this video".to_string(),
        )),
        None => Ok(tracks.swap_remove(0)),
    }
}

fn parse_timedtext(xml: &str) -> Transcript {
    TEXT_ELEMENT_REGEX
        .captures_iter(xml)
        .filter_map(|caps| {
            let offset: f64 = caps[1].parse().ok()?;
            let duration = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(DEFAULT_EVENT_DURATION);
            let text = decode_entities(&caps[3]).trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(CaptionEvent {
                offset,
                duration,
                text,
            })
        })
        .collect()
}

/// Decode named and decimal-numeric character entities.
/// The `&amp;` pass runs first because the feed double-encodes, so
/// `&amp;#39;` reduces to `&#39;` and then to an apostrophe.
fn decode_entities(text: &str) -> String {
    let named = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ");

    NUMERIC_ENTITY_REGEX
        .replace_all(&named, |caps: &regex::Captures| {
            caps[1]
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        })
        .into_owned()
}
