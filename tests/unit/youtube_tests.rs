/*!
 * Tests for video id extraction and caption event serialization
 */

use serde_json::json;
use tubesub::youtube::{extract_video_id, CaptionEvent};

/// Test id extraction across recognized URL shapes
#[test]
fn test_extractVideoId_withRecognizedUrlForms_shouldExtractId() {
    let expected = Some("dQw4w9WgXcQ".to_string());

    assert_eq!(
        extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
        expected
    );
    assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ"), expected);
    assert_eq!(
        extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
        expected
    );
    assert_eq!(
        extract_video_id("https://www.youtube.com/v/dQw4w9WgXcQ"),
        expected
    );
    assert_eq!(
        extract_video_id("https://www.youtube.com/watch?list=PL123&v=dQw4w9WgXcQ"),
        expected
    );
}

/// Test that trailing query parameters do not leak into the id
#[test]
fn test_extractVideoId_withExtraParameters_shouldStopAtDelimiter() {
    assert_eq!(
        extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=30s"),
        Some("dQw4w9WgXcQ".to_string())
    );
    assert_eq!(
        extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=share"),
        Some("dQw4w9WgXcQ".to_string())
    );
}

/// Test rejection of URLs without a video id
#[test]
fn test_extractVideoId_withUnrecognizedUrl_shouldReturnNone() {
    assert_eq!(extract_video_id("https://example.com/watch?v=short"), None);
    assert_eq!(extract_video_id("https://www.youtube.com/"), None);
    assert_eq!(extract_video_id("not a url at all"), None);
    assert_eq!(extract_video_id(""), None);
}

/// Test the cached transcript JSON shape
#[test]
fn test_captionEvent_serialization_shouldUseOffsetDurationText() {
    let event = CaptionEvent {
        offset: 1.5,
        duration: 2.0,
        text: "Hello".to_string(),
    };

    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(
        value,
        json!({"offset": 1.5, "duration": 2.0, "text": "Hello"})
    );

    let back: CaptionEvent = serde_json::from_value(value).unwrap();
    assert_eq!(back, event);
}
