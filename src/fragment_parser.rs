use crate::error::ParseError;
use crate::tweet_record::{MediaAttachment, MediaKind, TweetRecord};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;

/// Every tweets fragment of an export binds its array here, split into `part0`, `part1`, ...
pub const BINDING_PATH: &str = "window.YTD.tweets.part";

/// ja-JP `Intl.DateTimeFormat` with 2-digit fields down to the minute.
pub const DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M";

/// `created_at` as written by the archive exporter, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
const ARCHIVE_TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

#[derive(Debug, Deserialize)]
struct ArchiveEntry {
    tweet: ArchiveTweet,
}

#[derive(Debug, Deserialize)]
struct ArchiveTweet {
    created_at: String,
    full_text: String,
    #[serde(default)]
    extended_entities: Option<ExtendedEntities>,
}

#[derive(Debug, Deserialize)]
struct ExtendedEntities {
    #[serde(default)]
    media: Vec<ArchiveMedia>,
}

#[derive(Debug, Deserialize)]
struct ArchiveMedia {
    media_url_https: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Parse one archive fragment into records owned by `owner_label`.
///
/// The fragment is a script of the form `window.YTD.tweets.part0 = [ ... ]`.
/// Only the array literal is read, as JSON5 data; the script itself is never
/// evaluated and any other statement in the file is rejected.
/// Real exports are plain JSON, so try the fast strict parser first and only
/// fall back to JSON5 for hand-edited literals (single quotes, bare keys,
/// trailing commas, comments).
fn parse_literal(literal: &str) -> Result<Vec<Value>, ParseError> {
    match serde_json::from_str(literal) {
        Ok(entries) => Ok(entries),
        Err(_) => Ok(json5::from_str(literal)?),
    }
}

pub fn parse_fragment(
    content: &str,
    owner_label: &str,
    display_tz: Tz,
) -> Result<Vec<TweetRecord>, ParseError> {
    let literal = extract_array_literal(content)?;
    let entries = parse_literal(literal)?;

    let records = entries
        .into_iter()
        .enumerate()
        .map(|(index, value)| to_record(index, value, owner_label, display_tz))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        owner = owner_label,
        count = records.len(),
        "parsed archive fragment"
    );
    Ok(records)
}

fn to_record(
    index: usize,
    value: Value,
    owner_label: &str,
    display_tz: Tz,
) -> Result<TweetRecord, ParseError> {
    let entry: ArchiveEntry = serde_json::from_value(value).map_err(|e| ParseError::Shape {
        index,
        reason: e.to_string(),
    })?;
    let tweet = entry.tweet;

    let created_at =
        parse_archive_timestamp(&tweet.created_at).ok_or_else(|| ParseError::Timestamp {
            index,
            value: tweet.created_at.clone(),
        })?;

    let attachments = tweet
        .extended_entities
        .map(|entities| entities.media)
        .unwrap_or_default()
        .into_iter()
        .map(|media| MediaAttachment {
            url: media.media_url_https,
            kind: MediaKind::from_archive_type(&media.kind),
        })
        .collect();

    Ok(TweetRecord {
        display_timestamp: format_display_timestamp(created_at, display_tz),
        raw_text: tweet.full_text,
        attachments,
        owner_label: owner_label.to_string(),
        created_at,
    })
}

/// Parse an archive `created_at`, falling back to RFC 3339.
pub fn parse_archive_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_str(raw, ARCHIVE_TIMESTAMP_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn format_display_timestamp(instant: DateTime<Utc>, display_tz: Tz) -> String {
    instant
        .with_timezone(&display_tz)
        .format(DISPLAY_FORMAT)
        .to_string()
}

/// Locate the array literal bound at [`BINDING_PATH`] and return it verbatim.
fn extract_array_literal(content: &str) -> Result<&str, ParseError> {
    let bytes = content.as_bytes();
    let mut pos = skip_trivia(bytes, 0);
    // Exports written on Windows sometimes start with a BOM.
    if content[pos..].starts_with('\u{feff}') {
        pos = skip_trivia(bytes, pos + '\u{feff}'.len_utf8());
    }

    if !content[pos..].starts_with(BINDING_PATH) {
        return Err(ParseError::MissingBinding(BINDING_PATH));
    }
    pos += BINDING_PATH.len();

    let digits = bytes[pos..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return Err(ParseError::MissingBinding(BINDING_PATH));
    }
    pos = skip_trivia(bytes, pos + digits);

    if bytes.get(pos) != Some(&b'=') {
        return Err(ParseError::MissingBinding(BINDING_PATH));
    }
    pos = skip_trivia(bytes, pos + 1);

    if bytes.get(pos) != Some(&b'[') {
        return Err(ParseError::NotAnArray(BINDING_PATH));
    }
    let start = pos;
    let end = matching_bracket(bytes, start)
        .ok_or(ParseError::UnterminatedLiteral(BINDING_PATH))?;

    let mut rest = skip_trivia(bytes, end);
    if bytes.get(rest) == Some(&b';') {
        rest = skip_trivia(bytes, rest + 1);
    }
    if rest != bytes.len() {
        return Err(ParseError::TrailingContent { offset: rest });
    }

    Ok(&content[start..end])
}

/// Skip whitespace and JS comments, returning the next significant offset.
fn skip_trivia(bytes: &[u8], mut pos: usize) -> usize {
    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match (bytes.get(pos), bytes.get(pos + 1)) {
            (Some(b'/'), Some(b'/')) => {
                pos = bytes[pos..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(bytes.len(), |offset| pos + offset + 1);
            }
            (Some(b'/'), Some(b'*')) => {
                pos = bytes[pos + 2..]
                    .windows(2)
                    .position(|w| w == b"*/")
                    .map_or(bytes.len(), |offset| pos + 2 + offset + 2);
            }
            _ => return pos,
        }
    }
}

/// Offset just past the `]` closing the `[` at `open`, ignoring brackets
/// inside strings and comments.
fn matching_bracket(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut pos = open;
    while pos < bytes.len() {
        match bytes[pos] {
            quote @ (b'"' | b'\'') => {
                pos += 1;
                while pos < bytes.len() && bytes[pos] != quote {
                    if bytes[pos] == b'\\' {
                        pos += 1;
                    }
                    pos += 1;
                }
                if pos >= bytes.len() {
                    return None;
                }
            }
            b'/' if matches!(bytes.get(pos + 1), Some(b'/') | Some(b'*')) => {
                pos = skip_trivia(bytes, pos);
                continue;
            }
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return if bytes[pos] == b']' {
                        Some(pos + 1)
                    } else {
                        None
                    };
                }
            }
            _ => {}
        }
        pos += 1;
    }
    None
}
