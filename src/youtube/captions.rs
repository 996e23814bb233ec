//! Parsing of YouTube `json3` caption files.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Json3Document {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(default)]
    segs: Vec<Json3Segment>,
}

#[derive(Debug, Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

/// Flatten a json3 caption document into one line of text.
///
/// Each caption event becomes one entry with newlines folded into spaces;
/// empty entries are dropped and the rest joined with single spaces.
pub fn parse_json3_captions(json: &str) -> crate::error::Result<String> {
    let doc: Json3Document = serde_json::from_str(json)?;

    let text = doc
        .events
        .iter()
        .map(|event| {
            event
                .segs
                .iter()
                .map(|s| s.utf8.as_str())
                .collect::<String>()
                .replace('\n', " ")
                .trim()
                .to_string()
        })
        .filter(|entry| !entry.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(text)
}
