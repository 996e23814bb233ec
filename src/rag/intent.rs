//! Keyword routing of questions to specialised prompts.

const METADATA_PHRASES: &[&str] = &[
    "title of the video",
    "video title",
    "name of the video",
    "what is the title",
    "what's the title",
    "who is the speaker",
    "who's the speaker",
    "who is speaking",
    "who is the host",
    "how long is the video",
    "how long is it",
    "what is the duration",
    "video duration",
    "when was this video published",
    "when was it published",
    "when was this uploaded",
    "upload date",
    "publish date",
];

const RECOMMENDATION_PHRASES: &[&str] = &[
    "recommend me similar videos",
    "recommend similar videos",
    "similar videos",
    "similar video",
    "what should i watch next",
    "what else should i watch",
    "follow-up videos",
    "related videos",
    "more like this",
    "next video to watch",
];

/// Questions about title, speaker, duration, dates, channel or links.
pub fn is_metadata_question(question: &str) -> bool {
    let q = question.trim().to_lowercase();
    METADATA_PHRASES.iter().any(|p| q.contains(p))
        || q.contains("channel")
        || q.contains("url")
        || q.contains("link")
}

/// Requests for what to watch or learn next.
pub fn is_recommendation_question(question: &str) -> bool {
    let q = question.to_lowercase();
    RECOMMENDATION_PHRASES.iter().any(|p| q.contains(p))
        || (q.contains("recommend")
            && (q.contains("video") || q.contains("watch") || q.contains("content")))
}
