//! List command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::open_store;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    preflight::check(Operation::List, &settings)?;
    let store = open_store(&settings)?;

    let videos = match store.list_videos().await {
        Ok(videos) => videos,
        Err(e) => {
            Output::error(&format!("Failed to list videos: {}", e));
            return Err(e.into());
        }
    };

    if videos.is_empty() {
        Output::info("No videos ingested yet. Use 'evrika ingest <url>' to add one.");
        return Ok(());
    }

    Output::header(&format!("Ingested Videos ({})", videos.len()));
    println!();
    for video in &videos {
        let indexed_at = video
            .indexed_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string());
        Output::video_info(
            &video.title,
            &video.youtube_id,
            video.chunk_count,
            indexed_at.as_deref(),
        );
    }

    let total_chunks: usize = videos.iter().map(|v| v.chunk_count).sum();
    println!();
    Output::kv("Total videos", &videos.len().to_string());
    Output::kv("Total chunks", &total_chunks.to_string());
    Ok(())
}
