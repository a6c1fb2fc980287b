use super::SearchOptions;
use crate::config::{youtube_api_key, youtube_base_url};
use crate::error::Result;
use crate::models::VideoRecord;
use crate::pipeline::VideoSearchPipeline;
use crate::publisher::NO_DESCRIPTION;
use crate::youtube::YouTubeApi;

pub async fn run(options: &SearchOptions, json: bool) -> Result<()> {
    let videos = find_videos(options).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&videos)?);
        return Ok(());
    }

    if videos.is_empty() {
        println!("No videos found for: {}", options.query);
        return Ok(());
    }

    println!("Found {} video(s) for '{}':\n", videos.len(), options.query);
    print_videos(&videos);

    println!("To save these results to a spreadsheet, run:");
    println!("  yt-sheets save \"{}\" --sheet <NAME>", options.query);

    Ok(())
}

/// Build the YouTube client from config and run the pipeline
pub(crate) async fn find_videos(options: &SearchOptions) -> Result<Vec<VideoRecord>> {
    let filter = options.to_filter()?;
    let api = YouTubeApi::new(youtube_api_key()?)?.with_base_url(youtube_base_url());

    eprintln!("Searching YouTube for: {}", filter.query);
    VideoSearchPipeline::new(api).search(&filter).await
}

pub(crate) fn print_videos(videos: &[VideoRecord]) {
    for (i, video) in videos.iter().enumerate() {
        print_video(i + 1, video);
    }
}

fn print_video(index: usize, video: &VideoRecord) {
    println!("{}. {}", index, video.title);

    let published = video.published_at.get(..10).unwrap_or(&video.published_at);
    println!(
        "   Published: {} | Views: {}",
        published,
        format_view_count(video.view_count)
    );

    println!("   {}", video.video_url);

    let description = video.description.lines().next().unwrap_or("").trim();
    if description.is_empty() {
        println!("   {}", NO_DESCRIPTION);
    } else {
        println!("   {}", description);
    }
    println!();
}

/// Full count with `.` as thousands separator, e.g. 1.234.567
fn format_view_count(views: u64) -> String {
    let digits = views.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}
