use std::path::Path;

use reel_media::{check_ffmpeg, check_ffprobe};
use reel_worker::RenderConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RenderConfig::from_env();

    println!(
        "reel-selfcheck: starting with output_dir={}",
        config.output_dir.display()
    );
    ensure_output_dir(&config.output_dir).await?;
    ensure_ffmpeg(&config)?;

    println!("reel-selfcheck: ok");
    Ok(())
}

async fn ensure_output_dir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path.as_ref()).await?;
    Ok(())
}

fn ensure_ffmpeg(config: &RenderConfig) -> anyhow::Result<()> {
    let ffmpeg = check_ffmpeg(&config.ffmpeg_binary)?;
    let ffprobe = check_ffprobe(&config.ffprobe_binary)?;
    println!(
        "reel-selfcheck: ffmpeg={} ffprobe={}",
        ffmpeg.display(),
        ffprobe.display()
    );
    Ok(())
}
