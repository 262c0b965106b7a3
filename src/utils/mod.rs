use tokio::process::Command;

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else if seconds > 0.0 && seconds < 60.0 {
        format!("{:.2}s", seconds)
    } else {
        format!("{}s", secs)
    }
}

/// Check if the current environment has the required external tools
pub async fn check_dependencies() -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available("yt-dlp", "--version").await {
        missing.push("yt-dlp - required for downloading Reels".to_string());
    }

    if !check_command_available("ffmpeg", "-version").await {
        missing.push("ffmpeg - required for audio extraction".to_string());
    }

    let whisper_bin =
        std::env::var("WHISPER_CPP_BIN").unwrap_or_else(|_| "whisper-cli".to_string());
    if !check_command_available(&whisper_bin, "--help").await {
        missing.push(format!(
            "{whisper_bin} - required for transcription (set WHISPER_CPP_BIN to override)"
        ));
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str, probe_arg: &str) -> bool {
    Command::new(command)
        .arg(probe_arg)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
