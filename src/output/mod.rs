use anyhow::{Context, Result};
use std::path::Path;

use crate::pipeline::TranscriptionResult;

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// Print application banner
pub fn print_banner() {
    println!("\n{RULE}");
    println!("  Instagram Reel Speech-to-Text Transcription Tool");
    println!("{RULE}");
}

/// Print transcription result
pub fn print_result(result: &TranscriptionResult) {
    println!("\n{RULE}");
    println!("RESULT");
    println!("{RULE}");

    if result.success {
        println!("✓ Transcription completed successfully!");
        println!("\nReel ID: {}", result.reel_id);
        println!(
            "Processing Time: {}",
            crate::utils::format_duration(result.processing_time)
        );
        println!("\n{THIN_RULE}");
        println!("TRANSCRIPTION:");
        println!("{THIN_RULE}");
        println!("{}", result.transcription);
        println!("{THIN_RULE}");
    } else {
        println!("✗ Transcription failed");
        println!("\nError: {}", result.error);
    }

    println!();
}

/// Persist the transcription text, creating parent directories as needed.
pub fn save_transcription(result: &TranscriptionResult, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs_err::create_dir_all(parent)?;
        }
    }

    fs_err::write(path, &result.transcription)
        .with_context(|| format!("Could not save file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saves_transcription_creating_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out.txt");

        let result = TranscriptionResult {
            success: true,
            transcription: "hello world".to_string(),
            reel_id: "ABC123".to_string(),
            processing_time: 1.0,
            error: String::new(),
        };

        save_transcription(&result, &target).unwrap();
        assert_eq!(fs_err::read_to_string(&target).unwrap(), "hello world");
    }
}
