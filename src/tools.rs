//! Installation check for the external tools and workspace directories

use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::Serialize;
use tracing::debug;

use crate::config::Config;

/// Availability of one external program
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub name: String,

    /// First line of `<tool> -version`, when the tool ran successfully
    pub version: Option<String>,
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        self.version.is_some()
    }
}

/// Presence of one workspace directory
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryStatus {
    pub path: PathBuf,
    pub exists: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallationReport {
    pub tools: Vec<ToolStatus>,
    pub directories: Vec<DirectoryStatus>,
}

impl InstallationReport {
    /// True when every tool runs and every directory exists
    pub fn is_ready(&self) -> bool {
        self.tools.iter().all(ToolStatus::is_available) && self.directories.iter().all(|d| d.exists)
    }

    pub fn missing_tools(&self) -> Vec<&str> {
        self.tools
            .iter()
            .filter(|t| !t.is_available())
            .map(|t| t.name.as_str())
            .collect()
    }

    pub fn missing_directories(&self) -> Vec<&PathBuf> {
        self.directories.iter().filter(|d| !d.exists).map(|d| &d.path).collect()
    }
}

/// Run `program -version` and keep its first output line
pub fn check_tool(program: &str) -> ToolStatus {
    let version = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| {
            String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|line| line.trim().to_string())
        });

    debug!("{}: {:?}", program, version);
    ToolStatus {
        name: program.to_string(),
        version,
    }
}

/// Check ffmpeg, ffprobe and the upload/output directories from `config`
pub fn check_installation(config: &Config) -> InstallationReport {
    let tools = [&config.render.ffmpeg, &config.render.ffprobe]
        .into_iter()
        .map(|tool| check_tool(tool))
        .collect();

    let directories = [&config.service.upload_dir, &config.service.output_dir]
        .into_iter()
        .map(|path| DirectoryStatus {
            path: path.clone(),
            exists: path.is_dir(),
        })
        .collect();

    InstallationReport { tools, directories }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool() {
        let status = check_tool("/nonexistent/ffmpeg");
        assert!(!status.is_available());
    }

    #[test]
    fn test_directories_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.render.ffmpeg = "/nonexistent/ffmpeg".to_string();
        config.render.ffprobe = "/nonexistent/ffprobe".to_string();
        config.service.upload_dir = dir.path().join("uploads");
        config.service.output_dir = dir.path().join("outputs");
        std::fs::create_dir(&config.service.upload_dir).unwrap();

        let report = check_installation(&config);
        assert!(!report.is_ready());
        assert_eq!(
            report.missing_tools(),
            vec!["/nonexistent/ffmpeg", "/nonexistent/ffprobe"]
        );
        assert_eq!(report.missing_directories(), vec![&config.service.output_dir]);
    }
}
