//! Upload and download boundary around the pipeline
//!
//! An upload is persisted under the upload directory, run through detection
//! and trailer generation, and removed again whatever the outcome. Rendered
//! trailers land in the output directory as `trailer_<name>` and can be
//! looked up by name afterwards.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    analysis::Moment,
    composition::{MomentCatcher, TrailerReport},
    config::{Config, DetectionParams, ServiceConfig},
    error::{Result, ServiceError},
    video::{FfmpegSource, MediaSource},
};

/// Make an untrusted file name safe to use inside a workspace directory
///
/// Non-ASCII characters are dropped, path separators become spaces, runs of
/// whitespace are joined with `_` and anything outside `[A-Za-z0-9_.-]` is
/// removed. Leading and trailing dots and underscores are stripped, so the
/// result can never name a parent directory or a hidden file.
pub fn sanitize_filename(name: &str) -> Result<String> {
    let spaced: String = name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        return Err(ServiceError::InvalidFilename { name: name.to_string() }.into());
    }
    Ok(trimmed.to_string())
}

/// Upload and output directories of a service instance
#[derive(Debug, Clone)]
pub struct Workspace {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl Workspace {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(upload_dir: P, output_dir: Q) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Same layout rooted at `root` instead of the working directory
    pub fn rooted_at<P: AsRef<Path>>(root: P, config: &ServiceConfig) -> Self {
        let root = root.as_ref();
        Self::new(root.join(&config.upload_dir), root.join(&config.output_dir))
    }

    /// Create both directories if they are missing
    pub fn bootstrap(&self) -> Result<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.output_dir)?;
        debug!(
            "Workspace ready: uploads in {}, outputs in {}",
            self.upload_dir.display(),
            self.output_dir.display()
        );
        Ok(())
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Name of the trailer rendered from an upload called `name`
    pub fn output_name(name: &str) -> String {
        format!("trailer_{}", name)
    }

    /// Path of a rendered trailer, or `NotFound` when there is none
    pub fn resolve_download(&self, name: &str) -> Result<PathBuf> {
        let not_found = || ServiceError::NotFound { name: name.to_string() };

        let safe = sanitize_filename(name).map_err(|_| not_found())?;
        let path = self.output_dir.join(safe);
        if path.is_file() {
            Ok(path)
        } else {
            Err(not_found().into())
        }
    }
}

/// Summary handed back to the uploader
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    /// Name to fetch the trailer with
    pub output_file: String,

    /// Every detected moment, including those left out by the budget
    pub moments: Vec<Moment>,

    pub report: TrailerReport,
}

type SourceOpener = Box<dyn Fn(&Path, &Config) -> Result<Box<dyn MediaSource>> + Send + Sync>;

/// Runs uploads through the pipeline inside a [`Workspace`]
pub struct UploadHandler {
    workspace: Workspace,
    catcher: MomentCatcher,
    params: DetectionParams,
    max_upload_bytes: u64,
    opener: SourceOpener,
}

impl UploadHandler {
    /// Handler opening uploads with ffmpeg
    pub fn new(workspace: Workspace, catcher: MomentCatcher) -> Self {
        let params = catcher.config().detection.clone();
        let max_upload_bytes = catcher.config().service.max_upload_bytes;
        Self {
            workspace,
            catcher,
            params,
            max_upload_bytes,
            opener: Box::new(|path: &Path, config: &Config| {
                let source = FfmpegSource::open(path, &config.render, &config.video)?;
                Ok(Box::new(source) as Box<dyn MediaSource>)
            }),
        }
    }

    /// Replace the way uploaded files are opened
    pub fn with_opener<F>(mut self, opener: F) -> Self
    where
        F: Fn(&Path, &Config) -> Result<Box<dyn MediaSource>> + Send + Sync + 'static,
    {
        self.opener = Box::new(opener);
        self
    }

    pub fn with_params(mut self, params: DetectionParams) -> Self {
        self.params = params;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Persist `body` as `filename`, build its trailer and remove the upload
    pub fn handle_upload<R: Read>(&self, filename: &str, body: R) -> Result<UploadOutcome> {
        let name = sanitize_filename(filename)?;
        self.workspace.bootstrap()?;

        let upload_path = self.workspace.upload_dir.join(&name);
        let _upload = UploadGuard(upload_path.clone());
        let size = self.persist(&upload_path, body)?;
        info!("📥 Received {} ({} bytes)", name, size);

        let output_file = Workspace::output_name(&name);
        let output_path = self.workspace.output_dir.join(&output_file);

        let mut source = (self.opener)(&upload_path, self.catcher.config())?;
        let detection = self.catcher.detect(source.as_mut(), &self.params);
        let closed = source.close();
        let detection = detection?;
        closed?;

        let report = self
            .catcher
            .generate_trailer(&detection, &output_path, self.params.max_trailer_duration)?;

        Ok(UploadOutcome {
            output_file,
            moments: detection.moments,
            report,
        })
    }

    /// Copy at most the upload limit into `path`
    fn persist<R: Read>(&self, path: &Path, body: R) -> Result<u64> {
        let mut file = File::create(path)?;
        let written = io::copy(&mut body.take(self.max_upload_bytes.saturating_add(1)), &mut file)?;
        file.flush()?;

        if written > self.max_upload_bytes {
            return Err(ServiceError::TooLarge {
                limit: self.max_upload_bytes,
            }
            .into());
        }
        Ok(written)
    }
}

/// Removes an uploaded file when the request is done with it
struct UploadGuard(PathBuf);

impl Drop for UploadGuard {
    fn drop(&mut self) {
        if self.0.exists() {
            match std::fs::remove_file(&self.0) {
                Ok(()) => debug!("Removed upload {}", self.0.display()),
                Err(e) => warn!("Failed to remove upload {}: {}", self.0.display(), e),
            }
        }
    }
}
