//! OCR through the `tesseract` command line tool.
//!
//! Each call writes the cell to a temporary PNG and reads the text back from
//! stdout, so no native libraries are needed at build time.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::sync::OnceLock;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use image::{GrayImage, ImageFormat};
use tracing::{debug, info};

use crate::{
    config::OcrConfig,
    error::{GridScanError, OcrError, Result},
    traits::{OcrEngine, OcrEngineFactory},
};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Builds [`TesseractCli`] sessions after checking once that the executable
/// runs and has the requested language data.
#[derive(Debug)]
pub struct TesseractCliFactory {
    executable: PathBuf,
    language: String,
    tessdata_dir: Option<PathBuf>,
    psm: Option<u8>,
    probe: OnceLock<std::result::Result<(), String>>,
}

impl TesseractCliFactory {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            executable: config
                .executable
                .clone()
                .unwrap_or_else(|| PathBuf::from("tesseract")),
            language: config.language.clone(),
            tessdata_dir: config.tessdata_dir.clone(),
            psm: config.page_segmentation_mode,
            probe: OnceLock::new(),
        }
    }

    fn base_command(&self) -> Command {
        let mut command = Command::new(&self.executable);
        if let Some(dir) = &self.tessdata_dir {
            command.arg("--tessdata-dir").arg(dir);
        }
        command
    }

    fn check_installation(&self) -> std::result::Result<(), String> {
        let output = self
            .base_command()
            .arg("--list-langs")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| format!("cannot run {}: {e}", self.executable.display()))?;

        // older releases print the list on stderr
        let listing = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let installed: Vec<&str> = listing.lines().map(str::trim).collect();

        for language in self.language.split('+') {
            if !installed.contains(&language) {
                return Err(format!("language data for '{language}' is not installed"));
            }
        }

        info!(executable = %self.executable.display(), language = %self.language, "Tesseract available");
        Ok(())
    }
}

impl OcrEngineFactory for TesseractCliFactory {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn create(&self) -> Result<Box<dyn OcrEngine>> {
        self.probe
            .get_or_init(|| self.check_installation())
            .clone()
            .map_err(GridScanError::OcrInit)?;

        Ok(Box::new(TesseractCli {
            executable: self.executable.clone(),
            language: self.language.clone(),
            tessdata_dir: self.tessdata_dir.clone(),
            psm: self.psm,
        }))
    }
}

/// One tesseract session; every call spawns a process
#[derive(Debug, Clone)]
pub struct TesseractCli {
    executable: PathBuf,
    language: String,
    tessdata_dir: Option<PathBuf>,
    psm: Option<u8>,
}

impl OcrEngine for TesseractCli {
    fn recognize(&mut self, image: &GrayImage, deadline: Option<Duration>) -> std::result::Result<String, OcrError> {
        let input = tempfile::Builder::new()
            .prefix("gridscan-cell-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(input.path(), ImageFormat::Png)?;

        let mut command = Command::new(&self.executable);
        command.arg(input.path()).arg("stdout").arg("-l").arg(&self.language);
        if let Some(dir) = &self.tessdata_dir {
            command.arg("--tessdata-dir").arg(dir);
        }
        if let Some(psm) = self.psm {
            command.arg("--psm").arg(psm.to_string());
        }

        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let output = wait_with_deadline(child, deadline)?;

        if !output.status.success() {
            return Err(OcrError::Engine(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        String::from_utf8(output.stdout).map_err(|_| OcrError::InvalidUtf8)
    }
}

/// Wait for `child`, killing it once `deadline` has passed.
///
/// stdout and stderr are drained on their own threads while waiting, so a
/// child that writes more than a pipe buffer never stalls.
fn wait_with_deadline(mut child: Child, deadline: Option<Duration>) -> std::result::Result<Output, OcrError> {
    let Some(limit) = deadline else {
        return Ok(child.wait_with_output()?);
    };

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Output {
                status,
                stdout: collect(stdout)?,
                stderr: collect(stderr)?,
            });
        }
        if started.elapsed() >= limit {
            debug!(pid = child.id(), ?limit, "Killing OCR process past its deadline");
            child.kill()?;
            child.wait()?;
            return Err(OcrError::Timeout(limit));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn collect(reader: JoinHandle<io::Result<Vec<u8>>>) -> std::result::Result<Vec<u8>, OcrError> {
    reader
        .join()
        .map_err(|_| OcrError::Engine("OCR output reader panicked".to_string()))?
        .map_err(OcrError::from)
}
