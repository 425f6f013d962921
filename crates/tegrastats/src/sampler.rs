// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Adapter around the external `tegrastats` process.
//!
//! `tegrastats` is started with `--logfile`, so it appends one line per interval to
//! `<log_dir>/tegrastats.log`. Readers only ever need the last complete line, which is found by
//! reading the file backwards in growing chunks.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::errors::SamplerError;

/// Install locations probed when no binary is configured.
pub const BINARY_PATHS: [&str; 2] = ["/usr/bin/tegrastats", "/home/nvidia/tegrastats"];

pub const LOG_FILE_NAME: &str = "tegrastats.log";

// Enough for a handful of lines on every Jetson generation; doubled until a full line fits.
const READ_CHUNK_SIZE: u64 = 8192;

/// Source of the most recent raw sample line.
pub trait SampleSource: Send + Sync {
    /// Returns the latest fully written line, or `None` when nothing is available yet.
    fn read_latest(&self) -> Option<String>;
}

/// Returns the first existing path of [`BINARY_PATHS`].
pub fn locate_binary() -> Result<PathBuf, SamplerError> {
    locate_binary_in(&BINARY_PATHS)
}

fn locate_binary_in(candidates: &[&str]) -> Result<PathBuf, SamplerError> {
    candidates
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
        .ok_or_else(|| SamplerError::BinaryNotFound(candidates.join(", ")))
}

pub struct Tegrastats {
    binary: PathBuf,
    log_file: PathBuf,
    child: Mutex<Option<Child>>,
}

impl Tegrastats {
    pub fn new(binary: impl Into<PathBuf>, log_dir: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.into(),
            log_file: log_dir.as_ref().join(LOG_FILE_NAME),
            child: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Spawns `tegrastats --interval <ms> --logfile <log_file>`.
    pub fn start(&self, interval: Duration) -> Result<(), SamplerError> {
        let mut child = self.lock_child()?;
        if child.is_some() {
            return Err(SamplerError::AlreadyStarted);
        }

        let interval_ms = interval.as_millis().to_string();
        info!(
            "Starting {} --interval {} --logfile {}",
            self.binary.display(),
            interval_ms,
            self.log_file.display()
        );
        let spawned = Command::new(&self.binary)
            .arg("--interval")
            .arg(&interval_ms)
            .arg("--logfile")
            .arg(&self.log_file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SamplerError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;
        debug!("tegrastats running with pid {}", spawned.id());
        *child = Some(spawned);
        Ok(())
    }

    /// Runs `tegrastats --stop`, then makes sure the child spawned by [`Tegrastats::start`] is
    /// gone.
    pub fn stop(&self) -> Result<(), SamplerError> {
        info!("Stopping tegrastats");
        match Command::new(&self.binary)
            .arg("--stop")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => debug!("tegrastats --stop succeeded"),
            Ok(status) => warn!("tegrastats --stop exited with {status}"),
            Err(e) => warn!("Failed to run {} --stop: {e}", self.binary.display()),
        }

        let Some(mut child) = self.lock_child()?.take() else {
            return Ok(());
        };
        match child.try_wait() {
            Ok(Some(status)) => debug!("tegrastats exited with {status}"),
            Ok(None) | Err(_) => {
                child
                    .kill()
                    .map_err(|e| SamplerError::Stop(format!("kill failed: {e}")))?;
                match child.wait() {
                    Ok(status) => debug!("tegrastats killed, exited with {status}"),
                    Err(e) => debug!("tegrastats killed, failed to reap it: {e}"),
                }
            }
        }
        Ok(())
    }

    /// Empties the log file in place. `tegrastats` keeps appending to the same file.
    pub fn truncate_log(&self) -> Result<(), SamplerError> {
        File::create(&self.log_file).map_err(|source| SamplerError::Io {
            path: self.log_file.clone(),
            source,
        })?;
        info!("Truncated {}", self.log_file.display());
        Ok(())
    }

    fn lock_child(&self) -> Result<MutexGuard<'_, Option<Child>>, SamplerError> {
        self.child
            .lock()
            .map_err(|e| SamplerError::Stop(format!("child handle lock poisoned: {e}")))
    }
}

impl SampleSource for Tegrastats {
    fn read_latest(&self) -> Option<String> {
        match read_last_line(&self.log_file) {
            Ok(line) => line,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} does not exist yet", self.log_file.display());
                None
            }
            Err(e) => {
                error!("Failed to read {}: {e}", self.log_file.display());
                None
            }
        }
    }
}

impl Drop for Tegrastats {
    fn drop(&mut self) {
        if let Ok(child) = self.child.get_mut() {
            if let Some(child) = child.as_mut() {
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }
}

/// Returns the last newline-terminated, non-blank line of `path`. A trailing line without a
/// newline is still being written and is ignored.
pub fn read_last_line(path: &Path) -> io::Result<Option<String>> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let mut window = READ_CHUNK_SIZE.min(len);

    while window > 0 {
        file.seek(SeekFrom::Start(len - window))?;
        let mut buf = Vec::with_capacity(window as usize);
        (&mut file).take(window).read_to_end(&mut buf)?;
        let from_start = window == len;

        let Some(end) = buf.iter().rposition(|&b| b == b'\n') else {
            if from_start {
                return Ok(None);
            }
            window = (window * 2).min(len);
            continue;
        };
        let complete = trim_line_end(&buf[..end]);
        if complete.is_empty() && from_start {
            return Ok(None);
        }

        match complete.iter().rposition(|&b| b == b'\n') {
            Some(start) => return Ok(Some(decode(&complete[start + 1..]))),
            None if from_start => return Ok(Some(decode(complete))),
            None => window = (window * 2).min(len),
        }
    }
    Ok(None)
}

/// Strips trailing line terminators, so blank lines at the end are skipped.
fn trim_line_end(bytes: &[u8]) -> &[u8] {
    let keep = bytes
        .iter()
        .rposition(|&b| b != b'\n' && b != b'\r')
        .map_or(0, |i| i + 1);
    &bytes[..keep]
}

// A truncated log that is still open for writing by tegrastats gets zero-filled up to the
// writer's offset.
fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}
