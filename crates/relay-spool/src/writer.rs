//! Durable, atomically-visible writes into the dialer's directories.

use crate::error::SpoolError;
use crate::job::{DialerJob, FILE_PREFIX};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Writes dialer jobs into the spool and sounds directories.
///
/// The writer never overwrites an existing file: filenames derive from the
/// job id, so a collision means either an id clash or a leftover artifact,
/// and both are errors rather than something to silently clobber.
#[derive(Debug, Clone)]
pub struct SpoolWriter {
    spool_dir: PathBuf,
    sounds_dir: PathBuf,
}

impl SpoolWriter {
    /// Creates a writer over the dialer's watched spool directory and its
    /// custom sounds directory.
    pub fn new(spool_dir: impl AsRef<Path>, sounds_dir: impl AsRef<Path>) -> Self {
        Self {
            spool_dir: spool_dir.as_ref().to_path_buf(),
            sounds_dir: sounds_dir.as_ref().to_path_buf(),
        }
    }

    /// Where the job's audio artifact lives.
    pub fn audio_path(&self, job: &DialerJob) -> PathBuf {
        self.sounds_dir.join(job.audio_file_name())
    }

    /// Where the job's descriptor becomes visible to the dialer.
    pub fn descriptor_path(&self, job: &DialerJob) -> PathBuf {
        self.spool_dir.join(job.descriptor_file_name())
    }

    /// Staging name the descriptor is written under before the rename.
    fn tmp_descriptor_path(&self, job: &DialerJob) -> PathBuf {
        self.spool_dir
            .join(format!("{}.tmp", job.descriptor_file_name()))
    }

    /// Writes the audio artifact and then the job descriptor.
    ///
    /// Ordering is a correctness invariant: the dialer may pick up the
    /// descriptor the instant it appears, so the audio is fully written and
    /// flushed first, and the descriptor goes through a `.tmp` name in the
    /// spool directory followed by an atomic rename. If anything fails after
    /// the audio write, the audio file is removed before returning — a
    /// descriptor must never reference missing audio, and a failed request
    /// must leave no artifacts at all.
    pub async fn write_job(&self, job: &DialerJob, audio: &[u8]) -> Result<(), SpoolError> {
        let audio_path = self.audio_path(job);
        let descriptor_path = self.descriptor_path(job);

        // Refuse up front if the final descriptor name is taken; rename
        // would clobber it otherwise.
        if fs::try_exists(&descriptor_path).await? {
            return Err(SpoolError::Collision(descriptor_path));
        }

        self.write_audio(&audio_path, audio).await?;

        if let Err(e) = self.publish_descriptor(job, &descriptor_path).await {
            if let Err(cleanup) = fs::remove_file(&audio_path).await {
                tracing::warn!(path = %audio_path.display(), error = %cleanup,
                    "failed to remove audio after descriptor write failure");
            }
            return Err(e);
        }

        tracing::info!(
            job_id = %job.job_id,
            descriptor = %descriptor_path.display(),
            "dialer job spooled"
        );
        Ok(())
    }

    async fn write_audio(&self, path: &Path, audio: &[u8]) -> Result<(), SpoolError> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    SpoolError::Collision(path.to_path_buf())
                } else {
                    SpoolError::Io(e)
                }
            })?;

        let write = async {
            file.write_all(audio).await?;
            file.sync_all().await
        };
        if let Err(e) = write.await {
            drop(file);
            let _ = fs::remove_file(path).await;
            return Err(SpoolError::Io(e));
        }
        Ok(())
    }

    async fn publish_descriptor(
        &self,
        job: &DialerJob,
        descriptor_path: &Path,
    ) -> Result<(), SpoolError> {
        // Same directory as the final name so the rename cannot cross a
        // filesystem boundary.
        let tmp_path = self.tmp_descriptor_path(job);

        let result = async {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&tmp_path)
                .await?;
            file.write_all(job.render_descriptor().as_bytes()).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp_path, descriptor_path).await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(SpoolError::Io(e));
        }
        Ok(())
    }

    /// Best-effort removal of everything a job may have left short of a
    /// visible descriptor: the audio artifact and the staged `.tmp`
    /// descriptor.
    ///
    /// Used when a write is abandoned mid-flight — a stage deadline firing
    /// or the caller disconnecting can drop `write_job` between any two of
    /// its steps, skipping its internal cleanup. Missing files are not
    /// errors. If the descriptor already became visible (the dropped
    /// write's rename can still land, since filesystem ops run on the
    /// blocking pool), nothing is removed at all: the dialer owns the job
    /// and its audio from that instant.
    pub async fn remove_artifacts(&self, job: &DialerJob) {
        if fs::try_exists(&self.descriptor_path(job))
            .await
            .unwrap_or(false)
        {
            tracing::warn!(job_id = %job.job_id, "descriptor already visible, leaving job to the dialer");
            return;
        }
        for path in [self.audio_path(job), self.tmp_descriptor_path(job)] {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove job artifact");
                }
            }
        }
    }

    /// Verifies both directories exist and are writable by creating and
    /// removing a probe file in each. Called once at startup; failure is
    /// fatal there, per the rule that an unwritable spool should prevent the
    /// server from starting rather than failing per-request.
    pub async fn check_writable(&self) -> Result<(), SpoolError> {
        for dir in [&self.spool_dir, &self.sounds_dir] {
            fs::create_dir_all(dir)
                .await
                .map_err(|_| SpoolError::NotWritable(dir.clone()))?;
            let probe = dir.join(format!("{}writable.probe", FILE_PREFIX));
            fs::write(&probe, b"probe")
                .await
                .map_err(|_| SpoolError::NotWritable(dir.clone()))?;
            fs::remove_file(&probe)
                .await
                .map_err(|_| SpoolError::NotWritable(dir.clone()))?;
        }
        Ok(())
    }

    /// Removes stale relay-created files older than `max_age`, returning
    /// how many were deleted.
    ///
    /// Two kinds accumulate: consumed audio in the sounds directory (the
    /// dialer never deletes what it plays) and `.tmp` descriptors stranded
    /// in the spool directory by a write abandoned between staging and
    /// rename. Only files carrying the relay's prefix are candidates;
    /// everything else in either directory is someone else's, and a final
    /// `.call` descriptor is never a candidate — once visible it belongs to
    /// the dialer.
    pub async fn sweep_stale_artifacts(&self, max_age: Duration) -> Result<usize, SpoolError> {
        let mut removed = 0;
        removed += self
            .sweep_dir(&self.sounds_dir, ".wav", max_age)
            .await?;
        removed += self
            .sweep_dir(&self.spool_dir, ".call.tmp", max_age)
            .await?;
        Ok(removed)
    }

    async fn sweep_dir(
        &self,
        dir: &Path,
        suffix: &str,
        max_age: Duration,
    ) -> Result<usize, SpoolError> {
        let mut removed = 0;
        let mut entries = fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(FILE_PREFIX) || !name.ends_with(suffix) {
                continue;
            }

            let Ok(metadata) = entry.metadata().await else { continue };
            if !metadata.is_file() {
                continue;
            }
            let stale = metadata
                .modified()
                .ok()
                .and_then(|mtime| mtime.elapsed().ok())
                .is_some_and(|age| age > max_age);
            if !stale {
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => {
                    tracing::debug!(file = name, "removed stale artifact");
                    removed += 1;
                }
                Err(e) => {
                    tracing::warn!(file = name, error = %e, "failed to remove stale artifact");
                }
            }
        }

        Ok(removed)
    }
}
