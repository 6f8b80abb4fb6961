//! Sequential synthesis of a list of chunks into audio files.
//!
//! The job only decides what to submit next; the engine thread performs the
//! submissions and feeds completions back in. At most one chunk is in flight
//! and a completion is only accepted for the identifier that was submitted
//! last.

use super::UtteranceId;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRequest {
    pub index: usize,
    pub text: String,
    pub target: PathBuf,
    pub id: UtteranceId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobProgress {
    /// The event was not meant for this job.
    Ignored,
    Submit(ChunkRequest),
    Finished(Vec<PathBuf>),
    Failed { index: usize, message: String },
}

#[derive(Debug)]
pub struct SynthesisJob {
    prefix: String,
    chunks: Vec<String>,
    targets: Vec<PathBuf>,
    index: usize,
    produced: Vec<PathBuf>,
    awaiting: Option<UtteranceId>,
}

impl SynthesisJob {
    /// One file per chunk, named `<base>-<index>.wav` inside `dir`.
    pub fn batch(prefix: impl Into<String>, chunks: Vec<String>, dir: &Path, base: &str) -> Self {
        let targets = (0..chunks.len())
            .map(|idx| dir.join(format!("{base}-{idx}.wav")))
            .collect();
        Self::with_targets(prefix.into(), chunks, targets)
    }

    pub fn single(prefix: impl Into<String>, text: String, target: PathBuf) -> Self {
        Self::with_targets(prefix.into(), vec![text], vec![target])
    }

    fn with_targets(prefix: String, chunks: Vec<String>, targets: Vec<PathBuf>) -> Self {
        Self {
            prefix,
            chunks,
            targets,
            index: 0,
            produced: Vec::new(),
            awaiting: None,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn produced(&self) -> &[PathBuf] {
        &self.produced
    }

    pub fn awaiting(&self) -> Option<&UtteranceId> {
        self.awaiting.as_ref()
    }

    pub fn start(&mut self) -> JobProgress {
        if self.chunks.is_empty() {
            return JobProgress::Finished(Vec::new());
        }
        self.submit_current()
    }

    pub fn on_done(&mut self, id: &UtteranceId) -> JobProgress {
        if self.awaiting.as_ref() != Some(id) {
            return JobProgress::Ignored;
        }
        self.awaiting = None;
        self.produced.push(self.targets[self.index].clone());
        self.index += 1;
        if self.index == self.chunks.len() {
            return JobProgress::Finished(self.produced.clone());
        }
        self.submit_current()
    }

    pub fn on_failed(&mut self, id: &UtteranceId, message: &str) -> JobProgress {
        if self.awaiting.as_ref() != Some(id) {
            return JobProgress::Ignored;
        }
        self.awaiting = None;
        JobProgress::Failed {
            index: self.index,
            message: message.to_string(),
        }
    }

    fn submit_current(&mut self) -> JobProgress {
        let id = UtteranceId::new(format!("{}-{}", self.prefix, self.index));
        self.awaiting = Some(id.clone());
        JobProgress::Submit(ChunkRequest {
            index: self.index,
            text: self.chunks[self.index].clone(),
            target: self.targets[self.index].clone(),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted(progress: JobProgress) -> ChunkRequest {
        match progress {
            JobProgress::Submit(request) => request,
            other => panic!("expected a submission, got {other:?}"),
        }
    }

    fn three_chunk_job() -> SynthesisJob {
        let chunks = vec!["one ".to_string(), "two ".to_string(), "three".to_string()];
        SynthesisJob::batch("job7", chunks, Path::new("/audio"), "notes")
    }

    #[test]
    fn chunks_are_submitted_one_after_another() {
        let mut job = three_chunk_job();
        let first = submitted(job.start());
        assert_eq!(first.index, 0);
        assert_eq!(first.target, PathBuf::from("/audio/notes-0.wav"));
        assert_eq!(job.awaiting(), Some(&first.id));

        let second = submitted(job.on_done(&first.id));
        assert_eq!(second.index, 1);
        assert_eq!(second.text, "two ");
        let third = submitted(job.on_done(&second.id));
        assert_eq!(
            job.on_done(&third.id),
            JobProgress::Finished(vec![
                PathBuf::from("/audio/notes-0.wav"),
                PathBuf::from("/audio/notes-1.wav"),
                PathBuf::from("/audio/notes-2.wav"),
            ])
        );
    }

    #[test]
    fn failure_stops_the_job_and_keeps_earlier_files() {
        let mut job = three_chunk_job();
        let first = submitted(job.start());
        let second = submitted(job.on_done(&first.id));
        assert_eq!(
            job.on_failed(&second.id, "disk full"),
            JobProgress::Failed {
                index: 1,
                message: "disk full".to_string()
            }
        );
        assert_eq!(job.produced(), [PathBuf::from("/audio/notes-0.wav")]);
        assert_eq!(job.awaiting(), None);
        // A late completion for the failed chunk changes nothing.
        assert_eq!(job.on_done(&second.id), JobProgress::Ignored);
    }

    #[test]
    fn stale_and_foreign_completions_are_ignored() {
        let mut job = three_chunk_job();
        let first = submitted(job.start());
        assert_eq!(
            job.on_done(&UtteranceId::new("job6-0")),
            JobProgress::Ignored
        );
        assert_eq!(
            job.on_failed(&UtteranceId::new("speak-3"), "boom"),
            JobProgress::Ignored
        );
        let second = submitted(job.on_done(&first.id));
        assert_eq!(job.on_done(&first.id), JobProgress::Ignored);
        assert_eq!(job.awaiting(), Some(&second.id));
    }

    #[test]
    fn single_target_job() {
        let mut job = SynthesisJob::single("one", "hi".to_string(), PathBuf::from("/tmp/x.wav"));
        assert_eq!(job.chunk_count(), 1);
        let request = submitted(job.start());
        assert_eq!(
            job.on_done(&request.id),
            JobProgress::Finished(vec![PathBuf::from("/tmp/x.wav")])
        );
    }
}
