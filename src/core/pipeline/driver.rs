//! Pipeline orchestration.
//!
//! Coordinates a run end to end:
//! 1. Enumerate inputs (or read a dump snapshot)
//! 2. Back up and load the prior output log
//! 3. Hash, plan, compute and merge each input on a bounded worker pool
//! 4. Append finished documents through a single writer
//!
//! Failures of a single input are logged and counted; the batch
//! continues and the log keeps only whole lines.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::core::config::Config;
use crate::core::error::{CadenzaError, Result};
use crate::core::hasher::{hash_bytes, hash_file};
use crate::core::input::{AudioClip, ParsedInput, Score};
use crate::core::metadata::MetadataSource;
use crate::core::pipeline::dump::{self, DumpRecord};
use crate::core::pipeline::merger::{FreshResult, IncrementalMerger, MergePlan};
use crate::core::pipeline::output_log::{ExistingOutputIndex, OutputLog, RunMarker};
use crate::core::pipeline::walker::{FileWalker, InputFile};
use crate::core::registry::ProcessorRegistry;
use crate::core::types::{Document, Domain, FileOutcome, OverwriteSet, RunStats};

/// Parameters of a directory run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input_dir: PathBuf,

    /// Output log file
    pub log_path: PathBuf,

    pub corpus_id: String,
    pub overwrite: OverwriteSet,

    /// Embed the MusicXML source in symbolic documents
    pub include_original: bool,
}

/// Parameters of a dump reprocessing run
#[derive(Debug, Clone)]
pub struct DumpOptions {
    pub dump_path: PathBuf,

    /// Output log file
    pub log_path: PathBuf,

    /// Corpus assigned to every document; the record's own when `None`
    pub corpus_id: Option<String>,

    /// Reprocess only records of this corpus
    pub corpus_filter: Option<String>,
}

/// Unit of work for one worker
enum Job {
    File(InputFile),
    Record(DumpRecord),
}

impl Job {
    fn path(&self) -> PathBuf {
        match self {
            Job::File(file) => file.path.clone(),
            Job::Record(record) => PathBuf::from(&record.filename),
        }
    }
}

/// Shared read-only state of a run
struct JobContext {
    registry: Arc<ProcessorRegistry>,
    metadata: Arc<dyn MetadataSource>,
    merger: IncrementalMerger,
    index: ExistingOutputIndex,
    corpus_id: Option<String>,
    include_original: bool,
    max_audio_duration_sec: u64,
}

/// A finished document and how it came about
struct Processed {
    document: Document,
    outcome: FileOutcome,
}

/// Runs the feature pipeline over a directory or a dump snapshot
pub struct PipelineDriver {
    config: Arc<Config>,
    registry: Arc<ProcessorRegistry>,
    metadata: Arc<dyn MetadataSource>,
    cancel: CancellationToken,
}

impl PipelineDriver {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<ProcessorRegistry>,
        metadata: Arc<dyn MetadataSource>,
    ) -> Self {
        Self {
            config,
            registry,
            metadata,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops dispatching further files when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Process every input file of a directory
    ///
    /// # Arguments
    ///
    /// * `options` - Input directory, log path, corpus and overwrite set
    ///
    /// # Returns
    ///
    /// Run statistics, or a configuration error raised before any file
    /// is touched
    pub async fn run(&self, options: &RunOptions) -> Result<RunStats> {
        let start = Instant::now();

        // Step 1: Validate the request
        if options.corpus_id.trim().is_empty() {
            return Err(CadenzaError::ConfigError(
                "Corpus id must be non-empty".to_string(),
            ));
        }
        self.registry.validate_overwrite(&options.overwrite)?;

        // Step 2: Enumerate inputs
        let walker = FileWalker::from_config(&self.config.pipeline)?;
        tracing::info!("Collecting input files from {:?}", options.input_dir);
        let files = walker.collect_files(&options.input_dir)?;
        tracing::info!("Found {} input files", files.len());

        // Step 3: Back up, load and truncate the output log
        let log = OutputLog::new(&options.log_path, &self.config.output);
        let prepared = log.prepare(&RunMarker::new(&options.corpus_id, &options.overwrite))?;

        let context = JobContext {
            registry: Arc::clone(&self.registry),
            metadata: Arc::clone(&self.metadata),
            merger: IncrementalMerger::new(Arc::clone(&self.registry), options.overwrite.clone()),
            index: prepared.index,
            corpus_id: Some(options.corpus_id.clone()),
            include_original: options.include_original,
            max_audio_duration_sec: self.config.pipeline.max_audio_duration_sec,
        };

        // Step 4: Process
        let jobs = files.into_iter().map(Job::File).collect();
        let mut stats = self.execute(jobs, context, &log).await?;
        stats.resumed = prepared.resumed;

        self.complete(&log, &mut stats, start)?;
        Ok(stats)
    }

    /// Rebuild a fresh log from the embedded sources of a dump snapshot
    ///
    /// Every symbolic processor runs on every record; the record's
    /// `original_file` and metadata are carried over.
    pub async fn reprocess_dump(&self, options: &DumpOptions) -> Result<RunStats> {
        let start = Instant::now();

        // Step 1: Read the snapshot
        let records = dump::read(&options.dump_path, options.corpus_filter.as_deref())?;

        // Step 2: Back up and truncate the output log
        let log = OutputLog::new(&options.log_path, &self.config.output);
        let marker = RunMarker::new(
            options.corpus_id.as_deref().unwrap_or_default(),
            &OverwriteSet::All,
        );
        let prepared = log.prepare(&marker)?;

        let context = JobContext {
            registry: Arc::clone(&self.registry),
            metadata: Arc::clone(&self.metadata),
            merger: IncrementalMerger::new(Arc::clone(&self.registry), OverwriteSet::All),
            index: ExistingOutputIndex::new(),
            corpus_id: options.corpus_id.clone(),
            include_original: true,
            max_audio_duration_sec: self.config.pipeline.max_audio_duration_sec,
        };

        // Step 3: Process
        let jobs = records.into_iter().map(Job::Record).collect();
        let mut stats = self.execute(jobs, context, &log).await?;
        stats.resumed = prepared.resumed;

        self.complete(&log, &mut stats, start)?;
        Ok(stats)
    }

    fn complete(&self, log: &OutputLog, stats: &mut RunStats, start: Instant) -> Result<()> {
        stats.duration_ms = start.elapsed().as_millis() as u64;

        // An interrupted run leaves its marker behind for the next one
        if !stats.cancelled {
            log.finish()?;
        }

        tracing::info!(
            "Run complete: {} new, {} merged, {} failed, {} skipped, \
             {} documents written in {}ms",
            stats.files_new,
            stats.files_merged,
            stats.files_failed,
            stats.files_skipped,
            stats.documents_written,
            stats.duration_ms
        );
        Ok(())
    }

    /// Run jobs on the worker pool and write their documents
    async fn execute(&self, jobs: Vec<Job>, context: JobContext, log: &OutputLog) -> Result<RunStats> {
        let total = jobs.len();
        let mut stats = RunStats {
            files_found: total,
            ..RunStats::default()
        };

        let context = Arc::new(context);
        let workers = self.config.pipeline.workers.max(1);
        let limit = Duration::from_secs(self.config.pipeline.file_timeout_sec);
        let semaphore = Arc::new(Semaphore::new(workers));
        let (tx, mut rx) = mpsc::channel::<Document>(workers * 2);

        // Single writer owns the log file
        let mut writer = log.writer().await?;
        let writer_task = tokio::spawn(async move {
            let mut seen = HashSet::new();
            while let Some(document) = rx.recv().await {
                if !seen.insert(document.content_hash.clone()) {
                    tracing::debug!(
                        "{} has the same content as an earlier input ({})",
                        document.filename,
                        document.content_hash
                    );
                }
                writer.append(&document).await?;
            }
            Ok::<usize, CadenzaError>(writer.written())
        });

        let mut handles = Vec::with_capacity(total);

        for (i, job) in jobs.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                stats.cancelled = true;
                stats.files_skipped = total - i;
                tracing::warn!("Run cancelled, {} inputs not dispatched", total - i);
                break;
            };

            let context = Arc::clone(&context);
            let tx = tx.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let path = job.path();

                match run_job(context, job, limit).await {
                    Ok(processed) => {
                        tracing::info!(
                            "[{}/{}] {} ({:?})",
                            i + 1,
                            total,
                            path.display(),
                            processed.outcome
                        );
                        if tx.send(processed.document).await.is_err() {
                            tracing::error!("Output writer stopped; dropping {}", path.display());
                            return None;
                        }
                        Some(processed.outcome)
                    }
                    Err(e) if e.is_per_file() => {
                        tracing::warn!("[{}/{}] Skipping {}: {}", i + 1, total, path.display(), e);
                        None
                    }
                    Err(e) => {
                        tracing::error!("[{}/{}] Failed to process {}: {}", i + 1, total, path.display(), e);
                        None
                    }
                }
            }));
        }
        drop(tx);

        for handle in handles {
            match handle.await {
                Ok(Some(FileOutcome::New)) => stats.files_new += 1,
                Ok(Some(FileOutcome::Merged)) => stats.files_merged += 1,
                Ok(None) => stats.files_failed += 1,
                Err(e) => {
                    tracing::error!("Worker task failed: {}", e);
                    stats.files_failed += 1;
                }
            }
        }

        stats.documents_written = writer_task.await.map_err(std::io::Error::other)??;

        Ok(stats)
    }
}

/// Run one job on the blocking pool under the per-file timeout
///
/// On timeout the blocking computation is abandoned, not interrupted.
async fn run_job(context: Arc<JobContext>, job: Job, limit: Duration) -> Result<Processed> {
    let path = job.path();
    let task = tokio::task::spawn_blocking(move || match &job {
        Job::File(file) => process_file(&context, file),
        Job::Record(record) => process_record(&context, record),
    });

    match tokio::time::timeout(limit, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(CadenzaError::processor("worker", format!("task aborted: {e}"))),
        Err(_) => Err(CadenzaError::Timeout(path, limit.as_secs())),
    }
}

/// Hash, plan, compute and merge one input file
fn process_file(context: &JobContext, file: &InputFile) -> Result<Processed> {
    // Step 1: Identity from the raw bytes
    let (content_hash, text) = match file.domain {
        Domain::Symbolic => {
            let bytes = fs::read(&file.path)
                .map_err(|e| CadenzaError::parse(&file.path, format!("cannot read file: {e}")))?;
            let hash = hash_bytes(&bytes);
            let text = String::from_utf8(bytes)
                .map_err(|_| CadenzaError::parse(&file.path, "file is not valid UTF-8"))?;
            (hash, Some(text))
        }
        Domain::Audio => (hash_file(&file.path)?, None),
    };

    // Step 2: Decide what to compute
    let existing = context.index.get(&content_hash);
    let plan = context.merger.plan(file.domain, existing);

    // Step 3: Parse and run the selected processors
    let features = if plan.is_empty() {
        tracing::debug!("Nothing to recompute for {:?}", file.path);
        Map::new()
    } else {
        let input = match &text {
            Some(text) => ParsedInput::Symbolic(Score::parse(text, &file.path)?),
            None => ParsedInput::Audio(AudioClip::decode(
                &file.path,
                context.max_audio_duration_sec,
            )?),
        };
        compute_features(&context.registry, &input, &plan)?
    };

    // Step 4: Merge with the prior document
    let fresh = FreshResult {
        filename: file.filename(),
        content_hash,
        features,
        metadata: plan
            .compute_metadata
            .then(|| context.metadata.lookup(&file.path)),
        original_file: text.filter(|_| context.include_original),
    };
    let corpus_id = context.corpus_id.as_deref().unwrap_or_default();
    let document = context.merger.merge(fresh, existing, corpus_id);

    Ok(Processed {
        document,
        outcome: plan.outcome,
    })
}

/// Recompute every symbolic bucket from a dump record's embedded source
fn process_record(context: &JobContext, record: &DumpRecord) -> Result<Processed> {
    let path = PathBuf::from(&record.filename);
    let content_hash = hash_bytes(record.original_file.as_bytes());
    if let Some(id) = &record.id {
        tracing::debug!("Reprocessing record {} ({})", id, record.filename);
    }

    let plan = context.merger.plan(Domain::Symbolic, None);
    let score = Score::parse(&record.original_file, &path)?;
    let features = compute_features(&context.registry, &ParsedInput::Symbolic(score), &plan)?;

    let metadata = if record.metadata.is_empty() {
        context.metadata.lookup(&path)
    } else {
        record.metadata.clone()
    };

    let fresh = FreshResult {
        filename: record.filename.clone(),
        content_hash,
        features,
        metadata: Some(metadata),
        original_file: Some(record.original_file.clone()),
    };

    let corpus_id = context
        .corpus_id
        .as_deref()
        .or(record.corpus_id.as_deref())
        .unwrap_or_default();

    Ok(Processed {
        document: context.merger.merge(fresh, None, corpus_id),
        outcome: plan.outcome,
    })
}

/// Run the processors a plan selects, grouped into buckets
///
/// Buckets and algorithms appear in registry order. The first failing
/// processor fails the whole input.
pub fn compute_features(
    registry: &ProcessorRegistry,
    input: &ParsedInput,
    plan: &MergePlan,
) -> Result<Map<String, Value>> {
    let mut features = Map::new();

    for processor in registry.processors_for(input.domain()) {
        if !plan.computes(processor.feature_name()) {
            continue;
        }

        let value = processor.run(input)?;
        tracing::debug!("Computed {}", processor.qualified_name());

        let bucket = features
            .entry(processor.feature_name())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(bucket) = bucket {
            bucket.insert(processor.algorithm_name().to_string(), value);
        }
    }

    Ok(features)
}
