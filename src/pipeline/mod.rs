//! Generation pipeline.
//!
//! Orchestrates discover → parse → merge → render → write. Parsing fans out
//! over a bounded pool of OS threads; workers send owned per-file results
//! over a channel and a single consumer folds them, so no stage shares a
//! mutable aggregate. Any parse or read failure fails the whole run; write
//! failures are logged per file and surfaced in the report.

pub mod walker;

use crate::config::{OutputMode, ParserBackendKind, Settings};
use crate::error::{GenerateError, GenerateResult, MergeConflict};
use crate::merge::merge_entities;
use crate::model::Entity;
use crate::parsing::{
    AnnotationMatcher, ParsedSource, QueryParser, SourceParser, SyntaxTreeParser,
};
use crate::render::{self, MockRenderer};
use crossbeam_channel::bounded;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Outcome of one generation run.
#[derive(Debug, Default)]
pub struct GenerateReport {
    pub files_scanned: usize,
    pub entities_found: usize,
    pub mocks_rendered: usize,
    pub files_written: Vec<PathBuf>,
    pub warnings: Vec<MergeConflict>,
    pub write_failures: Vec<GenerateError>,
    pub elapsed: Duration,
}

/// Parse `paths` on a bounded worker pool.
///
/// Each worker builds its own parser from `factory`; results come back over
/// a channel and are folded here, in the calling thread. Every file is
/// attempted even after a failure, so diagnostics cover the whole input set,
/// but the first error still fails the call.
pub fn parse_sources<P, F>(
    paths: &[PathBuf],
    workers: usize,
    matcher: &AnnotationMatcher,
    factory: F,
) -> GenerateResult<Vec<ParsedSource>>
where
    P: SourceParser + Send,
    F: Fn() -> GenerateResult<P> + Send + Sync,
{
    if paths.is_empty() {
        return Ok(Vec::new());
    }
    let workers = workers.clamp(1, paths.len());
    debug!(target: "pipeline", "parsing {} files on {} workers", paths.len(), workers);

    std::thread::scope(|scope| {
        let (path_tx, path_rx) = bounded::<&PathBuf>(workers * 2);
        let (result_tx, result_rx) = bounded::<GenerateResult<ParsedSource>>(workers * 2);
        let factory = &factory;

        let feeder = scope.spawn(move || {
            for path in paths {
                if path_tx.send(path).is_err() {
                    break;
                }
            }
        });

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let path_rx = path_rx.clone();
            let result_tx = result_tx.clone();
            handles.push(scope.spawn(move || {
                let mut parser = match factory() {
                    Ok(parser) => parser,
                    Err(e) => {
                        let _ = result_tx.send(Err(e));
                        return;
                    }
                };
                while let Ok(path) = path_rx.recv() {
                    let _ = result_tx.send(parser.parse_file(path, matcher));
                }
            }));
        }
        // The fold below must observe channel closure once workers finish.
        drop(path_rx);
        drop(result_tx);

        let mut sources = Vec::with_capacity(paths.len());
        let mut first_error: Option<GenerateError> = None;
        while let Ok(result) = result_rx.recv() {
            match result {
                Ok(source) => sources.push(source),
                Err(e) => {
                    error!(target: "pipeline", "{e}");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        handles.push(feeder);
        for handle in handles {
            if handle.join().is_err() {
                return Err(GenerateError::WorkerPanic);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                sources.sort_by(|a, b| a.path.cmp(&b.path));
                Ok(sources)
            }
        }
    })
}

/// Runs the full pipeline with loaded settings.
pub struct Generator {
    settings: Settings,
}

impl Generator {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Scan `roots`, generate mocks, write output per configuration.
    pub fn run(&self, roots: &[PathBuf]) -> GenerateResult<GenerateReport> {
        let start = Instant::now();
        let generation = &self.settings.generation;
        if generation.annotation.trim().is_empty() {
            return Err(GenerateError::InvalidConfig(
                "annotation marker must not be empty".to_string(),
            ));
        }

        let paths = walker::discover_sources(roots, generation);
        let workers = generation.effective_workers(paths.len());
        info!(target: "pipeline", "scanning {} files with {} workers", paths.len(), workers);

        let matcher = AnnotationMatcher::new(&generation.annotation);
        let sources = match generation.parser {
            ParserBackendKind::Syntax => {
                parse_sources(&paths, workers, &matcher, SyntaxTreeParser::new)?
            }
            ParserBackendKind::Query => {
                parse_sources(&paths, workers, &matcher, QueryParser::new)?
            }
        };

        let mut imports: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();
        let mut entities: Vec<Entity> = Vec::new();
        for source in sources {
            imports.insert(source.path.clone(), source.imports);
            entities.extend(source.entities);
        }
        let entities_found = entities.len();

        let outcome = merge_entities(entities, &imports, &generation.module_precedence);
        let mut eligible: Vec<Entity> = outcome
            .entities
            .into_iter()
            .filter(|e| e.annotated)
            .collect();
        if !generation.sort_output {
            eligible.sort_by(|a, b| a.path.cmp(&b.path).then(a.offset.cmp(&b.offset)));
        }

        let renderer = MockRenderer::new(generation);
        let mut report = GenerateReport {
            files_scanned: paths.len(),
            entities_found,
            mocks_rendered: eligible.len(),
            warnings: outcome.warnings,
            ..GenerateReport::default()
        };

        match generation.output.mode {
            OutputMode::SingleFile => {
                let file_imports: BTreeSet<String> = eligible
                    .iter()
                    .filter_map(|e| imports.get(&e.path))
                    .flatten()
                    .cloned()
                    .collect();
                let content = renderer.render_file(&eligible, &file_imports);
                self.write_output(&generation.output.path, &content, &mut report);
            }
            OutputMode::PerEntity => {
                for entity in &eligible {
                    let file_imports: BTreeSet<String> = imports
                        .get(&entity.path)
                        .map(|i| i.iter().cloned().collect())
                        .unwrap_or_default();
                    let content = renderer.render_file(std::slice::from_ref(entity), &file_imports);
                    let path = generation
                        .output
                        .path
                        .join(format!("{}Mock.swift", render::mock_type_name(&entity.name)));
                    self.write_output(&path, &content, &mut report);
                }
            }
        }

        report.elapsed = start.elapsed();
        info!(
            target: "pipeline",
            "generated {} mocks from {} entities in {:.2?}",
            report.mocks_rendered, report.entities_found, report.elapsed
        );
        Ok(report)
    }

    /// Write one output file. Failures are logged and recorded, never fatal.
    fn write_output(&self, path: &Path, content: &str, report: &mut GenerateReport) {
        let result = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(std::fs::create_dir_all)
            .unwrap_or(Ok(()))
            .and_then(|()| std::fs::write(path, content));
        match result {
            Ok(()) => report.files_written.push(path.to_path_buf()),
            Err(source) => {
                let err = GenerateError::OutputWrite {
                    path: path.to_path_buf(),
                    source,
                };
                error!(target: "pipeline", "{err}");
                report.write_failures.push(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingParser<'a> {
        active: &'a AtomicUsize,
        peak: &'a AtomicUsize,
        parsed: &'a AtomicUsize,
    }

    impl SourceParser for CountingParser<'_> {
        fn parse_source(
            &mut self,
            _code: &str,
            path: &Path,
            _matcher: &AnnotationMatcher,
        ) -> GenerateResult<ParsedSource> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.parsed.fetch_add(1, Ordering::SeqCst);
            Ok(ParsedSource {
                path: path.to_path_buf(),
                entities: Vec::new(),
                imports: Vec::new(),
            })
        }

        fn parse_file(
            &mut self,
            path: &Path,
            matcher: &AnnotationMatcher,
        ) -> GenerateResult<ParsedSource> {
            // No disk in this test; paths are synthetic.
            self.parse_source("", path, matcher)
        }

        fn backend_name(&self) -> &'static str {
            "counting"
        }
    }

    #[test]
    fn worker_pool_respects_concurrency_bound() {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let parsed = AtomicUsize::new(0);
        let paths: Vec<PathBuf> = (0..24).map(|i| PathBuf::from(format!("{i}.swift"))).collect();
        let matcher = AnnotationMatcher::new("@mockable");

        let sources = parse_sources(&paths, 3, &matcher, || {
            Ok(CountingParser {
                active: &active,
                peak: &peak,
                parsed: &parsed,
            })
        })
        .unwrap();

        assert_eq!(sources.len(), 24);
        assert_eq!(parsed.load(Ordering::SeqCst), 24);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn results_are_sorted_regardless_of_completion_order() {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let parsed = AtomicUsize::new(0);
        let paths: Vec<PathBuf> = (0..10).map(|i| PathBuf::from(format!("{i:02}.swift"))).collect();
        let matcher = AnnotationMatcher::new("@mockable");

        let sources = parse_sources(&paths, 4, &matcher, || {
            Ok(CountingParser {
                active: &active,
                peak: &peak,
                parsed: &parsed,
            })
        })
        .unwrap();

        let out: Vec<&PathBuf> = sources.iter().map(|s| &s.path).collect();
        let mut expected: Vec<&PathBuf> = paths.iter().collect();
        expected.sort();
        assert_eq!(out, expected);
    }

    struct FailingParser;

    impl SourceParser for FailingParser {
        fn parse_source(
            &mut self,
            _code: &str,
            path: &Path,
            _matcher: &AnnotationMatcher,
        ) -> GenerateResult<ParsedSource> {
            if path.to_string_lossy().contains("bad") {
                Err(GenerateError::Parse {
                    path: path.to_path_buf(),
                    reason: "broken".into(),
                })
            } else {
                Ok(ParsedSource {
                    path: path.to_path_buf(),
                    entities: Vec::new(),
                    imports: Vec::new(),
                })
            }
        }

        fn parse_file(
            &mut self,
            path: &Path,
            matcher: &AnnotationMatcher,
        ) -> GenerateResult<ParsedSource> {
            self.parse_source("", path, matcher)
        }

        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn any_parse_failure_fails_the_run() {
        let paths = vec![
            PathBuf::from("good.swift"),
            PathBuf::from("bad.swift"),
            PathBuf::from("fine.swift"),
        ];
        let matcher = AnnotationMatcher::new("@mockable");
        let err = parse_sources(&paths, 2, &matcher, || Ok(FailingParser)).unwrap_err();
        assert!(matches!(err, GenerateError::Parse { .. }));
    }

    #[test]
    fn empty_annotation_is_rejected() {
        let mut settings = Settings::default();
        settings.generation.annotation = "  ".to_string();
        let err = Generator::new(settings).run(&[]).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidConfig(_)));
    }
}
