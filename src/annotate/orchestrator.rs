use crate::annotate::batch::GeneBatch;
use crate::annotate::table::{AnnotationTable, ColumnCollision};
use crate::annotate::{FASTA_COL, GENE_ID_COL};
use crate::kits::{DatabaseKit, SearchContext};
use crate::tools::traits::SequenceSearch;
use crate::utils::parallel::build_pool;
use crate::utils::progress::{ProgressEvent, ProgressReporter, ProgressSender};
use crate::{AnnotError, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Split of the thread budget between batches and each kit's own search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadPlan {
    /// Batches processed at once
    pub batch_workers: usize,
    /// Threads handed to each external search call
    pub kit_threads: usize,
}

impl ThreadPlan {
    /// Fewer batches than threads: batches run one after another and each
    /// search gets every thread. Otherwise every thread takes a batch and
    /// searches run single-threaded.
    pub fn new(total_threads: usize, batches: usize) -> Self {
        let total = total_threads.max(1);
        if batches < total {
            Self {
                batch_workers: 1,
                kit_threads: total,
            }
        } else {
            Self {
                batch_workers: total,
                kit_threads: 1,
            }
        }
    }

    /// Threads for one kit, respecting its own cap
    pub fn threads_for(&self, kit: &dyn DatabaseKit) -> usize {
        match kit.max_threads() {
            Some(cap) => self.kit_threads.min(cap).max(1),
            None => self.kit_threads,
        }
    }
}

/// Runs every configured kit over every gene batch
pub struct SearchOrchestrator<'a> {
    kits: &'a [Box<dyn DatabaseKit>],
    working_dir: PathBuf,
    plan: ThreadPlan,
    collision: ColumnCollision,
    show_progress: bool,
}

impl<'a> SearchOrchestrator<'a> {
    pub fn new(kits: &'a [Box<dyn DatabaseKit>], working_dir: &Path, plan: ThreadPlan) -> Self {
        Self {
            kits,
            working_dir: working_dir.to_path_buf(),
            plan,
            collision: ColumnCollision::Refuse,
            show_progress: false,
        }
    }

    /// Let later kits overwrite columns an earlier kit already produced
    pub fn with_force(mut self, force: bool) -> Self {
        self.collision = if force {
            ColumnCollision::Overwrite
        } else {
            ColumnCollision::Refuse
        };
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn plan(&self) -> ThreadPlan {
        self.plan
    }

    /// Build every batch's search index, at most once per batch
    pub fn build_indexes(&self, batches: &mut [GeneBatch], search: &dyn SequenceSearch) -> Result<()> {
        let pool = build_pool(self.plan.batch_workers, "index")
            .map_err(|e| AnnotError::Other(format!("Failed to build index pool: {}", e)))?;
        let threads = self.plan.kit_threads;
        pool.install(|| {
            batches
                .par_iter_mut()
                .try_for_each(|batch| batch.ensure_index(search, threads).map(|_| ()))
        })
    }

    /// Annotate one batch with every kit: outer-joined on gene id, with the
    /// batch name and local gene id attached and rows renamed `<batch>_<gene>`
    pub fn search_batch(&self, batch: &GeneBatch, progress: &ProgressSender) -> Result<AnnotationTable> {
        let mut combined = AnnotationTable::new();
        for kit in self.kits {
            let work_dir = self.working_dir.join(kit.name()).join(&batch.name);
            std::fs::create_dir_all(&work_dir)?;
            let ctx = SearchContext {
                threads: self.plan.threads_for(kit.as_ref()),
                work_dir,
            };

            progress.send(ProgressEvent::KitStarted {
                kit: kit.name().to_string(),
                batch: batch.name.clone(),
            });
            let table = kit.search(batch, &ctx)?;
            progress.send(ProgressEvent::KitFinished {
                kit: kit.name().to_string(),
                batch: batch.name.clone(),
                rows: table.len(),
            });
            combined = combined.join(table, self.collision)?;
        }

        combined.add_column(FASTA_COL);
        combined.add_column(GENE_ID_COL);
        let genes: Vec<String> = combined.row_ids().map(str::to_string).collect();
        for gene in &genes {
            combined.set(gene, FASTA_COL, batch.name.as_str());
            combined.set(gene, GENE_ID_COL, gene.as_str());
        }
        progress.send(ProgressEvent::BatchFinished {
            batch: batch.name.clone(),
            rows: combined.len(),
        });
        Ok(combined.prefix_rows(&batch.name))
    }

    /// Search all batches and stack their tables in batch order.
    ///
    /// Batches run on a pool of `batch_workers` threads; the first failing
    /// batch fails the whole run.
    pub fn run(&self, batches: &[GeneBatch]) -> Result<AnnotationTable> {
        let steps = (batches.len() * self.kits.len()) as u64;
        let (tx, rx) = crossbeam::channel::unbounded();
        let reporter = ProgressReporter::new(steps, !self.show_progress);

        let tables = std::thread::scope(|scope| {
            let handle = scope.spawn(move || reporter.run(rx));
            let sender = ProgressSender::new(tx);
            let tables = self.search_all(batches, &sender);
            drop(sender);
            if handle.join().is_err() {
                tracing::warn!("Progress reporter stopped unexpectedly");
            }
            tables
        })?;

        tables
            .into_iter()
            .try_fold(AnnotationTable::new(), |all, table| all.concat(table))
    }

    fn search_all(&self, batches: &[GeneBatch], progress: &ProgressSender) -> Result<Vec<AnnotationTable>> {
        let pool = build_pool(self.plan.batch_workers, "annotate")
            .map_err(|e| AnnotError::Other(format!("Failed to build search pool: {}", e)))?;
        pool.install(|| {
            batches
                .par_iter()
                .map(|batch| self.search_batch(batch, progress))
                .collect()
        })
    }

    /// Every kit's description columns for the combined table, joined onto it
    pub fn describe(&self, annotations: AnnotationTable) -> Result<AnnotationTable> {
        let mut described = annotations;
        for kit in self.kits {
            let descriptions = kit.get_descriptions(&described)?;
            if descriptions.num_columns() > 0 {
                tracing::debug!("{} added {} description columns", kit.name(), descriptions.num_columns());
            }
            described = described.join(descriptions, self.collision)?;
        }
        Ok(described)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kits::KitSettings;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    /// Kit returning a fixed set of local gene ids for every batch
    struct FixedKit {
        name: &'static str,
        genes: Vec<&'static str>,
        cap: Option<usize>,
    }

    impl DatabaseKit for FixedKit {
        fn name(&self) -> &str {
            self.name
        }

        fn formal_name(&self) -> &str {
            self.name
        }

        fn max_threads(&self) -> Option<usize> {
            self.cap
        }

        fn search(&self, batch: &GeneBatch, ctx: &SearchContext) -> Result<AnnotationTable> {
            let mut table = AnnotationTable::with_columns([format!("{}_id", self.name)]);
            for gene in &self.genes {
                table.set(gene, &format!("{}_id", self.name), format!("{}:{}:{}", batch.name, gene, ctx.threads));
            }
            Ok(table)
        }

        fn settings(&self) -> KitSettings {
            KitSettings::new("fixed")
        }
    }

    #[test_case(10, 2, 1, 10 ; "fewer batches than threads")]
    #[test_case(4, 4, 4, 1 ; "as many batches as threads")]
    #[test_case(2, 9, 2, 1 ; "more batches than threads")]
    #[test_case(0, 3, 1, 1 ; "zero threads treated as one")]
    fn test_thread_plan(threads: usize, batches: usize, workers: usize, kit_threads: usize) {
        let plan = ThreadPlan::new(threads, batches);
        assert_eq!(plan.batch_workers, workers);
        assert_eq!(plan.kit_threads, kit_threads);
    }

    #[test]
    fn test_kit_cap() {
        let plan = ThreadPlan::new(8, 1);
        let capped = FixedKit {
            name: "k",
            genes: vec![],
            cap: Some(2),
        };
        let free = FixedKit {
            name: "k",
            genes: vec![],
            cap: None,
        };
        assert_eq!(plan.threads_for(&capped), 2);
        assert_eq!(plan.threads_for(&free), 8);
    }

    #[test]
    fn test_batch_rows_are_prefixed_and_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let kits: Vec<Box<dyn DatabaseKit>> = vec![
            Box::new(FixedKit {
                name: "k1",
                genes: vec!["1", "2"],
                cap: None,
            }),
            Box::new(FixedKit {
                name: "k2",
                genes: vec!["2", "3"],
                cap: Some(1),
            }),
        ];
        let orchestrator = SearchOrchestrator::new(&kits, dir.path(), ThreadPlan::new(4, 1));
        let batch = GeneBatch::new("A", "A.faa", "idx");
        let table = orchestrator.search_batch(&batch, &ProgressSender::disabled()).unwrap();

        assert_eq!(table.row_ids().collect::<Vec<_>>(), vec!["A_1", "A_2", "A_3"]);
        assert_eq!(table.get("A_2", "k1_id"), Some("A:2:4"));
        assert_eq!(table.get("A_2", "k2_id"), Some("A:2:1"));
        assert_eq!(table.get("A_1", "k2_id"), None);
        assert_eq!(table.get("A_3", FASTA_COL), Some("A"));
        assert_eq!(table.get("A_3", GENE_ID_COL), Some("3"));
        assert!(dir.path().join("k1/A").is_dir());
    }

    #[test]
    fn test_duplicate_kit_columns_refused_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let kits: Vec<Box<dyn DatabaseKit>> = vec![
            Box::new(FixedKit {
                name: "k1",
                genes: vec!["1"],
                cap: None,
            }),
            Box::new(FixedKit {
                name: "k1",
                genes: vec!["1"],
                cap: None,
            }),
        ];
        let batch = GeneBatch::new("A", "A.faa", "idx");
        let refused = SearchOrchestrator::new(&kits, dir.path(), ThreadPlan::new(1, 1))
            .search_batch(&batch, &ProgressSender::disabled());
        assert!(matches!(refused, Err(AnnotError::Usage(_))));

        let forced = SearchOrchestrator::new(&kits, dir.path(), ThreadPlan::new(1, 1))
            .with_force(true)
            .search_batch(&batch, &ProgressSender::disabled());
        assert!(forced.is_ok());
    }

    #[test]
    fn test_run_stacks_batches_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let kits: Vec<Box<dyn DatabaseKit>> = vec![Box::new(FixedKit {
            name: "k1",
            genes: vec!["1", "2"],
            cap: None,
        })];
        let batches = vec![
            GeneBatch::new("A", "A.faa", "a"),
            GeneBatch::new("B", "B.faa", "b"),
            GeneBatch::new("C", "C.faa", "c"),
        ];
        let table = SearchOrchestrator::new(&kits, dir.path(), ThreadPlan::new(3, batches.len()))
            .run(&batches)
            .unwrap();
        assert_eq!(
            table.row_ids().collect::<Vec<_>>(),
            vec!["A_1", "A_2", "B_1", "B_2", "C_1", "C_2"]
        );
    }
}
