use crate::annotate::batch::GeneBatch;
use crate::kits::{KitContext, SearchContext};
use crate::tools::traits::{DomainHit, ProfileSearch};
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A pressed profile HMM database searched with every gene of a batch
pub struct ProfileDb {
    hmm: PathBuf,
    profile: Arc<dyn ProfileSearch>,
}

impl ProfileDb {
    /// Prepares (presses) the profiles up front so a broken database fails before any search
    pub fn new(hmm: &Path, ctx: &KitContext) -> Result<Self> {
        ctx.profile.prepare_profiles(hmm)?;
        Ok(Self {
            hmm: hmm.to_path_buf(),
            profile: Arc::clone(&ctx.profile),
        })
    }

    pub fn hmm(&self) -> &Path {
        &self.hmm
    }

    pub fn search(&self, batch: &GeneBatch, ctx: &SearchContext) -> Result<Vec<DomainHit>> {
        self.profile
            .search(&batch.faa, &self.hmm, &ctx.work_dir, ctx.threads)
    }
}
