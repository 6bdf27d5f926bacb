pub mod hmmer;
pub mod mmseqs;
pub mod process;
pub mod traits;

pub use hmmer::Hmmer;
pub use mmseqs::Mmseqs2;
pub use traits::{AlignmentHit, DomainHit, ProfileSearch, SeqIndex, SequenceSearch};

use std::sync::Arc;

/// The search primitives one run uses
#[derive(Clone)]
pub struct SearchTools {
    pub search: Arc<dyn SequenceSearch>,
    pub profile: Arc<dyn ProfileSearch>,
}

impl SearchTools {
    pub fn new(search: Arc<dyn SequenceSearch>, profile: Arc<dyn ProfileSearch>) -> Self {
        Self { search, profile }
    }

    /// MMseqs2 and HMMER found on `PATH` or through their environment overrides
    pub fn system() -> Self {
        Self::new(Arc::new(Mmseqs2::new()), Arc::new(Hmmer::new()))
    }
}
