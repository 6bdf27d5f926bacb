/// Thread pool utilities

pub fn configure_thread_pool(threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(effective_threads(threads))
        .build_global()
}

/// A dedicated pool for one stage of a run
pub fn build_pool(threads: usize, name: &'static str) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(effective_threads(threads))
        .thread_name(move |i| format!("{}-{}", name, i))
        .build()
}

/// `0` means one thread per CPU
pub fn effective_threads(threads: usize) -> usize {
    if threads == 0 {
        num_cpus::get()
    } else {
        threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_threads() {
        assert_eq!(effective_threads(3), 3);
        assert!(effective_threads(0) >= 1);
    }

    #[test]
    fn test_build_pool() {
        let pool = build_pool(2, "test").unwrap();
        assert_eq!(pool.current_num_threads(), 2);
    }
}
