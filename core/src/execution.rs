use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How an engine operation spreads its per-term or per-id work.
///
/// `Parallel` runs on the global rayon pool. Every helper returns only after
/// all workers are done, so consecutive calls act as phase barriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPolicy {
    #[default]
    Sequential,
    Parallel,
}

impl ExecutionPolicy {
    pub fn from_flag(parallel: bool) -> Self {
        if parallel {
            ExecutionPolicy::Parallel
        } else {
            ExecutionPolicy::Sequential
        }
    }

    pub fn for_each<T, F>(self, items: &[T], f: F)
    where
        T: Sync,
        F: Fn(&T) + Sync + Send,
    {
        match self {
            ExecutionPolicy::Sequential => items.iter().for_each(f),
            ExecutionPolicy::Parallel => items.par_iter().for_each(f),
        }
    }

    pub fn for_each_mut<T, F>(self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(&mut T) + Sync + Send,
    {
        match self {
            ExecutionPolicy::Sequential => items.iter_mut().for_each(f),
            ExecutionPolicy::Parallel => items.par_iter_mut().for_each(f),
        }
    }

    pub fn any<T, F>(self, items: &[T], f: F) -> bool
    where
        T: Sync,
        F: Fn(&T) -> bool + Sync + Send,
    {
        match self {
            ExecutionPolicy::Sequential => items.iter().any(f),
            ExecutionPolicy::Parallel => items.par_iter().any(f),
        }
    }

    /// Order of the output follows the order of `items` in both modes.
    pub fn filter_map<T, R, F>(self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Option<R> + Sync + Send,
    {
        match self {
            ExecutionPolicy::Sequential => items.iter().filter_map(f).collect(),
            ExecutionPolicy::Parallel => items.par_iter().filter_map(f).collect(),
        }
    }
}
