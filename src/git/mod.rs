pub mod backend;
pub mod cache;
pub mod repository;

pub use backend::{CommitRecord, FileBlob, PathChange, PathStatus, RepositoryBackend};
pub use cache::{CacheStats, CommitCache};
pub use repository::GitRepository;
