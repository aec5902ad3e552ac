//! Archive use-case service: completed projects and action items.

use crate::repo::archive_repo::{ArchiveEntry, ArchiveRepository};
use crate::service::ServiceResult;

pub struct ArchiveService<R: ArchiveRepository> {
    repo: R,
}

impl<R: ArchiveRepository> ArchiveService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Most recently completed first.
    pub fn list(&self, limit: Option<u32>) -> ServiceResult<Vec<ArchiveEntry>> {
        Ok(self.repo.list_archive(limit)?)
    }
}
