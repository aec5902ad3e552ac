//! Trash use-case service.

use crate::model::item::ItemRef;
use crate::repo::trash_repo::{TrashEntry, TrashRepository, TrashSummary};
use crate::service::ServiceResult;
use log::info;

pub struct TrashService<R: TrashRepository> {
    repo: R,
}

impl<R: TrashRepository> TrashService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Trashed entities of every kind, most recently deleted first.
    pub fn list(&self) -> ServiceResult<Vec<TrashEntry>> {
        Ok(self.repo.list_trash()?)
    }

    /// Restores one entity. Returns the number of action items that came
    /// back with a restored project.
    pub fn restore(&self, item: ItemRef) -> ServiceResult<usize> {
        let cascaded = self.repo.restore(item)?;
        info!("event=trash_restore module=service status=ok item={item} cascaded={cascaded}");
        Ok(cascaded)
    }

    pub fn purge(&self, item: ItemRef) -> ServiceResult<()> {
        self.repo.purge(item)?;
        info!("event=trash_purge module=service status=ok item={item}");
        Ok(())
    }

    /// Hard-deletes everything in the trash.
    pub fn empty(&self) -> ServiceResult<TrashSummary> {
        let summary = self.repo.empty_trash()?;
        info!(
            "event=trash_empty module=service status=ok purged={} orphan_tags={}",
            summary.total(),
            summary.orphan_tags_removed
        );
        Ok(summary)
    }
}
