//! Context/category use-case service.
//!
//! # Invariants
//! - Names are stored trimmed.
//! - A rename or restore that collides with an active label of the same
//!   kind fails with `DuplicateName`; nothing is written.

use crate::model::item::{now_epoch_ms, ItemId, ItemRef};
use crate::model::label::{Label, LabelKind};
use crate::repo::label_repo::LabelRepository;
use crate::service::{clean_name, ServiceError, ServiceResult};
use log::info;

/// Label service facade for one label kind.
pub struct LabelService<R: LabelRepository> {
    repo: R,
    kind: LabelKind,
}

impl<R: LabelRepository> LabelService<R> {
    pub fn new(repo: R, kind: LabelKind) -> Self {
        Self { repo, kind }
    }

    pub fn contexts(repo: R) -> Self {
        Self::new(repo, LabelKind::Context)
    }

    pub fn categories(repo: R) -> Self {
        Self::new(repo, LabelKind::Category)
    }

    pub fn kind(&self) -> LabelKind {
        self.kind
    }

    pub fn add(&self, name: &str, description: &str) -> ServiceResult<Label> {
        let mut label = Label::new(self.kind, clean_name(name));
        label.description = description.trim().to_string();
        label.validate()?;

        if self.repo.find_label_by_name(self.kind, &label.name)?.is_some() {
            return Err(ServiceError::DuplicateName {
                kind: self.kind,
                name: label.name,
            });
        }
        let id = self.repo.create_label(&label)?;
        info!(
            "event=label_add module=service status=ok kind={} id={id}",
            self.kind.item_kind()
        );
        self.read_back(id, "created label not found in read-back")
    }

    pub fn rename(&self, id: ItemId, name: &str) -> ServiceResult<Label> {
        let mut label = self.require_active(id)?;
        let name = clean_name(name);
        if let Some(existing) = self.repo.find_label_by_name(self.kind, &name)? {
            if existing.uuid != id {
                return Err(ServiceError::DuplicateName {
                    kind: self.kind,
                    name,
                });
            }
        }
        label.name = name;
        self.repo.update_label(&label)?;
        self.read_back(id, "renamed label not found in read-back")
    }

    pub fn describe(&self, id: ItemId, description: &str) -> ServiceResult<Label> {
        let mut label = self.require_active(id)?;
        label.description = description.trim().to_string();
        self.repo.update_label(&label)?;
        self.read_back(id, "described label not found in read-back")
    }

    pub fn get(&self, id: ItemId) -> ServiceResult<Option<Label>> {
        Ok(self.repo.get_label(self.kind, id, false)?)
    }

    pub fn find(&self, name: &str) -> ServiceResult<Option<Label>> {
        Ok(self.repo.find_label_by_name(self.kind, name)?)
    }

    pub fn list(&self, include_deleted: bool) -> ServiceResult<Vec<Label>> {
        Ok(self.repo.list_labels(self.kind, include_deleted)?)
    }

    /// Trashes one label. Items filed under it keep the reference until
    /// the trash is emptied.
    pub fn trash(&self, id: ItemId) -> ServiceResult<()> {
        self.repo.soft_delete_label(self.kind, id, now_epoch_ms())?;
        info!(
            "event=label_trash module=service status=ok kind={} id={id}",
            self.kind.item_kind()
        );
        Ok(())
    }

    pub fn restore(&self, id: ItemId) -> ServiceResult<Label> {
        self.repo.restore_label(self.kind, id)?;
        self.read_back(id, "restored label not found in read-back")
    }

    fn require_active(&self, id: ItemId) -> ServiceResult<Label> {
        self.repo
            .get_label(self.kind, id, false)?
            .ok_or(ServiceError::NotFound(self.item_ref(id)))
    }

    fn read_back(&self, id: ItemId, details: &'static str) -> ServiceResult<Label> {
        self.repo
            .get_label(self.kind, id, false)?
            .ok_or(ServiceError::InconsistentState(details))
    }

    fn item_ref(&self, id: ItemId) -> ItemRef {
        ItemRef::new(self.kind.item_kind(), id)
    }
}
