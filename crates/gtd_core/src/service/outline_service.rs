//! Builds grouped outlines from storage.
//!
//! By project: open projects (by name) then `No project`.
//! By context: active contexts (by name) then `Inbox`.
//! Leaves are the open, non-trashed action items in due-date order.

use crate::model::label::LabelKind;
use crate::repo::action_repo::{ActionListQuery, ActionRepository};
use crate::repo::label_repo::LabelRepository;
use crate::repo::project_repo::{ProjectListQuery, ProjectRepository};
use crate::service::ServiceResult;
use crate::view::outline::{Outline, OutlineGroup, OutlineGrouping};

pub struct OutlineService<A, P, L>
where
    A: ActionRepository,
    P: ProjectRepository,
    L: LabelRepository,
{
    actions: A,
    projects: P,
    labels: L,
}

impl<A, P, L> OutlineService<A, P, L>
where
    A: ActionRepository,
    P: ProjectRepository,
    L: LabelRepository,
{
    pub fn new(actions: A, projects: P, labels: L) -> Self {
        Self {
            actions,
            projects,
            labels,
        }
    }

    pub fn build(&self, grouping: OutlineGrouping) -> ServiceResult<Outline> {
        let groups = match grouping {
            OutlineGrouping::ByProject => self
                .projects
                .list_projects(&ProjectListQuery {
                    completed: Some(false),
                    ..ProjectListQuery::default()
                })?
                .into_iter()
                .map(|project| OutlineGroup::Project {
                    uuid: project.uuid,
                    name: project.name,
                })
                .collect(),
            OutlineGrouping::ByContext => self
                .labels
                .list_labels(LabelKind::Context, false)?
                .into_iter()
                .map(|label| OutlineGroup::Context {
                    uuid: label.uuid,
                    name: label.name,
                })
                .collect(),
        };
        let items = self.actions.list_actions(&ActionListQuery {
            completed: Some(false),
            ..ActionListQuery::default()
        })?;
        Ok(Outline::build(grouping, groups, items))
    }
}
