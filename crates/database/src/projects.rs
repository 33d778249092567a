use crate::StorageError;
use parking_lot::RwLock;
use payout_snapshot_queue::ports::ProjectRepository;
use payout_snapshot_types::{
    entities::Project,
    primitives::ProjectId,
};
use std::{
    collections::HashMap,
    sync::Arc,
};

#[derive(Clone, Default)]
pub struct InMemoryProjectRepository {
    projects: Arc<RwLock<HashMap<ProjectId, Project>>>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, project: Project) -> Result<(), StorageError> {
        let mut projects = self.projects.write();
        if projects.contains_key(&project.id) {
            return Err(StorageError::ProjectAlreadyExists(project.id))
        }
        tracing::debug!(
            project_id = %project.id,
            chain_id = %project.chain_id,
            "Stored project"
        );
        projects.insert(project.id, project);
        Ok(())
    }
}

impl ProjectRepository for InMemoryProjectRepository {
    fn get_by_id(&self, id: ProjectId) -> anyhow::Result<Option<Project>> {
        Ok(self.projects.read().get(&id).cloned())
    }
}
