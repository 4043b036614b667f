//! The project/revision registry: single owner of all mutable state.
//!
//! The registry namespaces point stores under projects and revisions and
//! resolves identifiers to them. Projects and revisions are create-only; the
//! only mutable sub-state is each revision's point store. The server wraps
//! one registry in `Arc<tokio::sync::RwLock<_>>`, so every
//! `add_or_merge_comment` runs under a single write-lock acquisition and the
//! read-modify-write on a point store never interleaves with another.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Comment, Point, Project};

/// In-memory registry of all projects, in creation order.
#[derive(Debug, Default)]
pub struct Registry {
    projects: HashMap<Uuid, Project>,
    order: Vec<Uuid>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a project with one initial revision and returns its id.
    pub fn create_project(
        &mut self,
        name: &str,
        initial_image_ref: &str,
    ) -> Result<Uuid, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("Project name is required".to_string()));
        }

        let project = Project::new(name, initial_image_ref);
        let id = project.id;
        self.projects.insert(id, project);
        self.order.push(id);
        Ok(id)
    }

    /// Re-inserts a project loaded from persisted state.
    ///
    /// Callers must feed projects in their original creation order.
    pub fn insert_loaded(&mut self, project: Project) {
        let id = project.id;
        self.projects.insert(id, project);
        self.order.push(id);
    }

    /// Appends an empty revision to a project and returns its index.
    pub fn append_revision(
        &mut self,
        project_id: Uuid,
        image_ref: &str,
    ) -> Result<usize, ApiError> {
        let project = self
            .projects
            .get_mut(&project_id)
            .ok_or_else(|| not_found_project(project_id))?;

        project
            .revisions
            .push(crate::models::Revision::new(image_ref));
        Ok(project.revisions.len() - 1)
    }

    /// Full snapshot of one project.
    pub fn get_project(&self, project_id: Uuid) -> Result<&Project, ApiError> {
        self.projects
            .get(&project_id)
            .ok_or_else(|| not_found_project(project_id))
    }

    /// All project ids in creation order.
    pub fn list_projects(&self) -> Vec<Uuid> {
        self.order.clone()
    }

    /// Ordered point snapshot for one (project, revision) pair.
    pub fn snapshot(&self, project_id: Uuid, revision: usize) -> Result<Vec<Point>, ApiError> {
        let project = self.get_project(project_id)?;
        let rev = project
            .revisions
            .get(revision)
            .ok_or_else(|| not_found_revision(project_id, revision))?;
        Ok(rev.points.snapshot())
    }

    /// Mutation sequence number of one revision's point store.
    pub fn seq(&self, project_id: Uuid, revision: usize) -> Result<u64, ApiError> {
        let project = self.get_project(project_id)?;
        let rev = project
            .revisions
            .get(revision)
            .ok_or_else(|| not_found_revision(project_id, revision))?;
        Ok(rev.points.seq())
    }

    /// Snapshot plus its mutation seq, read consistently in one call.
    pub fn snapshot_with_seq(
        &self,
        project_id: Uuid,
        revision: usize,
    ) -> Result<(Vec<Point>, u64), ApiError> {
        let project = self.get_project(project_id)?;
        let rev = project
            .revisions
            .get(revision)
            .ok_or_else(|| not_found_revision(project_id, revision))?;
        Ok((rev.points.snapshot(), rev.points.seq()))
    }

    /// Attaches a comment at (x, y) on a revision, merging into a nearby
    /// point when one exists. Returns the point the comment landed on, the
    /// revision's updated snapshot for broadcasting, and the snapshot's
    /// sequence number. The seq is assigned inside the same mutation, so
    /// callers publishing after the lock is released can rely on it to order
    /// snapshots of the same pair.
    pub fn add_or_merge_comment(
        &mut self,
        project_id: Uuid,
        revision: usize,
        x: f64,
        y: f64,
        author: &str,
        text: &str,
    ) -> Result<(Point, Vec<Point>, u64), ApiError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ApiError::Validation(
                "Coordinates must be finite numbers".to_string(),
            ));
        }
        let author = author.trim();
        if author.is_empty() {
            return Err(ApiError::Validation("Author is required".to_string()));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ApiError::Validation(
                "Comment text is required".to_string(),
            ));
        }

        let project = self
            .projects
            .get_mut(&project_id)
            .ok_or_else(|| not_found_project(project_id))?;
        let rev = project
            .revisions
            .get_mut(revision)
            .ok_or_else(|| not_found_revision(project_id, revision))?;

        let point = rev
            .points
            .add_or_merge_comment(x, y, Comment::new(author, text))
            .clone();
        Ok((point, rev.points.snapshot(), rev.points.seq()))
    }
}

fn not_found_project(project_id: Uuid) -> ApiError {
    ApiError::NotFound(format!("project {}", project_id))
}

fn not_found_revision(project_id: Uuid, revision: usize) -> ApiError {
    ApiError::NotFound(format!("revision {} of project {}", revision, project_id))
}
