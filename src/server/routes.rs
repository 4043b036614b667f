//! HTTP surface of the review server.
//!
//! Commands enter here (and over the WebSocket in [`super::ws`]): project
//! creation and revision uploads as multipart forms, project lookups as
//! JSON. Image bytes go to the image store before the registry is touched,
//! so a storage failure aborts the command with state unchanged.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::hub::SyncHub;
use super::images::ImageStore;
use super::storage::ProjectStore;
use super::ws;
use crate::error::ApiError;
use crate::models::Project;
use crate::registry::Registry;

/// Shared state for all handlers and WebSocket sessions.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RwLock<Registry>>,
    pub hub: Arc<SyncHub>,
    pub images: Arc<ImageStore>,
    pub projects: Arc<ProjectStore>,
}

impl AppState {
    pub fn new(images: ImageStore, projects: ProjectStore) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::new())),
            hub: Arc::new(SyncHub::new()),
            images: Arc::new(images),
            projects: Arc::new(projects),
        }
    }

    /// Loads persisted project snapshots into the registry.
    ///
    /// Returns the number of projects restored.
    pub async fn load_persisted(&self) -> Result<usize, ApiError> {
        let loaded = self.projects.load_all()?;
        let count = loaded.len();
        let mut registry = self.registry.write().await;
        for project in loaded {
            registry.insert_loaded(project);
        }
        Ok(count)
    }

    /// Best-effort persistence after a successful mutation.
    ///
    /// In-memory state is authoritative; a failed snapshot write is logged,
    /// not surfaced to the client.
    pub async fn persist_project(&self, project_id: Uuid) {
        let registry = self.registry.read().await;
        if let Ok(project) = registry.get_project(project_id) {
            if let Err(e) = self.projects.save(project) {
                tracing::warn!("Failed to persist project {}: {}", project_id, e);
            }
        }
    }
}

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    let image_files = Router::new().nest_service(
        "/images",
        ServeDir::new(state.images.dir().to_path_buf()),
    );

    Router::new()
        .route("/health", get(health))
        .route("/projects", get(list_projects))
        .route("/project", post(create_project))
        .route("/project/{id}", get(get_project))
        .route("/project/{id}/revision", post(append_revision))
        .route("/images", get(list_images))
        .route("/upload", post(upload_image))
        .route("/ws", get(ws::ws_handler))
        // Image files are served statically under /images/<filename>; the
        // exact-match /images route above still wins for the listing.
        .fallback_service(image_files)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Multipart uploads
// ============================================================================

/// Fields extracted from a project/revision upload form.
#[derive(Default)]
struct UploadForm {
    project_name: Option<String>,
    image: Option<(String, Bytes)>,
}

impl UploadForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::Validation(format!("Invalid multipart body: {}", e)))?
        {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("projectName") => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::Validation(format!("Invalid form field: {}", e)))?;
                    form.project_name = Some(text);
                }
                Some("image") => {
                    let filename = field.file_name().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::Validation(format!("Invalid image field: {}", e)))?;
                    if let Some(filename) = filename.filter(|f| !f.is_empty()) {
                        form.image = Some((filename, bytes));
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    fn require_image(self) -> Result<(String, Bytes), ApiError> {
        self.image
            .ok_or_else(|| ApiError::Validation("Image file is required".to_string()))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_projects(State(state): State<AppState>) -> Json<Vec<Uuid>> {
    Json(state.registry.read().await.list_projects())
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
    let registry = state.registry.read().await;
    Ok(Json(registry.get_project(id)?.clone()))
}

#[derive(Serialize)]
struct CreateProjectResponse {
    success: bool,
    #[serde(rename = "projectId")]
    project_id: Uuid,
}

async fn create_project(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CreateProjectResponse>, ApiError> {
    let form = UploadForm::read(&mut multipart).await?;

    let name = form
        .project_name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Project name is required".to_string()))?;
    let (filename, bytes) = form.require_image()?;

    // Image persistence first: a storage failure must leave the registry
    // untouched.
    state.images.save(&filename, &bytes)?;

    let project_id = state
        .registry
        .write()
        .await
        .create_project(&name, &filename)?;
    state.persist_project(project_id).await;

    tracing::info!("Created project {} ({})", project_id, name.trim());
    Ok(Json(CreateProjectResponse {
        success: true,
        project_id,
    }))
}

#[derive(Serialize)]
struct AppendRevisionResponse {
    success: bool,
    revision: usize,
}

async fn append_revision(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<AppendRevisionResponse>, ApiError> {
    let form = UploadForm::read(&mut multipart).await?;
    let (filename, bytes) = form.require_image()?;

    state.images.save(&filename, &bytes)?;

    let revision = state.registry.write().await.append_revision(id, &filename)?;
    state.persist_project(id).await;

    tracing::info!("Appended revision {} to project {}", revision, id);
    Ok(Json(AppendRevisionResponse {
        success: true,
        revision,
    }))
}

async fn list_images(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.images.list()?))
}

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
}

async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let form = UploadForm::read(&mut multipart).await?;
    let (filename, bytes) = form.require_image()?;

    state.images.save(&filename, &bytes)?;
    Ok(Json(UploadResponse { success: true }))
}
