/// Backing-resource construction for the shared node database
///
/// `ResourceConnector` is the seam between the lifecycle manager and whatever
/// builds the expensive resource. The SQLite connector opens the database and
/// layers the catalog services on top of it.

use crate::database::{
    adapter::NodeDatabase, repository::NodeRepository, templates::TemplateService,
};
use anyhow::Result;
use async_trait::async_trait;

/// Builds and tears down the resource guarded by a `SharedResource`
#[async_trait]
pub trait ResourceConnector: Send + Sync + 'static {
    /// Resource plus any services derived from it
    type Resource: Send + Sync + 'static;

    /// Construct the resource identified by `location`; may perform arbitrary I/O
    async fn connect(&self, location: &str) -> Result<Self::Resource>;

    /// Release the resource's underlying handles
    async fn disconnect(&self, resource: &Self::Resource) -> Result<()>;
}

/// The node database with the services built atop it
#[derive(Debug, Clone)]
pub struct NodeServices {
    pub db: NodeDatabase,
    pub repository: NodeRepository,
    pub templates: TemplateService,
}

impl NodeServices {
    /// Layer the catalog services over an open database
    pub fn new(db: NodeDatabase) -> Self {
        let repository = NodeRepository::new(db.pool().clone());
        let templates = TemplateService::new(db.pool().clone());
        Self {
            db,
            repository,
            templates,
        }
    }
}

/// Connector that opens the SQLite node catalog
#[derive(Debug, Clone, Default)]
pub struct SqliteNodeConnector;

#[async_trait]
impl ResourceConnector for SqliteNodeConnector {
    type Resource = NodeServices;

    async fn connect(&self, location: &str) -> Result<NodeServices> {
        let db = NodeDatabase::open(location).await?;
        let services = NodeServices::new(db);

        let node_count = services.repository.count_nodes().await?;
        tracing::info!(db_path = location, node_count, "📚 Node catalog opened");

        Ok(services)
    }

    async fn disconnect(&self, resource: &NodeServices) -> Result<()> {
        resource.db.close().await
    }
}
