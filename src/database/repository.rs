/// Node repository over the catalog database
///
/// Read-mostly queries used by the node tools. Properties are stored as a JSON
/// column and decoded on the way out.

use crate::database::types::{NodeFilter, NodeInfo, NodeProperty};
use anyhow::Result;
use sqlx::{sqlite::{SqlitePool, SqliteRow}, QueryBuilder, Row, Sqlite};

const DEFAULT_LIMIT: u32 = 50;

/// Query layer for node definitions
#[derive(Debug, Clone)]
pub struct NodeRepository {
    pool: SqlitePool,
}

impl NodeRepository {
    /// Create a repository over an open pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a node definition, replacing any existing row with the same type
    pub async fn save_node(&self, node: &NodeInfo) -> Result<()> {
        let properties_json = serde_json::to_string(&node.properties)?;

        sqlx::query(
            r#"
            INSERT INTO nodes (node_type, package_name, display_name, description, category,
                               is_trigger, version, properties, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(node_type) DO UPDATE SET
                package_name = excluded.package_name,
                display_name = excluded.display_name,
                description = excluded.description,
                category = excluded.category,
                is_trigger = excluded.is_trigger,
                version = excluded.version,
                properties = excluded.properties,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&node.node_type)
        .bind(&node.package_name)
        .bind(&node.display_name)
        .bind(&node.description)
        .bind(&node.category)
        .bind(node.is_trigger)
        .bind(&node.version)
        .bind(&properties_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Retrieve a node by its fully qualified type
    pub async fn get_node(&self, node_type: &str) -> Result<Option<NodeInfo>> {
        let row = sqlx::query("SELECT * FROM nodes WHERE node_type = ?")
            .bind(node_type)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| node_from_row(&row)).transpose()
    }

    /// List nodes matching the filter, ordered by display name
    pub async fn list_nodes(&self, filter: &NodeFilter) -> Result<Vec<NodeInfo>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM nodes WHERE 1 = 1");

        if let Some(category) = &filter.category {
            query.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(package_name) = &filter.package_name {
            query.push(" AND package_name = ").push_bind(package_name.clone());
        }
        if filter.triggers_only {
            query.push(" AND is_trigger = 1");
        }
        query
            .push(" ORDER BY display_name LIMIT ")
            .push_bind(i64::from(filter.limit.unwrap_or(DEFAULT_LIMIT)));

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(node_from_row).collect()
    }

    /// Case-insensitive search over type, display name and description
    ///
    /// Display-name matches rank ahead of description-only matches.
    pub async fn search_nodes(&self, query: &str, limit: u32) -> Result<Vec<NodeInfo>> {
        let pattern = like_pattern(query);

        let rows = sqlx::query(
            r#"
            SELECT * FROM nodes
            WHERE lower(node_type) LIKE ?1 ESCAPE '\'
               OR lower(display_name) LIKE ?1 ESCAPE '\'
               OR lower(description) LIKE ?1 ESCAPE '\'
            ORDER BY CASE WHEN lower(display_name) LIKE ?1 ESCAPE '\' THEN 0 ELSE 1 END, display_name
            LIMIT ?2
            "#,
        )
        .bind(&pattern)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(node_from_row).collect()
    }

    /// Total number of catalog nodes
    pub async fn count_nodes(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM nodes")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("total"))
    }
}

/// Lowercased `%query%` pattern with LIKE wildcards in the query escaped by `\`
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::from("%");
    for c in query.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn node_from_row(row: &SqliteRow) -> Result<NodeInfo> {
    let properties_json: String = row.get("properties");
    let properties: Vec<NodeProperty> = serde_json::from_str(&properties_json)?;

    Ok(NodeInfo {
        node_type: row.get("node_type"),
        package_name: row.get("package_name"),
        display_name: row.get("display_name"),
        description: row.get("description"),
        category: row.get("category"),
        is_trigger: row.get("is_trigger"),
        version: row.get("version"),
        properties,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::adapter::{NodeDatabase, IN_MEMORY_PATH};

    pub(crate) fn sample_node(node_type: &str, display_name: &str, category: &str, is_trigger: bool) -> NodeInfo {
        NodeInfo {
            node_type: node_type.to_string(),
            package_name: "n8n-nodes-base".to_string(),
            display_name: display_name.to_string(),
            description: format!("{} node", display_name),
            category: category.to_string(),
            is_trigger,
            version: "1".to_string(),
            properties: vec![NodeProperty {
                name: "resource".to_string(),
                display_name: "Resource".to_string(),
                property_type: "options".to_string(),
                required: true,
                default: None,
                description: String::new(),
            }],
        }
    }

    async fn repository() -> NodeRepository {
        let db = NodeDatabase::open(IN_MEMORY_PATH).await.unwrap();
        NodeRepository::new(db.pool().clone())
    }

    #[tokio::test]
    async fn test_save_and_get_node() {
        let repo = repository().await;
        let node = sample_node("nodes-base.slack", "Slack", "communication", false);

        repo.save_node(&node).await.unwrap();

        let loaded = repo.get_node("nodes-base.slack").await.unwrap();
        assert_eq!(loaded, Some(node));
        assert_eq!(repo.get_node("nodes-base.missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_node_upserts() {
        let repo = repository().await;
        let mut node = sample_node("nodes-base.slack", "Slack", "communication", false);
        repo.save_node(&node).await.unwrap();

        node.version = "2".to_string();
        repo.save_node(&node).await.unwrap();

        assert_eq!(repo.count_nodes().await.unwrap(), 1);
        assert_eq!(repo.get_node("nodes-base.slack").await.unwrap().unwrap().version, "2");
    }

    #[tokio::test]
    async fn test_list_nodes_with_filter() {
        let repo = repository().await;
        repo.save_node(&sample_node("nodes-base.slack", "Slack", "communication", false)).await.unwrap();
        repo.save_node(&sample_node("nodes-base.webhook", "Webhook", "trigger", true)).await.unwrap();
        repo.save_node(&sample_node("nodes-base.cron", "Cron", "trigger", true)).await.unwrap();

        let all = repo.list_nodes(&NodeFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].display_name, "Cron");

        let triggers = repo
            .list_nodes(&NodeFilter { triggers_only: true, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(triggers.len(), 2);

        let communication = repo
            .list_nodes(&NodeFilter { category: Some("communication".to_string()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(communication.len(), 1);
        assert_eq!(communication[0].node_type, "nodes-base.slack");

        let limited = repo
            .list_nodes(&NodeFilter { limit: Some(1), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" Slack "), "%slack%");
        assert_eq!(like_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let repo = repository().await;
        repo.save_node(&sample_node("nodes-base.slack", "Slack", "communication", false)).await.unwrap();
        let mut underscored = sample_node("nodes-base.set_field", "Set Field", "core", false);
        underscored.description = "Sets 100% of fields".to_string();
        repo.save_node(&underscored).await.unwrap();

        let underscore = repo.search_nodes("_", 10).await.unwrap();
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].node_type, "nodes-base.set_field");

        let percent = repo.search_nodes("%", 10).await.unwrap();
        assert_eq!(percent.len(), 1);
        assert_eq!(percent[0].node_type, "nodes-base.set_field");
    }

    #[tokio::test]
    async fn test_search_ranks_display_name_first() {
        let repo = repository().await;
        let mut described = sample_node("nodes-base.httpRequest", "HTTP Request", "core", false);
        described.description = "Call any webhook endpoint".to_string();
        repo.save_node(&described).await.unwrap();
        repo.save_node(&sample_node("nodes-base.webhook", "Webhook", "trigger", true)).await.unwrap();
        repo.save_node(&sample_node("nodes-base.slack", "Slack", "communication", false)).await.unwrap();

        let results = repo.search_nodes("WEBHOOK", 10).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].node_type, "nodes-base.webhook");
        assert_eq!(results[1].node_type, "nodes-base.httpRequest");
    }
}
