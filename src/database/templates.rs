/// Workflow template service
///
/// Looks up published workflow templates by id, by the node types they use, or by
/// free-text search. Node type lists and workflow bodies live in JSON columns.

use crate::database::{repository::like_pattern, types::WorkflowTemplate};
use anyhow::Result;
use sqlx::{sqlite::{SqlitePool, SqliteRow}, Row};

/// Template lookups over the catalog database
#[derive(Debug, Clone)]
pub struct TemplateService {
    pool: SqlitePool,
}

impl TemplateService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a template, replacing any existing row with the same id
    pub async fn save_template(&self, template: &WorkflowTemplate) -> Result<()> {
        let node_types_json = serde_json::to_string(&template.node_types)?;
        let workflow_json = serde_json::to_string(&template.workflow)?;

        sqlx::query(
            r#"
            INSERT INTO templates (id, name, description, node_types, workflow, views, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                node_types = excluded.node_types,
                workflow = excluded.workflow,
                views = excluded.views,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(template.id)
        .bind(&template.name)
        .bind(&template.description)
        .bind(&node_types_json)
        .bind(&workflow_json)
        .bind(template.views)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Retrieve a template by id
    pub async fn get_template(&self, id: i64) -> Result<Option<WorkflowTemplate>> {
        let row = sqlx::query("SELECT * FROM templates WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| template_from_row(&row)).transpose()
    }

    /// Most viewed templates that use `node_type`
    pub async fn list_templates_for_node(&self, node_type: &str, limit: u32) -> Result<Vec<WorkflowTemplate>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM templates
            WHERE EXISTS (SELECT 1 FROM json_each(templates.node_types) WHERE json_each.value = ?)
            ORDER BY views DESC, id
            LIMIT ?
            "#,
        )
        .bind(node_type)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(template_from_row).collect()
    }

    /// Case-insensitive search over template names and descriptions
    pub async fn search_templates(&self, query: &str, limit: u32) -> Result<Vec<WorkflowTemplate>> {
        let pattern = like_pattern(query);

        let rows = sqlx::query(
            r#"
            SELECT * FROM templates
            WHERE lower(name) LIKE ?1 ESCAPE '\' OR lower(description) LIKE ?1 ESCAPE '\'
            ORDER BY views DESC, id
            LIMIT ?2
            "#,
        )
        .bind(&pattern)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(template_from_row).collect()
    }
}

fn template_from_row(row: &SqliteRow) -> Result<WorkflowTemplate> {
    let node_types_json: String = row.get("node_types");
    let workflow_json: String = row.get("workflow");

    Ok(WorkflowTemplate {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        node_types: serde_json::from_str(&node_types_json)?,
        workflow: serde_json::from_str(&workflow_json)?,
        views: row.get("views"),
    })
}
