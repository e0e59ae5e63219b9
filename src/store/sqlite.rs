use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use super::{RemoteStore, SnapshotStore};
use crate::database::entities::{script_nodes, snapshots};
use crate::database::migrations::Migrator;
use crate::database::{establish_connection, get_database_url};
use crate::errors::{StoreError, StoreResult};
use crate::model::{Node, NodePosition, Position, ScriptDocument, Snapshot, SnapshotSummary};

/// Script store backed by a local SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    db: DatabaseConnection,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and migrates it.
    /// `":memory:"` gives a private in-memory database.
    pub async fn connect(path: &str) -> StoreResult<Self> {
        let url = get_database_url(Some(path));
        let db = establish_connection(&url).await?;
        Self::new(db).await
    }

    pub async fn new(db: DatabaseConnection) -> StoreResult<Self> {
        Migrator::up(&db, None).await?;
        info!("Script database ready");
        Ok(Self { db })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn to_active(node: &Node, sort_order: i32) -> StoreResult<script_nodes::ActiveModel> {
        let mut payload = node.clone();
        payload.position = None;
        Ok(script_nodes::ActiveModel {
            id: Set(node.id.clone()),
            node_type: Set(node.node_type.as_str().to_string()),
            sort_order: Set(sort_order),
            payload: Set(serde_json::to_value(&payload)?),
            position_x: Set(node.position.map(|p| p.x)),
            position_y: Set(node.position.map(|p| p.y)),
            updated_at: Set(Utc::now()),
        })
    }

    fn to_node(model: script_nodes::Model) -> StoreResult<Node> {
        let mut node: Node = serde_json::from_value(model.payload)?;
        node.position = match (model.position_x, model.position_y) {
            (Some(x), Some(y)) => Some(Position::new(x, y)),
            _ => None,
        };
        Ok(node)
    }

    fn to_snapshot(model: snapshots::Model) -> StoreResult<Snapshot> {
        let data: ScriptDocument = serde_json::from_value(model.data)?;
        Ok(Snapshot {
            id: model.id,
            label: model.label,
            created_at: model.created_at,
            created_by: model.created_by,
            data,
        })
    }
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn list_nodes(&self) -> StoreResult<Vec<Node>> {
        script_nodes::Entity::find()
            .order_by_asc(script_nodes::Column::SortOrder)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Self::to_node)
            .collect()
    }

    async fn create_node(&self, node: &Node) -> StoreResult<Node> {
        let txn = self.db.begin().await?;
        if script_nodes::Entity::find_by_id(node.id.clone())
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(StoreError::AlreadyExists(node.id.clone()));
        }

        let last: Option<i32> = script_nodes::Entity::find()
            .select_only()
            .column(script_nodes::Column::SortOrder)
            .order_by_desc(script_nodes::Column::SortOrder)
            .into_tuple()
            .one(&txn)
            .await?;

        let model = Self::to_active(node, last.map_or(0, |n| n + 1))?
            .insert(&txn)
            .await?;
        txn.commit().await?;
        debug!(node_id = %node.id, "Inserted node");
        Self::to_node(model)
    }

    async fn update_node(&self, id: &str, node: &Node) -> StoreResult<Node> {
        let existing = script_nodes::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let mut stored = node.clone();
        stored.id = id.to_string();
        let model = Self::to_active(&stored, existing.sort_order)?
            .update(&self.db)
            .await?;
        debug!(node_id = %id, "Updated node");
        Self::to_node(model)
    }

    async fn delete_node(&self, id: &str) -> StoreResult<()> {
        let result = script_nodes::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        debug!(node_id = %id, "Deleted node");
        Ok(())
    }

    async fn update_positions(&self, positions: &[NodePosition]) -> StoreResult<()> {
        let txn = self.db.begin().await?;
        let now = Utc::now();
        for position in positions {
            let update = script_nodes::ActiveModel {
                position_x: Set(Some(position.x)),
                position_y: Set(Some(position.y)),
                updated_at: Set(now),
                ..Default::default()
            };
            script_nodes::Entity::update_many()
                .set(update)
                .filter(script_nodes::Column::Id.eq(position.id.as_str()))
                .exec(&txn)
                .await?;
        }
        txn.commit().await?;
        debug!(count = positions.len(), "Updated positions");
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for SqliteStore {
    async fn create_snapshot(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let model = snapshots::ActiveModel {
            id: Set(snapshot.id.clone()),
            label: Set(snapshot.label.clone()),
            created_at: Set(snapshot.created_at),
            created_by: Set(snapshot.created_by.clone()),
            node_count: Set(snapshot.data.nodes.len() as i32),
            data: Set(serde_json::to_value(&snapshot.data)?),
        };
        snapshots::Entity::insert(model).exec(&self.db).await?;
        info!(snapshot_id = %snapshot.id, label = %snapshot.label, "Stored snapshot");
        Ok(())
    }

    async fn get_snapshot(&self, id: &str) -> StoreResult<Snapshot> {
        let model = snapshots::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| StoreError::SnapshotNotFound(id.to_string()))?;
        Self::to_snapshot(model)
    }

    async fn list_snapshots(&self) -> StoreResult<Vec<SnapshotSummary>> {
        let rows: Vec<(String, String, chrono::DateTime<Utc>, String, i32)> =
            snapshots::Entity::find()
                .select_only()
                .columns([
                    snapshots::Column::Id,
                    snapshots::Column::Label,
                    snapshots::Column::CreatedAt,
                    snapshots::Column::CreatedBy,
                    snapshots::Column::NodeCount,
                ])
                .order_by_desc(snapshots::Column::CreatedAt)
                .into_tuple()
                .all(&self.db)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, label, created_at, created_by, node_count)| SnapshotSummary {
                id,
                label,
                created_at,
                created_by,
                node_count: node_count.max(0) as usize,
            })
            .collect())
    }
}
