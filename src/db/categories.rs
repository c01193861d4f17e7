//! Category tree lookups.

use crate::types::CategoryId;
use crate::{Error, Result};

use super::{CategoryRow, Database};

impl Database {
    /// Every category, parents before their children
    pub async fn categories(&self) -> Result<Vec<CategoryRow>> {
        sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, parent_id FROM categories ORDER BY COALESCE(parent_id, id), id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::query("Failed to list categories", e))
    }

    /// A category and its parent, if it has one
    pub async fn category_with_parent(
        &self,
        id: CategoryId,
    ) -> Result<Option<(CategoryRow, Option<CategoryRow>)>> {
        let Some(category) = self.category(id).await? else {
            return Ok(None);
        };
        let parent = match category.parent_id {
            Some(parent_id) => self.category(parent_id).await?,
            None => None,
        };
        Ok(Some((category, parent)))
    }

    async fn category(&self, id: CategoryId) -> Result<Option<CategoryRow>> {
        sqlx::query_as::<_, CategoryRow>("SELECT id, name, parent_id FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::query("Failed to get category", e))
    }
}
