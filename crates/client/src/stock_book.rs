//! On-hand stock list: load, add, edit, delete.

use std::sync::Arc;

use karatbook_core::{StockId, Timestamp, entity::find_by_id};
use karatbook_inventory::{StockDraft, StockItem, StockQuery, StockRecord};

use crate::api::InventoryApi;
use crate::error::{ServiceError, ServiceResult};
use crate::session::SessionContext;

pub struct StockBook<A: ?Sized> {
    api: Arc<A>,
    items: Vec<StockItem>,
}

impl<A: InventoryApi + ?Sized> StockBook<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            items: Vec::new(),
        }
    }

    pub fn items(&self) -> &[StockItem] {
        &self.items
    }

    pub fn view(&self, query: &StockQuery) -> Vec<&StockItem> {
        query.apply(&self.items)
    }

    pub async fn load(&mut self) -> ServiceResult<&[StockItem]> {
        self.items = self.api.list_stock().await?;
        Ok(&self.items)
    }

    /// Add new stock, stamped with the session's author and the current time.
    pub async fn add(&mut self, draft: StockDraft, session: &SessionContext) -> ServiceResult<StockItem> {
        let record = StockRecord::from_draft(draft, session.author(), Timestamp::now())?;
        let created = self.api.add_stock(&record).await?;
        tracing::info!(stock_id = %created.id, item = %created.item_name, "stock added");
        self.items.push(created.clone());
        Ok(created)
    }

    /// Replace a loaded item. Draft fields left empty keep their value.
    pub async fn edit(
        &mut self,
        id: &StockId,
        draft: StockDraft,
        session: &SessionContext,
    ) -> ServiceResult<StockItem> {
        let current = find_by_id(&self.items, id)
            .ok_or_else(|| ServiceError::not_found(format!("stock item {id}")))?;
        let record = StockRecord::edited(current, draft, session.author(), Timestamp::now());

        let updated = self.api.replace_stock(id, &record).await?;
        tracing::info!(stock_id = %id, "stock updated");
        if let Some(slot) = self.items.iter_mut().find(|s| &s.id == id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    pub async fn delete(&mut self, id: &StockId) -> ServiceResult<()> {
        self.api.delete_stock(id).await?;
        tracing::info!(stock_id = %id, "stock deleted");
        self.items.retain(|s| &s.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::{Endpoint, InMemoryApi};
    use crate::session::UserProfile;
    use karatbook_inventory::{Material, Weight};

    fn session() -> SessionContext {
        SessionContext::new(UserProfile {
            name: "Ravi".into(),
            username: "ravi".into(),
            ..UserProfile::default()
        })
    }

    fn necklace() -> StockDraft {
        StockDraft {
            item_name: "Necklace".into(),
            weight: Some(Weight::from_milligrams(25_000)),
            pieces: Some(2),
            material: Some(Material::Gold),
        }
    }

    #[tokio::test]
    async fn add_edit_delete_round_trip() {
        let api = Arc::new(InMemoryApi::new());
        let mut book = StockBook::new(api.clone());
        book.load().await.unwrap();

        let created = book.add(necklace(), &session()).await.unwrap();
        assert_eq!(created.author, "Ravi");
        assert_eq!(book.items().len(), 1);

        let edited = book
            .edit(
                &created.id,
                StockDraft {
                    weight: Some(Weight::from_milligrams(20_000)),
                    ..StockDraft::default()
                },
                &session(),
            )
            .await
            .unwrap();
        assert_eq!(edited.item_name, "Necklace");
        assert_eq!(edited.pieces, 2);
        assert_eq!(api.stock().await[0].weight, Weight::from_milligrams(20_000));
        assert_eq!(book.items()[0], edited);

        book.delete(&created.id).await.unwrap();
        assert!(book.items().is_empty());
        assert!(api.stock().await.is_empty());
    }

    #[tokio::test]
    async fn invalid_add_makes_no_request() {
        let api = Arc::new(InMemoryApi::new());
        let mut book = StockBook::new(api.clone());

        let err = book
            .add(
                StockDraft {
                    item_name: "Bangle".into(),
                    ..StockDraft::default()
                },
                &session(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(msg) if msg.contains("weight")));
        assert_eq!(api.call_count(Endpoint::AddStock).await, 0);
    }

    #[tokio::test]
    async fn editing_unknown_item_is_not_found() {
        let api = Arc::new(InMemoryApi::new());
        let mut book = StockBook::new(api.clone());
        let err = book
            .edit(&StockId::new("nope").unwrap(), necklace(), &session())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(api.calls().await.is_empty());
    }
}
