use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::deadpool::Object;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::info;

use crate::draft::{CategoryDraft, MenuItemDraft, MenuItemPatch};
use crate::error::MenuError;
use crate::models::{
    Category, MenuItem, MenuItemDetails, MenuItemExtra, MenuItemPieceOption, MenuItemSize,
    NewCategory, NewExtra, NewPieceOption, NewSize,
};
use crate::schema::{
    categories, menu_item_extras, menu_item_piece_options, menu_item_sizes, menu_items,
};
use crate::DbPool;

const CATEGORY_NAME_CONSTRAINT: &str = "categories_name_key";

pub fn default_categories() -> Vec<NewCategory> {
    [
        ("Burgers", "🍔", "Delicious burgers"),
        ("Drinks", "🥤", "Refreshing beverages"),
        ("Sides", "🍟", "Tasty side dishes"),
        ("Breakfast", "🍳", "Start your day right"),
    ]
    .into_iter()
    .map(|(name, icon, description)| NewCategory {
        name: name.to_string(),
        description: Some(description.to_string()),
        image_url: None,
        icon: Some(icon.to_string()),
        is_default: true,
    })
    .collect()
}

fn category_conflict(err: DieselError) -> MenuError {
    match &err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
            if info.constraint_name() == Some(CATEGORY_NAME_CONSTRAINT) =>
        {
            MenuError::Conflict("Category with this name already exists".to_string())
        }
        _ => MenuError::Query(err),
    }
}

async fn load_details(
    conn: &mut AsyncPgConnection,
    items: Vec<MenuItem>,
) -> Result<Vec<MenuItemDetails>, MenuError> {
    let extras = MenuItemExtra::belonging_to(&items)
        .select(MenuItemExtra::as_select())
        .order(menu_item_extras::id.asc())
        .load(conn)
        .await?
        .grouped_by(&items);
    let sizes = MenuItemSize::belonging_to(&items)
        .select(MenuItemSize::as_select())
        .order(menu_item_sizes::id.asc())
        .load(conn)
        .await?
        .grouped_by(&items);
    let piece_options = MenuItemPieceOption::belonging_to(&items)
        .select(MenuItemPieceOption::as_select())
        .order(menu_item_piece_options::id.asc())
        .load(conn)
        .await?
        .grouped_by(&items);

    Ok(items
        .into_iter()
        .zip(extras)
        .zip(sizes)
        .zip(piece_options)
        .map(|(((item, extras), sizes), piece_options)| MenuItemDetails {
            item,
            extras,
            sizes,
            piece_options,
        })
        .collect())
}

async fn find_details(
    conn: &mut AsyncPgConnection,
    id: i32,
) -> Result<MenuItemDetails, MenuError> {
    let item = menu_items::table
        .find(id)
        .select(MenuItem::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or(MenuError::NotFound("Menu item"))?;
    load_details(conn, vec![item])
        .await?
        .pop()
        .ok_or(MenuError::NotFound("Menu item"))
}

/// Menu items and categories in Postgres.
#[derive(Clone)]
pub struct PgMenuStore {
    pool: DbPool,
}

impl PgMenuStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> Result<Object<AsyncPgConnection>, MenuError> {
        self.pool
            .get()
            .await
            .map_err(|e| MenuError::Pool(e.to_string()))
    }

    pub async fn list_items(
        &self,
        category: Option<&str>,
        available_only: bool,
    ) -> Result<Vec<MenuItemDetails>, MenuError> {
        let mut obj = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut obj;

        let mut query = menu_items::table
            .select(MenuItem::as_select())
            .order(menu_items::id.asc())
            .into_boxed();
        if available_only {
            query = query.filter(menu_items::is_available.eq(true));
        }
        if let Some(category) = category {
            query = query.filter(menu_items::category.eq(category.to_string()));
        }
        let items = query.load(conn).await?;
        load_details(conn, items).await
    }

    /// Inserts the item and all of its options in one transaction.
    pub async fn create_item(&self, draft: MenuItemDraft) -> Result<MenuItemDetails, MenuError> {
        let new_item = draft.validate()?;
        let mut obj = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut obj;

        let id = conn
            .transaction::<_, MenuError, _>(|conn| {
                async move {
                    let item: MenuItem = diesel::insert_into(menu_items::table)
                        .values(&new_item)
                        .returning(MenuItem::as_returning())
                        .get_result(conn)
                        .await?;

                    let extras: Vec<_> = draft
                        .extras
                        .iter()
                        .map(|o| NewExtra {
                            menu_item_id: item.id,
                            name: &o.name,
                            price: &o.price,
                        })
                        .collect();
                    let sizes: Vec<_> = draft
                        .sizes
                        .iter()
                        .map(|o| NewSize {
                            menu_item_id: item.id,
                            name: &o.name,
                            price: &o.price,
                        })
                        .collect();
                    let pieces: Vec<_> = draft
                        .piece_options
                        .iter()
                        .map(|o| NewPieceOption {
                            menu_item_id: item.id,
                            quantity: o.quantity,
                            price: &o.price,
                            is_default: o.is_default,
                        })
                        .collect();

                    if !extras.is_empty() {
                        diesel::insert_into(menu_item_extras::table)
                            .values(&extras)
                            .execute(conn)
                            .await?;
                    }
                    if !sizes.is_empty() {
                        diesel::insert_into(menu_item_sizes::table)
                            .values(&sizes)
                            .execute(conn)
                            .await?;
                    }
                    if !pieces.is_empty() {
                        diesel::insert_into(menu_item_piece_options::table)
                            .values(&pieces)
                            .execute(conn)
                            .await?;
                    }
                    Ok(item.id)
                }
                .scope_boxed()
            })
            .await?;

        info!(menu_item_id = id, "menu item created");
        find_details(conn, id).await
    }

    pub async fn update_item(
        &self,
        id: i32,
        patch: MenuItemPatch,
    ) -> Result<MenuItemDetails, MenuError> {
        let changes = patch.validate()?;
        let mut obj = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut obj;

        let updated = diesel::update(menu_items::table.find(id))
            .set(&changes)
            .execute(conn)
            .await?;
        if updated == 0 {
            return Err(MenuError::NotFound("Menu item"));
        }
        find_details(conn, id).await
    }

    pub async fn delete_item(&self, id: i32) -> Result<(), MenuError> {
        let mut obj = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut obj;
        let deleted = diesel::delete(menu_items::table.find(id))
            .execute(conn)
            .await?;
        if deleted == 0 {
            return Err(MenuError::NotFound("Menu item"));
        }
        info!(menu_item_id = id, "menu item deleted");
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, MenuError> {
        let mut obj = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut obj;
        Ok(categories::table
            .select(Category::as_select())
            .order(categories::id.asc())
            .load(conn)
            .await?)
    }

    pub async fn create_category(&self, draft: CategoryDraft) -> Result<Category, MenuError> {
        let new_category = draft.validate()?;
        let mut obj = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut obj;
        diesel::insert_into(categories::table)
            .values(&new_category)
            .returning(Category::as_returning())
            .get_result(conn)
            .await
            .map_err(category_conflict)
    }

    pub async fn update_category(
        &self,
        id: i32,
        draft: CategoryDraft,
    ) -> Result<Category, MenuError> {
        let changes = draft.into_changes()?;
        let mut obj = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut obj;

        if changes.is_empty() {
            return categories::table
                .find(id)
                .select(Category::as_select())
                .first(conn)
                .await
                .optional()?
                .ok_or(MenuError::NotFound("Category"));
        }
        diesel::update(categories::table.find(id))
            .set(&changes)
            .returning(Category::as_returning())
            .get_result(conn)
            .await
            .optional()
            .map_err(category_conflict)?
            .ok_or(MenuError::NotFound("Category"))
    }

    pub async fn delete_category(&self, id: i32) -> Result<(), MenuError> {
        let mut obj = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut obj;
        let deleted = diesel::delete(categories::table.find(id))
            .execute(conn)
            .await?;
        if deleted == 0 {
            return Err(MenuError::NotFound("Category"));
        }
        Ok(())
    }

    /// Inserts the default categories that are missing. Returns how many were
    /// added.
    pub async fn seed_default_categories(&self) -> Result<usize, MenuError> {
        let mut obj = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut obj;
        let inserted = diesel::insert_into(categories::table)
            .values(default_categories())
            .on_conflict(categories::name)
            .do_nothing()
            .execute(conn)
            .await?;
        if inserted > 0 {
            info!(inserted, "default categories seeded");
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;
    use diesel_async::pooled_connection::AsyncDieselConnectionManager;

    use super::*;
    use crate::draft::PricedOption;

    fn pool(database_url: &str) -> DbPool {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        DbPool::builder(manager).max_size(2).build().unwrap()
    }

    #[test]
    fn defaults_cover_the_storefront_sections() {
        let names: Vec<_> = default_categories().into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["Burgers", "Drinks", "Sides", "Breakfast"]);
    }

    #[tokio::test]
    async fn validation_runs_before_touching_the_database() {
        // Nothing listens here; a connection attempt would surface as Pool.
        let store = PgMenuStore::new(pool("postgres://nobody@127.0.0.1:9/none"));
        let err = store.create_item(MenuItemDraft::default()).await.unwrap_err();
        assert!(matches!(err, MenuError::InvalidRequest(_)));
        let err = store
            .create_category(CategoryDraft::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MenuError::InvalidRequest(_)));
    }

    // Requires DATABASE_URL pointing at a migrated, disposable database.
    fn store() -> PgMenuStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        PgMenuStore::new(pool(&url))
    }

    #[tokio::test]
    #[ignore]
    async fn item_round_trip_with_options() {
        let store = store();
        let created = store
            .create_item(MenuItemDraft {
                name: Some("Wings".to_string()),
                description: Some("Spicy".to_string()),
                price: Some(BigDecimal::from(60)),
                category: Some("Sides".to_string()),
                extras: vec![PricedOption {
                    name: "Dip".to_string(),
                    price: BigDecimal::from(5),
                }],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.extras.len(), 1);

        let updated = store
            .update_item(
                created.item.id,
                MenuItemPatch {
                    is_available: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.item.is_available);

        let visible = store.list_items(Some("Sides"), true).await.unwrap();
        assert!(visible.iter().all(|d| d.item.id != created.item.id));

        store.delete_item(created.item.id).await.unwrap();
        assert!(matches!(
            store.delete_item(created.item.id).await,
            Err(MenuError::NotFound(_))
        ));
    }

    #[tokio::test]
    #[ignore]
    async fn seeding_is_idempotent() {
        let store = store();
        store.seed_default_categories().await.unwrap();
        assert_eq!(store.seed_default_categories().await.unwrap(), 0);
    }
}
