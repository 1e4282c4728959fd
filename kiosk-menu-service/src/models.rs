use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::schema::{
    categories, menu_item_extras, menu_item_piece_options, menu_item_sizes, menu_items,
};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = categories)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub icon: Option<String>,
    pub is_default: bool,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = categories)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub icon: Option<String>,
    pub is_default: bool,
}

/// Partial category update; `None` leaves a column untouched.
#[derive(AsChangeset, Debug, Clone, Default, PartialEq)]
#[diesel(table_name = categories)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub icon: Option<String>,
    pub is_default: Option<bool>,
}

impl CategoryChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = menu_items)]
pub struct MenuItem {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub category: String,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = menu_items)]
pub struct NewMenuItem {
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub category: String,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(AsChangeset, Debug, Clone, Default, PartialEq)]
#[diesel(table_name = menu_items)]
pub struct MenuItemChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(MenuItem))]
#[diesel(table_name = menu_item_extras)]
pub struct MenuItemExtra {
    pub id: i32,
    pub menu_item_id: i32,
    pub name: String,
    pub price: BigDecimal,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(MenuItem))]
#[diesel(table_name = menu_item_sizes)]
pub struct MenuItemSize {
    pub id: i32,
    pub menu_item_id: i32,
    pub name: String,
    pub price: BigDecimal,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(MenuItem))]
#[diesel(table_name = menu_item_piece_options)]
pub struct MenuItemPieceOption {
    pub id: i32,
    pub menu_item_id: i32,
    pub quantity: i32,
    pub price: BigDecimal,
    pub is_default: bool,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = menu_item_extras)]
pub(crate) struct NewExtra<'a> {
    pub menu_item_id: i32,
    pub name: &'a str,
    pub price: &'a BigDecimal,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = menu_item_sizes)]
pub(crate) struct NewSize<'a> {
    pub menu_item_id: i32,
    pub name: &'a str,
    pub price: &'a BigDecimal,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = menu_item_piece_options)]
pub(crate) struct NewPieceOption<'a> {
    pub menu_item_id: i32,
    pub quantity: i32,
    pub price: &'a BigDecimal,
    pub is_default: bool,
}

/// A menu item with its customization options.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItemDetails {
    pub item: MenuItem,
    pub extras: Vec<MenuItemExtra>,
    pub sizes: Vec<MenuItemSize>,
    pub piece_options: Vec<MenuItemPieceOption>,
}
