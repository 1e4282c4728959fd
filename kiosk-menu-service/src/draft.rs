//! Validated inputs for menu writes.

use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;

use crate::error::MenuError;
use crate::models::{CategoryChanges, MenuItemChanges, NewCategory, NewMenuItem};

#[derive(Debug, Clone, PartialEq)]
pub struct PricedOption {
    pub name: String,
    pub price: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieceOptionDraft {
    pub quantity: i32,
    pub price: BigDecimal,
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuItemDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
    pub extras: Vec<PricedOption>,
    pub sizes: Vec<PricedOption>,
    pub piece_options: Vec<PieceOptionDraft>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub icon: Option<String>,
    pub is_default: Option<bool>,
}

fn required(value: Option<&str>, field: &str) -> Result<String, MenuError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(MenuError::InvalidRequest(format!("{field} is required"))),
    }
}

fn non_negative(price: &BigDecimal, what: &str) -> Result<(), MenuError> {
    if *price < BigDecimal::zero() {
        return Err(MenuError::InvalidRequest(format!("{what} must not be negative")));
    }
    Ok(())
}

fn validate_options(options: &[PricedOption], what: &str) -> Result<(), MenuError> {
    for option in options {
        required(Some(&option.name), &format!("{what} name"))?;
        non_negative(&option.price, &format!("{what} price"))?;
    }
    Ok(())
}

impl MenuItemDraft {
    pub(crate) fn validate(&self) -> Result<NewMenuItem, MenuError> {
        let name = required(self.name.as_deref(), "name")?;
        let description = required(self.description.as_deref(), "description")?;
        let price = self
            .price
            .clone()
            .ok_or_else(|| MenuError::InvalidRequest("price is required".to_string()))?;
        non_negative(&price, "price")?;
        let category = required(self.category.as_deref(), "category")?;

        validate_options(&self.extras, "extra")?;
        validate_options(&self.sizes, "size")?;
        for option in &self.piece_options {
            if option.quantity <= 0 {
                return Err(MenuError::InvalidRequest(
                    "piece option quantity must be positive".to_string(),
                ));
            }
            non_negative(&option.price, "piece option price")?;
        }

        Ok(NewMenuItem {
            name,
            description: Some(description),
            price,
            category,
            image_url: self.image_url.clone().filter(|url| !url.is_empty()),
            is_available: self.is_available.unwrap_or(true),
            created_at: Utc::now(),
        })
    }
}

impl MenuItemPatch {
    pub(crate) fn validate(self) -> Result<MenuItemChanges, MenuError> {
        let name = match self.name {
            Some(name) => Some(required(Some(&name), "name")?),
            None => None,
        };
        let category = match self.category {
            Some(category) => Some(required(Some(&category), "category")?),
            None => None,
        };
        if let Some(price) = &self.price {
            non_negative(price, "price")?;
        }
        Ok(MenuItemChanges {
            name,
            description: self.description,
            price: self.price,
            category,
            image_url: self.image_url,
            is_available: self.is_available,
            updated_at: Some(Utc::now()),
        })
    }
}

impl CategoryDraft {
    pub(crate) fn validate(&self) -> Result<NewCategory, MenuError> {
        Ok(NewCategory {
            name: required(self.name.as_deref(), "Name")?,
            description: self.description.clone(),
            image_url: self.image_url.clone(),
            icon: self.icon.clone(),
            is_default: self.is_default.unwrap_or(false),
        })
    }

    pub(crate) fn into_changes(self) -> Result<CategoryChanges, MenuError> {
        let name = match self.name {
            Some(name) => Some(required(Some(&name), "Name")?),
            None => None,
        };
        Ok(CategoryChanges {
            name,
            description: self.description,
            image_url: self.image_url,
            icon: self.icon,
            is_default: self.is_default,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burger() -> MenuItemDraft {
        MenuItemDraft {
            name: Some("Classic Burger".to_string()),
            description: Some("Beef patty".to_string()),
            price: Some("89.90".parse().unwrap()),
            category: Some("Burgers".to_string()),
            ..Default::default()
        }
    }

    fn reason(err: MenuError) -> String {
        match err {
            MenuError::InvalidRequest(reason) => reason,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn complete_draft_defaults_to_available() {
        let item = burger().validate().unwrap();
        assert_eq!(item.name, "Classic Burger");
        assert!(item.is_available);
        assert_eq!(item.image_url, None);
    }

    #[test]
    fn required_fields_are_enforced_in_order() {
        let mut draft = burger();
        draft.name = Some("  ".to_string());
        assert_eq!(reason(draft.validate().unwrap_err()), "name is required");

        let mut draft = burger();
        draft.description = None;
        assert_eq!(reason(draft.validate().unwrap_err()), "description is required");

        let mut draft = burger();
        draft.price = None;
        assert_eq!(reason(draft.validate().unwrap_err()), "price is required");

        let mut draft = burger();
        draft.category = Some(String::new());
        assert_eq!(reason(draft.validate().unwrap_err()), "category is required");
    }

    #[test]
    fn zero_price_is_allowed_but_negative_is_not() {
        let mut draft = burger();
        draft.price = Some(BigDecimal::zero());
        assert!(draft.validate().is_ok());

        draft.price = Some(BigDecimal::from(-1));
        assert_eq!(reason(draft.validate().unwrap_err()), "price must not be negative");
    }

    #[test]
    fn options_are_validated() {
        let mut draft = burger();
        draft.extras.push(PricedOption {
            name: "Cheese".to_string(),
            price: BigDecimal::from(-5),
        });
        assert_eq!(reason(draft.validate().unwrap_err()), "extra price must not be negative");

        let mut draft = burger();
        draft.piece_options.push(PieceOptionDraft {
            quantity: 0,
            price: BigDecimal::from(10),
            is_default: false,
        });
        assert!(draft.validate().is_err());
    }

    #[test]
    fn patch_rejects_blank_name() {
        let patch = MenuItemPatch {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());

        let patch = MenuItemPatch {
            is_available: Some(false),
            ..Default::default()
        };
        let changes = patch.validate().unwrap();
        assert_eq!(changes.is_available, Some(false));
        assert!(changes.updated_at.is_some());
    }

    #[test]
    fn category_requires_name() {
        assert_eq!(
            reason(CategoryDraft::default().validate().unwrap_err()),
            "Name is required"
        );
        assert!(CategoryDraft::default().into_changes().unwrap().is_empty());
    }
}
