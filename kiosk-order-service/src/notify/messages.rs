use bigdecimal::BigDecimal;

use crate::models::OrderItem;
use crate::money::format_amount;

pub struct EmailMessage {
    pub subject: String,
    pub html: String,
}

/// Customer-facing wording, branded with the store name and currency.
#[derive(Debug, Clone)]
pub struct MessageTemplates {
    pub store_name: String,
    pub currency_symbol: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            store_name: "KIOSK".to_string(),
            currency_symbol: "R".to_string(),
        }
    }
}

impl MessageTemplates {
    fn money(&self, amount: &BigDecimal) -> String {
        format!("{}{}", self.currency_symbol, format_amount(amount))
    }

    pub fn order_confirmation_sms(&self, order_number: &str) -> String {
        format!(
            "Your {} order number is: {order_number}. Thank you for your order!",
            self.store_name
        )
    }

    pub fn order_confirmation_email(
        &self,
        order_number: &str,
        items: &[OrderItem],
        total: &BigDecimal,
    ) -> EmailMessage {
        let lines: String = items
            .iter()
            .map(|item| {
                format!(
                    "<li>{} x {} - {}</li>",
                    escape_html(&item.item_name),
                    item.quantity,
                    self.money(&item.price)
                )
            })
            .collect();
        EmailMessage {
            subject: format!("Your {} Order Confirmation", self.store_name),
            html: format!(
                "<h2>Order Confirmation</h2>\
                 <p>Thank you for your order!</p>\
                 <p>Order Number: {order_number}</p>\
                 <h3>Order Details:</h3>\
                 <ul>{lines}</ul>\
                 <p>Total Amount: {}</p>",
                self.money(total)
            ),
        }
    }

    pub fn payment_confirmation_sms(&self, order_number: &str, amount: &BigDecimal) -> String {
        format!(
            "Payment received for order #{order_number}. Amount: {}",
            self.money(amount)
        )
    }

    pub fn payment_confirmation_email(
        &self,
        order_number: &str,
        amount: &BigDecimal,
    ) -> EmailMessage {
        EmailMessage {
            subject: "Order Payment Confirmed".to_string(),
            html: format!(
                "<p>Thank you for your payment of {}. Your order #{order_number} has been confirmed.</p>",
                self.money(amount)
            ),
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, quantity: i32, price: &str) -> OrderItem {
        OrderItem {
            id: 1,
            order_id: 1,
            item_name: name.to_string(),
            quantity,
            price: price.parse().unwrap(),
            extras: None,
            size: None,
            piece_option: None,
        }
    }

    #[test]
    fn order_sms_uses_store_name() {
        let templates = MessageTemplates::default();
        assert_eq!(
            templates.order_confirmation_sms("AB12CD34"),
            "Your KIOSK order number is: AB12CD34. Thank you for your order!"
        );
    }

    #[test]
    fn order_email_lists_items_escaped() {
        let templates = MessageTemplates::default();
        let email = templates.order_confirmation_email(
            "AB12CD34",
            &[item("Burger", 2, "50"), item("<b>Fries</b>", 1, "19.9")],
            &BigDecimal::from(120),
        );
        assert_eq!(email.subject, "Your KIOSK Order Confirmation");
        assert!(email.html.contains("<li>Burger x 2 - R50.00</li>"));
        assert!(email.html.contains("<li>&lt;b&gt;Fries&lt;/b&gt; x 1 - R19.90</li>"));
        assert!(email.html.contains("Total Amount: R120.00"));
    }

    #[test]
    fn payment_messages_carry_amount() {
        let templates = MessageTemplates {
            store_name: "Diner".to_string(),
            currency_symbol: "$".to_string(),
        };
        let amount: BigDecimal = "99.5".parse().unwrap();
        assert_eq!(
            templates.payment_confirmation_sms("AB12CD34", &amount),
            "Payment received for order #AB12CD34. Amount: $99.50"
        );
        let email = templates.payment_confirmation_email("AB12CD34", &amount);
        assert_eq!(email.subject, "Order Payment Confirmed");
        assert!(email.html.contains("$99.50"));
    }
}
