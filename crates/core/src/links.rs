//! Order summary text and outbound deep links.

use std::fmt::Write as _;

use crate::cart::CartLine;
use crate::types::Money;

/// Base of a LINE profile link; the account id is appended.
pub const LINE_PROFILE_BASE: &str = "https://line.me/ti/p/";

/// Customer contact fields echoed into an order summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderContact {
    pub name: String,
    pub phone: String,
    pub line_id: Option<String>,
    pub address: String,
    pub note: Option<String>,
}

/// Plain-text order summary: one row per line, the total, then contact
/// fields. Used for both the mail link and the LINE message.
#[must_use]
pub fn order_summary(lines: &[CartLine], contact: &OrderContact, currency: &str) -> String {
    let mut out = String::from("New order\n\n");
    for line in lines {
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "- {} x{} = {}",
            line.product.name,
            line.quantity,
            line.subtotal().display(currency)
        );
    }
    let total: Money = lines.iter().map(CartLine::subtotal).sum();
    let _ = writeln!(out, "\nTotal: {}\n", total.display(currency));
    let _ = writeln!(out, "Name: {}", contact.name);
    let _ = writeln!(out, "Phone: {}", contact.phone);
    if let Some(line_id) = &contact.line_id {
        let _ = writeln!(out, "LINE: {line_id}");
    }
    let _ = writeln!(out, "Address: {}", contact.address);
    if let Some(note) = &contact.note {
        let _ = writeln!(out, "Note: {note}");
    }
    out
}

/// Prefilled message for a product card's "contact to buy" link.
#[must_use]
pub fn contact_to_buy_text(product_name: &str) -> String {
    format!("I'd like to buy: {product_name}")
}

/// LINE deep link opening a chat with `line_id`, prefilled with `text`.
#[must_use]
pub fn line_link(line_id: &str, text: &str) -> String {
    format!(
        "{LINE_PROFILE_BASE}{}?text={}",
        urlencoding::encode(line_id),
        urlencoding::encode(text)
    )
}

/// `mailto:` link with percent-encoded subject and body.
#[must_use]
pub fn mailto_link(email: &str, subject: &str, body: &str) -> String {
    format!(
        "mailto:{email}?subject={}&body={}",
        urlencoding::encode(subject),
        urlencoding::encode(body)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample;

    fn lines() -> Vec<CartLine> {
        let mut catalog = sample::catalog();
        let second = catalog.remove(1);
        let first = catalog.remove(0);
        vec![
            CartLine {
                product: first,
                quantity: 3,
            },
            CartLine {
                product: second,
                quantity: 1,
            },
        ]
    }

    #[test]
    fn test_order_summary_lists_lines_total_and_contact() {
        let contact = OrderContact {
            name: "Lin".to_string(),
            phone: "0912345678".to_string(),
            line_id: None,
            address: "Taipei".to_string(),
            note: Some("Evening delivery".to_string()),
        };
        let summary = order_summary(&lines(), &contact, "NT$");

        assert!(summary.contains("- Red Albino x3 = NT$ 1,800"));
        assert!(summary.contains("- Golden Fantail x1 = NT$ 450"));
        assert!(summary.contains("Total: NT$ 2,250"));
        assert!(summary.contains("Phone: 0912345678"));
        assert!(summary.contains("Note: Evening delivery"));
        assert!(!summary.contains("LINE:"));
    }

    #[test]
    fn test_line_link_encodes_text() {
        let link = line_link("tsAGZrm9vt", &contact_to_buy_text("Red Albino"));
        assert_eq!(
            link,
            "https://line.me/ti/p/tsAGZrm9vt?text=I%27d%20like%20to%20buy%3A%20Red%20Albino"
        );
    }

    #[test]
    fn test_mailto_link_encodes_newlines() {
        let link = mailto_link("shop@example.com", "Order", "a\nb & c");
        assert_eq!(
            link,
            "mailto:shop@example.com?subject=Order&body=a%0Ab%20%26%20c"
        );
    }
}
