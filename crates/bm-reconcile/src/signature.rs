use std::fmt;

use crate::PurchaseRecord;

// Unit separator: cannot appear in a typed item name, so field boundaries
// stay unambiguous.
const FIELD_SEP: char = '\u{1f}';
const ITEM_SEP: char = '\u{1e}';

/// Cart-content key: two records with the same signature describe the same
/// cart, captured at different checkout stages.
///
/// Built from the sorted `(seller_id, item_name, price)` triples. Deliberately
/// ignores `created_at` and `buyer_id`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signature(String);

impl Signature {
    pub fn of(record: &PurchaseRecord) -> Self {
        if record.items.is_empty() {
            // Item-less rows still need a key or they would vanish from
            // grouping entirely.
            return Signature(format!(
                "empty{FIELD_SEP}{}",
                record.amount_micros.unwrap_or(0)
            ));
        }

        let mut parts: Vec<String> = record
            .items
            .iter()
            .map(|i| {
                format!(
                    "{}{FIELD_SEP}{}{FIELD_SEP}{}",
                    i.seller_id, i.item_name, i.price_micros
                )
            })
            .collect();
        parts.sort();

        let mut key = String::new();
        for (n, p) in parts.iter().enumerate() {
            if n > 0 {
                key.push(ITEM_SEP);
            }
            key.push_str(p);
        }
        Signature(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let printable = self.0.replace(FIELD_SEP, "|").replace(ITEM_SEP, ";");
        f.write_str(&printable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ItemType, PurchaseItem, PurchaseStatus};
    use chrono::{TimeZone, Utc};

    fn record(id: &str) -> PurchaseRecord {
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        PurchaseRecord::new(id, ts, PurchaseStatus::Processing, "pending")
    }

    #[test]
    fn item_order_does_not_change_signature() {
        let a = record("a")
            .with_item(PurchaseItem::new("s1", "Night Drive", ItemType::BeatLicense, 30))
            .with_item(PurchaseItem::new("s2", "Drum Kit", ItemType::SoundKit, 10));
        let b = record("b")
            .with_item(PurchaseItem::new("s2", "Drum Kit", ItemType::SoundKit, 10))
            .with_item(PurchaseItem::new("s1", "Night Drive", ItemType::BeatLicense, 30));
        assert_eq!(Signature::of(&a), Signature::of(&b));
    }

    #[test]
    fn price_and_seller_are_part_of_the_key() {
        let a = record("a").with_item(PurchaseItem::new("s1", "Beat", ItemType::BeatLicense, 30));
        let b = record("b").with_item(PurchaseItem::new("s1", "Beat", ItemType::BeatLicense, 31));
        let c = record("c").with_item(PurchaseItem::new("s2", "Beat", ItemType::BeatLicense, 30));
        assert_ne!(Signature::of(&a), Signature::of(&b));
        assert_ne!(Signature::of(&a), Signature::of(&c));
    }

    #[test]
    fn item_less_records_key_on_recorded_amount() {
        let a = record("a").with_amount(5);
        let b = record("b").with_amount(5);
        let c = record("c").with_amount(6);
        assert_eq!(Signature::of(&a), Signature::of(&b));
        assert_ne!(Signature::of(&a), Signature::of(&c));
        assert_eq!(Signature::of(&a).to_string(), "empty|5");
    }
}
