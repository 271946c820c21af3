//! Records as the external ledger describes them, and how they land locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_catalog::{Item, ItemId, Sku};
use shopledger_core::{DomainResult, ExternalId, ExternalSync, Money, Quantity};
use shopledger_parties::{ContactInfo, Customer, CustomerId, Supplier, SupplierId};

/// Stock item as held by the external ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalItem {
    pub external_id: ExternalId,
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub stock: Quantity,
    pub min_stock: Quantity,
    pub cost_price: Money,
    pub selling_price: Money,
}

impl ExternalItem {
    /// Overwrite the mutable fields of a matched local item.
    ///
    /// The SKU is the identity key and is never changed by an import.
    pub fn merge_into(&self, item: &mut Item) {
        item.name = self.name.clone();
        item.category = self.category.clone();
        item.stock = self.stock;
        item.min_stock = self.min_stock;
        item.cost_price = self.cost_price;
        item.selling_price = self.selling_price;
        item.sync.reconcile(&self.external_id);
    }

    /// Local item for an unmatched record, already marked synced.
    pub fn to_item(&self, id: ItemId, now: DateTime<Utc>) -> DomainResult<Item> {
        Ok(Item {
            id,
            sku: Sku::new(self.sku.clone())?,
            name: self.name.clone(),
            category: self.category.clone(),
            stock: self.stock,
            min_stock: self.min_stock,
            cost_price: self.cost_price,
            selling_price: self.selling_price,
            sync: ExternalSync::imported(self.external_id.clone()),
            created_at: now,
        })
    }
}

/// Supplier or customer ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalParty {
    pub external_id: ExternalId,
    pub name: String,
    pub contact: ContactInfo,
    /// Present for customers; only used when the customer is created locally.
    pub credit_limit: Option<Money>,
}

impl ExternalParty {
    pub fn merge_into_supplier(&self, supplier: &mut Supplier) {
        supplier.contact = self.contact.clone();
        supplier.sync.reconcile(&self.external_id);
    }

    /// Contact fields are refreshed; the credit limit stays as configured locally.
    pub fn merge_into_customer(&self, customer: &mut Customer) {
        customer.contact = ContactInfo {
            contact_person: customer.contact.contact_person.clone(),
            ..self.contact.clone()
        };
        customer.sync.reconcile(&self.external_id);
    }

    pub fn to_supplier(&self, id: SupplierId) -> Supplier {
        Supplier {
            id,
            name: self.name.clone(),
            contact: self.contact.clone(),
            sync: ExternalSync::imported(self.external_id.clone()),
        }
    }

    pub fn to_customer(&self, id: CustomerId) -> Customer {
        Customer {
            id,
            name: self.name.clone(),
            contact: self.contact.clone(),
            credit_limit: self.credit_limit.unwrap_or(Money::ZERO),
            sync: ExternalSync::imported(self.external_id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopledger_catalog::NewItem;
    use shopledger_core::Decimal;

    fn incoming() -> ExternalItem {
        ExternalItem {
            external_id: ExternalId::new("MON-24-001").unwrap(),
            sku: "MON-24-RENAMED".to_string(),
            name: "24-inch Monitor".to_string(),
            category: Some("Electronics".to_string()),
            stock: Decimal::from(15),
            min_stock: Decimal::from(3),
            cost_price: Decimal::from(12000),
            selling_price: Decimal::from(14400),
        }
    }

    #[test]
    fn merge_overwrites_fields_but_not_sku() {
        let mut item = Item::create(
            ItemId::new(),
            NewItem {
                sku: "MON-24-001".to_string(),
                name: "Monitor".to_string(),
                category: None,
                stock: Decimal::from(2),
                min_stock: None,
                cost_price: Decimal::from(1),
                selling_price: Decimal::from(1),
            },
            Decimal::from(5),
            Utc::now(),
        )
        .unwrap();

        incoming().merge_into(&mut item);

        assert_eq!(item.sku.as_str(), "MON-24-001");
        assert_eq!(item.name, "24-inch Monitor");
        assert_eq!(item.stock, Decimal::from(15));
        assert_eq!(item.min_stock, Decimal::from(3));
        assert!(item.sync.synced);
        assert_eq!(item.sync.external_id.as_ref().unwrap().as_str(), "MON-24-001");
    }

    #[test]
    fn unmatched_item_is_inserted_synced() {
        let item = incoming().to_item(ItemId::new(), Utc::now()).unwrap();
        assert!(item.sync.synced);
        assert_eq!(item.sku.as_str(), "MON-24-RENAMED");
    }

    #[test]
    fn customer_merge_keeps_credit_limit() {
        let mut customer = Customer {
            id: CustomerId::new(),
            name: "ABC Corporation".to_string(),
            contact: ContactInfo::default(),
            credit_limit: Decimal::from(25_000),
            sync: ExternalSync::default(),
        };
        let party = ExternalParty {
            external_id: ExternalId::new("ABC-CORP-001").unwrap(),
            name: "ABC Corporation".to_string(),
            contact: ContactInfo {
                email: Some("accounts@abccorp.com".to_string()),
                ..ContactInfo::default()
            },
            credit_limit: Some(Decimal::from(1_000_000)),
        };

        party.merge_into_customer(&mut customer);

        assert_eq!(customer.credit_limit, Decimal::from(25_000));
        assert_eq!(customer.contact.email.as_deref(), Some("accounts@abccorp.com"));
        assert!(customer.sync.synced);
    }
}
