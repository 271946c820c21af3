//! Seams to the external accounting ledger.
//!
//! There is no live protocol: sources hand over whole batches and targets
//! accept one record at a time. The sample/simulated implementations stand in
//! for a real ledger connection.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shopledger_catalog::Item;
use shopledger_core::{Decimal, ExternalId, Money, Quantity};
use shopledger_core::id::Uuid;
use shopledger_parties::{ContactInfo, Customer, PartyKind, Supplier};

use crate::record::{ExternalItem, ExternalParty};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("ledger rejected record: {0}")]
    Rejected(String),

    #[error("malformed ledger record: {0}")]
    Malformed(String),
}

/// One fetched batch plus the source's note about where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<T> {
    pub records: Vec<T>,
    pub note: String,
}

pub trait LedgerSource: Send + Sync {
    fn fetch_items(&self) -> Result<Batch<ExternalItem>, LedgerError>;

    fn fetch_parties(&self, kind: PartyKind) -> Result<Batch<ExternalParty>, LedgerError>;
}

/// Local record in the shape pushed to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExportRecord {
    StockItem {
        local_id: Uuid,
        sku: String,
        name: String,
        category: Option<String>,
        stock: Quantity,
        /// Stock valued at cost.
        opening_value: Money,
    },
    Party {
        local_id: Uuid,
        kind: PartyKind,
        name: String,
        contact: ContactInfo,
        credit_limit: Option<Money>,
    },
}

impl ExportRecord {
    pub fn local_id(&self) -> Uuid {
        match self {
            ExportRecord::StockItem { local_id, .. } | ExportRecord::Party { local_id, .. } => {
                *local_id
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ExportRecord::StockItem { name, .. } | ExportRecord::Party { name, .. } => name,
        }
    }
}

impl From<&Item> for ExportRecord {
    fn from(item: &Item) -> Self {
        ExportRecord::StockItem {
            local_id: *item.id.as_uuid(),
            sku: item.sku.as_str().to_string(),
            name: item.name.clone(),
            category: item.category.clone(),
            stock: item.stock,
            opening_value: item.stock_value(),
        }
    }
}

impl From<&Supplier> for ExportRecord {
    fn from(supplier: &Supplier) -> Self {
        ExportRecord::Party {
            local_id: *supplier.id.as_uuid(),
            kind: PartyKind::Supplier,
            name: supplier.name.clone(),
            contact: supplier.contact.clone(),
            credit_limit: None,
        }
    }
}

impl From<&Customer> for ExportRecord {
    fn from(customer: &Customer) -> Self {
        ExportRecord::Party {
            local_id: *customer.id.as_uuid(),
            kind: PartyKind::Customer,
            name: customer.name.clone(),
            contact: customer.contact.clone(),
            credit_limit: Some(customer.credit_limit),
        }
    }
}

/// Record kinds that can be pushed to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Items,
    Suppliers,
    Customers,
}

impl ExportKind {
    pub fn noun(self) -> &'static str {
        match self {
            ExportKind::Items => "items",
            ExportKind::Suppliers => "suppliers",
            ExportKind::Customers => "customers",
        }
    }

    /// `record_type` written to the sync log.
    pub fn record_type(self) -> &'static str {
        match self {
            ExportKind::Items => "Item",
            ExportKind::Suppliers => "Supplier",
            ExportKind::Customers => "Customer",
        }
    }
}

pub trait LedgerTarget: Send + Sync {
    /// Push one record; returns the ledger's acknowledgement message.
    fn push(&self, record: &ExportRecord) -> Result<String, LedgerError>;
}

/// Target that accepts every record without contacting anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedLedgerTarget;

impl LedgerTarget for SimulatedLedgerTarget {
    fn push(&self, record: &ExportRecord) -> Result<String, LedgerError> {
        tracing::debug!(local_id = %record.local_id(), name = record.name(), "simulated ledger push");
        let what = match record {
            ExportRecord::StockItem { .. } => "Item",
            ExportRecord::Party {
                kind: PartyKind::Supplier,
                ..
            } => "Supplier",
            ExportRecord::Party {
                kind: PartyKind::Customer,
                ..
            } => "Customer",
        };
        Ok(format!("{what} synced successfully (simulated)"))
    }
}

/// Source serving a fixed demonstration ledger.
#[derive(Debug, Default, Clone, Copy)]
pub struct SampleLedgerSource;

const SAMPLE_NOTE: &str = "Success (Sample Data)";

fn external_id(raw: &str) -> Result<ExternalId, LedgerError> {
    ExternalId::new(raw).map_err(|e| LedgerError::Malformed(e.to_string()))
}

fn text(value: &str) -> Option<String> {
    Some(value.to_string())
}

impl SampleLedgerSource {
    #[allow(clippy::too_many_arguments)]
    fn item(
        guid: &str,
        sku: &str,
        name: &str,
        category: &str,
        stock: i64,
        cost: i64,
        price: i64,
        min_stock: i64,
    ) -> Result<ExternalItem, LedgerError> {
        Ok(ExternalItem {
            external_id: external_id(guid)?,
            sku: sku.to_string(),
            name: name.to_string(),
            category: text(category),
            stock: Decimal::from(stock),
            min_stock: Decimal::from(min_stock),
            cost_price: Decimal::from(cost),
            selling_price: Decimal::from(price),
        })
    }

    fn supplier(
        guid: &str,
        name: &str,
        person: &str,
        phone: &str,
        email: &str,
        address: &str,
        gst: &str,
    ) -> Result<ExternalParty, LedgerError> {
        Ok(ExternalParty {
            external_id: external_id(guid)?,
            name: name.to_string(),
            contact: ContactInfo {
                contact_person: text(person),
                phone: text(phone),
                email: text(email),
                address: text(address),
                gst_number: text(gst),
            },
            credit_limit: None,
        })
    }

    fn customer(
        guid: &str,
        name: &str,
        phone: &str,
        email: &str,
        address: &str,
        gst: &str,
        credit_limit: i64,
    ) -> Result<ExternalParty, LedgerError> {
        Ok(ExternalParty {
            external_id: external_id(guid)?,
            name: name.to_string(),
            contact: ContactInfo {
                contact_person: None,
                phone: text(phone),
                email: text(email),
                address: text(address),
                gst_number: text(gst),
            },
            credit_limit: Some(Decimal::from(credit_limit)),
        })
    }
}

impl LedgerSource for SampleLedgerSource {
    fn fetch_items(&self) -> Result<Batch<ExternalItem>, LedgerError> {
        let records = vec![
            Self::item("LAP-DELL-LAT", "LAP-DELL-LAT", "Laptop Dell Latitude", "Electronics", 25, 55000, 66000, 5)?,
            Self::item("KB-WRL-001", "KB-WRL-001", "Wireless Keyboard", "Electronics", 50, 1200, 1500, 10)?,
            Self::item("MON-24-001", "MON-24-001", "24-inch Monitor", "Electronics", 15, 12000, 14400, 3)?,
            Self::item("CHAIR-OFF-001", "CHAIR-OFF-001", "Office Chair", "Furniture", 30, 4500, 6000, 5)?,
            Self::item("TABLE-DESK-001", "TABLE-DESK-001", "Desk Table", "Furniture", 20, 8000, 10000, 3)?,
        ];
        Ok(Batch {
            records,
            note: SAMPLE_NOTE.to_string(),
        })
    }

    fn fetch_parties(&self, kind: PartyKind) -> Result<Batch<ExternalParty>, LedgerError> {
        let records = match kind {
            PartyKind::Supplier => vec![
                Self::supplier(
                    "TECH-SOL-001",
                    "Tech Solutions India Pvt Ltd",
                    "Rajesh Kumar",
                    "+91-9876543210",
                    "rajesh@techsolutions.com",
                    "123 Tech Park, Bangalore, Karnataka",
                    "29AABCT3514Q1Z5",
                )?,
                Self::supplier(
                    "GLOBAL-ELEC-001",
                    "Global Electronics Corp",
                    "Priya Sharma",
                    "+91-9876543211",
                    "priya@globalelectronics.com",
                    "456 Electronics Zone, Mumbai, Maharashtra",
                    "27AABCU9603R1ZM",
                )?,
                Self::supplier(
                    "OFFICE-SUP-001",
                    "Office Supplies Depot",
                    "Amit Patel",
                    "+91-9876543212",
                    "amit@officesupplies.com",
                    "789 Business Center, Delhi",
                    "07AABCA1234A1Z5",
                )?,
                Self::supplier(
                    "FURNITURE-WORLD-001",
                    "Furniture World",
                    "Sneha Reddy",
                    "+91-9876543213",
                    "sneha@furnitureworld.com",
                    "321 Furniture Street, Hyderabad, Telangana",
                    "36AABCF1234A1Z3",
                )?,
                Self::supplier(
                    "COMP-HARD-001",
                    "Computer Hardware Ltd",
                    "Vikram Singh",
                    "+91-9876543214",
                    "vikram@computerhardware.com",
                    "654 Hardware Lane, Pune, Maharashtra",
                    "27AABCV1234A1Z6",
                )?,
            ],
            PartyKind::Customer => vec![
                Self::customer(
                    "ABC-CORP-001",
                    "ABC Corporation",
                    "+91-9876543220",
                    "accounts@abccorp.com",
                    "Corporate Office, Chennai",
                    "33AABCA1234A1Z1",
                    1_000_000,
                )?,
                Self::customer(
                    "XYZ-ENT-001",
                    "XYZ Enterprises",
                    "+91-9876543221",
                    "info@xyzenterprises.com",
                    "Business Park, Mumbai",
                    "27AABCX1234A1Z2",
                    500_000,
                )?,
            ],
        };
        Ok(Batch {
            records,
            note: SAMPLE_NOTE.to_string(),
        })
    }
}
