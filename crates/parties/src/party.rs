use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{DomainError, DomainResult, Entity, ExternalSync, Money, ValueObject};
use shopledger_events::Event;

shopledger_core::uuid_id!(
    /// Supplier identifier.
    SupplierId, "SupplierId"
);

shopledger_core::uuid_id!(
    /// Customer identifier.
    CustomerId, "CustomerId"
);

shopledger_core::uuid_id!(
    /// Employee identifier.
    EmployeeId, "EmployeeId"
);

/// Reconcilable party kind: supplier or customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Supplier,
    Customer,
}

impl PartyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PartyKind::Supplier => "supplier",
            PartyKind::Customer => "customer",
        }
    }
}

impl core::fmt::Display for PartyKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contact details for a party. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub gst_number: Option<String>,
}

impl ValueObject for ContactInfo {}

fn party_name(kind: &str, name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{kind} name cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Supplier. The name is its natural key for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact: ContactInfo,
    pub sync: ExternalSync,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierUpdate {
    pub contact: ContactInfo,
}

impl Supplier {
    /// Register a supplier; local registrations start unsynced.
    pub fn create(id: SupplierId, input: NewSupplier) -> DomainResult<Self> {
        Ok(Self {
            id,
            name: party_name("supplier", &input.name)?,
            contact: input.contact,
            sync: ExternalSync::default(),
        })
    }

    pub fn apply_update(&mut self, update: SupplierUpdate) {
        self.contact = update.contact;
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Customer. The credit limit is recorded but not enforced on sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub contact: ContactInfo,
    pub credit_limit: Money,
    pub sync: ExternalSync,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub contact: ContactInfo,
    pub credit_limit: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub contact: ContactInfo,
    pub credit_limit: Money,
}

impl Customer {
    pub fn create(id: CustomerId, input: NewCustomer) -> DomainResult<Self> {
        Ok(Self {
            id,
            name: party_name("customer", &input.name)?,
            contact: input.contact,
            credit_limit: input.credit_limit,
            sync: ExternalSync::default(),
        })
    }

    pub fn apply_update(&mut self, update: CustomerUpdate) {
        self.contact = update.contact;
        self.credit_limit = update.credit_limit;
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Staff member who takes sales orders or is assigned sale lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub role: Option<String>,
    pub department: Option<String>,
    pub hourly_rate: Money,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub role: Option<String>,
    pub department: Option<String>,
    pub hourly_rate: Money,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Employee {
    pub fn create(id: EmployeeId, input: NewEmployee, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id,
            name: party_name("employee", &input.name)?,
            role: input.role,
            department: input.department,
            hourly_rate: input.hourly_rate,
            phone: input.phone,
            email: input.email,
            joined_at: now,
        })
    }

    /// Replace every editable field, name included.
    pub fn apply_update(&mut self, update: NewEmployee) -> DomainResult<()> {
        let name = party_name("employee", &update.name)?;
        self.name = name;
        self.role = update.role;
        self.department = update.department;
        self.hourly_rate = update.hourly_rate;
        self.phone = update.phone;
        self.email = update.email;
        Ok(())
    }
}

impl Entity for Employee {
    type Id = EmployeeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyEvent {
    SupplierRegistered {
        supplier_id: SupplierId,
        name: String,
        occurred_at: DateTime<Utc>,
    },
    SupplierUpdated {
        supplier_id: SupplierId,
        name: String,
        occurred_at: DateTime<Utc>,
    },
    SupplierRemoved {
        supplier_id: SupplierId,
        name: String,
        occurred_at: DateTime<Utc>,
    },
    CustomerRegistered {
        customer_id: CustomerId,
        name: String,
        occurred_at: DateTime<Utc>,
    },
    CustomerUpdated {
        customer_id: CustomerId,
        name: String,
        occurred_at: DateTime<Utc>,
    },
    CustomerRemoved {
        customer_id: CustomerId,
        name: String,
        occurred_at: DateTime<Utc>,
    },
    EmployeeRegistered {
        employee_id: EmployeeId,
        name: String,
        occurred_at: DateTime<Utc>,
    },
    EmployeeUpdated {
        employee_id: EmployeeId,
        name: String,
        occurred_at: DateTime<Utc>,
    },
    EmployeeRemoved {
        employee_id: EmployeeId,
        name: String,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for PartyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PartyEvent::SupplierRegistered { .. } => "parties.supplier.registered",
            PartyEvent::SupplierUpdated { .. } => "parties.supplier.updated",
            PartyEvent::CustomerRegistered { .. } => "parties.customer.registered",
            PartyEvent::CustomerUpdated { .. } => "parties.customer.updated",
            PartyEvent::EmployeeRegistered { .. } => "parties.employee.registered",
            PartyEvent::SupplierRemoved { .. } => "parties.supplier.removed",
            PartyEvent::CustomerRemoved { .. } => "parties.customer.removed",
            PartyEvent::EmployeeUpdated { .. } => "parties.employee.updated",
            PartyEvent::EmployeeRemoved { .. } => "parties.employee.removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PartyEvent::SupplierRegistered { occurred_at, .. }
            | PartyEvent::SupplierUpdated { occurred_at, .. }
            | PartyEvent::CustomerRegistered { occurred_at, .. }
            | PartyEvent::CustomerUpdated { occurred_at, .. }
            | PartyEvent::EmployeeRegistered { occurred_at, .. }
            | PartyEvent::SupplierRemoved { occurred_at, .. }
            | PartyEvent::CustomerRemoved { occurred_at, .. }
            | PartyEvent::EmployeeUpdated { occurred_at, .. }
            | PartyEvent::EmployeeRemoved { occurred_at, .. } => *occurred_at,
        }
    }

    fn describe(&self) -> String {
        match self {
            PartyEvent::SupplierRegistered { name, .. } => format!("Added supplier: {name}"),
            PartyEvent::SupplierUpdated { name, .. } => format!("Edited supplier: {name}"),
            PartyEvent::CustomerRegistered { name, .. } => format!("Added customer: {name}"),
            PartyEvent::CustomerUpdated { name, .. } => format!("Edited customer: {name}"),
            PartyEvent::EmployeeRegistered { name, .. } => format!("Added employee: {name}"),
            PartyEvent::SupplierRemoved { name, .. } => format!("Deleted supplier: {name}"),
            PartyEvent::CustomerRemoved { name, .. } => format!("Deleted customer: {name}"),
            PartyEvent::EmployeeUpdated { name, .. } => format!("Edited employee: {name}"),
            PartyEvent::EmployeeRemoved { name, .. } => format!("Deleted employee: {name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopledger_core::{Decimal, ExternalId};

    #[test]
    fn blank_names_are_rejected_for_every_party() {
        let supplier = Supplier::create(
            SupplierId::new(),
            NewSupplier {
                name: "  ".to_string(),
                contact: ContactInfo::default(),
            },
        );
        assert!(matches!(supplier, Err(DomainError::Validation(_))));

        let customer = Customer::create(
            CustomerId::new(),
            NewCustomer {
                name: String::new(),
                contact: ContactInfo::default(),
                credit_limit: Decimal::ZERO,
            },
        );
        assert!(matches!(customer, Err(DomainError::Validation(_))));

        let employee = Employee::create(
            EmployeeId::new(),
            NewEmployee {
                name: "\t".to_string(),
                role: None,
                department: None,
                hourly_rate: Decimal::ZERO,
                phone: None,
                email: None,
            },
            Utc::now(),
        );
        assert!(matches!(employee, Err(DomainError::Validation(_))));
    }

    #[test]
    fn registered_parties_start_unsynced() {
        let supplier = Supplier::create(
            SupplierId::new(),
            NewSupplier {
                name: " Dell India Pvt Ltd ".to_string(),
                contact: ContactInfo::default(),
            },
        )
        .unwrap();
        assert_eq!(supplier.name, "Dell India Pvt Ltd");
        assert_eq!(supplier.sync, ExternalSync::default());
    }

    #[test]
    fn customer_update_keeps_name_and_sync_state() {
        let mut customer = Customer::create(
            CustomerId::new(),
            NewCustomer {
                name: "ABC Corporation".to_string(),
                contact: ContactInfo::default(),
                credit_limit: Decimal::from(1_000_000),
            },
        )
        .unwrap();
        customer.sync = ExternalSync::imported(ExternalId::new("CUST-001").unwrap());

        customer.apply_update(CustomerUpdate {
            contact: ContactInfo {
                phone: Some("+91-22-12345678".to_string()),
                ..ContactInfo::default()
            },
            credit_limit: Decimal::from(750_000),
        });

        assert_eq!(customer.name, "ABC Corporation");
        assert_eq!(customer.credit_limit, Decimal::from(750_000));
        assert!(customer.sync.synced);
        assert_eq!(customer.contact.phone.as_deref(), Some("+91-22-12345678"));
    }

    #[test]
    fn employee_update_replaces_fields_but_not_a_blank_name() {
        let mut employee = Employee::create(
            EmployeeId::new(),
            NewEmployee {
                name: "Ravi".to_string(),
                role: Some("Cashier".to_string()),
                department: None,
                hourly_rate: Decimal::from(150),
                phone: None,
                email: None,
            },
            Utc::now(),
        )
        .unwrap();
        let joined_at = employee.joined_at;

        employee
            .apply_update(NewEmployee {
                name: "Ravi Kumar".to_string(),
                role: Some("Store Manager".to_string()),
                department: Some("Front".to_string()),
                hourly_rate: Decimal::from(220),
                phone: None,
                email: Some("ravi@example.com".to_string()),
            })
            .unwrap();
        assert_eq!(employee.name, "Ravi Kumar");
        assert_eq!(employee.hourly_rate, Decimal::from(220));
        assert_eq!(employee.joined_at, joined_at);

        let before = employee.clone();
        let err = employee
            .apply_update(NewEmployee {
                name: " ".to_string(),
                role: None,
                department: None,
                hourly_rate: Decimal::ZERO,
                phone: None,
                email: None,
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(employee, before);
    }
}
