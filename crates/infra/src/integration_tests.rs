//! Integration tests for the workflow engine.
//!
//! Tests: Engine → UnitOfWork → Store, with audit and sync log side effects
//!
//! Verifies:
//! - Orders move stock and raise exactly one payable/receivable
//! - Rejected calls leave no partial writes
//! - Alerts track stock after every mutation
//! - Records still named by orders cannot be deleted
//! - Ledger imports/exports reconcile without duplicating records

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use shopledger_accounting::SettlementStatus;
    use shopledger_catalog::{AlertKind, Item, ItemId, ItemUpdate, NewItem};
    use shopledger_core::{
        Decimal, DocumentKind, DocumentNumber, DomainError, DomainResult, ExternalId,
    };
    use shopledger_events::InMemoryAuditSink;
    use shopledger_parties::{
        ContactInfo, Customer, CustomerId, Employee, EmployeeId, NewCustomer, NewEmployee,
        NewSupplier, NewTask, PartyKind, Supplier, SupplierUpdate, TaskId, TaskPriority,
        TaskStatus,
    };
    use shopledger_purchasing::{PurchaseLineInput, PurchaseOrderStatus, RECEIVE_REJECTED};
    use shopledger_reconciliation::{
        Batch, ExportKind, ExportRecord, ExternalItem, ExternalParty, LedgerError, LedgerSource,
        LedgerTarget, SampleLedgerSource, SimulatedLedgerTarget, SyncKind, SyncOutcome,
    };
    use shopledger_sales::{COMPLETE_REJECTED, SaleLineInput, SalesOrderStatus};

    use crate::clock::FixedClock;
    use crate::engine::{BusinessPolicy, Engine, WorkflowError};
    use crate::numbering::DocumentNumbers;
    use crate::store::InMemoryStore;
    use crate::workflows::{PurchaseOrderRequest, SalesOrderRequest};

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn opening() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap()
    }

    struct Shop {
        engine: Engine<InMemoryStore>,
        clock: Arc<FixedClock>,
        audit: Arc<InMemoryAuditSink>,
    }

    fn shop() -> Shop {
        let clock = Arc::new(FixedClock::new(opening()));
        let audit = Arc::new(InMemoryAuditSink::new());
        let engine = Engine::new(InMemoryStore::new())
            .with_clock(clock.clone())
            .with_audit(audit.clone());
        Shop {
            engine,
            clock,
            audit,
        }
    }

    fn item(engine: &Engine<InMemoryStore>, sku: &str, stock: i64, price: i64) -> Item {
        engine
            .create_item(NewItem {
                sku: sku.to_string(),
                name: format!("Item {sku}"),
                category: Some("Electronics".to_string()),
                stock: dec(stock),
                min_stock: None,
                cost_price: dec(price / 2),
                selling_price: dec(price),
            })
            .unwrap()
    }

    fn supplier(engine: &Engine<InMemoryStore>, name: &str) -> Supplier {
        engine
            .create_supplier(NewSupplier {
                name: name.to_string(),
                contact: ContactInfo::default(),
            })
            .unwrap()
    }

    fn customer(engine: &Engine<InMemoryStore>, name: &str) -> Customer {
        engine
            .create_customer(NewCustomer {
                name: name.to_string(),
                contact: ContactInfo::default(),
                credit_limit: dec(100_000),
            })
            .unwrap()
    }

    fn employee(engine: &Engine<InMemoryStore>) -> Employee {
        engine
            .create_employee(NewEmployee {
                name: "Rajesh Kumar".to_string(),
                role: Some("Sales".to_string()),
                department: None,
                hourly_rate: dec(250),
                phone: None,
                email: None,
            })
            .unwrap()
    }

    fn stock_of(engine: &Engine<InMemoryStore>, id: ItemId) -> Decimal {
        engine.get_item(id).unwrap().unwrap().stock
    }

    fn po_line(item: &Item, quantity: i64, unit_cost: i64) -> PurchaseLineInput {
        PurchaseLineInput {
            item_id: Some(item.id),
            quantity: Some(dec(quantity)),
            unit_cost: Some(dec(unit_cost)),
        }
    }

    fn sale_line(item: &Item, quantity: i64, assigned: &Employee) -> SaleLineInput {
        SaleLineInput {
            item_id: Some(item.id),
            quantity: Some(dec(quantity)),
            assigned_employee_id: Some(assigned.id),
        }
    }

    fn sale(
        customer: &Customer,
        employee: &Employee,
        lines: Vec<SaleLineInput>,
    ) -> SalesOrderRequest {
        SalesOrderRequest {
            customer_id: Some(customer.id),
            employee_id: Some(employee.id),
            lines,
            discount: Decimal::ZERO,
        }
    }

    struct StubSource {
        items: Vec<ExternalItem>,
        parties: Vec<ExternalParty>,
    }

    impl LedgerSource for StubSource {
        fn fetch_items(&self) -> Result<Batch<ExternalItem>, LedgerError> {
            Ok(Batch {
                records: self.items.clone(),
                note: "stub".to_string(),
            })
        }

        fn fetch_parties(&self, _kind: PartyKind) -> Result<Batch<ExternalParty>, LedgerError> {
            Ok(Batch {
                records: self.parties.clone(),
                note: "stub".to_string(),
            })
        }
    }

    struct OfflineLedger;

    impl LedgerTarget for OfflineLedger {
        fn push(&self, _record: &ExportRecord) -> Result<String, LedgerError> {
            Err(LedgerError::Unavailable("connection refused".to_string()))
        }
    }

    fn external_party(guid: &str, name: &str, phone: &str) -> ExternalParty {
        ExternalParty {
            external_id: ExternalId::new(guid).unwrap(),
            name: name.to_string(),
            contact: ContactInfo {
                phone: Some(phone.to_string()),
                ..ContactInfo::default()
            },
            credit_limit: None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Alerting
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn alert_recompute_with_unchanged_stock_keeps_one_unresolved_alert() {
        let shop = shop();
        let chair = item(&shop.engine, "CHAIR-OFF-001", 3, 6000);

        for _ in 0..3 {
            shop.engine.recompute_alert(chair.id).unwrap();
        }
        let alerts = shop.engine.unresolved_alerts().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::LowStock);
        assert_eq!(
            alerts[0].message,
            "Low stock alert: Item CHAIR-OFF-001 has only 3 units left"
        );
    }

    #[test]
    fn alert_follows_stock_through_out_of_stock_and_back() {
        let shop = shop();
        let desk = item(&shop.engine, "DESK-WOOD", 20, 9000);
        assert!(shop.engine.unresolved_alerts().unwrap().is_empty());

        shop.engine.adjust_stock(desk.id, dec(-20)).unwrap();
        let alerts = shop.engine.unresolved_alerts().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::OutOfStock);

        shop.engine.adjust_stock(desk.id, dec(4)).unwrap();
        let alerts = shop.engine.unresolved_alerts().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::LowStock);

        shop.engine.adjust_stock(desk.id, dec(10)).unwrap();
        assert!(shop.engine.unresolved_alerts().unwrap().is_empty());
        // Alerts that stopped applying are gone, not left for the purge.
        assert_eq!(shop.engine.purge_resolved_alerts().unwrap(), 0);
    }

    #[test]
    fn restocking_past_the_threshold_deletes_the_alert() {
        let shop = shop();
        let lamp = item(&shop.engine, "LAMP-01", 3, 800);
        let fan = item(&shop.engine, "FAN-01", 2, 1500);
        assert_eq!(shop.engine.unresolved_alerts().unwrap().len(), 2);

        shop.engine.adjust_stock(lamp.id, dec(10)).unwrap();
        assert_eq!(shop.engine.purge_resolved_alerts().unwrap(), 0);

        let fan_alert = shop.engine.unresolved_alerts().unwrap().remove(0);
        assert_eq!(fan_alert.item_id, fan.id);
        shop.engine.resolve_alert(fan_alert.id).unwrap();
        assert_eq!(shop.engine.purge_resolved_alerts().unwrap(), 1);
    }

    #[test]
    fn resolving_an_alert_twice_is_rejected() {
        let shop = shop();
        item(&shop.engine, "MOUSE-01", 1, 500);
        let alert = shop.engine.unresolved_alerts().unwrap().remove(0);

        shop.engine.resolve_alert(alert.id).unwrap();
        let err = shop.engine.resolve_alert(alert.id).unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(DomainError::NotFoundOrInvalidState(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn at_most_one_unresolved_alert_per_item(deltas in prop::collection::vec(-15i64..15, 1..12)) {
            let shop = shop();
            let cable = item(&shop.engine, "CABLE-HDMI", 8, 300);

            for delta in deltas {
                shop.engine.adjust_stock(cable.id, dec(delta)).unwrap();
                let stock = stock_of(&shop.engine, cable.id);
                let alerts = shop.engine.unresolved_alerts().unwrap();

                let expected = if stock <= Decimal::ZERO {
                    Some(AlertKind::OutOfStock)
                } else if stock <= dec(5) {
                    Some(AlertKind::LowStock)
                } else {
                    None
                };
                prop_assert!(alerts.len() <= 1);
                prop_assert_eq!(alerts.first().map(|a| a.kind), expected);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Catalog
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn duplicate_sku_is_rejected() {
        let shop = shop();
        item(&shop.engine, "KB-MECH", 10, 3000);
        let err = shop
            .engine
            .create_item(NewItem {
                sku: " KB-MECH ".to_string(),
                name: "Another keyboard".to_string(),
                category: None,
                stock: dec(1),
                min_stock: None,
                cost_price: dec(1),
                selling_price: dec(2),
            })
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::DuplicateKey(_))));
        assert_eq!(shop.engine.list_items().unwrap().len(), 1);
    }

    #[test]
    fn editing_an_item_onto_a_taken_sku_is_rejected() {
        let shop = shop();
        item(&shop.engine, "SKU-A", 10, 100);
        let b = item(&shop.engine, "SKU-B", 10, 100);

        let err = shop
            .engine
            .update_item(
                b.id,
                ItemUpdate {
                    sku: "SKU-A".to_string(),
                    name: b.name.clone(),
                    category: None,
                    stock: dec(10),
                    min_stock: dec(5),
                    cost_price: dec(50),
                    selling_price: dec(100),
                },
            )
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::DuplicateKey(_))));
        assert_eq!(
            shop.engine.get_item(b.id).unwrap().unwrap().sku.as_str(),
            "SKU-B"
        );
    }

    #[test]
    fn stock_past_the_decimal_range_is_a_validation_error() {
        let shop = shop();
        let bolt = item(&shop.engine, "BOLT-M8", 10, 2);

        let err = shop.engine.adjust_stock(bolt.id, Decimal::MAX).unwrap_err();
        assert_eq!(
            err.domain(),
            Some(&DomainError::validation("stock of BOLT-M8 is out of range"))
        );
        assert_eq!(stock_of(&shop.engine, bolt.id), dec(10));
    }

    #[test]
    fn item_on_an_order_cannot_be_deleted() {
        let shop = shop();
        let kept = item(&shop.engine, "KEPT", 10, 100);
        let spare = item(&shop.engine, "SPARE", 1, 100);
        let vendor = supplier(&shop.engine, "Tech Distributors");
        shop.engine
            .create_purchase_order(PurchaseOrderRequest {
                supplier_id: Some(vendor.id),
                lines: vec![po_line(&kept, 1, 50)],
            })
            .unwrap();

        let err = shop.engine.delete_item(kept.id).unwrap_err();
        assert_eq!(
            err.domain(),
            Some(&DomainError::validation("item KEPT is referenced by 1 order(s)"))
        );
        assert!(shop.engine.get_item(kept.id).unwrap().is_some());

        assert_eq!(shop.engine.unresolved_alerts().unwrap().len(), 1);
        shop.engine.delete_item(spare.id).unwrap();
        assert!(shop.engine.get_item(spare.id).unwrap().is_none());
        assert!(shop.engine.unresolved_alerts().unwrap().is_empty());
        assert!(
            shop.audit
                .actions()
                .contains(&"catalog.item.removed".to_string())
        );

        let err = shop.engine.delete_item(spare.id).unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(DomainError::NotFoundOrInvalidState(_))
        ));
    }

    #[test]
    fn adjusting_a_missing_item_is_rejected() {
        let shop = shop();
        let err = shop.engine.adjust_stock(ItemId::new(), dec(1)).unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(DomainError::NotFoundOrInvalidState(_))
        ));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Procurement
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn receiving_adds_stock_and_raises_one_payable() {
        let shop = shop();
        let a = item(&shop.engine, "A", 0, 20);
        let b = item(&shop.engine, "B", 0, 100);
        let vendor = supplier(&shop.engine, "Tech Distributors");

        let order = shop
            .engine
            .create_purchase_order(PurchaseOrderRequest {
                supplier_id: Some(vendor.id),
                lines: vec![
                    po_line(&a, 5, 10),
                    po_line(&b, 2, 50),
                    PurchaseLineInput {
                        item_id: Some(a.id),
                        quantity: None,
                        unit_cost: Some(dec(10)),
                    },
                    PurchaseLineInput {
                        item_id: Some(ItemId::new()),
                        quantity: Some(dec(1)),
                        unit_cost: Some(dec(1)),
                    },
                ],
            })
            .unwrap();
        assert_eq!(order.number.as_str(), "PO202403090001");
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.total_amount, dec(150));
        assert_eq!(order.status, PurchaseOrderStatus::Pending);

        shop.clock.advance(Duration::days(2));
        let payable = shop.engine.receive_purchase_order(order.id).unwrap();

        assert_eq!(stock_of(&shop.engine, a.id), dec(5));
        assert_eq!(stock_of(&shop.engine, b.id), dec(2));
        assert_eq!(payable.amount, dec(150));
        assert_eq!(payable.supplier_id, vendor.id);
        assert_eq!(payable.status, SettlementStatus::Pending);
        assert_eq!(
            payable.due_date,
            opening() + Duration::days(2) + Duration::days(30)
        );
        assert_eq!(shop.engine.list_payables().unwrap().len(), 1);

        let stored = shop.engine.purchase_order(order.id).unwrap().unwrap();
        assert_eq!(stored.status, PurchaseOrderStatus::Received);
        assert_eq!(stored.received_at, Some(opening() + Duration::days(2)));

        let actions = shop.audit.actions();
        assert!(actions.contains(&"purchasing.order.received".to_string()));
        assert!(actions.contains(&"accounting.payable.raised".to_string()));
    }

    #[test]
    fn overflowing_purchase_line_is_refused_and_the_store_stays_usable() {
        let shop = shop();
        let a = item(&shop.engine, "A", 0, 20);
        let vendor = supplier(&shop.engine, "Tech Distributors");

        let err = shop
            .engine
            .create_purchase_order(PurchaseOrderRequest {
                supplier_id: Some(vendor.id),
                lines: vec![PurchaseLineInput {
                    item_id: Some(a.id),
                    quantity: Some(Decimal::MAX),
                    unit_cost: Some(dec(2)),
                }],
            })
            .unwrap_err();
        assert_eq!(
            err.domain(),
            Some(&DomainError::validation("line 1 total is out of range"))
        );

        assert!(shop.engine.list_purchase_orders().unwrap().is_empty());
        assert_eq!(stock_of(&shop.engine, a.id), dec(0));
        shop.engine
            .create_purchase_order(PurchaseOrderRequest {
                supplier_id: Some(vendor.id),
                lines: vec![po_line(&a, 1, 10)],
            })
            .unwrap();
    }

    #[test]
    fn second_receive_is_rejected_without_double_increment() {
        let shop = shop();
        let a = item(&shop.engine, "A", 0, 20);
        let vendor = supplier(&shop.engine, "Tech Distributors");
        let order = shop
            .engine
            .create_purchase_order(PurchaseOrderRequest {
                supplier_id: Some(vendor.id),
                lines: vec![po_line(&a, 5, 10)],
            })
            .unwrap();

        shop.engine.receive_purchase_order(order.id).unwrap();
        let audited = shop.audit.entries().len();
        let err = shop.engine.receive_purchase_order(order.id).unwrap_err();

        assert_eq!(
            err.domain(),
            Some(&DomainError::not_found_or_invalid_state(RECEIVE_REJECTED))
        );
        assert_eq!(stock_of(&shop.engine, a.id), dec(5));
        assert_eq!(shop.engine.list_payables().unwrap().len(), 1);
        assert_eq!(shop.audit.entries().len(), audited);
    }

    #[test]
    fn purchase_order_needs_a_known_supplier() {
        let shop = shop();
        let err = shop
            .engine
            .create_purchase_order(PurchaseOrderRequest::default())
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Validation(_))));

        let err = shop
            .engine
            .create_purchase_order(PurchaseOrderRequest {
                supplier_id: Some(shopledger_parties::SupplierId::new()),
                lines: vec![],
            })
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Validation(_))));
        assert!(shop.engine.list_purchase_orders().unwrap().is_empty());
    }

    #[test]
    fn document_numbers_continue_the_daily_sequence() {
        let shop = shop();
        let vendor = supplier(&shop.engine, "Tech Distributors");
        let request = PurchaseOrderRequest {
            supplier_id: Some(vendor.id),
            lines: vec![],
        };

        let first = shop.engine.create_purchase_order(request.clone()).unwrap();
        let second = shop.engine.create_purchase_order(request.clone()).unwrap();
        shop.clock.advance(Duration::days(1));
        let next_day = shop.engine.create_purchase_order(request).unwrap();

        assert_eq!(first.number.as_str(), "PO202403090001");
        assert_eq!(second.number.as_str(), "PO202403090002");
        assert_eq!(next_day.number.as_str(), "PO202403100001");
    }

    /// Hands out a stale sequence 1 on its second call only.
    struct CollidesOnce {
        calls: AtomicU32,
    }

    impl DocumentNumbers for CollidesOnce {
        fn next(
            &self,
            kind: DocumentKind,
            at: DateTime<Utc>,
            issued_today: u32,
        ) -> DomainResult<DocumentNumber> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
                DocumentNumber::compose(kind, at, 1)
            } else {
                DocumentNumber::compose(kind, at, issued_today + 1)
            }
        }
    }

    /// Always hands out sequence 1.
    struct Stuck;

    impl DocumentNumbers for Stuck {
        fn next(
            &self,
            kind: DocumentKind,
            at: DateTime<Utc>,
            _issued_today: u32,
        ) -> DomainResult<DocumentNumber> {
            DocumentNumber::compose(kind, at, 1)
        }
    }

    #[test]
    fn taken_document_number_is_retried_in_a_fresh_transaction() {
        let numbers = Arc::new(CollidesOnce {
            calls: AtomicU32::new(0),
        });
        let engine = Engine::new(InMemoryStore::new())
            .with_clock(Arc::new(FixedClock::new(opening())))
            .with_numbers(numbers.clone());
        let vendor = supplier(&engine, "Tech Distributors");
        let request = PurchaseOrderRequest {
            supplier_id: Some(vendor.id),
            lines: vec![],
        };

        let first = engine.create_purchase_order(request.clone()).unwrap();
        let second = engine.create_purchase_order(request).unwrap();

        assert_eq!(first.number.as_str(), "PO202403090001");
        assert_eq!(second.number.as_str(), "PO202403090002");
        assert_eq!(numbers.calls.load(Ordering::SeqCst), 3);
        assert_eq!(engine.list_purchase_orders().unwrap().len(), 2);
    }

    #[test]
    fn numbering_gives_up_after_the_configured_attempts() {
        let engine = Engine::new(InMemoryStore::new())
            .with_clock(Arc::new(FixedClock::new(opening())))
            .with_numbers(Arc::new(Stuck))
            .with_policy(BusinessPolicy {
                number_attempts: 3,
                ..BusinessPolicy::default()
            });
        let vendor = supplier(&engine, "Tech Distributors");
        let request = PurchaseOrderRequest {
            supplier_id: Some(vendor.id),
            lines: vec![],
        };

        engine.create_purchase_order(request.clone()).unwrap();
        let err = engine.create_purchase_order(request).unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::DuplicateKey(_))));
        assert_eq!(engine.list_purchase_orders().unwrap().len(), 1);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sales
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn sales_total_is_discounted_subtotal_plus_gst() {
        let shop = shop();
        let laptop = item(&shop.engine, "LAP-01", 10, 500);
        let buyer = customer(&shop.engine, "Acme Traders");
        let clerk = employee(&shop.engine);

        let order = shop
            .engine
            .create_sales_order(SalesOrderRequest {
                discount: dec(100),
                ..sale(&buyer, &clerk, vec![sale_line(&laptop, 2, &clerk)])
            })
            .unwrap();

        assert_eq!(order.number.as_str(), "INV202403090001");
        assert_eq!(order.totals.subtotal, dec(1000));
        assert_eq!(order.totals.taxable_amount, dec(900));
        assert_eq!(order.totals.tax_amount, dec(162));
        assert_eq!(order.totals.total, dec(1062));
        assert_eq!(order.lines[0].unit_price, dec(500));
        assert_eq!(order.status, SalesOrderStatus::Pending);
        // Placing a sale does not touch stock.
        assert_eq!(stock_of(&shop.engine, laptop.id), dec(10));
    }

    #[test]
    fn sale_over_stock_is_rejected_and_nothing_is_written() {
        let shop = shop();
        let mouse = item(&shop.engine, "MOUSE-01", 3, 500);
        let buyer = customer(&shop.engine, "Acme Traders");
        let clerk = employee(&shop.engine);

        let err = shop
            .engine
            .create_sales_order(sale(&buyer, &clerk, vec![sale_line(&mouse, 4, &clerk)]))
            .unwrap_err();

        assert_eq!(
            err.domain(),
            Some(&DomainError::insufficient_stock("Item MOUSE-01", dec(3)))
        );
        assert_eq!(stock_of(&shop.engine, mouse.id), dec(3));
        assert!(shop.engine.list_sales_orders().unwrap().is_empty());
    }

    #[test]
    fn split_lines_are_checked_one_by_one_when_placed() {
        let shop = shop();
        let mouse = item(&shop.engine, "MOUSE-01", 5, 500);
        let buyer = customer(&shop.engine, "Acme Traders");
        let clerk = employee(&shop.engine);

        let order = shop
            .engine
            .create_sales_order(sale(
                &buyer,
                &clerk,
                vec![sale_line(&mouse, 3, &clerk), sale_line(&mouse, 3, &clerk)],
            ))
            .unwrap();
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.totals.subtotal, dec(3000));

        // Completion decrements line by line, so the second line falls short.
        let err = shop.engine.complete_sales_order(order.id).unwrap_err();
        assert_eq!(
            err.domain(),
            Some(&DomainError::insufficient_stock("Item MOUSE-01", dec(2)))
        );
        assert_eq!(stock_of(&shop.engine, mouse.id), dec(5));
    }

    #[test]
    fn sales_order_needs_customer_and_employee() {
        let shop = shop();
        let buyer = customer(&shop.engine, "Acme Traders");
        let err = shop
            .engine
            .create_sales_order(SalesOrderRequest {
                customer_id: Some(buyer.id),
                ..SalesOrderRequest::default()
            })
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Validation(_))));
    }

    #[test]
    fn lines_for_unknown_staff_are_dropped() {
        let shop = shop();
        let laptop = item(&shop.engine, "LAP-01", 10, 500);
        let buyer = customer(&shop.engine, "Acme Traders");
        let clerk = employee(&shop.engine);

        let order = shop
            .engine
            .create_sales_order(sale(
                &buyer,
                &clerk,
                vec![
                    sale_line(&laptop, 1, &clerk),
                    SaleLineInput {
                        assigned_employee_id: Some(shopledger_parties::EmployeeId::new()),
                        ..sale_line(&laptop, 1, &clerk)
                    },
                ],
            ))
            .unwrap();
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.totals.subtotal, dec(500));
    }

    #[test]
    fn completing_a_sale_moves_stock_and_raises_one_receivable() {
        let shop = shop();
        let laptop = item(&shop.engine, "LAP-01", 10, 500);
        let buyer = customer(&shop.engine, "Acme Traders");
        let clerk = employee(&shop.engine);
        let order = shop
            .engine
            .create_sales_order(sale(&buyer, &clerk, vec![sale_line(&laptop, 6, &clerk)]))
            .unwrap();

        let receivable = shop.engine.complete_sales_order(order.id).unwrap();
        assert_eq!(stock_of(&shop.engine, laptop.id), dec(4));
        assert_eq!(receivable.amount, order.totals.total);
        assert_eq!(receivable.due_date, opening() + Duration::days(30));
        assert_eq!(shop.engine.unresolved_alerts().unwrap().len(), 1);

        let err = shop.engine.complete_sales_order(order.id).unwrap_err();
        assert_eq!(
            err.domain(),
            Some(&DomainError::not_found_or_invalid_state(COMPLETE_REJECTED))
        );
        assert_eq!(stock_of(&shop.engine, laptop.id), dec(4));
        assert_eq!(shop.engine.list_receivables().unwrap().len(), 1);
    }

    #[test]
    fn sale_drained_since_placement_fails_and_stays_pending() {
        let shop = shop();
        let laptop = item(&shop.engine, "LAP-01", 10, 500);
        let mouse = item(&shop.engine, "MOUSE-01", 5, 50);
        let buyer = customer(&shop.engine, "Acme Traders");
        let clerk = employee(&shop.engine);
        let order = shop
            .engine
            .create_sales_order(sale(
                &buyer,
                &clerk,
                vec![sale_line(&laptop, 2, &clerk), sale_line(&mouse, 4, &clerk)],
            ))
            .unwrap();

        shop.engine.adjust_stock(mouse.id, dec(-3)).unwrap();
        let err = shop.engine.complete_sales_order(order.id).unwrap_err();

        assert_eq!(
            err.domain(),
            Some(&DomainError::insufficient_stock("Item MOUSE-01", dec(2)))
        );
        // The laptop line ran first; its decrement is rolled back too.
        assert_eq!(stock_of(&shop.engine, laptop.id), dec(10));
        assert_eq!(stock_of(&shop.engine, mouse.id), dec(2));
        let stored = shop.engine.sales_order(order.id).unwrap().unwrap();
        assert_eq!(stored.status, SalesOrderStatus::Pending);
        assert!(shop.engine.list_receivables().unwrap().is_empty());

        shop.engine.adjust_stock(mouse.id, dec(5)).unwrap();
        shop.engine.complete_sales_order(order.id).unwrap();
        assert_eq!(stock_of(&shop.engine, laptop.id), dec(8));
        assert_eq!(stock_of(&shop.engine, mouse.id), dec(3));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Parties and tasks
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn updating_a_missing_party_is_rejected() {
        let shop = shop();
        let err = shop
            .engine
            .update_supplier(
                shopledger_parties::SupplierId::new(),
                SupplierUpdate {
                    contact: ContactInfo::default(),
                },
            )
            .unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(DomainError::NotFoundOrInvalidState(_))
        ));
        assert!(shop.engine.list_suppliers().unwrap().is_empty());
    }

    #[test]
    fn parties_named_by_orders_cannot_be_deleted() {
        let shop = shop();
        let laptop = item(&shop.engine, "LAP-01", 10, 500);
        let buyer = customer(&shop.engine, "Acme Traders");
        let walk_in = customer(&shop.engine, "Walk-in");
        let clerk = employee(&shop.engine);
        let vendor = supplier(&shop.engine, "Tech Distributors");
        shop.engine
            .create_sales_order(sale(&buyer, &clerk, vec![sale_line(&laptop, 1, &clerk)]))
            .unwrap();

        let err = shop.engine.delete_customer(buyer.id).unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Validation(_))));
        let err = shop.engine.delete_employee(clerk.id).unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Validation(_))));

        shop.engine.delete_customer(walk_in.id).unwrap();
        shop.engine.delete_supplier(vendor.id).unwrap();
        let names: Vec<_> = shop
            .engine
            .list_customers()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Acme Traders".to_string()]);
        assert!(shop.engine.list_suppliers().unwrap().is_empty());

        let err = shop.engine.delete_customer(CustomerId::new()).unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(DomainError::NotFoundOrInvalidState(_))
        ));
    }

    #[test]
    fn employee_details_can_be_edited() {
        let shop = shop();
        let clerk = employee(&shop.engine);
        shop.clock.advance(Duration::days(3));

        let edited = shop
            .engine
            .update_employee(
                clerk.id,
                NewEmployee {
                    name: "Rajesh K.".to_string(),
                    role: Some("Store Manager".to_string()),
                    department: Some("Front".to_string()),
                    hourly_rate: dec(300),
                    phone: None,
                    email: None,
                },
            )
            .unwrap();
        assert_eq!(edited.joined_at, opening());
        assert_eq!(shop.engine.list_employees().unwrap(), vec![edited]);

        let err = shop
            .engine
            .update_employee(
                EmployeeId::new(),
                NewEmployee {
                    name: "Nobody".to_string(),
                    role: None,
                    department: None,
                    hourly_rate: dec(0),
                    phone: None,
                    email: None,
                },
            )
            .unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(DomainError::NotFoundOrInvalidState(_))
        ));
    }

    #[test]
    fn tasks_move_through_statuses_and_go_with_their_employee() {
        let shop = shop();
        let clerk = employee(&shop.engine);

        let task = shop
            .engine
            .add_task(NewTask {
                employee_id: Some(clerk.id),
                task_type: "Stock count".to_string(),
                description: Some("Aisle 4".to_string()),
                due_date: Some(opening().date_naive() + Duration::days(2)),
                priority: TaskPriority::High,
            })
            .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);

        shop.engine
            .update_task_status(task.id, TaskStatus::InProgress)
            .unwrap();
        shop.engine
            .update_task_status(task.id, TaskStatus::Completed)
            .unwrap();
        let stored = shop.engine.get_task(task.id).unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);
        assert_eq!(stored.priority, TaskPriority::High);

        let second = shop
            .engine
            .add_task(NewTask {
                employee_id: Some(clerk.id),
                task_type: "Delivery".to_string(),
                ..NewTask::default()
            })
            .unwrap();
        shop.engine.delete_task(second.id).unwrap();
        let err = shop.engine.delete_task(second.id).unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(DomainError::NotFoundOrInvalidState(_))
        ));
        assert_eq!(shop.engine.list_tasks().unwrap().len(), 1);

        shop.engine.delete_employee(clerk.id).unwrap();
        assert!(shop.engine.list_tasks().unwrap().is_empty());
        assert!(shop.engine.get_employee(clerk.id).unwrap().is_none());

        let actions = shop.audit.actions();
        assert!(actions.contains(&"parties.task.status_changed".to_string()));
        assert!(actions.contains(&"parties.employee.removed".to_string()));
    }

    #[test]
    fn tasks_need_a_known_employee() {
        let shop = shop();
        let err = shop
            .engine
            .add_task(NewTask {
                employee_id: Some(EmployeeId::new()),
                task_type: "Delivery".to_string(),
                ..NewTask::default()
            })
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Validation(_))));

        let err = shop
            .engine
            .update_task_status(TaskId::new(), TaskStatus::Completed)
            .unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(DomainError::NotFoundOrInvalidState(_))
        ));
        assert!(shop.engine.list_tasks().unwrap().is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────
    // Settlement
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn receivable_is_paid_once() {
        let shop = shop();
        let laptop = item(&shop.engine, "LAP-01", 10, 500);
        let buyer = customer(&shop.engine, "Acme Traders");
        let clerk = employee(&shop.engine);
        let order = shop
            .engine
            .create_sales_order(sale(&buyer, &clerk, vec![sale_line(&laptop, 1, &clerk)]))
            .unwrap();
        let receivable = shop.engine.complete_sales_order(order.id).unwrap();

        shop.clock.advance(Duration::days(10));
        let paid = shop.engine.mark_receivable_paid(receivable.id).unwrap();
        assert_eq!(paid.status, SettlementStatus::Paid);
        assert_eq!(paid.paid_at, Some(opening() + Duration::days(10)));

        let err = shop.engine.mark_receivable_paid(receivable.id).unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(DomainError::NotFoundOrInvalidState(_))
        ));
    }

    #[test]
    fn payable_is_paid_once() {
        let shop = shop();
        let a = item(&shop.engine, "A", 0, 20);
        let vendor = supplier(&shop.engine, "Tech Distributors");
        let order = shop
            .engine
            .create_purchase_order(PurchaseOrderRequest {
                supplier_id: Some(vendor.id),
                lines: vec![po_line(&a, 1, 10)],
            })
            .unwrap();
        let payable = shop.engine.receive_purchase_order(order.id).unwrap();

        shop.engine.mark_payable_paid(payable.id).unwrap();
        assert!(shop.engine.mark_payable_paid(payable.id).is_err());
        let stored = shop.engine.list_payables().unwrap().remove(0);
        assert_eq!(stored.status, SettlementStatus::Paid);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reconciliation
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn party_import_updates_name_matches_and_inserts_the_rest_once() {
        let shop = shop();
        let local = supplier(&shop.engine, "Tech Distributors");
        let source = StubSource {
            items: vec![],
            parties: vec![
                external_party("SUP-1", "Tech Distributors", "9800000001"),
                external_party("SUP-2", "Office Mart", "9800000002"),
            ],
        };

        let summary = shop
            .engine
            .import_parties(PartyKind::Supplier, &source)
            .unwrap();
        assert_eq!((summary.imported, summary.updated), (1, 1));

        let suppliers = shop.engine.list_suppliers().unwrap();
        assert_eq!(suppliers.len(), 2);
        let updated = suppliers.iter().find(|s| s.id == local.id).unwrap();
        assert!(updated.sync.synced);
        assert_eq!(updated.sync.external_id.as_ref().unwrap().as_str(), "SUP-1");
        assert_eq!(updated.contact.phone.as_deref(), Some("9800000001"));

        let again = shop
            .engine
            .import_parties(PartyKind::Supplier, &source)
            .unwrap();
        assert_eq!((again.imported, again.updated), (0, 2));
        assert_eq!(shop.engine.list_suppliers().unwrap().len(), 2);

        let status = shop.engine.sync_status().unwrap();
        assert_eq!(status.recent[0].kind, SyncKind::ImportSuppliers);
        assert_eq!(
            status.recent[0].message,
            "Imported 0 new suppliers, updated 2 suppliers from the ledger. stub"
        );
    }

    #[test]
    fn item_import_prefers_external_id_over_sku() {
        let shop = shop();
        let by_guid = item(&shop.engine, "OLD-SKU", 1, 100);
        let by_sku = item(&shop.engine, "NEW-SKU", 1, 100);

        // Tie the first item to the ledger record.
        let seed = StubSource {
            items: vec![ExternalItem {
                external_id: ExternalId::new("GUID-9").unwrap(),
                sku: "OLD-SKU".to_string(),
                name: "Seeded".to_string(),
                category: None,
                stock: dec(1),
                min_stock: dec(5),
                cost_price: dec(50),
                selling_price: dec(100),
            }],
            parties: vec![],
        };
        shop.engine.import_items(&seed).unwrap();

        let source = StubSource {
            items: vec![ExternalItem {
                sku: "NEW-SKU".to_string(),
                name: "Renamed in ledger".to_string(),
                stock: dec(40),
                ..seed.items[0].clone()
            }],
            parties: vec![],
        };
        let summary = shop.engine.import_items(&source).unwrap();
        assert_eq!((summary.imported, summary.updated), (0, 1));

        let matched = shop.engine.get_item(by_guid.id).unwrap().unwrap();
        assert_eq!(matched.name, "Renamed in ledger");
        assert_eq!(matched.sku.as_str(), "OLD-SKU");
        assert_eq!(matched.stock, dec(40));
        let untouched = shop.engine.get_item(by_sku.id).unwrap().unwrap();
        assert_eq!(untouched.stock, dec(1));
        assert!(!untouched.sync.synced);

        // Imported stock is above the threshold, so the alert clears.
        let alerts = shop.engine.unresolved_alerts().unwrap();
        assert!(alerts.iter().all(|a| a.item_id != by_guid.id));
    }

    #[test]
    fn failed_import_rolls_back_and_is_logged() {
        let shop = shop();
        let good = ExternalItem {
            external_id: ExternalId::new("GUID-1").unwrap(),
            sku: "GOOD".to_string(),
            name: "Good".to_string(),
            category: None,
            stock: dec(10),
            min_stock: dec(5),
            cost_price: dec(1),
            selling_price: dec(2),
        };
        let blank_sku = ExternalItem {
            external_id: ExternalId::new("GUID-2").unwrap(),
            sku: "   ".to_string(),
            ..good.clone()
        };
        let source = StubSource {
            items: vec![good, blank_sku],
            parties: vec![],
        };

        let err = shop.engine.import_items(&source).unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::Validation(_))));
        assert!(shop.engine.list_items().unwrap().is_empty());

        let status = shop.engine.sync_status().unwrap();
        assert_eq!(status.recent.len(), 1);
        assert_eq!(status.recent[0].kind, SyncKind::ImportItems);
        assert_eq!(status.recent[0].outcome, SyncOutcome::Failed);
        assert!(status.recent[0].message.starts_with("Import failed: "));
    }

    #[test]
    fn bulk_import_of_sample_ledger_is_idempotent() {
        let shop = shop();
        let first = shop.engine.bulk_import(&SampleLedgerSource).unwrap();
        assert_eq!(first.items.imported, 5);
        assert_eq!(first.suppliers.imported, 5);
        assert_eq!(first.customers.imported, 2);

        let second = shop.engine.bulk_import(&SampleLedgerSource).unwrap();
        assert_eq!(second.items.imported, 0);
        assert_eq!(second.items.updated, 5);
        assert_eq!(second.suppliers.updated, 5);
        assert_eq!(second.customers.updated, 2);

        let status = shop.engine.sync_status().unwrap();
        assert_eq!(status.items.total, 5);
        assert_eq!(status.items.pending(), 0);
        assert_eq!(status.customers.synced, 2);
        assert_eq!(status.recent.len(), 6);
    }

    #[test]
    fn second_bulk_sync_without_new_records_marks_nothing() {
        let shop = shop();
        item(&shop.engine, "A", 10, 100);
        item(&shop.engine, "B", 10, 100);

        let first = shop
            .engine
            .bulk_sync(ExportKind::Items, &SimulatedLedgerTarget)
            .unwrap();
        let second = shop
            .engine
            .bulk_sync(ExportKind::Items, &SimulatedLedgerTarget)
            .unwrap();
        assert_eq!((first, second), (2, 0));

        let status = shop.engine.sync_status().unwrap();
        assert_eq!(status.items.synced, 2);
        assert_eq!(status.recent[0].kind, SyncKind::Bulk);
        assert_eq!(status.recent[0].message, "Bulk sync completed: 0 items synced");
        assert!(
            shop.audit
                .actions()
                .contains(&"reconciliation.bulk_sync".to_string())
        );
    }

    #[test]
    fn rejected_push_is_logged_and_leaves_record_unsynced() {
        let shop = shop();
        let buyer = customer(&shop.engine, "Acme Traders");

        let entry = shop.engine.sync_customer(buyer.id, &OfflineLedger).unwrap();
        assert_eq!(entry.outcome, SyncOutcome::Failed);
        assert!(entry.synced_at.is_none());
        assert_eq!(shop.engine.sync_status().unwrap().customers.synced, 0);

        let synced = shop
            .engine
            .bulk_sync(ExportKind::Customers, &OfflineLedger)
            .unwrap();
        assert_eq!(synced, 0);
        let status = shop.engine.sync_status().unwrap();
        assert_eq!(status.recent[0].outcome, SyncOutcome::Failed);
        assert_eq!(
            status.recent[0].message,
            "Bulk sync completed: 0 customers synced, 1 failed"
        );

        let entry = shop
            .engine
            .sync_customer(buyer.id, &SimulatedLedgerTarget)
            .unwrap();
        assert_eq!(entry.message, "Customer synced successfully (simulated)");
        assert_eq!(entry.record_id, Some(*buyer.id.as_uuid()));
        assert_eq!(shop.engine.sync_status().unwrap().customers.synced, 1);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Postgres (runs only with DATABASE_URL set)
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn postgres_purchase_round_trip() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let store = crate::store::PostgresStore::connect(&url, 2).unwrap();
        store.migrate().unwrap();
        let engine = Engine::new(store);

        let tag = shopledger_core::id::Uuid::now_v7().simple().to_string();
        let widget = engine
            .create_item(NewItem {
                sku: format!("PG-{tag}"),
                name: "Widget".to_string(),
                category: None,
                stock: dec(1),
                min_stock: None,
                cost_price: dec(10),
                selling_price: dec(15),
            })
            .unwrap();
        let vendor = engine
            .create_supplier(NewSupplier {
                name: format!("Supplier {tag}"),
                contact: ContactInfo::default(),
            })
            .unwrap();
        let order = engine
            .create_purchase_order(PurchaseOrderRequest {
                supplier_id: Some(vendor.id),
                lines: vec![po_line(&widget, 5, 10)],
            })
            .unwrap();

        let payable = engine.receive_purchase_order(order.id).unwrap();
        assert_eq!(payable.amount, dec(50));
        assert_eq!(engine.get_item(widget.id).unwrap().unwrap().stock, dec(6));
        assert!(engine.receive_purchase_order(order.id).is_err());
        assert_eq!(engine.get_item(widget.id).unwrap().unwrap().stock, dec(6));

        let stored = engine.purchase_order(order.id).unwrap().unwrap();
        assert_eq!(stored.lines.len(), 1);
        assert_eq!(stored.status, PurchaseOrderStatus::Received);
    }
}
