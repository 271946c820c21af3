use tracing::{info, instrument, warn};

use shopledger_core::DomainError;
use shopledger_parties::{
    Customer, CustomerId, CustomerUpdate, Employee, EmployeeId, EmployeeTask, NewCustomer,
    NewEmployee, NewSupplier, NewTask, PartyEvent, Supplier, SupplierId, SupplierUpdate,
    TaskEvent, TaskId, TaskStatus,
};

use super::catalog::still_referenced;
use crate::engine::{Engine, WorkflowResult};
use crate::store::{OrderRepository, OrderReference, PartyRepository, Store};

fn not_found(what: &str, id: impl core::fmt::Display) -> DomainError {
    DomainError::not_found_or_invalid_state(format!("{what} {id} not found"))
}

impl<S: Store> Engine<S> {
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub fn create_supplier(&self, input: NewSupplier) -> WorkflowResult<Supplier> {
        let now = self.now();
        let supplier = Supplier::create(SupplierId::new(), input)?;
        self.in_transaction(|tx| Ok(tx.insert_supplier(&supplier)?))?;

        info!(supplier_id = %supplier.id, "supplier registered");
        self.audit(&[PartyEvent::SupplierRegistered {
            supplier_id: supplier.id,
            name: supplier.name.clone(),
            occurred_at: now,
        }]);
        Ok(supplier)
    }

    #[instrument(skip(self, update))]
    pub fn update_supplier(
        &self,
        id: SupplierId,
        update: SupplierUpdate,
    ) -> WorkflowResult<Supplier> {
        let now = self.now();
        let supplier = self.in_transaction(|tx| {
            let mut supplier = tx.supplier(id)?.ok_or_else(|| not_found("supplier", id))?;
            supplier.apply_update(update);
            if !tx.update_supplier(&supplier)? {
                return Err(not_found("supplier", id).into());
            }
            Ok(supplier)
        })?;

        self.audit(&[PartyEvent::SupplierUpdated {
            supplier_id: id,
            name: supplier.name.clone(),
            occurred_at: now,
        }]);
        Ok(supplier)
    }

    /// Delete a supplier that no purchase order names.
    #[instrument(skip(self))]
    pub fn delete_supplier(&self, id: SupplierId) -> WorkflowResult<()> {
        let now = self.now();
        let supplier = self
            .in_transaction(|tx| {
                let supplier = tx.supplier(id)?.ok_or_else(|| not_found("supplier", id))?;
                let orders = tx.order_references(OrderReference::Supplier(id))?;
                if orders > 0 {
                    return Err(
                        still_referenced(format!("supplier {}", supplier.name), orders).into(),
                    );
                }
                tx.delete_supplier(id)?;
                Ok(supplier)
            })
            .inspect_err(|e| warn!(supplier_id = %id, error = %e, "supplier not deleted"))?;

        info!(supplier_id = %id, "supplier deleted");
        self.audit(&[PartyEvent::SupplierRemoved {
            supplier_id: id,
            name: supplier.name,
            occurred_at: now,
        }]);
        Ok(())
    }

    pub fn list_suppliers(&self) -> WorkflowResult<Vec<Supplier>> {
        self.in_transaction(|tx| Ok(tx.suppliers()?))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub fn create_customer(&self, input: NewCustomer) -> WorkflowResult<Customer> {
        let now = self.now();
        let customer = Customer::create(CustomerId::new(), input)?;
        self.in_transaction(|tx| Ok(tx.insert_customer(&customer)?))?;

        info!(customer_id = %customer.id, "customer registered");
        self.audit(&[PartyEvent::CustomerRegistered {
            customer_id: customer.id,
            name: customer.name.clone(),
            occurred_at: now,
        }]);
        Ok(customer)
    }

    #[instrument(skip(self, update))]
    pub fn update_customer(
        &self,
        id: CustomerId,
        update: CustomerUpdate,
    ) -> WorkflowResult<Customer> {
        let now = self.now();
        let customer = self.in_transaction(|tx| {
            let mut customer = tx.customer(id)?.ok_or_else(|| not_found("customer", id))?;
            customer.apply_update(update);
            if !tx.update_customer(&customer)? {
                return Err(not_found("customer", id).into());
            }
            Ok(customer)
        })?;

        self.audit(&[PartyEvent::CustomerUpdated {
            customer_id: id,
            name: customer.name.clone(),
            occurred_at: now,
        }]);
        Ok(customer)
    }

    /// Delete a customer that no sales order names.
    #[instrument(skip(self))]
    pub fn delete_customer(&self, id: CustomerId) -> WorkflowResult<()> {
        let now = self.now();
        let customer = self
            .in_transaction(|tx| {
                let customer = tx.customer(id)?.ok_or_else(|| not_found("customer", id))?;
                let orders = tx.order_references(OrderReference::Customer(id))?;
                if orders > 0 {
                    return Err(
                        still_referenced(format!("customer {}", customer.name), orders).into(),
                    );
                }
                tx.delete_customer(id)?;
                Ok(customer)
            })
            .inspect_err(|e| warn!(customer_id = %id, error = %e, "customer not deleted"))?;

        info!(customer_id = %id, "customer deleted");
        self.audit(&[PartyEvent::CustomerRemoved {
            customer_id: id,
            name: customer.name,
            occurred_at: now,
        }]);
        Ok(())
    }

    pub fn list_customers(&self) -> WorkflowResult<Vec<Customer>> {
        self.in_transaction(|tx| Ok(tx.customers()?))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub fn create_employee(&self, input: NewEmployee) -> WorkflowResult<Employee> {
        let now = self.now();
        let employee = Employee::create(EmployeeId::new(), input, now)?;
        self.in_transaction(|tx| Ok(tx.insert_employee(&employee)?))?;

        info!(employee_id = %employee.id, "employee registered");
        self.audit(&[PartyEvent::EmployeeRegistered {
            employee_id: employee.id,
            name: employee.name.clone(),
            occurred_at: now,
        }]);
        Ok(employee)
    }

    /// Replace an employee's details; the join date is kept.
    #[instrument(skip(self, update))]
    pub fn update_employee(&self, id: EmployeeId, update: NewEmployee) -> WorkflowResult<Employee> {
        let now = self.now();
        let employee = self.in_transaction(|tx| {
            let mut employee = tx.employee(id)?.ok_or_else(|| not_found("employee", id))?;
            employee.apply_update(update)?;
            if !tx.update_employee(&employee)? {
                return Err(not_found("employee", id).into());
            }
            Ok(employee)
        })?;

        self.audit(&[PartyEvent::EmployeeUpdated {
            employee_id: id,
            name: employee.name.clone(),
            occurred_at: now,
        }]);
        Ok(employee)
    }

    /// Delete an employee and their tasks.
    ///
    /// Refused while a sales order was taken by them or has a line assigned
    /// to them.
    #[instrument(skip(self))]
    pub fn delete_employee(&self, id: EmployeeId) -> WorkflowResult<()> {
        let now = self.now();
        let employee = self
            .in_transaction(|tx| {
                let employee = tx.employee(id)?.ok_or_else(|| not_found("employee", id))?;
                let orders = tx.order_references(OrderReference::Employee(id))?;
                if orders > 0 {
                    return Err(
                        still_referenced(format!("employee {}", employee.name), orders).into(),
                    );
                }
                tx.delete_employee(id)?;
                Ok(employee)
            })
            .inspect_err(|e| warn!(employee_id = %id, error = %e, "employee not deleted"))?;

        info!(employee_id = %id, "employee deleted");
        self.audit(&[PartyEvent::EmployeeRemoved {
            employee_id: id,
            name: employee.name,
            occurred_at: now,
        }]);
        Ok(())
    }

    pub fn get_employee(&self, id: EmployeeId) -> WorkflowResult<Option<Employee>> {
        self.in_transaction(|tx| Ok(tx.employee(id)?))
    }

    pub fn list_employees(&self) -> WorkflowResult<Vec<Employee>> {
        self.in_transaction(|tx| Ok(tx.employees()?))
    }

    /// Assign a task to an existing employee.
    #[instrument(skip(self, input), fields(task_type = %input.task_type))]
    pub fn add_task(&self, input: NewTask) -> WorkflowResult<EmployeeTask> {
        let now = self.now();
        let task = EmployeeTask::assign(TaskId::new(), input, now)?;
        self.in_transaction(|tx| {
            if tx.employee(task.employee_id)?.is_none() {
                return Err(DomainError::validation(format!(
                    "employee {} does not exist",
                    task.employee_id
                ))
                .into());
            }
            Ok(tx.insert_task(&task)?)
        })?;

        info!(task_id = %task.id, employee_id = %task.employee_id, "task assigned");
        self.audit(&[TaskEvent::Assigned {
            task_id: task.id,
            employee_id: task.employee_id,
            task_type: task.task_type.clone(),
            occurred_at: now,
        }]);
        Ok(task)
    }

    /// Move a task to `status`; any status may follow any other.
    #[instrument(skip(self))]
    pub fn update_task_status(&self, id: TaskId, status: TaskStatus) -> WorkflowResult<()> {
        let now = self.now();
        self.in_transaction(|tx| {
            if tx.set_task_status(id, status)? {
                Ok(())
            } else {
                Err(not_found("task", id).into())
            }
        })?;

        self.audit(&[TaskEvent::StatusChanged {
            task_id: id,
            status,
            occurred_at: now,
        }]);
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn delete_task(&self, id: TaskId) -> WorkflowResult<()> {
        let now = self.now();
        self.in_transaction(|tx| {
            if tx.delete_task(id)? {
                Ok(())
            } else {
                Err(not_found("task", id).into())
            }
        })?;

        info!(task_id = %id, "task deleted");
        self.audit(&[TaskEvent::Removed {
            task_id: id,
            occurred_at: now,
        }]);
        Ok(())
    }

    pub fn get_task(&self, id: TaskId) -> WorkflowResult<Option<EmployeeTask>> {
        self.in_transaction(|tx| Ok(tx.task(id)?))
    }

    pub fn list_tasks(&self) -> WorkflowResult<Vec<EmployeeTask>> {
        self.in_transaction(|tx| Ok(tx.tasks()?))
    }
}
