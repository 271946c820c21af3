//! Work assigned to an employee, tracked from pending to completed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{DomainError, DomainResult, Entity};
use shopledger_events::Event;

use crate::party::EmployeeId;

shopledger_core::uuid_id!(
    /// Employee task identifier.
    TaskId, "TaskId"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl core::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TaskStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(DomainError::validation(format!(
                "unknown task status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl core::str::FromStr for TaskPriority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            other => Err(DomainError::validation(format!(
                "unknown task priority: {other}"
            ))),
        }
    }
}

/// A task assigned to one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeTask {
    pub id: TaskId,
    pub employee_id: EmployeeId,
    pub task_type: String,
    pub description: Option<String>,
    pub assigned_at: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub employee_id: Option<EmployeeId>,
    pub task_type: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: TaskPriority,
}

impl EmployeeTask {
    /// Assign a task; it starts pending.
    pub fn assign(id: TaskId, input: NewTask, now: DateTime<Utc>) -> DomainResult<Self> {
        let task_type = input.task_type.trim();
        let (Some(employee_id), false) = (input.employee_id, task_type.is_empty()) else {
            return Err(DomainError::validation(
                "employee and task type are required",
            ));
        };
        Ok(Self {
            id,
            employee_id,
            task_type: task_type.to_string(),
            description: input.description,
            assigned_at: now,
            due_date: input.due_date,
            status: TaskStatus::Pending,
            priority: input.priority,
        })
    }
}

impl Entity for EmployeeTask {
    type Id = TaskId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskEvent {
    Assigned {
        task_id: TaskId,
        employee_id: EmployeeId,
        task_type: String,
        occurred_at: DateTime<Utc>,
    },
    StatusChanged {
        task_id: TaskId,
        status: TaskStatus,
        occurred_at: DateTime<Utc>,
    },
    Removed {
        task_id: TaskId,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for TaskEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TaskEvent::Assigned { .. } => "parties.task.assigned",
            TaskEvent::StatusChanged { .. } => "parties.task.status_changed",
            TaskEvent::Removed { .. } => "parties.task.removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TaskEvent::Assigned { occurred_at, .. }
            | TaskEvent::StatusChanged { occurred_at, .. }
            | TaskEvent::Removed { occurred_at, .. } => *occurred_at,
        }
    }

    fn describe(&self) -> String {
        match self {
            TaskEvent::Assigned { employee_id, .. } => {
                format!("Added task for employee {employee_id}")
            }
            TaskEvent::StatusChanged {
                task_id, status, ..
            } => format!("Updated task {task_id} to {status}"),
            TaskEvent::Removed { task_id, .. } => format!("Deleted task {task_id}"),
        }
    }
}
