// SPDX-License-Identifier: GPL-3.0-or-later

//! Tool catalog: names, descriptions, input schemas and availability gates.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::mcp::{Tool, ToolAnnotations};
use crate::services::contracts::ContractPatch;
use crate::services::employees::EmployeePatch;
use crate::services::programs::ProgramPatch;
use crate::services::tasks::TaskPatch;
use crate::store::Collection;

/// What a tool does to the store, which decides its annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Reads only.
    Read,
    /// Inserts a record.
    Create,
    /// Changes fields of one record.
    Update,
    /// Removes a record, possibly with a cascade.
    Delete,
    /// Adds or removes an assignment or a tag link.
    Link,
    /// The progress demo; touches nothing.
    LongRunning,
}

impl ToolKind {
    const fn annotations(self) -> ToolAnnotations {
        let (read_only_hint, destructive_hint, idempotent_hint) = match self {
            Self::Read | Self::LongRunning => (true, false, true),
            Self::Create | Self::Link => (false, false, false),
            Self::Update => (false, false, true),
            Self::Delete => (false, true, false),
        };
        ToolAnnotations {
            read_only_hint,
            destructive_hint,
            idempotent_hint,
            open_world_hint: false,
        }
    }
}

/// One tool.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Protocol name, e.g. `delete_tag`.
    pub name: &'static str,
    /// Display title.
    pub title: &'static str,
    /// Description shown to the model.
    pub description: &'static str,
    /// Collection whose emptiness disables the tool.
    pub gate: Option<Collection>,
    /// Effect on the store.
    pub kind: ToolKind,
    /// JSON schema of the arguments.
    pub input_schema: Value,
}

impl ToolSpec {
    /// The protocol descriptor.
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.to_string(),
            title: Some(self.title.to_string()),
            description: Some(self.description.to_string()),
            input_schema: self.input_schema.clone(),
            annotations: Some(self.kind.annotations()),
        }
    }
}

/// Arguments of every single-code tool.
#[derive(Debug, Deserialize)]
pub struct CodeInput {
    /// Code of the addressed record.
    pub code: String,
}

/// Arguments of `add_employee_to_task` and `remove_employee_from_task`.
#[derive(Debug, Deserialize)]
pub struct AssignmentInput {
    /// Employee code.
    pub employee_code: String,
    /// Task code.
    pub task_code: String,
}

/// Arguments of `add_tag_to_task` and `remove_tag_from_task`.
#[derive(Debug, Deserialize)]
pub struct TagLinkInput {
    /// Tag code.
    pub tag_code: String,
    /// Task code.
    pub task_code: String,
}

/// Arguments of `edit_employee`.
#[derive(Debug, Deserialize)]
pub struct EditEmployeeInput {
    /// Code of the record to change.
    pub code: String,
    /// Fields to change.
    #[serde(flatten)]
    pub patch: EmployeePatch,
}

/// Arguments of `edit_program`.
#[derive(Debug, Deserialize)]
pub struct EditProgramInput {
    /// Code of the record to change.
    pub code: String,
    /// Fields to change.
    #[serde(flatten)]
    pub patch: ProgramPatch,
}

/// Arguments of `edit_contract`.
#[derive(Debug, Deserialize)]
pub struct EditContractInput {
    /// Code of the record to change.
    pub code: String,
    /// Fields to change.
    #[serde(flatten)]
    pub patch: ContractPatch,
}

/// Arguments of `update_task`.
#[derive(Debug, Deserialize)]
pub struct UpdateTaskInput {
    /// Code of the record to change.
    pub code: String,
    /// Fields to change.
    #[serde(flatten)]
    pub patch: TaskPatch,
}

/// Arguments of `edit_tag`.
#[derive(Debug, Deserialize)]
pub struct EditTagInput {
    /// Tag code.
    pub code: String,
    /// New unique name.
    pub name: String,
}

/// Arguments of `run_really_long_task`. Missing values fall back to the
/// configured defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongTaskInput {
    /// Total seconds.
    pub duration: Option<f64>,
    /// Number of steps.
    pub steps: Option<u32>,
    /// Label used in progress messages.
    pub task_name: Option<String>,
}

fn spec(
    name: &'static str,
    title: &'static str,
    description: &'static str,
    gate: Option<Collection>,
    kind: ToolKind,
    input_schema: Value,
) -> ToolSpec {
    ToolSpec {
        name,
        title,
        description,
        gate,
        kind,
        input_schema,
    }
}

/// Every tool, in listing order.
#[allow(clippy::too_many_lines, reason = "One literal per tool")]
pub fn catalog() -> Vec<ToolSpec> {
    use Collection::{Contracts, Employees, Programs, Tags, Tasks};

    vec![
        // Employees
        spec(
            "list_employees",
            "List Employees",
            "List all employees in the contract management system",
            Some(Employees),
            ToolKind::Read,
            empty_schema(),
        ),
        spec(
            "get_employee",
            "Get Employee",
            "Get an employee by their code",
            Some(Employees),
            ToolKind::Read,
            code_schema("Employee code (e.g., E001)"),
        ),
        spec(
            "add_employee",
            "Add Employee",
            "Create a new employee",
            None,
            ToolKind::Create,
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Full name" },
                    "job_title": { "type": "string", "description": "Job title" },
                    "email": { "type": "string", "description": "Email address" }
                },
                "required": ["name", "job_title", "email"]
            }),
        ),
        spec(
            "edit_employee",
            "Edit Employee",
            "Update an employee. Fields that are not provided will not be updated.",
            Some(Employees),
            ToolKind::Update,
            json!({
                "type": "object",
                "properties": {
                    "code": { "type": "string", "description": "Employee code (e.g., E001)" },
                    "name": { "type": "string", "description": "New full name" },
                    "job_title": { "type": "string", "description": "New job title" },
                    "email": { "type": "string", "description": "New email address" }
                },
                "required": ["code"]
            }),
        ),
        spec(
            "delete_employee",
            "Delete Employee",
            "Delete an employee. Employees who manage a program cannot be deleted.",
            Some(Employees),
            ToolKind::Delete,
            code_schema("Employee code (e.g., E001)"),
        ),
        spec(
            "add_employee_to_task",
            "Add Employee to Task",
            "Assign an employee to a task",
            Some(Employees),
            ToolKind::Link,
            pair_schema("employee_code", "Employee code (e.g., E001)"),
        ),
        spec(
            "remove_employee_from_task",
            "Remove Employee from Task",
            "Remove an employee assignment from a task",
            Some(Employees),
            ToolKind::Link,
            pair_schema("employee_code", "Employee code (e.g., E001)"),
        ),
        spec(
            "get_employee_by_task",
            "Get Employees by Task",
            "Get all employees assigned to a specific task",
            Some(Employees),
            ToolKind::Read,
            code_schema("Task code (e.g., T001)"),
        ),
        // Programs
        spec(
            "list_programs",
            "List Programs",
            "List all programs in the contract management system",
            Some(Programs),
            ToolKind::Read,
            empty_schema(),
        ),
        spec(
            "get_program",
            "Get Program",
            "Get a program by its code",
            Some(Programs),
            ToolKind::Read,
            code_schema("Program code (e.g., P001)"),
        ),
        spec(
            "create_program",
            "Create Program",
            "Create a new program managed by an existing employee. \
             Each employee manages at most one program.",
            None,
            ToolKind::Create,
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Program name" },
                    "description": { "type": "string", "description": "What the program covers" },
                    "manager_code": {
                        "type": "string",
                        "description": "Code of the managing employee (e.g., E001)"
                    }
                },
                "required": ["name", "manager_code"]
            }),
        ),
        spec(
            "edit_program",
            "Edit Program",
            "Update a program. Fields that are not provided will not be updated.",
            Some(Programs),
            ToolKind::Update,
            json!({
                "type": "object",
                "properties": {
                    "code": { "type": "string", "description": "Program code (e.g., P001)" },
                    "name": { "type": "string", "description": "New program name" },
                    "description": { "type": "string", "description": "New description" },
                    "manager_code": {
                        "type": "string",
                        "description": "Code of the new managing employee"
                    }
                },
                "required": ["code"]
            }),
        ),
        spec(
            "delete_program",
            "Delete Program",
            "Delete a program together with its contracts and their tasks",
            Some(Programs),
            ToolKind::Delete,
            code_schema("Program code (e.g., P001)"),
        ),
        // Contracts
        spec(
            "list_contracts",
            "List Contracts",
            "List all contracts in the contract management system",
            Some(Contracts),
            ToolKind::Read,
            empty_schema(),
        ),
        spec(
            "get_contract",
            "Get Contract",
            "Get a contract by its code",
            Some(Contracts),
            ToolKind::Read,
            code_schema("Contract code (e.g., C001)"),
        ),
        spec(
            "create_contract",
            "Create Contract",
            "Create a new contract under an existing program",
            None,
            ToolKind::Create,
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Contract name" },
                    "description": { "type": "string", "description": "What the contract covers" },
                    "program_code": {
                        "type": "string",
                        "description": "Code of the owning program (e.g., P001)"
                    }
                },
                "required": ["name", "program_code"]
            }),
        ),
        spec(
            "edit_contract",
            "Edit Contract",
            "Update a contract. Fields that are not provided will not be updated.",
            Some(Contracts),
            ToolKind::Update,
            json!({
                "type": "object",
                "properties": {
                    "code": { "type": "string", "description": "Contract code (e.g., C001)" },
                    "name": { "type": "string", "description": "New contract name" },
                    "description": { "type": "string", "description": "New description" },
                    "program_code": {
                        "type": "string",
                        "description": "Code of the program to move the contract to"
                    }
                },
                "required": ["code"]
            }),
        ),
        spec(
            "delete_contract",
            "Delete Contract",
            "Delete a contract together with its tasks",
            Some(Contracts),
            ToolKind::Delete,
            code_schema("Contract code (e.g., C001)"),
        ),
        // Tasks
        spec(
            "list_tasks",
            "List Tasks",
            "List all tasks in the contract management system",
            Some(Tasks),
            ToolKind::Read,
            empty_schema(),
        ),
        spec(
            "get_task",
            "Get Task",
            "Get a task by its code, with its assignees and tags",
            Some(Tasks),
            ToolKind::Read,
            code_schema("Task code (e.g., T001)"),
        ),
        spec(
            "create_task",
            "Create Task",
            "Create a new task",
            None,
            ToolKind::Create,
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Task name" },
                    "completion_value": {
                        "type": "integer",
                        "minimum": 0,
                        "maximum": 10,
                        "description": "Completion level from 0 to 10 (default: 0)"
                    },
                    "contract_code": {
                        "type": "string",
                        "description": "Code of the owning contract (e.g., C001)"
                    }
                },
                "required": ["name", "contract_code"]
            }),
        ),
        spec(
            "update_task",
            "Update Task",
            "Update a task. Fields that are not provided will not be updated.",
            Some(Tasks),
            ToolKind::Update,
            json!({
                "type": "object",
                "properties": {
                    "code": { "type": "string", "description": "Task code (e.g., T001)" },
                    "name": { "type": "string", "description": "New task name" },
                    "completion_value": {
                        "type": "integer",
                        "minimum": 0,
                        "maximum": 10,
                        "description": "New completion level from 0 to 10"
                    },
                    "contract_code": {
                        "type": "string",
                        "description": "Code of the contract to move the task to"
                    }
                },
                "required": ["code"]
            }),
        ),
        spec(
            "delete_task",
            "Delete Task",
            "Delete a task",
            Some(Tasks),
            ToolKind::Delete,
            code_schema("Task code (e.g., T001)"),
        ),
        spec(
            "get_tasks_by_contract",
            "Get Tasks by Contract",
            "Get all tasks for a specific contract",
            Some(Tasks),
            ToolKind::Read,
            code_schema("Contract code (e.g., C001)"),
        ),
        // Tags
        spec(
            "list_tags",
            "List Tags",
            "List all tags in the contract management system",
            Some(Tags),
            ToolKind::Read,
            empty_schema(),
        ),
        spec(
            "get_tag",
            "Get Tag",
            "Get a tag by its code",
            Some(Tags),
            ToolKind::Read,
            code_schema("Tag code (e.g., TAG001)"),
        ),
        spec(
            "create_tag",
            "Create Tag",
            "Create a new tag with a unique name",
            None,
            ToolKind::Create,
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Tag name, unique across tags" }
                },
                "required": ["name"]
            }),
        ),
        spec(
            "edit_tag",
            "Edit Tag",
            "Update a tag. The new name must be unique.",
            Some(Tags),
            ToolKind::Update,
            json!({
                "type": "object",
                "properties": {
                    "code": { "type": "string", "description": "Tag code (e.g., TAG001)" },
                    "name": { "type": "string", "description": "New tag name" }
                },
                "required": ["code", "name"]
            }),
        ),
        spec(
            "delete_tag",
            "Delete Tag",
            "Delete a tag",
            Some(Tags),
            ToolKind::Delete,
            code_schema("Tag code (e.g., TAG001)"),
        ),
        spec(
            "add_tag_to_task",
            "Add Tag to Task",
            "Apply a tag to a task",
            Some(Tags),
            ToolKind::Link,
            pair_schema("tag_code", "Tag code (e.g., TAG001)"),
        ),
        spec(
            "remove_tag_from_task",
            "Remove Tag from Task",
            "Remove a tag from a task",
            Some(Tags),
            ToolKind::Link,
            pair_schema("tag_code", "Tag code (e.g., TAG001)"),
        ),
        spec(
            "get_tags_by_task",
            "Get Tags by Task",
            "Get all tags applied to a specific task",
            Some(Tags),
            ToolKind::Read,
            code_schema("Task code (e.g., T001)"),
        ),
        // Progress
        spec(
            "run_really_long_task",
            "Run Really Long Task",
            "Run a task that reports progress after every step and can be cancelled",
            None,
            ToolKind::LongRunning,
            json!({
                "type": "object",
                "properties": {
                    "duration": {
                        "type": "number",
                        "minimum": 1,
                        "maximum": 300,
                        "description": "Total duration in seconds"
                    },
                    "steps": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 100,
                        "description": "Number of steps"
                    },
                    "taskName": {
                        "type": "string",
                        "description": "Name used in progress messages"
                    }
                }
            }),
        ),
    ]
}

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn code_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "code": { "type": "string", "description": description }
        },
        "required": ["code"]
    })
}

fn pair_schema(field: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            field: { "type": "string", "description": description },
            "task_code": { "type": "string", "description": "Task code (e.g., T001)" }
        },
        "required": [field, "task_code"]
    })
}
