/*
 * Copyright (C) 2026 Mark Wells Dev
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Bridge handler that maps MCP calls onto the entity services.
//!
//! Every mutating tool runs the same pipeline: availability gate, argument
//! decoding, referential pre-checks, the confirmation gate for deletes, the
//! service call, then the post-commit hooks (`list_changed`, `updated`,
//! availability re-evaluation). Hook failures never undo the commit.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::availability::{AvailabilityController, CollectionProbe, OperationRegistry};
use crate::confirm::ConfirmationGate;
use crate::dispatch::NotificationDispatcher;
use crate::error::{Error, Result};
use crate::mcp::{
    CallContext, CallToolResult, CompleteParams, Completion, GetPromptResult, McpHandler, Prompt,
    ReadResourceResult, Resource, ResourceTemplate, ServerInfo, Tool,
};
use crate::progress::{self, ProgressPlan};
use crate::services::Services;
use crate::services::contracts::NewContract;
use crate::services::employees::NewEmployee;
use crate::services::programs::NewProgram;
use crate::services::tags::NewTag;
use crate::services::tasks::NewTask;
use crate::session::{Session, SessionHub, SessionId};
use crate::store::models::{Deleted, Record, Task, Updated};
use crate::store::{Collection, Store};
use crate::subscriptions::SubscriptionRegistry;

use super::content::{embedded, embedded_record, link, noun, parse_args, tool_result};
use super::resources::{self, ResourceUri, entity_uri};
use super::prompts;
use super::tools::{
    AssignmentInput, CodeInput, EditContractInput, EditEmployeeInput, EditProgramInput,
    EditTagInput, LongTaskInput, TagLinkInput, ToolSpec, UpdateTaskInput, catalog,
};

/// Runtime settings of the handler.
#[derive(Debug, Clone)]
pub struct HandlerOptions {
    /// How long a delete waits for the user to confirm.
    pub elicitation_timeout: Duration,
    /// `run_really_long_task` duration when the caller gives none, in seconds.
    pub default_duration: f64,
    /// `run_really_long_task` step count when the caller gives none.
    pub default_steps: u32,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            elicitation_timeout: Duration::from_secs(300),
            default_duration: 30.0,
            default_steps: 10,
        }
    }
}

/// Post-commit effects of one mutation.
#[derive(Debug, Default)]
struct Change {
    list_changed: Option<Collection>,
    updated: Vec<String>,
    touched: Vec<Collection>,
}

impl Change {
    fn created<T: Record>() -> Self {
        Self {
            list_changed: Some(T::COLLECTION),
            updated: Vec::new(),
            touched: vec![T::COLLECTION],
        }
    }

    fn updated<T: Record>(updated: &Updated<T>) -> Self {
        let mut uris = vec![entity_uri(T::COLLECTION, updated.current.code())];
        uris.extend(task_uris(&updated.linked_tasks));
        Self {
            list_changed: updated.renamed().then_some(T::COLLECTION),
            updated: uris,
            touched: Vec::new(),
        }
    }

    fn deleted<T: Record>(deleted: &Deleted<T>) -> Self {
        let mut updated = vec![entity_uri(T::COLLECTION, deleted.record.code())];
        updated.extend(
            deleted
                .cascaded
                .iter()
                .map(|(collection, code)| entity_uri(*collection, code)),
        );
        updated.extend(task_uris(&deleted.linked_tasks));
        Self {
            list_changed: Some(T::COLLECTION),
            updated,
            touched: deleted.touched(),
        }
    }

    /// An assignment or tag link changed; the task resource embeds both.
    fn relinked(task: &Task) -> Self {
        Self {
            updated: vec![entity_uri(Collection::Tasks, &task.code)],
            ..Self::default()
        }
    }
}

/// URIs of tasks whose embedded assignees or tags changed.
fn task_uris(codes: &[String]) -> impl Iterator<Item = String> + '_ {
    codes.iter().map(|code| entity_uri(Collection::Tasks, code))
}

/// MCP handler for the contract manager.
pub struct ContractManagerHandler<P = Arc<Store>> {
    services: Services,
    tools: Vec<ToolSpec>,
    availability: AvailabilityController<P>,
    subscriptions: Arc<SubscriptionRegistry>,
    dispatcher: NotificationDispatcher,
    gate: ConfirmationGate,
    options: HandlerOptions,
}

impl ContractManagerHandler {
    /// Registers every tool and reads the initial availability from `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if a collection cannot be counted.
    pub async fn new(
        store: Arc<Store>,
        hub: Arc<SessionHub>,
        options: HandlerOptions,
    ) -> Result<Self> {
        Self::with_probe(Arc::clone(&store), store, hub, options).await
    }
}

impl<P: CollectionProbe> ContractManagerHandler<P> {
    /// Like [`ContractManagerHandler::new`], but availability reads
    /// collection sizes through `probe`.
    ///
    /// # Errors
    ///
    /// Returns an error if a collection cannot be counted.
    pub async fn with_probe(
        store: Arc<Store>,
        probe: P,
        hub: Arc<SessionHub>,
        options: HandlerOptions,
    ) -> Result<Self> {
        let tools = catalog();
        let operations = Arc::new(OperationRegistry::new());
        for tool in &tools {
            operations.register(tool.name, tool.gate);
        }
        let availability = AvailabilityController::initialize(probe, operations).await?;

        let subscriptions = Arc::new(SubscriptionRegistry::new());
        let dispatcher = NotificationDispatcher::new(Arc::clone(&subscriptions), hub);
        info!(
            tools = tools.len(),
            enabled = availability.operations().enabled().len(),
            "Handler ready"
        );

        Ok(Self {
            services: Services::new(store),
            tools,
            availability,
            subscriptions,
            dispatcher,
            gate: ConfirmationGate::new(options.elicitation_timeout),
            options,
        })
    }

    /// The entity services.
    pub const fn services(&self) -> &Services {
        &self.services
    }

    /// Enabled flags of every tool.
    pub const fn operations(&self) -> &Arc<OperationRegistry> {
        self.availability.operations()
    }

    /// Resource subscriptions of every session.
    pub const fn subscriptions(&self) -> &Arc<SubscriptionRegistry> {
        &self.subscriptions
    }

    fn ensure_enabled(&self, name: &str) -> Result<()> {
        match self.operations().is_enabled(name) {
            Some(true) => Ok(()),
            Some(false) => Err(Error::Unavailable(name.to_string())),
            None => Err(Error::UnknownTool(name.to_string())),
        }
    }

    /// Runs the post-commit hooks. Notifications go out first; a failed
    /// availability check is reported as [`Error::PostCommit`].
    async fn publish(&self, committed: &str, change: Change) -> Result<()> {
        if let Some(collection) = change.list_changed {
            self.dispatcher.resources_list_changed(collection);
        }
        for uri in &change.updated {
            self.dispatcher.resource_updated(uri);
        }
        for collection in change.touched {
            match self.availability.evaluate(collection).await {
                Ok(true) => {
                    self.dispatcher.tools_list_changed();
                }
                Ok(false) => {}
                Err(source) => {
                    return Err(Error::PostCommit {
                        committed: committed.to_string(),
                        source: Box::new(source),
                    });
                }
            }
        }
        Ok(())
    }

    /// Asks the caller to confirm deleting `record`. Returns the result to
    /// send back when the answer is negative.
    async fn confirm_delete<T: Record>(
        &self,
        session: &Session,
        record: &T,
    ) -> Option<CallToolResult> {
        let noun = noun::<T>();
        let question = format!(
            "Are you sure you want to delete {noun} \"{}\" (code: {})?",
            record.name(),
            record.code()
        );
        if self.gate.confirm(session, question).await.proceeds() {
            return None;
        }

        info!(session = %session.id(), code = record.code(), "Delete declined");
        Some(tool_result(
            format!(
                "Deleting {noun} \"{}\" ({}) was cancelled by the user.",
                record.name(),
                record.code()
            ),
            Vec::new(),
            json!({ "cancelled": true, "code": record.code() }),
        ))
    }

    async fn created<T: Record + Serialize>(&self, record: T) -> Result<CallToolResult> {
        let message = format!(
            "{} \"{}\" created successfully with code \"{}\"",
            T::COLLECTION.entity(),
            record.name(),
            record.code()
        );
        self.publish(&message, Change::created::<T>()).await?;
        let key = noun::<T>();
        Ok(tool_result(
            message,
            vec![embedded_record(&record)?],
            json!({ key: record }),
        ))
    }

    async fn updated<T: Record + Serialize>(&self, updated: Updated<T>) -> Result<CallToolResult> {
        let message = format!(
            "{} \"{}\" (code: {}) updated successfully",
            T::COLLECTION.entity(),
            updated.current.name(),
            updated.current.code()
        );
        self.publish(&message, Change::updated(&updated)).await?;
        let key = noun::<T>();
        Ok(tool_result(
            message,
            vec![embedded_record(&updated.current)?],
            json!({ key: updated.current }),
        ))
    }

    async fn deleted<T: Record + Serialize>(&self, deleted: Deleted<T>) -> Result<CallToolResult> {
        let mut message = format!(
            "{} \"{}\" (code: {}) deleted successfully",
            T::COLLECTION.entity(),
            deleted.record.name(),
            deleted.record.code()
        );
        if !deleted.cascaded.is_empty() {
            let removed: Vec<&str> =
                deleted.cascaded.iter().map(|(_, code)| code.as_str()).collect();
            message.push_str(&format!(", also removed {}", removed.join(", ")));
        }
        self.publish(&message, Change::deleted(&deleted)).await?;

        let cascaded: Vec<Value> = deleted
            .cascaded
            .iter()
            .map(|(collection, code)| json!({ "type": collection.entity(), "code": code }))
            .collect();
        let key = noun::<T>();
        Ok(tool_result(
            message,
            Vec::new(),
            json!({ key: deleted.record, "deleted": true, "cascaded": cascaded }),
        ))
    }

    async fn relinked(
        &self,
        message: String,
        task: &Task,
        structured: Value,
    ) -> Result<CallToolResult> {
        self.publish(&message, Change::relinked(task)).await?;
        Ok(tool_result(message, Vec::new(), structured))
    }

    fn listed<T: Record + Serialize>(records: &[T]) -> CallToolResult {
        let plural = T::COLLECTION.table();
        tool_result(
            format!("Found {} {plural}.", records.len()),
            records.iter().map(link).collect(),
            json!({ plural: records, "count": records.len() }),
        )
    }

    fn fetched<T: Record + Serialize>(record: &T) -> Result<CallToolResult> {
        let key = noun::<T>();
        Ok(tool_result(
            format!("{} \"{}\" ({})", T::COLLECTION.entity(), record.name(), record.code()),
            vec![embedded_record(record)?],
            json!({ key: record }),
        ))
    }

    // Employees

    async fn handle_list_employees(&self) -> Result<CallToolResult> {
        Ok(Self::listed(&self.services.employees().all().await?))
    }

    async fn handle_get_employee(&self, arguments: Option<Value>) -> Result<CallToolResult> {
        let input: CodeInput = parse_args(arguments)?;
        Self::fetched(&self.services.employees().by_code(&input.code).await?)
    }

    async fn handle_add_employee(&self, arguments: Option<Value>) -> Result<CallToolResult> {
        let new: NewEmployee = parse_args(arguments)?;
        let employee = self.services.employees().create(new).await?;
        self.created(employee).await
    }

    async fn handle_edit_employee(&self, arguments: Option<Value>) -> Result<CallToolResult> {
        let input: EditEmployeeInput = parse_args(arguments)?;
        let updated = self.services.employees().update(&input.code, input.patch).await?;
        self.updated(updated).await
    }

    async fn handle_delete_employee(
        &self,
        arguments: Option<Value>,
        context: &CallContext,
    ) -> Result<CallToolResult> {
        let input: CodeInput = parse_args(arguments)?;
        let employee = self.services.employees().ensure_deletable(&input.code).await?;
        if let Some(declined) = self.confirm_delete(&context.session, &employee).await {
            return Ok(declined);
        }
        let deleted = self.services.employees().delete(&input.code).await?;
        self.deleted(deleted).await
    }

    async fn handle_add_employee_to_task(
        &self,
        arguments: Option<Value>,
    ) -> Result<CallToolResult> {
        let input: AssignmentInput = parse_args(arguments)?;
        let (employee, task) = self
            .services
            .employees()
            .assign_to_task(&input.employee_code, &input.task_code)
            .await?;
        let message = format!(
            "Employee \"{}\" ({}) assigned to task \"{}\" ({}) successfully",
            employee.name, employee.code, task.name, task.code
        );
        let structured = json!({ "employee": employee, "task": task });
        self.relinked(message, &task, structured).await
    }

    async fn handle_remove_employee_from_task(
        &self,
        arguments: Option<Value>,
    ) -> Result<CallToolResult> {
        let input: AssignmentInput = parse_args(arguments)?;
        let (employee, task) = self
            .services
            .employees()
            .remove_from_task(&input.employee_code, &input.task_code)
            .await?;
        let message = format!(
            "Employee \"{}\" ({}) removed from task \"{}\" ({}) successfully",
            employee.name, employee.code, task.name, task.code
        );
        let structured = json!({ "employee": employee, "task": task });
        self.relinked(message, &task, structured).await
    }

    async fn handle_get_employee_by_task(
        &self,
        arguments: Option<Value>,
    ) -> Result<CallToolResult> {
        let input: CodeInput = parse_args(arguments)?;
        let (task, employees) = self.services.employees().by_task(&input.code).await?;
        Ok(tool_result(
            format!(
                "Found {} employees assigned to task \"{}\" ({}).",
                employees.len(),
                task.name,
                task.code
            ),
            employees.iter().map(link).collect(),
            json!({
                "task_code": task.code,
                "task_name": task.name,
                "employees": employees,
                "count": employees.len(),
            }),
        ))
    }

    // Programs

    async fn handle_list_programs(&self) -> Result<CallToolResult> {
        Ok(Self::listed(&self.services.programs().all().await?))
    }

    async fn handle_get_program(&self, arguments: Option<Value>) -> Result<CallToolResult> {
        let input: CodeInput = parse_args(arguments)?;
        Self::fetched(&self.services.programs().by_code(&input.code).await?)
    }

    async fn handle_create_program(&self, arguments: Option<Value>) -> Result<CallToolResult> {
        let new: NewProgram = parse_args(arguments)?;
        let program = self.services.programs().create(new).await?;
        self.created(program).await
    }

    async fn handle_edit_program(&self, arguments: Option<Value>) -> Result<CallToolResult> {
        let input: EditProgramInput = parse_args(arguments)?;
        let updated = self.services.programs().update(&input.code, input.patch).await?;
        self.updated(updated).await
    }

    async fn handle_delete_program(
        &self,
        arguments: Option<Value>,
        context: &CallContext,
    ) -> Result<CallToolResult> {
        let input: CodeInput = parse_args(arguments)?;
        let program = self.services.programs().ensure_deletable(&input.code).await?;
        if let Some(declined) = self.confirm_delete(&context.session, &program).await {
            return Ok(declined);
        }
        let deleted = self.services.programs().delete(&input.code).await?;
        self.deleted(deleted).await
    }

    // Contracts

    async fn handle_list_contracts(&self) -> Result<CallToolResult> {
        Ok(Self::listed(&self.services.contracts().all().await?))
    }

    async fn handle_get_contract(&self, arguments: Option<Value>) -> Result<CallToolResult> {
        let input: CodeInput = parse_args(arguments)?;
        Self::fetched(&self.services.contracts().by_code(&input.code).await?)
    }

    async fn handle_create_contract(&self, arguments: Option<Value>) -> Result<CallToolResult> {
        let new: NewContract = parse_args(arguments)?;
        let contract = self.services.contracts().create(new).await?;
        self.created(contract).await
    }

    async fn handle_edit_contract(&self, arguments: Option<Value>) -> Result<CallToolResult> {
        let input: EditContractInput = parse_args(arguments)?;
        let updated = self.services.contracts().update(&input.code, input.patch).await?;
        self.updated(updated).await
    }

    async fn handle_delete_contract(
        &self,
        arguments: Option<Value>,
        context: &CallContext,
    ) -> Result<CallToolResult> {
        let input: CodeInput = parse_args(arguments)?;
        let contract = self.services.contracts().ensure_deletable(&input.code).await?;
        if let Some(declined) = self.confirm_delete(&context.session, &contract).await {
            return Ok(declined);
        }
        let deleted = self.services.contracts().delete(&input.code).await?;
        self.deleted(deleted).await
    }

    // Tasks

    async fn handle_list_tasks(&self) -> Result<CallToolResult> {
        Ok(Self::listed(&self.services.tasks().all().await?))
    }

    async fn handle_get_task(&self, arguments: Option<Value>) -> Result<CallToolResult> {
        let input: CodeInput = parse_args(arguments)?;
        let details = self.services.tasks().details(&input.code).await?;
        Ok(tool_result(
            format!(
                "Task \"{}\" ({}): {} assignees, {} tags",
                details.task.name,
                details.task.code,
                details.employees.len(),
                details.tags.len()
            ),
            vec![embedded(entity_uri(Collection::Tasks, &details.task.code), &details)?],
            json!({ "task": details }),
        ))
    }

    async fn handle_create_task(&self, arguments: Option<Value>) -> Result<CallToolResult> {
        let new: NewTask = parse_args(arguments)?;
        let task = self.services.tasks().create(new).await?;
        self.created(task).await
    }

    async fn handle_update_task(&self, arguments: Option<Value>) -> Result<CallToolResult> {
        let input: UpdateTaskInput = parse_args(arguments)?;
        let updated = self.services.tasks().update(&input.code, input.patch).await?;
        self.updated(updated).await
    }

    async fn handle_delete_task(
        &self,
        arguments: Option<Value>,
        context: &CallContext,
    ) -> Result<CallToolResult> {
        let input: CodeInput = parse_args(arguments)?;
        let task = self.services.tasks().ensure_deletable(&input.code).await?;
        if let Some(declined) = self.confirm_delete(&context.session, &task).await {
            return Ok(declined);
        }
        let deleted = self.services.tasks().delete(&input.code).await?;
        self.deleted(deleted).await
    }

    async fn handle_get_tasks_by_contract(
        &self,
        arguments: Option<Value>,
    ) -> Result<CallToolResult> {
        let input: CodeInput = parse_args(arguments)?;
        let (contract, tasks) = self.services.tasks().by_contract(&input.code).await?;
        Ok(tool_result(
            format!(
                "Found {} tasks for contract \"{}\" ({}).",
                tasks.len(),
                contract.name,
                contract.code
            ),
            tasks.iter().map(link).collect(),
            json!({
                "contract_code": contract.code,
                "contract_name": contract.name,
                "tasks": tasks,
                "count": tasks.len(),
            }),
        ))
    }

    // Tags

    async fn handle_list_tags(&self) -> Result<CallToolResult> {
        Ok(Self::listed(&self.services.tags().all().await?))
    }

    async fn handle_get_tag(&self, arguments: Option<Value>) -> Result<CallToolResult> {
        let input: CodeInput = parse_args(arguments)?;
        Self::fetched(&self.services.tags().by_code(&input.code).await?)
    }

    async fn handle_create_tag(&self, arguments: Option<Value>) -> Result<CallToolResult> {
        let new: NewTag = parse_args(arguments)?;
        let tag = self.services.tags().create(new).await?;
        self.created(tag).await
    }

    async fn handle_edit_tag(&self, arguments: Option<Value>) -> Result<CallToolResult> {
        let input: EditTagInput = parse_args(arguments)?;
        let updated = self.services.tags().update(&input.code, &input.name).await?;
        self.updated(updated).await
    }

    async fn handle_delete_tag(
        &self,
        arguments: Option<Value>,
        context: &CallContext,
    ) -> Result<CallToolResult> {
        let input: CodeInput = parse_args(arguments)?;
        let tag = self.services.tags().ensure_deletable(&input.code).await?;
        if let Some(declined) = self.confirm_delete(&context.session, &tag).await {
            return Ok(declined);
        }
        let deleted = self.services.tags().delete(&input.code).await?;
        self.deleted(deleted).await
    }

    async fn handle_add_tag_to_task(&self, arguments: Option<Value>) -> Result<CallToolResult> {
        let input: TagLinkInput = parse_args(arguments)?;
        let (tag, task) = self
            .services
            .tags()
            .add_to_task(&input.tag_code, &input.task_code)
            .await?;
        let message = format!(
            "Tag \"{}\" ({}) applied to task \"{}\" ({}) successfully",
            tag.name, tag.code, task.name, task.code
        );
        let structured = json!({ "tag": tag, "task": task });
        self.relinked(message, &task, structured).await
    }

    async fn handle_remove_tag_from_task(
        &self,
        arguments: Option<Value>,
    ) -> Result<CallToolResult> {
        let input: TagLinkInput = parse_args(arguments)?;
        let (tag, task) = self
            .services
            .tags()
            .remove_from_task(&input.tag_code, &input.task_code)
            .await?;
        let message = format!(
            "Tag \"{}\" ({}) removed from task \"{}\" ({}) successfully",
            tag.name, tag.code, task.name, task.code
        );
        let structured = json!({ "tag": tag, "task": task });
        self.relinked(message, &task, structured).await
    }

    async fn handle_get_tags_by_task(&self, arguments: Option<Value>) -> Result<CallToolResult> {
        let input: CodeInput = parse_args(arguments)?;
        let (task, tags) = self.services.tags().by_task(&input.code).await?;
        Ok(tool_result(
            format!("Found {} tags on task \"{}\" ({}).", tags.len(), task.name, task.code),
            tags.iter().map(link).collect(),
            json!({
                "task_code": task.code,
                "task_name": task.name,
                "tags": tags,
                "count": tags.len(),
            }),
        ))
    }

    // Progress

    async fn handle_run_really_long_task(
        &self,
        arguments: Option<Value>,
        context: &CallContext,
    ) -> Result<CallToolResult> {
        let input: LongTaskInput = parse_args(arguments)?;
        let plan = ProgressPlan::new(
            input.duration.unwrap_or(self.options.default_duration),
            input.steps.unwrap_or(self.options.default_steps),
            input.task_name,
        )?;
        info!(task = plan.name(), steps = plan.steps(), "Starting long-running task");

        let outcome = progress::run(
            &plan,
            context.progress_token.as_ref(),
            &context.cancel,
            context.session.as_ref(),
        )
        .await;

        let duration = outcome.elapsed_secs();
        let message = if !outcome.cancelled {
            format!(
                "{} completed successfully! Duration: {duration:.2}s, Steps: {}",
                plan.name(),
                outcome.total_steps
            )
        } else if outcome.steps_completed == outcome.total_steps {
            format!("{} was cancelled at completion", plan.name())
        } else {
            format!(
                "{} was cancelled after {duration:.2}s (step {}/{})",
                plan.name(),
                outcome.steps_completed,
                outcome.total_steps
            )
        };
        info!(task = plan.name(), cancelled = outcome.cancelled, "Long-running task finished");

        Ok(tool_result(
            message,
            Vec::new(),
            json!({
                "success": !outcome.cancelled,
                "duration": duration,
                "steps": outcome.steps_completed,
                "totalSteps": outcome.total_steps,
                "completedAt": outcome.finished_at.to_rfc3339(),
                "cancelled": outcome.cancelled,
            }),
        ))
    }
}

impl<P: CollectionProbe + 'static> McpHandler for ContractManagerHandler<P> {
    fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: "contract-manager-mcp".to_string(),
            version: Some(env!("CONTRACT_MANAGER_VERSION").to_string()),
        }
    }

    fn instructions(&self) -> Option<String> {
        Some(
            "Manages employees, programs, contracts, tasks and tags. Records are addressed by \
             code (E001, P001, C001, T001, TAG001). Tools for an empty collection are hidden \
             until a record is created. Subscribe to contract-manager://{collection}/{code} to \
             hear about changes to one record."
                .to_string(),
        )
    }

    fn list_tools(&self) -> Vec<Tool> {
        let operations = self.operations();
        self.tools
            .iter()
            .filter(|tool| operations.is_enabled(tool.name) == Some(true))
            .map(ToolSpec::to_tool)
            .collect()
    }

    async fn call_tool(
        &self,
        name: String,
        arguments: Option<Value>,
        context: CallContext,
    ) -> Result<CallToolResult> {
        self.ensure_enabled(&name)?;
        debug!(session = %context.session.id(), tool = %name, "Tool call");

        match name.as_str() {
            "list_employees" => self.handle_list_employees().await,
            "get_employee" => self.handle_get_employee(arguments).await,
            "add_employee" => self.handle_add_employee(arguments).await,
            "edit_employee" => self.handle_edit_employee(arguments).await,
            "delete_employee" => self.handle_delete_employee(arguments, &context).await,
            "add_employee_to_task" => self.handle_add_employee_to_task(arguments).await,
            "remove_employee_from_task" => self.handle_remove_employee_from_task(arguments).await,
            "get_employee_by_task" => self.handle_get_employee_by_task(arguments).await,
            "list_programs" => self.handle_list_programs().await,
            "get_program" => self.handle_get_program(arguments).await,
            "create_program" => self.handle_create_program(arguments).await,
            "edit_program" => self.handle_edit_program(arguments).await,
            "delete_program" => self.handle_delete_program(arguments, &context).await,
            "list_contracts" => self.handle_list_contracts().await,
            "get_contract" => self.handle_get_contract(arguments).await,
            "create_contract" => self.handle_create_contract(arguments).await,
            "edit_contract" => self.handle_edit_contract(arguments).await,
            "delete_contract" => self.handle_delete_contract(arguments, &context).await,
            "list_tasks" => self.handle_list_tasks().await,
            "get_task" => self.handle_get_task(arguments).await,
            "create_task" => self.handle_create_task(arguments).await,
            "update_task" => self.handle_update_task(arguments).await,
            "delete_task" => self.handle_delete_task(arguments, &context).await,
            "get_tasks_by_contract" => self.handle_get_tasks_by_contract(arguments).await,
            "list_tags" => self.handle_list_tags().await,
            "get_tag" => self.handle_get_tag(arguments).await,
            "create_tag" => self.handle_create_tag(arguments).await,
            "edit_tag" => self.handle_edit_tag(arguments).await,
            "delete_tag" => self.handle_delete_tag(arguments, &context).await,
            "add_tag_to_task" => self.handle_add_tag_to_task(arguments).await,
            "remove_tag_from_task" => self.handle_remove_tag_from_task(arguments).await,
            "get_tags_by_task" => self.handle_get_tags_by_task(arguments).await,
            "run_really_long_task" => self.handle_run_really_long_task(arguments, &context).await,
            _ => Err(Error::UnknownTool(name)),
        }
    }

    async fn list_resources(&self) -> Result<Vec<Resource>> {
        Ok(resources::static_resources())
    }

    fn list_resource_templates(&self) -> Vec<ResourceTemplate> {
        resources::templates()
    }

    async fn read_resource(&self, uri: String) -> Result<ReadResourceResult> {
        resources::read(&self.services, &uri).await
    }

    async fn subscribe(&self, session: SessionId, uri: String) -> Result<()> {
        let uri = resources::subscribable(&self.services, &uri).await?;
        self.subscriptions.subscribe(&session, &uri);
        debug!(session = %session, uri = %uri, "Subscribed");
        Ok(())
    }

    fn unsubscribe(&self, session: &SessionId, uri: &str) {
        let uri =
            ResourceUri::parse(uri).map_or_else(|_| uri.to_string(), |parsed| parsed.to_string());
        self.subscriptions.unsubscribe(session, &uri);
        debug!(session = %session, uri = %uri, "Unsubscribed");
    }

    fn list_prompts(&self) -> Vec<Prompt> {
        prompts::list()
    }

    async fn get_prompt(
        &self,
        name: String,
        arguments: HashMap<String, String>,
    ) -> Result<GetPromptResult> {
        prompts::render(&self.services, &name, &arguments).await
    }

    async fn complete(&self, params: CompleteParams) -> Result<Completion> {
        resources::complete(&self.services, params).await
    }

    fn session_closed(&self, session: &SessionId) {
        self.subscriptions.clear_session(session);
        debug!(session = %session, "Cleared subscriptions of closed session");
    }
}
