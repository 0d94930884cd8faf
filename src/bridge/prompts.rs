// SPDX-License-Identifier: GPL-3.0-or-later

//! Planning prompts that embed live records as context.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mcp::{Content, GetPromptResult, Prompt, PromptArgument, PromptMessage, Role};
use crate::services::Services;
use crate::store::Collection;

use super::content::embedded;
use super::resources::{collection_uri, entity_uri};

const TASK_PLANNING: &str = "task_planning";
const TEAM_ASSIGNMENT: &str = "team_assignment";
const SUGGEST_TAGS: &str = "suggest_tags";

struct PromptSpec {
    name: &'static str,
    title: &'static str,
    description: &'static str,
    argument: &'static str,
    argument_description: &'static str,
    collection: Collection,
}

const PROMPTS: [PromptSpec; 3] = [
    PromptSpec {
        name: TASK_PLANNING,
        title: "Task Planning",
        description: "Generate task suggestions and planning recommendations for a contract",
        argument: "contractCode",
        argument_description: "The code of the contract to plan tasks for (e.g., C001)",
        collection: Collection::Contracts,
    },
    PromptSpec {
        name: TEAM_ASSIGNMENT,
        title: "Team Assignment",
        description: "Suggest employee assignments based on skills, workload, and task requirements",
        argument: "taskCode",
        argument_description: "The code of the task to assign team members to (e.g., T001)",
        collection: Collection::Tasks,
    },
    PromptSpec {
        name: SUGGEST_TAGS,
        title: "Suggest Tags",
        description: "Suggest tags for a task based on its content and available tags",
        argument: "taskCode",
        argument_description: "The code of the task to suggest tags for (e.g., T001)",
        collection: Collection::Tasks,
    },
];

fn spec(name: &str) -> Result<&'static PromptSpec> {
    PROMPTS
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| Error::Validation(format!("Unknown prompt: {name}")))
}

/// Every prompt.
pub fn list() -> Vec<Prompt> {
    PROMPTS
        .iter()
        .map(|p| Prompt {
            name: p.name.to_string(),
            title: Some(p.title.to_string()),
            description: Some(p.description.to_string()),
            arguments: vec![PromptArgument {
                name: p.argument.to_string(),
                description: Some(p.argument_description.to_string()),
                required: true,
            }],
        })
        .collect()
}

/// Collection whose codes complete `argument` of `prompt`, if any.
///
/// # Errors
///
/// Returns [`Error::Validation`] for an unknown prompt.
pub fn argument_collection(prompt: &str, argument: &str) -> Result<Option<Collection>> {
    let spec = spec(prompt)?;
    Ok((spec.argument == argument).then_some(spec.collection))
}

fn user(content: Content) -> PromptMessage {
    PromptMessage {
        role: Role::User,
        content,
    }
}

/// Renders one prompt.
///
/// # Errors
///
/// Returns [`Error::Validation`] for an unknown prompt or a missing argument
/// and [`Error::NotFound`] when the code does not resolve.
pub async fn render(
    services: &Services,
    name: &str,
    arguments: &HashMap<String, String>,
) -> Result<GetPromptResult> {
    let spec = spec(name)?;
    let code = arguments
        .get(spec.argument)
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Error::Validation(format!("{} is required", spec.argument)))?;

    let messages = match spec.name {
        TASK_PLANNING => task_planning(services, code).await?,
        TEAM_ASSIGNMENT => team_assignment(services, code).await?,
        _ => suggest_tags(services, code).await?,
    };
    Ok(GetPromptResult {
        description: Some(spec.description.to_string()),
        messages,
    })
}

async fn task_planning(services: &Services, code: &str) -> Result<Vec<PromptMessage>> {
    let contract = services.contracts().by_code(code).await?;
    let (_, tasks) = services.tasks().by_contract(code).await?;
    let employees = services.employees().all().await?;
    let program = services.programs().by_code(&contract.program_code).await?;

    let text = format!(
        "Please help me plan tasks for contract \"{code}\". Based on the contract details, \
existing tasks, and available team members, suggest:

1. **Missing Tasks**: What key tasks might be missing for successful contract completion?
2. **Task Breakdown**: How to break down large or complex existing tasks into smaller, manageable pieces?
3. **Dependencies**: What task dependencies and sequencing should be considered?
4. **Resource Planning**: How to optimally distribute tasks among available team members?
5. **Timeline Recommendations**: Suggested priorities and scheduling based on current progress?

For each suggested task, provide:
- Clear task name and description
- Estimated completion level (0-10 scale to match existing system)
- Recommended assignees based on skills and current workload
- Dependencies on existing tasks
- Priority level and timeline suggestions

If you recommend creating any tasks, you can use the \"create_task\" tool to add them to the contract."
    );

    Ok(vec![
        user(Content::text(text)),
        user(embedded(entity_uri(Collection::Contracts, code), &contract)?),
        user(embedded(collection_uri(Collection::Tasks), &tasks)?),
        user(embedded(collection_uri(Collection::Employees), &employees)?),
        user(embedded(entity_uri(Collection::Programs, &program.code), &program)?),
    ])
}

async fn team_assignment(services: &Services, code: &str) -> Result<Vec<PromptMessage>> {
    let details = services.tasks().details(code).await?;
    let contract = services.contracts().by_code(&details.task.contract_code).await?;
    let employees = services.employees().all().await?;

    let text = format!(
        "Please suggest optimal team assignments for task \"{code}\". Consider:

1. **Skills Match**: Which employees have the right skills/job titles for this task?
2. **Team Composition**: Mix of skills and experience levels needed
3. **Current Assignment**: Who is already assigned and whether changes are needed
4. **Knowledge Transfer**: Opportunities for mentoring and skill development

Provide specific recommendations for:
- Who should be assigned to this task and why
- Who should be removed from current assignments if necessary
- How to balance the team composition
- Any skill gaps that need to be addressed

If you recommend assignment changes, you can use the \"add_employee_to_task\" and \
\"remove_employee_from_task\" tools to make the assignments."
    );

    Ok(vec![
        user(Content::text(text)),
        user(embedded(entity_uri(Collection::Tasks, code), &details)?),
        user(embedded(entity_uri(Collection::Contracts, &contract.code), &contract)?),
        user(embedded(collection_uri(Collection::Employees), &employees)?),
    ])
}

async fn suggest_tags(services: &Services, code: &str) -> Result<Vec<PromptMessage>> {
    let details = services.tasks().details(code).await?;
    let tags = services.tags().all().await?;

    let text = format!(
        "Below is my contract management task with code \"{code}\" and the tags I have available.

Please suggest some tags to add to it. Feel free to suggest new tags I don't have yet.

For each tag I approve, if it does not yet exist, create it with the \"create_tag\" tool. \
Then add approved tags to the task with the \"add_tag_to_task\" tool.

Consider the task's:
- Name
- Completion level (indicates task complexity/status)
- Context within the contract and program

Suggest tags that would help with:
- Categorization (e.g., development, testing, documentation)
- Priority/urgency indicators
- Skill requirements
- Status tracking
- Risk/complexity levels"
    );

    Ok(vec![
        user(Content::text(text)),
        user(embedded(collection_uri(Collection::Tags), &tags)?),
        user(embedded(entity_uri(Collection::Tasks, code), &details)?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use std::sync::Arc;

    async fn seeded() -> anyhow::Result<Services> {
        let store = Arc::new(Store::open_in_memory()?);
        store.seed().await?;
        Ok(Services::new(store))
    }

    fn args(key: &str, value: &str) -> HashMap<String, String> {
        HashMap::from([(key.to_string(), value.to_string())])
    }

    #[test]
    fn test_list() {
        let prompts = list();
        let names: Vec<&str> = prompts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec![TASK_PLANNING, TEAM_ASSIGNMENT, SUGGEST_TAGS]);
        assert!(
            prompts
                .iter()
                .all(|p| p.arguments.len() == 1 && p.arguments[0].required)
        );
    }

    #[tokio::test]
    async fn test_task_planning_embeds_context() -> anyhow::Result<()> {
        let services = seeded().await?;
        let result = render(&services, TASK_PLANNING, &args("contractCode", "C001")).await?;
        assert_eq!(result.messages.len(), 5);
        let uris: Vec<String> = result
            .messages
            .iter()
            .filter_map(|m| match &m.content {
                Content::Resource { resource } => Some(resource.uri.clone()),
                _ => None,
            })
            .collect();
        assert!(uris.contains(&"contract-manager://contracts/C001".to_string()));
        assert!(uris.contains(&"contract-manager://employees".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_team_assignment_and_tags() -> anyhow::Result<()> {
        let services = seeded().await?;
        let team = render(&services, TEAM_ASSIGNMENT, &args("taskCode", "T001")).await?;
        assert_eq!(team.messages.len(), 4);
        let tags = render(&services, SUGGEST_TAGS, &args("taskCode", "T001")).await?;
        assert_eq!(tags.messages.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_and_unknown_arguments() -> anyhow::Result<()> {
        let services = seeded().await?;
        assert!(matches!(
            render(&services, SUGGEST_TAGS, &HashMap::new()).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            render(&services, SUGGEST_TAGS, &args("taskCode", "T999")).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            render(&services, "no_such_prompt", &HashMap::new()).await,
            Err(Error::Validation(_))
        ));
        Ok(())
    }

    #[test]
    fn test_argument_collection() -> anyhow::Result<()> {
        assert_eq!(
            argument_collection(TASK_PLANNING, "contractCode")?,
            Some(Collection::Contracts)
        );
        assert_eq!(argument_collection(SUGGEST_TAGS, "other")?, None);
        assert!(argument_collection("nope", "taskCode").is_err());
        Ok(())
    }
}
