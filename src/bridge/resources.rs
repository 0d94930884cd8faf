// SPDX-License-Identifier: GPL-3.0-or-later

//! `contract-manager://` resources and argument completion.
//!
//! `contract-manager://{collection}` lists a whole collection and
//! `contract-manager://{collection}/{code}` addresses one record. Only the
//! latter can be subscribed to.

use std::fmt;

use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::mcp::{
    CompleteParams, Completion, CompletionReference, ReadResourceResult, Resource, ResourceContents,
    ResourceTemplate,
};
use crate::services::Services;
use crate::store::{self, Collection};

use super::content::{MIME_JSON, to_json};
use super::prompts;

/// URI scheme of every resource.
pub const URI_SCHEME: &str = "contract-manager";

/// Most completion values returned at once.
const MAX_COMPLETIONS: usize = 100;

/// URI of one record.
pub fn entity_uri(collection: Collection, code: &str) -> String {
    format!("{URI_SCHEME}://{}/{code}", collection.table())
}

/// URI of a whole collection.
pub fn collection_uri(collection: Collection) -> String {
    format!("{URI_SCHEME}://{}", collection.table())
}

/// A parsed resource URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceUri {
    /// A whole collection.
    Collection(Collection),
    /// One record.
    Entity(Collection, String),
}

impl ResourceUri {
    /// Parses a `contract-manager://` URI.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownResource`] for anything else.
    pub fn parse(uri: &str) -> Result<Self> {
        let unknown = || Error::UnknownResource(uri.to_string());
        let url = Url::parse(uri).map_err(|_| unknown())?;
        if url.scheme() != URI_SCHEME || url.query().is_some() || url.fragment().is_some() {
            return Err(unknown());
        }
        let collection = url
            .host_str()
            .and_then(Collection::from_segment)
            .ok_or_else(unknown)?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        match segments.as_slice() {
            [] => Ok(Self::Collection(collection)),
            [code] => Ok(Self::Entity(collection, (*code).to_string())),
            _ => Err(unknown()),
        }
    }

    /// The collection addressed.
    pub const fn collection(&self) -> Collection {
        match self {
            Self::Collection(collection) | Self::Entity(collection, _) => *collection,
        }
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection(collection) => f.write_str(&collection_uri(*collection)),
            Self::Entity(collection, code) => f.write_str(&entity_uri(*collection, code)),
        }
    }
}

fn title(collection: Collection) -> &'static str {
    match collection {
        Collection::Employees => "Employees",
        Collection::Programs => "Programs",
        Collection::Contracts => "Contracts",
        Collection::Tasks => "Tasks",
        Collection::Tags => "Tags",
    }
}

/// One listing resource per collection.
pub fn static_resources() -> Vec<Resource> {
    Collection::ALL
        .into_iter()
        .map(|collection| Resource {
            uri: collection_uri(collection),
            name: collection.table().to_string(),
            title: Some(title(collection).to_string()),
            description: Some(format!("All {} currently in the database", collection.table())),
            mime_type: Some(MIME_JSON.to_string()),
        })
        .collect()
}

/// One `{code}` template per collection.
pub fn templates() -> Vec<ResourceTemplate> {
    Collection::ALL
        .into_iter()
        .map(|collection| {
            let noun = collection.entity().to_lowercase();
            ResourceTemplate {
                uri_template: format!("{}/{{code}}", collection_uri(collection)),
                name: noun.clone(),
                title: Some(collection.entity().to_string()),
                description: Some(format!("A single {noun} with the given code")),
                mime_type: Some(MIME_JSON.to_string()),
            }
        })
        .collect()
}

/// Reads a listing or a single record as JSON.
///
/// # Errors
///
/// Returns [`Error::UnknownResource`] for a malformed URI and
/// [`Error::NotFound`] for an unknown code.
pub async fn read(services: &Services, uri: &str) -> Result<ReadResourceResult> {
    let parsed = ResourceUri::parse(uri)?;
    debug!(uri, "Reading resource");

    let text = match &parsed {
        ResourceUri::Collection(Collection::Employees) => {
            to_json(&services.employees().all().await?)?
        }
        ResourceUri::Collection(Collection::Programs) => {
            to_json(&services.programs().all().await?)?
        }
        ResourceUri::Collection(Collection::Contracts) => {
            to_json(&services.contracts().all().await?)?
        }
        ResourceUri::Collection(Collection::Tasks) => to_json(&services.tasks().all().await?)?,
        ResourceUri::Collection(Collection::Tags) => to_json(&services.tags().all().await?)?,
        ResourceUri::Entity(Collection::Employees, code) => {
            to_json(&services.employees().by_code(code).await?)?
        }
        ResourceUri::Entity(Collection::Programs, code) => {
            to_json(&services.programs().by_code(code).await?)?
        }
        ResourceUri::Entity(Collection::Contracts, code) => {
            to_json(&services.contracts().by_code(code).await?)?
        }
        ResourceUri::Entity(Collection::Tasks, code) => {
            to_json(&services.tasks().details(code).await?)?
        }
        ResourceUri::Entity(Collection::Tags, code) => {
            to_json(&services.tags().by_code(code).await?)?
        }
    };

    Ok(ReadResourceResult {
        contents: vec![ResourceContents {
            uri: parsed.to_string(),
            mime_type: Some(MIME_JSON.to_string()),
            text,
        }],
    })
}

/// Checks that `uri` names an existing record and returns its canonical form.
///
/// # Errors
///
/// Returns [`Error::UnknownResource`] for collection URIs, malformed URIs and
/// unknown codes.
pub async fn subscribable(services: &Services, uri: &str) -> Result<String> {
    let parsed = ResourceUri::parse(uri)?;
    let ResourceUri::Entity(collection, code) = &parsed else {
        return Err(Error::UnknownResource(format!(
            "{uri} (only single records can be subscribed to)"
        )));
    };
    let found = services
        .store()
        .call(|conn| store::id_for_code(conn, *collection, code))
        .await;
    match found {
        Ok(_) => Ok(parsed.to_string()),
        Err(Error::NotFound { .. }) => Err(Error::UnknownResource(format!(
            "{uri} ({} with code \"{code}\" not found)",
            collection.entity()
        ))),
        Err(e) => Err(e),
    }
}

/// Completes a `code` template variable or a prompt argument.
///
/// # Errors
///
/// Returns [`Error::Validation`] for an unknown prompt or template.
pub async fn complete(services: &Services, params: CompleteParams) -> Result<Completion> {
    let collection = match &params.reference {
        CompletionReference::Resource { uri } => {
            let collection = uri
                .strip_prefix(&format!("{URI_SCHEME}://"))
                .and_then(|rest| rest.split('/').next())
                .and_then(Collection::from_segment)
                .ok_or_else(|| Error::Validation(format!("Unknown resource template: {uri}")))?;
            (params.argument.name == "code").then_some(collection)
        }
        CompletionReference::Prompt { name } => {
            prompts::argument_collection(name, &params.argument.name)?
        }
    };

    let Some(collection) = collection else {
        return Ok(Completion::default());
    };
    let codes = services.store().codes(collection).await?;
    Ok(filter_codes(codes, &params.argument.value))
}

fn filter_codes(codes: Vec<String>, typed: &str) -> Completion {
    let needle = typed.to_lowercase();
    let matches: Vec<String> = codes
        .into_iter()
        .filter(|code| code.to_lowercase().contains(&needle))
        .collect();
    let total = matches.len();
    Completion {
        values: matches.into_iter().take(MAX_COMPLETIONS).collect(),
        total: Some(total),
        has_more: total > MAX_COMPLETIONS,
    }
}
