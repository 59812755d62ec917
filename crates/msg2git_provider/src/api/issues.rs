//! Issue creation, status sync, comments, and closing, shared by both
//! provider backends — git has no concept of issues, so even the clone
//! provider delegates here.

use crate::api::client::ApiClient;
use crate::types::{IssueStatus, IssueStatusMap};
use msg2git_error::{ProviderError, ProviderErrorKind};
use serde_json::json;

/// Create an issue, returning its URL and number.
pub async fn create(client: &ApiClient, title: &str, body: &str) -> Result<(String, u64), ProviderError> {
    let response = client.post("/issues", &json!({ "title": title, "body": body })).await?;
    let number = response["number"]
        .as_u64()
        .ok_or_else(|| ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new("issue response missing number".to_string()))))?;
    let url = response["html_url"].as_str().unwrap_or_default().to_string();
    Ok((url, number))
}

/// Fetch one issue's status via the REST API.
pub async fn get_status(client: &ApiClient, number: u64) -> Result<IssueStatus, ProviderError> {
    let response = client.get(&format!("/issues/{number}")).await?;
    parse_rest_status(&response)
}

fn parse_rest_status(value: &serde_json::Value) -> Result<IssueStatus, ProviderError> {
    Ok(IssueStatus {
        number: value["number"].as_u64().unwrap_or_default(),
        title: value["title"].as_str().unwrap_or_default().to_string(),
        state: value["state"].as_str().unwrap_or_default().to_string(),
        url: value["html_url"].as_str().unwrap_or_default().to_string(),
    })
}

/// Fetch statuses for several issues in one GraphQL round trip. Falling
/// back to N REST calls is not an acceptable substitute — if the batched
/// query fails, the caller gets an error instead of a silent downgrade.
pub async fn sync_statuses(client: &ApiClient, numbers: &[u64]) -> Result<IssueStatusMap, ProviderError> {
    if numbers.is_empty() {
        return Ok(IssueStatusMap::new());
    }
    let aliases: Vec<String> = numbers
        .iter()
        .map(|n| format!("issue{n}: issue(number: {n}) {{ number title state url }}"))
        .collect();
    let query = format!(
        "query {{ repository(owner: \"{}\", name: \"{}\") {{ {} }} }}",
        client.owner,
        client.repo,
        aliases.join(" ")
    );

    let response = client.graphql(&query).await?;
    if let Some(errors) = response.get("errors") {
        return Err(ProviderError::new(ProviderErrorKind::Unexpected(msg2git_error::HttpError::new(format!(
            "graphql issue sync failed: {errors}"
        )))));
    }

    let repository = &response["data"]["repository"];
    let mut out = IssueStatusMap::new();
    for number in numbers {
        let key = format!("issue{number}");
        let node = &repository[&key];
        if node.is_null() {
            continue;
        }
        out.insert(
            *number,
            IssueStatus {
                number: node["number"].as_u64().unwrap_or(*number),
                title: node["title"].as_str().unwrap_or_default().to_string(),
                state: node["state"].as_str().unwrap_or_default().to_ascii_lowercase(),
                url: node["url"].as_str().unwrap_or_default().to_string(),
            },
        );
    }
    Ok(out)
}

/// Add a comment, returning its URL.
pub async fn add_comment(client: &ApiClient, number: u64, text: &str) -> Result<String, ProviderError> {
    let response = client
        .post(&format!("/issues/{number}/comments"), &json!({ "body": text }))
        .await?;
    Ok(response["html_url"].as_str().unwrap_or_default().to_string())
}

/// Close an issue.
pub async fn close(client: &ApiClient, number: u64) -> Result<(), ProviderError> {
    client
        .patch(&format!("/issues/{number}"), &json!({ "state": "closed" }))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_rest_status() {
        let value = json!({ "number": 7, "title": "bug", "state": "open", "html_url": "https://example/7" });
        let status = parse_rest_status(&value).unwrap();
        assert_eq!(status.number, 7);
        assert_eq!(status.state, "open");
    }
}
