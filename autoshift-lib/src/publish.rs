//! Publishing the record file to a remote repository.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;

use crate::error::PublishError;

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("autoshift/", env!("CARGO_PKG_VERSION"));

/// What a publish did on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The file did not exist on the branch and was added.
    Created,
    /// The file existed and its content was replaced.
    Updated,
    /// The repository was empty; its first commit now holds the file.
    Bootstrapped,
    /// The remote already had identical content.
    Unchanged,
}

impl std::fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
            Self::Bootstrapped => write!(f, "bootstrapped"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// A remote that can store one named file.
pub trait RepositoryClient {
    /// Create or update `name` with `content` on the default branch.
    fn publish(&self, name: &str, content: &str, message: &str)
    -> Result<PublishOutcome, PublishError>;

    /// Human-readable target, e.g. `owner/repo`.
    fn describe(&self) -> String;
}

/// Owner, repository and token for a GitHub target.
#[derive(Clone, PartialEq, Eq)]
pub struct GithubRepo {
    pub owner: String,
    pub repo: String,
    pub token: String,
}

impl std::fmt::Debug for GithubRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubRepo")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("token", &"***")
            .finish()
    }
}

/// GitHub REST client for the contents and git-data APIs.
pub struct GithubClient {
    client: Client,
    api_base: String,
    target: GithubRepo,
}

#[derive(Deserialize)]
struct RepoInfo {
    default_branch: Option<String>,
}

#[derive(Deserialize)]
struct ContentInfo {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ShaOnly {
    sha: String,
}

impl GithubClient {
    pub fn new(target: GithubRepo) -> Result<Self, PublishError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_base: API_BASE.to_string(),
            target,
        })
    }

    /// Point at a different API root (GitHub Enterprise).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.api_base, self.target.owner, self.target.repo, path
        )
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.target.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    fn get(&self, path: &str) -> Result<Response, PublishError> {
        Ok(self.authed(self.client.get(self.url(path))).send()?)
    }

    fn send_json(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        body: serde_json::Value,
    ) -> Result<Response, PublishError> {
        let response = self.authed(request).json(&body).send()?;
        check(operation, response)
    }

    fn default_branch(&self) -> Result<String, PublishError> {
        let response = check("repository lookup", self.get("")?)?;
        let info: RepoInfo = response.json()?;
        Ok(info
            .default_branch
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| "main".to_string()))
    }

    /// An empty repository has no branches; some report that as 404 or 409.
    fn is_empty(&self) -> Result<bool, PublishError> {
        let response = self.get("/branches?per_page=1")?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::CONFLICT => Ok(true),
            _ => {
                let branches: Vec<serde_json::Value> = check("branch listing", response)?.json()?;
                Ok(branches.is_empty())
            }
        }
    }

    fn existing_file(&self, name: &str, branch: &str) -> Result<Option<ContentInfo>, PublishError> {
        let response = self.get(&format!("/contents/{name}?ref={branch}"))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check("content lookup", response)?.json()?))
    }

    fn put_contents(
        &self,
        name: &str,
        content: &str,
        message: &str,
        branch: &str,
        sha: Option<&str>,
    ) -> Result<(), PublishError> {
        let mut body = json!({
            "message": message,
            "content": BASE64.encode(content),
            "branch": branch,
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }
        let request = self.client.put(self.url(&format!("/contents/{name}")));
        self.send_json("content upload", request, body)?;
        Ok(())
    }

    /// blob, tree, parentless commit, then the branch ref.
    fn bootstrap_git_data(
        &self,
        name: &str,
        content: &str,
        message: &str,
        branch: &str,
    ) -> Result<(), PublishError> {
        let post = |path: &str| self.client.post(self.url(path));

        let blob: ShaOnly = self
            .send_json(
                "blob creation",
                post("/git/blobs"),
                json!({ "content": content, "encoding": "utf-8" }),
            )?
            .json()?;
        let tree: ShaOnly = self
            .send_json(
                "tree creation",
                post("/git/trees"),
                json!({ "tree": [{ "path": name, "mode": "100644", "type": "blob", "sha": blob.sha }] }),
            )?
            .json()?;
        let commit: ShaOnly = self
            .send_json(
                "commit creation",
                post("/git/commits"),
                json!({ "message": message, "tree": tree.sha, "parents": [] }),
            )?
            .json()?;
        self.send_json(
            "ref creation",
            post("/git/refs"),
            json!({ "ref": format!("refs/heads/{branch}"), "sha": commit.sha }),
        )?;
        Ok(())
    }
}

impl RepositoryClient for GithubClient {
    fn publish(
        &self,
        name: &str,
        content: &str,
        message: &str,
    ) -> Result<PublishOutcome, PublishError> {
        let branch = self.default_branch()?;

        if self.is_empty()? {
            return match self.put_contents(name, content, message, &branch, None) {
                Ok(()) => Ok(PublishOutcome::Bootstrapped),
                Err(e @ PublishError::Permission { .. }) => Err(e),
                Err(e) => {
                    log::debug!("Contents API could not bootstrap the repository ({e}), using git data API");
                    self.bootstrap_git_data(name, content, message, &branch)?;
                    Ok(PublishOutcome::Bootstrapped)
                }
            };
        }

        match self.existing_file(name, &branch)? {
            Some(existing) if decode_content(&existing.content).as_deref() == Some(content) => {
                Ok(PublishOutcome::Unchanged)
            }
            Some(existing) => {
                self.put_contents(name, content, message, &branch, Some(&existing.sha))?;
                Ok(PublishOutcome::Updated)
            }
            None => {
                self.put_contents(name, content, message, &branch, None)?;
                Ok(PublishOutcome::Created)
            }
        }
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.target.owner, self.target.repo)
    }
}

/// Turn a non-success response into the matching error.
fn check(operation: &'static str, response: Response) -> Result<Response, PublishError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .ok()
        .and_then(|body| {
            serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .or(Some(body))
        })
        .unwrap_or_default();
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        Err(PublishError::Permission {
            status: status.as_u16(),
            message,
        })
    } else {
        Err(PublishError::Api {
            operation,
            status: status.as_u16(),
            message,
        })
    }
}

/// GitHub returns file content base64-encoded with embedded newlines.
fn decode_content(encoded: &str) -> Option<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64.decode(compact).ok()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wrapped_content() {
        let encoded = BASE64.encode("[\n  {}\n]\n");
        let (a, b) = encoded.split_at(4);
        assert_eq!(decode_content(&format!("{a}\n{b}\n")).as_deref(), Some("[\n  {}\n]\n"));
        assert_eq!(decode_content("!!!"), None);
    }

    #[test]
    fn permission_error_carries_hint() {
        let err = PublishError::Permission {
            status: 403,
            message: "Resource not accessible by personal access token".into(),
        };
        assert!(err.to_string().contains("Contents: Read and write"));
    }

    #[test]
    fn describe_names_the_repository() {
        let client = GithubClient::new(GithubRepo {
            owner: "octo".into(),
            repo: "codes".into(),
            token: "secret".into(),
        })
        .unwrap()
        .with_api_base("http://localhost:9/");
        assert_eq!(client.describe(), "octo/codes");
        assert_eq!(client.url("/branches"), "http://localhost:9/repos/octo/codes/branches");
    }
}
