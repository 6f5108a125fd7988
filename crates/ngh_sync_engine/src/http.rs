//! GitHub REST adapter.
//!
//! This module maps [`RemoteRepository`] onto the GitHub v3 REST API.
//! The actual HTTP client is abstracted via a trait so the engine does not
//! depend on a networking stack and tests can script responses.

use crate::config::Author;
use crate::error::{FieldError, SyncError, SyncResult};
use crate::remote::{RemoteRepository, EMPTY_TREE_HASH};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ngh_core::FileReference;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, warn};

/// Default GitHub API endpoint.
pub const GITHUB_API_URL: &str = "https://api.github.com";

const PAGE_SIZE: usize = 100;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        })
    }
}

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body, possibly empty.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implementations send JSON bodies and carry authentication headers;
/// the adapter only builds URLs and interprets responses. An `Err` means
/// the request could not be performed at all (DNS, TLS, connection).
pub trait HttpClient: Send + Sync {
    /// Performs one request.
    fn execute(&self, method: Method, url: &str, body: Option<&str>) -> Result<HttpResponse, String>;
}

/// A [`RemoteRepository`] backed by the GitHub REST API.
pub struct GithubRemote<C: HttpClient> {
    base_url: String,
    repository: String,
    client: C,
}

#[derive(Deserialize)]
struct RepositoryInfo {
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    default_branch: Option<String>,
}

#[derive(Deserialize)]
struct BranchEntry {
    name: String,
}

#[derive(Deserialize)]
struct ShaOnly {
    sha: String,
}

#[derive(Deserialize)]
struct RefInfo {
    object: ShaOnly,
}

#[derive(Deserialize)]
struct CommitInfo {
    tree: ShaOnly,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    #[serde(default)]
    size: u64,
}

#[derive(Deserialize)]
struct TreeListing {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct BlobInfo {
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<Value>,
}

impl<C: HttpClient> GithubRemote<C> {
    /// Creates an adapter for `repository` (`owner/name`) at `base_url`.
    pub fn new(base_url: impl Into<String>, repository: impl Into<String>, client: C) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            repository: repository.into(),
            client,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/repos/{}{}", self.base_url, self.repository, suffix)
    }

    fn send(&self, method: Method, suffix: &str, body: Option<Value>) -> SyncResult<HttpResponse> {
        let url = self.url(suffix);
        let body = body.map(|b| b.to_string());
        debug!(%method, %url, "github request");
        let response = self
            .client
            .execute(method, &url, body.as_deref())
            .map_err(SyncError::Transport)?;
        debug!(status = response.status, "github response");
        Ok(response)
    }

    fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        suffix: &str,
        body: Option<Value>,
    ) -> SyncResult<T> {
        let response = self.send(method, suffix, body)?;
        if !response.is_success() {
            return Err(api_error(&response));
        }
        parse(&response)
    }

    fn request_empty(&self, method: Method, suffix: &str, body: Option<Value>) -> SyncResult<()> {
        let response = self.send(method, suffix, body)?;
        if !response.is_success() {
            return Err(api_error(&response));
        }
        Ok(())
    }

    /// Lists `tree` one level at a time, prefixing paths with `prefix`.
    fn walk_tree(&self, tree: &str, prefix: &str, out: &mut Vec<FileReference>) -> SyncResult<()> {
        let listing: TreeListing =
            self.request(Method::Get, &format!("/git/trees/{tree}"), None)?;
        if listing.truncated {
            return Err(SyncError::Protocol(format!(
                "listing of tree {tree} was truncated by the provider"
            )));
        }
        for entry in listing.tree {
            let path = if prefix.is_empty() {
                entry.path
            } else {
                format!("{prefix}/{}", entry.path)
            };
            match entry.kind.as_str() {
                "blob" => out.push(FileReference::new(path, entry.sha, entry.size)),
                "tree" => self.walk_tree(&entry.sha, &path, out)?,
                // Submodules.
                _ => {}
            }
        }
        Ok(())
    }
}

fn parse<T: DeserializeOwned>(response: &HttpResponse) -> SyncResult<T> {
    serde_json::from_str(&response.body).map_err(|e| SyncError::Protocol(e.to_string()))
}

/// Builds a [`SyncError::RemoteApi`] from a non-success response.
fn api_error(response: &HttpResponse) -> SyncError {
    let body: ErrorBody = serde_json::from_str(&response.body).unwrap_or_default();
    let errors = body
        .errors
        .iter()
        .map(|entry| match entry {
            Value::Object(map) => FieldError::from_pairs(map.iter().map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })),
            Value::String(s) => FieldError::from_pairs([("message", s.clone())]),
            other => FieldError::from_pairs([("message", other.to_string())]),
        })
        .collect();

    SyncError::RemoteApi {
        status: response.status,
        message: body.message.unwrap_or_else(|| "(no message)".to_string()),
        errors,
    }
}

/// Percent-encodes a repository path for use in a URL, keeping slashes.
fn encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

fn author_json(author: &Author) -> Value {
    json!({ "name": author.name, "email": author.email })
}

impl<C: HttpClient> RemoteRepository for GithubRemote<C> {
    fn name(&self) -> &str {
        &self.repository
    }

    fn repository_exists(&self) -> SyncResult<bool> {
        let response = self.send(Method::Get, "", None)?;
        match response.status {
            404 => Ok(false),
            _ if response.is_success() => Ok(true),
            _ => Err(api_error(&response)),
        }
    }

    fn full_name(&self) -> SyncResult<Option<String>> {
        let response = self.send(Method::Get, "", None)?;
        match response.status {
            404 => Ok(None),
            _ if response.is_success() => {
                let info: RepositoryInfo = parse(&response)?;
                Ok(Some(info.full_name.unwrap_or_else(|| self.repository.clone())))
            }
            _ => Err(api_error(&response)),
        }
    }

    fn default_branch(&self) -> SyncResult<String> {
        let info: RepositoryInfo = self.request(Method::Get, "", None)?;
        info.default_branch
            .ok_or_else(|| SyncError::Protocol("repository has no default_branch".to_string()))
    }

    // Only the part after the slash is sent; the provider picks the owner.
    fn create_repository(&self, description: &str, private: bool) -> SyncResult<String> {
        let name = self
            .repository
            .rsplit('/')
            .next()
            .unwrap_or(self.repository.as_str());
        let url = format!("{}/user/repos", self.base_url);
        let body = json!({ "name": name, "description": description, "private": private });
        debug!(method = %Method::Post, %url, "github request");
        let response = self
            .client
            .execute(Method::Post, &url, Some(&body.to_string()))
            .map_err(SyncError::Transport)?;
        if !response.is_success() {
            return Err(api_error(&response));
        }
        let created: RepositoryInfo = parse(&response)?;
        Ok(created.full_name.unwrap_or_else(|| self.repository.clone()))
    }

    fn delete_repository(&self) -> SyncResult<()> {
        self.request_empty(Method::Delete, "", None)
    }

    fn list_branches(&self) -> SyncResult<Vec<String>> {
        let mut names = Vec::new();
        for page in 1.. {
            let response = self.send(
                Method::Get,
                &format!("/branches?per_page={PAGE_SIZE}&page={page}"),
                None,
            )?;
            if response.status == 409 {
                // "Git Repository is empty."
                return Ok(names);
            }
            if !response.is_success() {
                return Err(api_error(&response));
            }
            let branches: Vec<BranchEntry> = parse(&response)?;
            let count = branches.len();
            names.extend(branches.into_iter().map(|b| b.name));
            if count < PAGE_SIZE {
                break;
            }
        }
        Ok(names)
    }

    fn branch_head(&self, branch: &str) -> SyncResult<Option<String>> {
        let response = self.send(
            Method::Get,
            &format!("/git/ref/heads/{}", encode_path(branch)),
            None,
        )?;
        match response.status {
            404 | 409 => Ok(None),
            _ if response.is_success() => {
                let info: RefInfo = parse(&response)?;
                Ok(Some(info.object.sha))
            }
            _ => Err(api_error(&response)),
        }
    }

    fn set_branch_head(&self, branch: &str, commit: &str, force: bool) -> SyncResult<()> {
        self.request_empty(
            Method::Patch,
            &format!("/git/refs/heads/{}", encode_path(branch)),
            Some(json!({ "sha": commit, "force": force })),
        )
    }

    fn create_branch(&self, branch: &str, commit: &str) -> SyncResult<()> {
        self.request_empty(
            Method::Post,
            "/git/refs",
            Some(json!({ "ref": format!("refs/heads/{branch}"), "sha": commit })),
        )
    }

    fn delete_branch(&self, branch: &str) -> SyncResult<()> {
        self.request_empty(
            Method::Delete,
            &format!("/git/refs/heads/{}", encode_path(branch)),
            None,
        )
    }

    fn commit_tree(&self, commit: &str) -> SyncResult<Option<String>> {
        let response = self.send(Method::Get, &format!("/git/commits/{commit}"), None)?;
        match response.status {
            404 | 422 => Ok(None),
            _ if response.is_success() => {
                let info: CommitInfo = parse(&response)?;
                Ok(Some(info.tree.sha))
            }
            _ => Err(api_error(&response)),
        }
    }

    fn tree_files(&self, tree: &str, recursive: bool) -> SyncResult<Vec<FileReference>> {
        let suffix = if recursive {
            format!("/git/trees/{tree}?recursive=1")
        } else {
            format!("/git/trees/{tree}")
        };
        let listing: TreeListing = self.request(Method::Get, &suffix, None)?;
        if !listing.truncated {
            return Ok(listing
                .tree
                .into_iter()
                .filter(|entry| entry.kind == "blob")
                .map(|entry| FileReference::new(entry.path, entry.sha, entry.size))
                .collect());
        }
        if !recursive {
            return Err(SyncError::Protocol(format!(
                "listing of tree {tree} was truncated by the provider"
            )));
        }

        warn!(tree, "recursive listing truncated, walking subtrees one by one");
        let mut files = Vec::new();
        self.walk_tree(tree, "", &mut files)?;
        Ok(files)
    }

    fn get_blob(&self, hash: &str) -> SyncResult<Vec<u8>> {
        let blob: BlobInfo = self.request(Method::Get, &format!("/git/blobs/{hash}"), None)?;
        if blob.encoding != "base64" {
            return Ok(blob.content.into_bytes());
        }
        let compact: String = blob.content.split_whitespace().collect();
        STANDARD
            .decode(compact)
            .map_err(|e| SyncError::Protocol(format!("invalid base64 in blob {hash}: {e}")))
    }

    fn create_blob(&self, data: &[u8]) -> SyncResult<String> {
        let created: ShaOnly = self.request(
            Method::Post,
            "/git/blobs",
            Some(json!({ "content": STANDARD.encode(data), "encoding": "base64" })),
        )?;
        Ok(created.sha)
    }

    fn create_tree(&self, files: &[FileReference]) -> SyncResult<String> {
        if files.is_empty() {
            return Ok(EMPTY_TREE_HASH.to_string());
        }
        let entries: Vec<Value> = files
            .iter()
            .map(|f| json!({ "path": f.path, "mode": "100644", "type": "blob", "sha": f.blob_hash }))
            .collect();
        let created: ShaOnly =
            self.request(Method::Post, "/git/trees", Some(json!({ "tree": entries })))?;
        Ok(created.sha)
    }

    fn create_commit(
        &self,
        message: &str,
        tree: &str,
        parent: Option<&str>,
        author: Option<&Author>,
    ) -> SyncResult<String> {
        let mut body = json!({
            "message": message,
            "tree": tree,
            "parents": parent.into_iter().collect::<Vec<_>>(),
        });
        if let (Some(author), Value::Object(map)) = (author, &mut body) {
            map.insert("author".to_string(), author_json(author));
        }
        let created: ShaOnly = self.request(Method::Post, "/git/commits", Some(body))?;
        Ok(created.sha)
    }

    fn create_file(&self, path: &str, branch: &str, message: &str, data: &[u8]) -> SyncResult<()> {
        self.request_empty(
            Method::Put,
            &format!("/contents/{}", encode_path(path)),
            Some(json!({
                "message": message,
                "content": STANDARD.encode(data),
                "branch": branch,
            })),
        )
    }

    fn merge_branches(&self, source: &str, base: &str, message: &str) -> SyncResult<()> {
        self.request_empty(
            Method::Post,
            "/merges",
            Some(json!({ "base": base, "head": source, "commit_message": message })),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Answers from a table keyed by method and URL, recording requests.
    #[derive(Default)]
    struct ScriptedClient {
        responses: HashMap<(Method, String), HttpResponse>,
        requests: Mutex<Vec<(Method, String, Option<String>)>>,
    }

    impl ScriptedClient {
        fn respond(mut self, method: Method, url: &str, status: u16, body: &str) -> Self {
            self.responses
                .insert((method, url.to_string()), HttpResponse::new(status, body));
            self
        }

        fn last_body(&self) -> Value {
            let requests = self.requests.lock();
            let body = requests.last().and_then(|r| r.2.clone()).unwrap();
            serde_json::from_str(&body).unwrap()
        }
    }

    impl HttpClient for ScriptedClient {
        fn execute(
            &self,
            method: Method,
            url: &str,
            body: Option<&str>,
        ) -> Result<HttpResponse, String> {
            self.requests
                .lock()
                .push((method, url.to_string(), body.map(str::to_string)));
            self.responses
                .get(&(method, url.to_string()))
                .cloned()
                .ok_or_else(|| format!("no route for {method} {url}"))
        }
    }

    const REPO: &str = "https://api.github.com/repos/octo/demo";

    fn remote(client: ScriptedClient) -> GithubRemote<ScriptedClient> {
        GithubRemote::new("https://api.github.com/", "octo/demo", client)
    }

    #[test]
    fn repository_existence() {
        let found = remote(ScriptedClient::default().respond(
            Method::Get,
            REPO,
            200,
            r#"{"default_branch":"main"}"#,
        ));
        assert!(found.repository_exists().unwrap());
        assert_eq!(found.default_branch().unwrap(), "main");

        let missing = remote(ScriptedClient::default().respond(
            Method::Get,
            REPO,
            404,
            r#"{"message":"Not Found"}"#,
        ));
        assert!(!missing.repository_exists().unwrap());
    }

    #[test]
    fn branch_head_lookup() {
        let client = ScriptedClient::default()
            .respond(
                Method::Get,
                &format!("{REPO}/git/ref/heads/main"),
                200,
                r#"{"ref":"refs/heads/main","object":{"sha":"abc","type":"commit"}}"#,
            )
            .respond(
                Method::Get,
                &format!("{REPO}/git/ref/heads/gone"),
                404,
                r#"{"message":"Not Found"}"#,
            )
            .respond(
                Method::Get,
                &format!("{REPO}/git/ref/heads/empty"),
                409,
                r#"{"message":"Git Repository is empty."}"#,
            );
        let remote = remote(client);
        assert_eq!(remote.branch_head("main").unwrap(), Some("abc".to_string()));
        assert_eq!(remote.branch_head("gone").unwrap(), None);
        assert_eq!(remote.branch_head("empty").unwrap(), None);
    }

    #[test]
    fn branches_are_paginated() {
        let page1: Vec<Value> = (0..PAGE_SIZE)
            .map(|i| json!({ "name": format!("b{i:03}") }))
            .collect();
        let client = ScriptedClient::default()
            .respond(
                Method::Get,
                &format!("{REPO}/branches?per_page=100&page=1"),
                200,
                &Value::Array(page1).to_string(),
            )
            .respond(
                Method::Get,
                &format!("{REPO}/branches?per_page=100&page=2"),
                200,
                r#"[{"name":"zeta"}]"#,
            );
        let branches = remote(client).list_branches().unwrap();
        assert_eq!(branches.len(), PAGE_SIZE + 1);
        assert_eq!(branches.last().map(String::as_str), Some("zeta"));
    }

    #[test]
    fn tree_listing_skips_subtrees() {
        let client = ScriptedClient::default().respond(
            Method::Get,
            &format!("{REPO}/git/trees/t1?recursive=1"),
            200,
            r#"{"sha":"t1","tree":[
                {"path":"docs","type":"tree","sha":"t2"},
                {"path":"docs/a.md","type":"blob","sha":"b1","size":5},
                {"path":"my file.txt","type":"blob","sha":"b2","size":0}
            ],"truncated":false}"#,
        );
        let files = remote(client).tree_files("t1", true).unwrap();
        assert_eq!(
            files,
            vec![
                FileReference::new("docs/a.md", "b1", 5),
                FileReference::new("my file.txt", "b2", 0),
            ]
        );
    }

    #[test]
    fn truncated_listing_is_walked_level_by_level() {
        let client = ScriptedClient::default()
            .respond(
                Method::Get,
                &format!("{REPO}/git/trees/t1?recursive=1"),
                200,
                r#"{"sha":"t1","tree":[
                    {"path":"top.txt","type":"blob","sha":"b0","size":1}
                ],"truncated":true}"#,
            )
            .respond(
                Method::Get,
                &format!("{REPO}/git/trees/t1"),
                200,
                r#"{"sha":"t1","tree":[
                    {"path":"docs","type":"tree","sha":"t2"},
                    {"path":"lib","type":"commit","sha":"c9"},
                    {"path":"top.txt","type":"blob","sha":"b0","size":1}
                ],"truncated":false}"#,
            )
            .respond(
                Method::Get,
                &format!("{REPO}/git/trees/t2"),
                200,
                r#"{"sha":"t2","tree":[
                    {"path":"a.md","type":"blob","sha":"b1","size":5}
                ],"truncated":false}"#,
            );
        let files = remote(client).tree_files("t1", true).unwrap();
        assert_eq!(
            files,
            vec![
                FileReference::new("docs/a.md", "b1", 5),
                FileReference::new("top.txt", "b0", 1),
            ]
        );
    }

    #[test]
    fn truncated_level_is_an_error() {
        let client = ScriptedClient::default()
            .respond(
                Method::Get,
                &format!("{REPO}/git/trees/t1?recursive=1"),
                200,
                r#"{"sha":"t1","tree":[],"truncated":true}"#,
            )
            .respond(
                Method::Get,
                &format!("{REPO}/git/trees/t1"),
                200,
                r#"{"sha":"t1","tree":[
                    {"path":"only.txt","type":"blob","sha":"b0","size":1}
                ],"truncated":true}"#,
            );
        let remote = remote(client);
        assert!(matches!(
            remote.tree_files("t1", true),
            Err(SyncError::Protocol(_))
        ));
        assert!(matches!(
            remote.tree_files("t1", false),
            Err(SyncError::Protocol(_))
        ));
    }

    #[test]
    fn repository_administration() {
        let client = ScriptedClient::default()
            .respond(
                Method::Post,
                "https://api.github.com/user/repos",
                201,
                r#"{"full_name":"Octo/Demo","default_branch":"main"}"#,
            )
            .respond(Method::Delete, REPO, 204, "")
            .respond(Method::Get, REPO, 200, r#"{"full_name":"Octo/Demo"}"#);
        let remote = remote(client);

        assert_eq!(remote.create_repository("notes", true).unwrap(), "Octo/Demo");
        let body = remote.client.last_body();
        assert_eq!(body["name"], "demo");
        assert_eq!(body["description"], "notes");
        assert_eq!(body["private"], true);

        assert_eq!(remote.full_name().unwrap().as_deref(), Some("Octo/Demo"));
        remote.delete_repository().unwrap();
    }

    #[test]
    fn blobs_travel_as_base64() {
        let client = ScriptedClient::default()
            .respond(
                Method::Get,
                &format!("{REPO}/git/blobs/b1"),
                200,
                r#"{"content":"aGVs\nbG8=\n","encoding":"base64"}"#,
            )
            .respond(Method::Post, &format!("{REPO}/git/blobs"), 201, r#"{"sha":"b2"}"#);
        let remote = remote(client);
        assert_eq!(remote.get_blob("b1").unwrap(), b"hello");

        assert_eq!(remote.create_blob(&[0, 255]).unwrap(), "b2");
        let body = remote.client.last_body();
        assert_eq!(body["encoding"], "base64");
        assert_eq!(body["content"], "AP8=");
    }

    #[test]
    fn commit_carries_parent_and_author() {
        let client = ScriptedClient::default().respond(
            Method::Post,
            &format!("{REPO}/git/commits"),
            201,
            r#"{"sha":"c2"}"#,
        );
        let remote = remote(client);
        let author = Author::new("Ada", "ada@example.com");
        let sha = remote
            .create_commit("msg", "t1", Some("c1"), Some(&author))
            .unwrap();
        assert_eq!(sha, "c2");

        let body = remote.client.last_body();
        assert_eq!(body["parents"], json!(["c1"]));
        assert_eq!(body["author"]["email"], "ada@example.com");
    }

    #[test]
    fn empty_tree_needs_no_request() {
        let remote = remote(ScriptedClient::default());
        assert_eq!(remote.create_tree(&[]).unwrap(), EMPTY_TREE_HASH);
        assert!(remote.client.requests.lock().is_empty());
    }

    #[test]
    fn error_responses_carry_field_errors() {
        let client = ScriptedClient::default().respond(
            Method::Patch,
            &format!("{REPO}/git/refs/heads/main"),
            422,
            r#"{"message":"Update is not a fast forward","errors":[{"resource":"Reference","field":"sha","code":"invalid"}]}"#,
        );
        let err = remote(client)
            .set_branch_head("main", "c9", false)
            .unwrap_err();
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.to_string(), "422 Update is not a fast forward");
        assert_eq!(
            err.field_errors()[0].entries.get("field").map(String::as_str),
            Some("sha")
        );
    }

    #[test]
    fn transport_failures() {
        let err = remote(ScriptedClient::default())
            .default_branch()
            .unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
    }

    #[test]
    fn paths_are_percent_encoded() {
        assert_eq!(encode_path("docs/my file.md"), "docs/my%20file.md");
        assert_eq!(encode_path("a+b"), "a%2Bb");
    }
}
