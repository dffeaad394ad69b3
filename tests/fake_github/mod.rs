//! Wiremock stand-in for a GitHub repository with three pull requests.
//!
//! - #1: 10 additions, 2 deletions, two conversation comments (one by a bot)
//! - #2: no changes, no comments
//! - #3: 5 additions, 5 deletions, one diff comment by a human

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use prtally::{
    ApiGateway, BackoffPolicy, GitHubPullRequestSource, ListingStrategy, OctocrabTransport,
    RepositoryLocator,
};

pub const OWNER: &str = "octo";
pub const REPO: &str = "widgets";

const REPO_PATH: &str = "/api/v3/repos/octo/widgets";

/// Rows expected for the scenario as `(lines_changed, total, bots)`, by number.
pub const EXPECTED_ROWS: [(u64, u64, u64); 3] = [(12, 2, 1), (0, 0, 0), (10, 1, 0)];

/// Locator pointing at the mock server's REST root.
pub fn locator(server: &MockServer) -> RepositoryLocator {
    let api_base = format!("{}/api/v3", server.uri());
    RepositoryLocator::with_api_base(&api_base, OWNER, REPO)
        .unwrap_or_else(|error| panic!("locator should be valid: {error}"))
}

/// Source talking to the mock server without retry waits.
pub fn source(
    server: &MockServer,
    strategy: ListingStrategy,
) -> GitHubPullRequestSource<OctocrabTransport> {
    let transport = OctocrabTransport::for_locator(None, &locator(server))
        .unwrap_or_else(|error| panic!("transport should build: {error}"));
    let gateway = ApiGateway::new(
        transport,
        BackoffPolicy::without_waits(),
        CancellationToken::new(),
    );
    GitHubPullRequestSource::new(gateway, strategy)
}

fn human() -> Value {
    json!({"login": "octocat", "type": "User"})
}

fn bot() -> Value {
    json!({"login": "ci[bot]", "type": "Bot"})
}

fn issue_comment(number: u64, user: Value) -> Value {
    json!({
        "user": user,
        "issue_url": format!("https://api.github.com/repos/octo/widgets/issues/{number}")
    })
}

fn review_comment(number: u64, user: Value) -> Value {
    json!({
        "user": user,
        "pull_request_url": format!("https://api.github.com/repos/octo/widgets/pulls/{number}"),
        "html_url": format!("https://github.com/octo/widgets/pull/{number}#discussion_r7")
    })
}

fn pull_request(number: u64, additions: u64, deletions: u64, created_at: &str) -> Value {
    json!({
        "number": number,
        "additions": additions,
        "deletions": deletions,
        "created_at": created_at
    })
}

async fn mount_get(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_listing(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"repository": {"pullRequests": {
                "nodes": [
                    {"number": 3, "additions": 5, "deletions": 5, "createdAt": "2024-03-01T00:00:00Z"},
                    {"number": 2, "additions": 0, "deletions": 0, "createdAt": "2024-02-01T00:00:00Z"},
                    {"number": 1, "additions": 10, "deletions": 2, "createdAt": "2024-01-01T00:00:00Z"}
                ],
                "pageInfo": {"hasNextPage": false, "endCursor": "c1"}
            }}}
        })))
        .mount(server)
        .await;

    mount_get(
        server,
        &format!("{REPO_PATH}/pulls"),
        json!([
            {"number": 3, "created_at": "2024-03-01T00:00:00Z"},
            {"number": 2, "created_at": "2024-02-01T00:00:00Z"},
            {"number": 1, "created_at": "2024-01-01T00:00:00Z"}
        ]),
    )
    .await;
    mount_get(
        server,
        &format!("{REPO_PATH}/pulls/1"),
        pull_request(1, 10, 2, "2024-01-01T00:00:00Z"),
    )
    .await;
    mount_get(
        server,
        &format!("{REPO_PATH}/pulls/2"),
        pull_request(2, 0, 0, "2024-02-01T00:00:00Z"),
    )
    .await;
    mount_get(
        server,
        &format!("{REPO_PATH}/pulls/3"),
        pull_request(3, 5, 5, "2024-03-01T00:00:00Z"),
    )
    .await;
}

/// Repository whose comments are served by the repository-wide endpoints.
/// Per pull request comment endpoints must never be called.
pub async fn repository_with_bulk_comments() -> MockServer {
    let server = MockServer::start().await;
    mount_listing(&server).await;

    mount_get(
        &server,
        &format!("{REPO_PATH}/issues/comments"),
        json!([issue_comment(1, bot()), issue_comment(1, human())]),
    )
    .await;
    mount_get(
        &server,
        &format!("{REPO_PATH}/pulls/comments"),
        json!([review_comment(3, human())]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v3/repos/octo/widgets/(issues|pulls)/\d+/comments$"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    server
}

/// Repository whose repository-wide comment endpoints are forbidden, so
/// counts can only come from the per pull request endpoints.
pub async fn repository_without_bulk_comments() -> MockServer {
    let server = MockServer::start().await;
    mount_listing(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{REPO_PATH}/issues/comments").as_str()))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"message": "Resource not accessible by integration"})),
        )
        .mount(&server)
        .await;

    let per_item = [
        (1, json!([issue_comment(1, bot()), issue_comment(1, human())]), json!([])),
        (2, json!([]), json!([])),
        (3, json!([]), json!([review_comment(3, human())])),
    ];
    for (number, issue_comments, review_comments) in per_item {
        mount_get(
            &server,
            &format!("{REPO_PATH}/issues/{number}/comments"),
            issue_comments,
        )
        .await;
        mount_get(
            &server,
            &format!("{REPO_PATH}/pulls/{number}/comments"),
            review_comments,
        )
        .await;
    }

    server
}
