use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};

use quotable::resilience::backoff::BackoffPolicy;

#[derive(Parser)]
#[command(name = "quotable-cli")]
#[command(about = "Command line client for the Quotable API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:4000")]
    url: String,

    /// Bearer token from `login`
    #[arg(short, long, env = "QUOTABLE_TOKEN")]
    token: Option<String>,

    /// Attempts for requests answered with 503
    #[arg(long, default_value_t = 4)]
    attempts: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show server status and version
    Version,
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Exchange credentials for a bearer token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Revoke every token of the signed-in user
    Logout,
    /// List quotes
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        content: Option<String>,
        /// Comma-separated tags that must all be present
        #[arg(long)]
        tags: Option<String>,
        /// Only quotes from this user (requires a token)
        #[arg(long)]
        user: Option<i64>,
    },
    /// Show one quote
    Show { id: i64 },
    /// Create a quote
    Create {
        #[arg(long)]
        content: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        source_title: Option<String>,
        #[arg(long)]
        source_type: Option<String>,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Update a quote you own
    Update {
        id: i64,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
        /// Fail with a conflict unless the stored version matches
        #[arg(long)]
        expected_version: Option<i64>,
    },
    /// Like or dislike a quote; repeating a reaction removes it
    React {
        id: i64,
        #[arg(value_parser = ["like", "dislike"])]
        reaction: String,
    },
}

struct Client {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
    backoff: BackoffPolicy,
}

impl Client {
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send, retrying 503 responses on the backoff schedule.
    async fn send(
        &self,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<reqwest::Response, Box<dyn std::error::Error>> {
        let mut attempt = 1;
        loop {
            let response = build().send().await?;
            if response.status() != StatusCode::SERVICE_UNAVAILABLE {
                return Ok(response);
            }
            match self.backoff.delay(attempt) {
                Some(delay) => {
                    eprintln!("Server unavailable, retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Ok(response),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = Client {
        http: reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?,
        base: cli.url.trim_end_matches('/').to_string(),
        token: cli.token,
        backoff: BackoffPolicy {
            max_attempts: cli.attempts.max(1),
            ..BackoffPolicy::default()
        },
    };

    let response = match cli.command {
        Commands::Version => client.send(|| client.request(Method::GET, "/v1/version")).await?,
        Commands::Register { name, email, password } => {
            let body = json!({ "name": name, "email": email, "password": password });
            client
                .send(|| client.request(Method::POST, "/v1/user/register").json(&body))
                .await?
        }
        Commands::Login { email, password } => {
            let body = json!({ "email": email, "password": password });
            client
                .send(|| client.request(Method::POST, "/v1/tokens/auth").json(&body))
                .await?
        }
        Commands::Logout => {
            client
                .send(|| client.request(Method::DELETE, "/v1/tokens/auth"))
                .await?
        }
        Commands::List { page, page_size, sort, content, tags, user } => {
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(page) = page {
                query.push(("page", page.to_string()));
            }
            if let Some(page_size) = page_size {
                query.push(("page_size", page_size.to_string()));
            }
            if let Some(sort) = sort {
                query.push(("sort", sort));
            }
            if let Some(content) = content {
                query.push(("content", content));
            }
            if let Some(tags) = tags {
                query.push(("tags", tags));
            }
            let path = match user {
                Some(id) => format!("/v1/users/{id}/quotes"),
                None => "/v1/quotes".to_string(),
            };
            client
                .send(|| client.request(Method::GET, &path).query(&query))
                .await?
        }
        Commands::Show { id } => {
            client
                .send(|| client.request(Method::GET, &format!("/v1/quotes/{id}")))
                .await?
        }
        Commands::Create { content, author, source_title, source_type, tags } => {
            let mut body = json!({ "content": content, "author": author, "tags": tags });
            if source_title.is_some() || source_type.is_some() {
                body["source"] = json!({
                    "title": source_title.unwrap_or_default(),
                    "type": source_type.unwrap_or_default(),
                });
            }
            client
                .send(|| client.request(Method::POST, "/v1/quotes").json(&body))
                .await?
        }
        Commands::Update { id, content, author, tags, expected_version } => {
            let mut body = json!({});
            if let Some(content) = content {
                body["content"] = json!(content);
            }
            if let Some(author) = author {
                body["author"] = json!(author);
            }
            if let Some(tags) = tags {
                body["tags"] = json!(tags);
            }
            let path = format!("/v1/quotes/{id}");
            client
                .send(|| {
                    let request = client.request(Method::PATCH, &path).json(&body);
                    match expected_version {
                        Some(version) => request.header("X-Expected-Version", version.to_string()),
                        None => request,
                    }
                })
                .await?
        }
        Commands::React { id, reaction } => {
            let body = json!({ "reaction": reaction });
            let path = format!("/v1/quotes/{id}/reactions");
            client
                .send(|| client.request(Method::POST, &path).json(&body))
                .await?
        }
    };

    print_response(response).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let pretty = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|json| serde_json::to_string_pretty(&json).ok())
        .unwrap_or(text);

    if status.is_success() {
        println!("{pretty}");
    } else {
        eprintln!("Error: API returned status {status}");
        eprintln!("{pretty}");
        std::process::exit(1);
    }
    Ok(())
}
