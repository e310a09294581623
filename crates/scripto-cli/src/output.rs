//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)
//!
//! Action results are reported as one-line toasts; view-level fetch and
//! stream failures as banners on stderr.

use serde::Serialize;

use scripto_core::vote::VoteState;
use scripto_core::{Analytics, ApiError, CatalogItem, ChangeRequest, TagColor, ViewState};

const RESET: &str = "\x1b[0m";

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
    /// Color tags with ANSI escapes
    color: bool,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        let color = format == OutputFormat::Human && atty::is(atty::Stream::Stdout);
        Self { format, color }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single script with its content
    pub fn print_item(&self, item: &CatalogItem) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", item.id);
                println!("Title:       {}", item.title);
                if !item.filename.is_empty() {
                    println!("File:        {}", item.filename);
                }
                println!("Language:    {}", item.language);
                println!("Category:    {}", item.category);
                if !item.tag_list().is_empty() {
                    println!("Tags:        {}", self.format_tags(&item.tag_list()));
                }
                if let Some(uploaded) = item.upload_time {
                    println!("Uploaded:    {}", uploaded.format("%Y-%m-%d %H:%M"));
                }
                if !item.description.is_empty() {
                    println!();
                    println!("{}", item.description);
                }
                if !item.how_it_works.is_empty() {
                    println!();
                    println!("── How it works ──");
                    println!("{}", item.how_it_works);
                }
                if !item.script_content.is_empty() {
                    println!();
                    println!("── Script ──");
                    println!("{}", item.script_content);
                }
            }
            OutputFormat::Json => print_json(item),
            OutputFormat::Quiet => println!("{}", item.id),
        }
    }

    /// Print a list of scripts
    pub fn print_items(&self, items: &[CatalogItem], empty_message: &str) {
        match self.format {
            OutputFormat::Human => {
                if items.is_empty() {
                    println!("{}", empty_message);
                    return;
                }
                for item in items {
                    println!(
                        "{} | {} | {} | {}",
                        short_id(&item.id),
                        truncate(&item.title, 35),
                        truncate(&item.language, 12),
                        self.format_tags(&item.tag_list())
                    );
                }
                println!("\n{} script(s)", items.len());
            }
            OutputFormat::Json => print_json(&items),
            OutputFormat::Quiet => {
                for item in items {
                    println!("{}", item.id);
                }
            }
        }
    }

    /// Print a catalog view in whatever state it is in
    pub fn print_catalog(&self, state: &ViewState<CatalogItem>, empty_message: &str) {
        match state {
            ViewState::Loading => self.message("Loading..."),
            ViewState::Error(message) => self.banner(message),
            ViewState::Ready(items) => self.print_items(items, empty_message),
        }
    }

    /// Print change requests
    pub fn print_requests(&self, state: &ViewState<ChangeRequest>) {
        let requests = match state {
            ViewState::Loading => return self.message("Loading..."),
            ViewState::Error(message) => return self.banner(message),
            ViewState::Ready(requests) => requests,
        };

        match self.format {
            OutputFormat::Human => {
                if requests.is_empty() {
                    println!("No open script requests.");
                    return;
                }
                for request in requests {
                    let status = if request.is_fulfilled { "fulfilled" } else { "open" };
                    println!(
                        "{} | {} | {} | {}",
                        short_id(&request.id),
                        truncate(&request.title, 35),
                        request.language.as_deref().unwrap_or("-"),
                        status
                    );
                    if !request.description.is_empty() {
                        println!("         {}", truncate_line(&request.description, 70));
                    }
                    if !request.tag_list().is_empty() {
                        println!("         {}", self.format_tags(&request.tag_list()));
                    }
                }
                println!("\n{} request(s)", requests.len());
            }
            OutputFormat::Json => print_json(requests),
            OutputFormat::Quiet => {
                for request in requests {
                    println!("{}", request.id);
                }
            }
        }
    }

    /// Print a list of tags
    pub fn print_tags(&self, tags: &[String]) {
        match self.format {
            OutputFormat::Human => {
                if tags.is_empty() {
                    println!("No tags found.");
                    return;
                }
                for tag in tags {
                    println!("{}", self.format_tag(tag));
                }
                println!("\n{} tag(s)", tags.len());
            }
            OutputFormat::Json => print_json(&tags),
            OutputFormat::Quiet => {
                for tag in tags {
                    println!("{}", tag);
                }
            }
        }
    }

    /// Print a script's vote counters and the viewer's vote
    pub fn print_votes(&self, script_id: &str, state: &VoteState) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "{}  👍 {}  👎 {}  ({:?})",
                    short_id(script_id),
                    state.like_count,
                    state.dislike_count,
                    state.status
                );
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "script_id": script_id,
                        "status": format!("{:?}", state.status).to_lowercase(),
                        "like_count": state.like_count,
                        "dislike_count": state.dislike_count
                    })
                );
            }
            OutputFormat::Quiet => {
                println!("{} {}", state.like_count, state.dislike_count);
            }
        }
    }

    pub fn print_analytics(&self, analytics: &Analytics) {
        match self.format {
            OutputFormat::Human => {
                println!("Scripto Statistics");
                println!("==================");
                println!();
                println!("  Scripts:        {}", analytics.total_scripts);
                println!("  Likes:          {}", analytics.total_likes);
                println!("  Recent uploads: {} (last 24h)", analytics.recent_uploads);
                println!("  Trending:       {}", analytics.trending_scripts);
                if let Some(ref top) = analytics.most_liked_script {
                    println!();
                    println!("Most liked: {} ({})", top.title, short_id(&top.id));
                }
            }
            OutputFormat::Json => print_json(analytics),
            OutputFormat::Quiet => println!("{}", analytics.total_scripts),
        }
    }

    /// Print a success toast
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a failure toast for an action that did not go through
    pub fn failure(&self, message: &str) {
        match self.format {
            OutputFormat::Human => eprintln!("✗ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "error", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a failure toast for a request the server did not accept
    pub fn api_failure(&self, error: &ApiError) {
        match self.format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "error",
                        "message": error.message(),
                        "http_status": error.status(),
                        "transient": error.is_transient()
                    })
                );
            }
            _ => self.failure(&failure_text(error)),
        }
    }

    /// Print a persistent error banner (fetch or stream failure)
    pub fn banner(&self, message: &str) {
        match self.format {
            OutputFormat::Human => eprintln!("! {}", message),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"status": "error", "banner": message}));
            }
            OutputFormat::Quiet => eprintln!("{}", message),
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }

    fn format_tag(&self, tag: &str) -> String {
        if self.color {
            format!("{}{}{}", TagColor::for_tag(tag).ansi(), tag, RESET)
        } else {
            tag.to_string()
        }
    }

    fn format_tags(&self, tags: &[&str]) -> String {
        tags.iter()
            .map(|t| self.format_tag(t))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// API error message, with a retry hint when the failure looks temporary
fn failure_text(error: &ApiError) -> String {
    if error.is_transient() {
        format!("{} (try again later)", error.message())
    } else {
        error.message()
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// First eight characters of an id
fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}
