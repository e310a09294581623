//! Search command handlers
//!
//! One-shot search from flags, or an interactive session where each input
//! line edits the query and the debouncer decides when to hit the server.

use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use scripto_core::{ApiClient, CatalogView, SearchDebouncer, SearchField, SearchQuery};

use crate::output::Output;

/// Run a single search; an empty query lists everything
pub async fn run(api: &ApiClient, query: SearchQuery, output: &Output) -> Result<()> {
    let mut view = CatalogView::new();
    view.search(api, &query).await;
    output.print_catalog(view.state(), view.empty_message());
    Ok(())
}

/// One line of interactive input
#[derive(Debug, Clone, PartialEq, Eq)]
enum InputLine {
    /// `field=value`
    Assign(SearchField, String),
    /// Bare text searches titles
    Title(String),
    /// `:clear` resets every field
    Clear,
    /// `:quit` or `:q`
    Quit,
    /// Nothing to do (blank line or bad input, with a message)
    Ignore(Option<String>),
}

fn parse_line(line: &str) -> InputLine {
    let trimmed = line.trim();
    match trimmed {
        "" => InputLine::Ignore(None),
        ":clear" | ":c" => InputLine::Clear,
        ":quit" | ":q" => InputLine::Quit,
        _ => match trimmed.split_once('=') {
            Some((field, value)) => match field.parse::<SearchField>() {
                Ok(field) => InputLine::Assign(field, value.to_string()),
                Err(e) => InputLine::Ignore(Some(e)),
            },
            None => InputLine::Title(trimmed.to_string()),
        },
    }
}

/// Interactive debounced search on stdin
pub async fn interactive(
    api: &ApiClient,
    initial: SearchQuery,
    delay: Duration,
    output: &Output,
) -> Result<()> {
    output.message("Type to search titles, or field=value (title, language, tags, category).");
    output.message(":clear resets the search, :quit exits.");

    let (mut debouncer, mut dispatched) = SearchDebouncer::new(delay);
    let mut view = CatalogView::new();
    let mut query = initial;

    view.search(api, &query).await;
    output.print_catalog(view.state(), view.empty_message());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_line(&line) {
                    InputLine::Assign(field, value) => {
                        query.set(field, value);
                        debouncer.update(query.clone());
                    }
                    InputLine::Title(title) => {
                        query.set(SearchField::Title, title);
                        debouncer.update(query.clone());
                    }
                    InputLine::Clear => {
                        query = SearchQuery::new();
                        debouncer.clear().await;
                    }
                    InputLine::Quit => {
                        debouncer.cancel();
                        return Ok(());
                    }
                    InputLine::Ignore(Some(message)) => output.failure(&message),
                    InputLine::Ignore(None) => {}
                }
            }

            Some(next) = dispatched.recv() => {
                output.message("Searching...");
                view.search(api, &next).await;
                output.print_catalog(view.state(), view.empty_message());
            }
        }
    }

    // Input ended; let a pending search finish before exiting
    if debouncer.pending().is_some() {
        if let Some(next) = dispatched.recv().await {
            view.search(api, &next).await;
            output.print_catalog(view.state(), view.empty_message());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_line("language=rust"),
            InputLine::Assign(SearchField::Language, "rust".to_string())
        );
        assert_eq!(
            parse_line("tags="),
            InputLine::Assign(SearchField::Tags, String::new())
        );
    }

    #[test]
    fn test_parse_bare_title() {
        assert_eq!(
            parse_line("  merge sort "),
            InputLine::Title("merge sort".to_string())
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_line(":clear"), InputLine::Clear);
        assert_eq!(parse_line(":q"), InputLine::Quit);
        assert_eq!(parse_line("   "), InputLine::Ignore(None));
    }

    #[test]
    fn test_parse_unknown_field() {
        assert!(matches!(parse_line("author=me"), InputLine::Ignore(Some(_))));
    }
}
