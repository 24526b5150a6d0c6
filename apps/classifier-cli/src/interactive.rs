use std::sync::Arc;

use anyhow::Result;
use classifier_sdk::{
    ApiResult, ClassifierApi, ClientConfig, FeedbackError, LoadOutcome, PredictionId,
    SubmitError, Views, Workbench,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::terminal::{ConnectivityPrinter, HistoryPrinter, PredictionPrinter, TextBuffer};

const HELP: &str = "\
Type article text; each line is appended to the draft.
  :paste <text>   replace the draft and count words immediately
  :clear          empty the draft
  :submit         classify the draft
  :like / :dislike          rate the current prediction
  :like <id> / :dislike <id> rate a history row
  :next / :prev / :page <n> / :refresh
  :health
  :quit";

#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Append(String),
    Paste(String),
    Clear,
    Submit,
    Like,
    Dislike,
    RateRow { id: String, liked: bool },
    Next,
    Previous,
    Page(u32),
    Refresh,
    Health,
    Help,
    Quit,
}

pub fn parse_line(line: &str) -> Result<Action, String> {
    let line = line.trim_end();
    let Some(command) = line.strip_prefix(':') else {
        return Ok(Action::Append(line.to_string()));
    };
    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(name, rest)| (name, rest.trim()))
        .unwrap_or((command, ""));
    let action = match name {
        "paste" => Action::Paste(rest.to_string()),
        "clear" => Action::Clear,
        "submit" | "s" => Action::Submit,
        "like" if rest.is_empty() => Action::Like,
        "dislike" if rest.is_empty() => Action::Dislike,
        "like" | "dislike" => Action::RateRow {
            id: rest.to_string(),
            liked: name == "like",
        },
        "next" | "n" => Action::Next,
        "prev" | "p" => Action::Previous,
        "page" => Action::Page(
            rest.parse()
                .map_err(|_| format!("usage: :page <number>, got {rest:?}"))?,
        ),
        "refresh" => Action::Refresh,
        "health" => Action::Health,
        "help" | "h" => Action::Help,
        "quit" | "q" => Action::Quit,
        other => return Err(format!("unknown command :{other}, try :help")),
    };
    Ok(action)
}

pub async fn run(config: &ClientConfig, api: Arc<dyn ClassifierApi>) -> Result<()> {
    let buffer = Arc::new(TextBuffer::default());
    let mut workbench = Workbench::new(
        config,
        api,
        Views {
            input: buffer.clone(),
            prediction: Arc::new(PredictionPrinter),
            history: Arc::new(HistoryPrinter::default()),
            connectivity: Arc::new(ConnectivityPrinter),
        },
    );
    workbench.start_background(config);
    println!("{HELP}");
    report_navigation(workbench.history.load(1).await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let action = match parse_line(&line) {
            Ok(action) => action,
            Err(usage) => {
                eprintln!("{usage}");
                continue;
            }
        };
        if action == Action::Quit {
            break;
        }
        dispatch(&workbench, &buffer, action).await;
    }
    Ok(())
}

async fn dispatch(workbench: &Workbench, buffer: &TextBuffer, action: Action) {
    match action {
        Action::Append(line) => {
            let draft = buffer.text();
            let text = if draft.is_empty() {
                line
            } else {
                format!("{draft}\n{line}")
            };
            buffer.set(&text);
            workbench.segmenter.on_input(&text);
        }
        Action::Paste(text) => {
            buffer.set(&text);
            workbench.segmenter.on_paste(&text).await;
        }
        Action::Clear => {
            buffer.set("");
            workbench.segmenter.on_input("");
        }
        Action::Submit => {
            // Runs detached so a second :submit meets the in-flight guard.
            let session = workbench.session.clone();
            let text = buffer.text();
            tokio::spawn(async move {
                if let Err(SubmitError::Rejected(reason)) = session.submit(&text).await {
                    eprintln!("{reason}");
                }
            });
        }
        Action::Like => report_feedback(workbench.session.like().await),
        Action::Dislike => report_feedback(workbench.session.dislike().await),
        Action::RateRow { id, liked } => {
            report_navigation(workbench.history.feedback(&PredictionId::new(id), liked).await)
        }
        Action::Next => report_navigation(workbench.history.next().await),
        Action::Previous => report_navigation(workbench.history.previous().await),
        Action::Page(page) => report_navigation(workbench.history.go_to(page).await),
        Action::Refresh => report_navigation(workbench.history.refresh().await),
        Action::Health => {
            workbench.health.probe().await;
        }
        Action::Help => println!("{HELP}"),
        Action::Quit => {}
    }
}

fn report_feedback<T>(result: Result<T, FeedbackError>) {
    match result {
        Ok(_) | Err(FeedbackError::Api(_)) => {}
        Err(FeedbackError::Rejected(reason)) => eprintln!("{reason}"),
        Err(FeedbackError::Superseded) => {
            debug!(target: "classifier.cli", "feedback superseded");
        }
    }
}

fn report_navigation(result: ApiResult<LoadOutcome>) {
    if let Ok(LoadOutcome::OutOfRange) = result {
        eprintln!("No such page");
    }
}
