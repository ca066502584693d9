use audit_core::{JobId, Msg, SortKey};
use thiserror::Error;

pub const HELP: &str = "commands: submit <url> | sort <websiteName|url|createdAt|status> | \
download [jobId] | refresh | show | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit(String),
    Sort(SortKey),
    /// Without an id, accept the pending download offer.
    Download(Option<JobId>),
    Refresh,
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command {0:?}; type `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("cannot sort by {0:?}; expected websiteName, url, createdAt or status")]
    SortKey(String),
}

/// `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "submit" | "s" => {
            if rest.is_empty() {
                return Err(CommandError::Usage("submit <url>"));
            }
            Command::Submit(rest.to_string())
        }
        "sort" => {
            Command::Sort(SortKey::parse(rest).ok_or_else(|| CommandError::SortKey(rest.into()))?)
        }
        "download" | "d" => Command::Download((!rest.is_empty()).then(|| rest.to_string())),
        "refresh" => Command::Refresh,
        "show" | "ls" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

impl Command {
    /// Messages for commands that change state; empty for the rest.
    pub fn into_msgs(self) -> Vec<Msg> {
        match self {
            Command::Submit(url) => vec![Msg::InputChanged(url), Msg::SubmitClicked],
            Command::Sort(key) => vec![Msg::SortToggled(key)],
            Command::Download(None) => vec![Msg::DownloadOfferAccepted],
            Command::Download(Some(job_id)) => vec![Msg::DownloadRowClicked { job_id }],
            Command::Refresh => vec![Msg::LedgerRefreshRequested],
            Command::Show | Command::Help | Command::Quit => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_submit_with_url() {
        assert_eq!(
            parse_command("submit https://example.com").unwrap(),
            Some(Command::Submit("https://example.com".into()))
        );
        assert_eq!(
            parse_command("submit").unwrap_err(),
            CommandError::Usage("submit <url>")
        );
    }

    #[test]
    fn parses_sort_keys() {
        assert_eq!(
            parse_command("sort createdAt").unwrap(),
            Some(Command::Sort(SortKey::CreatedAt))
        );
        assert_eq!(
            parse_command("SORT websitename").unwrap(),
            Some(Command::Sort(SortKey::WebsiteName))
        );
        assert!(matches!(
            parse_command("sort size"),
            Err(CommandError::SortKey(_))
        ));
    }

    #[test]
    fn download_with_and_without_id() {
        assert_eq!(
            parse_command("download").unwrap().unwrap().into_msgs(),
            vec![Msg::DownloadOfferAccepted]
        );
        assert_eq!(
            parse_command("download abc").unwrap().unwrap().into_msgs(),
            vec![Msg::DownloadRowClicked {
                job_id: "abc".into()
            }]
        );
    }

    #[test]
    fn blank_and_unknown_lines() {
        assert_eq!(parse_command("   ").unwrap(), None);
        assert_eq!(
            parse_command("frobnicate now").unwrap_err(),
            CommandError::Unknown("frobnicate".into())
        );
        assert!(parse_command("quit").unwrap().unwrap().into_msgs().is_empty());
    }
}
