use crate::output::console::ConsoleFormatter;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use toolgate_application::PromptSink;
use toolgate_domain::{McqAnswer, McqPrompt};

/// Prints questions to stdout as they are raised.
pub struct ConsolePromptSink;

impl PromptSink for ConsolePromptSink {
    fn push(&self, prompt: &McqPrompt) {
        print!("{}", ConsoleFormatter::format_prompt(prompt));
    }
}

/// What the user typed in reply to a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserReply {
    Answer(McqAnswer),
    Cancel,
}

/// Reads answers line by line.
pub struct AnswerReader<R> {
    input: R,
}

impl AnswerReader<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> AnswerReader<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    /// Read the next non-empty line. End of input cancels.
    pub async fn next_reply(&mut self) -> io::Result<UserReply> {
        loop {
            let mut line = String::new();
            if self.input.read_line(&mut line).await? == 0 {
                return Ok(UserReply::Cancel);
            }
            if let Some(reply) = parse_reply(&line) {
                return Ok(reply);
            }
        }
    }
}

/// `None` for a blank line. Option ids, numbers and labels are all sent as
/// free text; the question itself decides what they match.
pub fn parse_reply(line: &str) -> Option<UserReply> {
    let text = line.trim();
    if text.is_empty() {
        return None;
    }
    if matches!(text.to_ascii_lowercase().as_str(), "q" | "quit" | "cancel") {
        return Some(UserReply::Cancel);
    }
    Some(UserReply::Answer(McqAnswer::FreeText(text.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply() {
        assert_eq!(parse_reply("  \n"), None);
        assert_eq!(parse_reply("Cancel\n"), Some(UserReply::Cancel));
        assert_eq!(
            parse_reply(" 2 \n"),
            Some(UserReply::Answer(McqAnswer::FreeText("2".into())))
        );
    }

    #[tokio::test]
    async fn test_reader_skips_blank_lines_and_cancels_at_eof() {
        let mut reader = AnswerReader::new(&b"\n\nyes\n"[..]);
        assert_eq!(
            reader.next_reply().await.unwrap(),
            UserReply::Answer(McqAnswer::FreeText("yes".into()))
        );
        assert_eq!(reader.next_reply().await.unwrap(), UserReply::Cancel);
    }
}
