//! Line-oriented front end for the submission controller.
//!
//! A plain line is the prompt; Enter submits it. Lines starting with `:`
//! are commands. Ctrl-C during a generation abandons it.

use crate::controller::SubmissionController;
use crate::models::SubmitOutcome;
use crate::services::ImageDownloader;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

const HELP: &str = "Describe your vision and press Enter.\n\
Commands: :delete  :download [path]  :credits  :help  :quit";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Submit(String),
    Delete,
    Download(Option<PathBuf>),
    Credits,
    Help,
    Quit,
    Unknown(String),
}

fn parse_line(line: &str) -> Command {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix(':') else {
        return Command::Submit(line.trim_end_matches(['\r', '\n']).to_string());
    };

    let mut parts = command.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    match name {
        "delete" | "d" => Command::Delete,
        "download" | "save" => Command::Download(arg.map(PathBuf::from)),
        "credits" | "c" => Command::Credits,
        "help" | "h" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    }
}

pub struct Shell<'a> {
    controller: &'a SubmissionController,
    downloader: &'a ImageDownloader,
    /// Cancelled on Ctrl-C; renewed after each use.
    interrupt: Option<CancellationToken>,
}

impl<'a> Shell<'a> {
    pub fn new(controller: &'a SubmissionController, downloader: &'a ImageDownloader) -> Self {
        Self {
            controller,
            downloader,
            interrupt: None,
        }
    }

    /// Abandon generations on Ctrl-C.
    pub fn with_ctrl_c(mut self) -> Self {
        self.interrupt = Some(CancellationToken::new());
        self
    }

    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        write_line(&mut output, HELP).await?;
        self.print_credits(&mut output).await?;

        while let Some(line) = lines.next_line().await? {
            match parse_line(&line) {
                Command::Quit => break,
                Command::Help => write_line(&mut output, HELP).await?,
                Command::Credits => self.print_credits(&mut output).await?,
                Command::Delete => {
                    let message = if self.controller.clear_image() {
                        "Image deleted."
                    } else {
                        "No image to delete."
                    };
                    write_line(&mut output, message).await?;
                }
                Command::Download(dest) => {
                    let dest = dest.unwrap_or_else(|| PathBuf::from("."));
                    let message = match self.controller.download(self.downloader, &dest).await {
                        Ok(path) => format!("Saved {}", path.display()),
                        Err(e) => format!("Download failed: {}", e),
                    };
                    write_line(&mut output, &message).await?;
                }
                Command::Unknown(name) => {
                    write_line(&mut output, &format!("Unknown command :{}", name)).await?;
                }
                Command::Submit(prompt) => {
                    self.controller.set_prompt(prompt);
                    if self.controller.can_submit() {
                        write_line(&mut output, "Generating...").await?;
                    }
                    let outcome = self.submit().await;
                    self.render(&mut output, outcome).await?;
                }
            }
        }

        Ok(())
    }

    async fn submit(&mut self) -> SubmitOutcome {
        let Some(interrupt) = self.interrupt.clone() else {
            return self.controller.submit().await;
        };

        let watcher = {
            let interrupt = interrupt.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    interrupt.cancel();
                }
            })
        };
        let outcome = self.controller.submit_with_cancel(interrupt.clone()).await;
        watcher.abort();

        if interrupt.is_cancelled() {
            self.interrupt = Some(CancellationToken::new());
        }
        outcome
    }

    async fn render<W: AsyncWrite + Unpin>(
        &self,
        output: &mut W,
        outcome: SubmitOutcome,
    ) -> std::io::Result<()> {
        match outcome {
            SubmitOutcome::Generated(result) => {
                write_line(output, &format!("Image: {}", result.image_url)).await?;
                self.print_credits(output).await
            }
            SubmitOutcome::GeneratedUnsaved { result, error } => {
                write_line(output, &format!("Image: {}", result.image_url)).await?;
                write_line(output, &format!("Warning: credits not saved: {}", error)).await?;
                self.print_credits(output).await
            }
            SubmitOutcome::Redirected { destination } => {
                let message = format!(
                    "You've used all your free generations. Subscribe at {}",
                    destination
                );
                write_line(output, &message).await
            }
            SubmitOutcome::IgnoredBlankPrompt => Ok(()),
            SubmitOutcome::Busy => write_line(output, "A generation is already running.").await,
            SubmitOutcome::Failed(err) => {
                write_line(output, &format!("Generation failed: {}", err)).await
            }
        }
    }

    async fn print_credits<W: AsyncWrite + Unpin>(&self, output: &mut W) -> std::io::Result<()> {
        let credits = self.controller.credits();
        let plural = if credits == 1 { "" } else { "s" };
        write_line(
            output,
            &format!("{} free generation{} left.", credits, plural),
        )
        .await
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> std::io::Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
