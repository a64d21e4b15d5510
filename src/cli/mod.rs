// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All work is delegated to Layer 2 (application).
//
//   1. `prepare` — raw Cornell corpus → prompt/reply pairs file
//   2. `train`   — pairs file → vocabulary + checkpoints
//   3. `chat`    — one message, or an interactive session that
//                  ends on `q`, `quit` or end of input
//
// Reference: Rust Book §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use std::io::{self, BufRead, Write};

use commands::{ChatArgs, Commands, PrepareArgs, TrainArgs};
use crate::domain::traits::Responder;

#[derive(Parser, Debug)]
#[command(
    name = "seq2seq-chatbot",
    version = "0.1.0",
    about = "Train a GRU encoder / Luong-attention decoder chatbot on movie dialogues, then chat with it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Prepare(args) => run_prepare(args),
            Commands::Train(args)   => run_train(args),
            Commands::Chat(args)    => run_chat(args),
        }
    }
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareUseCase;

    let written = PrepareUseCase::new(&args.corpus_dir, &args.output).execute()?;
    println!("Wrote {} exchanges to {}", written, args.output.display());
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on pairs in: {}", args.pairs.display());
    let use_case = TrainUseCase::new(args.into());
    let history = use_case.execute()?;

    if let Some(last) = history.last() {
        println!(
            "Training complete after {} epochs (val_loss={:.4}). Checkpoint saved.",
            last.epoch, last.val_loss,
        );
    }
    Ok(())
}

fn run_chat(args: ChatArgs) -> Result<()> {
    use crate::application::chat_use_case::ChatUseCase;

    let bot = ChatUseCase::new(&args.checkpoint_dir, args.beam_width as usize)?;

    match args.message {
        Some(message) => {
            println!("Bot: {}", bot.respond(&message)?);
            Ok(())
        }
        None => {
            let stdin = io::stdin();
            chat_loop(&bot, stdin.lock(), io::stdout())
        }
    }
}

/// Read prompts line by line and print a reply to each until
/// `q`/`quit` or end of input.
pub fn chat_loop<R: BufRead, W: Write>(bot: &dyn Responder, input: R, mut out: W) -> Result<()> {
    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        let prompt = line.trim();
        if prompt == "q" || prompt == "quit" {
            break;
        }
        if prompt.is_empty() {
            continue;
        }

        match bot.respond(prompt) {
            Ok(reply) => writeln!(out, "Bot: {reply}")?,
            Err(e) => {
                tracing::warn!("Failed to answer '{}': {:#}", prompt, e);
                writeln!(out, "Error: {e}")?;
            }
        }
    }
    writeln!(out)?;
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Responder for Echo {
        fn respond(&self, prompt: &str) -> Result<String> {
            if prompt == "fail" {
                anyhow::bail!("no reply");
            }
            Ok(prompt.to_uppercase())
        }
    }

    fn session(input: &str) -> String {
        let mut out = Vec::new();
        chat_loop(&Echo, input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_loop_stops_at_quit() {
        let out = session("hello\n\nquit\nignored\n");
        assert!(out.contains("Bot: HELLO"));
        assert!(!out.contains("IGNORED"));
    }

    #[test]
    fn test_loop_stops_at_end_of_input() {
        let out = session("one\ntwo");
        assert!(out.contains("Bot: ONE"));
        assert!(out.contains("Bot: TWO"));
    }

    #[test]
    fn test_errors_do_not_end_the_session() {
        let out = session("fail\nafter\nq\n");
        assert!(out.contains("Error: no reply"));
        assert!(out.contains("Bot: AFTER"));
    }
}
