// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `prepare`, `train` and `chat`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, enums, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::ml::attention::AttentionMethod;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract prompt/reply pairs from the raw Cornell corpus
    Prepare(PrepareArgs),

    /// Train the chatbot on a prepared pairs file
    Train(TrainArgs),

    /// Talk to a trained checkpoint
    Chat(ChatArgs),
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Directory holding movie_lines.txt and movie_conversations.txt
    #[arg(long, default_value = "data/cornell movie-dialogs corpus")]
    pub corpus_dir: PathBuf,

    /// Where to write the prompt<TAB>reply file
    #[arg(long, default_value = "data/formatted_movie_lines.txt")]
    pub output: PathBuf,
}

/// Attention score function
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum AttentionArg {
    Dot,
    General,
    Concat,
}

impl From<AttentionArg> for AttentionMethod {
    fn from(a: AttentionArg) -> Self {
        match a {
            AttentionArg::Dot     => AttentionMethod::Dot,
            AttentionArg::General => AttentionMethod::General,
            AttentionArg::Concat  => AttentionMethod::Concat,
        }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Prepared pairs file (output of `prepare`)
    #[arg(long, default_value = "data/formatted_movie_lines.txt")]
    pub pairs: PathBuf,

    /// Directory to save checkpoints, config and vocabulary
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Maximum tokens per sequence, <eos> included; longer
    /// exchanges are dropped
    #[arg(long, default_value_t = 10)]
    pub max_length: usize,

    /// Words seen fewer times are trimmed from the vocabulary
    #[arg(long, default_value_t = 3)]
    pub min_count: usize,

    /// Map trimmed words to <unk> instead of dropping their pairs
    #[arg(long)]
    pub keep_rare_words: bool,

    /// Number of pairs processed together in one update
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Embedding size and per-direction encoder hidden size
    #[arg(long, default_value_t = 256)]
    pub hidden_size: usize,

    /// Stacked GRU layers in the encoder and in the decoder
    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    /// Dropout probability between layers during training
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    #[arg(long, value_enum, default_value_t = AttentionArg::Dot)]
    pub attention: AttentionArg,

    /// Probability of feeding the true previous token to the decoder
    #[arg(long, default_value_t = 1.0)]
    pub teacher_forcing_ratio: f64,

    /// Maximum global gradient norm
    #[arg(long, default_value_t = 50.0)]
    pub clip: f64,

    /// Share of pairs held out for validation
    #[arg(long, default_value_t = 0.1)]
    pub val_fraction: f64,

    /// Seed for shuffling, splitting, teacher forcing and weights
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            pairs_path:            a.pairs,
            checkpoint_dir:        a.checkpoint_dir,
            max_length:            a.max_length,
            min_count:             a.min_count,
            keep_rare_words:       a.keep_rare_words,
            batch_size:            a.batch_size,
            epochs:                a.epochs,
            lr:                    a.lr,
            hidden_size:           a.hidden_size,
            num_layers:            a.num_layers,
            dropout:               a.dropout,
            attention:             a.attention.into(),
            teacher_forcing_ratio: a.teacher_forcing_ratio,
            clip:                  a.clip,
            val_fraction:          a.val_fraction,
            seed:                  a.seed,
        }
    }
}

/// All arguments for the `chat` command
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Answer this one message and exit instead of starting a session
    #[arg(long)]
    pub message: Option<String>,

    /// 1 = greedy decoding, more = beam search
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub beam_width: u64,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["seq2seq-chatbot", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        let default = TrainConfig::default();
        assert_eq!(cfg.max_length, default.max_length);
        assert_eq!(cfg.batch_size, default.batch_size);
        assert_eq!(cfg.hidden_size, default.hidden_size);
        assert_eq!(cfg.attention, AttentionMethod::Dot);
        assert!(!cfg.keep_rare_words);
    }

    #[test]
    fn test_train_flags() {
        let cli = Cli::try_parse_from([
            "seq2seq-chatbot", "train",
            "--attention", "concat",
            "--keep-rare-words",
            "--teacher-forcing-ratio", "0.5",
        ]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.attention, AttentionMethod::Concat);
        assert!(cfg.keep_rare_words);
        assert_eq!(cfg.teacher_forcing_ratio, 0.5);
    }

    #[test]
    fn test_chat_rejects_zero_beam_width() {
        assert!(Cli::try_parse_from(["seq2seq-chatbot", "chat", "--beam-width", "0"]).is_err());
        assert!(Cli::try_parse_from(["seq2seq-chatbot", "chat", "--message", "hi"]).is_ok());
    }
}
