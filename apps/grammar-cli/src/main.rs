use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use command_grammar::{
    compile_phrase, compile_sentence, ExpandedSentence, GrammarStep, SentenceTerm,
    VocabularyIndex, DEFAULT_GRAMMAR_NAME,
};
use command_transport::{decode_handshake, Handshake};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tracing::info;
use voice_local::{MockRecognizer, RecognitionSession, RecognizerConfig, StepOrder};

#[derive(Parser, Debug)]
#[command(
    name = "grammar",
    version,
    about = "Voice command grammar tools",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Order {
    Reported,
    Position,
}

impl From<Order> for StepOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Reported => StepOrder::Reported,
            Order::Position => StepOrder::SentencePosition,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Expand a phrase template into its spoken forms
    Phrase { template: String },
    /// Expand a sentence template into key sequences
    Sentence { template: String },
    /// Compile a handshake file and print the grammar
    Compile {
        /// Handshake JSON file
        #[arg(long)]
        handshake: PathBuf,
        /// Grammar name
        #[arg(long, default_value = DEFAULT_GRAMMAR_NAME)]
        name: String,
        /// Print the vocabulary and every step sequence
        #[arg(long, action = ArgAction::SetTrue)]
        steps: bool,
    },
    /// Run typed utterances through the mock recognizer
    Recognize {
        /// Handshake JSON file
        #[arg(long)]
        handshake: PathBuf,
        /// Order of semantic values in the result
        #[arg(long, value_enum, default_value_t = Order::Reported)]
        order: Order,
        /// Utterances to recognize
        #[arg(required = true)]
        utterances: Vec<String>,
    },
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Phrase { template } => {
            for text in compile_phrase(&template) {
                println!("{text}");
            }
        }
        Commands::Sentence { template } => {
            for sentence in compile_sentence(&template)? {
                println!("{sentence}");
            }
        }
        Commands::Compile {
            handshake,
            name,
            steps,
        } => {
            let handshake = load_handshake(&handshake)?;
            let config = RecognizerConfig {
                grammar_name: name,
                ..RecognizerConfig::default()
            };
            let vocabulary = VocabularyIndex::from_entries(&handshake.phrases);
            let mut expanded: Vec<ExpandedSentence> = Vec::new();
            for template in &handshake.sentences {
                expanded.extend(compile_sentence(template)?);
            }
            let grammar = config.compiler()?.compile(&vocabulary, &expanded)?;

            println!(
                "vocabulary: {} keys, {} texts",
                vocabulary.len(),
                vocabulary.text_count()
            );
            for key in unknown_keys(&vocabulary, &expanded) {
                println!("  '{key}' has no phrases and matches its own text");
            }
            println!(
                "grammar '{}' ({}): {} sentences, {} choices",
                grammar.name(),
                grammar.locale(),
                grammar.len(),
                grammar.choice_count()
            );
            if steps {
                for (key, texts) in vocabulary.iter() {
                    println!("  {key}: {}", texts.join(" | "));
                }
                for sentence in grammar.sentences() {
                    println!("  {sentence}");
                }
            } else {
                let wildcards = grammar
                    .sentences()
                    .iter()
                    .flat_map(|s| s.steps())
                    .filter(|step| matches!(step, GrammarStep::Wildcard))
                    .count();
                println!("  {wildcards} wildcard steps");
            }
        }
        Commands::Recognize {
            handshake,
            order,
            utterances,
        } => {
            let handshake = load_handshake(&handshake)?;
            recognize(&handshake, order.into(), &utterances)?;
        }
    }
    Ok(())
}

/// Sentence keys with no vocabulary entry, in first-use order.
fn unknown_keys<'a>(vocabulary: &VocabularyIndex, sentences: &'a [ExpandedSentence]) -> Vec<&'a str> {
    let mut unknown: Vec<&str> = Vec::new();
    for term in sentences.iter().flat_map(|s| s.terms()) {
        if let SentenceTerm::Key(key) = term {
            if !vocabulary.contains(key) && !unknown.contains(&key.as_str()) {
                unknown.push(key);
            }
        }
    }
    unknown
}

fn load_handshake(path: &Path) -> Result<Handshake> {
    let raw = fs::read(path).with_context(|| format!("reading handshake: {}", path.display()))?;
    decode_handshake(&raw).with_context(|| format!("decoding handshake: {}", path.display()))
}

fn recognize(handshake: &Handshake, order: StepOrder, utterances: &[String]) -> Result<()> {
    let config = RecognizerConfig {
        step_order: order,
        ..RecognizerConfig::default()
    };
    let recognizer = MockRecognizer::new(config.locale.clone());
    let handle = recognizer.handle();
    let session = RecognitionSession::new(Box::new(recognizer), config);

    let grammar = session
        .compiler()?
        .compile_templates(&handshake.phrases, &handshake.sentences)?;
    session.load(grammar)?;

    let (tx, rx) = mpsc::channel();
    session.start(move |text| {
        let _ = tx.send(text);
    })?;

    for utterance in utterances {
        if !handle.say(utterance) {
            println!("{utterance:?}: no match");
            continue;
        }
        match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(result) => println!("{utterance:?} -> {result}"),
            Err(_) => println!("{utterance:?}: matched free speech only"),
        }
    }

    session.stop()?;
    info!("recognized {} utterances", utterances.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use command_grammar::VocabularyEntry;

    #[test]
    fn test_unknown_keys_in_first_use_order() {
        let vocabulary = VocabularyIndex::from_entries(&[VocabularyEntry::new("cmd_go", "go")]);
        let sentences: Vec<ExpandedSentence> = ["halt ... cmd_go", "cmd_go now halt"]
            .iter()
            .flat_map(|t| compile_sentence(t).unwrap())
            .collect();
        assert_eq!(unknown_keys(&vocabulary, &sentences), vec!["halt", "now"]);
        assert_eq!(vocabulary.keys().collect::<Vec<_>>(), vec!["cmd_go"]);
    }
}
