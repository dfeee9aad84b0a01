use std::{io::Write, path::PathBuf, str::FromStr};

use anyhow::Context;
use apalis::{
    layers::{retry::RetryPolicy, sentry::SentryLayer},
    prelude::*,
};
use apalis_cron::{CronStream, Tick};
use clap::{Args, Parser, Subcommand};
use cron::Schedule;
use llm_relay::{
    config::BackendArgs,
    feed::{article::HttpArticleFetcher, rss::HttpFeed},
    llm::whisper::WhisperCppClient,
    media::ffmpeg::Ffmpeg,
    tools::{
        ask::{Ask, FilePairPrompt, FilePrompt},
        bullets::WebBullets,
        conversation::Conversation,
        digest::{DigestOptions, Speaker},
        embed_lines::LineEmbedder,
        facts::FactExtractor,
        grammar::GrammarChecker,
        mermaid::MermaidGenerator,
        pdf::{PdfExaminer, DEFAULT_POSTPROMPT, DEFAULT_PREPROMPT, DEFAULT_SYSTEM_PROMPT},
        search::{format_hits, Search},
        sorter::DocumentSorter,
        transcribe::VideoTranscriber,
        vision::{Vision, VisionPrompt},
    },
    tracing::init_tracing_subscriber,
    tubearchivist::{format_channels, format_videos, TubeArchivistClient},
    NewsDigestBuilder,
};
use relay_datastore::{FileUrlLedger, JsonlEmbeddingStore};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "llm-relay", about = "Command-line tools for an OpenAI-compatible LLM backend")]
struct Cli {
    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone)]
struct FeedArgs {
    /// RSS feed to digest
    #[arg(long, env = "DIGEST_FEED_URL", default_value = HttpFeed::DEFAULT_FEED_URL)]
    feed_url: String,

    /// File of already processed article URLs
    #[arg(long, env = "DIGEST_LEDGER", default_value = "llm-rss-output.txt")]
    ledger: PathBuf,

    /// Stop after this many summaries
    #[arg(long)]
    max_articles: Option<usize>,

    /// Selections naming no listed article before giving up
    #[arg(long, default_value = "3")]
    max_selection_attempts: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Send a single prompt and print the reply
    Chat {
        system: String,
        prompt: String,
        #[arg(default_value = "0.7")]
        temperature: f32,
    },
    /// Send a document between a preprompt and a postprompt, streaming the reply
    File {
        document: PathBuf,
        system: String,
        preprompt: String,
        postprompt: String,
        #[arg(default_value = "0.7")]
        temperature: f32,
        /// Truncate the document to this many tokens
        #[arg(long)]
        max_context_tokens: Option<usize>,
    },
    /// Send two documents, each followed by its own postprompt
    FilePair {
        first: PathBuf,
        second: PathBuf,
        system: String,
        preprompt: String,
        first_postprompt: String,
        second_postprompt: String,
        #[arg(default_value = "0.7")]
        temperature: f32,
    },
    /// Interactive conversation
    Conv {
        system: String,
        initial_prompt: String,
        #[arg(default_value = "0.7")]
        temperature: f32,
        /// Document the assistant may extend with things worth remembering
        #[arg(long, conflicts_with = "document")]
        memory_file: Option<PathBuf>,
        /// Reference document placed before the initial prompt, never modified
        #[arg(long)]
        document: Option<PathBuf>,
    },
    /// Check the grammar of a text file sentence by sentence
    Grammar { document: PathBuf },
    /// Bullet point summaries of web pages, reconciled into one
    Bullets {
        #[arg(required = true)]
        urls: Vec<String>,
        #[arg(long, default_value = "0.0")]
        temperature: f32,
    },
    /// Download a PDF and ask about its text
    Pdf {
        url: String,
        #[arg(long, default_value = DEFAULT_SYSTEM_PROMPT)]
        system: String,
        #[arg(long, default_value = DEFAULT_PREPROMPT)]
        preprompt: String,
        #[arg(long, default_value = DEFAULT_POSTPROMPT)]
        postprompt: String,
        #[arg(long, default_value = "0.7")]
        temperature: f32,
    },
    /// Extract facts from a document and embed each one
    Facts {
        document: PathBuf,
        #[arg(long)]
        max_context_tokens: Option<usize>,
    },
    /// Embed every line of a file
    EmbedLines {
        document: PathBuf,
        /// Embeddings file, defaults to `<document>.embeddings`
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Search an embeddings file
    Search {
        embeddings: PathBuf,
        query: String,
        #[arg(default_value = "5")]
        top_n: usize,
    },
    /// File documents from `<root>/unsorted` into subdirectories of `<root>/sorted`
    Sort {
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Generate a mermaid diagram
    Mermaid {
        prompt: String,
        #[arg(long, default_value = "mermaid.html")]
        output: PathBuf,
    },
    /// Ask about one or more images
    Vision {
        prompt: String,
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Subtitle or transcript file sent along with the images
        #[arg(long)]
        subtitles: Option<PathBuf>,
        #[arg(long)]
        max_tokens: Option<i32>,
    },
    /// Ask about a wav or mp3 file
    Audio { path: PathBuf, prompt: String },
    /// Transcribe a video to SRT with a whisper.cpp server
    Transcribe {
        video: PathBuf,
        /// Translate to English
        #[arg(long)]
        translate: bool,
        #[arg(long, env = "WHISPER_SERVER_URL", default_value = WhisperCppClient::DEFAULT_SERVER_URL)]
        server_url: String,
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: PathBuf,
    },
    /// Summarize the most important articles of a news feed
    Digest {
        #[command(flatten)]
        feed: FeedArgs,
        /// Skip and record processed URLs
        #[arg(long)]
        save: bool,
        /// Pick articles at random instead of asking the model
        #[arg(long)]
        random: bool,
        /// Read summaries aloud
        #[arg(long)]
        speak: bool,
        #[arg(long, default_value = "espeak")]
        speak_command: String,
    },
    /// Run the digest on a cron schedule
    DigestCron {
        #[command(flatten)]
        feed: FeedArgs,
        /// Cron schedule expression
        #[arg(long, env = "DIGEST_CRON_SCHEDULE", default_value = "0 0 */4 * * *")]
        schedule: String,
    },
    /// Show TubeArchivist videos and channel statistics
    Tubearchivist {
        #[arg(long, env = "TUBEARCHIVIST_URL", default_value = TubeArchivistClient::DEFAULT_BASE_URL)]
        url: String,
        #[arg(long, env = "TUBEARCHIVIST_TOKEN", hide_env_values = true)]
        token: String,
    },
}

#[derive(Clone)]
struct Config {
    backend: BackendArgs,
    feed: FeedArgs,
}

async fn run_digest(
    config: &Config,
    options: DigestOptions,
    speaker: Option<Speaker>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let digest = NewsDigestBuilder::new()
        .chat(config.backend.chat_client())
        .feed(HttpFeed::new(&config.feed.feed_url))
        .fetcher(HttpArticleFetcher::default())
        .ledger(FileUrlLedger::new(&config.feed.ledger))
        .options(options)
        .shutdown(shutdown)
        .speaker(speaker)
        .build();

    let report = digest.run(&mut std::io::stdout()).await?;
    tracing::info!(
        summarized = report.summarized.len(),
        skipped = report.skipped.len(),
        invalid_selections = report.invalid_selections,
        "Digest finished"
    );
    Ok(())
}

async fn handle_tick(_tick: Tick, config: Data<Config>) -> anyhow::Result<()> {
    tracing::info!(feed = %config.feed.feed_url, "Running scheduled digest...");

    let options = DigestOptions {
        save: true,
        max_articles: config.feed.max_articles,
        max_selection_attempts: config.feed.max_selection_attempts,
        ..Default::default()
    };
    run_digest(&config, options, None, CancellationToken::new()).await
}

/// First Ctrl-C lets the current item finish, the second exits.
fn spawn_shutdown_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCtrl-C pressed. Will exit after current article.");
            token.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nSecond Ctrl-C received. Exiting immediately.");
            std::process::exit(130);
        }
    });
}

async fn tubearchivist(url: &str, token: &str) -> anyhow::Result<()> {
    let client = TubeArchivistClient::new(url, token)?;
    let mut out = std::io::stdout();

    writeln!(out, "TubeArchivist API interaction script")?;
    writeln!(out, "Base URL: {url}")?;

    match client.get_latest_videos(12).await {
        Ok(page) => writeln!(
            out,
            "Latest Videos:\n{}",
            serde_json::to_string_pretty(&format_videos(&page))?
        )?,
        Err(e) => {
            tracing::error!(error = %e, "Failed to retrieve latest videos");
            writeln!(out, "Failed to retrieve latest videos.")?
        }
    }

    match client.get_channel_stats().await {
        Ok(stats) => writeln!(
            out,
            "\nChannel Stats:\n{}",
            serde_json::to_string_pretty(&format_channels(&stats))?
        )?,
        Err(e) => {
            tracing::error!(error = %e, "Failed to retrieve channel stats");
            writeln!(out, "Failed to retrieve channel stats.")?
        }
    }

    match client.get_biggest_channels("doc_count").await {
        Ok(channels) => writeln!(
            out,
            "\nBiggest Channels:\n{}",
            serde_json::to_string_pretty(&channels)?
        )?,
        Err(e) => {
            tracing::error!(error = %e, "Failed to retrieve biggest channels");
            writeln!(out, "Failed to retrieve biggest channels.")?
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some("production".into()),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    let backend = cli.backend;
    let mut stdout = std::io::stdout();

    match cli.command {
        Command::Chat {
            system,
            prompt,
            temperature,
        } => {
            let reply = Ask::new(backend.chat_client())
                .chat(&system, &prompt, temperature)
                .await?;
            writeln!(stdout, "{reply}")?;
        }
        Command::File {
            document,
            system,
            preprompt,
            postprompt,
            temperature,
            max_context_tokens,
        } => {
            let prompt = FilePrompt {
                document_path: document,
                system,
                preprompt,
                postprompt,
                temperature,
                max_context_tokens,
            };
            Ask::new(backend.chat_client())
                .file(&prompt, &mut stdout)
                .await?;
        }
        Command::FilePair {
            first,
            second,
            system,
            preprompt,
            first_postprompt,
            second_postprompt,
            temperature,
        } => {
            let prompt = FilePairPrompt {
                first_path: first,
                second_path: second,
                system,
                preprompt,
                first_postprompt,
                second_postprompt,
                temperature,
            };
            let reply = Ask::new(backend.chat_client()).file_pair(prompt).await?;
            writeln!(stdout, "{reply}")?;
        }
        Command::Conv {
            system,
            initial_prompt,
            temperature,
            memory_file,
            document,
        } => {
            let mut conversation =
                Conversation::new(backend.chat_client(), &system, &initial_prompt, temperature);
            if let Some(path) = memory_file {
                conversation = conversation.with_memory_file(path).await?;
            }
            if let Some(path) = document {
                conversation = conversation.with_document(path).await?;
            }
            conversation.run(std::io::stdin().lock(), &mut stdout).await?;
        }
        Command::Grammar { document } => {
            GrammarChecker::new(backend.chat_client())
                .run(&document, &mut stdout)
                .await?;
        }
        Command::Bullets { urls, temperature } => {
            WebBullets::new(backend.chat_client())
                .with_temperature(temperature)
                .run(&urls, &mut stdout)
                .await?;
        }
        Command::Pdf {
            url,
            system,
            preprompt,
            postprompt,
            temperature,
        } => {
            PdfExaminer::new(backend.chat_client())
                .with_prompts(system, preprompt, postprompt)
                .with_temperature(temperature)
                .run(&url, &mut stdout)
                .await?;
        }
        Command::Facts {
            document,
            max_context_tokens,
        } => {
            let store = JsonlEmbeddingStore::for_document(&document);
            let report = FactExtractor::new(backend.chat_client(), backend.embedding_client(), &store)
                .max_context_tokens(max_context_tokens)
                .run(&document, &mut stdout)
                .await?;
            writeln!(
                stdout,
                "Embeddings saved to {} ({} stored, {} failed)",
                store.path().display(),
                report.stored,
                report.failed
            )?;
        }
        Command::EmbedLines { document, output } => {
            let store = match output {
                Some(path) => JsonlEmbeddingStore::new(path),
                None => JsonlEmbeddingStore::for_document(&document),
            };
            let report = LineEmbedder::new(backend.embedding_client(), &store)
                .run(&document, &mut stdout)
                .await?;
            tracing::info!(stored = report.stored, failed = report.failed, "Embedded lines");
        }
        Command::Search {
            embeddings,
            query,
            top_n,
        } => {
            let hits = Search::new(backend.embedding_client(), JsonlEmbeddingStore::new(embeddings))
                .run(&query, top_n)
                .await?;
            if hits.is_empty() {
                eprintln!("No matches found.");
            }
            write!(stdout, "{}", format_hits(&hits))?;
        }
        Command::Sort { root } => {
            let report = DocumentSorter::new(backend.chat_client(), root)
                .run(&mut stdout)
                .await?;
            writeln!(
                stdout,
                "Copied {}, rejected {}, failed {}.",
                report.copied.len(),
                report.rejected.len(),
                report.failed.len()
            )?;
        }
        Command::Mermaid { prompt, output } => {
            let diagram = MermaidGenerator::new(backend.chat_client())
                .generate(&prompt)
                .await?;
            tokio::fs::write(&output, diagram.html())
                .await
                .with_context(|| format!("Failed to write '{}'", output.display()))?;
            writeln!(stdout, "{}", diagram.code)?;
            writeln!(stdout, "Diagram written to {}", output.display())?;
            writeln!(stdout, "{}", diagram.data_uri())?;
        }
        Command::Vision {
            prompt,
            images,
            subtitles,
            max_tokens,
        } => {
            let reply = Vision::new(backend.chat_client())
                .describe(VisionPrompt {
                    prompt,
                    images,
                    subtitles,
                    max_tokens,
                })
                .await?;
            writeln!(stdout, "{reply}")?;
        }
        Command::Audio { path, prompt } => {
            let reply = Vision::new(backend.chat_client())
                .listen(&prompt, &path)
                .await?;
            writeln!(stdout, "{reply}")?;
        }
        Command::Transcribe {
            video,
            translate,
            server_url,
            ffmpeg,
        } => {
            let srt = VideoTranscriber::new(Ffmpeg::new(ffmpeg), WhisperCppClient::new(server_url))
                .translate(translate)
                .run(&video)
                .await?;
            writeln!(stdout, "Successfully saved SRT file to: {}", srt.display())?;
        }
        Command::Digest {
            feed,
            save,
            random,
            speak,
            speak_command,
        } => {
            let shutdown = CancellationToken::new();
            spawn_shutdown_handler(shutdown.clone());

            let options = DigestOptions {
                save,
                random,
                max_articles: feed.max_articles,
                max_selection_attempts: feed.max_selection_attempts,
                ..Default::default()
            };
            let speaker = speak.then(|| Speaker::new(speak_command));
            let config = Config { backend, feed };

            run_digest(&config, options, speaker, shutdown).await?;
        }
        Command::DigestCron { feed, schedule } => {
            tracing::info!(%schedule, "Starting cron scheduler...");
            let schedule = Schedule::from_str(&schedule)?;
            let config = Config { backend, feed };

            let worker = WorkerBuilder::new("llm-relay-digest-cron")
                .backend(CronStream::new(schedule))
                .retry(RetryPolicy::retries(3))
                .layer(SentryLayer::new())
                .data(config)
                .build(handle_tick);

            worker.run().await?;
        }
        Command::Tubearchivist { url, token } => tubearchivist(&url, &token).await?,
    }

    Ok(())
}
