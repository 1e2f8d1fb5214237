use clap::{Args as ClapArgs, Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;

use verity_rs::oracle::{
    ChatOracle, LlmAnswerGrader, LlmGenerator, LlmHallucinationGrader, LlmQuestionRewriter,
    LlmRetrievalGrader, LlmRouter, OpenAiOracle,
};
use verity_rs::retrieval::web::DEFAULT_RESULT_COUNT;
use verity_rs::retrieval::{corpus::InMemoryCorpus, web::BraveSearch};
use verity_rs::server;
use verity_rs::workflow::{Dependencies, Engine, EngineConfig, TransitionTable, DEFAULT_MAX_STEPS};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a single question from the command line
    Ask {
        /// The question to answer
        #[arg(short, long)]
        question: String,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Run the HTTP service
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 4080)]
        port: u16,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(ClapArgs, Debug)]
struct CommonArgs {
    /// Directory of .txt/.md files to index as the local corpus
    #[arg(long, default_value = "corpus")]
    corpus: PathBuf,

    /// What the corpus covers; the question router uses this to pick
    /// between the corpus and web search
    #[arg(
        long,
        default_value = "agents, prompt engineering, and adversarial attacks on LLMs"
    )]
    corpus_topics: String,

    /// Oracle model to use
    #[arg(short, long, default_value = "gpt-4o-mini")]
    model: String,

    /// Maximum node executions per workflow run
    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: u32,

    /// Number of web search results per query
    #[arg(long, default_value_t = DEFAULT_RESULT_COUNT)]
    web_results: u32,
}

fn build_engine(common: &CommonArgs) -> anyhow::Result<Engine> {
    let oracle: Arc<dyn ChatOracle> = Arc::new(OpenAiOracle::new(common.model.clone())?);

    let corpus = InMemoryCorpus::load_dir(&common.corpus)?;
    log::info!("Corpus ready: {} chunks", corpus.len());

    let web = BraveSearch::new()?.with_count(common.web_results);

    let deps = Dependencies {
        router: Arc::new(LlmRouter::new(oracle.clone(), &common.corpus_topics)),
        retrieval_grader: Arc::new(LlmRetrievalGrader::new(oracle.clone())),
        hallucination_grader: Arc::new(LlmHallucinationGrader::new(oracle.clone())),
        answer_grader: Arc::new(LlmAnswerGrader::new(oracle.clone())),
        rewriter: Arc::new(LlmQuestionRewriter::new(oracle.clone())),
        generator: Arc::new(LlmGenerator::new(oracle)),
        corpus: Arc::new(corpus),
        web: Arc::new(web),
    };

    Ok(Engine::new(
        deps,
        TransitionTable::standard(),
        EngineConfig {
            max_steps: common.max_steps,
        },
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ask { question, common } => {
            let engine = build_engine(&common)?;
            let state = engine.run(&question).await?;
            let answer = state
                .generation
                .unwrap_or_else(|| server::FALLBACK_ANSWER.to_string());
            println!("{}", answer);
        }
        Commands::Serve { port, common } => {
            let engine = Arc::new(build_engine(&common)?);
            server::serve(port, engine).await?;
        }
    }

    Ok(())
}
