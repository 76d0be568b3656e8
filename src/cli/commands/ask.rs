//! Ask command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagPipeline;
use crate::vector_store::create_vector_store;
use anyhow::Result;

/// Run a course-scoped query and print the answer and sources.
pub async fn run_ask(question: &str, course: &str, settings: Settings) -> Result<()> {
    let pipeline = RagPipeline::new(create_vector_store(&settings)?);

    let spinner = Output::spinner("Searching course material...");
    let response = pipeline.query(question, course).await?;
    spinner.finish_and_clear();

    let sources = response.sources();

    Output::header("Answer");
    println!("{}", response.answer);

    Output::header("Sources");
    if sources.is_empty() {
        Output::info(&format!("No material indexed for course {}.", course));
    }
    for (i, source) in sources.iter().enumerate() {
        Output::source(i + 1, source);
    }

    Ok(())
}
