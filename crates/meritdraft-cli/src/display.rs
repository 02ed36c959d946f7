//! Vertical card display for generation jobs and knowledge-base hits.

use meritdraft_core::{GenerationJob, LegalChunk, StepStatus};

const MAX_TEXT_CHARS: usize = 400;

/// Print a job as a card: header, status fields, then one line per step.
pub fn print_job_card(job: &GenerationJob) {
    println!("=== Job {} ===", job.id);
    println!();

    println!("Status");
    println!("  {:<26} {}", "petition", job.petition_id);
    println!("  {:<26} {}", "status", job.status.as_str());
    if let Some(step) = &job.current_step {
        println!("  {:<26} {}", "current_step", step);
    }
    if let Some(message) = &job.error_message {
        println!("  {:<26} {}", "error", message);
    }
    println!();

    println!("Steps ({}):", job.steps.len());
    for step in &job.steps {
        println!("  [{}] {}", step_marker(step.status), step.name);
    }
    println!();

    println!("Timestamps");
    println!("  {:<26} {}", "created_at", job.created_at.to_rfc3339());
    println!("  {:<26} {}", "updated_at", job.updated_at.to_rfc3339());
    if let Some(done) = job.completed_at {
        println!("  {:<26} {}", "completed_at", done.to_rfc3339());
    }
    println!();
}

/// Print one search hit with its citation, flags and a text excerpt.
pub fn print_chunk_card(rank: usize, chunk: &LegalChunk) {
    println!("--- #{rank} {} ---", chunk.source_type);
    if let Some(citation) = chunk.citation() {
        println!("  {:<26} {}", "citation", citation);
    }
    if let Some(tag) = chunk.criterion_tag {
        println!("  {:<26} {}", "criterion", tag);
    }
    if let Some(d) = chunk.distance {
        println!("  {:<26} {:.4}", "distance", d);
    }
    if let Some(standard) = &chunk.legal_standard {
        println!("  {:<26} {}", "legal_standard", standard);
    }
    println!(
        "  {:<26} {}",
        "citable",
        if chunk.is_citable() { "yes" } else { "no" }
    );
    if !chunk.source_document.is_empty() {
        println!("  {:<26} {}", "source_document", chunk.source_document);
    }
    println!("  {}", excerpt(&chunk.text, MAX_TEXT_CHARS));
    println!();
}

fn step_marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => " ",
        StepStatus::InProgress => "~",
        StepStatus::Completed => "x",
        StepStatus::Failed => "!",
    }
}

/// First `max` characters, with an ellipsis when cut.
fn excerpt(text: &str, max: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
