use std::fmt::Write as FmtWrite;

use console::style;
use serde::Serialize;

use crate::models::{IndexedDocumentSummary, OutputFormat, SearchResults};

pub trait Formatter {
    fn format_search_results(&self, results: &SearchResults) -> String;
    fn format_context(&self, query: &str, context: &str) -> String;
    fn format_documents(&self, documents: &[IndexedDocumentSummary]) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_index_stats(&self, stats: &IndexStats) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub embedding_mode: String,
    pub embedding_model: String,
    pub dimension: usize,
    pub vocabulary_size: usize,
    pub database_path: String,
    pub documents: u64,
    pub chunks: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub files_scanned: u64,
    pub files_indexed: u64,
    pub files_skipped: u64,
    pub chunks_created: u64,
    pub duration_ms: u64,
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        if results.is_empty() {
            return format!("No results found for: {}\n", results.query);
        }

        let mut output = String::new();
        writeln!(
            output,
            "{}",
            style(format!("Search results for: \"{}\"", results.query)).bold()
        )
        .unwrap();
        writeln!(
            output,
            "Found {} results in {}ms\n",
            results.len(),
            results.duration_ms
        )
        .unwrap();

        for (i, result) in results.results.iter().enumerate() {
            writeln!(
                output,
                "{}. [Similarity: {:.3}]",
                i + 1,
                result.similarity
            )
            .unwrap();
            writeln!(
                output,
                "   Document: {} (chunk {}, chars {}-{})",
                result.chunk.document_name,
                result.chunk.chunk_index + 1,
                result.chunk.start_char,
                result.chunk.end_char
            )
            .unwrap();
            writeln!(output, "   ID: {}", style(&result.chunk.document_id).dim()).unwrap();
            writeln!(output, "   ---").unwrap();

            let preview: String = result.chunk.content.chars().take(200).collect();
            let preview = if result.chunk.content.chars().count() > 200 {
                format!("{}...", preview)
            } else {
                preview
            };
            for line in preview.lines() {
                writeln!(output, "   {}", line).unwrap();
            }
            writeln!(output).unwrap();
        }

        output
    }

    fn format_context(&self, query: &str, context: &str) -> String {
        if context.is_empty() {
            return format!("No context found for: {}\n", query);
        }
        format!("{}\n", context)
    }

    fn format_documents(&self, documents: &[IndexedDocumentSummary]) -> String {
        if documents.is_empty() {
            return "No documents indexed.\n".to_string();
        }

        let mut output = String::new();
        writeln!(output, "{}", style("Indexed documents").bold()).unwrap();
        for document in documents {
            writeln!(
                output,
                "  {}  {}",
                style(&document.document_id).dim(),
                document.document_name
            )
            .unwrap();
        }
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();
        writeln!(output, "Embeddings:    {}", status.embedding_mode).unwrap();
        writeln!(output, "  Model:       {}", status.embedding_model).unwrap();
        writeln!(output, "  Dimension:   {}", status.dimension).unwrap();
        if status.embedding_mode == "fallback" {
            writeln!(output, "  Vocabulary:  {} terms", status.vocabulary_size).unwrap();
        }
        writeln!(output).unwrap();
        writeln!(output, "Chunk Store:   {}", status.database_path).unwrap();
        writeln!(output, "  Documents:   {}", status.documents).unwrap();
        writeln!(output, "  Chunks:      {}", status.chunks).unwrap();
        output
    }

    fn format_index_stats(&self, stats: &IndexStats) -> String {
        let mut output = String::new();
        writeln!(output, "Indexing complete").unwrap();
        writeln!(output, "  Files scanned:  {}", stats.files_scanned).unwrap();
        writeln!(output, "  Files indexed:  {}", stats.files_indexed).unwrap();
        writeln!(output, "  Files skipped:  {}", stats.files_skipped).unwrap();
        writeln!(output, "  Chunks created: {}", stats.chunks_created).unwrap();
        writeln!(output, "  Duration:       {}ms", stats.duration_ms).unwrap();
        output
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }

    fn format_error(&self, error: &str) -> String {
        format!("{} {}", style("Error:").red().bold(), error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize + ?Sized>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

impl Formatter for JsonFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        format!("{}\n", self.render(results))
    }

    fn format_context(&self, query: &str, context: &str) -> String {
        let json = serde_json::json!({
            "query": query,
            "context": context,
            "length": context.chars().count(),
        });
        format!("{}\n", self.render(&json))
    }

    fn format_documents(&self, documents: &[IndexedDocumentSummary]) -> String {
        format!("{}\n", self.render(documents))
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        format!("{}\n", self.render(status))
    }

    fn format_index_stats(&self, stats: &IndexStats) -> String {
        format!("{}\n", self.render(stats))
    }

    fn format_message(&self, message: &str) -> String {
        self.render(&serde_json::json!({ "message": message }))
    }

    fn format_error(&self, error: &str) -> String {
        self.render(&serde_json::json!({ "error": error }))
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkSearchResult, DocumentChunkRecord, TextChunk};

    fn sample_results() -> SearchResults {
        let chunk = TextChunk {
            content: "Store seeds in a cool, dry place.".to_string(),
            start_char: 0,
            end_char: 33,
        };
        let record = DocumentChunkRecord::from_chunk("doc-1", "seeds.txt", 0, chunk, vec![]);
        SearchResults::new(
            "seed storage".to_string(),
            vec![ChunkSearchResult {
                chunk: record,
                similarity: 0.8123,
            }],
            12,
        )
    }

    #[test]
    fn test_text_search_results() {
        let output = TextFormatter.format_search_results(&sample_results());
        assert!(output.contains("[Similarity: 0.812]"));
        assert!(output.contains("seeds.txt (chunk 1, chars 0-33)"));
        assert!(output.contains("Store seeds in a cool, dry place."));
    }

    #[test]
    fn test_json_search_results() {
        let output = JsonFormatter::new(false).format_search_results(&sample_results());
        let value: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(value["query"], "seed storage");
        assert_eq!(value["results"][0]["chunk"]["document_name"], "seeds.txt");
    }

    #[test]
    fn test_empty_documents() {
        assert_eq!(
            TextFormatter.format_documents(&[]),
            "No documents indexed.\n"
        );
        assert_eq!(JsonFormatter::new(false).format_documents(&[]), "[]\n");
    }
}
