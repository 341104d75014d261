//! Loads a directory of plain-text files into retriever documents.
//!
//! Every `.txt` or `.md` file is split on blank lines and each paragraph
//! becomes one [`Document`] titled after the file, located as
//! `file_name#paragraph` (1-based). Files load in name order.

use std::fs;
use std::path::Path;

use crate::retriever::Document;
use crate::{PipelineStage, RagError};

const EXTENSIONS: &[&str] = &["txt", "md"];

pub fn load_dir(dir: &Path) -> Result<Vec<Document>, RagError> {
    let entries = fs::read_dir(dir).map_err(|error| {
        RagError::backend(
            PipelineStage::Retrieve,
            format!("cannot read documents dir `{}`: {error}", dir.display()),
        )
    })?;

    let mut paths = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|extension| extension.to_str())
                    .is_some_and(|extension| EXTENSIONS.contains(&extension))
        })
        .collect::<Vec<_>>();
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let text = fs::read_to_string(&path).map_err(|error| {
            RagError::backend(
                PipelineStage::Retrieve,
                format!("cannot read document `{}`: {error}", path.display()),
            )
        })?;
        let file_name = path.file_name().and_then(|name| name.to_str()).unwrap_or_default();
        let title = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or(file_name);

        documents.extend(paragraphs(&text).into_iter().enumerate().map(|(index, paragraph)| {
            Document::new(title, format!("{file_name}#{}", index + 1), paragraph)
        }));
    }

    Ok(documents)
}

fn paragraphs(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split("\n\n")
        .map(|paragraph| paragraph.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|paragraph| !paragraph.is_empty())
        .collect()
}
