use anyhow::{bail, Context, Result};
use search_core::{DocumentInput, SearchEngine};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// JSON/JSONL files under `input`, sorted. A plain file is returned as is.
pub fn collect_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!("input path {} does not exist", input.display());
    }
    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file())
        .filter(|p| {
            matches!(
                p.extension().and_then(|s| s.to_str()),
                Some("json") | Some("jsonl")
            )
        })
        .collect();
    files.sort();
    Ok(files)
}

pub fn load_documents(input: &Path) -> Result<Vec<DocumentInput>> {
    let mut docs = Vec::new();
    for file in collect_files(input)? {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut docs)?;
        } else {
            read_json(&file, &mut docs)?;
        }
    }
    tracing::info!(documents = docs.len(), input = %input.display(), "loaded documents");
    Ok(docs)
}

pub fn read_jsonl(file: &Path, docs: &mut Vec<DocumentInput>) -> Result<()> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: DocumentInput = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: malformed document", file.display(), n + 1))?;
        docs.push(doc);
    }
    Ok(())
}

/// A JSON file holds either one document or an array of them.
pub fn read_json(file: &Path, docs: &mut Vec<DocumentInput>) -> Result<()> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                docs.push(serde_json::from_value(v)?);
            }
        }
        serde_json::Value::Object(_) => docs.push(serde_json::from_value(json)?),
        _ => bail!("{}: expected a document or an array of documents", file.display()),
    }
    Ok(())
}

/// Add every document, stopping at the first rejected one.
pub fn index_documents(engine: &mut SearchEngine, docs: &[DocumentInput]) -> Result<()> {
    for doc in docs {
        engine
            .add_document(doc.id, &doc.text, doc.status, &doc.ratings)
            .with_context(|| format!("indexing document {}", doc.id))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_core::DocumentStatus;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn walks_json_and_jsonl() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("a.jsonl"),
            "{\"id\": 1, \"text\": \"funny pet\"}\n\n{\"id\": 2, \"text\": \"nasty rat\", \"status\": \"banned\"}\n",
        )
        .unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("nested/b.json"),
            "[{\"id\": 3, \"text\": \"curly hair\", \"ratings\": [1, 5]}]",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let docs = load_documents(dir.path()).unwrap();
        assert_eq!(docs.iter().map(|d| d.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(docs[1].status, DocumentStatus::Banned);
        assert_eq!(docs[2].ratings, vec![1, 5]);
    }

    #[test]
    fn single_object_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("one.json");
        fs::write(&path, "{\"id\": 7, \"text\": \"cat\"}").unwrap();
        let docs = load_documents(&path).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].status, DocumentStatus::Active);
    }

    #[test]
    fn malformed_line_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        fs::write(&path, "{\"id\": 1, \"text\": \"ok\"}\nnot json\n").unwrap();
        let err = load_documents(&path).unwrap_err();
        assert!(format!("{err:#}").contains("bad.jsonl:2"));
    }

    #[test]
    fn rejected_document_stops_indexing() {
        let mut engine = SearchEngine::new("").unwrap();
        let docs: Vec<DocumentInput> = serde_json::from_str(
            r#"[{"id": 1, "text": "cat"}, {"id": 1, "text": "dog"}, {"id": 2, "text": "rat"}]"#,
        )
        .unwrap();
        assert!(index_documents(&mut engine, &docs).is_err());
        assert_eq!(engine.document_count(), 1);
    }
}
