use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
use tempfile::TempDir;

use unibot::config::load_config;
use unibot::corpus::collect_passages;
use unibot::loader::LoaderRegistry;
use unibot::sqlite_store::SqliteIndexStore;
use unibot_core::embedding::Embedder;
use unibot_core::index::Index;
use unibot_core::store::IndexStore;

fn unibot_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_unibot"))
}

struct LengthEmbedder;

#[async_trait]
impl Embedder for LengthEmbedder {
    fn model_name(&self) -> &str {
        "length"
    }
    fn dims(&self) -> usize {
        2
    }
    async fn embed_documents(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
    }
}

fn setup_test_env(extra_config: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    fs::create_dir_all(root.join("config")).unwrap();
    let docs = root.join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(
        docs.join("calendar.md"),
        "# Academic calendar\n\nThe autumn exam session starts on 6 January.\n\nResits take place in June.",
    )
    .unwrap();
    fs::write(
        docs.join("library.txt"),
        "The central library opens at 8:00 and closes at 20:00 on weekdays.",
    )
    .unwrap();

    let config_content = format!(
        r#"[documents]
dir = "{root}/docs"

[index]
path = "{root}/data/index.sqlite"

[embedding]
provider = "ollama"
model = "length"
dims = 2
{extra}
"#,
        root = root.display(),
        extra = extra_config
    );
    let config_path = root.join("config/unibot.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_unibot(workdir: &Path, config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = unibot_binary();
    let output = Command::new(&binary)
        .current_dir(workdir)
        .env_remove("HUGGINGFACEHUB_API_TOKEN")
        .env_remove("OPENAI_API_KEY")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run unibot binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_missing_config_file_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_unibot(
        tmp.path(),
        &tmp.path().join("missing.toml"),
        &["index", "status"],
    );
    assert!(!success);
    assert!(stderr.contains("configuration error"), "stderr: {}", stderr);
}

#[test]
fn test_invalid_chunking_fails() {
    let (tmp, config) = setup_test_env("[chunking]\nchunk_size = 50\nchunk_overlap = 80\n");
    let (_, stderr, success) = run_unibot(tmp.path(), &config, &["index", "status"]);
    assert!(!success);
    assert!(stderr.contains("chunk_overlap"), "stderr: {}", stderr);
}

#[test]
fn test_missing_token_fails_before_any_work() {
    let (tmp, config) = setup_test_env("");
    let (stdout, stderr, success) =
        run_unibot(tmp.path(), &config, &["ask", "When do exams start?"]);
    assert!(!success);
    assert!(stdout.is_empty());
    assert!(
        stderr.contains("HUGGINGFACEHUB_API_TOKEN"),
        "stderr: {}",
        stderr
    );
    assert!(!tmp.path().join("data/index.sqlite").exists());
}

#[test]
fn test_malformed_token_from_dotenv_fails() {
    let (tmp, config) = setup_test_env("");
    fs::write(
        tmp.path().join(".env"),
        "HUGGINGFACEHUB_API_TOKEN=not-a-token\n",
    )
    .unwrap();
    let (_, stderr, success) = run_unibot(tmp.path(), &config, &["chat"]);
    assert!(!success);
    assert!(stderr.contains("malformed"), "stderr: {}", stderr);
}

#[test]
fn test_status_without_index() {
    let (tmp, config) = setup_test_env("");
    let (stdout, _, success) = run_unibot(tmp.path(), &config, &["index", "status"]);
    assert!(success);
    assert!(stdout.contains("No index at"), "stdout: {}", stdout);
}

#[tokio::test]
async fn test_status_reports_stored_index_and_changes() {
    let (tmp, config_path) = setup_test_env("");
    let config = load_config(&config_path).unwrap();
    let passages = collect_passages(&config, &LoaderRegistry::default()).unwrap();
    let index = Index::build(&LengthEmbedder, passages.clone(), 8)
        .await
        .unwrap();
    SqliteIndexStore::new(&config.index.path)
        .save(index)
        .await
        .unwrap();

    let (stdout, _, success) = run_unibot(tmp.path(), &config_path, &["index", "status"]);
    assert!(success);
    assert!(
        stdout.contains(&format!("Passages:   {}", passages.len())),
        "stdout: {}",
        stdout
    );
    assert!(stdout.contains("Model:      length (2 dims)"));
    assert!(stdout.contains("up to date"));

    fs::write(
        tmp.path().join("docs/fees.txt"),
        "Tuition fees are due by 31 October.",
    )
    .unwrap();
    let (stdout, _, success) = run_unibot(tmp.path(), &config_path, &["index", "status"]);
    assert!(success);
    assert!(stdout.contains("changed since the index was built"));
}

#[tokio::test]
async fn test_build_warns_when_existing_index_is_out_of_date() {
    let (tmp, config_path) = setup_test_env("");
    fs::write(tmp.path().join(".env"), "HUGGINGFACEHUB_API_TOKEN=hf_test\n").unwrap();
    let config = load_config(&config_path).unwrap();
    let passages = collect_passages(&config, &LoaderRegistry::default()).unwrap();
    let index = Index::build(&LengthEmbedder, passages, 8).await.unwrap();
    SqliteIndexStore::new(&config.index.path)
        .save(index)
        .await
        .unwrap();

    let (stdout, stderr, success) = run_unibot(tmp.path(), &config_path, &["index", "build"]);
    assert!(success, "stderr: {}", stderr);
    assert!(stdout.contains("Index already exists"));
    assert!(!stderr.contains("documents changed"), "stderr: {}", stderr);

    fs::write(
        tmp.path().join("docs/housing.txt"),
        "Dormitory applications close on 1 September.",
    )
    .unwrap();
    let (stdout, stderr, success) = run_unibot(tmp.path(), &config_path, &["index", "build"]);
    assert!(success, "stderr: {}", stderr);
    assert!(stdout.contains("Index already exists"));
    assert!(
        stderr.contains("documents changed since the index was built"),
        "stderr: {}",
        stderr
    );
}

#[tokio::test]
async fn test_blank_document_is_reported() {
    let (tmp, config_path) = setup_test_env("");
    fs::write(tmp.path().join("docs/scan.txt"), "  \n\n ").unwrap();
    let config = load_config(&config_path).unwrap();
    let passages = collect_passages(&config, &LoaderRegistry::default()).unwrap();
    let index = Index::build(&LengthEmbedder, passages, 8).await.unwrap();
    SqliteIndexStore::new(&config.index.path)
        .save(index)
        .await
        .unwrap();

    let (stdout, stderr, success) = run_unibot(tmp.path(), &config_path, &["index", "status"]);
    assert!(success);
    assert!(stdout.contains("up to date"), "stdout: {}", stdout);
    assert!(stderr.contains("scan.txt"), "stderr: {}", stderr);
    assert!(stderr.contains("no extractable text"), "stderr: {}", stderr);
}
