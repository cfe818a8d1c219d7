//! End-to-end recipe runs over JSON Lines files

use async_trait::async_trait;
use comprehend_nlp::api::{ComprehendApi, Operation};
use comprehend_nlp::dataset::{ColumnSchema, InputDataset, JsonLinesDataset, MemoryDataset};
use comprehend_nlp::parallelizer::NoopProgress;
use comprehend_nlp::recipe::{CapabilityKind, Recipe, RecipeConfig};
use comprehend_nlp::transport::{AwsCredentials, HttpClientConfig, HttpComprehendClient};
use comprehend_nlp::{OutputFormat, Result, Row};
use mockito::{Matcher, Server};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("comprehend-nlp-{}-{}", uuid::Uuid::new_v4(), name))
}

fn write_jsonl(rows: &[Value]) -> PathBuf {
    let path = temp_path("input.jsonl");
    let body: String = rows.iter().map(|r| format!("{}\n", r)).collect();
    std::fs::write(&path, body).unwrap();
    path
}

fn read_jsonl(path: &PathBuf) -> Vec<Row> {
    JsonLinesDataset::new(path).read_rows().unwrap()
}

/// Answers key phrase and language requests from canned data, recording operations.
#[derive(Default)]
struct CannedComprehend {
    operations: Mutex<Vec<Operation>>,
}

fn phrases_for(text: &str) -> Value {
    json!(text
        .split_whitespace()
        .enumerate()
        .map(|(i, w)| json!({"Text": w, "Score": 0.5 + i as f64 / 10.0}))
        .collect::<Vec<_>>())
}

#[async_trait]
impl ComprehendApi for CannedComprehend {
    async fn invoke(&self, operation: Operation, payload: Value) -> Result<Value> {
        self.operations.lock().unwrap().push(operation);
        Ok(match operation {
            Operation::BatchDetectKeyPhrases => {
                let results: Vec<Value> = payload["TextList"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
                    .iter()
                    .enumerate()
                    .map(|(k, t)| json!({"Index": k, "KeyPhrases": phrases_for(t.as_str().unwrap_or_default())}))
                    .collect();
                json!({"ResultList": results, "ErrorList": []})
            }
            Operation::DetectKeyPhrases => {
                json!({"KeyPhrases": phrases_for(payload["Text"].as_str().unwrap_or_default())})
            }
            Operation::BatchDetectDominantLanguage => {
                let n = payload["TextList"].as_array().map(Vec::len).unwrap_or(0);
                let results: Vec<Value> = (0..n)
                    .map(|k| json!({"Index": k, "Languages": [{"LanguageCode": "de", "Score": 0.994}]}))
                    .collect();
                json!({"ResultList": results, "ErrorList": []})
            }
            other => panic!("unexpected operation {}", other),
        })
    }
}

fn key_phrase_config() -> RecipeConfig {
    let mut config = RecipeConfig {
        capability: CapabilityKind::KeyPhrases,
        text_column: "review".to_string(),
        num_key_phrases: 2,
        chunk_size: Some(2),
        ..RecipeConfig::default()
    };
    config.api_configuration_preset.api_quota_rate_limit = 1000;
    config.api_configuration_preset.batch_size = 2;
    config
}

#[tokio::test]
async fn test_key_phrases_jsonl_chunked() {
    let input_path = write_jsonl(&[
        json!({"id": 1, "review": "fast delivery"}),
        json!({"id": 2, "review": "  "}),
        json!({"id": 3, "review": "great price good support"}),
        json!({"id": 4, "review": "broken"}),
        json!({"id": 5, "review": "would buy again"}),
    ]);
    let output_path = temp_path("output.jsonl");

    let api = Arc::new(CannedComprehend::default());
    let recipe = Recipe::new(key_phrase_config(), api.clone()).with_progress(Arc::new(NoopProgress));
    let mut output = JsonLinesDataset::new(&output_path);
    let summary = recipe
        .run(&JsonLinesDataset::new(&input_path), &mut output)
        .await
        .unwrap();

    assert_eq!(summary.rows, 5);
    // the blank review is answered locally with an error entry
    assert_eq!(summary.failed_rows, 1);
    // 3 chunks of at most 2 rows, one batch call each
    assert_eq!(api.operations.lock().unwrap().len(), 3);

    let rows = read_jsonl(&output_path);
    let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    assert_eq!(rows[0]["keyphrase_0"], "delivery");
    assert_eq!(rows[0]["keyphrase_0_score"], 0.6);
    assert_eq!(rows[0]["keyphrase_1"], "fast");

    assert_eq!(rows[1]["api_error_type"], "InvalidRequestException");
    assert_eq!(rows[1]["keyphrase_0"], "");
    assert!(rows[1]["keyphrase_0_score"].is_null());

    assert_eq!(rows[2]["keyphrase_0"], "support");
    assert_eq!(rows[3]["keyphrase_1"], "");
    assert!(!rows[0].contains_key("api_response"));

    let schema: Vec<ColumnSchema> =
        serde_json::from_str(&std::fs::read_to_string(output.schema_path()).unwrap()).unwrap();
    let names: Vec<&str> = schema.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "id",
            "review",
            "api_error_message",
            "api_error_type",
            "keyphrase_0",
            "keyphrase_0_score",
            "keyphrase_1",
            "keyphrase_1_score",
        ]
    );
    assert!(schema.iter().all(|c| c.name == "id" || c.name == "review" || c.comment.is_some()));

    let _ = std::fs::remove_file(&input_path);
    let _ = std::fs::remove_file(&output_path);
    let _ = std::fs::remove_file(output.schema_path());
}

#[tokio::test]
async fn test_output_columns_never_overwrite_input() {
    let rows = vec![json!({
        "text": "Hallo Welt",
        "language_code": "provided",
        "api_error_message": "keep me"
    })
    .as_object()
    .cloned()
    .unwrap()];
    let config = RecipeConfig {
        capability: CapabilityKind::LanguageDetection,
        text_column: "text".to_string(),
        output_raw_response: true,
        ..RecipeConfig::default()
    };
    let recipe = Recipe::new(config, Arc::new(CannedComprehend::default())).with_progress(Arc::new(NoopProgress));
    let mut output = MemoryDataset::default();
    recipe.run(&MemoryDataset::from_rows(rows), &mut output).await.unwrap();

    let row = &output.rows()[0];
    assert_eq!(row["language_code"], "provided");
    assert_eq!(row["api_error_message"], "keep me");
    assert_eq!(row["language_code_1"], "de");
    assert_eq!(row["language_score"], 0.99);
    assert_eq!(row["api_error_message_1"], "");
    assert!(row["api_response"].as_str().unwrap().contains("LanguageCode"));
}

#[tokio::test]
async fn test_recipe_over_http_single_column() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_header("x-amz-target", "Comprehend_20171127.BatchDetectKeyPhrases")
        .match_body(Matcher::PartialJson(json!({"LanguageCode": "en"})))
        .with_status(200)
        .with_body(
            json!({
                "ResultList": [
                    {"Index": 0, "KeyPhrases": [{"Text": "the cat", "Score": 0.91}]},
                    {"Index": 1, "KeyPhrases": []}
                ],
                "ErrorList": []
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let client = HttpComprehendClient::new(
        HttpClientConfig::new("us-east-1")
            .with_endpoint(server.url())
            .with_credentials(AwsCredentials::new("AKID", "SECRET")),
    )
    .unwrap();

    let mut config = key_phrase_config();
    config.output_format = OutputFormat::SingleColumn;
    config.chunk_size = None;
    let rows = vec![
        json!({"review": "the cat sat"}).as_object().cloned().unwrap(),
        json!({"review": "nothing"}).as_object().cloned().unwrap(),
    ];
    let recipe = Recipe::new(config, Arc::new(client)).with_progress(Arc::new(NoopProgress));
    let mut output = MemoryDataset::default();
    let summary = recipe.run(&MemoryDataset::from_rows(rows), &mut output).await.unwrap();

    mock.assert_async().await;
    assert_eq!(summary.failed_rows, 0);
    assert_eq!(output.rows()[0]["keyphrase_list"][0]["Text"], "the cat");
    assert_eq!(output.rows()[1]["keyphrase_list"], json!([]));
}
