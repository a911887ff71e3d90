//! Vector knowledge-base retrieval.
//!
//! Queries are answered in two hops: the user message is embedded by an
//! external embedding service, then the vector is run through an
//! Elasticsearch kNN search with a keyword `match` filter (hybrid: the
//! filter discards passages whose text shares too few words with the
//! query). Hits come back as preformatted passage strings — metadata
//! lines first, passage text last.

use serde::Deserialize;
use serde_json::Value;
use sibyl_core::error::RetrievalError;
use sibyl_config::KnowledgeConfig;
use tracing::debug;

/// Client for the embedding service + kNN index pair.
pub struct VectorIndex {
    client: reqwest::Client,
    embedding_url: String,
    elastic_url: String,
    index: String,
    content_field: String,
    vector_field: String,
    metadata_fields: Vec<String>,
    min_should_match_pct: u8,
    operator: String,
    num_candidates: u32,
    auth: Option<(String, String)>,
}

impl VectorIndex {
    pub fn from_config(cfg: &KnowledgeConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        let auth = match (&cfg.username, &cfg.password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        };

        Self {
            client,
            embedding_url: cfg.embedding_url.clone(),
            elastic_url: cfg.elastic_url.trim_end_matches('/').to_string(),
            index: cfg.index.clone(),
            content_field: cfg.content_field.clone(),
            vector_field: cfg.vector_field.clone(),
            metadata_fields: cfg.metadata_fields.clone(),
            min_should_match_pct: cfg.min_should_match_pct,
            operator: cfg.operator.clone(),
            num_candidates: cfg.num_candidates,
            auth,
        }
    }

    /// Top-k ordered passage strings for a message.
    pub async fn top_passages(
        &self,
        k: usize,
        message: &str,
    ) -> Result<Vec<String>, RetrievalError> {
        let query_vector = self.embed(message).await?;
        let body = self.knn_body(&query_vector, k, message);

        let url = format!("{}/{}/_search", self.elastic_url, self.index);
        let mut request = self.client.post(&url).json(&body);
        if let Some((user, pass)) = &self.auth {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request
            .send()
            .await
            .map_err(|e| RetrievalError::IndexQueryFailed(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(RetrievalError::Http {
                status_code: status,
                message: response.text().await.unwrap_or_default(),
            });
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| RetrievalError::IndexQueryFailed(e.to_string()))?;

        let passages: Vec<String> = result["hits"]["hits"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .filter_map(|hit| self.format_passage(&hit["_source"]))
                    .collect()
            })
            .unwrap_or_default();

        debug!(count = passages.len(), k, "Knowledge index returned");
        Ok(passages)
    }

    /// Fetch the embedding vector for a message.
    async fn embed(&self, message: &str) -> Result<Vec<f32>, RetrievalError> {
        let response = self
            .client
            .get(&self.embedding_url)
            .query(&[("msg", message)])
            .send()
            .await
            .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(RetrievalError::Http {
                status_code: status,
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;

        Ok(body.vector)
    }

    /// Build the kNN search body: vector similarity with a keyword filter.
    fn knn_body(&self, query_vector: &[f32], k: usize, message: &str) -> Value {
        serde_json::json!({
            "query": {
                "knn": {
                    "field": self.vector_field,
                    "query_vector": query_vector,
                    "k": k,
                    "num_candidates": self.num_candidates,
                    "filter": {
                        "match": {
                            self.content_field.clone(): {
                                "query": message,
                                "operator": self.operator,
                                "minimum_should_match": format!("{}%", self.min_should_match_pct),
                            }
                        }
                    }
                }
            }
        })
    }

    /// Render one hit's `_source` as a passage: metadata lines, then content.
    ///
    /// Hits without passage text are dropped; absent or empty metadata
    /// fields are skipped rather than rendered blank.
    fn format_passage(&self, source: &Value) -> Option<String> {
        let content = source[&self.content_field].as_str()?;
        if content.is_empty() {
            return None;
        }

        let mut passage = String::new();
        for field in &self.metadata_fields {
            if let Some(value) = source[field].as_str() {
                if !value.is_empty() {
                    passage.push_str(value);
                    passage.push('\n');
                }
            }
        }
        passage.push_str(content);
        passage.push('\n');
        Some(passage)
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    vector: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_index() -> VectorIndex {
        VectorIndex::from_config(&KnowledgeConfig::default())
    }

    #[test]
    fn knn_body_carries_filter_settings() {
        let index = test_index();
        let body = index.knn_body(&[0.1, 0.2], 5, "what is a sibyl");

        let knn = &body["query"]["knn"];
        assert_eq!(knn["field"], "content_vector");
        assert_eq!(knn["k"], 5);
        assert_eq!(knn["num_candidates"], 50);

        let filter = &knn["filter"]["match"]["content"];
        assert_eq!(filter["query"], "what is a sibyl");
        assert_eq!(filter["operator"], "and");
        assert_eq!(filter["minimum_should_match"], "45%");
    }

    #[test]
    fn passage_includes_metadata_then_content() {
        let index = test_index();
        let source = serde_json::json!({
            "doc_name": "Handbook",
            "chapter": "3",
            "item_number": "3.2",
            "content": "The passage text."
        });
        assert_eq!(
            index.format_passage(&source).unwrap(),
            "Handbook\n3\n3.2\nThe passage text.\n"
        );
    }

    #[test]
    fn passage_skips_absent_metadata() {
        let index = test_index();
        let source = serde_json::json!({
            "doc_name": "Handbook",
            "content": "Text only."
        });
        assert_eq!(index.format_passage(&source).unwrap(), "Handbook\nText only.\n");
    }

    #[test]
    fn hit_without_content_is_dropped() {
        let index = test_index();
        assert!(index.format_passage(&serde_json::json!({"doc_name": "x"})).is_none());
        assert!(index.format_passage(&serde_json::json!({"content": ""})).is_none());
    }

    #[test]
    fn parse_embedding_response() {
        let body: EmbeddingResponse =
            serde_json::from_str(r#"{"vector": [0.25, -0.5, 1.0]}"#).unwrap();
        assert_eq!(body.vector, vec![0.25, -0.5, 1.0]);
    }
}
