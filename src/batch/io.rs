//! 批量记录读写：输入为JSON数组，输出按分类写成四个JSON文件

use std::path::{Path, PathBuf};
use serde_json::Value;
use tracing::{debug, info};

use super::record::{CategorizedBatch, Record};
use crate::config::RecordFields;
use crate::error::{RcResult, RsCategorizerError};
use crate::rule::Category;

/// 各分类桶的输出文件名
pub const ANSWERED_FILE: &str = "answered.json";
pub const NOT_ANSWERED_FILE: &str = "not_answered.json";
pub const DISCLAIMER_FILE: &str = "disclaimer.json";
pub const UNCATEGORIZED_FILE: &str = "uncategorized.json";

fn bucket_file(category: Option<Category>) -> &'static str {
    match category {
        Some(Category::Answered) => ANSWERED_FILE,
        Some(Category::NotAnswered) => NOT_ANSWERED_FILE,
        Some(Category::Disclaimer) => DISCLAIMER_FILE,
        None => UNCATEGORIZED_FILE,
    }
}

/// 读取记录文件（顶层必须是JSON数组，单条记录的格式留给分类阶段检查）
pub async fn read_records(path: &Path) -> RcResult<Vec<Value>> {
    let content = tokio::fs::read_to_string(path).await?;
    match serde_json::from_str::<Value>(&content)? {
        Value::Array(records) => {
            debug!("读取记录文件 {}，记录数：{}", path.display(), records.len());
            Ok(records)
        }
        _ => Err(RsCategorizerError::InvalidRecord(format!(
            "{} 顶层不是JSON数组",
            path.display()
        ))),
    }
}

/// 把四个分类桶写入输出目录，返回写入的文件路径
pub async fn write_partitioned(
    dir: &Path,
    batch: &CategorizedBatch,
    fields: &RecordFields,
) -> RcResult<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;

    let buckets = Category::all()
        .into_iter()
        .map(Some)
        .chain(std::iter::once(None));
    let mut written = Vec::with_capacity(4);
    for category in buckets {
        let path = dir.join(bucket_file(category));
        write_records(&path, batch.bucket(category), fields).await?;
        written.push(path);
    }

    info!("分类结果已写入 {}", dir.display());
    Ok(written)
}

async fn write_records(path: &Path, records: &[Record], fields: &RecordFields) -> RcResult<()> {
    let values: Vec<Value> = records.iter().cloned().map(|r| r.into_json(fields)).collect();
    let content = serde_json::to_string_pretty(&values)?;
    tokio::fs::write(path, content).await?;
    debug!("写入 {}，记录数：{}", path.display(), values.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rscategorizer_{}_{}", name, std::process::id()))
    }

    #[tokio::test]
    async fn test_read_records_requires_array() {
        let dir = temp_dir("read");
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let good = dir.join("records.json");
        tokio::fs::write(&good, r#"[{"Prompt": "p", "Response": "r"}, 3]"#).await.unwrap();
        assert_eq!(read_records(&good).await.unwrap().len(), 2);

        let bad = dir.join("object.json");
        tokio::fs::write(&bad, r#"{"Prompt": "p"}"#).await.unwrap();
        assert!(matches!(read_records(&bad).await, Err(RsCategorizerError::InvalidRecord(_))));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_partitioned_buckets() {
        let dir = temp_dir("write").join("nested");
        let fields = RecordFields::default();
        let mut batch = CategorizedBatch::default();
        let mut hit = Record::new("p", "Hello");
        hit.classification_rule = Some("^Hello".to_string());
        batch.push(Some(Category::Answered), Some(0), hit);
        batch.push(None, None, Record::new("p", "??"));

        let written = write_partitioned(&dir, &batch, &fields).await.unwrap();
        assert_eq!(written.len(), 4);

        let answered: Value =
            serde_json::from_str(&tokio::fs::read_to_string(dir.join(ANSWERED_FILE)).await.unwrap()).unwrap();
        assert_eq!(
            answered,
            json!([{"Prompt": "p", "Response": "Hello", "ClassificationRule": "^Hello"}])
        );
        let disclaimer: Value =
            serde_json::from_str(&tokio::fs::read_to_string(dir.join(DISCLAIMER_FILE)).await.unwrap()).unwrap();
        assert_eq!(disclaimer, json!([]));
        let uncategorized: Value =
            serde_json::from_str(&tokio::fs::read_to_string(dir.join(UNCATEGORIZED_FILE)).await.unwrap()).unwrap();
        assert_eq!(uncategorized, json!([{"Prompt": "p", "Response": "??"}]));

        if let Some(parent) = dir.parent() {
            tokio::fs::remove_dir_all(parent).await.unwrap();
        }
    }
}
