//! 阶段产物存储 - 基础设施层
//!
//! 每个阶段完成后把结果整体写成 JSON，按日期区间标签分目录：
//!
//! ```text
//! <data_dir>/<tag>/phase1_candidates.json
//! <data_dir>/<tag>/phase2_curated.json
//! <data_dir>/<tag>/phase3_published.json
//! <data_dir>/<tag>/summary.json
//! ```
//!
//! 同一标签重跑时整体覆盖，从不原地修改。

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{ArtifactError, CuratorResult};
use crate::models::{CandidateArtifact, CurationArtifact, PublicationArtifact, RunSummary};

const CANDIDATES_FILE: &str = "phase1_candidates.json";
const CURATED_FILE: &str = "phase2_curated.json";
const PUBLISHED_FILE: &str = "phase3_published.json";
const SUMMARY_FILE: &str = "summary.json";

pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, tag: &str, file: &str) -> PathBuf {
        self.root.join(tag).join(file)
    }

    pub async fn write_candidates(&self, artifact: &CandidateArtifact) -> CuratorResult<PathBuf> {
        self.write_json(&artifact.tag, CANDIDATES_FILE, artifact).await
    }

    pub async fn read_candidates(&self, tag: &str) -> CuratorResult<CandidateArtifact> {
        self.read_json(tag, CANDIDATES_FILE, 1).await
    }

    pub async fn write_curation(&self, artifact: &CurationArtifact) -> CuratorResult<PathBuf> {
        self.write_json(&artifact.tag, CURATED_FILE, artifact).await
    }

    pub async fn read_curation(&self, tag: &str) -> CuratorResult<CurationArtifact> {
        self.read_json(tag, CURATED_FILE, 2).await
    }

    pub async fn write_publication(
        &self,
        artifact: &PublicationArtifact,
    ) -> CuratorResult<PathBuf> {
        self.write_json(&artifact.tag, PUBLISHED_FILE, artifact).await
    }

    pub async fn read_publication(&self, tag: &str) -> CuratorResult<PublicationArtifact> {
        self.read_json(tag, PUBLISHED_FILE, 3).await
    }

    /// 运行汇总；空窗口时写到根目录的 `summary_empty_<date>.json`
    pub async fn write_summary(&self, summary: &RunSummary) -> CuratorResult<PathBuf> {
        if summary.window.is_empty() {
            let name = format!("summary_empty_{}.json", summary.window.end);
            self.write_json("", &name, summary).await
        } else {
            self.write_json(&summary.tag, SUMMARY_FILE, summary).await
        }
    }

    async fn write_json<T: Serialize>(
        &self,
        tag: &str,
        file: &str,
        value: &T,
    ) -> CuratorResult<PathBuf> {
        let path = self.path_for(tag, file);
        let path_str = path.display().to_string();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| ArtifactError::Io {
                    path: parent.display().to_string(),
                    source,
                })?;
        }

        let json = serde_json::to_string_pretty(value).map_err(|source| ArtifactError::Json {
            path: path_str.clone(),
            source,
        })?;

        // 先写临时文件再改名，读者不会看到写了一半的产物
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|source| ArtifactError::Io {
                path: tmp.display().to_string(),
                source,
            })?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|source| ArtifactError::Io {
                path: path_str.clone(),
                source,
            })?;

        info!("💾 产物已写入: {}", path_str);
        Ok(path)
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        tag: &str,
        file: &str,
        phase: u8,
    ) -> CuratorResult<T> {
        let path = self.path_for(tag, file);
        let path_str = path.display().to_string();

        if !path.exists() {
            return Err(ArtifactError::Missing {
                phase,
                path: path_str,
            }
            .into());
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|source| ArtifactError::Io {
                path: path_str.clone(),
                source,
            })?;
        debug!("读取产物 {}: {} 字节", path_str, content.len());

        let value = serde_json::from_str(&content).map_err(|source| ArtifactError::Json {
            path: path_str,
            source,
        })?;
        Ok(value)
    }
}
