//! Subcommands.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use triage_alert::{AlertRepository, MemoryRepository};
use triage_cluster::{ClusterCache, ClusterQuery, ClusterService, DbscanParams};

use crate::config::{load_alerts, Config};

#[derive(Args)]
pub struct ClustersCommand {
    /// Maximum cosine distance between neighbors (overrides config)
    #[arg(long)]
    pub eps: Option<f32>,

    /// Minimum neighborhood size for a core point (overrides config)
    #[arg(long)]
    pub min_samples: Option<usize>,

    /// Drop clusters smaller than this
    #[arg(long, default_value_t = 0)]
    pub min_size: usize,

    /// Keep clusters whose center alert or keywords contain this
    #[arg(short = 'k', long, default_value = "")]
    pub keyword: String,

    /// Page size (0 = all)
    #[arg(long, default_value_t = 0)]
    pub limit: usize,

    /// Clusters to skip
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Also print member alert ids of every listed cluster
    #[arg(long)]
    pub members: bool,
}

impl ClustersCommand {
    pub async fn run(&self, cfg: &Config) -> Result<()> {
        let repo = MemoryRepository::with_alerts(load_alerts(&cfg.alerts)?);
        let cache = Arc::new(ClusterCache::new(cfg.cache.to_cache_config()));
        let sweeper = cache.start_cleanup();
        let svc = ClusterService::new(Arc::new(repo), Arc::clone(&cache));

        let q = ClusterQuery {
            min_cluster_size: self.min_size,
            limit: self.limit,
            offset: self.offset,
            keyword: self.keyword.clone(),
            dbscan: DbscanParams {
                eps: self.eps.unwrap_or(cfg.dbscan.eps),
                min_samples: self.min_samples.unwrap_or(cfg.dbscan.min_samples),
            },
        };
        let summary = svc.get_alert_clusters(&q).await.context("clustering failed")?;

        if self.members {
            let mut members = serde_json::Map::new();
            for c in &summary.clusters {
                let (alerts, _) = svc.get_cluster_alerts(&c.id, "", 0, 0).await?;
                let ids: Vec<&str> = alerts.iter().map(|a| a.id.as_str()).collect();
                members.insert(c.id.clone(), json!(ids));
            }
            let out = json!({ "summary": summary, "members": members });
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        cache.close();
        sweeper.await?;
        Ok(())
    }
}

#[derive(Args)]
pub struct DedupCommand {
    /// Alert to check; its creation time is used as "now"
    pub alert_id: String,
}

impl DedupCommand {
    pub async fn run(&self, cfg: &Config) -> Result<()> {
        let repo = MemoryRepository::with_alerts(load_alerts(&cfg.alerts)?);
        let alert = repo
            .get_alert(&self.alert_id)
            .await?
            .with_context(|| format!("alert {} not found", self.alert_id))?;

        match triage_dedup::find_duplicate(&repo, &alert, alert.created_at).await? {
            Some(dup) => println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "alert": alert.id,
                    "duplicate_of": dup.alert.id,
                    "similarity": dup.similarity,
                    "thread": dup.alert.thread,
                }))?
            ),
            None => println!("no duplicate"),
        }
        Ok(())
    }
}
