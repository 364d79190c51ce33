use futures::{future::try_join_all, FutureExt};

use crate::{
    error::{Result, TestEnvError},
    graph::Graph,
    services::{CollectionRegistry, Criteria},
    tokens,
};

/// 一次 reset 的结果：按集合名列出已清空与被跳过的集合。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub destroyed: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CollectionResetter;

impl CollectionResetter {
    /// 每次都从当前图重新取注册表，避免图重建后复用旧句柄。
    /// 每个可删除的集合在独立任务中清空；第一个失败即返回，
    /// 其余任务被分离而不是取消，会继续跑完。
    pub async fn reset(&self, graph: &Graph) -> Result<ResetReport> {
        let registry: CollectionRegistry = graph.resolve(tokens::STORE)?;
        let criteria = Criteria::all();
        let mut report = ResetReport::default();
        let mut pending = Vec::new();
        for (name, coll) in registry.iter() {
            if coll.destroyer().is_none() {
                tracing::debug!(collection = name, "collection has no destroy; skipped");
                report.skipped.push(name.to_string());
                continue;
            }
            report.destroyed.push(name.to_string());
            let coll = coll.clone();
            let criteria = criteria.clone();
            let collection = name.to_string();
            let task = tokio::spawn(async move {
                match coll.destroyer() {
                    Some(d) => d.destroy(&criteria).await,
                    None => Ok(()),
                }
            });
            pending.push(task.map(move |joined| {
                let source = match joined {
                    Ok(Ok(())) => return Ok(()),
                    Ok(Err(e)) => e,
                    Err(join) => anyhow::Error::new(join).context("destroy task panicked"),
                };
                Err(TestEnvError::Reset { collection, source })
            }));
        }
        try_join_all(pending).await?;
        tracing::debug!(
            destroyed = report.destroyed.len(),
            skipped = report.skipped.len(),
            "collections reset"
        );
        Ok(report)
    }
}
