use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{
    degree::CourseId,
    error::{Result, ScrapeError},
    scraping_context::ScrapingContext,
};

/// A study plan branch within one year of a degree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Curriculum {
    #[serde(default)]
    pub selected: bool,
    /// Passed back as the `curricula` parameter of the timetable.
    pub value: String,
    pub label: String,
}

pub async fn fetch_curricula(ctx: &ScrapingContext, id: &CourseId, year: u32) -> Result<Vec<Curriculum>> {
    let url = ctx.urls.curricula_url(id, year);
    let curricula: Vec<Curriculum> = ctx.fetch_json(&url).await?;
    debug!("{} curricula for {id}, year {year}", curricula.len());
    Ok(curricula)
}

/// Curricula for years `1..=years`, one task per year.
///
/// The first failure is returned as soon as it arrives. Tasks still running
/// are left to finish; their results are dropped.
pub async fn fetch_all_curricula(
    ctx: &ScrapingContext,
    id: &CourseId,
    years: u32,
) -> Result<BTreeMap<u32, Vec<Curriculum>>> {
    // Room for every task's message, so no sender ever waits on us.
    let (tx, mut rx) = mpsc::channel(years.max(1) as usize);

    for year in 1..=years {
        let tx = tx.clone();
        let ctx = ctx.clone();
        let id = id.clone();
        tokio::spawn(async move {
            let result = fetch_curricula(&ctx, &id, year).await;
            // The receiver is gone once another year failed.
            let _ = tx.send((year, result)).await;
        });
    }
    drop(tx);

    let mut all = BTreeMap::new();
    while let Some((year, result)) = rx.recv().await {
        match result {
            Ok(curricula) => {
                all.insert(year, curricula);
            }
            Err(e) => {
                warn!("curricula of {id}, year {year} failed: {e}");
                return Err(e);
            }
        }
    }

    // Only reachable short of years when a task panicked.
    if all.len() != years as usize {
        return Err(ScrapeError::TaskFailed {
            message: format!(
                "got curricula for {} of {years} years of {id}",
                all.len()
            ),
        });
    }

    Ok(all)
}
